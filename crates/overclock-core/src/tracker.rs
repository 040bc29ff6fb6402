//! The upgrade tracker: which machine instance carries which upgrade.
//!
//! Keyed by (location name, tile coordinate) rather than object identity,
//! because machine instances are recreated across save/load cycles while
//! coordinates persist. This is the only mutable, save-durable state in the
//! core. Persisted as a flat record list inside a versioned binary blob.

use crate::id::TileCoord;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Magic number identifying an upgrade-tracker blob.
pub const TRACKER_MAGIC: u32 = 0x0C10_CC01;

/// Current blob format version. Increment when breaking the wire format.
pub const TRACKER_VERSION: u32 = 1;

/// Name under which the blob is stored in the host's save data.
pub const SAVE_KEY: &str = "UpgradedMachineLocations";

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// One persisted upgrade: a machine instance's stable identity plus its
/// profile key. At most one record per (location, x, y).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpgradeRecord {
    pub location_name: String,
    pub x: i32,
    pub y: i32,
    pub profile_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct TrackerBlob {
    magic: u32,
    version: u32,
    records: Vec<UpgradeRecord>,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum TrackerError {
    #[error("tracker blob decoding failed: {0}")]
    Decode(String),
    #[error("tracker blob encoding failed: {0}")]
    Encode(String),
    #[error("invalid magic number: expected 0x{:08X}, got 0x{:08X}", TRACKER_MAGIC, .0)]
    InvalidMagic(u32),
    #[error("unsupported blob version: expected {}, got {}", TRACKER_VERSION, .0)]
    UnsupportedVersion(u32),
}

// ---------------------------------------------------------------------------
// Tracker
// ---------------------------------------------------------------------------

type Key = (String, i32, i32);

/// Coordinate-keyed mapping from machine instances to profile keys.
///
/// The single source of truth for "is this machine upgraded, and with which
/// profile". Cleared and reloaded at each session boundary; every mutation
/// is immediately visible to subsequent `get` calls.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpgradeTracker {
    upgrades: HashMap<Key, String>,
    /// Insertion order for save output. Not semantically significant.
    order: Vec<Key>,
}

impl UpgradeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, location: &str, tile: TileCoord) -> Option<&str> {
        self.upgrades
            .get(&(location.to_string(), tile.x, tile.y))
            .map(String::as_str)
    }

    /// Record or update the upgrade key for a machine instance. `None`
    /// clears it, equivalent to `remove`.
    pub fn set(&mut self, location: &str, tile: TileCoord, profile_key: Option<&str>) {
        match profile_key {
            None => {
                self.remove(location, tile);
            }
            Some(key) => {
                let map_key = (location.to_string(), tile.x, tile.y);
                if self.upgrades.insert(map_key.clone(), key.to_string()).is_none() {
                    self.order.push(map_key);
                }
            }
        }
    }

    /// Remove a machine from tracking. Returns the key it carried, if any.
    pub fn remove(&mut self, location: &str, tile: TileCoord) -> Option<String> {
        let map_key = (location.to_string(), tile.x, tile.y);
        let removed = self.upgrades.remove(&map_key);
        if removed.is_some() {
            self.order.retain(|k| *k != map_key);
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.upgrades.len()
    }

    pub fn is_empty(&self) -> bool {
        self.upgrades.is_empty()
    }

    /// All current records in insertion order.
    pub fn all(&self) -> impl Iterator<Item = UpgradeRecord> + '_ {
        self.order.iter().filter_map(|key| {
            self.upgrades.get(key).map(|profile_key| UpgradeRecord {
                location_name: key.0.clone(),
                x: key.1,
                y: key.2,
                profile_key: profile_key.clone(),
            })
        })
    }

    /// Replace all state with the given records. Later duplicates of a
    /// coordinate win, matching plain map insertion.
    pub fn load(&mut self, records: Vec<UpgradeRecord>) {
        self.clear();
        for record in records {
            self.set(
                &record.location_name,
                TileCoord::new(record.x, record.y),
                Some(&record.profile_key),
            );
        }
    }

    pub fn save(&self) -> Vec<UpgradeRecord> {
        self.all().collect()
    }

    pub fn clear(&mut self) {
        self.upgrades.clear();
        self.order.clear();
    }

    // -----------------------------------------------------------------------
    // Blob codec
    // -----------------------------------------------------------------------

    /// Serialize the current records to a versioned binary blob.
    pub fn to_blob(&self) -> Result<Vec<u8>, TrackerError> {
        let blob = TrackerBlob {
            magic: TRACKER_MAGIC,
            version: TRACKER_VERSION,
            records: self.save(),
        };
        bitcode::serialize(&blob).map_err(|e| TrackerError::Encode(e.to_string()))
    }

    /// Load records from a blob, replacing current state. A malformed blob
    /// is a configuration defect: the caller should log it and start empty.
    pub fn load_blob(&mut self, data: &[u8]) -> Result<(), TrackerError> {
        let blob: TrackerBlob =
            bitcode::deserialize(data).map_err(|e| TrackerError::Decode(e.to_string()))?;
        if blob.magic != TRACKER_MAGIC {
            return Err(TrackerError::InvalidMagic(blob.magic));
        }
        if blob.version != TRACKER_VERSION {
            return Err(TrackerError::UnsupportedVersion(blob.version));
        }
        self.load(blob.records);
        Ok(())
    }
}
