//! Machine instances and the external world conditions that gate them.
//!
//! The core never scans a live object graph to answer "where am I": a
//! machine instance carries its own location name and tile coordinate, and
//! those are the sole lookup key into the upgrade tracker.

use crate::id::TileCoord;
use crate::item::ItemStack;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// World conditions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Season {
    Spring,
    Summer,
    Fall,
    Winter,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Weather {
    Sunny,
    Rainy,
    Stormy,
    Snowy,
}

/// The slice of world state the core consults when evaluating machine
/// conditions. Supplied by the host at each entry point; never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorldSnapshot {
    pub season: Season,
    pub weather: Weather,
    /// Minutes-of-day clock value (e.g. 600 = 6:00am).
    pub time_of_day: u32,
}

impl WorldSnapshot {
    pub fn new(season: Season, weather: Weather, time_of_day: u32) -> Self {
        Self {
            season,
            weather,
            time_of_day,
        }
    }
}

// ---------------------------------------------------------------------------
// Machine runtime state
// ---------------------------------------------------------------------------

/// Transient per-instance production state. Owned by the simulation's
/// machine instance; the core reads and writes it through this narrow
/// surface only.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MachineRuntimeState {
    pub held_output: Option<ItemStack>,
    /// Minutes until the held output is ready. Negative means no pending
    /// production.
    pub ready_in_minutes: i32,
    pub ready_for_harvest: bool,
    /// Show the machine's working sprite frame.
    pub show_alternate_frame: bool,
    /// Whether this instance currently casts light.
    pub lit: bool,
}

impl MachineRuntimeState {
    /// Held output present and its ready time elapsed.
    pub fn is_done(&self) -> bool {
        self.held_output.is_some() && self.ready_in_minutes <= 0 && self.ready_for_harvest
    }

    /// Advance the ready countdown by elapsed minutes.
    pub fn pass_time(&mut self, minutes: u32) {
        if self.held_output.is_some() && self.ready_in_minutes > 0 {
            self.ready_in_minutes -= minutes as i32;
            if self.ready_in_minutes <= 0 {
                self.ready_in_minutes = 0;
                self.ready_for_harvest = true;
            }
        }
    }
}

/// A machine instance: base identity plus stable coordinates plus runtime
/// production state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Machine {
    /// The base machine identity whose rules this instance runs.
    pub base_name: String,
    pub location: String,
    pub tile: TileCoord,
    pub runtime: MachineRuntimeState,
}

impl Machine {
    pub fn new(base_name: impl Into<String>, location: impl Into<String>, tile: TileCoord) -> Self {
        Self {
            base_name: base_name.into(),
            location: location.into(),
            tile,
            runtime: MachineRuntimeState::default(),
        }
    }
}
