//! Resolution pipeline: parses profile packs and registers them with the
//! engine's profile registry.
//!
//! A malformed pack file is an error the host reports; a malformed *entry*
//! inside an otherwise valid pack is a configuration defect: it is logged
//! with the pack name and skipped, and the rest of the pack still loads.

use crate::schema::{InputModeData, PackData, ProfileData, QualityModeData};
use overclock_core::registry::ProfileRegistry;
use overclock_core::scaling::{InputMode, QualityMode, ScalingProfile, UnlockConditions};

// ===========================================================================
// Errors
// ===========================================================================

#[derive(Debug, thiserror::Error)]
pub enum ProfileLoadError {
    /// The pack JSON itself could not be parsed.
    #[error("profile pack parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

// ===========================================================================
// Resolution
// ===========================================================================

/// Resolve a data file entry into an engine profile. `None` when the entry
/// is unusable (missing key or upgrade object).
fn resolve(data: ProfileData) -> Option<ScalingProfile> {
    if data.key.is_empty() {
        tracing::warn!("profile entry with empty key skipped");
        return None;
    }
    if data.upgrade_object.is_empty() {
        tracing::warn!(key = %data.key, "profile entry without an upgrade object skipped");
        return None;
    }

    let mut profile = ScalingProfile::new(data.key, data.upgrade_object);
    profile.base_multiplier = data.base_multiplier;
    profile.input_static_delta = data.input_static_delta;
    profile.output_static_delta = data.output_static_delta;
    profile.input_multiplier = data.input_multiplier;
    profile.output_multiplier = data.output_multiplier;
    profile.output_multiplier_min = data.output_multiplier_min;
    profile.output_multiplier_max = data.output_multiplier_max;
    profile.time_multiplier = data.time_multiplier;
    profile.input_mode = match data.input_requirement_mode {
        InputModeData::InputRequired => InputMode::InputRequired,
        InputModeData::NoInputsOnly => InputMode::NoInputsOnly,
        InputModeData::NoRequirements => InputMode::NoRequirements,
    };
    profile.quality = match data.quality_mode {
        QualityModeData::NoStars => QualityMode::NoStars,
        QualityModeData::Silver => QualityMode::Silver,
        QualityModeData::Gold => QualityMode::Gold,
        QualityModeData::Iridium => QualityMode::Iridium,
        QualityModeData::KeepInput => QualityMode::KeepInput,
    };
    profile.unlock_conditions = UnlockConditions {
        total_earnings: data.unlock_conditions.total_earnings,
        unlocked_upgrade: data.unlock_conditions.unlocked_upgrade,
        is_endgame: data.unlock_conditions.is_endgame,
    };
    profile.fuel_ignore = data.fuel_ignore_keys;
    Some(profile)
}

// ===========================================================================
// Loading
// ===========================================================================

/// Parse a bare JSON list of profile entries into engine profiles.
pub fn load_profiles_json(json: &str) -> Result<Vec<ScalingProfile>, ProfileLoadError> {
    let entries: Vec<ProfileData> = serde_json::from_str(json)?;
    Ok(entries.into_iter().filter_map(resolve).collect())
}

/// Parse a whole pack file: `(pack name, resolved profiles)`.
pub fn load_pack_json(json: &str) -> Result<(String, Vec<ScalingProfile>), ProfileLoadError> {
    let pack: PackData = serde_json::from_str(json)?;
    let profiles = pack.profiles.into_iter().filter_map(resolve).collect();
    Ok((pack.name, profiles))
}

/// Parse a pack and register its profiles. Duplicate keys keep the first
/// registration, across packs in load order; discards are logged with the
/// pack that lost. Returns how many profiles were registered.
pub fn register_pack(
    registry: &mut ProfileRegistry,
    json: &str,
) -> Result<usize, ProfileLoadError> {
    let (pack_name, profiles) = load_pack_json(json)?;
    let mut registered = 0;
    for profile in profiles {
        if registry.get(&profile.key).is_some() {
            tracing::warn!(
                pack = %pack_name,
                key = %profile.key,
                "duplicate scaling profile key; keeping the first registration"
            );
            continue;
        }
        registry.register(profile);
        registered += 1;
    }
    Ok(registered)
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const PACK_A: &str = r#"{
        "name": "Pack A",
        "profiles": [
            {"key": "mass", "upgrade_object": "Mass Production Upgrade"},
            {
                "key": "quality",
                "upgrade_object": "Quality Upgrade",
                "base_multiplier": 5.0,
                "quality_mode": "gold",
                "fuel_ignore_keys": ["Coal"]
            }
        ]
    }"#;

    #[test]
    fn load_profiles_resolves_defaults_and_modes() {
        let json = r#"[
            {"key": "mass", "upgrade_object": "Mass Production Upgrade"},
            {
                "key": "auto",
                "upgrade_object": "Automation Upgrade",
                "input_requirement_mode": "no_inputs_only",
                "time_multiplier": 0.5
            }
        ]"#;
        let profiles = load_profiles_json(json).unwrap();
        assert_eq!(profiles.len(), 2);
        assert_eq!(profiles[0].scaled_input(1), 10);
        assert_eq!(profiles[1].input_mode, InputMode::NoInputsOnly);
        assert_eq!(profiles[1].scaled_time(100), 50);
    }

    #[test]
    fn unusable_entries_are_skipped_not_fatal() {
        let json = r#"[
            {"key": "", "upgrade_object": "Nameless"},
            {"key": "orphan", "upgrade_object": ""},
            {"key": "good", "upgrade_object": "Good Upgrade"}
        ]"#;
        let profiles = load_profiles_json(json).unwrap();
        assert_eq!(profiles.len(), 1);
        assert_eq!(profiles[0].key, "good");
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(load_profiles_json("not json").is_err());
        assert!(load_pack_json(r#"{"name": "x"}"#).is_err());
    }

    #[test]
    fn register_pack_applies_first_wins_across_packs() {
        let pack_b = r#"{
            "name": "Pack B",
            "profiles": [
                {"key": "mass", "upgrade_object": "Copycat Upgrade", "base_multiplier": 99.0},
                {"key": "extra", "upgrade_object": "Extra Upgrade"}
            ]
        }"#;

        let mut registry = ProfileRegistry::new();
        assert_eq!(register_pack(&mut registry, PACK_A).unwrap(), 2);
        assert_eq!(register_pack(&mut registry, pack_b).unwrap(), 1);
        assert_eq!(registry.len(), 3);

        let kept = registry.get("mass").unwrap();
        assert_eq!(kept.upgrade_object, "Mass Production Upgrade");
        assert!((kept.base_multiplier - 10.0).abs() < f64::EPSILON);
    }

    #[test]
    fn pack_fields_flow_into_engine_profiles() {
        let (name, profiles) = load_pack_json(PACK_A).unwrap();
        assert_eq!(name, "Pack A");
        let quality = profiles.iter().find(|p| p.key == "quality").unwrap();
        assert_eq!(quality.quality, QualityMode::Gold);
        assert_eq!(quality.fuel_ignore, vec!["Coal"]);
        assert_eq!(quality.scaled_fuel_input(1, 382, "Coal"), 0);
    }
}
