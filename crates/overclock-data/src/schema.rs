//! Serde data file structs for scaling profile packs.
//!
//! These structs define the JSON format third-party packs author profiles
//! in. Every numeric field has the documented default so a minimal entry is
//! just a key and an upgrade object name. They are deserialized here and
//! resolved into engine types by the loader.

use serde::Deserialize;

// ===========================================================================
// Packs
// ===========================================================================

/// A whole profile pack: a display name plus its profile entries.
#[derive(Debug, Clone, Deserialize)]
pub struct PackData {
    pub name: String,
    pub profiles: Vec<ProfileData>,
}

// ===========================================================================
// Profiles
// ===========================================================================

/// One scaling profile entry in a data file.
#[derive(Debug, Clone, Deserialize)]
pub struct ProfileData {
    pub key: String,
    /// Name of the item that grants this upgrade.
    pub upgrade_object: String,
    #[serde(default = "default_base_multiplier")]
    pub base_multiplier: f64,
    #[serde(default)]
    pub input_static_delta: i32,
    #[serde(default)]
    pub output_static_delta: i32,
    #[serde(default)]
    pub input_multiplier: f64,
    #[serde(default)]
    pub output_multiplier: f64,
    #[serde(default)]
    pub output_multiplier_min: f64,
    #[serde(default)]
    pub output_multiplier_max: f64,
    #[serde(default = "default_time_multiplier")]
    pub time_multiplier: f64,
    #[serde(default)]
    pub input_requirement_mode: InputModeData,
    #[serde(default)]
    pub quality_mode: QualityModeData,
    #[serde(default)]
    pub unlock_conditions: UnlockConditionsData,
    #[serde(default)]
    pub fuel_ignore_keys: Vec<String>,
}

fn default_base_multiplier() -> f64 {
    10.0
}

fn default_time_multiplier() -> f64 {
    1.0
}

/// Which machines an upgrade applies to.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputModeData {
    #[default]
    InputRequired,
    NoInputsOnly,
    NoRequirements,
}

/// Output quality policy of an upgrade.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityModeData {
    #[default]
    NoStars,
    Silver,
    Gold,
    Iridium,
    KeepInput,
}

/// Progress gates on learning an upgrade.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UnlockConditionsData {
    #[serde(default)]
    pub total_earnings: Option<u64>,
    #[serde(default)]
    pub unlocked_upgrade: Option<String>,
    #[serde(default)]
    pub is_endgame: Option<bool>,
}

// ===========================================================================
// Tests
// ===========================================================================
