//! Scaling profiles: pure numeric transforms over a base machine's input,
//! fuel, output, time and quality.
//!
//! A profile never stores rule data. It rescales the quantities of whatever
//! rule the matcher selects, so one rule definition serves every upgraded
//! variant of a machine.

use crate::rng::SimRng;
use serde::{Deserialize, Serialize};

/// Ten times more input and output than the base machine, by default.
pub const STANDARD_BASE_MULTIPLIER: f64 = 10.0;

// ---------------------------------------------------------------------------
// Profile enums
// ---------------------------------------------------------------------------

/// Whether an upgrade applies to machines that take inputs, machines that
/// start on their own, or both.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum InputMode {
    #[default]
    InputRequired,
    NoInputsOnly,
    NoRequirements,
}

/// What quality of output an upgraded machine produces. Overrides the base
/// rule's quality unless stated otherwise.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum QualityMode {
    #[default]
    NoStars,
    Silver,
    Gold,
    Iridium,
    KeepInput,
}

impl QualityMode {
    /// The fixed quality tier this mode pins output to. `KeepInput` has no
    /// fixed tier and returns 0.
    pub fn fixed_tier(self) -> i32 {
        match self {
            QualityMode::NoStars | QualityMode::KeepInput => 0,
            QualityMode::Silver => 1,
            QualityMode::Gold => 2,
            QualityMode::Iridium => 3,
        }
    }
}

// ---------------------------------------------------------------------------
// Unlock conditions
// ---------------------------------------------------------------------------

/// Conditions gating when the player may learn an upgrade. Free-form in the
/// data files; these are the recognized keys.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UnlockConditions {
    pub total_earnings: Option<u64>,
    pub unlocked_upgrade: Option<String>,
    pub is_endgame: Option<bool>,
}

/// What the core needs to know about player progress to evaluate unlock
/// conditions. Implemented by the host.
pub trait ProgressView {
    fn total_earnings(&self) -> u64;
    fn knows_upgrade(&self, profile_key: &str) -> bool;
    fn is_endgame(&self) -> bool;
}

// ---------------------------------------------------------------------------
// Scaling profile
// ---------------------------------------------------------------------------

/// A named scaling configuration applied to a base machine.
///
/// Immutable once loaded. Profile keys are unique within the loaded set;
/// the registry rejects duplicates at load time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalingProfile {
    pub key: String,
    /// Name of the item that grants this upgrade. Returned to the player
    /// when an upgraded machine is destroyed.
    pub upgrade_object: String,
    pub base_multiplier: f64,
    pub input_static_delta: i32,
    pub output_static_delta: i32,
    pub input_multiplier: f64,
    pub output_multiplier: f64,
    pub output_multiplier_min: f64,
    pub output_multiplier_max: f64,
    pub time_multiplier: f64,
    pub input_mode: InputMode,
    pub quality: QualityMode,
    pub unlock_conditions: UnlockConditions,
    /// Fuel ids or names exempted from scaling and from the requirement
    /// entirely.
    pub fuel_ignore: Vec<String>,
}

impl ScalingProfile {
    /// A profile with the standard multiplier and no other adjustments.
    pub fn new(key: impl Into<String>, upgrade_object: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            upgrade_object: upgrade_object.into(),
            base_multiplier: STANDARD_BASE_MULTIPLIER,
            input_static_delta: 0,
            output_static_delta: 0,
            input_multiplier: 0.0,
            output_multiplier: 0.0,
            output_multiplier_min: 0.0,
            output_multiplier_max: 0.0,
            time_multiplier: 1.0,
            input_mode: InputMode::InputRequired,
            quality: QualityMode::NoStars,
            unlock_conditions: UnlockConditions::default(),
            fuel_ignore: Vec::new(),
        }
    }

    /// The no-op profile applied to machines with no upgrade record:
    /// quantities and times pass through unchanged.
    pub fn identity() -> Self {
        Self {
            base_multiplier: 1.0,
            ..Self::new("", "")
        }
    }

    /// Scaled primary-input requirement.
    ///
    /// A base stack of 0 means the rule requires no input, and stays 0.
    /// Anything else scales to at least 1.
    pub fn scaled_input(&self, base_stack: u32) -> u32 {
        if base_stack == 0 {
            return 0;
        }

        let multiplier = (self.base_multiplier + self.input_multiplier).max(1.0);
        let scaled = (f64::from(base_stack) * multiplier).ceil() as i64 + i64::from(self.input_static_delta);
        scaled.max(1) as u32
    }

    /// Scaled fuel requirement. Fuels on the ignore list (by numeric id or
    /// resolved display name) are exempted entirely and require 0.
    pub fn scaled_fuel_input(&self, base_stack: u32, fuel_id: i32, fuel_name: &str) -> u32 {
        let id_string = fuel_id.to_string();
        if self
            .fuel_ignore
            .iter()
            .any(|ignored| *ignored == id_string || ignored == fuel_name)
        {
            return 0;
        }
        self.scaled_input(base_stack)
    }

    /// Scaled output quantity, with a bounded random addend drawn from the
    /// shared session RNG.
    pub fn scaled_output(&self, base_stack: u32, rng: &mut SimRng) -> u32 {
        let bonus = rng.uniform(self.output_multiplier_min, self.output_multiplier_max);
        let multiplier = (self.base_multiplier + self.output_multiplier + bonus).max(1.0);
        let scaled =
            (f64::from(base_stack) * multiplier).ceil() as i64 + i64::from(self.output_static_delta);
        scaled.max(1) as u32
    }

    /// Scaled processing time. Always a multiple of 10 time-units; the
    /// quantization is a hard contract of the time system, not a rounding
    /// artifact.
    pub fn scaled_time(&self, base_minutes: u32) -> u32 {
        let scaled = (f64::from(base_minutes) / 10.0 * self.time_multiplier).round() as i64 * 10;
        scaled.max(0) as u32
    }

    /// The quality tier of the final output.
    ///
    /// `KeepInput` passes the input's quality through; `NoStars` strips
    /// stars. Otherwise the profile's fixed tier applies, except when the
    /// selected variant keeps input quality and already computed a tier at
    /// least as high -- the profile tier wins only if strictly higher.
    pub fn output_quality(
        &self,
        input_quality: i32,
        variant_keeps_input: bool,
        variant_quality: i32,
    ) -> i32 {
        match self.quality {
            QualityMode::KeepInput => input_quality,
            QualityMode::NoStars => 0,
            _ => {
                let tier = self.quality.fixed_tier();
                if variant_keeps_input && tier <= variant_quality {
                    variant_quality
                } else {
                    tier
                }
            }
        }
    }

    /// Whether the player may learn this upgrade yet.
    pub fn is_unlocked(&self, progress: &dyn ProgressView) -> bool {
        let cond = &self.unlock_conditions;

        if let Some(threshold) = cond.total_earnings
            && progress.total_earnings() < threshold
        {
            return false;
        }
        if let Some(required) = &cond.unlocked_upgrade
            && !progress.knows_upgrade(required)
        {
            return false;
        }
        if cond.is_endgame == Some(true) && !progress.is_endgame() {
            return false;
        }

        true
    }
}
