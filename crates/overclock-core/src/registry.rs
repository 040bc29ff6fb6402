//! Profile and machine registries.
//!
//! Scaling profiles arrive from content packages; base machines from the
//! rule framework's configuration. Both are registered once at session
//! start and frozen. Upgraded-machine definitions are derived lazily from
//! (profile x base machine), never pre-enumerated.

use crate::machine::{Season, Weather, WorldSnapshot};
use crate::scaling::{InputMode, ScalingProfile};
use std::collections::HashMap;

// ---------------------------------------------------------------------------
// Profile registry
// ---------------------------------------------------------------------------

/// All loaded scaling profiles, keyed by profile key.
///
/// Duplicate keys are a data-integrity defect, not a crash: the first
/// registration wins and later ones are logged and discarded.
#[derive(Debug, Clone, Default)]
pub struct ProfileRegistry {
    profiles: HashMap<String, ScalingProfile>,
    /// Insertion order, for stable iteration.
    order: Vec<String>,
}

impl ProfileRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a profile. Returns false (and keeps the existing profile)
    /// when the key is already taken.
    pub fn register(&mut self, profile: ScalingProfile) -> bool {
        if self.profiles.contains_key(&profile.key) {
            tracing::warn!(
                key = %profile.key,
                "duplicate scaling profile key; keeping the first registration"
            );
            return false;
        }
        self.order.push(profile.key.clone());
        self.profiles.insert(profile.key.clone(), profile);
        true
    }

    pub fn get(&self, key: &str) -> Option<&ScalingProfile> {
        self.profiles.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ScalingProfile> {
        self.order.iter().filter_map(|k| self.profiles.get(k))
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    /// Find the profile granted by an upgrade item, by item name.
    pub fn find_by_upgrade_item(&self, item_name: &str) -> Option<&ScalingProfile> {
        self.iter().find(|p| p.upgrade_object == item_name)
    }

    pub fn clear(&mut self) {
        self.profiles.clear();
        self.order.clear();
    }
}

// ---------------------------------------------------------------------------
// Base machines
// ---------------------------------------------------------------------------

/// Per-base-machine configuration: whether it takes input, what it refuses,
/// and the external conditions under which it runs. Empty condition lists
/// mean "no restriction".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseMachine {
    pub name: String,
    pub input_mode: InputMode,
    /// Inputs this machine kind never accepts, independent of any rule's
    /// own exclusion set.
    pub blacklist: Vec<String>,
    /// No-input machines that start producing the moment they are placed.
    pub starts_on_placement: bool,
    pub allowed_seasons: Vec<Season>,
    pub allowed_weather: Vec<Weather>,
    pub allowed_locations: Vec<String>,
    /// Inclusive minutes-of-day window the machine operates in.
    pub working_time: Option<(u32, u32)>,
    /// Show the alternate sprite frame while producing.
    pub alternate_frame_producing: bool,
    /// The machine casts light while producing.
    pub light_while_working: bool,
}

impl BaseMachine {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            input_mode: InputMode::InputRequired,
            blacklist: Vec::new(),
            starts_on_placement: false,
            allowed_seasons: Vec::new(),
            allowed_weather: Vec::new(),
            allowed_locations: Vec::new(),
            working_time: None,
            alternate_frame_producing: false,
            light_while_working: false,
        }
    }

    pub fn with_input_mode(mut self, mode: InputMode) -> Self {
        self.input_mode = mode;
        self
    }

    pub fn with_blacklist(mut self, blacklist: Vec<String>) -> Self {
        self.blacklist = blacklist;
        self
    }

    pub fn starts_on_placement(mut self) -> Self {
        self.starts_on_placement = true;
        self
    }

    pub fn with_seasons(mut self, seasons: Vec<Season>) -> Self {
        self.allowed_seasons = seasons;
        self
    }

    /// This machine produces without being fed input.
    pub fn is_no_input(&self) -> bool {
        self.input_mode != InputMode::InputRequired
    }

    pub fn check_season(&self, world: &WorldSnapshot) -> bool {
        self.allowed_seasons.is_empty() || self.allowed_seasons.contains(&world.season)
    }

    pub fn check_weather(&self, world: &WorldSnapshot) -> bool {
        self.allowed_weather.is_empty() || self.allowed_weather.contains(&world.weather)
    }

    pub fn check_location(&self, location: &str) -> bool {
        self.allowed_locations.is_empty() || self.allowed_locations.iter().any(|l| l == location)
    }

    pub fn check_time(&self, world: &WorldSnapshot) -> bool {
        match self.working_time {
            None => true,
            Some((begin, end)) => world.time_of_day >= begin && world.time_of_day <= end,
        }
    }

    /// All four external condition checks together.
    pub fn conditions_met(&self, world: &WorldSnapshot, location: &str) -> bool {
        self.check_season(world)
            && self.check_weather(world)
            && self.check_location(location)
            && self.check_time(world)
    }
}

// ---------------------------------------------------------------------------
// Machine catalog
// ---------------------------------------------------------------------------

/// The effective definition of an upgraded machine: a base machine paired
/// with a scaling profile. Derived on lookup, never stored.
#[derive(Debug, Clone, Copy)]
pub struct MachineDefinition<'a> {
    base: &'a BaseMachine,
    profile: &'a ScalingProfile,
}

impl<'a> MachineDefinition<'a> {
    pub fn base(&self) -> &'a BaseMachine {
        self.base
    }

    pub fn profile(&self) -> &'a ScalingProfile {
        self.profile
    }

    pub fn base_name(&self) -> &'a str {
        &self.base.name
    }

    pub fn blacklist(&self) -> &'a [String] {
        &self.base.blacklist
    }
}

/// Owns the loaded profiles and base machines, and answers definition
/// lookups.
#[derive(Debug, Clone, Default)]
pub struct MachineCatalog {
    profiles: ProfileRegistry,
    bases: HashMap<String, BaseMachine>,
}

impl MachineCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_profile(&mut self, profile: ScalingProfile) -> bool {
        self.profiles.register(profile)
    }

    pub fn register_base(&mut self, base: BaseMachine) {
        self.bases.insert(base.name.clone(), base);
    }

    pub fn profiles(&self) -> &ProfileRegistry {
        &self.profiles
    }

    /// Mutable registry access for content loaders.
    pub fn profiles_mut(&mut self) -> &mut ProfileRegistry {
        &mut self.profiles
    }

    pub fn base(&self, name: &str) -> Option<&BaseMachine> {
        self.bases.get(name)
    }

    /// Resolve the definition for a base machine under a profile key.
    /// `None` when either half is unknown.
    pub fn definition(&self, base_name: &str, profile_key: &str) -> Option<MachineDefinition<'_>> {
        let base = self.bases.get(base_name)?;
        let profile = self.profiles.get(profile_key)?;
        Some(MachineDefinition { base, profile })
    }

    /// Every definition sharing this base identity, one per loaded profile.
    pub fn all_for<'a>(
        &'a self,
        base_name: &str,
    ) -> impl Iterator<Item = MachineDefinition<'a>> + 'a {
        let base = self.bases.get(base_name);
        self.profiles
            .iter()
            .filter_map(move |profile| base.map(|base| MachineDefinition { base, profile }))
    }

    /// Drop all loaded content. Called at the start of each session before
    /// reloading.
    pub fn clear(&mut self) {
        self.profiles.clear();
        self.bases.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::machine::{Season, Weather};

    fn catalog() -> MachineCatalog {
        let mut c = MachineCatalog::new();
        c.register_base(BaseMachine::new("Keg"));
        c.register_base(
            BaseMachine::new("Worm Bin")
                .with_input_mode(InputMode::NoInputsOnly)
                .starts_on_placement(),
        );
        c.register_profile(ScalingProfile::new("mass", "Mass Upgrade"));
        c.register_profile(ScalingProfile::new("quality", "Quality Upgrade"));
        c
    }

    #[test]
    fn duplicate_profile_key_keeps_first() {
        let mut registry = ProfileRegistry::new();
        let mut first = ScalingProfile::new("mass", "First Upgrade");
        first.base_multiplier = 10.0;
        let mut second = ScalingProfile::new("mass", "Second Upgrade");
        second.base_multiplier = 99.0;

        assert!(registry.register(first));
        assert!(!registry.register(second));
        assert_eq!(registry.len(), 1);

        let kept = registry.get("mass").unwrap();
        assert_eq!(kept.upgrade_object, "First Upgrade");
        assert_eq!(kept.base_multiplier, 10.0);
    }

    #[test]
    fn find_by_upgrade_item() {
        let c = catalog();
        let p = c.profiles().find_by_upgrade_item("Quality Upgrade").unwrap();
        assert_eq!(p.key, "quality");
        assert!(c.profiles().find_by_upgrade_item("Nothing").is_none());
    }

    #[test]
    fn definition_composes_base_and_profile() {
        let c = catalog();
        let def = c.definition("Keg", "mass").unwrap();
        assert_eq!(def.base_name(), "Keg");
        assert_eq!(def.profile().key, "mass");

        assert!(c.definition("Keg", "missing").is_none());
        assert!(c.definition("Loom", "mass").is_none());
    }

    #[test]
    fn all_for_yields_one_definition_per_profile() {
        let c = catalog();
        let keys: Vec<String> = c
            .all_for("Keg")
            .map(|d| d.profile().key.clone())
            .collect();
        assert_eq!(keys, vec!["mass".to_string(), "quality".to_string()]);
        assert_eq!(c.all_for("Loom").count(), 0);
    }

    #[test]
    fn empty_condition_lists_mean_unrestricted() {
        let base = BaseMachine::new("Keg");
        let world = WorldSnapshot::new(Season::Winter, Weather::Stormy, 2500);
        assert!(base.conditions_met(&world, "Desert"));
    }

    #[test]
    fn season_condition_gates() {
        let bin = BaseMachine::new("Worm Bin").with_seasons(vec![Season::Spring, Season::Summer]);
        let spring = WorldSnapshot::new(Season::Spring, Weather::Sunny, 600);
        let winter = WorldSnapshot::new(Season::Winter, Weather::Sunny, 600);
        assert!(bin.conditions_met(&spring, "Farm"));
        assert!(!bin.conditions_met(&winter, "Farm"));
    }

    #[test]
    fn time_window_condition() {
        let mut mill = BaseMachine::new("Mill");
        mill.working_time = Some((600, 1800));
        let morning = WorldSnapshot::new(Season::Spring, Weather::Sunny, 900);
        let night = WorldSnapshot::new(Season::Spring, Weather::Sunny, 2400);
        assert!(mill.check_time(&morning));
        assert!(!mill.check_time(&night));
    }

    #[test]
    fn clear_empties_everything() {
        let mut c = catalog();
        c.clear();
        assert!(c.profiles().is_empty());
        assert!(c.base("Keg").is_none());
    }
}
