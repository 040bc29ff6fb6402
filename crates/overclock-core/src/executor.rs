//! The production executor: the generic pipeline shared by every machine
//! kind, plus the engine state object that owns all loaded content.
//!
//! A production attempt is all-or-nothing. Every requirement (primary input
//! and every fuel) is reserved against the ingredient source before anything
//! is withdrawn; any unsatisfiable requirement abandons the candidate with
//! the source untouched. Restrictions are ordinary values, never unwinding.

use crate::id::IngredientKey;
use crate::item::ItemStack;
use crate::machine::{Machine, WorldSnapshot};
use crate::overrides::OverrideRegistry;
use crate::registry::{BaseMachine, MachineCatalog};
use crate::rng::SimRng;
use crate::rules::{
    FuelRequirement, OutputVariant, ProducerRule, RuleSet, choose_output_variant,
    is_input_excluded,
};
use crate::scaling::{InputMode, ScalingProfile};
use crate::source::{IngredientSource, Reservation};
use crate::tracker::{TrackerError, UpgradeTracker};

// ---------------------------------------------------------------------------
// Attempt results
// ---------------------------------------------------------------------------

/// Why a production attempt was refused. Returned as a value; the automated
/// path discards it silently, the manual path shows it to the player.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Restriction {
    #[error("{required}x {name} required")]
    InsufficientInput { name: String, required: u32 },
    #[error("{required}x {name} required as fuel")]
    InsufficientFuel { name: String, required: u32 },
    #[error("this machine cannot work here right now")]
    ConditionsNotMet,
}

/// Outcome of one production attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attempt {
    /// Production started (or, for a probe, would be accepted).
    Produced,
    /// Nothing applicable; not an error.
    NoMatch,
    /// A rule matched but a requirement blocked it.
    Restricted(Restriction),
}

impl Attempt {
    pub fn produced(&self) -> bool {
        matches!(self, Attempt::Produced)
    }
}

// ---------------------------------------------------------------------------
// Upgrade application
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UpgradeError {
    #[error("no upgrade profile is granted by {0:?}")]
    UnknownUpgradeItem(String),
    #[error("machine is already upgraded with profile {0:?}")]
    AlreadyUpgraded(String),
    #[error("machine is mid-production")]
    Busy,
    #[error("this upgrade does not fit this machine's input mode")]
    IncompatibleInputMode,
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// All engine state for one loaded session: content registries, the upgrade
/// tracker, the override dispatch table and the session RNG.
///
/// Content is cleared and reloaded at each session boundary; overrides are
/// registered once at construction and live for the engine's lifetime.
pub struct ProductionEngine {
    pub catalog: MachineCatalog,
    pub rules: RuleSet,
    pub tracker: UpgradeTracker,
    pub overrides: OverrideRegistry,
    pub rng: SimRng,
}

impl ProductionEngine {
    pub fn new(seed: u64) -> Self {
        Self {
            catalog: MachineCatalog::new(),
            rules: RuleSet::new(),
            tracker: UpgradeTracker::new(),
            overrides: OverrideRegistry::with_builtins(),
            rng: SimRng::new(seed),
        }
    }

    /// Begin a session: drop all loaded content and tracked upgrades, then
    /// restore the tracker from saved data if any. An unreadable blob is a
    /// configuration defect, not a crash: log it and start with nothing
    /// tracked.
    pub fn start_session(&mut self, saved_tracker: Option<&[u8]>) {
        self.catalog.clear();
        self.rules = RuleSet::new();
        self.tracker.clear();
        if let Some(blob) = saved_tracker
            && let Err(error) = self.tracker.load_blob(blob)
        {
            tracing::warn!(
                %error,
                "saved upgrade data is unreadable; starting with no tracked upgrades"
            );
            self.tracker.clear();
        }
    }

    /// Serialize the tracker for the host's save data, under
    /// [`crate::tracker::SAVE_KEY`].
    pub fn save_tracker(&self) -> Result<Vec<u8>, TrackerError> {
        self.tracker.to_blob()
    }

    /// The profile key this machine instance is upgraded with, if any.
    pub fn upgrade_key(&self, machine: &Machine) -> Option<&str> {
        self.tracker.get(&machine.location, machine.tile)
    }

    /// Apply an upgrade item to a machine instance.
    pub fn apply_upgrade(
        &mut self,
        machine: &Machine,
        upgrade_item_name: &str,
    ) -> Result<(), UpgradeError> {
        let profile = self
            .catalog
            .profiles()
            .find_by_upgrade_item(upgrade_item_name)
            .ok_or_else(|| UpgradeError::UnknownUpgradeItem(upgrade_item_name.to_string()))?;
        if let Some(existing) = self.tracker.get(&machine.location, machine.tile) {
            return Err(UpgradeError::AlreadyUpgraded(existing.to_string()));
        }
        if machine.runtime.held_output.is_some() {
            return Err(UpgradeError::Busy);
        }

        let no_input = self
            .catalog
            .base(&machine.base_name)
            .is_some_and(BaseMachine::is_no_input);
        let compatible = match profile.input_mode {
            InputMode::NoRequirements => true,
            InputMode::InputRequired => !no_input,
            InputMode::NoInputsOnly => no_input,
        };
        if !compatible {
            return Err(UpgradeError::IncompatibleInputMode);
        }

        self.tracker
            .set(&machine.location, machine.tile, Some(&profile.key));
        Ok(())
    }

    /// Remove a machine's upgrade (the machine was destroyed or picked up).
    /// Returns the name of the upgrade item to give back.
    pub fn remove_upgrade(&mut self, machine: &Machine) -> Option<String> {
        let key = self.tracker.remove(&machine.location, machine.tile)?;
        let refund = self
            .catalog
            .profiles()
            .get(&key)
            .map(|p| p.upgrade_object.clone());
        if refund.is_none() {
            tracing::warn!(key = %key, "removed upgrade references an unloaded profile");
        }
        refund
    }

    // -----------------------------------------------------------------------
    // Production pipeline
    // -----------------------------------------------------------------------

    /// Try to start production by pulling from an ingredient source.
    ///
    /// Candidates are tried in the source's enumeration order; the first
    /// stack with a matching rule, no exclusion and satisfiable requirements
    /// wins. A candidate whose fuels cannot be satisfied is abandoned with
    /// the source untouched and the next candidate is tried.
    pub fn attempt_input(
        &mut self,
        machine: &mut Machine,
        source: &mut dyn IngredientSource,
        world: &WorldSnapshot,
    ) -> Attempt {
        if machine.runtime.held_output.is_some() {
            return Attempt::NoMatch;
        }

        let base = self.catalog.base(&machine.base_name);
        if let Some(base) = base
            && !(base.check_location(&machine.location) && base.check_season(world))
        {
            return Attempt::Restricted(Restriction::ConditionsNotMet);
        }

        let identity = ScalingProfile::identity();
        let profile = self
            .tracker
            .get(&machine.location, machine.tile)
            .and_then(|key| self.catalog.profiles().get(key))
            .unwrap_or(&identity);
        let blacklist: &[String] = base.map_or(&[], |b| &b.blacklist);

        for candidate in source.candidates() {
            let Some(rule) = self.rules.find_rule(&machine.base_name, Some(&candidate.kind))
            else {
                continue;
            };
            if is_input_excluded(rule, blacklist, &candidate.kind) {
                continue;
            }

            let required = profile.scaled_input(rule.input_stack);
            let mut demand = AttemptDemand::default();
            if !demand.claim(source, IngredientKey::Item(candidate.kind.id), required) {
                continue;
            }

            let variant = {
                let probe_source: &dyn IngredientSource = source;
                let demand = &demand;
                let mut probe = |fuel: &FuelRequirement| {
                    let quantity = fuel.scaled(profile);
                    quantity == 0
                        || probe_source.available(&fuel.key)
                            >= demand.claimed(&fuel.key) + quantity
                };
                choose_output_variant(rule, &mut self.rng, &mut probe, Some(&candidate.kind))
            };
            let Some(variant) = variant else {
                continue;
            };

            // Claim everything before withdrawing anything. Rule fuels
            // first, then the variant's own, in authored order; claims
            // sharing a key accumulate against one stock.
            let mut satisfiable = true;
            for fuel in rule.fuel.iter().chain(&variant.fuel) {
                if !demand.claim(source, fuel.key, fuel.scaled(profile)) {
                    satisfiable = false;
                    break;
                }
            }
            if !satisfiable {
                continue;
            }
            let Some(reservations) = demand.reserve_all(source) else {
                continue;
            };

            commit_reservations(source, &reservations);
            start_production(
                machine,
                base,
                profile,
                rule,
                variant,
                Some(&candidate),
                world,
                &mut self.rng,
            );
            return Attempt::Produced;
        }

        Attempt::NoMatch
    }

    /// Start a machine that produces without input, if it is eligible and
    /// idle. With a source, fuels are reserved and withdrawn; without one,
    /// fuels are assumed available (placement, where no storage is attached).
    pub fn try_no_input_start(
        &mut self,
        machine: &mut Machine,
        mut source: Option<&mut dyn IngredientSource>,
        world: &WorldSnapshot,
    ) -> Attempt {
        if machine.runtime.held_output.is_some() {
            return Attempt::NoMatch;
        }
        let Some(base) = self.catalog.base(&machine.base_name) else {
            return Attempt::NoMatch;
        };

        let identity = ScalingProfile::identity();
        let profile = self
            .tracker
            .get(&machine.location, machine.tile)
            .and_then(|key| self.catalog.profiles().get(key))
            .unwrap_or(&identity);

        if !(base.is_no_input() || profile.input_mode != InputMode::InputRequired) {
            return Attempt::NoMatch;
        }
        if !base.conditions_met(world, &machine.location) {
            return Attempt::Restricted(Restriction::ConditionsNotMet);
        }
        let Some(rule) = self.rules.find_rule(&machine.base_name, None) else {
            return Attempt::NoMatch;
        };

        let variant = {
            let mut probe = |fuel: &FuelRequirement| {
                let quantity = fuel.scaled(profile);
                quantity == 0
                    || source
                        .as_deref()
                        .is_none_or(|s| s.available(&fuel.key) >= quantity)
            };
            choose_output_variant(rule, &mut self.rng, &mut probe, None)
        };
        let Some(variant) = variant else {
            return Attempt::NoMatch;
        };

        if let Some(source) = source.as_deref_mut() {
            let mut demand = AttemptDemand::default();
            for fuel in rule.fuel.iter().chain(&variant.fuel) {
                let quantity = fuel.scaled(profile);
                if !demand.claim(source, fuel.key, quantity) {
                    return Attempt::Restricted(Restriction::InsufficientFuel {
                        name: fuel.name.clone(),
                        required: quantity,
                    });
                }
            }
            let Some(reservations) = demand.reserve_all(source) else {
                return Attempt::NoMatch;
            };
            commit_reservations(source, &reservations);
        }

        start_production(
            machine,
            Some(base),
            profile,
            rule,
            variant,
            None,
            world,
            &mut self.rng,
        );
        Attempt::Produced
    }

    /// Manual insertion of a held stack, with fuels drawn from the actor's
    /// inventory. With `probe` set, reports whether the stack would be
    /// accepted and mutates nothing (not even the RNG).
    pub fn drop_in(
        &mut self,
        machine: &mut Machine,
        stack: &mut ItemStack,
        probe: bool,
        fuel_source: &mut dyn IngredientSource,
        world: &WorldSnapshot,
    ) -> Attempt {
        if machine.runtime.held_output.is_some() || stack.quantity == 0 {
            return Attempt::NoMatch;
        }

        let base = self.catalog.base(&machine.base_name);
        if let Some(base) = base
            && !(base.check_location(&machine.location) && base.check_season(world))
        {
            return Attempt::Restricted(Restriction::ConditionsNotMet);
        }

        let identity = ScalingProfile::identity();
        let profile = self
            .tracker
            .get(&machine.location, machine.tile)
            .and_then(|key| self.catalog.profiles().get(key))
            .unwrap_or(&identity);
        let blacklist: &[String] = base.map_or(&[], |b| &b.blacklist);

        let Some(rule) = self.rules.find_rule(&machine.base_name, Some(&stack.kind)) else {
            return Attempt::NoMatch;
        };
        if is_input_excluded(rule, blacklist, &stack.kind) {
            return Attempt::NoMatch;
        }

        let required = profile.scaled_input(rule.input_stack);
        if stack.quantity < required {
            return Attempt::Restricted(Restriction::InsufficientInput {
                name: stack.kind.name.clone(),
                required,
            });
        }
        let mut demand = AttemptDemand::default();
        for fuel in &rule.fuel {
            let quantity = fuel.scaled(profile);
            if !demand.claim(fuel_source, fuel.key, quantity) {
                return Attempt::Restricted(Restriction::InsufficientFuel {
                    name: fuel.name.clone(),
                    required: quantity,
                });
            }
        }
        if probe {
            return Attempt::Produced;
        }

        let variant = {
            let probe_source: &dyn IngredientSource = fuel_source;
            let demand = &demand;
            let mut probe = |fuel: &FuelRequirement| {
                let quantity = fuel.scaled(profile);
                quantity == 0
                    || probe_source.available(&fuel.key) >= demand.claimed(&fuel.key) + quantity
            };
            choose_output_variant(rule, &mut self.rng, &mut probe, Some(&stack.kind))
        };
        let Some(variant) = variant else {
            return Attempt::NoMatch;
        };

        // Rule fuels are already in the ledger; the variant's own stack on
        // top of them.
        for fuel in &variant.fuel {
            let quantity = fuel.scaled(profile);
            if !demand.claim(fuel_source, fuel.key, quantity) {
                return Attempt::Restricted(Restriction::InsufficientFuel {
                    name: fuel.name.clone(),
                    required: quantity,
                });
            }
        }
        let Some(reservations) = demand.reserve_all(fuel_source) else {
            return Attempt::NoMatch;
        };
        commit_reservations(fuel_source, &reservations);

        let input_snapshot = stack.clone();
        stack.quantity -= required;
        start_production(
            machine,
            base,
            profile,
            rule,
            variant,
            Some(&input_snapshot),
            world,
            &mut self.rng,
        );
        Attempt::Produced
    }

    /// Reset a machine's production state. Collection, destruction and
    /// session teardown all pass through here.
    pub fn clear_production(&self, machine: &mut Machine) {
        machine.runtime.held_output = None;
        machine.runtime.ready_in_minutes = -1;
        machine.runtime.ready_for_harvest = false;
        machine.runtime.show_alternate_frame = false;
        machine.runtime.lit = false;
    }

    /// Collection-time top-up for rules that re-resolve their input when
    /// ready. Only upgraded machines rescale here; the held item identity is
    /// kept and its quantity and quality are recomputed as though the input
    /// had just been found.
    pub fn prepare_output(&mut self, machine: &mut Machine, found_input: Option<&ItemStack>) {
        let Some(profile) = self
            .tracker
            .get(&machine.location, machine.tile)
            .and_then(|key| self.catalog.profiles().get(key))
        else {
            return;
        };
        let Some(held_id) = machine.runtime.held_output.as_ref().map(|h| h.kind.id) else {
            return;
        };

        for rule in self.rules.rules_for(&machine.base_name) {
            if !rule.look_for_input_when_ready {
                continue;
            }
            let Some(variant) = rule.outputs.iter().find(|v| v.item.id == held_id) else {
                continue;
            };

            let quantity = profile.scaled_output(variant.quantity, &mut self.rng);
            let input_quality = found_input.map_or(0, |s| s.quality);
            let variant_quality = if variant.keep_input_quality {
                input_quality
            } else {
                0
            };
            let quality =
                profile.output_quality(input_quality, variant.keep_input_quality, variant_quality);
            if let Some(held) = machine.runtime.held_output.as_mut() {
                held.quantity = quantity;
                held.quality = quality;
            }
            return;
        }
    }
}

// ---------------------------------------------------------------------------
// Per-attempt demand accounting
// ---------------------------------------------------------------------------

/// Running total of what one attempt has claimed per ingredient key.
///
/// Requirements sharing a key (a rule fuel repeated by a variant, a fuel
/// that is also the primary input) must be checked against the attempt's
/// aggregate, not each in isolation; otherwise two claims can both pass on
/// stock that covers only one of them.
#[derive(Debug, Default)]
struct AttemptDemand {
    claims: Vec<(IngredientKey, u32)>,
}

impl AttemptDemand {
    /// Quantity already claimed under this key.
    fn claimed(&self, key: &IngredientKey) -> u32 {
        self.claims
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, q)| q)
            .sum()
    }

    /// Record `quantity` more of `key` if the source covers the running
    /// total. Zero quantities are trivially satisfied and not recorded.
    fn claim(&mut self, source: &dyn IngredientSource, key: IngredientKey, quantity: u32) -> bool {
        if quantity == 0 {
            return true;
        }
        if source.available(&key) < self.claimed(&key) + quantity {
            return false;
        }
        self.claims.push((key, quantity));
        true
    }

    /// One reservation per distinct key, at the aggregate quantity.
    fn reserve_all(&self, source: &dyn IngredientSource) -> Option<Vec<Reservation>> {
        let mut reservations: Vec<Reservation> = Vec::with_capacity(self.claims.len());
        for (key, _) in &self.claims {
            if reservations.iter().any(|r| r.key == *key) {
                continue;
            }
            reservations.push(source.reserve(key, self.claimed(key))?);
        }
        Some(reservations)
    }
}

// ---------------------------------------------------------------------------
// Commit
// ---------------------------------------------------------------------------

fn commit_reservations(source: &mut dyn IngredientSource, reservations: &[Reservation]) {
    for reservation in reservations {
        if !source.commit(reservation) {
            tracing::error!(
                ?reservation,
                "ingredient source changed between reserve and commit"
            );
        }
    }
}

/// Write the chosen variant into the machine: scaled output stack, quality,
/// quantized ready time, sprite and light flags.
#[allow(clippy::too_many_arguments)]
pub(crate) fn start_production(
    machine: &mut Machine,
    base: Option<&BaseMachine>,
    profile: &ScalingProfile,
    rule: &ProducerRule,
    variant: &OutputVariant,
    input: Option<&ItemStack>,
    world: &WorldSnapshot,
    rng: &mut SimRng,
) {
    let quantity = profile.scaled_output(variant.quantity, rng);
    let input_quality = input.map_or(0, |s| s.quality);
    let variant_quality = if variant.keep_input_quality {
        input_quality
    } else {
        0
    };
    let quality = profile.output_quality(input_quality, variant.keep_input_quality, variant_quality);

    let base_minutes = variant.minutes_until_ready.unwrap_or(rule.minutes_until_ready);
    let mut minutes = profile.scaled_time(base_minutes) as i32;
    if rule.subtract_time_of_day {
        minutes = (minutes - world.time_of_day as i32).max(1);
    }

    machine.runtime.held_output =
        Some(ItemStack::new(variant.item.clone(), quantity).with_quality(quality));
    machine.runtime.ready_in_minutes = minutes;
    machine.runtime.ready_for_harvest = minutes == 0;
    machine.runtime.show_alternate_frame = base.is_some_and(|b| b.alternate_frame_producing);
    machine.runtime.lit = base.is_some_and(|b| b.light_while_working);
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::TileCoord;
    use crate::item::{ItemKind, QUALITY_SILVER};
    use crate::machine::{Season, Weather};
    use crate::registry::BaseMachine;
    use crate::rules::{OutputVariant, ProducerRule};
    use crate::scaling::QualityMode;
    use crate::test_utils::{MemoryStorage, beer, coal, keg_wheat_rule, mass_profile, wheat};

    fn world() -> WorldSnapshot {
        WorldSnapshot::new(Season::Spring, Weather::Sunny, 600)
    }

    fn keg_engine() -> ProductionEngine {
        let mut engine = ProductionEngine::new(7);
        engine.catalog.register_base(BaseMachine::new("Keg"));
        engine.catalog.register_profile(mass_profile());
        engine.rules.add(keg_wheat_rule());
        engine
    }

    fn upgraded_keg(engine: &mut ProductionEngine) -> Machine {
        let machine = Machine::new("Keg", "Farm", TileCoord::new(3, 4));
        engine
            .tracker
            .set("Farm", machine.tile, Some("mass"));
        machine
    }

    // ---- Test 1: upgraded machine consumes and produces at scale ----
    #[test]
    fn upgraded_machine_scales_input_output_and_time() {
        let mut engine = keg_engine();
        let mut machine = upgraded_keg(&mut engine);
        let mut storage = MemoryStorage::new().with(ItemStack::new(wheat(), 25));

        let attempt = engine.attempt_input(&mut machine, &mut storage, &world());
        assert_eq!(attempt, Attempt::Produced);
        assert_eq!(storage.quantity_of(262), 15);

        let held = machine.runtime.held_output.as_ref().unwrap();
        assert_eq!(held.kind, beer());
        assert_eq!(held.quantity, 10);
        assert_eq!(held.quality, 0);
        assert_eq!(machine.runtime.ready_in_minutes, 1750);
        assert!(!machine.runtime.ready_for_harvest);
    }

    // ---- Test 2: unupgraded machine passes quantities through ----
    #[test]
    fn unupgraded_machine_uses_identity_scaling() {
        let mut engine = keg_engine();
        let mut machine = Machine::new("Keg", "Farm", TileCoord::new(3, 4));
        let mut storage = MemoryStorage::new().with(ItemStack::new(wheat(), 5));

        assert!(engine.attempt_input(&mut machine, &mut storage, &world()).produced());
        assert_eq!(storage.quantity_of(262), 4);
        assert_eq!(machine.runtime.held_output.as_ref().unwrap().quantity, 1);
    }

    // ---- Test 3: insufficient input leaves the source untouched ----
    #[test]
    fn insufficient_input_is_a_clean_no_match() {
        let mut engine = keg_engine();
        let mut machine = upgraded_keg(&mut engine);
        let mut storage = MemoryStorage::new().with(ItemStack::new(wheat(), 9));

        assert_eq!(engine.attempt_input(&mut machine, &mut storage, &world()), Attempt::NoMatch);
        assert_eq!(storage.quantity_of(262), 9);
        assert!(machine.runtime.held_output.is_none());
    }

    // ---- Test 4: fuel failure abandons the attempt atomically ----
    #[test]
    fn unsatisfiable_fuel_leaves_primary_input_untouched() {
        let mut engine = keg_engine();
        engine.rules = RuleSet::new();
        let mut rule = keg_wheat_rule();
        rule.fuel = vec![crate::rules::FuelRequirement::item(382, "Coal", 1)];
        engine.rules.add(rule);

        let mut machine = upgraded_keg(&mut engine);
        // Enough wheat, not enough coal for the scaled requirement of 10.
        let mut storage = MemoryStorage::new()
            .with(ItemStack::new(wheat(), 25))
            .with(ItemStack::new(coal(), 5));

        assert_eq!(engine.attempt_input(&mut machine, &mut storage, &world()), Attempt::NoMatch);
        assert_eq!(storage.quantity_of(262), 25);
        assert_eq!(storage.quantity_of(382), 5);
        assert!(machine.runtime.held_output.is_none());
    }

    // ---- Test 5: excluded candidate is skipped, next one is used ----
    #[test]
    fn excluded_candidate_falls_through_to_the_next() {
        let mut engine = ProductionEngine::new(7);
        engine
            .catalog
            .register_base(BaseMachine::new("Keg").with_blacklist(vec!["Wheat".to_string()]));
        engine.catalog.register_profile(mass_profile());
        engine.rules.add(
            ProducerRule::new("Keg", 600)
                .with_input("-75", 1) // any vegetable
                .with_output(OutputVariant::new(crate::test_utils::juice(), 1)),
        );

        let mut machine = upgraded_keg(&mut engine);
        let mut storage = MemoryStorage::new()
            .with(ItemStack::new(wheat(), 25))
            .with(ItemStack::new(crate::test_utils::potato(), 25));

        assert!(engine.attempt_input(&mut machine, &mut storage, &world()).produced());
        assert_eq!(storage.quantity_of(262), 25);
        assert_eq!(storage.quantity_of(192), 15);
    }

    // ---- Test 6: season condition blocks the attempt ----
    #[test]
    fn failed_season_condition_restricts() {
        let mut engine = ProductionEngine::new(7);
        engine
            .catalog
            .register_base(BaseMachine::new("Keg").with_seasons(vec![Season::Summer]));
        engine.catalog.register_profile(mass_profile());
        engine.rules.add(keg_wheat_rule());

        let mut machine = upgraded_keg(&mut engine);
        let mut storage = MemoryStorage::new().with(ItemStack::new(wheat(), 25));

        assert_eq!(
            engine.attempt_input(&mut machine, &mut storage, &world()),
            Attempt::Restricted(Restriction::ConditionsNotMet)
        );
        assert_eq!(storage.quantity_of(262), 25);
    }

    // ---- Test 7: drop-in probe mutates nothing ----
    #[test]
    fn drop_in_probe_has_no_side_effects() {
        let mut engine = keg_engine();
        let mut machine = upgraded_keg(&mut engine);
        let rng_before = engine.rng.clone();
        let mut hand = ItemStack::new(wheat(), 25);
        let mut inventory = MemoryStorage::new();

        let attempt = engine.drop_in(&mut machine, &mut hand, true, &mut inventory, &world());
        assert_eq!(attempt, Attempt::Produced);
        assert_eq!(hand.quantity, 25);
        assert!(machine.runtime.held_output.is_none());
        assert_eq!(engine.rng, rng_before);
    }

    // ---- Test 8: drop-in restriction names the shortfall ----
    #[test]
    fn drop_in_with_too_small_stack_is_restricted() {
        let mut engine = keg_engine();
        let mut machine = upgraded_keg(&mut engine);
        let mut hand = ItemStack::new(wheat(), 9);
        let mut inventory = MemoryStorage::new();

        let attempt = engine.drop_in(&mut machine, &mut hand, false, &mut inventory, &world());
        assert_eq!(
            attempt,
            Attempt::Restricted(Restriction::InsufficientInput {
                name: "Wheat".to_string(),
                required: 10,
            })
        );
        assert_eq!(hand.quantity, 9);
    }

    // ---- Test 9: drop-in reduces the hand stack by the scaled amount ----
    #[test]
    fn drop_in_consumes_from_the_hand_stack() {
        let mut engine = keg_engine();
        let mut machine = upgraded_keg(&mut engine);
        let mut hand = ItemStack::new(wheat(), 25);
        let mut inventory = MemoryStorage::new();

        assert!(engine
            .drop_in(&mut machine, &mut hand, false, &mut inventory, &world())
            .produced());
        assert_eq!(hand.quantity, 15);
        assert_eq!(machine.runtime.held_output.as_ref().unwrap().quantity, 10);
    }

    // ---- Test 10: input quality flows through KeepInput profiles ----
    #[test]
    fn keep_input_quality_profile_preserves_stars() {
        let mut engine = keg_engine();
        engine.catalog.clear();
        engine.catalog.register_base(BaseMachine::new("Keg"));
        let mut profile = mass_profile();
        profile.quality = QualityMode::KeepInput;
        engine.catalog.register_profile(profile);

        let mut machine = upgraded_keg(&mut engine);
        let mut hand = ItemStack::new(wheat(), 25).with_quality(QUALITY_SILVER);
        let mut inventory = MemoryStorage::new();

        assert!(engine
            .drop_in(&mut machine, &mut hand, false, &mut inventory, &world())
            .produced());
        assert_eq!(machine.runtime.held_output.as_ref().unwrap().quality, QUALITY_SILVER);
    }

    // ---- Test 11: no-input machine starts without a source ----
    #[test]
    fn no_input_machine_starts_on_placement() {
        let mut engine = ProductionEngine::new(7);
        engine.catalog.register_base(
            BaseMachine::new("Worm Bin")
                .with_input_mode(InputMode::NoInputsOnly)
                .starts_on_placement(),
        );
        let mut profile = mass_profile();
        profile.input_mode = InputMode::NoInputsOnly;
        engine.catalog.register_profile(profile);
        engine.rules.add(
            ProducerRule::new("Worm Bin", 2600)
                .with_output(OutputVariant::new(ItemKind::new(685, "Bait", -21), 1)),
        );

        let mut machine = Machine::new("Worm Bin", "Farm", TileCoord::new(1, 1));
        engine.tracker.set("Farm", machine.tile, Some("mass"));

        assert!(engine.try_no_input_start(&mut machine, None, &world()).produced());
        assert_eq!(machine.runtime.held_output.as_ref().unwrap().quantity, 10);
        assert_eq!(machine.runtime.ready_in_minutes, 2600);
    }

    // ---- Test 12: input-requiring machine never self-starts ----
    #[test]
    fn input_machine_does_not_self_start() {
        let mut engine = keg_engine();
        let mut machine = upgraded_keg(&mut engine);
        assert_eq!(engine.try_no_input_start(&mut machine, None, &world()), Attempt::NoMatch);
    }

    // ---- Test 13: subtract-time-of-day clamps to at least one minute ----
    #[test]
    fn subtract_time_of_day_clamps_to_one() {
        let mut engine = keg_engine();
        engine.rules = RuleSet::new();
        let mut rule = keg_wheat_rule();
        rule.minutes_until_ready = 30;
        rule.subtract_time_of_day = true;
        engine.rules.add(rule);

        let mut machine = Machine::new("Keg", "Farm", TileCoord::new(3, 4));
        let mut storage = MemoryStorage::new().with(ItemStack::new(wheat(), 5));
        let late = WorldSnapshot::new(Season::Spring, Weather::Sunny, 2400);

        assert!(engine.attempt_input(&mut machine, &mut storage, &late).produced());
        assert_eq!(machine.runtime.ready_in_minutes, 1);
    }

    // ---- Test 14: upgrade lifecycle ----
    #[test]
    fn apply_and_remove_upgrade() {
        let mut engine = keg_engine();
        let machine = Machine::new("Keg", "Farm", TileCoord::new(3, 4));

        assert!(engine.apply_upgrade(&machine, "Mass Production Upgrade").is_ok());
        assert_eq!(engine.upgrade_key(&machine), Some("mass"));
        assert_eq!(
            engine.apply_upgrade(&machine, "Mass Production Upgrade"),
            Err(UpgradeError::AlreadyUpgraded("mass".to_string()))
        );
        assert_eq!(
            engine.apply_upgrade(&machine, "Nonsense"),
            Err(UpgradeError::UnknownUpgradeItem("Nonsense".to_string()))
        );

        let refund = engine.remove_upgrade(&machine);
        assert_eq!(refund.as_deref(), Some("Mass Production Upgrade"));
        assert_eq!(engine.upgrade_key(&machine), None);
    }

    // ---- Test 15: no-input-only upgrades refuse input machines ----
    #[test]
    fn input_mode_compatibility_is_enforced() {
        let mut engine = keg_engine();
        engine.catalog.clear();
        engine.catalog.register_base(BaseMachine::new("Keg"));
        let mut profile = mass_profile();
        profile.input_mode = InputMode::NoInputsOnly;
        engine.catalog.register_profile(profile);

        let machine = Machine::new("Keg", "Farm", TileCoord::new(3, 4));
        assert_eq!(
            engine.apply_upgrade(&machine, "Mass Production Upgrade"),
            Err(UpgradeError::IncompatibleInputMode)
        );
    }

    // ---- Test 16: session start clears content and loads the tracker ----
    #[test]
    fn start_session_restores_saved_upgrades() {
        let mut engine = keg_engine();
        engine.tracker.set("Farm", TileCoord::new(3, 4), Some("mass"));
        let blob = engine.save_tracker().unwrap();

        engine.start_session(Some(&blob));
        assert!(engine.catalog.profiles().is_empty());
        assert!(!engine.rules.has_rules_for("Keg"));
        assert_eq!(engine.tracker.get("Farm", TileCoord::new(3, 4)), Some("mass"));
    }

    // ---- Test 17: garbage save data degrades to an empty tracker ----
    #[test]
    fn start_session_survives_garbage_save_data() {
        let mut engine = keg_engine();
        engine.start_session(Some(&[0xDE, 0xAD]));
        assert!(engine.tracker.is_empty());
    }

    // ---- Test 18: clear_production resets the whole runtime surface ----
    #[test]
    fn clear_production_resets_state() {
        let mut engine = keg_engine();
        let mut machine = upgraded_keg(&mut engine);
        let mut storage = MemoryStorage::new().with(ItemStack::new(wheat(), 25));
        assert!(engine.attempt_input(&mut machine, &mut storage, &world()).produced());

        engine.clear_production(&mut machine);
        assert!(machine.runtime.held_output.is_none());
        assert_eq!(machine.runtime.ready_in_minutes, -1);
        assert!(!machine.runtime.show_alternate_frame);
        assert!(!machine.runtime.lit);
    }

    // ---- Test 19: prepare-output rescales look-for-input rules ----
    #[test]
    fn prepare_output_rescales_held_stack() {
        let mut engine = keg_engine();
        engine.rules = RuleSet::new();
        let mut rule = ProducerRule::new("Keg", 600)
            .with_output(OutputVariant::new(beer(), 1));
        rule.look_for_input_when_ready = true;
        engine.rules.add(rule);

        let mut machine = upgraded_keg(&mut engine);
        machine.runtime.held_output = Some(ItemStack::new(beer(), 1));

        engine.prepare_output(&mut machine, None);
        assert_eq!(machine.runtime.held_output.as_ref().unwrap().quantity, 10);
    }

    // ---- Test 20: requirements sharing a key draw from one stock pool ----
    #[test]
    fn overlapping_fuel_keys_are_counted_together() {
        let mut engine = keg_engine();
        engine.rules = RuleSet::new();
        let mut rule = keg_wheat_rule();
        rule.fuel = vec![crate::rules::FuelRequirement::item(382, "Coal", 1)];
        rule.outputs[0].fuel = vec![crate::rules::FuelRequirement::item(382, "Coal", 1)];
        engine.rules.add(rule);

        let mut machine = upgraded_keg(&mut engine);
        // 10 coal covers either scaled requirement alone, not both.
        let mut storage = MemoryStorage::new()
            .with(ItemStack::new(wheat(), 25))
            .with(ItemStack::new(coal(), 10));

        assert_eq!(engine.attempt_input(&mut machine, &mut storage, &world()), Attempt::NoMatch);
        assert_eq!(storage.quantity_of(262), 25);
        assert_eq!(storage.quantity_of(382), 10);
        assert!(machine.runtime.held_output.is_none());

        storage.add(ItemStack::new(coal(), 10));
        assert!(engine.attempt_input(&mut machine, &mut storage, &world()).produced());
        assert_eq!(storage.quantity_of(262), 15);
        assert_eq!(storage.quantity_of(382), 0);
    }

    // ---- Test 21: a fuel that repeats the primary input shares its stock ----
    #[test]
    fn fuel_matching_the_input_key_is_not_double_counted() {
        let mut engine = keg_engine();
        engine.rules = RuleSet::new();
        let mut rule = keg_wheat_rule();
        rule.fuel = vec![crate::rules::FuelRequirement::item(262, "Wheat", 1)];
        engine.rules.add(rule);

        let mut machine = upgraded_keg(&mut engine);
        // 15 wheat covers the scaled input of 10, but not input plus fuel.
        let mut storage = MemoryStorage::new().with(ItemStack::new(wheat(), 15));
        assert_eq!(engine.attempt_input(&mut machine, &mut storage, &world()), Attempt::NoMatch);
        assert_eq!(storage.quantity_of(262), 15);

        storage.add(ItemStack::new(wheat(), 10));
        assert!(engine.attempt_input(&mut machine, &mut storage, &world()).produced());
        assert_eq!(storage.quantity_of(262), 5);
    }

    // ---- Test 22: drop-in fuels sharing a key are validated as a total ----
    #[test]
    fn drop_in_overlapping_fuels_are_restricted() {
        let mut engine = keg_engine();
        engine.rules = RuleSet::new();
        let mut rule = keg_wheat_rule();
        rule.fuel = vec![
            crate::rules::FuelRequirement::item(382, "Coal", 1),
            crate::rules::FuelRequirement::item(382, "Coal", 1),
        ];
        engine.rules.add(rule);

        let mut machine = upgraded_keg(&mut engine);
        let mut hand = ItemStack::new(wheat(), 25);
        let mut inventory = MemoryStorage::new().with(ItemStack::new(coal(), 10));

        let attempt = engine.drop_in(&mut machine, &mut hand, false, &mut inventory, &world());
        assert_eq!(
            attempt,
            Attempt::Restricted(Restriction::InsufficientFuel {
                name: "Coal".to_string(),
                required: 10,
            })
        );
        assert_eq!(hand.quantity, 25);
        assert_eq!(inventory.quantity_of(382), 10);

        inventory.add(ItemStack::new(coal(), 10));
        assert!(engine
            .drop_in(&mut machine, &mut hand, false, &mut inventory, &world())
            .produced());
        assert_eq!(hand.quantity, 15);
        assert_eq!(inventory.quantity_of(382), 0);
    }
}
