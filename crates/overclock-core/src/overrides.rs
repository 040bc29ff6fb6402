//! Per-machine-kind overrides that replace the generic production pipeline.
//!
//! Some machine kinds compute their output from a lookup rather than from
//! authored rules. An override claims a base machine name in the registry
//! and is consulted before the generic pipeline; it may also decline, in
//! which case the generic pipeline runs as usual. Unupgraded instances
//! always fall through, keeping their stock behavior.

use std::collections::HashMap;

use crate::id::IngredientKey;
use crate::item::{ItemKind, ItemStack};
use crate::machine::{Machine, WorldSnapshot};
use crate::rng::SimRng;
use crate::scaling::ScalingProfile;
use crate::source::IngredientSource;

// ---------------------------------------------------------------------------
// Override contract
// ---------------------------------------------------------------------------

/// What an override decided about an attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverrideOutcome {
    /// The override owned the attempt; the flag says whether it accepted.
    Handled(bool),
    /// The override declined; run the generic pipeline.
    NotHandled,
}

/// Scaling context handed to an override for a single attempt.
pub struct OverrideContext<'a> {
    /// The machine's effective profile; pass-through when unupgraded.
    pub profile: &'a ScalingProfile,
    pub rng: &'a mut SimRng,
}

impl OverrideContext<'_> {
    /// Whether the machine this attempt runs on carries an upgrade.
    pub fn is_upgraded(&self) -> bool {
        !self.profile.key.is_empty()
    }
}

/// Custom production behavior for one base machine kind.
pub trait MachineOverride {
    /// Automated input search.
    fn set_input(
        &self,
        ctx: &mut OverrideContext<'_>,
        machine: &mut Machine,
        source: &mut dyn IngredientSource,
        world: &WorldSnapshot,
    ) -> OverrideOutcome;

    /// Manual insertion of a held stack. With `probe` set, nothing may be
    /// mutated.
    fn drop_in(
        &self,
        ctx: &mut OverrideContext<'_>,
        machine: &mut Machine,
        stack: &mut ItemStack,
        probe: bool,
        world: &WorldSnapshot,
    ) -> OverrideOutcome;
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Dispatch table from base machine name to override, populated at engine
/// construction. Registering a name again replaces the previous entry.
#[derive(Default)]
pub struct OverrideRegistry {
    overrides: HashMap<String, Box<dyn MachineOverride>>,
}

impl OverrideRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in override set: a seed press with an empty produce table,
    /// to be populated from the host's crop data.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(SEED_PRESS, Box::new(SeedPressOverride::new()));
        registry
    }

    pub fn register(&mut self, base_name: impl Into<String>, machine_override: Box<dyn MachineOverride>) {
        self.overrides.insert(base_name.into(), machine_override);
    }

    pub fn get(&self, base_name: &str) -> Option<&dyn MachineOverride> {
        self.overrides.get(base_name).map(|b| b.as_ref())
    }

    pub fn contains(&self, base_name: &str) -> bool {
        self.overrides.contains_key(base_name)
    }
}

// ---------------------------------------------------------------------------
// Seed press
// ---------------------------------------------------------------------------

/// Base machine name the seed press override claims.
pub const SEED_PRESS: &str = "Seed Press";

/// Produce this id is never pressed: it is its own seed.
const SELF_SEEDING_PRODUCE_ID: i32 = 433;
/// Rare outcome, 0.5% of presses.
const ANCIENT_SEEDS_CHANCE: f64 = 0.005;
/// Uncommon outcome, 2% of the remaining presses.
const MIXED_SEEDS_CHANCE: f64 = 0.02;
/// Base processing time before scaling.
const PRESS_BASE_MINUTES: u32 = 20;

fn ancient_seeds() -> ItemKind {
    ItemKind::new(499, "Ancient Seeds", -74)
}

fn mixed_seeds() -> ItemKind {
    ItemKind::new(770, "Mixed Seeds", -74)
}

/// Converts produce back into its seed, with small chances of rarer seeds
/// instead. Output quantities and the fixed base time scale like any other
/// machine's.
#[derive(Default)]
pub struct SeedPressOverride {
    /// produce id -> seed kind. First mapping per produce wins.
    seed_table: HashMap<i32, ItemKind>,
}

impl SeedPressOverride {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(entries: impl IntoIterator<Item = (i32, ItemKind)>) -> Self {
        let mut press = Self::new();
        for (produce_id, seed) in entries {
            press.map_produce(produce_id, seed);
        }
        press
    }

    /// Record which seed a produce presses into. An already-mapped produce
    /// keeps its first seed.
    pub fn map_produce(&mut self, produce_id: i32, seed: ItemKind) {
        self.seed_table.entry(produce_id).or_insert(seed);
    }

    /// Whether this produce can be pressed at all.
    pub fn accepts(&self, kind: &ItemKind) -> bool {
        !kind.bulky
            && kind.id.0 != SELF_SEEDING_PRODUCE_ID
            && self.seed_table.contains_key(&kind.id.0)
    }

    /// Roll the press outcome for one accepted produce.
    fn press(&self, ctx: &mut OverrideContext<'_>, produce: &ItemKind) -> Option<ItemStack> {
        let seed = self.seed_table.get(&produce.id.0)?;

        let mut output = seed.clone();
        let mut quantity = ctx.profile.scaled_input(ctx.rng.range(1, 4));
        if ctx.rng.roll(ANCIENT_SEEDS_CHANCE) {
            output = ancient_seeds();
            quantity = ctx.profile.scaled_input(1);
        } else if ctx.rng.roll(MIXED_SEEDS_CHANCE) {
            output = mixed_seeds();
            quantity = ctx.profile.scaled_input(ctx.rng.range(1, 5));
        }
        Some(ItemStack::new(output, quantity))
    }

    fn hold(&self, ctx: &mut OverrideContext<'_>, machine: &mut Machine, output: ItemStack) {
        machine.runtime.held_output = Some(output);
        machine.runtime.ready_in_minutes = ctx.profile.scaled_time(PRESS_BASE_MINUTES) as i32;
        machine.runtime.ready_for_harvest = false;
    }
}

impl MachineOverride for SeedPressOverride {
    fn set_input(
        &self,
        ctx: &mut OverrideContext<'_>,
        machine: &mut Machine,
        source: &mut dyn IngredientSource,
        _world: &WorldSnapshot,
    ) -> OverrideOutcome {
        if !ctx.is_upgraded() {
            return OverrideOutcome::NotHandled;
        }
        if machine.runtime.held_output.is_some() {
            return OverrideOutcome::Handled(false);
        }

        let required = ctx.profile.scaled_input(1);
        for candidate in source.candidates() {
            if !self.accepts(&candidate.kind) {
                continue;
            }
            let key = IngredientKey::Item(candidate.kind.id);
            let Some(reservation) = source.reserve(&key, required) else {
                continue;
            };
            let Some(output) = self.press(ctx, &candidate.kind) else {
                continue;
            };
            if !source.commit(&reservation) {
                tracing::error!(
                    ?reservation,
                    "ingredient source changed between reserve and commit"
                );
                return OverrideOutcome::Handled(false);
            }
            self.hold(ctx, machine, output);
            return OverrideOutcome::Handled(true);
        }
        OverrideOutcome::Handled(false)
    }

    fn drop_in(
        &self,
        ctx: &mut OverrideContext<'_>,
        machine: &mut Machine,
        stack: &mut ItemStack,
        probe: bool,
        _world: &WorldSnapshot,
    ) -> OverrideOutcome {
        if !ctx.is_upgraded() {
            return OverrideOutcome::NotHandled;
        }
        // Probes are always declined: acceptance depends on a roll that
        // must not be consumed speculatively.
        if probe || machine.runtime.held_output.is_some() {
            return OverrideOutcome::Handled(false);
        }

        let required = ctx.profile.scaled_input(1);
        if !self.accepts(&stack.kind) || stack.quantity < required {
            return OverrideOutcome::Handled(false);
        }
        let Some(output) = self.press(ctx, &stack.kind) else {
            return OverrideOutcome::Handled(false);
        };
        stack.quantity -= required;
        self.hold(ctx, machine, output);
        OverrideOutcome::Handled(true)
    }
}

// ===========================================================================
// Tests
// ===========================================================================
