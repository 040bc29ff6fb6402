//! Driver-facing surface for automation frameworks: the observable machine
//! state and the set-input / drop-in / get-output entry points, with
//! override dispatch in front of the generic pipeline.

use crate::executor::{Attempt, ProductionEngine};
use crate::item::ItemStack;
use crate::machine::{Machine, WorldSnapshot};
use crate::overrides::{OverrideContext, OverrideOutcome};
use crate::scaling::{InputMode, ScalingProfile};
use crate::source::IngredientSource;

/// What an automation driver sees when it polls a machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MachineState {
    /// Idle and waiting for input.
    Empty,
    /// Busy; also reported by idle no-input machines so drivers never try
    /// to feed them.
    Processing,
    /// A no-input machine whose external conditions currently fail.
    Disabled,
    /// Output finished and waiting for collection.
    Done,
}

impl ProductionEngine {
    /// Classify a machine for a polling driver. Never mutates.
    pub fn get_state(&self, machine: &Machine, world: &WorldSnapshot) -> MachineState {
        if machine.runtime.is_done() {
            return MachineState::Done;
        }
        if let Some(base) = self.catalog.base(&machine.base_name)
            && machine.runtime.held_output.is_none()
            && (base.is_no_input() || self.self_starting_profile(machine))
        {
            return if base.conditions_met(world, &machine.location) {
                MachineState::Processing
            } else {
                MachineState::Disabled
            };
        }
        if machine.runtime.held_output.is_some() {
            MachineState::Processing
        } else {
            MachineState::Empty
        }
    }

    /// Whether the machine's upgrade lets it start without input, the same
    /// test the executor applies before a self-start.
    fn self_starting_profile(&self, machine: &Machine) -> bool {
        self.tracker
            .get(&machine.location, machine.tile)
            .and_then(|key| self.catalog.profiles().get(key))
            .is_some_and(|p| p.input_mode != InputMode::InputRequired)
    }

    /// Automated input search. Overrides claiming this machine kind run
    /// first; the generic pipeline is the fallback when none claims it or
    /// the claimant declines.
    pub fn set_input(
        &mut self,
        machine: &mut Machine,
        source: &mut dyn IngredientSource,
        world: &WorldSnapshot,
    ) -> bool {
        let Self {
            catalog,
            tracker,
            overrides,
            rng,
            ..
        } = self;
        if let Some(machine_override) = overrides.get(&machine.base_name) {
            let identity = ScalingProfile::identity();
            let profile = tracker
                .get(&machine.location, machine.tile)
                .and_then(|key| catalog.profiles().get(key))
                .unwrap_or(&identity);
            let mut ctx = OverrideContext { profile, rng };
            match machine_override.set_input(&mut ctx, machine, source, world) {
                OverrideOutcome::Handled(accepted) => return accepted,
                OverrideOutcome::NotHandled => {}
            }
        }
        self.attempt_input(machine, source, world).produced()
    }

    /// Manual insertion of a held stack, override-first like [`set_input`].
    ///
    /// [`set_input`]: ProductionEngine::set_input
    pub fn try_drop_in(
        &mut self,
        machine: &mut Machine,
        stack: &mut ItemStack,
        probe: bool,
        fuel_source: &mut dyn IngredientSource,
        world: &WorldSnapshot,
    ) -> Attempt {
        let Self {
            catalog,
            tracker,
            overrides,
            rng,
            ..
        } = self;
        if let Some(machine_override) = overrides.get(&machine.base_name) {
            let identity = ScalingProfile::identity();
            let profile = tracker
                .get(&machine.location, machine.tile)
                .and_then(|key| catalog.profiles().get(key))
                .unwrap_or(&identity);
            let mut ctx = OverrideContext { profile, rng };
            match machine_override.drop_in(&mut ctx, machine, stack, probe, world) {
                OverrideOutcome::Handled(true) => return Attempt::Produced,
                OverrideOutcome::Handled(false) => return Attempt::NoMatch,
                OverrideOutcome::NotHandled => {}
            }
        }
        self.drop_in(machine, stack, probe, fuel_source, world)
    }

    /// Collect the finished output. Clears the production state and, for
    /// eligible no-input machines, immediately starts the next batch.
    pub fn get_output(&mut self, machine: &mut Machine, world: &WorldSnapshot) -> Option<ItemStack> {
        if !machine.runtime.is_done() {
            return None;
        }
        self.prepare_output(machine, None);
        let output = machine.runtime.held_output.take();
        self.clear_production(machine);
        let _ = self.try_no_input_start(machine, None, world);
        output
    }
}

// ===========================================================================
// Tests
// ===========================================================================
