//! Overclock Core -- the production rule evaluation and scaling engine.
//!
//! This crate augments a crafting simulation with "overclocked" machine
//! variants: machines that convert stacked inputs (plus optional fuels)
//! into outputs over a time delay, where a named scaling profile rescales
//! a base machine's input, output and processing-time quantities without
//! duplicating rule data.
//!
//! # One Production Attempt
//!
//! A call to [`executor::ProductionEngine::set_input`] walks the candidate
//! stacks of an ingredient source in enumeration order:
//!
//! 1. **Resolve** -- Look up the machine's upgrade record and derive its
//!    effective [`registry::MachineDefinition`] (absent record = identity
//!    scaling).
//! 2. **Match** -- Find the producer rule for the candidate and check the
//!    rule/definition exclusion sets.
//! 3. **Scale** -- Compute scaled input and fuel requirements from the
//!    profile.
//! 4. **Probe** -- Reserve the primary input and every fuel without
//!    mutating the source.
//! 5. **Commit** -- Withdraw everything, then set the held output, quality
//!    and quantized ready time on the machine.
//!
//! A failed attempt is side-effect-free: no partial withdrawal is ever
//! observable from the surrounding simulation.
//!
//! # Key Types
//!
//! - [`executor::ProductionEngine`] -- Process-scoped state object owning
//!   the catalog, rule set, upgrade tracker, overrides and session RNG.
//! - [`scaling::ScalingProfile`] -- Pure numeric transform over quantities,
//!   time and quality.
//! - [`tracker::UpgradeTracker`] -- Coordinate-keyed, save-durable mapping
//!   from machine instances to profile keys.
//! - [`rules::RuleSet`] -- Opaque external rule data plus the matching and
//!   output-variant selection contracts.
//! - [`automation::MachineState`] -- The lifecycle surface polled by an
//!   automation driver.

pub mod automation;
pub mod executor;
pub mod id;
pub mod item;
pub mod machine;
pub mod overrides;
pub mod registry;
pub mod rng;
pub mod rules;
pub mod scaling;
pub mod source;
pub mod tracker;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
