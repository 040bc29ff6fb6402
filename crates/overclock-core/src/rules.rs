//! The producer rule data model and the rule matcher.
//!
//! Rules are authored by an external rule framework and treated as opaque
//! input data: per base machine, a list of input-to-output conversions with
//! fuel costs and candidate output variants. This module owns the three
//! matching contracts layered on top of that data -- rule lookup, input
//! exclusion, and output-variant selection -- none of which mutate anything.

use crate::id::IngredientKey;
use crate::item::ItemKind;
use crate::registry::MachineDefinition;
use crate::rng::SimRng;
use crate::scaling::ScalingProfile;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ---------------------------------------------------------------------------
// Rule data
// ---------------------------------------------------------------------------

/// A secondary "fuel" cost: quantity of an item or category consumed
/// alongside the primary input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FuelRequirement {
    pub key: IngredientKey,
    /// Display name resolved at authoring time; fuel-ignore lists match on
    /// it as well as on the numeric id.
    pub name: String,
    pub quantity: u32,
}

impl FuelRequirement {
    pub fn item(id: i32, name: impl Into<String>, quantity: u32) -> Self {
        Self {
            key: IngredientKey::Item(crate::id::ItemId(id)),
            name: name.into(),
            quantity,
        }
    }

    /// The raw identifier the fuel-ignore list matches against: item id, or
    /// the negative category id.
    pub fn raw_id(&self) -> i32 {
        match self.key {
            IngredientKey::Item(id) => id.0,
            IngredientKey::Category(cat) => cat.0,
        }
    }

    /// This fuel's requirement under a scaling profile. Zero when the
    /// profile's ignore list exempts it.
    pub fn scaled(&self, profile: &ScalingProfile) -> u32 {
        profile.scaled_fuel_input(self.quantity, self.raw_id(), &self.name)
    }
}

/// One candidate result within a rule, chosen at production time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputVariant {
    pub item: ItemKind,
    pub quantity: u32,
    /// Chance this variant is picked, in [0, 1]. Zero-probability variants
    /// form the default pool.
    pub probability: f64,
    /// Preserve the input's quality on the output.
    pub keep_input_quality: bool,
    /// Overrides the rule's ready time when set.
    pub minutes_until_ready: Option<u32>,
    /// Extra fuels this variant needs beyond the rule's own list.
    pub fuel: Vec<FuelRequirement>,
    /// When non-empty, the variant is only eligible for inputs matching one
    /// of these identifiers (id, name, category or tag).
    pub required_input_identifiers: Vec<String>,
}

impl OutputVariant {
    pub fn new(item: ItemKind, quantity: u32) -> Self {
        Self {
            item,
            quantity,
            probability: 0.0,
            keep_input_quality: false,
            minutes_until_ready: None,
            fuel: Vec::new(),
            required_input_identifiers: Vec::new(),
        }
    }
}

/// A producer rule: one valid input-to-output conversion for a base machine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProducerRule {
    pub base_machine: String,
    /// Identifier the primary input must match (id, name, category or tag).
    /// `None` marks the machine's no-input rule.
    pub input_identifier: Option<String>,
    /// Base primary-input quantity. Zero means no input is consumed.
    pub input_stack: u32,
    /// Inputs that never match this rule, by id, name, category or tag.
    pub exclude_identifiers: Vec<String>,
    pub fuel: Vec<FuelRequirement>,
    pub minutes_until_ready: u32,
    /// Clamp the ready time against the current time of day, minimum 1.
    pub subtract_time_of_day: bool,
    /// The machine re-resolves its input at collection time instead of at
    /// start (crop-fed machines).
    pub look_for_input_when_ready: bool,
    pub outputs: Vec<OutputVariant>,
}

impl ProducerRule {
    pub fn new(base_machine: impl Into<String>, minutes_until_ready: u32) -> Self {
        Self {
            base_machine: base_machine.into(),
            input_identifier: None,
            input_stack: 0,
            exclude_identifiers: Vec::new(),
            fuel: Vec::new(),
            minutes_until_ready,
            subtract_time_of_day: false,
            look_for_input_when_ready: false,
            outputs: Vec::new(),
        }
    }

    pub fn with_input(mut self, identifier: impl Into<String>, stack: u32) -> Self {
        self.input_identifier = Some(identifier.into());
        self.input_stack = stack;
        self
    }

    pub fn with_output(mut self, variant: OutputVariant) -> Self {
        self.outputs.push(variant);
        self
    }
}

// ---------------------------------------------------------------------------
// Rule set
// ---------------------------------------------------------------------------

/// All loaded producer rules, grouped by base machine name. Built once at
/// content-load time; immutable afterwards.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: HashMap<String, Vec<ProducerRule>>,
}

impl RuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, rule: ProducerRule) {
        self.rules
            .entry(rule.base_machine.clone())
            .or_default()
            .push(rule);
    }

    pub fn has_rules_for(&self, base_machine: &str) -> bool {
        self.rules.contains_key(base_machine)
    }

    pub fn rules_for(&self, base_machine: &str) -> &[ProducerRule] {
        self.rules.get(base_machine).map_or(&[], Vec::as_slice)
    }

    /// Find the rule applicable to this base machine for this candidate
    /// input. `None` input selects the machine's no-input rule. Bulky items
    /// never match.
    pub fn find_rule(&self, base_machine: &str, input: Option<&ItemKind>) -> Option<&ProducerRule> {
        let rules = self.rules.get(base_machine)?;
        match input {
            None => rules.iter().find(|r| r.input_identifier.is_none()),
            Some(kind) => {
                if kind.bulky {
                    return None;
                }
                rules.iter().find(|r| {
                    r.input_identifier
                        .as_deref()
                        .is_some_and(|ident| kind.matches(ident))
                })
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Matching contracts
// ---------------------------------------------------------------------------

/// True if the input's id, name, category or any content tag intersects
/// either the rule's own exclusion set or the machine's blacklist. The two
/// sets are independent; either alone excludes.
pub fn is_input_excluded(rule: &ProducerRule, blacklist: &[String], input: &ItemKind) -> bool {
    input.matches_any(&rule.exclude_identifiers) || input.matches_any(blacklist)
}

impl MachineDefinition<'_> {
    /// [`is_input_excluded`] against this definition's blacklist.
    pub fn excludes_input(&self, rule: &ProducerRule, input: &ItemKind) -> bool {
        is_input_excluded(rule, self.blacklist(), input)
    }
}

/// Select one output variant from a rule's candidates.
///
/// Candidates are visited in authored order. A candidate is eligible only if
/// every fuel on its own list is satisfiable via `fuel_probe` (a capability
/// check bound to scaled quantities, never a withdrawal) and its input
/// conditions hold. Among eligible candidates, probability variants are
/// rolled first in order; otherwise one default variant is drawn uniformly.
/// Returns `None` when nothing is eligible -- "no production this attempt",
/// not an error.
pub fn choose_output_variant<'r>(
    rule: &'r ProducerRule,
    rng: &mut SimRng,
    fuel_probe: &mut dyn FnMut(&FuelRequirement) -> bool,
    input: Option<&ItemKind>,
) -> Option<&'r OutputVariant> {
    let eligible: Vec<&OutputVariant> = rule
        .outputs
        .iter()
        .filter(|v| variant_eligible(v, fuel_probe, input))
        .collect();

    if eligible.is_empty() {
        return None;
    }

    let mut defaults = Vec::new();
    for variant in eligible {
        if variant.probability > 0.0 {
            if rng.roll(variant.probability) {
                return Some(variant);
            }
        } else {
            defaults.push(variant);
        }
    }

    match defaults.len() {
        0 => None,
        1 => Some(defaults[0]),
        n => Some(defaults[rng.range(0, n as u32) as usize]),
    }
}

fn variant_eligible(
    variant: &OutputVariant,
    fuel_probe: &mut dyn FnMut(&FuelRequirement) -> bool,
    input: Option<&ItemKind>,
) -> bool {
    if !variant.required_input_identifiers.is_empty() {
        match input {
            Some(kind) if kind.matches_any(&variant.required_input_identifiers) => {}
            _ => return false,
        }
    }

    variant.fuel.iter().all(|fuel| fuel_probe(fuel))
}
