//! Shared helpers for tests: an in-memory ingredient source and canned
//! items, rules and profiles.

use crate::id::IngredientKey;
use crate::item::{ItemKind, ItemStack};
use crate::rules::{OutputVariant, ProducerRule};
use crate::scaling::ScalingProfile;
use crate::source::{IngredientSource, Reservation};

// ---------------------------------------------------------------------------
// In-memory storage
// ---------------------------------------------------------------------------

/// A plain vector-backed ingredient source. Enumeration order is insertion
/// order.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    stacks: Vec<ItemStack>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, stack: ItemStack) -> Self {
        self.stacks.push(stack);
        self
    }

    pub fn add(&mut self, stack: ItemStack) {
        self.stacks.push(stack);
    }

    /// Total quantity of an exact item id, for assertions.
    pub fn quantity_of(&self, id: i32) -> u32 {
        self.stacks
            .iter()
            .filter(|s| s.kind.id.0 == id)
            .map(|s| s.quantity)
            .sum()
    }
}

impl IngredientSource for MemoryStorage {
    fn candidates(&self) -> Vec<ItemStack> {
        self.stacks.iter().filter(|s| s.quantity > 0).cloned().collect()
    }

    fn available(&self, key: &IngredientKey) -> u32 {
        self.stacks
            .iter()
            .filter(|s| s.kind.satisfies(key))
            .map(|s| s.quantity)
            .sum()
    }

    fn commit(&mut self, reservation: &Reservation) -> bool {
        if self.available(&reservation.key) < reservation.quantity {
            return false;
        }
        let mut remaining = reservation.quantity;
        for stack in &mut self.stacks {
            if remaining == 0 {
                break;
            }
            if stack.kind.satisfies(&reservation.key) {
                let take = stack.quantity.min(remaining);
                stack.quantity -= take;
                remaining -= take;
            }
        }
        self.stacks.retain(|s| s.quantity > 0);
        remaining == 0
    }
}

// ---------------------------------------------------------------------------
// Canned content
// ---------------------------------------------------------------------------

pub fn wheat() -> ItemKind {
    ItemKind::new(262, "Wheat", -75)
}

pub fn potato() -> ItemKind {
    ItemKind::new(192, "Potato", -75)
}

pub fn coal() -> ItemKind {
    ItemKind::new(382, "Coal", -15)
}

pub fn juice() -> ItemKind {
    ItemKind::new(350, "Juice", -79)
}

pub fn beer() -> ItemKind {
    ItemKind::new(346, "Beer", -26)
}

/// 1 wheat -> 1 beer in 1750 minutes, no fuel.
pub fn keg_wheat_rule() -> ProducerRule {
    ProducerRule::new("Keg", 1750)
        .with_input("Wheat", 1)
        .with_output(OutputVariant::new(beer(), 1))
}

/// The standard tenfold profile.
pub fn mass_profile() -> ScalingProfile {
    ScalingProfile::new("mass", "Mass Production Upgrade")
}
