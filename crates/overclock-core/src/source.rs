//! The ingredient-source capability the core consumes.
//!
//! The core never materializes or stores items. It enumerates candidate
//! stacks, probes availability, and withdraws through this interface with a
//! reserve-then-commit pattern: `reserve` is a pure satisfiability check
//! producing a token, `commit` irreversibly reduces the source. Probing
//! alone must have no side effects -- that property is what makes failed
//! production attempts invisible to the surrounding simulation.

use crate::id::IngredientKey;
use crate::item::ItemStack;

/// A reservation token: a satisfiable withdrawal that has not happened yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reservation {
    pub key: IngredientKey,
    pub quantity: u32,
}

/// An enumerable, withdrawable supply of item stacks. Implemented by the
/// host (chests, pipe networks, a player inventory).
pub trait IngredientSource {
    /// Candidate stacks in the source's own enumeration order. The
    /// production loop tries them in exactly this order, first match wins.
    fn candidates(&self) -> Vec<ItemStack>;

    /// Total quantity currently available matching the key. Side-effect
    /// free.
    fn available(&self, key: &IngredientKey) -> u32;

    /// Check that `quantity` matching `key` can be withdrawn, without
    /// withdrawing. Side-effect free.
    fn reserve(&self, key: &IngredientKey, quantity: u32) -> Option<Reservation> {
        if quantity == 0 || self.available(key) >= quantity {
            Some(Reservation {
                key: *key,
                quantity,
            })
        } else {
            None
        }
    }

    /// Irreversibly reduce the source by a reservation. Returns false only
    /// if the source changed since the reservation was made.
    fn commit(&mut self, reservation: &Reservation) -> bool;
}
