use crate::id::{CategoryId, IngredientKey, ItemId};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Quality tiers
// ---------------------------------------------------------------------------

/// No quality stars.
pub const QUALITY_NONE: i32 = 0;
/// Silver star.
pub const QUALITY_SILVER: i32 = 1;
/// Gold star.
pub const QUALITY_GOLD: i32 = 2;
/// Iridium star.
pub const QUALITY_IRIDIUM: i32 = 3;

// ---------------------------------------------------------------------------
// Item identity
// ---------------------------------------------------------------------------

/// The identity facet of an item: everything the rule matcher inspects.
/// Exclusion sets and input identifiers match any of id, name, category
/// or content tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemKind {
    pub id: ItemId,
    pub name: String,
    pub category: CategoryId,
    pub tags: Vec<String>,
    /// Bulky placeable items (machines themselves, furniture) never match
    /// producer rules.
    pub bulky: bool,
}

impl ItemKind {
    pub fn new(id: i32, name: impl Into<String>, category: i32) -> Self {
        Self {
            id: ItemId(id),
            name: name.into(),
            category: CategoryId(category),
            tags: Vec::new(),
            bulky: false,
        }
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    pub fn bulky(mut self) -> Self {
        self.bulky = true;
        self
    }

    /// Whether any identifier in `set` names this item, by numeric id,
    /// display name, category id or content tag.
    pub fn matches_any(&self, set: &[String]) -> bool {
        set.iter().any(|ident| self.matches(ident))
    }

    /// Whether a single identifier names this item.
    pub fn matches(&self, ident: &str) -> bool {
        ident == self.id.0.to_string()
            || ident == self.name
            || ident == self.category.0.to_string()
            || self.tags.iter().any(|t| t == ident)
    }

    /// Whether this item satisfies an ingredient key.
    pub fn satisfies(&self, key: &IngredientKey) -> bool {
        match key {
            IngredientKey::Item(id) => self.id == *id,
            IngredientKey::Category(cat) => self.category == *cat,
        }
    }
}

// ---------------------------------------------------------------------------
// Item stacks
// ---------------------------------------------------------------------------

/// A stack of identical items with a quality tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemStack {
    pub kind: ItemKind,
    pub quality: i32,
    pub quantity: u32,
}

impl ItemStack {
    pub fn new(kind: ItemKind, quantity: u32) -> Self {
        Self {
            kind,
            quality: QUALITY_NONE,
            quantity,
        }
    }

    pub fn with_quality(mut self, quality: i32) -> Self {
        self.quality = quality;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn truffle() -> ItemKind {
        ItemKind::new(430, "Truffle", -17).with_tags(vec!["forage_item".to_string()])
    }

    #[test]
    fn matches_by_id_name_category_and_tag() {
        let kind = truffle();
        assert!(kind.matches("430"));
        assert!(kind.matches("Truffle"));
        assert!(kind.matches("-17"));
        assert!(kind.matches("forage_item"));
        assert!(!kind.matches("431"));
        assert!(!kind.matches("Oil"));
    }

    #[test]
    fn matches_any_over_a_set() {
        let kind = truffle();
        assert!(kind.matches_any(&["Oil".to_string(), "forage_item".to_string()]));
        assert!(!kind.matches_any(&["Oil".to_string(), "Wine".to_string()]));
        assert!(!kind.matches_any(&[]));
    }

    #[test]
    fn satisfies_item_and_category_keys() {
        let kind = truffle();
        assert!(kind.satisfies(&IngredientKey::Item(ItemId(430))));
        assert!(!kind.satisfies(&IngredientKey::Item(ItemId(431))));
        assert!(kind.satisfies(&IngredientKey::Category(CategoryId(-17))));
        assert!(!kind.satisfies(&IngredientKey::Category(CategoryId(-4))));
    }
}
