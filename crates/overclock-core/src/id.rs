use serde::{Deserialize, Serialize};

/// Identifies an item kind in the host simulation's object data.
/// Cheap to copy and compare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ItemId(pub i32);

/// Identifies an item category. Negative by convention in the source data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CategoryId(pub i32);

/// A tile coordinate within a location. The stable identity half of an
/// upgrade record: machine instances are recreated across save/load cycles,
/// coordinates persist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TileCoord {
    pub x: i32,
    pub y: i32,
}

impl TileCoord {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// How an ingredient requirement addresses the source: a concrete item or
/// any item of a category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IngredientKey {
    Item(ItemId),
    Category(CategoryId),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn item_id_equality() {
        assert_eq!(ItemId(388), ItemId(388));
        assert_ne!(ItemId(388), ItemId(390));
    }

    #[test]
    fn ingredient_keys_are_hashable() {
        use std::collections::HashMap;
        let mut map = HashMap::new();
        map.insert(IngredientKey::Item(ItemId(382)), "coal");
        map.insert(IngredientKey::Category(CategoryId(-4)), "any fish");
        assert_eq!(map[&IngredientKey::Item(ItemId(382))], "coal");
    }

    #[test]
    fn tile_coord_copy() {
        let a = TileCoord::new(12, 7);
        let b = a;
        assert_eq!(a, b);
    }
}
