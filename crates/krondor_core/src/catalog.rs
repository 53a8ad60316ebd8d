use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::types::ItemIndex;

const STACKABLE_FLAG: u16 = 0x0800;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemDefinition {
    pub name: String,
    #[serde(default)]
    pub item_type: u8,
    #[serde(default)]
    pub flags: u16,
    #[serde(default)]
    pub stack_size: u16,
    #[serde(default)]
    pub value: u32,
}

impl ItemDefinition {
    /// Stackable items store their quantity in the condition byte.
    pub fn is_stackable(&self) -> bool {
        self.flags & STACKABLE_FLAG != 0
    }
}

/// Read-only object table that inventory decoding resolves item indices
/// against. The decoder never owns or loads it.
pub trait ItemCatalog {
    fn definition(&self, item: ItemIndex) -> Option<&ItemDefinition>;

    fn name(&self, item: ItemIndex) -> Option<&str> {
        self.definition(item).map(|d| d.name.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ObjectCatalog {
    #[serde(default, rename = "object")]
    objects: Vec<ItemDefinition>,
}

impl ObjectCatalog {
    pub fn new(objects: Vec<ItemDefinition>) -> Self {
        Self { objects }
    }

    /// A catalog that accepts every index, for callers with no object table.
    pub fn anonymous() -> Self {
        let objects = (0..=u8::MAX)
            .map(|i| ItemDefinition {
                name: format!("Item #{i}"),
                item_type: 0,
                flags: 0,
                stack_size: 0,
                value: 0,
            })
            .collect();
        Self { objects }
    }

    /// Parse a catalog of `[[object]]` tables, indexed in file order.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

impl ItemCatalog for ObjectCatalog {
    fn definition(&self, item: ItemIndex) -> Option<&ItemDefinition> {
        self.objects.get(usize::from(item.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toml_catalog_is_indexed_in_order() {
        let catalog = ObjectCatalog::from_toml_str(
            r#"
            [[object]]
            name = "Sword"
            value = 250

            [[object]]
            name = "Rations"
            flags = 0x0800
            stack_size = 10
            "#,
        )
        .expect("catalog should parse");

        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.name(ItemIndex(0)), Some("Sword"));
        let rations = catalog.definition(ItemIndex(1)).expect("rations");
        assert!(rations.is_stackable());
        assert_eq!(catalog.definition(ItemIndex(2)), None);
    }

    #[test]
    fn anonymous_catalog_accepts_every_index() {
        let catalog = ObjectCatalog::anonymous();
        assert_eq!(catalog.name(ItemIndex(255)), Some("Item #255"));
        assert_eq!(catalog.name(ItemIndex(0)), Some("Item #0"));
    }
}
