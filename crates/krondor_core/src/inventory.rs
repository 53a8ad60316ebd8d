use std::io::{Read, Seek};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::catalog::ItemCatalog;
use crate::error::{DecodeError, Result};
use crate::reader::LittleEndianReader;
use crate::types::ItemIndex;

pub const ITEM_RECORD_WIDTH: u64 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItemStatus {
    Activated = 1,
    Broken = 4,
    Repairable = 5,
    Equipped = 6,
    Poisoned = 7,
}

impl ItemStatus {
    pub const ALL: [ItemStatus; 5] = [
        ItemStatus::Activated,
        ItemStatus::Broken,
        ItemStatus::Repairable,
        ItemStatus::Equipped,
        ItemStatus::Poisoned,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Activated => "activated",
            Self::Broken => "broken",
            Self::Repairable => "repairable",
            Self::Equipped => "equipped",
            Self::Poisoned => "poisoned",
        }
    }
}

pub fn check_item_status(status: u8, flag: ItemStatus) -> bool {
    status & (1 << flag as u8) != 0
}

pub fn set_item_status(status: u8, flag: ItemStatus, value: bool) -> u8 {
    let mask = 1 << flag as u8;
    if value { status | mask } else { status & !mask }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryItem {
    pub item: ItemIndex,
    pub name: String,
    /// Condition percentage, or quantity for stackable items.
    pub condition: u8,
    pub status: u8,
    pub modifiers: u8,
}

impl InventoryItem {
    pub fn has_status(&self, flag: ItemStatus) -> bool {
        check_item_status(self.status, flag)
    }

    pub fn statuses(&self) -> Vec<ItemStatus> {
        ItemStatus::ALL
            .into_iter()
            .filter(|s| self.has_status(*s))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Inventory {
    pub capacity: u16,
    pub items: Vec<InventoryItem>,
}

impl Inventory {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Decode a standalone inventory: item count (u8), capacity (u16), then
/// `capacity` four-byte slots of which only the first `count` are used.
pub fn decode_inventory<R: Read + Seek>(
    r: &mut LittleEndianReader<R>,
    catalog: &dyn ItemCatalog,
) -> Result<Inventory> {
    let item_count = r.read_u8()?;
    let capacity = r.read_u16()?;
    debug!(items = item_count, capacity, "inventory");
    let items = decode_items(r, catalog, item_count, capacity)?;
    Ok(Inventory { capacity, items })
}

/// Decode `item_count` item records then skip the unused slots up to
/// `capacity`.
pub fn decode_items<R: Read + Seek>(
    r: &mut LittleEndianReader<R>,
    catalog: &dyn ItemCatalog,
    item_count: u8,
    capacity: u16,
) -> Result<Vec<InventoryItem>> {
    if u16::from(item_count) > capacity {
        return Err(DecodeError::invariant(
            r.position()?,
            format!("inventory holds {item_count} items but has capacity {capacity}"),
        ));
    }

    let mut items = Vec::with_capacity(usize::from(item_count));
    for _ in 0..item_count {
        let address = r.position()?;
        let item = ItemIndex(r.read_u8()?);
        let definition = catalog.definition(item).ok_or(DecodeError::UnknownItem {
            item: item.0,
            address,
        })?;
        let condition = r.read_u8()?;
        let status = r.read_u8()?;
        let modifiers = r.read_u8()?;
        items.push(InventoryItem {
            item,
            name: definition.name.clone(),
            condition,
            status,
            modifiers,
        });
    }

    let unused = u64::from(capacity - u16::from(item_count));
    r.skip(unused * ITEM_RECORD_WIDTH)?;
    Ok(items)
}
