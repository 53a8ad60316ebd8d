//! World containers, building-interior shops and combat loot.
//!
//! Every record starts with a 16-byte [`ContainerHeader`] whose first twelve
//! bytes depend on where the container lives, followed by the inventory
//! slots and, for world containers, a tail whose shape is chosen by the
//! container type.

use std::fmt;
use std::io::{Read, Seek};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::catalog::ItemCatalog;
use crate::error::{DecodeError, Result};
use crate::inventory::{Inventory, decode_items};
use crate::layout::{SaveLayout, ShopTable};
use crate::reader::LittleEndianReader;
use crate::types::{GamePosition, HotspotRef, KeyTarget, ZoneNumber};

const COMBAT_LOCATION_TYPE: u8 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContainerType {
    Bag,
    CT1,
    Gravestone,
    Building,
    Shop,
    Inn,
    TimirianyaHut,
    Combat,
    Chest,
    FairyChest,
    EventChest,
}

impl ContainerType {
    pub fn from_raw(raw: u8) -> Option<Self> {
        Some(match raw {
            0 => Self::Bag,
            1 => Self::CT1,
            2 => Self::Gravestone,
            3 => Self::Building,
            4 => Self::Shop,
            6 => Self::Inn,
            8 => Self::TimirianyaHut,
            9 => Self::Combat,
            10 => Self::Chest,
            11 => Self::FairyChest,
            16 => Self::EventChest,
            _ => return None,
        })
    }

    pub fn raw(&self) -> u8 {
        match self {
            Self::Bag => 0,
            Self::CT1 => 1,
            Self::Gravestone => 2,
            Self::Building => 3,
            Self::Shop => 4,
            Self::Inn => 6,
            Self::TimirianyaHut => 8,
            Self::Combat => 9,
            Self::Chest => 10,
            Self::FairyChest => 11,
            Self::EventChest => 16,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bag => "Bag",
            Self::CT1 => "CT1",
            Self::Gravestone => "Gravestone",
            Self::Building => "Building",
            Self::Shop => "Shop",
            Self::Inn => "Inn",
            Self::TimirianyaHut => "TimirianyaHut",
            Self::Combat => "Combat",
            Self::Chest => "Chest",
            Self::FairyChest => "FairyChest",
            Self::EventChest => "EventChest",
        }
    }
}

impl fmt::Display for ContainerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LockStats {
    pub lock_flag: u8,
    pub picklock: u8,
    pub fairy_chest_index: u8,
    pub damage: u8,
}

pub fn decode_lock<R: Read + Seek>(r: &mut LittleEndianReader<R>) -> Result<LockStats> {
    Ok(LockStats {
        lock_flag: r.read_u8()?,
        picklock: r.read_u8()?,
        fairy_chest_index: r.read_u8()?,
        damage: r.read_u8()?,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ShopStats {
    pub temple_number: u8,
    pub sell_factor: u8,
    pub max_discount: u8,
    pub buy_factor: u8,
    pub haggle: u16,
    pub barding_skill: u8,
    pub barding_reward: u8,
    pub barding_max_reward: u8,
    pub unknown: [u8; 3],
    pub repair_types: u8,
    pub repair_factor: u8,
    pub categories: u16,
}

pub fn decode_shop<R: Read + Seek>(r: &mut LittleEndianReader<R>) -> Result<ShopStats> {
    Ok(ShopStats {
        temple_number: r.read_u8()?,
        sell_factor: r.read_u8()?,
        max_discount: r.read_u8()?,
        buy_factor: r.read_u8()?,
        haggle: r.read_u16()?,
        barding_skill: r.read_u8()?,
        barding_reward: r.read_u8()?,
        barding_max_reward: r.read_u8()?,
        unknown: r.read_array::<3>()?,
        repair_types: r.read_u8()?,
        repair_factor: r.read_u8()?,
        categories: r.read_u16()?,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContainerLocation {
    World {
        zone: ZoneNumber,
        unknown: [u8; 3],
        position: GamePosition,
    },
    Gds {
        unknown: [u8; 4],
        hotspot: HotspotRef,
    },
    Combat {
        unknown: [u8; 4],
        combat: u32,
        combatant: u32,
    },
}

impl ContainerLocation {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::World { .. } => "world",
            Self::Gds { .. } => "gds",
            Self::Combat { .. } => "combat",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerHeader {
    pub address: u64,
    pub location: ContainerLocation,
    pub location_type: u8,
    pub items: u8,
    pub capacity: u8,
    /// Raw container type tag.
    pub flags: u8,
}

impl ContainerHeader {
    pub fn decode_world<R: Read + Seek>(r: &mut LittleEndianReader<R>) -> Result<Self> {
        let address = r.position()?;
        let location = ContainerLocation::World {
            zone: ZoneNumber(r.read_u8()?),
            unknown: r.read_array::<3>()?,
            position: GamePosition {
                x: r.read_u32()?,
                y: r.read_u32()?,
            },
        };
        Self::decode_common(r, address, location)
    }

    pub fn decode_gds<R: Read + Seek>(r: &mut LittleEndianReader<R>) -> Result<Self> {
        let address = r.position()?;
        let unknown = r.read_array::<4>()?;
        let gds_number = r.read_u32()? as u8;
        let gds_char = r.read_u32()?;
        let location = ContainerLocation::Gds {
            unknown,
            hotspot: HotspotRef::from_raw(gds_number, gds_char),
        };
        Self::decode_common(r, address, location)
    }

    pub fn decode_combat<R: Read + Seek>(r: &mut LittleEndianReader<R>) -> Result<Self> {
        let address = r.position()?;
        let location = ContainerLocation::Combat {
            unknown: r.read_array::<4>()?,
            combat: r.read_u32()?,
            combatant: r.read_u32()?,
        };
        let header = Self::decode_common(r, address, location)?;
        if header.location_type != COMBAT_LOCATION_TYPE {
            return Err(DecodeError::invariant(
                address,
                format!(
                    "combat container has location type {}, expected {COMBAT_LOCATION_TYPE}",
                    header.location_type
                ),
            ));
        }
        Ok(header)
    }

    fn decode_common<R: Read + Seek>(
        r: &mut LittleEndianReader<R>,
        address: u64,
        location: ContainerLocation,
    ) -> Result<Self> {
        Ok(Self {
            address,
            location,
            location_type: r.read_u8()?,
            items: r.read_u8()?,
            capacity: r.read_u8()?,
            flags: r.read_u8()?,
        })
    }

    fn mismatch(&self, expected: &'static str) -> DecodeError {
        DecodeError::LocationMismatch {
            expected,
            found: self.location.kind(),
            address: self.address,
        }
    }

    pub fn zone(&self) -> Result<ZoneNumber> {
        match self.location {
            ContainerLocation::World { zone, .. } => Ok(zone),
            _ => Err(self.mismatch("world")),
        }
    }

    pub fn position(&self) -> Result<GamePosition> {
        match self.location {
            ContainerLocation::World { position, .. } => Ok(position),
            _ => Err(self.mismatch("world")),
        }
    }

    pub fn hotspot(&self) -> Result<HotspotRef> {
        match self.location {
            ContainerLocation::Gds { hotspot, .. } => Ok(hotspot),
            _ => Err(self.mismatch("gds")),
        }
    }

    /// Combat and combatant numbers of a combat container.
    pub fn combat(&self) -> Result<(u32, u32)> {
        match self.location {
            ContainerLocation::Combat {
                combat, combatant, ..
            } => Ok((combat, combatant)),
            _ => Err(self.mismatch("combat")),
        }
    }

    pub fn container_type(&self) -> Result<ContainerType> {
        ContainerType::from_raw(self.flags).ok_or(DecodeError::UnknownContainerType {
            tag: self.flags,
            address: self.address,
        })
    }
}

/// Type-specific bytes that follow a world container's inventory. Opaque
/// runs are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContainerTail {
    Shop {
        unknown: [u8; 2],
        dialog: KeyTarget,
        shop: ShopStats,
    },
    Inn {
        unknown: [u8; 2],
        dialog: KeyTarget,
        shop: ShopStats,
    },
    Gravestone {
        unknown: [u8; 2],
        dialog: KeyTarget,
    },
    Bag,
    CT1 {
        lock: LockStats,
    },
    Chest {
        lock: LockStats,
    },
    Building {
        lock: LockStats,
        unknown: [u8; 2],
        dialog: KeyTarget,
    },
    FairyChest {
        lock: LockStats,
        dialog: KeyTarget,
    },
    EventChest {
        lock: LockStats,
        unknown: [u8; 13],
    },
    TimirianyaHut {
        unknown: [u8; 9],
    },
    Combat {
        unknown: [u8; 2],
        dialog: KeyTarget,
        unknown2: [u8; 9],
    },
}

impl ContainerTail {
    pub fn decode<R: Read + Seek>(
        r: &mut LittleEndianReader<R>,
        container_type: ContainerType,
    ) -> Result<Self> {
        Ok(match container_type {
            ContainerType::Shop => Self::Shop {
                unknown: r.read_array()?,
                dialog: KeyTarget(r.read_u32()?),
                shop: decode_shop(r)?,
            },
            ContainerType::Inn => Self::Inn {
                unknown: r.read_array()?,
                dialog: KeyTarget(r.read_u32()?),
                shop: decode_shop(r)?,
            },
            ContainerType::Gravestone => Self::Gravestone {
                unknown: r.read_array()?,
                dialog: KeyTarget(r.read_u32()?),
            },
            ContainerType::Bag => Self::Bag,
            ContainerType::CT1 => Self::CT1 {
                lock: decode_lock(r)?,
            },
            ContainerType::Chest => Self::Chest {
                lock: decode_lock(r)?,
            },
            ContainerType::Building => {
                let lock = decode_lock(r)?;
                let unknown = r.read_array()?;
                let dialog = KeyTarget(r.read_u32()?);
                debug!(%dialog, "post-lock dialog");
                Self::Building {
                    lock,
                    unknown,
                    dialog,
                }
            }
            ContainerType::FairyChest => Self::FairyChest {
                lock: decode_lock(r)?,
                dialog: KeyTarget(r.read_u32()?),
            },
            ContainerType::EventChest => Self::EventChest {
                lock: decode_lock(r)?,
                unknown: r.read_array()?,
            },
            ContainerType::TimirianyaHut => Self::TimirianyaHut {
                unknown: r.read_array()?,
            },
            ContainerType::Combat => Self::Combat {
                unknown: r.read_array()?,
                dialog: KeyTarget(r.read_u32()?),
                unknown2: r.read_array()?,
            },
        })
    }

    pub fn container_type(&self) -> ContainerType {
        match self {
            Self::Shop { .. } => ContainerType::Shop,
            Self::Inn { .. } => ContainerType::Inn,
            Self::Gravestone { .. } => ContainerType::Gravestone,
            Self::Bag => ContainerType::Bag,
            Self::CT1 { .. } => ContainerType::CT1,
            Self::Chest { .. } => ContainerType::Chest,
            Self::Building { .. } => ContainerType::Building,
            Self::FairyChest { .. } => ContainerType::FairyChest,
            Self::EventChest { .. } => ContainerType::EventChest,
            Self::TimirianyaHut { .. } => ContainerType::TimirianyaHut,
            Self::Combat { .. } => ContainerType::Combat,
        }
    }

    pub fn dialog(&self) -> Option<KeyTarget> {
        match self {
            Self::Shop { dialog, .. }
            | Self::Inn { dialog, .. }
            | Self::Gravestone { dialog, .. }
            | Self::Building { dialog, .. }
            | Self::FairyChest { dialog, .. }
            | Self::Combat { dialog, .. } => Some(*dialog),
            Self::Bag
            | Self::CT1 { .. }
            | Self::Chest { .. }
            | Self::EventChest { .. }
            | Self::TimirianyaHut { .. } => None,
        }
    }

    pub fn shop(&self) -> Option<&ShopStats> {
        match self {
            Self::Shop { shop, .. } | Self::Inn { shop, .. } => Some(shop),
            _ => None,
        }
    }

    pub fn lock(&self) -> Option<&LockStats> {
        match self {
            Self::CT1 { lock }
            | Self::Chest { lock }
            | Self::Building { lock, .. }
            | Self::FairyChest { lock, .. }
            | Self::EventChest { lock, .. } => Some(lock),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Container {
    pub header: ContainerHeader,
    pub inventory: Inventory,
    pub tail: ContainerTail,
}

impl Container {
    pub fn container_type(&self) -> ContainerType {
        self.tail.container_type()
    }
}

/// Building-interior container, normally a shop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GdsContainer {
    pub header: ContainerHeader,
    pub container_type: ContainerType,
    pub inventory: Inventory,
    pub shop: Option<ShopStats>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombatInventory {
    pub header: ContainerHeader,
    pub inventory: Inventory,
}

fn decode_header_inventory<R: Read + Seek>(
    r: &mut LittleEndianReader<R>,
    header: &ContainerHeader,
    catalog: &dyn ItemCatalog,
) -> Result<Inventory> {
    let capacity = u16::from(header.capacity);
    Ok(Inventory {
        capacity,
        items: decode_items(r, catalog, header.items, capacity)?,
    })
}

/// Decode one world container record at the reader's position.
pub fn decode_container<R: Read + Seek>(
    r: &mut LittleEndianReader<R>,
    catalog: &dyn ItemCatalog,
) -> Result<Container> {
    let header = ContainerHeader::decode_world(r)?;
    if !(header.location_type == 6 || header.location_type == 9 || header.capacity > 0) {
        return Err(DecodeError::invariant(
            header.address,
            format!(
                "container with location type {} has no capacity",
                header.location_type
            ),
        ));
    }
    let container_type = header.container_type()?;
    let inventory = decode_header_inventory(r, &header, catalog)?;
    let tail = ContainerTail::decode(r, container_type)?;
    debug!(
        address = format_args!("0x{:x}", header.address),
        container_type = %container_type,
        location_type = header.location_type,
        items = header.items,
        capacity = header.capacity,
        "container"
    );
    Ok(Container {
        header,
        inventory,
        tail,
    })
}

pub fn decode_zone_containers<R: Read + Seek>(
    r: &mut LittleEndianReader<R>,
    layout: &SaveLayout,
    zone: u8,
    catalog: &dyn ItemCatalog,
) -> Result<Vec<Container>> {
    let table = layout.zone_table(zone)?;
    info!(
        zone,
        offset = format_args!("0x{:x}", table.offset),
        count = table.count,
        "loading containers"
    );
    r.seek_to(table.offset)?;
    let mut containers = Vec::new();
    for _ in 0..table.count {
        containers.push(decode_container(r, catalog)?);
    }
    Ok(containers)
}

pub fn decode_gds_container<R: Read + Seek>(
    r: &mut LittleEndianReader<R>,
    catalog: &dyn ItemCatalog,
) -> Result<GdsContainer> {
    let header = ContainerHeader::decode_gds(r)?;
    let hotspot = header.hotspot()?;
    let container_type = header.container_type()?;
    let inventory = decode_header_inventory(r, &header, catalog)?;
    let shop = match container_type {
        ContainerType::Shop => Some(decode_shop(r)?),
        _ => None,
    };
    debug!(
        address = format_args!("0x{:x}", header.address),
        %hotspot,
        container_type = %container_type,
        "gds container"
    );
    Ok(GdsContainer {
        header,
        container_type,
        inventory,
        shop,
    })
}

pub fn decode_gds_shops<R: Read + Seek>(
    r: &mut LittleEndianReader<R>,
    table: &ShopTable,
    catalog: &dyn ItemCatalog,
) -> Result<Vec<GdsContainer>> {
    info!(
        offset = format_args!("0x{:x}", table.offset),
        count = table.count,
        "loading shops"
    );
    r.seek_to(table.offset)?;
    let mut shops = Vec::new();
    for _ in 0..table.count {
        shops.push(decode_gds_container(r, catalog)?);
    }
    Ok(shops)
}

pub fn decode_combat_inventories<R: Read + Seek>(
    r: &mut LittleEndianReader<R>,
    offset: u64,
    count: usize,
    catalog: &dyn ItemCatalog,
) -> Result<Vec<CombatInventory>> {
    info!(offset = format_args!("0x{offset:x}"), count, "loading combat inventories");
    r.seek_to(offset)?;
    let mut inventories = Vec::new();
    for _ in 0..count {
        let header = ContainerHeader::decode_combat(r)?;
        let inventory = decode_header_inventory(r, &header, catalog)?;
        inventories.push(CombatInventory { header, inventory });
    }
    Ok(inventories)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    fn reader(bytes: &[u8]) -> LittleEndianReader<Cursor<&[u8]>> {
        LittleEndianReader::new(Cursor::new(bytes))
    }

    #[test]
    fn every_known_tag_round_trips_through_raw() {
        for raw in 0..=u8::MAX {
            if let Some(ty) = ContainerType::from_raw(raw) {
                assert_eq!(ty.raw(), raw);
            }
        }
        assert_eq!(ContainerType::from_raw(5), None);
        assert_eq!(ContainerType::from_raw(7), None);
    }

    #[test]
    fn wrong_location_variant_fails_loudly() {
        let mut bytes = vec![0u8; 16];
        bytes[0] = 3;
        let header = ContainerHeader::decode_world(&mut reader(&bytes)).expect("header");

        assert_eq!(header.zone().expect("zone"), ZoneNumber(3));
        let err = header.hotspot().unwrap_err();
        assert!(matches!(
            err,
            DecodeError::LocationMismatch {
                expected: "gds",
                found: "world",
                address: 0
            }
        ));
        assert!(header.combat().is_err());
    }

    #[test]
    fn gds_header_builds_hotspot_ref() {
        let mut bytes = vec![0xa, 0xb, 0xc, 0xd];
        bytes.extend_from_slice(&12u32.to_le_bytes());
        bytes.extend_from_slice(&3u32.to_le_bytes());
        bytes.extend_from_slice(&[0, 0, 0, 4]);
        let header = ContainerHeader::decode_gds(&mut reader(&bytes)).expect("header");

        assert_eq!(header.hotspot().expect("hotspot").to_string(), "12C");
        assert_eq!(header.container_type().expect("type"), ContainerType::Shop);
        assert!(header.position().is_err());
    }

    #[test]
    fn combat_header_requires_location_type_7() {
        let mut bytes = vec![0u8; 16];
        bytes[12] = 7;
        assert!(ContainerHeader::decode_combat(&mut reader(&bytes)).is_ok());
        bytes[12] = 6;
        assert!(matches!(
            ContainerHeader::decode_combat(&mut reader(&bytes)),
            Err(DecodeError::Invariant { .. })
        ));
    }

    #[test]
    fn shop_stats_are_sixteen_bytes() {
        let bytes: Vec<u8> = (1..=17).collect();
        let mut r = reader(&bytes);
        let shop = decode_shop(&mut r).expect("shop");
        assert_eq!(r.position().expect("position"), 16);
        assert_eq!(shop.haggle, u16::from_le_bytes([5, 6]));
        assert_eq!(shop.unknown, [10, 11, 12]);
        assert_eq!(shop.categories, u16::from_le_bytes([15, 16]));
    }
}
