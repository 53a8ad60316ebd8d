use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{DecodeError, Result};

pub const SAVE_NAME_OFFSET: u64 = 0x00;
pub const SAVE_NAME_LEN: usize = 30;
pub const CHAPTER_OFFSET: u64 = 0x5a;
pub const GOLD_OFFSET: u64 = 0x66;
pub const CLOCK_OFFSET: u64 = 0x6a;
pub const LOCATION_OFFSET: u64 = 0x76;

pub const CHARACTER_COUNT: usize = 6;
pub const CHARACTER_NAMES_OFFSET: u64 = 0x9f;
pub const CHARACTER_SKILLS_OFFSET: u64 = 0xdb;
pub const ACTIVE_CHARACTERS_OFFSET: u64 = 0x315;
pub const CHARACTER_CONDITIONS_OFFSET: u64 = 0x330;
pub const CHARACTER_INVENTORIES_OFFSET: u64 = 0x3a804;
pub const CHARACTER_INVENTORY_STRIDE: u64 = 0x70;
pub const PARTY_KEYS_OFFSET: u64 = 0x3aaa4;

pub const CHAPTER_OFFSETS_OFFSET: u64 = 0x11a3;
pub const CHAPTER_OFFSETS_COUNT: usize = 10;

pub const GDS_SHOPS_OFFSET: u64 = 0x443c9;
pub const GDS_SHOPS_COUNT: usize = 98;

pub const SIMPLE_FLAG_BASE: usize = 0x3a7f;
pub const COMPLEX_FLAG_BASE: usize = 0x55d8;

pub const NAME_WIDTH: u64 = 10;
pub const SKILL_RECORD_WIDTH: u64 = 95;
pub const CONDITION_RECORD_WIDTH: u64 = 7;
pub const LOCATION_WIDTH: u64 = 18;
pub const CHAPTER_OFFSET_RECORD_WIDTH: u64 = 22;
/// Smallest container record: the header with no slots and no tail.
pub const CONTAINER_HEADER_WIDTH: u64 = 16;

/// Highest word offset either flag scheme can touch, relative to its base,
/// plus the two bytes of the word itself.
const SIMPLE_FLAG_SPAN: u64 = ((0xdabf >> 3) & 0xfffe) + 2;
const COMPLEX_FLAG_SPAN: u64 = (0xffff / 10) + 2;

/// Container table for one world zone: where the records start and how many
/// there are. The file carries neither value; they were recovered by hand
/// for the supported game version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneTable {
    pub zone: u8,
    pub offset: u64,
    pub count: usize,
}

const fn zone(zone: u8, offset: u64, count: usize) -> ZoneTable {
    ZoneTable {
        zone,
        offset,
        count,
    }
}

pub const ZONE_CONTAINER_TABLES: [ZoneTable; 12] = [
    zone(1, 0x3b621, 36),
    zone(2, 0x3be55, 25),
    zone(3, 0x3c55f, 54),
    zone(4, 0x3d0b4, 65),
    zone(5, 0x3dc07, 63),
    zone(6, 0x3e708, 131),
    zone(7, 0x3f8b2, 115),
    zone(8, 0x40c97, 67),
    zone(9, 0x416b7, 110),
    zone(10, 0x42868, 25),
    zone(11, 0x43012, 30),
    zone(12, 0x4378f, 60),
];

pub const MIN_ZONE: u8 = 1;
pub const MAX_ZONE: u8 = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShopTable {
    pub offset: u64,
    pub count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlagLayout {
    pub simple_base: usize,
    pub complex_base: usize,
}

impl Default for FlagLayout {
    fn default() -> Self {
        Self {
            simple_base: SIMPLE_FLAG_BASE,
            complex_base: COMPLEX_FLAG_BASE,
        }
    }
}

/// Every fixed offset the save decoder relies on.
///
/// `Default` is the layout of the supported game version. A TOML file may
/// override any subset of fields; missing fields keep their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SaveLayout {
    pub save_name: u64,
    pub save_name_len: usize,
    pub chapter: u64,
    pub gold: u64,
    pub clock: u64,
    pub location: u64,
    pub character_count: usize,
    pub character_names: u64,
    pub character_skills: u64,
    pub active_characters: u64,
    pub character_conditions: u64,
    pub character_inventories: u64,
    pub inventory_stride: u64,
    pub party_keys: u64,
    pub chapter_offsets: u64,
    pub flags: FlagLayout,
    pub zones: Vec<ZoneTable>,
    pub gds_shops: ShopTable,
}

impl Default for SaveLayout {
    fn default() -> Self {
        Self {
            save_name: SAVE_NAME_OFFSET,
            save_name_len: SAVE_NAME_LEN,
            chapter: CHAPTER_OFFSET,
            gold: GOLD_OFFSET,
            clock: CLOCK_OFFSET,
            location: LOCATION_OFFSET,
            character_count: CHARACTER_COUNT,
            character_names: CHARACTER_NAMES_OFFSET,
            character_skills: CHARACTER_SKILLS_OFFSET,
            active_characters: ACTIVE_CHARACTERS_OFFSET,
            character_conditions: CHARACTER_CONDITIONS_OFFSET,
            character_inventories: CHARACTER_INVENTORIES_OFFSET,
            inventory_stride: CHARACTER_INVENTORY_STRIDE,
            party_keys: PARTY_KEYS_OFFSET,
            chapter_offsets: CHAPTER_OFFSETS_OFFSET,
            flags: FlagLayout::default(),
            zones: ZONE_CONTAINER_TABLES.to_vec(),
            gds_shops: ShopTable {
                offset: GDS_SHOPS_OFFSET,
                count: GDS_SHOPS_COUNT,
            },
        }
    }
}

impl SaveLayout {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn zone_table(&self, zone: u8) -> Result<&ZoneTable> {
        if !(MIN_ZONE..=MAX_ZONE).contains(&zone) {
            return Err(DecodeError::UnsupportedZone(zone));
        }
        self.zones
            .iter()
            .find(|t| t.zone == zone)
            .ok_or(DecodeError::UnsupportedZone(zone))
    }

    pub fn character_name_offset(&self, index: usize) -> u64 {
        self.character_names + NAME_WIDTH * index as u64
    }

    pub fn character_skills_offset(&self, index: usize) -> u64 {
        self.character_skills + SKILL_RECORD_WIDTH * index as u64
    }

    pub fn character_conditions_offset(&self, index: usize) -> u64 {
        self.character_conditions + CONDITION_RECORD_WIDTH * index as u64
    }

    pub fn character_inventory_offset(&self, index: usize) -> u64 {
        self.character_inventories + self.inventory_stride * index as u64
    }

    /// Check that the layout is usable against a buffer of `file_len` bytes.
    ///
    /// Fixed-width regions are bounds-checked in full. Zone and shop tables
    /// must hold at least a bare header per record; their real extent is
    /// bounds-checked while decoding.
    pub fn validate(&self, file_len: u64) -> Result<()> {
        let mut seen = BTreeSet::new();
        for table in &self.zones {
            if !(MIN_ZONE..=MAX_ZONE).contains(&table.zone) {
                return Err(DecodeError::Layout(format!(
                    "zone {} is outside {MIN_ZONE}..={MAX_ZONE}",
                    table.zone
                )));
            }
            if !seen.insert(table.zone) {
                return Err(DecodeError::Layout(format!(
                    "zone {} is listed more than once",
                    table.zone
                )));
            }
            check_region(
                "zone table",
                table.offset,
                table_width(table.count).max(1),
                file_len,
            )?;
        }

        let count = self.character_count as u64;
        let regions = [
            ("save name", self.save_name, self.save_name_len as u64),
            ("chapter", self.chapter, 2),
            ("gold", self.gold, 4),
            ("clock", self.clock, 8),
            ("location", self.location, LOCATION_WIDTH),
            ("character names", self.character_names, NAME_WIDTH.saturating_mul(count)),
            (
                "character skills",
                self.character_skills,
                SKILL_RECORD_WIDTH.saturating_mul(count),
            ),
            ("active characters", self.active_characters, count.saturating_add(1)),
            (
                "character conditions",
                self.character_conditions,
                CONDITION_RECORD_WIDTH.saturating_mul(count),
            ),
            (
                "character inventories",
                self.character_inventories,
                self.inventory_stride.saturating_mul(count),
            ),
            ("party keys", self.party_keys, 3),
            (
                "chapter offsets",
                self.chapter_offsets,
                CHAPTER_OFFSET_RECORD_WIDTH * CHAPTER_OFFSETS_COUNT as u64,
            ),
            (
                "simple flags",
                self.flags.simple_base as u64,
                SIMPLE_FLAG_SPAN,
            ),
            (
                "complex flags",
                self.flags.complex_base as u64,
                COMPLEX_FLAG_SPAN,
            ),
        ];
        for (name, offset, width) in regions {
            check_region(name, offset, width, file_len)?;
        }
        if self.gds_shops.count > 0 {
            check_region(
                "gds shops",
                self.gds_shops.offset,
                table_width(self.gds_shops.count),
                file_len,
            )?;
        }
        Ok(())
    }
}

fn table_width(count: usize) -> u64 {
    CONTAINER_HEADER_WIDTH.saturating_mul(count as u64)
}

fn check_region(name: &str, offset: u64, width: u64, file_len: u64) -> Result<()> {
    let end = offset.saturating_add(width);
    if end > file_len {
        return Err(DecodeError::Layout(format!(
            "{name} at 0x{offset:x}..0x{end:x} lies outside a {file_len} byte save"
        )));
    }
    Ok(())
}
