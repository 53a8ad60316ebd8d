use std::io::{Read, Seek};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::catalog::ItemCatalog;
use crate::character::{Character, decode_conditions, decode_skill_record};
use crate::error::{DecodeError, Result};
use crate::flags::EventFlags;
use crate::inventory::{Inventory, decode_inventory};
use crate::layout::{CHAPTER_OFFSETS_COUNT, MAX_ZONE, MIN_ZONE, NAME_WIDTH, SaveLayout};
use crate::reader::LittleEndianReader;
use crate::types::{
    CharIndex, GamePosition, Location, Royals, SKILL_COUNT, SKILL_NAMES, Time, WorldClock,
    ZoneNumber,
};

const MAX_COMBATANTS: usize = 7;
const EMPTY_COMBATANT: u16 = 0xffff;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Party {
    pub gold: Royals,
    pub keys: Inventory,
    pub characters: Vec<Character>,
    pub active: Vec<CharIndex>,
}

impl Party {
    pub fn character(&self, index: CharIndex) -> Option<&Character> {
        self.characters.get(usize::from(index.0))
    }

    /// Active characters in roster order. Indices with no character are
    /// skipped.
    pub fn active_characters(&self) -> impl Iterator<Item = &Character> {
        self.active.iter().filter_map(|&i| self.character(i))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterOffsets {
    pub chapter: u16,
    pub addresses: [u32; 5],
}

/// Combatant numbers taking part in one combat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombatEntityList(pub [Option<u16>; MAX_COMBATANTS]);

impl CombatEntityList {
    pub fn combatants(&self) -> impl Iterator<Item = u16> + '_ {
        self.0.iter().flatten().copied()
    }
}

/// Combat view of one skill. The two bytes after `limit` are not kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CombatSkill {
    pub max: u8,
    pub current: u8,
    pub limit: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombatStats {
    pub id: u16,
    pub unknown: [u8; 6],
    pub skills: [CombatSkill; SKILL_COUNT],
    pub unknown2: [u8; 7],
}

impl CombatStats {
    pub fn named(&self) -> impl Iterator<Item = (&'static str, &CombatSkill)> {
        SKILL_NAMES.into_iter().zip(self.skills.iter())
    }
}

// --- Header: save name, chapter ---

pub fn decode_save_name<R: Read + Seek>(
    r: &mut LittleEndianReader<R>,
    layout: &SaveLayout,
) -> Result<String> {
    r.seek_to(layout.save_name)?;
    Ok(r.read_fixed_string(layout.save_name_len)?)
}

pub fn decode_chapter<R: Read + Seek>(
    r: &mut LittleEndianReader<R>,
    layout: &SaveLayout,
) -> Result<u16> {
    r.seek_to(layout.chapter)?;
    Ok(r.read_u16()?)
}

// --- World: location, clock ---

pub fn decode_location<R: Read + Seek>(
    r: &mut LittleEndianReader<R>,
    layout: &SaveLayout,
) -> Result<Location> {
    r.seek_to(layout.location)?;
    let zone = r.read_u8()?;
    if !(MIN_ZONE..=MAX_ZONE).contains(&zone) {
        return Err(DecodeError::UnsupportedZone(zone));
    }
    let xtile = r.read_u8()?;
    let ytile = r.read_u8()?;
    let x = r.read_u32()?;
    let y = r.read_u32()?;
    r.skip(5)?;
    let heading = r.read_u16()?;

    info!(zone, tile = ?(xtile, ytile), x, y, heading, "location");
    Ok(Location {
        zone: ZoneNumber(zone),
        tile: (xtile, ytile),
        position: GamePosition { x, y },
        heading,
    })
}

pub fn decode_world_clock<R: Read + Seek>(
    r: &mut LittleEndianReader<R>,
    layout: &SaveLayout,
) -> Result<WorldClock> {
    r.seek_to(layout.clock)?;
    let clock = WorldClock {
        time: Time(r.read_u32()?),
        time_last_slept: Time(r.read_u32()?),
    };
    info!(time = %clock.time, last_slept = %clock.time_last_slept, "world clock");
    Ok(clock)
}

// --- Party: characters, roster, gold, keys ---

pub fn decode_characters<R: Read + Seek, B: AsRef<[u8]>>(
    r: &mut LittleEndianReader<R>,
    layout: &SaveLayout,
    flags: &EventFlags<B>,
    catalog: &dyn ItemCatalog,
) -> Result<Vec<Character>> {
    let mut characters = Vec::with_capacity(layout.character_count);
    for i in 0..layout.character_count {
        let index = u8::try_from(i)
            .map_err(|_| DecodeError::Layout(format!("character count {i} exceeds 255")))?;

        r.seek_to(layout.character_name_offset(i))?;
        let name = r.read_fixed_string(NAME_WIDTH as usize)?;
        debug!(index, %name, "character");

        r.seek_to(layout.character_skills_offset(i))?;
        let record = decode_skill_record(r, flags, index)?;

        r.seek_to(layout.character_inventory_offset(i))?;
        let inventory = decode_inventory(r, catalog)?;

        r.seek_to(layout.character_conditions_offset(i))?;
        let conditions = decode_conditions(r)?;

        characters.push(Character {
            index: CharIndex(index),
            name,
            skills: record.skills,
            spells: record.spells,
            unknown: record.unknown,
            unknown2: record.unknown2,
            conditions,
            inventory,
        });
    }
    Ok(characters)
}

pub fn decode_active_characters<R: Read + Seek>(
    r: &mut LittleEndianReader<R>,
    layout: &SaveLayout,
) -> Result<Vec<CharIndex>> {
    r.seek_to(layout.active_characters)?;
    let count = r.read_u8()?;
    let mut active = Vec::with_capacity(usize::from(count));
    for _ in 0..count {
        active.push(CharIndex(r.read_u8()?));
    }
    Ok(active)
}

pub fn decode_gold<R: Read + Seek>(
    r: &mut LittleEndianReader<R>,
    layout: &SaveLayout,
) -> Result<Royals> {
    r.seek_to(layout.gold)?;
    Ok(Royals(r.read_u32()?))
}

pub fn decode_party<R: Read + Seek, B: AsRef<[u8]>>(
    r: &mut LittleEndianReader<R>,
    layout: &SaveLayout,
    flags: &EventFlags<B>,
    catalog: &dyn ItemCatalog,
) -> Result<Party> {
    let characters = decode_characters(r, layout, flags, catalog)?;
    let active = decode_active_characters(r, layout)?;
    let gold = decode_gold(r, layout)?;
    r.seek_to(layout.party_keys)?;
    let keys = decode_inventory(r, catalog)?;
    Ok(Party {
        gold,
        keys,
        characters,
        active,
    })
}

// --- On demand: chapter offsets, combat entity lists, combat stats ---

pub fn decode_chapter_offsets<R: Read + Seek>(
    r: &mut LittleEndianReader<R>,
    offset: u64,
) -> Result<Vec<ChapterOffsets>> {
    r.seek_to(offset)?;
    let mut chapters = Vec::with_capacity(CHAPTER_OFFSETS_COUNT);
    for _ in 0..CHAPTER_OFFSETS_COUNT {
        let chapter = r.read_u16()?;
        let mut addresses = [0u32; 5];
        for address in &mut addresses {
            *address = r.read_u32()?;
        }
        chapters.push(ChapterOffsets { chapter, addresses });
    }
    Ok(chapters)
}

pub fn decode_combat_entity_lists<R: Read + Seek>(
    r: &mut LittleEndianReader<R>,
    offset: u64,
    count: usize,
) -> Result<Vec<CombatEntityList>> {
    r.seek_to(offset)?;
    let mut lists = Vec::new();
    for _ in 0..count {
        let mut combatants = [None; MAX_COMBATANTS];
        for slot in &mut combatants {
            let combatant = r.read_u16()?;
            *slot = (combatant != EMPTY_COMBATANT).then_some(combatant);
        }
        lists.push(CombatEntityList(combatants));
    }
    Ok(lists)
}

pub fn decode_combat_stats<R: Read + Seek>(
    r: &mut LittleEndianReader<R>,
    offset: u64,
    count: usize,
) -> Result<Vec<CombatStats>> {
    r.seek_to(offset)?;
    info!(offset = format_args!("0x{offset:x}"), count, "loading combat stats");
    let mut stats = Vec::new();
    for _ in 0..count {
        let id = r.read_u16()?;
        let unknown = r.read_array()?;
        let mut skills = [CombatSkill::default(); SKILL_COUNT];
        for skill in &mut skills {
            *skill = CombatSkill {
                max: r.read_u8()?,
                current: r.read_u8()?,
                limit: r.read_u8()?,
            };
            r.skip(2)?;
        }
        let unknown2 = r.read_array()?;
        debug!(id, "combat stats");
        stats.push(CombatStats {
            id,
            unknown,
            skills,
            unknown2,
        });
    }
    debug!(end = format_args!("0x{:x}", r.position()?), "combat stats end");
    Ok(stats)
}
