use std::io::{Read, Seek};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;
use crate::flags::EventFlags;
use crate::inventory::Inventory;
use crate::reader::LittleEndianReader;
use crate::types::{
    CONDITION_COUNT, CONDITION_NAMES, CharIndex, SKILL_COUNT, SKILL_NAMES, SPELL_BYTES,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Skill {
    pub max: u8,
    pub current: u8,
    pub limit: u8,
    pub experience: u8,
    pub modifier: i8,
    /// Selected for training. Stored as an event flag, not in the record.
    pub selected: bool,
    /// Improved since the player last looked. Stored as an event flag.
    pub unseen_improvement: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Skills(pub [Skill; SKILL_COUNT]);

impl Skills {
    pub fn get(&self, index: usize) -> Option<&Skill> {
        self.0.get(index)
    }

    pub fn named(&self) -> impl Iterator<Item = (&'static str, &Skill)> {
        SKILL_NAMES.into_iter().zip(self.0.iter())
    }

    pub fn clear_unseen_improvements(&mut self) {
        for skill in &mut self.0 {
            skill.unseen_improvement = false;
        }
    }
}

/// Owned spells as a 48-bit little-endian bit set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Spells(pub [u8; SPELL_BYTES]);

impl Spells {
    pub fn has_spell(&self, index: usize) -> bool {
        self.0
            .get(index / 8)
            .is_some_and(|byte| byte & (1 << (index % 8)) != 0)
    }

    pub fn indices(&self) -> Vec<usize> {
        (0..SPELL_BYTES * 8).filter(|&i| self.has_spell(i)).collect()
    }
}

/// Per-condition severity, 0 meaning unaffected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Conditions(pub [u8; CONDITION_COUNT]);

impl Conditions {
    pub fn named(&self) -> impl Iterator<Item = (&'static str, u8)> + '_ {
        CONDITION_NAMES.into_iter().zip(self.0.iter().copied())
    }

    pub fn active(&self) -> impl Iterator<Item = (&'static str, u8)> + '_ {
        self.named().filter(|(_, v)| *v != 0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Character {
    pub index: CharIndex,
    pub name: String,
    pub skills: Skills,
    pub spells: Spells,
    pub unknown: [u8; 2],
    pub unknown2: [u8; 7],
    pub conditions: Conditions,
    pub inventory: Inventory,
}

/// The fixed-width part of a character: spells and skills.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkillRecord {
    pub unknown: [u8; 2],
    pub spells: Spells,
    pub skills: Skills,
    pub unknown2: [u8; 7],
}

/// Decode the 95-byte skill record of `character`. The `selected` and
/// `unseen_improvement` booleans are looked up in `flags`.
pub fn decode_skill_record<R: Read + Seek, B: AsRef<[u8]>>(
    r: &mut LittleEndianReader<R>,
    flags: &EventFlags<B>,
    character: u8,
) -> Result<SkillRecord> {
    let unknown = r.read_array::<2>()?;
    let spells = Spells(r.read_array::<SPELL_BYTES>()?);

    let mut skills = Skills::default();
    for (i, skill) in skills.0.iter_mut().enumerate() {
        let max = r.read_u8()?;
        let current = r.read_u8()?;
        let limit = r.read_u8()?;
        let experience = r.read_u8()?;
        let modifier = r.read_i8()?;
        *skill = Skill {
            max,
            current,
            limit,
            experience,
            modifier,
            selected: flags.read_skill_selected(character, i as u8)?,
            unseen_improvement: flags.read_skill_unseen_improvement(character, i as u8)?,
        };
    }

    let unknown2 = r.read_array::<7>()?;
    let end = r.position()?;
    debug!(character, end = format_args!("0x{end:x}"), "skill record");
    Ok(SkillRecord {
        unknown,
        spells,
        skills,
        unknown2,
    })
}

pub fn decode_conditions<R: Read + Seek>(r: &mut LittleEndianReader<R>) -> Result<Conditions> {
    Ok(Conditions(r.read_array::<CONDITION_COUNT>()?))
}
