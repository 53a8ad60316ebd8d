use std::fmt;

use serde::{Deserialize, Serialize};

pub const SKILL_COUNT: usize = 16;
pub const CONDITION_COUNT: usize = 7;
pub const SPELL_BYTES: usize = 6;

pub const SKILL_NAMES: [&str; SKILL_COUNT] = [
    "Health",
    "Stamina",
    "Speed",
    "Strength",
    "Defense",
    "Crossbow",
    "Melee",
    "Casting",
    "Assessment",
    "Armorcraft",
    "Weaponcraft",
    "Barding",
    "Haggling",
    "Lockpick",
    "Scouting",
    "Stealth",
];

pub const CONDITION_NAMES: [&str; CONDITION_COUNT] = [
    "Sick",
    "Plagued",
    "Poisoned",
    "Drunk",
    "Healing",
    "Starving",
    "Near Death",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ZoneNumber(pub u8);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CharIndex(pub u8);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemIndex(pub u8);

/// Dialog key linking a record to script or dialog content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeyTarget(pub u32);

impl fmt::Display for KeyTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:x}", self.0)
    }
}

/// Currency in royals. Ten royals make a sovereign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Royals(pub u32);

impl Royals {
    pub fn sovereigns(self) -> u32 {
        self.0 / 10
    }

    pub fn remaining_royals(self) -> u32 {
        self.0 % 10
    }
}

impl fmt::Display for Royals {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}s {}r", self.sovereigns(), self.remaining_royals())
    }
}

const TICKS_PER_DAY: u32 = 0xa8c0;
const TICKS_PER_HOUR: u32 = 0x708;
const TICKS_PER_MINUTE: u32 = 0x1e;

/// Game time in ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Time(pub u32);

impl Time {
    pub fn days(self) -> u32 {
        self.0 / TICKS_PER_DAY
    }

    pub fn hour(self) -> u32 {
        (self.0 % TICKS_PER_DAY) / TICKS_PER_HOUR
    }

    pub fn minutes(self) -> u32 {
        (self.0 % TICKS_PER_HOUR) / TICKS_PER_MINUTE
    }
}

impl fmt::Display for Time {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "day {} {:02}:{:02}",
            self.days(),
            self.hour(),
            self.minutes()
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldClock {
    pub time: Time,
    pub time_last_slept: Time,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GamePosition {
    pub x: u32,
    pub y: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub zone: ZoneNumber,
    pub tile: (u8, u8),
    pub position: GamePosition,
    pub heading: u16,
}

/// Reference to a building-interior scene hotspot, e.g. `12B`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HotspotRef {
    pub gds_number: u8,
    pub gds_char: char,
}

impl HotspotRef {
    /// Scene characters are stored as 0 or 1 for `A`, then counting up.
    pub fn from_raw(gds_number: u8, raw_char: u32) -> Self {
        let offset = raw_char.saturating_sub(1).min(25) as u8;
        Self {
            gds_number,
            gds_char: char::from(b'A' + offset),
        }
    }
}

impl fmt::Display for HotspotRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.gds_number, self.gds_char)
    }
}
