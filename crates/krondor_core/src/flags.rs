//! Event flags: single persistent bits in the save buffer, keyed by a 16-bit
//! event pointer.
//!
//! Pointers below [`COMPLEX_EVENT_THRESHOLD`] map linearly onto a bit array
//! starting at the simple base. Pointers at or above it are packed ten to a
//! byte (nine usable bits, digit 0 and 1 share bit 0) starting at the complex
//! base. Both schemes read and write a little-endian 16-bit word, so a flag
//! may live in the high byte of the word.

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::error::{DecodeError, Result};
use crate::layout::{FlagLayout, MAX_ZONE, MIN_ZONE};
use crate::types::ZoneNumber;

pub const COMPLEX_EVENT_THRESHOLD: u16 = 0xdac0;

pub const SKILL_SELECTED_FLAG: u16 = 0x1856;
pub const SKILL_IMPROVEMENT_FLAG: u16 = 0x18ce;
/// Flags reserved per character for skills, one more than the skill count.
pub const SKILL_FLAG_STRIDE: u16 = 0x11;

pub const CONVERSATION_CHOICE_MARKED_FLAG: u16 = 0x1d4c;
pub const CONVERSATION_OPTION_INHIBITED_FLAG: u16 = 0x1a2c;
pub const LOCK_HAS_BEEN_SEEN_FLAG: u16 = 0x1c98;

const ENCOUNTER_STATE_OFFSET: u16 = 0x190;
const MAX_ENCOUNTERS_PER_TILE: u16 = 0xa;
const RECENT_ENCOUNTER_FLAG: u16 = 0x1450;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlagAddress {
    pub byte_offset: usize,
    pub bit_offset: u32,
}

pub fn is_complex(event_ptr: u16) -> bool {
    event_ptr >= COMPLEX_EVENT_THRESHOLD
}

pub fn complex_event_offset(event_ptr: u16, complex_base: usize) -> FlagAddress {
    let source = (u32::from(event_ptr) + 0x2540) & 0xffff;
    let digit = source % 10;
    let address = FlagAddress {
        byte_offset: (source / 10) as usize + complex_base,
        bit_offset: if digit != 0 { digit - 1 } else { 0 },
    };
    trace!(
        event_ptr = format_args!("0x{event_ptr:x}"),
        byte = format_args!("0x{:x}", address.byte_offset),
        bit = address.bit_offset,
        "complex event offset"
    );
    address
}

pub fn simple_event_offset(event_ptr: u16, simple_base: usize) -> FlagAddress {
    let address = FlagAddress {
        byte_offset: usize::from((event_ptr >> 3) & 0xfffe) + simple_base,
        bit_offset: u32::from(event_ptr & 0xf),
    };
    trace!(
        event_ptr = format_args!("0x{event_ptr:x}"),
        byte = format_args!("0x{:x}", address.byte_offset),
        bit = address.bit_offset,
        "event offset"
    );
    address
}

/// Per-chapter "already encountered" flag for one encounter slot of a tile.
/// Only world zones have encounter flags.
pub fn unique_encounter_state_flag(
    zone: ZoneNumber,
    tile_index: u8,
    encounter_index: u8,
) -> Result<u16> {
    if !(MIN_ZONE..=MAX_ZONE).contains(&zone.0) {
        return Err(DecodeError::UnsupportedZone(zone.0));
    }
    let zone_offset = u16::from(zone.0 - 1) * ENCOUNTER_STATE_OFFSET;
    let tile_offset = u16::from(tile_index) * MAX_ENCOUNTERS_PER_TILE;
    Ok(zone_offset + tile_offset + u16::from(encounter_index) + ENCOUNTER_STATE_OFFSET)
}

/// "Recently encountered" flag, cleared whenever the party changes tile.
pub fn recent_encounter_state_flag(encounter_index: u8) -> u16 {
    RECENT_ENCOUNTER_FLAG + u16::from(encounter_index)
}

fn skill_flag(base: u16, character: u8, skill: u8) -> u16 {
    base + u16::from(character) * SKILL_FLAG_STRIDE + u16::from(skill)
}

/// `base + index`, or an error when the sum leaves the 16-bit pointer space.
pub fn indexed_flag(base: u16, index: u16) -> Result<u16> {
    base.checked_add(index)
        .ok_or(DecodeError::EventPointerOverflow { base, index })
}

/// Dialog action that updates event state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetFlag {
    pub event_pointer: u16,
    pub event_mask: u8,
    pub event_data: u8,
    pub always_zero: u16,
    pub event_value: u16,
}

/// The event-flag part of a world encounter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Encounter {
    pub index: u8,
    pub tile_index: u8,
    /// Encounter is inactive while this flag is set.
    pub save_address: u16,
    /// Encounter is inactive while this flag is set.
    pub save_address2: u16,
    /// Set once the encounter has run.
    pub save_address3: u16,
    pub unknown2: u8,
    pub unknown3: u8,
}

/// Bit-addressable view over a save buffer.
pub struct EventFlags<B> {
    buf: B,
    bases: FlagLayout,
}

impl<B: AsRef<[u8]>> EventFlags<B> {
    pub fn new(buf: B) -> Self {
        Self::with_layout(buf, FlagLayout::default())
    }

    pub fn with_layout(buf: B, bases: FlagLayout) -> Self {
        Self { buf, bases }
    }

    pub fn into_inner(self) -> B {
        self.buf
    }

    pub fn address(&self, event_ptr: u16) -> FlagAddress {
        if is_complex(event_ptr) {
            complex_event_offset(event_ptr, self.bases.complex_base)
        } else {
            simple_event_offset(event_ptr, self.bases.simple_base)
        }
    }

    /// The 16-bit word holding `event_ptr`, with the word's offset.
    pub fn word(&self, event_ptr: u16) -> Result<(FlagAddress, u16)> {
        let address = self.address(event_ptr);
        let bytes = self.buf.as_ref();
        let word = bytes
            .get(address.byte_offset..address.byte_offset + 2)
            .ok_or(DecodeError::OutOfRange {
                offset: address.byte_offset as u64,
                len: bytes.len() as u64,
            })?;
        Ok((address, u16::from_le_bytes([word[0], word[1]])))
    }

    pub fn read_bit(&self, event_ptr: u16) -> Result<u8> {
        let (address, word) = self.word(event_ptr)?;
        let bit = ((word >> address.bit_offset) & 1) as u8;
        trace!(
            byte = format_args!("0x{:x}", address.byte_offset),
            bit = address.bit_offset,
            value = bit,
            "read event flag"
        );
        Ok(bit)
    }

    pub fn read_bool(&self, event_ptr: u16) -> Result<bool> {
        Ok(self.read_bit(event_ptr)? == 1)
    }

    pub fn read_skill_selected(&self, character: u8, skill: u8) -> Result<bool> {
        self.read_bool(skill_flag(SKILL_SELECTED_FLAG, character, skill))
    }

    pub fn read_skill_unseen_improvement(&self, character: u8, skill: u8) -> Result<bool> {
        self.read_bool(skill_flag(SKILL_IMPROVEMENT_FLAG, character, skill))
    }

    pub fn read_conversation_item_clicked(&self, event_ptr: u16) -> Result<bool> {
        self.read_bool(indexed_flag(CONVERSATION_CHOICE_MARKED_FLAG, event_ptr)?)
    }

    pub fn check_conversation_option_inhibited(&self, event_ptr: u16) -> Result<bool> {
        self.read_bool(indexed_flag(CONVERSATION_OPTION_INHIBITED_FLAG, event_ptr)?)
    }

    pub fn check_lock_has_been_seen(&self, lock_index: u16) -> Result<bool> {
        self.read_bool(indexed_flag(LOCK_HAS_BEEN_SEEN_FLAG, lock_index)?)
    }

    /// Whether `encounter` may trigger in `zone`. A save address of 0 means
    /// the encounter has no such gate.
    pub fn check_active(&self, encounter: &Encounter, zone: ZoneNumber) -> Result<bool> {
        let already_encountered = self.read_bool(unique_encounter_state_flag(
            zone,
            encounter.tile_index,
            encounter.index,
        )?)?;
        let recently_encountered =
            self.read_bool(recent_encounter_state_flag(encounter.index))?;
        let gate1 = encounter.save_address != 0 && self.read_bool(encounter.save_address)?;
        let gate2 = encounter.save_address2 != 0 && self.read_bool(encounter.save_address2)?;
        Ok(!(already_encountered || recently_encountered || gate1 || gate2))
    }
}

impl<B: AsRef<[u8]> + AsMut<[u8]>> EventFlags<B> {
    pub fn write_bit(&mut self, event_ptr: u16, value: bool) -> Result<()> {
        let (address, original) = self.word(event_ptr)?;
        let mask = 1u16 << address.bit_offset;
        let word = if value {
            original | mask
        } else {
            original & !mask
        };
        let at = address.byte_offset;
        self.buf.as_mut()[at..at + 2].copy_from_slice(&word.to_le_bytes());
        debug!(
            event_ptr = format_args!("0x{event_ptr:x}"),
            byte = format_args!("0x{at:x}"),
            bit = address.bit_offset,
            original = format_args!("0x{original:04x}"),
            new = format_args!("0x{word:04x}"),
            "set event flag"
        );
        Ok(())
    }

    pub fn set_event_flag(&mut self, event_ptr: u16, value: u16) -> Result<()> {
        self.write_bit(event_ptr, value != 0)
    }

    pub fn set_true(&mut self, event_ptr: u16) -> Result<()> {
        self.write_bit(event_ptr, true)
    }

    pub fn set_false(&mut self, event_ptr: u16) -> Result<()> {
        self.write_bit(event_ptr, false)
    }

    /// Apply a dialog [`SetFlag`].
    ///
    /// A complex pointer that is a multiple of ten addresses a whole byte:
    /// it is updated as `((byte & mask) | data) ^ always_zero`. Every other
    /// pointer falls back to setting up to three flags to `event_value`:
    /// the pointer itself, then the mask and the always-zero field each
    /// read as a pointer. Zero fields are skipped.
    pub fn set_event_dialog_action(&mut self, set_flag: &SetFlag) -> Result<()> {
        let ptr = set_flag.event_pointer;
        if is_complex(ptr) && ptr % 10 == 0 {
            let offset = complex_event_offset(ptr, self.bases.complex_base).byte_offset;
            let bytes = self.buf.as_mut();
            let len = bytes.len() as u64;
            let byte = bytes.get_mut(offset).ok_or(DecodeError::OutOfRange {
                offset: offset as u64,
                len,
            })?;
            let data = *byte;
            let new_data =
                ((data & set_flag.event_mask) | set_flag.event_data) ^ (set_flag.always_zero as u8);
            *byte = new_data;
            debug!(
                ?set_flag,
                byte = format_args!("0x{offset:x}"),
                original = format_args!("0x{data:02x}"),
                new = format_args!("0x{new_data:02x}"),
                "dialog action"
            );
            return Ok(());
        }

        let value = set_flag.event_value;
        if ptr != 0 {
            self.set_event_flag(ptr, value)?;
        }
        if set_flag.event_mask != 0 {
            self.set_event_flag(u16::from(set_flag.event_mask), value)?;
        }
        if set_flag.always_zero != 0 {
            self.set_event_flag(set_flag.always_zero, value)?;
        }
        Ok(())
    }

    pub fn clear_unseen_improvements(&mut self, character: u8) -> Result<()> {
        for skill in 0..SKILL_FLAG_STRIDE as u8 {
            self.set_false(skill_flag(SKILL_IMPROVEMENT_FLAG, character, skill))?;
        }
        Ok(())
    }

    pub fn set_conversation_item_clicked(&mut self, event_ptr: u16) -> Result<()> {
        self.set_true(indexed_flag(CONVERSATION_CHOICE_MARKED_FLAG, event_ptr)?)
    }

    pub fn set_lock_has_been_seen(&mut self, lock_index: u16) -> Result<()> {
        self.set_true(indexed_flag(LOCK_HAS_BEEN_SEEN_FLAG, lock_index)?)
    }

    /// Flags to set after a dialog encounter. Dialog encounters always
    /// record against zone 1.
    pub fn set_post_dialog_event_flags(&mut self, encounter: &Encounter) -> Result<()> {
        if encounter.save_address3 != 0 {
            self.set_true(encounter.save_address3)?;
        }
        // unknown3 marks encounters that fire every time (e.g. danger zones).
        if encounter.unknown3 == 0 {
            if encounter.unknown2 != 0 {
                self.set_true(unique_encounter_state_flag(
                    ZoneNumber(1),
                    encounter.tile_index,
                    encounter.index,
                )?)?;
            }
            self.set_true(recent_encounter_state_flag(encounter.index))?;
        }
        Ok(())
    }

    pub fn set_post_gds_event_flags(&mut self, encounter: &Encounter) -> Result<()> {
        if encounter.save_address3 != 0 {
            self.set_true(encounter.save_address3)?;
        }
        Ok(())
    }

    pub fn set_post_enable_or_disable_event_flags(
        &mut self,
        encounter: &Encounter,
        zone: ZoneNumber,
    ) -> Result<()> {
        let unique = if encounter.unknown2 != 0 {
            Some(unique_encounter_state_flag(
                zone,
                encounter.tile_index,
                encounter.index,
            )?)
        } else {
            None
        };
        if encounter.save_address3 != 0 {
            self.set_true(encounter.save_address3)?;
        }
        if let Some(flag) = unique {
            self.set_true(flag)?;
        }
        Ok(())
    }

    pub fn clear_tile_recent_encounters(&mut self) -> Result<()> {
        for index in 0..MAX_ENCOUNTERS_PER_TILE as u8 {
            self.set_false(recent_encounter_state_flag(index))?;
        }
        Ok(())
    }
}
