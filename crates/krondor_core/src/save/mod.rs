pub mod sections;

use std::io::{Cursor, Read};

use tracing::info;

use crate::catalog::ItemCatalog;
use crate::character::Character;
use crate::container::{
    CombatInventory, Container, GdsContainer, decode_combat_inventories, decode_gds_shops,
    decode_zone_containers,
};
use crate::error::{DecodeError, Result};
use crate::flags::{EventFlags, SetFlag};
use crate::layout::SaveLayout;
use crate::reader::LittleEndianReader;
use crate::types::{CharIndex, Location, WorldClock, ZoneNumber};
use sections::{
    ChapterOffsets, CombatEntityList, CombatStats, Party, decode_chapter, decode_chapter_offsets,
    decode_combat_entity_lists, decode_combat_stats, decode_location, decode_party,
    decode_save_name, decode_world_clock,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneContainers {
    pub zone: ZoneNumber,
    pub containers: Vec<Container>,
}

/// A decoded save: owns the raw buffer and everything decoded from it.
///
/// Decoding is a single forward pass and any failure aborts the load. After
/// loading, the only mutation is through event flags, which are written
/// straight into the buffer so [`GameData::as_bytes`] is always the save as
/// it should be written back.
#[derive(Debug, Clone)]
pub struct GameData {
    bytes: Vec<u8>,
    layout: SaveLayout,
    name: String,
    chapter: u16,
    location: Location,
    clock: WorldClock,
    party: Party,
    zones: Vec<ZoneContainers>,
    shops: Vec<GdsContainer>,
}

impl GameData {
    pub fn parse<R: Read>(
        mut reader: R,
        layout: SaveLayout,
        catalog: &dyn ItemCatalog,
    ) -> Result<Self> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        Self::from_bytes(bytes, layout, catalog)
    }

    pub fn from_bytes(
        bytes: Vec<u8>,
        layout: SaveLayout,
        catalog: &dyn ItemCatalog,
    ) -> Result<Self> {
        layout.validate(bytes.len() as u64)?;

        let flags = EventFlags::with_layout(bytes.as_slice(), layout.flags);
        let mut r = LittleEndianReader::new(Cursor::new(bytes.as_slice()));

        let name = decode_save_name(&mut r, &layout)?;
        info!(%name, len = bytes.len(), "loading save");
        let chapter = decode_chapter(&mut r, &layout)?;
        let location = decode_location(&mut r, &layout)?;
        let clock = decode_world_clock(&mut r, &layout)?;
        let party = decode_party(&mut r, &layout, &flags, catalog)?;

        let mut tables = layout.zones.clone();
        tables.sort_by_key(|t| t.zone);
        let mut zones = Vec::with_capacity(tables.len());
        for table in &tables {
            let containers = decode_zone_containers(&mut r, &layout, table.zone, catalog)?;
            zones.push(ZoneContainers {
                zone: ZoneNumber(table.zone),
                containers,
            });
        }

        let shops = decode_gds_shops(&mut r, &layout.gds_shops, catalog)?;
        let end = r.position()?;
        info!(
            end = format_args!("0x{end:x}"),
            shops = shops.len(),
            "save loaded"
        );

        Ok(Self {
            bytes,
            layout,
            name,
            chapter,
            location,
            clock,
            party,
            zones,
            shops,
        })
    }

    pub fn layout(&self) -> &SaveLayout {
        &self.layout
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn chapter(&self) -> u16 {
        self.chapter
    }

    pub fn location(&self) -> &Location {
        &self.location
    }

    pub fn clock(&self) -> &WorldClock {
        &self.clock
    }

    pub fn party(&self) -> &Party {
        &self.party
    }

    pub fn character(&self, index: CharIndex) -> Option<&Character> {
        self.party.character(index)
    }

    pub fn zones(&self) -> &[ZoneContainers] {
        &self.zones
    }

    pub fn containers(&self, zone: ZoneNumber) -> Option<&[Container]> {
        self.zones
            .iter()
            .find(|z| z.zone == zone)
            .map(|z| z.containers.as_slice())
    }

    pub fn shops(&self) -> &[GdsContainer] {
        &self.shops
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn flags(&self) -> EventFlags<&[u8]> {
        EventFlags::with_layout(self.bytes.as_slice(), self.layout.flags)
    }

    pub fn flags_mut(&mut self) -> EventFlags<&mut [u8]> {
        EventFlags::with_layout(self.bytes.as_mut_slice(), self.layout.flags)
    }

    pub fn read_event(&self, event_ptr: u16) -> Result<u8> {
        self.flags().read_bit(event_ptr)
    }

    pub fn read_event_bool(&self, event_ptr: u16) -> Result<bool> {
        self.flags().read_bool(event_ptr)
    }

    pub fn set_event_flag_true(&mut self, event_ptr: u16) -> Result<()> {
        self.flags_mut().set_true(event_ptr)
    }

    pub fn set_event_flag_false(&mut self, event_ptr: u16) -> Result<()> {
        self.flags_mut().set_false(event_ptr)
    }

    pub fn set_event_dialog_action(&mut self, set_flag: &SetFlag) -> Result<()> {
        self.flags_mut().set_event_dialog_action(set_flag)
    }

    /// Clear the character's unseen-improvement flags in the buffer and in
    /// the decoded skills.
    pub fn clear_unseen_improvements(&mut self, character: CharIndex) -> Result<()> {
        self.flags_mut().clear_unseen_improvements(character.0)?;
        if let Some(c) = self.party.characters.get_mut(usize::from(character.0)) {
            c.skills.clear_unseen_improvements();
        }
        Ok(())
    }

    fn reader(&self) -> LittleEndianReader<Cursor<&[u8]>> {
        LittleEndianReader::new(Cursor::new(self.bytes.as_slice()))
    }

    fn check_offset(&self, offset: u64) -> Result<()> {
        let len = self.bytes.len() as u64;
        if offset >= len {
            return Err(DecodeError::OutOfRange { offset, len });
        }
        Ok(())
    }

    pub fn chapter_offsets(&self) -> Result<Vec<ChapterOffsets>> {
        decode_chapter_offsets(&mut self.reader(), self.layout.chapter_offsets)
    }

    pub fn combat_entity_lists(&self, offset: u64, count: usize) -> Result<Vec<CombatEntityList>> {
        self.check_offset(offset)?;
        decode_combat_entity_lists(&mut self.reader(), offset, count)
    }

    pub fn combat_stats(&self, offset: u64, count: usize) -> Result<Vec<CombatStats>> {
        self.check_offset(offset)?;
        decode_combat_stats(&mut self.reader(), offset, count)
    }

    pub fn combat_inventories(
        &self,
        offset: u64,
        count: usize,
        catalog: &dyn ItemCatalog,
    ) -> Result<Vec<CombatInventory>> {
        self.check_offset(offset)?;
        decode_combat_inventories(&mut self.reader(), offset, count, catalog)
    }
}
