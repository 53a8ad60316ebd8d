//! Synthetic save buffers and model tables for tests.
//!
//! Real saves and resource files cannot ship with the repository, so tests
//! build small buffers with the same record shapes. [`SaveBuilder`] packs
//! everything into a compact layout instead of the game's fixed offsets and
//! returns that layout alongside the bytes.

use crate::container::{ContainerTail, ContainerType, LockStats, ShopStats};
use crate::flags::EventFlags;
use crate::layout::{FlagLayout, SaveLayout, ShopTable, ZoneTable};
use crate::model::EF_UNBOUNDED;

const CHARACTERS: usize = 6;
const ZONES_START: usize = 0x3d00;
const INVENTORY_STRIDE: usize = 0x70;

/// Scalar offsets of the compact layout. Zone and shop tables are placed
/// by [`SaveBuilder::build`] after everything else.
fn compact_scalars() -> SaveLayout {
    SaveLayout {
        save_name: 0x00,
        save_name_len: 30,
        chapter: 0x20,
        gold: 0x24,
        clock: 0x28,
        location: 0x30,
        character_count: CHARACTERS,
        character_names: 0x50,
        character_skills: 0x90,
        active_characters: 0x2d0,
        character_conditions: 0x2e0,
        chapter_offsets: 0x310,
        flags: FlagLayout {
            simple_base: 0x400,
            complex_base: 0x2000,
        },
        character_inventories: 0x3a00,
        inventory_stride: INVENTORY_STRIDE as u64,
        party_keys: 0x3ca0,
        zones: Vec::new(),
        gds_shops: ShopTable { offset: 0, count: 0 },
    }
}

/// Layout of a save built by `SaveBuilder::new().build()`.
pub fn compact_layout() -> SaveLayout {
    SaveBuilder::new().build().layout
}

fn put(bytes: &mut [u8], offset: u64, data: &[u8]) {
    let at = offset as usize;
    bytes[at..at + data.len()].copy_from_slice(data);
}

pub fn encode_lock(lock: &LockStats) -> [u8; 4] {
    [
        lock.lock_flag,
        lock.picklock,
        lock.fairy_chest_index,
        lock.damage,
    ]
}

pub fn encode_shop(shop: &ShopStats) -> Vec<u8> {
    let mut bytes = vec![
        shop.temple_number,
        shop.sell_factor,
        shop.max_discount,
        shop.buy_factor,
    ];
    bytes.extend_from_slice(&shop.haggle.to_le_bytes());
    bytes.extend_from_slice(&[
        shop.barding_skill,
        shop.barding_reward,
        shop.barding_max_reward,
    ]);
    bytes.extend_from_slice(&shop.unknown);
    bytes.extend_from_slice(&[shop.repair_types, shop.repair_factor]);
    bytes.extend_from_slice(&shop.categories.to_le_bytes());
    bytes
}

pub fn encode_tail(tail: &ContainerTail) -> Vec<u8> {
    let mut bytes = Vec::new();
    match tail {
        ContainerTail::Shop {
            unknown,
            dialog,
            shop,
        }
        | ContainerTail::Inn {
            unknown,
            dialog,
            shop,
        } => {
            bytes.extend_from_slice(unknown);
            bytes.extend_from_slice(&dialog.0.to_le_bytes());
            bytes.extend(encode_shop(shop));
        }
        ContainerTail::Gravestone { unknown, dialog } => {
            bytes.extend_from_slice(unknown);
            bytes.extend_from_slice(&dialog.0.to_le_bytes());
        }
        ContainerTail::Bag => {}
        ContainerTail::CT1 { lock } | ContainerTail::Chest { lock } => {
            bytes.extend_from_slice(&encode_lock(lock));
        }
        ContainerTail::Building {
            lock,
            unknown,
            dialog,
        } => {
            bytes.extend_from_slice(&encode_lock(lock));
            bytes.extend_from_slice(unknown);
            bytes.extend_from_slice(&dialog.0.to_le_bytes());
        }
        ContainerTail::FairyChest { lock, dialog } => {
            bytes.extend_from_slice(&encode_lock(lock));
            bytes.extend_from_slice(&dialog.0.to_le_bytes());
        }
        ContainerTail::EventChest { lock, unknown } => {
            bytes.extend_from_slice(&encode_lock(lock));
            bytes.extend_from_slice(unknown);
        }
        ContainerTail::TimirianyaHut { unknown } => bytes.extend_from_slice(unknown),
        ContainerTail::Combat {
            unknown,
            dialog,
            unknown2,
        } => {
            bytes.extend_from_slice(unknown);
            bytes.extend_from_slice(&dialog.0.to_le_bytes());
            bytes.extend_from_slice(unknown2);
        }
    }
    bytes
}

fn encode_slots(items: &[[u8; 4]], capacity: usize) -> Vec<u8> {
    let mut bytes: Vec<u8> = items.iter().flatten().copied().collect();
    bytes.resize(capacity.max(items.len()) * 4, 0);
    bytes
}

/// One world container record.
#[derive(Debug, Clone)]
pub struct ContainerRecord {
    pub zone: u8,
    pub unknown: [u8; 3],
    pub position: (u32, u32),
    pub location_type: u8,
    pub capacity: u8,
    pub items: Vec<[u8; 4]>,
    pub tail: ContainerTail,
    /// Written instead of the tail's own type tag when set.
    pub raw_type: Option<u8>,
}

impl ContainerRecord {
    pub fn new(zone: u8, tail: ContainerTail) -> Self {
        Self {
            zone,
            unknown: [0; 3],
            position: (1000 * u32::from(zone), 2000),
            location_type: 0,
            capacity: 1,
            items: Vec::new(),
            tail,
            raw_type: None,
        }
    }

    pub fn with_items(mut self, items: Vec<[u8; 4]>, capacity: u8) -> Self {
        self.items = items;
        self.capacity = capacity;
        self
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut bytes = vec![self.zone];
        bytes.extend_from_slice(&self.unknown);
        bytes.extend_from_slice(&self.position.0.to_le_bytes());
        bytes.extend_from_slice(&self.position.1.to_le_bytes());
        let tag = self
            .raw_type
            .unwrap_or_else(|| self.tail.container_type().raw());
        bytes.extend_from_slice(&[
            self.location_type,
            self.items.len() as u8,
            self.capacity,
            tag,
        ]);
        bytes.extend(encode_slots(&self.items, usize::from(self.capacity)));
        bytes.extend(encode_tail(&self.tail));
        bytes
    }
}

/// One building-interior container record.
#[derive(Debug, Clone)]
pub struct ShopRecord {
    pub gds_number: u8,
    pub gds_char: u32,
    pub location_type: u8,
    pub capacity: u8,
    pub items: Vec<[u8; 4]>,
    pub container_type: u8,
    pub shop: ShopStats,
}

impl ShopRecord {
    pub fn new(gds_number: u8, gds_char: u32) -> Self {
        Self {
            gds_number,
            gds_char,
            location_type: 0,
            capacity: 2,
            items: vec![[0, 100, 0, 0]],
            container_type: ContainerType::Shop.raw(),
            shop: ShopStats {
                temple_number: 0,
                sell_factor: 60,
                max_discount: 20,
                buy_factor: 100,
                haggle: 50,
                ..ShopStats::default()
            },
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut bytes = vec![0u8; 4];
        bytes.extend_from_slice(&u32::from(self.gds_number).to_le_bytes());
        bytes.extend_from_slice(&self.gds_char.to_le_bytes());
        bytes.extend_from_slice(&[
            self.location_type,
            self.items.len() as u8,
            self.capacity,
            self.container_type,
        ]);
        bytes.extend(encode_slots(&self.items, usize::from(self.capacity)));
        if self.container_type == ContainerType::Shop.raw() {
            bytes.extend(encode_shop(&self.shop));
        }
        bytes
    }
}

#[derive(Debug, Clone)]
pub struct CharacterSpec {
    pub name: String,
    pub spells: [u8; 6],
    /// (max, current, limit, experience, modifier) per skill.
    pub skills: [(u8, u8, u8, u8, i8); 16],
    pub conditions: [u8; 7],
    pub capacity: u16,
    pub items: Vec<[u8; 4]>,
}

impl CharacterSpec {
    pub fn new(name: &str) -> Self {
        let mut skills = [(0, 0, 0, 0, 0); 16];
        for (i, skill) in skills.iter_mut().enumerate() {
            let i = i as u8;
            *skill = (40 + i, 30 + i, 90, i, 0);
        }
        Self {
            name: name.to_string(),
            spells: [0; 6],
            skills,
            conditions: [0; 7],
            capacity: 5,
            items: Vec::new(),
        }
    }
}

/// Save buffer plus the layout it was built with.
#[derive(Debug, Clone)]
pub struct SaveFixture {
    pub layout: SaveLayout,
    pub bytes: Vec<u8>,
    /// Where bytes passed to [`SaveBuilder::trailer`] start.
    pub trailer_offset: u64,
}

#[derive(Debug, Clone)]
pub struct SaveBuilder {
    name: String,
    chapter: u16,
    gold: u32,
    clock: (u32, u32),
    location: [u8; 3],
    position: (u32, u32),
    heading: u16,
    characters: Vec<CharacterSpec>,
    active: Vec<u8>,
    keys: Vec<[u8; 4]>,
    zones: Vec<Vec<ContainerRecord>>,
    shops: Vec<ShopRecord>,
    flags: Vec<(u16, bool)>,
    trailer: Vec<u8>,
}

impl Default for SaveBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SaveBuilder {
    /// Six characters, three active, one bag per zone and one shop.
    pub fn new() -> Self {
        let names = ["Locklear", "Gorath", "Owyn", "Pug", "James", "Patrus"];
        Self {
            name: "Fixture Save".to_string(),
            chapter: 1,
            gold: 1234,
            clock: (0xa8c0 + 9 * 0x708, 0x708),
            location: [1, 10, 12],
            position: (0x12345, 0x6789a),
            heading: 0x40,
            characters: names.iter().map(|n| CharacterSpec::new(n)).collect(),
            active: vec![0, 1, 2],
            keys: vec![[0, 1, 0, 0]],
            zones: (1..=12)
                .map(|z| vec![ContainerRecord::new(z, ContainerTail::Bag)])
                .collect(),
            shops: vec![ShopRecord::new(12, 2)],
            flags: Vec::new(),
            trailer: Vec::new(),
        }
    }

    pub fn name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    pub fn chapter(mut self, chapter: u16) -> Self {
        self.chapter = chapter;
        self
    }

    pub fn gold(mut self, gold: u32) -> Self {
        self.gold = gold;
        self
    }

    pub fn clock(mut self, time: u32, time_last_slept: u32) -> Self {
        self.clock = (time, time_last_slept);
        self
    }

    /// Raw zone byte and tile; the zone is not checked here.
    pub fn location(mut self, zone: u8, tile: (u8, u8)) -> Self {
        self.location = [zone, tile.0, tile.1];
        self
    }

    pub fn character(mut self, index: usize, spec: CharacterSpec) -> Self {
        self.characters[index] = spec;
        self
    }

    pub fn active(mut self, active: &[u8]) -> Self {
        self.active = active.to_vec();
        self
    }

    pub fn keys(mut self, keys: Vec<[u8; 4]>) -> Self {
        self.keys = keys;
        self
    }

    pub fn zone(mut self, zone: u8, records: Vec<ContainerRecord>) -> Self {
        self.zones[usize::from(zone) - 1] = records;
        self
    }

    pub fn shops(mut self, shops: Vec<ShopRecord>) -> Self {
        self.shops = shops;
        self
    }

    pub fn flag(mut self, event_ptr: u16, value: bool) -> Self {
        self.flags.push((event_ptr, value));
        self
    }

    pub fn trailer(mut self, bytes: &[u8]) -> Self {
        self.trailer = bytes.to_vec();
        self
    }

    pub fn build(self) -> SaveFixture {
        let mut layout = compact_scalars();
        let mut tables = Vec::new();
        let mut pos = ZONES_START;
        let mut zone_bytes = Vec::new();
        for (i, records) in self.zones.iter().enumerate() {
            tables.push(ZoneTable {
                zone: i as u8 + 1,
                offset: pos as u64,
                count: records.len(),
            });
            for record in records {
                let encoded = record.encode();
                pos += encoded.len();
                zone_bytes.extend(encoded);
            }
        }
        layout.zones = tables;
        layout.gds_shops = ShopTable {
            offset: pos as u64,
            count: self.shops.len(),
        };
        let shop_bytes: Vec<u8> = self.shops.iter().flat_map(ShopRecord::encode).collect();
        let trailer_offset = (pos + shop_bytes.len()) as u64;

        let mut bytes = vec![0u8; ZONES_START];
        bytes.extend(zone_bytes);
        bytes.extend(shop_bytes);
        bytes.extend_from_slice(&self.trailer);
        // Keep one spare byte so every table start lies inside the buffer.
        bytes.push(0);

        let mut name = self.name.into_bytes();
        name.resize(layout.save_name_len, 0);
        put(&mut bytes, layout.save_name, &name);
        put(&mut bytes, layout.chapter, &self.chapter.to_le_bytes());
        put(&mut bytes, layout.gold, &self.gold.to_le_bytes());
        put(&mut bytes, layout.clock, &self.clock.0.to_le_bytes());
        put(&mut bytes, layout.clock + 4, &self.clock.1.to_le_bytes());

        let mut location = self.location.to_vec();
        location.extend_from_slice(&self.position.0.to_le_bytes());
        location.extend_from_slice(&self.position.1.to_le_bytes());
        location.extend_from_slice(&[0; 5]);
        location.extend_from_slice(&self.heading.to_le_bytes());
        put(&mut bytes, layout.location, &location);

        for (i, spec) in self.characters.iter().enumerate() {
            let mut name = spec.name.clone().into_bytes();
            name.resize(10, 0);
            put(&mut bytes, layout.character_name_offset(i), &name);

            let mut record = vec![0xa0, 0xa1];
            record.extend_from_slice(&spec.spells);
            for &(max, current, limit, experience, modifier) in &spec.skills {
                record.extend_from_slice(&[max, current, limit, experience, modifier as u8]);
            }
            record.extend_from_slice(&[0xb0; 7]);
            put(&mut bytes, layout.character_skills_offset(i), &record);

            put(
                &mut bytes,
                layout.character_conditions_offset(i),
                &spec.conditions,
            );

            let mut inventory = vec![spec.items.len() as u8];
            inventory.extend_from_slice(&spec.capacity.to_le_bytes());
            inventory.extend(encode_slots(&spec.items, usize::from(spec.capacity)));
            put(&mut bytes, layout.character_inventory_offset(i), &inventory);
        }

        let mut active = vec![self.active.len() as u8];
        active.extend_from_slice(&self.active);
        put(&mut bytes, layout.active_characters, &active);

        let key_capacity = self.keys.len().max(4);
        let mut keys = vec![self.keys.len() as u8];
        keys.extend_from_slice(&(key_capacity as u16).to_le_bytes());
        keys.extend(encode_slots(&self.keys, key_capacity));
        put(&mut bytes, layout.party_keys, &keys);

        let mut chapters = Vec::new();
        for chapter in 0..10u16 {
            chapters.extend_from_slice(&(chapter + 1).to_le_bytes());
            for address in 0..5u32 {
                chapters.extend_from_slice(&(u32::from(chapter) * 0x100 + address).to_le_bytes());
            }
        }
        put(&mut bytes, layout.chapter_offsets, &chapters);

        let mut flags = EventFlags::with_layout(bytes, layout.flags);
        for &(ptr, value) in &self.flags {
            // Fixture flags always fall inside the compact flag regions.
            let _ = flags.write_bit(ptr, value);
        }

        SaveFixture {
            layout,
            bytes: flags.into_inner(),
            trailer_offset,
        }
    }
}

/// Wrap `payload` in a tagged chunk header.
pub fn tagged_chunk(tag: &[u8; 4], payload: &[u8]) -> Vec<u8> {
    let mut bytes = tag.to_vec();
    bytes.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    bytes.extend_from_slice(payload);
    bytes
}

#[derive(Debug, Clone)]
enum ModelShape {
    /// Three meshes: two sharing a three-vertex pool, one with a
    /// four-vertex pool. Every face is the triangle 0, 1, 2.
    Pooled,
    Sprite(u16),
}

#[derive(Debug, Clone)]
pub struct ModelSpec {
    name: String,
    shape: ModelShape,
}

impl ModelSpec {
    pub fn pooled(name: &str) -> Self {
        Self {
            name: name.to_string(),
            shape: ModelShape::Pooled,
        }
    }

    pub fn sprite(name: &str, sprite: u16) -> Self {
        Self {
            name: name.to_string(),
            shape: ModelShape::Sprite(sprite),
        }
    }

    /// Model bytes; table offsets are relative to `base` at the start of
    /// the component list.
    fn encode(&self) -> Vec<u8> {
        match self.shape {
            ModelShape::Pooled => pooled_model(),
            ModelShape::Sprite(sprite) => sprite_model(sprite),
        }
    }

    fn encode_clip(&self) -> Vec<u8> {
        let mut bytes = Vec::new();
        match self.shape {
            ModelShape::Pooled => {
                for v in [40u16, 20, 1, 0, 0, 2, 0] {
                    bytes.extend_from_slice(&v.to_le_bytes());
                }
                for (u, v, x, y) in [(1i8, -1i8, 100i16, -100i16), (-2, 2, -200, 200)] {
                    bytes.extend_from_slice(&[u as u8, v as u8]);
                    bytes.extend_from_slice(&x.to_le_bytes());
                    bytes.extend_from_slice(&y.to_le_bytes());
                }
            }
            ModelShape::Sprite(_) => {
                for v in [8u16, 8, 0, 3] {
                    bytes.extend_from_slice(&v.to_le_bytes());
                }
            }
        }
        bytes
    }
}

fn u16s(values: &[u16]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_le_bytes()).collect()
}

fn pooled_model() -> Vec<u8> {
    const BASE: u16 = 0x100;
    let mut bytes = vec![0, 1, 2, 3];
    bytes.extend(u16s(&[0, 0, 1, BASE, 0]));
    bytes.extend(u16s(&[0xfff0, 0xfff1, 0xfff2, 0x10, 0x11, 0x12]));

    // component list, then mesh table at +6
    bytes.extend(u16s(&[0, 3, BASE + 6]));
    let pool_a = BASE + 48;
    let pool_b = pool_a + 18;
    let faces = pool_b + 24;
    for (i, (count, pool)) in [(3u8, pool_a), (3, pool_a), (4, pool_b)].into_iter().enumerate() {
        bytes.extend_from_slice(&[0, 0, 0, count]);
        bytes.extend(u16s(&[pool, 1, faces + 8 * i as u16]));
        bytes.extend_from_slice(&[0; 4]);
    }
    for v in 0..7i16 {
        for c in [v, v * 2, v * 3] {
            bytes.extend_from_slice(&c.to_le_bytes());
        }
    }
    let edges = faces + 24;
    for i in 0..3u16 {
        bytes.extend(u16s(&[1, 1, edges + 8 * i, 0]));
    }
    let list = edges + 24;
    for i in 0..3u8 {
        bytes.extend_from_slice(&[i, 0x10, 0x20, 0x30, 0xff, 7]);
        bytes.extend(u16s(&[list]));
    }
    bytes.extend_from_slice(&[0, 1, 2, 0xff]);
    bytes
}

fn sprite_model(sprite: u16) -> Vec<u8> {
    let mut bytes = vec![EF_UNBOUNDED, 4, 0, 1];
    bytes.extend(u16s(&[0, 0, 1, 0, 0]));
    bytes.extend(u16s(&[0, 1, 6]));
    bytes.extend_from_slice(&[0, 0, 0, 0]);
    bytes.extend(u16s(&[20, 1, 20]));
    bytes.extend_from_slice(&[0; 4]);
    bytes.extend(u16s(&[2, sprite, 0, 0]));
    bytes
}

/// Offset table of split offsets followed by the records.
fn split_table(records: &[Vec<u8>]) -> Vec<u8> {
    let mut offset = records.len() * 4;
    let mut table = Vec::new();
    for record in records {
        table.extend(u16s(&[(offset & 0xf) as u16, (offset >> 4) as u16]));
        offset += record.len();
    }
    for record in records {
        table.extend_from_slice(record);
    }
    table
}

/// A `.TBL` model table with `MAP:`, `APP:` and `DAT:` sections.
pub fn model_table_bytes(models: &[ModelSpec]) -> Vec<u8> {
    let mut name_data = Vec::new();
    let mut name_offsets = Vec::new();
    for model in models {
        name_offsets.push(name_data.len() as u16);
        name_data.extend_from_slice(model.name.as_bytes());
        name_data.push(0);
    }
    let mut map = u16s(&[0, models.len() as u16]);
    map.extend(u16s(&name_offsets));
    map.extend(u16s(&[0]));
    map.extend(name_data);

    let dat = split_table(&models.iter().map(ModelSpec::encode).collect::<Vec<_>>());
    let app = split_table(&models.iter().map(ModelSpec::encode_clip).collect::<Vec<_>>());

    let mut bytes = tagged_chunk(b"MAP:", &map);
    bytes.extend(tagged_chunk(b"APP:", &app));
    bytes.extend(tagged_chunk(b"DAT:", &dat));
    bytes
}
