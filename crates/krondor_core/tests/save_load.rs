use std::io::Cursor;

use krondor_core::container::{
    ContainerTail, ContainerType, LockStats, ShopStats, decode_zone_containers,
};
use krondor_core::fixture::{CharacterSpec, ContainerRecord, SaveBuilder, SaveFixture, ShopRecord};
use krondor_core::flags::{SKILL_FLAG_STRIDE, SKILL_IMPROVEMENT_FLAG, SKILL_SELECTED_FLAG, SetFlag};
use krondor_core::reader::LittleEndianReader;
use krondor_core::types::{CharIndex, HotspotRef, KeyTarget, ZoneNumber};
use krondor_core::{DecodeError, ErrorCode, GameData, ItemDefinition, ObjectCatalog, SaveLayout};
use rstest::rstest;

fn load(fixture: SaveFixture) -> GameData {
    GameData::from_bytes(fixture.bytes, fixture.layout, &ObjectCatalog::anonymous())
        .expect("failed to load fixture save")
}

fn load_err(fixture: SaveFixture) -> DecodeError {
    GameData::from_bytes(fixture.bytes, fixture.layout, &ObjectCatalog::anonymous())
        .expect_err("fixture save should not load")
}

#[test]
fn loads_header_and_party() {
    let game = load(SaveBuilder::new().build());

    assert_eq!(game.name(), "Fixture Save");
    assert_eq!(game.chapter(), 1);
    assert_eq!(game.location().zone, ZoneNumber(1));
    assert_eq!(game.location().tile, (10, 12));
    assert_eq!(game.location().heading, 0x40);
    assert_eq!(game.clock().time.to_string(), "day 1 09:00");

    let party = game.party();
    assert_eq!(party.gold.sovereigns(), 123);
    assert_eq!(party.gold.remaining_royals(), 4);
    assert_eq!(party.characters.len(), 6);
    assert_eq!(party.keys.items.len(), 1);
    assert_eq!(party.keys.capacity, 4);

    let active: Vec<&str> = party
        .active_characters()
        .map(|c| c.name.as_str())
        .collect();
    assert_eq!(active, vec!["Locklear", "Gorath", "Owyn"]);

    let patrus = game.character(CharIndex(5)).expect("sixth character");
    assert_eq!(patrus.name, "Patrus");
    assert_eq!(patrus.unknown, [0xa0, 0xa1]);
    assert_eq!(patrus.unknown2, [0xb0; 7]);
    let health = patrus.skills.get(0).expect("health");
    assert_eq!((health.max, health.current, health.limit), (40, 30, 90));
    assert_eq!(patrus.skills.get(15).map(|s| s.max), Some(55));
}

#[test]
fn character_details_are_decoded() {
    let mut spec = CharacterSpec::new("Gorath");
    spec.spells = [0b0000_0101, 0, 0, 0, 0, 0x80];
    spec.conditions = [0, 0, 40, 0, 0, 0, 0];
    spec.items = vec![[12, 3, 0b0100_0000, 0], [7, 100, 0, 1]];
    let game = load(SaveBuilder::new().character(1, spec).build());

    let gorath = game.character(CharIndex(1)).expect("gorath");
    assert_eq!(gorath.spells.indices(), vec![0, 2, 47]);
    assert_eq!(
        gorath.conditions.active().collect::<Vec<_>>(),
        vec![("Poisoned", 40)]
    );
    assert_eq!(gorath.inventory.capacity, 5);
    assert_eq!(gorath.inventory.items.len(), 2);
    assert_eq!(gorath.inventory.items[0].name, "Item #12");
    assert_eq!(gorath.inventory.items[1].modifiers, 1);
}

#[test]
fn every_zone_is_loaded_in_order() {
    let game = load(SaveBuilder::new().build());

    let zones: Vec<u8> = game.zones().iter().map(|z| z.zone.0).collect();
    assert_eq!(zones, (1..=12).collect::<Vec<_>>());

    let bag = &game.containers(ZoneNumber(3)).expect("zone 3")[0];
    assert_eq!(bag.container_type(), ContainerType::Bag);
    assert_eq!(bag.header.zone().expect("world container"), ZoneNumber(3));
    let position = bag.header.position().expect("world container");
    assert_eq!((position.x, position.y), (3000, 2000));
    assert!(game.containers(ZoneNumber(13)).is_none());
}

#[test]
fn shops_are_loaded_after_the_zones() {
    let game = load(SaveBuilder::new().build());

    assert_eq!(game.shops().len(), 1);
    let shop = &game.shops()[0];
    assert_eq!(
        shop.header.hotspot().expect("gds container"),
        HotspotRef {
            gds_number: 12,
            gds_char: 'B'
        }
    );
    assert_eq!(shop.container_type, ContainerType::Shop);
    assert_eq!(shop.inventory.items.len(), 1);
    assert_eq!(shop.shop.map(|s| s.sell_factor), Some(60));
    assert!(shop.header.zone().is_err());
}

fn lock() -> LockStats {
    LockStats {
        lock_flag: 1,
        picklock: 60,
        fairy_chest_index: 0,
        damage: 3,
    }
}

fn shop_stats() -> ShopStats {
    ShopStats {
        sell_factor: 70,
        buy_factor: 90,
        haggle: 25,
        categories: 0x0102,
        ..ShopStats::default()
    }
}

#[rstest]
#[case::shop(ContainerTail::Shop { unknown: [1, 2], dialog: KeyTarget(0x1234), shop: shop_stats() })]
#[case::inn(ContainerTail::Inn { unknown: [3, 4], dialog: KeyTarget(0x2345), shop: shop_stats() })]
#[case::gravestone(ContainerTail::Gravestone { unknown: [5, 6], dialog: KeyTarget(0x3456) })]
#[case::ct1(ContainerTail::CT1 { lock: lock() })]
#[case::chest(ContainerTail::Chest { lock: lock() })]
#[case::building(ContainerTail::Building { lock: lock(), unknown: [7, 8], dialog: KeyTarget(0x4567) })]
#[case::fairy_chest(ContainerTail::FairyChest { lock: lock(), dialog: KeyTarget(0x5678) })]
#[case::event_chest(ContainerTail::EventChest { lock: lock(), unknown: [9; 13] })]
#[case::timirianya_hut(ContainerTail::TimirianyaHut { unknown: [10; 9] })]
#[case::combat(ContainerTail::Combat { unknown: [11, 12], dialog: KeyTarget(0x6789), unknown2: [13; 9] })]
fn container_tails_consume_their_width(#[case] tail: ContainerTail) {
    let records = vec![
        ContainerRecord::new(2, tail.clone()).with_items(vec![[3, 1, 0, 0]], 2),
        ContainerRecord::new(2, ContainerTail::Bag),
    ];
    let game = load(SaveBuilder::new().zone(2, records).build());

    let containers = game.containers(ZoneNumber(2)).expect("zone 2");
    assert_eq!(containers.len(), 2);
    assert_eq!(containers[0].tail, tail);
    assert_eq!(containers[0].container_type(), tail.container_type());
    assert_eq!(containers[0].inventory.items.len(), 1);
    assert_eq!(containers[0].inventory.capacity, 2);
    assert_eq!(containers[1].container_type(), ContainerType::Bag);
    assert_eq!(containers[1].header.zone().expect("world"), ZoneNumber(2));
}

#[test]
fn unknown_container_tag_aborts_the_load() {
    let mut record = ContainerRecord::new(4, ContainerTail::Bag);
    record.raw_type = Some(5);
    let fixture = SaveBuilder::new().zone(4, vec![record]).build();
    let zone_offset = fixture.layout.zone_table(4).expect("zone 4").offset;

    let err = load_err(fixture);
    assert_eq!(err.code(), ErrorCode::Structural);
    assert!(matches!(
        err,
        DecodeError::UnknownContainerType { tag: 5, address } if address == zone_offset
    ));
}

#[test]
fn empty_container_needs_an_exempt_location_type() {
    let mut empty = ContainerRecord::new(6, ContainerTail::Bag).with_items(Vec::new(), 0);
    let err = load_err(SaveBuilder::new().zone(6, vec![empty.clone()]).build());
    assert!(matches!(err, DecodeError::Invariant { .. }));

    empty.location_type = 6;
    let game = load(SaveBuilder::new().zone(6, vec![empty]).build());
    assert_eq!(game.containers(ZoneNumber(6)).map(<[_]>::len), Some(1));
}

#[test]
fn item_count_above_capacity_is_an_invariant_error() {
    let overfull = ContainerRecord::new(7, ContainerTail::Bag)
        .with_items(vec![[1, 0, 0, 0], [2, 0, 0, 0]], 1);
    let err = load_err(SaveBuilder::new().zone(7, vec![overfull]).build());
    assert!(matches!(err, DecodeError::Invariant { .. }));
}

#[test]
fn missing_catalog_entry_is_fatal() {
    let mut spec = CharacterSpec::new("Owyn");
    spec.items = vec![[7, 1, 0, 0]];
    let fixture = SaveBuilder::new().character(2, spec).build();
    let catalog = ObjectCatalog::new(vec![ItemDefinition {
        name: "Sword".to_string(),
        item_type: 0,
        flags: 0,
        stack_size: 0,
        value: 0,
    }]);

    let err = GameData::from_bytes(fixture.bytes, fixture.layout, &catalog)
        .expect_err("item 7 is not in the catalog");
    assert_eq!(err.code(), ErrorCode::Catalog);
    assert!(matches!(err, DecodeError::UnknownItem { item: 7, .. }));
}

#[rstest]
#[case(0)]
#[case(13)]
#[case(0xff)]
fn location_outside_the_world_is_unsupported(#[case] zone: u8) {
    let err = load_err(SaveBuilder::new().location(zone, (1, 1)).build());
    assert!(matches!(err, DecodeError::UnsupportedZone(z) if z == zone));
}

#[test]
fn truncated_save_fails_instead_of_panicking() {
    let mut fixture = SaveBuilder::new().build();
    let shops = fixture.layout.gds_shops.offset as usize;
    // header and half of the first slot
    fixture.bytes.truncate(shops + 18);

    let err = load_err(fixture);
    assert_eq!(err.code(), ErrorCode::Io);
}

#[test]
fn layout_pointing_past_the_buffer_is_rejected() {
    let mut fixture = SaveBuilder::new().build();
    fixture.layout.gold = fixture.bytes.len() as u64;
    assert!(matches!(load_err(fixture), DecodeError::Layout(_)));
}

#[test]
fn oversized_zone_count_is_a_layout_error() {
    let mut fixture = SaveBuilder::new().build();
    fixture.layout.zones[0].count = usize::MAX / 2;
    let err = load_err(fixture);
    assert_eq!(err.code(), ErrorCode::Config);
    assert!(matches!(err, DecodeError::Layout(msg) if msg.starts_with("zone table")));
}

#[test]
fn oversized_shop_count_is_a_layout_error() {
    let mut fixture = SaveBuilder::new().build();
    fixture.layout.gds_shops.count = 1 << 40;
    assert!(matches!(load_err(fixture), DecodeError::Layout(_)));
}

const ZONE_ONE_OFFSET: usize = 0x3b621;
const ZONE_ONE_COUNT: usize = 36;

fn zone_one_records() -> Vec<ContainerRecord> {
    (0..ZONE_ONE_COUNT)
        .map(|i| {
            let tail = if i % 3 == 0 {
                ContainerTail::Chest {
                    lock: LockStats {
                        lock_flag: 1,
                        picklock: i as u8,
                        fairy_chest_index: 0,
                        damage: 0,
                    },
                }
            } else {
                ContainerTail::Bag
            };
            ContainerRecord::new(1, tail)
        })
        .collect()
}

fn zone_one_save(records: &[ContainerRecord]) -> Vec<u8> {
    let mut bytes = vec![0u8; ZONE_ONE_OFFSET];
    for record in records {
        bytes.extend(record.encode());
    }
    bytes
}

#[test]
fn zone_one_reads_36_records_at_its_fixed_offset() {
    let records = zone_one_records();
    let bytes = zone_one_save(&records);
    let mut r = LittleEndianReader::new(Cursor::new(bytes.as_slice()));

    let (layout, catalog) = (SaveLayout::default(), ObjectCatalog::anonymous());

    let containers =
        decode_zone_containers(&mut r, &layout, 1, &catalog).expect("zone 1 containers");

    assert_eq!(containers.len(), ZONE_ONE_COUNT);
    assert_eq!(r.position().expect("position"), bytes.len() as u64);
    assert_eq!(containers[0].header.address, ZONE_ONE_OFFSET as u64);
    assert_eq!(containers[3].container_type(), ContainerType::Chest);
    assert_eq!(containers[33].tail.lock().map(|l| l.picklock), Some(33));
    assert_eq!(containers[35].container_type(), ContainerType::Bag);
}

#[test]
fn zone_one_stops_at_an_unknown_tag_mid_table() {
    let mut records = zone_one_records();
    records[17].raw_type = Some(12);
    let bad_address = ZONE_ONE_OFFSET
        + records[..17]
            .iter()
            .map(|record| record.encode().len())
            .sum::<usize>();
    let bytes = zone_one_save(&records);
    let mut r = LittleEndianReader::new(Cursor::new(bytes.as_slice()));

    let (layout, catalog) = (SaveLayout::default(), ObjectCatalog::anonymous());

    let err = decode_zone_containers(&mut r, &layout, 1, &catalog)
        .expect_err("tag 12 is not a container type");
    assert!(matches!(
        err,
        DecodeError::UnknownContainerType { tag: 12, address } if address == bad_address as u64
    ));
}

#[test]
fn layout_override_keeps_unlisted_defaults() {
    let layout = SaveLayout::from_toml_str("gold = 16\n[gds_shops]\noffset = 32\ncount = 2\n")
        .expect("layout");
    assert_eq!(layout.gold, 16);
    assert_eq!(layout.gds_shops.count, 2);
    assert_eq!(layout.clock, SaveLayout::default().clock);
    assert_eq!(layout.zones.len(), 12);
}

#[test]
fn skill_flags_are_read_from_the_flag_store() {
    let selected = SKILL_SELECTED_FLAG + SKILL_FLAG_STRIDE + 3;
    let improved = SKILL_IMPROVEMENT_FLAG + 5;
    let game = load(
        SaveBuilder::new()
            .flag(selected, true)
            .flag(improved, true)
            .build(),
    );

    let gorath = game.character(CharIndex(1)).expect("gorath");
    assert!(gorath.skills.get(3).is_some_and(|s| s.selected));
    assert!(!gorath.skills.get(4).is_some_and(|s| s.selected));
    let locklear = game.character(CharIndex(0)).expect("locklear");
    assert!(locklear.skills.get(5).is_some_and(|s| s.unseen_improvement));
}

#[test]
fn clearing_unseen_improvements_updates_buffer_and_skills() {
    let improved = SKILL_IMPROVEMENT_FLAG + 2 * SKILL_FLAG_STRIDE + 9;
    let mut game = load(SaveBuilder::new().flag(improved, true).build());
    assert!(game.read_event_bool(improved).expect("flag"));

    game.clear_unseen_improvements(CharIndex(2))
        .expect("clear improvements");

    assert!(!game.read_event_bool(improved).expect("flag"));
    let owyn = game.character(CharIndex(2)).expect("owyn");
    assert!(owyn.skills.0.iter().all(|s| !s.unseen_improvement));
}

#[test]
fn flag_edits_land_in_the_written_buffer() {
    let fixture = SaveBuilder::new().build();
    let original = fixture.bytes.clone();
    let layout = fixture.layout.clone();
    let mut game = load(fixture);
    assert_eq!(game.as_bytes(), original.as_slice());

    game.set_event_flag_true(0x10).expect("simple flag");
    game.set_event_flag_true(0xdac3).expect("complex flag");
    game.set_event_flag_false(0x10).expect("simple flag");
    game.set_event_flag_true(0x11).expect("simple flag");

    let written = game.into_bytes();
    assert_eq!(written.len(), original.len());
    let changed: Vec<usize> = (0..written.len())
        .filter(|&i| written[i] != original[i])
        .collect();
    // 0x11: word at simple_base + 2, bit 1. 0xdac3: complex byte 0, bit 2.
    assert_eq!(
        changed,
        vec![layout.flags.simple_base + 2, layout.flags.complex_base]
    );

    let reloaded = GameData::from_bytes(written, layout, &ObjectCatalog::anonymous())
        .expect("reload");
    assert!(reloaded.read_event_bool(0x11).expect("flag"));
    assert!(reloaded.read_event_bool(0xdac3).expect("flag"));
    assert!(!reloaded.read_event_bool(0x10).expect("flag"));
}

#[test]
fn dialog_action_updates_whole_complex_byte() {
    let mut game = load(SaveBuilder::new().build());
    let complex_base = game.layout().flags.complex_base;

    game.set_event_dialog_action(&SetFlag {
        event_pointer: 0xdaca,
        event_mask: 0xf0,
        event_data: 0x05,
        always_zero: 0,
        event_value: 0,
    })
    .expect("dialog action");

    assert_eq!(game.as_bytes()[complex_base + 1], 0x05);
}

#[test]
fn chapter_offsets_are_decoded_on_demand() {
    let game = load(SaveBuilder::new().build());
    let chapters = game.chapter_offsets().expect("chapter offsets");
    assert_eq!(chapters.len(), 10);
    assert_eq!(chapters[0].chapter, 1);
    assert_eq!(chapters[9].addresses, [0x900, 0x901, 0x902, 0x903, 0x904]);
}

fn combat_trailer(location_type: u8) -> Vec<u8> {
    let mut bytes = Vec::new();
    for combatant in [3u16, 0xffff, 5, 0xffff, 0xffff, 0xffff, 9] {
        bytes.extend_from_slice(&combatant.to_le_bytes());
    }
    bytes.extend_from_slice(&[0; 4]);
    bytes.extend_from_slice(&21u32.to_le_bytes());
    bytes.extend_from_slice(&2u32.to_le_bytes());
    bytes.extend_from_slice(&[location_type, 1, 2, 0]);
    bytes.extend_from_slice(&[40, 1, 0, 0, 0, 0, 0, 0]);
    bytes
}

#[test]
fn combat_regions_are_decoded_on_demand() {
    let fixture = SaveBuilder::new().trailer(&combat_trailer(7)).build();
    let start = fixture.trailer_offset;
    let game = load(fixture);
    let catalog = ObjectCatalog::anonymous();

    let lists = game.combat_entity_lists(start, 1).expect("entity lists");
    assert_eq!(lists[0].combatants().collect::<Vec<_>>(), vec![3, 5, 9]);

    let inventories = game
        .combat_inventories(start + 14, 1, &catalog)
        .expect("combat inventories");
    assert_eq!(inventories[0].header.combat().expect("combat"), (21, 2));
    assert_eq!(inventories[0].inventory.items[0].name, "Item #40");
    assert_eq!(inventories[0].inventory.capacity, 2);
}

#[test]
fn combat_stats_are_decoded_on_demand() {
    let mut record = 0x0107u16.to_le_bytes().to_vec();
    record.extend_from_slice(&[0; 6]);
    for skill in 0..16u8 {
        record.extend_from_slice(&[skill, skill + 1, 100, 0, 0]);
    }
    record.extend_from_slice(&[0; 7]);
    let fixture = SaveBuilder::new().trailer(&record).build();
    let start = fixture.trailer_offset;
    let game = load(fixture);

    let stats = game.combat_stats(start, 1).expect("combat stats");
    assert_eq!(stats.len(), 1);
    assert_eq!(stats[0].id, 0x0107);
    assert_eq!(stats[0].skills[4].max, 4);
    assert_eq!(stats[0].skills[4].current, 5);
    assert_eq!(stats[0].skills[15].limit, 100);
    assert!(matches!(
        game.combat_stats(start, 2),
        Err(DecodeError::Io(_))
    ));
}

#[test]
fn combat_inventory_requires_combat_location_type() {
    let fixture = SaveBuilder::new().trailer(&combat_trailer(3)).build();
    let start = fixture.trailer_offset;
    let game = load(fixture);

    let err = game
        .combat_inventories(start + 14, 1, &ObjectCatalog::anonymous())
        .expect_err("location type 3 is not a combat location");
    assert!(matches!(err, DecodeError::Invariant { .. }));
}

#[test]
fn on_demand_offset_past_the_buffer_is_out_of_range() {
    let game = load(SaveBuilder::new().build());
    let len = game.as_bytes().len() as u64;
    assert!(matches!(
        game.combat_entity_lists(len, 1),
        Err(DecodeError::OutOfRange { offset, .. }) if offset == len
    ));
}

#[test]
fn shop_with_unknown_tag_is_fatal() {
    let mut shop = ShopRecord::new(3, 1);
    shop.container_type = 0x7f;
    let err = load_err(SaveBuilder::new().shops(vec![shop]).build());
    assert!(matches!(err, DecodeError::UnknownContainerType { tag: 0x7f, .. }));
}
