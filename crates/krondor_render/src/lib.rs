use std::fmt::Write as _;

use krondor_core::GameData;
use krondor_core::character::Character;
use krondor_core::container::{Container, GdsContainer, LockStats, ShopStats};
use krondor_core::inventory::{Inventory, InventoryItem};
use krondor_core::model::{FaceOption, Model};
use krondor_core::save::ZoneContainers;
use krondor_core::types::{KeyTarget, ZoneNumber};
use serde_json::{Map as JsonMap, Value as JsonValue};

const SKILL_NAME_WIDTH: usize = 14;
const INVENTORY_COL_WIDTH: usize = 36;
const CONTAINER_TYPE_WIDTH: usize = 15;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TextRenderOptions {
    pub verbose: bool,
    /// Only show containers of this zone. Showing containers at all needs
    /// `verbose` or a zone.
    pub zone: Option<ZoneNumber>,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FieldSelection {
    pub name: bool,
    pub chapter: bool,
    pub location: bool,
    pub time: bool,
    pub gold: bool,
    pub party: bool,
    pub keys: bool,
    pub containers: bool,
    pub shops: bool,
}

impl FieldSelection {
    pub fn is_any_selected(&self) -> bool {
        self.name
            || self.chapter
            || self.location
            || self.time
            || self.gold
            || self.party
            || self.keys
            || self.containers
            || self.shops
    }
}

pub fn render_json_full(game: &GameData) -> JsonValue {
    let all = FieldSelection {
        name: true,
        chapter: true,
        location: true,
        time: true,
        gold: true,
        party: true,
        keys: true,
        containers: true,
        shops: true,
    };
    JsonValue::Object(selected_json(game, &all, None))
}

pub fn render_json_selected(
    game: &GameData,
    fields: &FieldSelection,
    zone: Option<ZoneNumber>,
) -> JsonValue {
    JsonValue::Object(selected_json(game, fields, zone))
}

/// `key=value` pairs for the selected fields, in the same order as the
/// JSON output.
pub fn render_selected_pairs(
    game: &GameData,
    fields: &FieldSelection,
    zone: Option<ZoneNumber>,
) -> Vec<(&'static str, String)> {
    let mut out = Vec::new();

    if fields.name {
        out.push(("name", game.name().to_string()));
    }
    if fields.chapter {
        out.push(("chapter", game.chapter().to_string()));
    }
    if fields.location {
        out.push(("location", format_location(game)));
    }
    if fields.time {
        out.push(("time", game.clock().time.to_string()));
    }
    if fields.gold {
        out.push(("gold", game.party().gold.to_string()));
    }
    if fields.party {
        let names: Vec<&str> = game
            .party()
            .active_characters()
            .map(|c| c.name.as_str())
            .collect();
        out.push(("party", names.join(",")));
    }
    if fields.keys {
        let keys: Vec<&str> = game
            .party()
            .keys
            .items
            .iter()
            .map(|k| k.name.as_str())
            .collect();
        out.push(("keys", keys.join(",")));
    }
    if fields.containers {
        let count: usize = zones_in_view(game, zone)
            .map(|z| z.containers.len())
            .sum();
        out.push(("containers", count.to_string()));
    }
    if fields.shops {
        out.push(("shops", game.shops().len().to_string()));
    }

    out
}

fn selected_json(
    game: &GameData,
    fields: &FieldSelection,
    zone: Option<ZoneNumber>,
) -> JsonMap<String, JsonValue> {
    let mut out = JsonMap::new();

    if fields.name {
        out.insert(
            "name".to_string(),
            JsonValue::String(game.name().to_string()),
        );
    }
    if fields.chapter {
        out.insert("chapter".to_string(), JsonValue::from(game.chapter()));
    }
    if fields.location {
        out.insert("location".to_string(), location_to_json(game));
    }
    if fields.time {
        out.insert("time".to_string(), clock_to_json(game));
    }
    if fields.gold {
        let gold = game.party().gold;
        let mut m = JsonMap::new();
        m.insert("raw".to_string(), JsonValue::from(gold.0));
        m.insert("sovereigns".to_string(), JsonValue::from(gold.sovereigns()));
        m.insert(
            "royals".to_string(),
            JsonValue::from(gold.remaining_royals()),
        );
        out.insert("gold".to_string(), JsonValue::Object(m));
    }
    if fields.party {
        out.insert("party".to_string(), party_to_json(game));
    }
    if fields.keys {
        out.insert(
            "keys".to_string(),
            inventory_to_json(&game.party().keys),
        );
    }
    if fields.containers {
        out.insert(
            "containers".to_string(),
            JsonValue::Array(zones_in_view(game, zone).map(zone_to_json).collect()),
        );
    }
    if fields.shops {
        out.insert(
            "shops".to_string(),
            JsonValue::Array(game.shops().iter().map(shop_to_json).collect()),
        );
    }

    out
}

fn zones_in_view(
    game: &GameData,
    zone: Option<ZoneNumber>,
) -> impl Iterator<Item = &ZoneContainers> {
    game.zones()
        .iter()
        .filter(move |z| zone.is_none_or(|wanted| z.zone == wanted))
}

fn format_location(game: &GameData) -> String {
    let location = game.location();
    format!(
        "zone {} tile {},{}",
        location.zone.0, location.tile.0, location.tile.1
    )
}

fn location_to_json(game: &GameData) -> JsonValue {
    let location = game.location();
    let mut m = JsonMap::new();
    m.insert("zone".to_string(), JsonValue::from(location.zone.0));
    m.insert(
        "tile".to_string(),
        JsonValue::from(vec![location.tile.0, location.tile.1]),
    );
    m.insert(
        "position".to_string(),
        JsonValue::from(vec![location.position.x, location.position.y]),
    );
    m.insert("heading".to_string(), JsonValue::from(location.heading));
    JsonValue::Object(m)
}

fn clock_to_json(game: &GameData) -> JsonValue {
    let clock = game.clock();
    let mut m = JsonMap::new();
    m.insert("time".to_string(), JsonValue::from(clock.time.0));
    m.insert(
        "formatted".to_string(),
        JsonValue::String(clock.time.to_string()),
    );
    m.insert(
        "time_last_slept".to_string(),
        JsonValue::from(clock.time_last_slept.0),
    );
    JsonValue::Object(m)
}

fn party_to_json(game: &GameData) -> JsonValue {
    let party = game.party();
    JsonValue::Array(
        party
            .characters
            .iter()
            .map(|c| character_to_json(c, party.active.contains(&c.index)))
            .collect(),
    )
}

fn character_to_json(character: &Character, active: bool) -> JsonValue {
    let mut m = JsonMap::new();
    m.insert("index".to_string(), JsonValue::from(character.index.0));
    m.insert("name".to_string(), JsonValue::String(character.name.clone()));
    m.insert("active".to_string(), JsonValue::Bool(active));
    m.insert(
        "skills".to_string(),
        JsonValue::Array(
            character
                .skills
                .named()
                .map(|(name, skill)| {
                    let mut s = JsonMap::new();
                    s.insert("name".to_string(), JsonValue::String(name.to_string()));
                    s.insert("max".to_string(), JsonValue::from(skill.max));
                    s.insert("current".to_string(), JsonValue::from(skill.current));
                    s.insert("limit".to_string(), JsonValue::from(skill.limit));
                    s.insert("experience".to_string(), JsonValue::from(skill.experience));
                    s.insert("modifier".to_string(), JsonValue::from(skill.modifier));
                    s.insert("selected".to_string(), JsonValue::Bool(skill.selected));
                    s.insert(
                        "unseen_improvement".to_string(),
                        JsonValue::Bool(skill.unseen_improvement),
                    );
                    JsonValue::Object(s)
                })
                .collect(),
        ),
    );
    m.insert(
        "spells".to_string(),
        JsonValue::from(character.spells.indices()),
    );
    m.insert(
        "conditions".to_string(),
        JsonValue::Array(
            character
                .conditions
                .named()
                .map(|(name, value)| {
                    let mut c = JsonMap::new();
                    c.insert("name".to_string(), JsonValue::String(name.to_string()));
                    c.insert("value".to_string(), JsonValue::from(value));
                    JsonValue::Object(c)
                })
                .collect(),
        ),
    );
    m.insert(
        "inventory".to_string(),
        inventory_to_json(&character.inventory),
    );
    JsonValue::Object(m)
}

fn inventory_to_json(inventory: &Inventory) -> JsonValue {
    let mut m = JsonMap::new();
    m.insert("capacity".to_string(), JsonValue::from(inventory.capacity));
    m.insert(
        "items".to_string(),
        JsonValue::Array(inventory.items.iter().map(item_to_json).collect()),
    );
    JsonValue::Object(m)
}

fn item_to_json(item: &InventoryItem) -> JsonValue {
    let mut m = JsonMap::new();
    m.insert("item".to_string(), JsonValue::from(item.item.0));
    m.insert("name".to_string(), JsonValue::String(item.name.clone()));
    m.insert("condition".to_string(), JsonValue::from(item.condition));
    m.insert("status".to_string(), JsonValue::from(item.status));
    m.insert("modifiers".to_string(), JsonValue::from(item.modifiers));
    m.insert(
        "statuses".to_string(),
        JsonValue::Array(
            item.statuses()
                .iter()
                .map(|s| JsonValue::String(s.as_str().to_string()))
                .collect(),
        ),
    );
    JsonValue::Object(m)
}

fn key_target_to_json(target: Option<KeyTarget>) -> JsonValue {
    match target {
        Some(t) => JsonValue::String(t.to_string()),
        None => JsonValue::Null,
    }
}

fn lock_to_json(lock: &LockStats) -> JsonValue {
    let mut m = JsonMap::new();
    m.insert("lock_flag".to_string(), JsonValue::from(lock.lock_flag));
    m.insert("picklock".to_string(), JsonValue::from(lock.picklock));
    m.insert(
        "fairy_chest_index".to_string(),
        JsonValue::from(lock.fairy_chest_index),
    );
    m.insert("damage".to_string(), JsonValue::from(lock.damage));
    JsonValue::Object(m)
}

fn shop_stats_to_json(shop: &ShopStats) -> JsonValue {
    let mut m = JsonMap::new();
    m.insert("temple_number".to_string(), JsonValue::from(shop.temple_number));
    m.insert("sell_factor".to_string(), JsonValue::from(shop.sell_factor));
    m.insert("max_discount".to_string(), JsonValue::from(shop.max_discount));
    m.insert("buy_factor".to_string(), JsonValue::from(shop.buy_factor));
    m.insert("haggle".to_string(), JsonValue::from(shop.haggle));
    m.insert("barding_skill".to_string(), JsonValue::from(shop.barding_skill));
    m.insert("barding_reward".to_string(), JsonValue::from(shop.barding_reward));
    m.insert(
        "barding_max_reward".to_string(),
        JsonValue::from(shop.barding_max_reward),
    );
    m.insert("repair_types".to_string(), JsonValue::from(shop.repair_types));
    m.insert("repair_factor".to_string(), JsonValue::from(shop.repair_factor));
    m.insert("categories".to_string(), JsonValue::from(shop.categories));
    JsonValue::Object(m)
}

fn zone_to_json(zone: &ZoneContainers) -> JsonValue {
    let mut m = JsonMap::new();
    m.insert("zone".to_string(), JsonValue::from(zone.zone.0));
    m.insert(
        "containers".to_string(),
        JsonValue::Array(zone.containers.iter().map(container_to_json).collect()),
    );
    JsonValue::Object(m)
}

fn container_to_json(container: &Container) -> JsonValue {
    let header = &container.header;
    let mut m = JsonMap::new();
    m.insert(
        "address".to_string(),
        JsonValue::String(format!("0x{:x}", header.address)),
    );
    m.insert(
        "type".to_string(),
        JsonValue::String(container.container_type().to_string()),
    );
    m.insert(
        "location_type".to_string(),
        JsonValue::from(header.location_type),
    );
    if let Ok(position) = header.position() {
        m.insert(
            "position".to_string(),
            JsonValue::from(vec![position.x, position.y]),
        );
    }
    m.insert(
        "inventory".to_string(),
        inventory_to_json(&container.inventory),
    );
    m.insert(
        "dialog".to_string(),
        key_target_to_json(container.tail.dialog()),
    );
    if let Some(lock) = container.tail.lock() {
        m.insert("lock".to_string(), lock_to_json(lock));
    }
    if let Some(shop) = container.tail.shop() {
        m.insert("shop".to_string(), shop_stats_to_json(shop));
    }
    JsonValue::Object(m)
}

fn shop_to_json(shop: &GdsContainer) -> JsonValue {
    let header = &shop.header;
    let mut m = JsonMap::new();
    m.insert(
        "address".to_string(),
        JsonValue::String(format!("0x{:x}", header.address)),
    );
    m.insert(
        "hotspot".to_string(),
        match header.hotspot() {
            Ok(hotspot) => JsonValue::String(hotspot.to_string()),
            Err(_) => JsonValue::Null,
        },
    );
    m.insert(
        "type".to_string(),
        JsonValue::String(shop.container_type.to_string()),
    );
    m.insert("inventory".to_string(), inventory_to_json(&shop.inventory));
    if let Some(stats) = &shop.shop {
        m.insert("shop".to_string(), shop_stats_to_json(stats));
    }
    JsonValue::Object(m)
}

pub fn render_text(game: &GameData, options: TextRenderOptions) -> String {
    let mut out = String::new();
    let location = game.location();

    writeln!(&mut out).expect("writing to String cannot fail");
    writeln!(&mut out, "  Save: {}", game.name()).expect("writing to String cannot fail");
    writeln!(
        &mut out,
        "  Chapter {}   Zone {} ({},{})   {}",
        game.chapter(),
        location.zone.0,
        location.tile.0,
        location.tile.1,
        game.clock().time,
    )
    .expect("writing to String cannot fail");
    writeln!(
        &mut out,
        "  Gold: {}   Last slept: {}",
        game.party().gold,
        game.clock().time_last_slept,
    )
    .expect("writing to String cannot fail");
    writeln!(&mut out).expect("writing to String cannot fail");

    let party = game.party();
    for character in party.active_characters() {
        write_character(&mut out, character);
        writeln!(&mut out).expect("writing to String cannot fail");
    }
    if options.verbose {
        for character in party
            .characters
            .iter()
            .filter(|c| !party.active.contains(&c.index))
        {
            write_character(&mut out, character);
            writeln!(&mut out).expect("writing to String cannot fail");
        }
    }

    let keys: Vec<String> = party.keys.items.iter().map(format_item).collect();
    writeln!(
        &mut out,
        " ::: Keys ::: {}",
        if keys.is_empty() {
            "none".to_string()
        } else {
            keys.join(", ")
        }
    )
    .expect("writing to String cannot fail");

    if options.verbose || options.zone.is_some() {
        for zone in zones_in_view(game, options.zone) {
            writeln!(&mut out).expect("writing to String cannot fail");
            write_zone(&mut out, zone);
        }
    }
    if options.verbose {
        writeln!(&mut out).expect("writing to String cannot fail");
        write_shops(&mut out, game.shops());
    }
    writeln!(&mut out).expect("writing to String cannot fail");

    out
}

fn write_character(out: &mut String, character: &Character) {
    writeln!(out, " ::: {} :::", character.name).expect("writing to String cannot fail");
    writeln!(
        out,
        "  {:<w$} Max  Cur  Lim  Exp  Mod",
        "Skill",
        w = SKILL_NAME_WIDTH
    )
    .expect("writing to String cannot fail");
    for (name, skill) in character.skills.named() {
        let mut markers = String::new();
        if skill.selected {
            markers.push('*');
        }
        if skill.unseen_improvement {
            markers.push('+');
        }
        let line = format!(
            "  {:<w$} {:>3}  {:>3}  {:>3}  {:>3}  {:>3} {}",
            name,
            skill.max,
            skill.current,
            skill.limit,
            skill.experience,
            skill.modifier,
            markers,
            w = SKILL_NAME_WIDTH
        );
        writeln!(out, "{}", line.trim_end()).expect("writing to String cannot fail");
    }

    let conditions: Vec<String> = character
        .conditions
        .active()
        .map(|(name, value)| format!("{name} {value}%"))
        .collect();
    writeln!(
        out,
        "  Conditions: {}",
        if conditions.is_empty() {
            "none".to_string()
        } else {
            conditions.join(", ")
        }
    )
    .expect("writing to String cannot fail");

    let spells = character.spells.indices();
    writeln!(
        out,
        "  Spells: {}",
        if spells.is_empty() {
            "none".to_string()
        } else {
            spells
                .iter()
                .map(usize::to_string)
                .collect::<Vec<_>>()
                .join(", ")
        }
    )
    .expect("writing to String cannot fail");

    write_inventory(out, &character.inventory);
}

fn write_inventory(out: &mut String, inventory: &Inventory) {
    writeln!(
        out,
        "  Inventory ({}/{}):",
        inventory.items.len(),
        inventory.capacity
    )
    .expect("writing to String cannot fail");
    if inventory.items.is_empty() {
        writeln!(out, "    none").expect("writing to String cannot fail");
        return;
    }

    let rows: Vec<String> = inventory.items.iter().map(format_item).collect();
    for chunk in rows.chunks(2) {
        let left = chunk.first().map(String::as_str).unwrap_or("");
        let right = chunk.get(1).map(String::as_str).unwrap_or("");
        let line = format!(
            "    {:<a$}{}",
            fit_column(left, INVENTORY_COL_WIDTH),
            fit_column(right, INVENTORY_COL_WIDTH),
            a = INVENTORY_COL_WIDTH
        );
        writeln!(out, "{}", line.trim_end()).expect("writing to String cannot fail");
    }
}

fn format_item(item: &InventoryItem) -> String {
    let statuses: Vec<&str> = item.statuses().iter().map(|s| s.as_str()).collect();
    if statuses.is_empty() {
        format!("{} ({})", item.name, item.condition)
    } else {
        format!("{} ({}) [{}]", item.name, item.condition, statuses.join(","))
    }
}

fn write_zone(out: &mut String, zone: &ZoneContainers) {
    writeln!(out, " ::: Zone {} containers :::", zone.zone.0)
        .expect("writing to String cannot fail");
    if zone.containers.is_empty() {
        writeln!(out, "  none").expect("writing to String cannot fail");
        return;
    }
    for container in &zone.containers {
        let header = &container.header;
        let position = header
            .position()
            .map(|p| format!("({}, {})", p.x, p.y))
            .unwrap_or_default();
        let mut line = format!(
            "  0x{:06x}  {:<w$} {:<20} {}/{}",
            header.address,
            container.container_type().as_str(),
            position,
            container.inventory.items.len(),
            container.inventory.capacity,
            w = CONTAINER_TYPE_WIDTH
        );
        if let Some(dialog) = container.tail.dialog() {
            line.push_str(&format!("  dialog {dialog}"));
        }
        if let Some(lock) = container.tail.lock() {
            line.push_str(&format!("  lock {}", lock.picklock));
        }
        writeln!(out, "{line}").expect("writing to String cannot fail");
        for item in &container.inventory.items {
            writeln!(out, "      {}", format_item(item)).expect("writing to String cannot fail");
        }
    }
}

fn write_shops(out: &mut String, shops: &[GdsContainer]) {
    writeln!(out, " ::: Shops :::").expect("writing to String cannot fail");
    if shops.is_empty() {
        writeln!(out, "  none").expect("writing to String cannot fail");
        return;
    }
    for shop in shops {
        let hotspot = shop
            .header
            .hotspot()
            .map(|h| h.to_string())
            .unwrap_or_default();
        let mut line = format!(
            "  {:<5} {:<w$} {}/{}",
            hotspot,
            shop.container_type.as_str(),
            shop.inventory.items.len(),
            shop.inventory.capacity,
            w = CONTAINER_TYPE_WIDTH
        );
        if let Some(stats) = &shop.shop {
            line.push_str(&format!(
                "  sell {}% buy {}% haggle {}",
                stats.sell_factor, stats.buy_factor, stats.haggle
            ));
        }
        writeln!(out, "{line}").expect("writing to String cannot fail");
    }
}

pub fn render_models_text(models: &[Model]) -> String {
    let mut out = String::new();
    for (index, model) in models.iter().enumerate() {
        let meshes: usize = model.components.iter().map(|c| c.meshes.len()).sum();
        let mut line = format!(
            "{index:>3} {:<12} flags=0x{:02x} type={} terrain={} scale={} vertices={} components={} meshes={}",
            model.name,
            model.entity_flags,
            model.entity_type,
            model.terrain_type,
            model.scale,
            model.vertices.len(),
            model.components.len(),
            meshes,
        );
        if let Some(sprite) = model.sprite {
            line.push_str(&format!(" sprite={sprite}"));
        }
        if let Some(bounds) = &model.bounds {
            line.push_str(&format!(" bounds={:?}..{:?}", bounds.min, bounds.max));
        }
        writeln!(&mut out, "{line}").expect("writing to String cannot fail");
    }
    out
}

pub fn render_models_json(models: &[Model]) -> JsonValue {
    JsonValue::Array(models.iter().map(model_to_json).collect())
}

fn model_to_json(model: &Model) -> JsonValue {
    let mut m = JsonMap::new();
    m.insert("name".to_string(), JsonValue::String(model.name.clone()));
    m.insert("entity_flags".to_string(), JsonValue::from(model.entity_flags));
    m.insert("entity_type".to_string(), JsonValue::from(model.entity_type));
    m.insert("terrain_type".to_string(), JsonValue::from(model.terrain_type));
    m.insert("scale".to_string(), JsonValue::from(model.scale));
    m.insert("anim_count".to_string(), JsonValue::from(model.anim_count));
    m.insert("anim_offset".to_string(), JsonValue::from(model.anim_offset));
    m.insert(
        "sprite".to_string(),
        model.sprite.map_or(JsonValue::Null, JsonValue::from),
    );
    m.insert(
        "bounds".to_string(),
        match &model.bounds {
            Some(b) => {
                let mut bounds = JsonMap::new();
                bounds.insert("min".to_string(), JsonValue::from(b.min.to_vec()));
                bounds.insert("max".to_string(), JsonValue::from(b.max.to_vec()));
                JsonValue::Object(bounds)
            }
            None => JsonValue::Null,
        },
    );
    m.insert(
        "vertices".to_string(),
        JsonValue::Array(
            model
                .vertices
                .iter()
                .map(|v| JsonValue::from(v.to_vec()))
                .collect(),
        ),
    );
    m.insert(
        "components".to_string(),
        JsonValue::Array(
            model
                .components
                .iter()
                .map(|c| {
                    JsonValue::Array(
                        c.meshes
                            .iter()
                            .map(|mesh| {
                                JsonValue::Array(
                                    mesh.face_options.iter().map(face_to_json).collect(),
                                )
                            })
                            .collect(),
                    )
                })
                .collect(),
        ),
    );
    JsonValue::Object(m)
}

fn face_to_json(face: &FaceOption) -> JsonValue {
    let mut m = JsonMap::new();
    m.insert("face_type".to_string(), JsonValue::from(face.face_type));
    m.insert("edge_count".to_string(), JsonValue::from(face.edge_count));
    m.insert(
        "polygons".to_string(),
        JsonValue::Array(
            face.polygons
                .iter()
                .map(|p| {
                    let mut poly = JsonMap::new();
                    poly.insert("palette".to_string(), JsonValue::from(p.palette));
                    poly.insert("color".to_string(), JsonValue::from(p.color.to_vec()));
                    poly.insert("group".to_string(), JsonValue::from(p.group));
                    poly.insert("vertices".to_string(), JsonValue::from(p.vertices.clone()));
                    JsonValue::Object(poly)
                })
                .collect(),
        ),
    );
    JsonValue::Object(m)
}

fn fit_column(value: &str, width: usize) -> String {
    if value.chars().count() <= width {
        return value.to_string();
    }
    if width <= 3 {
        return value.chars().take(width).collect();
    }

    let mut out = String::with_capacity(width);
    for ch in value.chars().take(width - 3) {
        out.push(ch);
    }
    out.push_str("...");
    out
}
