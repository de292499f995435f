//! World-model ingestor: parses the line-oriented telemetry dialect and
//! mutates the world model.
//!
//! Packet grammar: `<tick> <type>[ <area>]: <payload>`. The
//! [`TelemetrySource`] that actually produces these lines (a file or
//! socket reader) is an explicit external collaborator, out of scope
//! here; this module only owns parsing and the resulting mutations.

use crate::entity::{Entity, EntityPrototype, ItemPrototype};
use crate::error::{AgentError, AgentResult};
use crate::geometry::{Area, Direction, Pos};
use crate::inventory::TaggedInventory;
use crate::pathfinder::{WalkMap, WalkTile};
use crate::recipe::{Recipe, RecipeRegistry};
use crate::resource_patch::ResourceLayer;
use crate::worldlist::WorldList;
use crate::worldmap::WorldMap;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TileState {
    pub known: bool,
    pub can_walk: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Player {
    pub id: u64,
    pub position: Pos,
    pub connected: bool,
}

/// An entity tagged with its tick of arrival, kept in the pending pool
/// between an `objects` packet's move-out and its reconciliation.
struct PendingEntity {
    entity: Entity,
    expires_tick: u64,
}

const PENDING_TIMEOUT_TICKS: u64 = 10;

pub struct WorldModel {
    pub tiles: WorldMap<TileState>,
    pub walk_map: WalkMap,
    pub resources: ResourceLayer,
    pub entities: WorldList<Entity>,
    pub entity_prototypes: HashMap<String, EntityPrototype>,
    pub item_prototypes: HashMap<String, ItemPrototype>,
    pub recipes: RecipeRegistry,
    pub players: HashMap<u64, Player>,
    pub inventories: HashMap<u64, TaggedInventory>,
    pub tick: u64,
    /// §4.3 `action_completed` events awaiting dispatch to the
    /// [`crate::action::ActionRegistry`], drained once per tick by
    /// [`crate::systems::dispatch_telemetry_events`] since the
    /// ingestor itself has no access to player runtimes or the
    /// registry.
    pub pending_action_completions: Vec<(u64, u64)>,
    /// §4.3/§4.5 `mined_item` events awaiting dispatch to the
    /// originating player's current action chain, as `(tick, player_id, item, count)`.
    pub pending_mined_items: Vec<(u64, u64, String, u64)>,
    pending: Vec<PendingEntity>,
    max_collision_radius: f64,
}

impl Default for WorldModel {
    fn default() -> Self {
        Self {
            tiles: WorldMap::new(),
            walk_map: WorldMap::new(),
            resources: ResourceLayer::new(),
            entities: WorldList::new(),
            entity_prototypes: HashMap::new(),
            item_prototypes: HashMap::new(),
            recipes: RecipeRegistry::new(),
            players: HashMap::new(),
            inventories: HashMap::new(),
            tick: 0,
            pending_action_completions: Vec::new(),
            pending_mined_items: Vec::new(),
            pending: Vec::new(),
            max_collision_radius: 0.0,
        }
    }
}

impl WorldModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty world model pre-seeded with the embedded default
    /// recipe/item/entity-prototype catalogues, so planning can start
    /// before any telemetry `recipes`/`item_prototypes`/`entity_prototypes`
    /// packet arrives.
    pub fn with_default_catalogues() -> AgentResult<Self> {
        let mut model = Self::new();
        model.recipes = RecipeRegistry::load_default()?;
        for item in ItemPrototype::load_default_catalogue()? {
            model.item_prototypes.insert(item.name.clone(), item);
        }
        let (protos, max_radius) = EntityPrototype::load_default_catalogue_with_radius()?;
        for proto in protos {
            model.entity_prototypes.insert(proto.name.clone(), proto);
        }
        if max_radius > model.max_collision_radius {
            model.max_collision_radius = max_radius;
        }
        Ok(model)
    }

    fn live_owner_ids(&self) -> Vec<String> {
        self.players.keys().map(|id| id.to_string()).collect()
    }

    /// Applies one telemetry line. Protocol errors (malformed grammar,
    /// unknown packet type) are fatal and propagate; everything else
    /// either mutates the model or is logged and skipped.
    pub fn apply_line(&mut self, line: &str) -> AgentResult<()> {
        let line = line.trim_end();
        if line == "0 STATIC_DATA_END" {
            return Ok(());
        }
        let (head, payload) = line.split_once(':').unwrap_or((line, ""));
        let payload = payload.strip_prefix(' ').unwrap_or(payload);
        let mut head_parts = head.splitn(3, ' ');
        let tick_str = head_parts.next().ok_or_else(|| protocol_err(0, "missing tick"))?;
        let tick: u64 = tick_str.parse().map_err(|_| protocol_err(0, format!("bad tick {tick_str:?}")))?;
        let packet_type = head_parts.next().ok_or_else(|| protocol_err(tick, "missing packet type"))?;
        let area_str = head_parts.next();

        if tick < self.tick {
            crate::error::warn(format!("telemetry tick went backwards: {} < {}", tick, self.tick));
        }

        match packet_type {
            "tiles" => self.apply_tiles(tick, area_str, payload)?,
            "resources" => self.apply_resources(tick, area_str, payload)?,
            "objects" => self.apply_objects(tick, area_str, payload)?,
            "players" => self.apply_players(payload),
            "entity_prototypes" => self.apply_entity_prototypes(payload)?,
            "item_prototypes" => self.apply_item_prototypes(payload)?,
            "recipes" => self.apply_recipes(payload)?,
            "graphics" => {}
            "action_completed" => self.apply_action_completed(tick, payload),
            "mined_item" => self.apply_mined_item(tick, payload),
            "inventory_changed" => self.apply_inventory_changed(payload)?,
            "item_containers" => self.apply_item_containers(area_str, payload),
            "tick" => {
                self.tick = tick;
                self.sweep_pending(tick);
            }
            other => return Err(protocol_err(tick, format!("unknown packet type {other:?}"))),
        }
        Ok(())
    }

    fn apply_tiles(&mut self, _tick: u64, area_str: Option<&str>, payload: &str) -> AgentResult<()> {
        let area = parse_area(area_str)?;
        let bits: Vec<char> = payload.chars().filter(|c| *c == '0' || *c == '1').collect();
        let mut i = 0;
        for y in area.left_top.y..area.right_bottom.y {
            for x in area.left_top.x..area.right_bottom.x {
                let can_walk = bits.get(i).copied() == Some('1');
                i += 1;
                let p = Pos::new(x, y);
                self.tiles.set(p, TileState { known: true, can_walk });
            }
        }
        self.rebuild_walkmap_margins(area.expand(self.max_collision_radius.ceil() as i32));
        Ok(())
    }

    fn apply_resources(&mut self, _tick: u64, area_str: Option<&str>, payload: &str) -> AgentResult<()> {
        let area = parse_area(area_str)?;
        let kinds: Vec<&str> = payload.split(',').collect();
        let mut i = 0;
        for y in area.left_top.y..area.right_bottom.y {
            for x in area.left_top.x..area.right_bottom.x {
                if let Some(&kind) = kinds.get(i) {
                    self.resources.set_kind(Pos::new(x, y), kind);
                }
                i += 1;
            }
        }
        Ok(())
    }

    fn apply_objects(&mut self, tick: u64, area_str: Option<&str>, payload: &str) -> AgentResult<()> {
        let area = parse_area(area_str)?;

        let moved_out = self.entities.range(area);
        self.entities.retain(|e| !area.contains(e.position));
        for entity in moved_out {
            self.pending.push(PendingEntity { entity, expires_tick: tick + PENDING_TIMEOUT_TICKS });
        }

        for chunk in payload.split(';').filter(|s| !s.is_empty()) {
            let mut fields = chunk.split(',');
            let proto = fields.next().unwrap_or_default();
            if proto == "player" {
                continue;
            }
            let x: i32 = fields.next().and_then(|s| s.parse().ok()).unwrap_or(0);
            let y: i32 = fields.next().and_then(|s| s.parse().ok()).unwrap_or(0);
            let dir = fields.next().and_then(parse_direction_letter).unwrap_or(Direction::North);
            let mut entity = Entity::new(Pos::new(x, y), proto, dir);

            if let Some(idx) = self.pending.iter().position(|p| p.entity.mostly_equal(&entity)) {
                let pending = self.pending.swap_remove(idx);
                entity.extra_data = pending.entity.extra_data;
            }
            self.entities.insert(entity);
        }

        let inflate = area.expand(self.max_collision_radius.ceil() as i32);
        self.rebuild_walkmap_margins(inflate);
        Ok(())
    }

    fn apply_players(&mut self, payload: &str) {
        for player in self.players.values_mut() {
            player.connected = false;
        }
        for chunk in payload.split(';').filter(|s| !s.is_empty()) {
            let mut fields = chunk.split(',');
            let Some(id) = fields.next().and_then(|s| s.parse::<u64>().ok()) else { continue };
            let x: i32 = fields.next().and_then(|s| s.parse().ok()).unwrap_or(0);
            let y: i32 = fields.next().and_then(|s| s.parse().ok()).unwrap_or(0);
            self.players.insert(id, Player { id, position: Pos::new(x, y), connected: true });
        }
    }

    fn apply_entity_prototypes(&mut self, payload: &str) -> AgentResult<()> {
        let (protos, max_radius) = crate::entity::parse_entity_prototypes(payload)?;
        for proto in protos {
            self.entity_prototypes.insert(proto.name.clone(), proto);
        }
        if max_radius > self.max_collision_radius {
            self.max_collision_radius = max_radius;
        }
        Ok(())
    }

    fn apply_item_prototypes(&mut self, payload: &str) -> AgentResult<()> {
        let items: Vec<ItemPrototype> = serde_json::from_str(payload)?;
        for item in items {
            self.item_prototypes.insert(item.name.clone(), item);
        }
        Ok(())
    }

    fn apply_recipes(&mut self, payload: &str) -> AgentResult<()> {
        let recipes: Vec<Recipe> = serde_json::from_str(payload)?;
        for recipe in recipes {
            let _ = self.recipes.insert(recipe);
        }
        Ok(())
    }

    fn apply_action_completed(&mut self, tick: u64, payload: &str) {
        let mut parts = payload.split_whitespace();
        let Some(_status) = parts.next() else { return };
        let Some(id) = parts.next().and_then(|s| s.parse::<u64>().ok()) else {
            crate::error::warn("action_completed missing action id");
            return;
        };
        // Dispatch into the action registry happens once per tick, in
        // `systems::dispatch_telemetry_events`, which has access to it
        // and this queue does not.
        self.pending_action_completions.push((tick, id));
    }

    fn apply_mined_item(&mut self, tick: u64, payload: &str) {
        let mut parts = payload.split_whitespace();
        let Some(player_id) = parts.next().and_then(|s| s.parse::<u64>().ok()) else {
            crate::error::warn("mined_item missing player id");
            return;
        };
        let Some(item) = parts.next() else {
            crate::error::warn("mined_item missing item");
            return;
        };
        let Some(count) = parts.next().and_then(|s| s.parse::<u64>().ok()) else {
            crate::error::warn("mined_item missing count");
            return;
        };
        self.pending_mined_items.push((tick, player_id, item.to_string(), count));
    }

    fn apply_inventory_changed(&mut self, payload: &str) -> AgentResult<()> {
        for entry in payload.split(';').filter(|s| !s.is_empty()) {
            let mut fields = entry.split(',');
            let player: u64 = fields.next().and_then(|s| s.parse().ok()).ok_or_else(|| protocol_err(self.tick, "bad inventory_changed entry"))?;
            let item = fields.next().ok_or_else(|| protocol_err(self.tick, "bad inventory_changed entry"))?;
            let delta: i64 = fields.next().and_then(|s| s.parse().ok()).ok_or_else(|| protocol_err(self.tick, "bad inventory_changed delta"))?;
            let owner = fields.next().filter(|s| *s != "x");

            let inv = self.inventories.entry(player).or_default();
            if !inv.update(item, delta, owner) {
                return Err(AgentError::InventoryDesync {
                    owner: owner.unwrap_or("none").to_string(),
                    claimed: delta.unsigned_abs(),
                    available: inv.available_to(item, owner.unwrap_or("")),
                });
            }
        }
        Ok(())
    }

    fn apply_item_containers(&mut self, area_str: Option<&str>, payload: &str) {
        let Some(area) = area_str.and_then(Area::parse) else {
            crate::error::warn("item_containers packet missing area");
            return;
        };
        let center = Pos::new((area.left_top.x + area.right_bottom.x) / 2, (area.left_top.y + area.right_bottom.y) / 2);
        let Some(found) = self.entities.search_or_none(center, |e| area.contains(e.position)).cloned() else {
            crate::error::warn("item_containers update for unknown entity");
            return;
        };
        let mut found = found;
        if let Some(data) = found.extra_data.container_mut() {
            for entry in payload.split(';').filter(|s| !s.is_empty()) {
                let mut fields = entry.split(',');
                let (Some(slot), Some(item), Some(count)) = (fields.next(), fields.next(), fields.next().and_then(|s| s.parse::<u64>().ok())) else { continue };
                data.inventories.set(slot, item, count);
            }
        }
        self.entities.retain(|e| !e.mostly_equal(&found));
        self.entities.insert(found);
    }

    fn sweep_pending(&mut self, tick: u64) {
        self.pending.retain(|p| p.expires_tick > tick);
    }

    fn rebuild_walkmap_margins(&mut self, area: Area) {
        for y in area.left_top.y..area.right_bottom.y {
            for x in area.left_top.x..area.right_bottom.x {
                let p = Pos::new(x, y);
                let state = self.tiles.get(p);
                let mut tile = WalkTile { known: state.known, can_walk: state.known && state.can_walk, ..Default::default() };
                for entity in self.entities.range(Area::from_point(p)) {
                    if let Some(proto) = self.entity_prototypes.get(&entity.prototype) {
                        if proto.collides_player {
                            tile = WalkTile { known: tile.known, can_walk: false, ..tile };
                        }
                    }
                }
                self.walk_map.set(p, tile);
            }
        }
    }
}

fn protocol_err(tick: u64, reason: impl Into<String>) -> AgentError {
    AgentError::Protocol { tick, reason: reason.into() }
}

fn parse_area(area_str: Option<&str>) -> AgentResult<Area> {
    area_str
        .and_then(Area::parse)
        .ok_or_else(|| protocol_err(0, "packet requires an area but none was present or it failed to parse"))
}

fn parse_direction_letter(s: &str) -> Option<Direction> {
    match s {
        "n" | "north" => Some(Direction::North),
        "e" | "east" => Some(Direction::East),
        "s" | "south" => Some(Direction::South),
        "w" | "west" => Some(Direction::West),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tick_sentinel_is_ignored() {
        let mut model = WorldModel::new();
        assert!(model.apply_line("0 STATIC_DATA_END").is_ok());
    }

    #[test]
    fn unknown_packet_type_is_a_protocol_error() {
        let mut model = WorldModel::new();
        assert!(model.apply_line("5 bogus: hello").is_err());
    }

    #[test]
    fn players_packet_resets_connectivity_then_applies_entries() {
        let mut model = WorldModel::new();
        model.apply_line("1 players: 7,3,4").unwrap();
        assert!(model.players.get(&7).unwrap().connected);
        model.apply_line("2 players:").unwrap();
        assert!(!model.players.get(&7).unwrap().connected);
    }

    #[test]
    fn inventory_changed_desync_is_fatal() {
        let mut model = WorldModel::new();
        let err = model.apply_line("1 inventory_changed: 7,iron-plate,-5,A").unwrap_err();
        assert!(matches!(err, AgentError::InventoryDesync { .. }));
    }

    #[test]
    fn inventory_changed_applies_positive_claim() {
        let mut model = WorldModel::new();
        model.apply_line("1 inventory_changed: 7,iron-plate,5,A").unwrap();
        let inv = model.inventories.get(&7).unwrap();
        assert_eq!(inv.amount_of("iron-plate"), 5);
        assert_eq!(inv.available_to("iron-plate", "A"), 5);
    }

    #[test]
    fn tick_packet_advances_tick_and_sweeps_pending() {
        let mut model = WorldModel::new();
        model.apply_line("5 tick:").unwrap();
        assert_eq!(model.tick, 5);
    }
}
