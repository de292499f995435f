//! Entity and prototype model: static descriptors, placed instances, and
//! the per-instance "extra data" carried by containers, machines, and
//! mining drills.

use crate::geometry::{Area, Direction, Pos};
use crate::worldlist::Located;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::rc::Rc;

/// A mineable entity's yield, expressed as the recipe-style balance it
/// grants on a successful mine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MineResult {
    pub item: String,
    pub amount: f64,
}

/// Which kind of per-instance extra data a prototype's entities carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExtraDataKind {
    None,
    Container,
    Machine,
    MiningDrill,
}

#[derive(Debug, Clone, Default)]
pub struct EntityPrototype {
    pub name: String,
    pub type_name: String,
    /// Collision box relative to the entity's origin, in NORTH orientation.
    pub collision_box: Area,
    pub collides_player: bool,
    pub collides_object: bool,
    pub mineable: Option<MineResult>,
    pub extra_data_kind: ExtraDataKindOpt,
}

/// The wire shape entity prototypes arrive in, both over telemetry's
/// `entity_prototypes` packet and the embedded default catalogue below.
#[derive(Debug, Deserialize)]
struct EntityPrototypeWire {
    name: String,
    #[serde(rename = "type")]
    type_name: String,
    collision_box: Area,
    #[serde(default)]
    collides_player: bool,
    #[serde(default)]
    collides_object: bool,
    #[serde(default)]
    mineable: Option<MineResult>,
    #[serde(default = "default_extra_data_kind")]
    extra_data_kind: ExtraDataKind,
}

fn default_extra_data_kind() -> ExtraDataKind {
    ExtraDataKind::None
}

/// Parses a JSON array of entity prototypes, tracking the largest
/// collision radius seen (callers use this to size walkmap rebuilds).
pub fn parse_entity_prototypes(json: &str) -> serde_json::Result<(Vec<EntityPrototype>, f64)> {
    let wire: Vec<EntityPrototypeWire> = serde_json::from_str(json)?;
    let mut max_radius = 0.0f64;
    let protos = wire
        .into_iter()
        .map(|p| {
            let radius = (p.collision_box.diameter() as f64) / 2.0;
            if radius > max_radius {
                max_radius = radius;
            }
            EntityPrototype {
                name: p.name,
                type_name: p.type_name,
                collision_box: p.collision_box,
                collides_player: p.collides_player,
                collides_object: p.collides_object,
                mineable: p.mineable,
                extra_data_kind: ExtraDataKindOpt(p.extra_data_kind),
            }
        })
        .collect();
    Ok((protos, max_radius))
}

const DEFAULT_PROTOTYPES_JSON: &str = include_str!("../resources/prototypes.json");
const DEFAULT_ITEMS_JSON: &str = include_str!("../resources/items.json");

impl EntityPrototype {
    /// The built-in entity prototype catalogue, embedded at build time
    /// so the agent knows basic collision boxes before any telemetry
    /// `entity_prototypes` packet arrives. Returns the catalogue and the
    /// largest collision radius found in it.
    pub fn load_default_catalogue_with_radius() -> serde_json::Result<(Vec<EntityPrototype>, f64)> {
        parse_entity_prototypes(DEFAULT_PROTOTYPES_JSON)
    }
}

/// Wraps [`ExtraDataKind`] so `EntityPrototype` can `#[derive(Default)]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtraDataKindOpt(pub ExtraDataKind);

impl Default for ExtraDataKindOpt {
    fn default() -> Self {
        Self(ExtraDataKind::None)
    }
}

/// `(inventory_slot_kind, item) -> count`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MultiInventory {
    counts: HashMap<(String, String), u64>,
}

impl MultiInventory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, slot: &str, item: &str) -> u64 {
        self.counts.get(&(slot.to_string(), item.to_string())).copied().unwrap_or(0)
    }

    pub fn set(&mut self, slot: impl Into<String>, item: impl Into<String>, count: u64) {
        self.counts.insert((slot.into(), item.into()), count);
    }

    pub fn slots_holding<'a>(&'a self, item: &'a str) -> impl Iterator<Item = (&'a str, u64)> + 'a {
        self.counts.iter().filter(move |((_, i), _)| i == item).map(move |((s, _), &c)| (s.as_str(), c))
    }

    /// Every `(slot, item, count)` entry, for callers that need to scan
    /// a container's whole contents rather than look up one item.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str, u64)> {
        self.counts.iter().map(|((s, i), &c)| (s.as_str(), i.as_str(), c))
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContainerData {
    pub inventories: MultiInventory,
    /// Distinguishes a furnace's fuel slot (input) from a burner mining
    /// drill's (also input, but the UI treats the two differently); kept
    /// as a flag rather than a third kind per the source model.
    pub fuel_is_output: bool,
}

/// Copy-on-write, reference-counted per-entity payload. Cloning an
/// `ExtraData` shares the underlying data until [`ExtraData::make_unique`]
/// is called, matching the source's shared-handle + explicit-clone
/// discipline.
#[derive(Debug, Clone)]
pub enum ExtraData {
    None,
    Container(Rc<ContainerData>),
    Machine(Rc<MultiInventory>),
    MiningDrill(Rc<MultiInventory>),
}

impl ExtraData {
    pub fn container_mut(&mut self) -> Option<&mut ContainerData> {
        match self {
            ExtraData::Container(rc) => Some(Rc::make_mut(rc)),
            _ => None,
        }
    }

    pub fn container(&self) -> Option<&ContainerData> {
        match self {
            ExtraData::Container(rc) => Some(rc),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Entity {
    pub position: Pos,
    pub prototype: String,
    pub direction: Direction,
    pub extra_data: ExtraData,
}

impl Entity {
    pub fn new(position: Pos, prototype: impl Into<String>, direction: Direction) -> Self {
        Self { position, prototype: prototype.into(), direction, extra_data: ExtraData::None }
    }

    /// Two entities are `mostly_equal` iff they share a prototype and a
    /// position; direction and extra data are allowed to differ (a
    /// server re-send may report a rotated or newly-filled instance of
    /// "the same" entity).
    pub fn mostly_equal(&self, other: &Entity) -> bool {
        self.prototype == other.prototype && self.position == other.position
    }
}

impl Located for Entity {
    fn position(&self) -> Pos {
        self.position
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ItemPrototype {
    pub name: String,
    pub type_name: String,
    pub place_result: Option<String>,
    pub stack_size: u32,
    pub fuel_value: f64,
    pub speed: f64,
    pub durability: f64,
}

impl ItemPrototype {
    /// The built-in item prototype catalogue, embedded the same way as
    /// [`EntityPrototype::load_default_catalogue`].
    pub fn load_default_catalogue() -> serde_json::Result<Vec<ItemPrototype>> {
        serde_json::from_str(DEFAULT_ITEMS_JSON)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mostly_equal_ignores_direction_and_extra_data() {
        let a = Entity::new(Pos::new(1, 1), "iron-chest", Direction::North);
        let mut b = Entity::new(Pos::new(1, 1), "iron-chest", Direction::South);
        b.extra_data = ExtraData::Container(Rc::new(ContainerData::default()));
        assert!(a.mostly_equal(&b));
    }

    #[test]
    fn mostly_equal_requires_same_position_and_prototype() {
        let a = Entity::new(Pos::new(1, 1), "iron-chest", Direction::North);
        let b = Entity::new(Pos::new(2, 1), "iron-chest", Direction::North);
        assert!(!a.mostly_equal(&b));
    }

    #[test]
    fn container_make_mut_clones_on_write() {
        let shared = Rc::new(ContainerData::default());
        let mut a = ExtraData::Container(shared.clone());
        let mut b = a.clone();
        b.container_mut().unwrap().fuel_is_output = true;
        assert!(!a.container().unwrap().fuel_is_output);
        a.container_mut().unwrap().fuel_is_output = true;
        assert!(a.container().unwrap().fuel_is_output);
    }
}
