//! Hierarchical action system: primitive leaves and compound sequences,
//! represented as tagged variants with a shared capability surface
//! rather than virtual-dispatch inheritance.

use crate::command::{CommandSink, Direction as RpcDirection, InventorySlot};
use crate::geometry::{Direction, Pos, PosF};
use crate::inventory::Inventory;
use std::cell::Cell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

pub const WALKING_SPEED: f64 = 0.15;

static NEXT_ACTION_ID: AtomicU64 = AtomicU64::new(1);

fn next_action_id() -> u64 {
    NEXT_ACTION_ID.fetch_add(1, Ordering::Relaxed)
}

/// Capability surface every action variant implements, standing in for
/// the base-class interface of a virtual-dispatch action hierarchy.
pub trait ActionLike {
    fn start(&mut self, sink: &mut dyn CommandSink, player_id: u64);
    /// Advances past any subaction the registry has already marked
    /// finished. A primitive has no internal sequence to advance, so the
    /// default is a no-op; [`CompoundAction`] overrides it to start (and
    /// register) the newly-current subaction as the cursor moves past a
    /// finished one.
    fn tick(&mut self, sink: &mut dyn CommandSink, player_id: u64, registry: &mut ActionRegistry) {
        let _ = (sink, player_id, registry);
    }
    fn is_finished(&self) -> bool;
    fn abort(&mut self, sink: &mut dyn CommandSink, player_id: u64);
    fn walk_result(&self, from: PosF) -> (PosF, f64);
    fn inventory_balance(&self) -> HashMap<String, i64>;
    fn inventory_balance_on_launch(&self) -> HashMap<String, i64>;
    fn first_pos(&self) -> Option<PosF>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ActionId(pub u64);

/// Shared bookkeeping every primitive action carries: id, finished flag,
/// and the tick at which its launch balance is confirmed reflected in
/// the tagged inventory. The open question about when `confirmed_tick`
/// gets set is resolved here: it is the tick carried by the
/// `action_completed` packet that finishes this action (see DESIGN.md).
#[derive(Debug, Clone)]
pub struct PrimitiveHeader {
    pub id: ActionId,
    pub finished: Cell<bool>,
    pub confirmed_tick: Cell<Option<u64>>,
}

impl PrimitiveHeader {
    fn new() -> Rc<Self> {
        Rc::new(Self { id: ActionId(next_action_id()), finished: Cell::new(false), confirmed_tick: Cell::new(None) })
    }
}

#[derive(Debug, Clone)]
pub struct WalkWaypoints {
    pub header: Rc<PrimitiveHeader>,
    pub path: Vec<Pos>,
}

#[derive(Debug, Clone)]
pub struct MineObject {
    pub header: Rc<PrimitiveHeader>,
    pub entity_prototype: String,
    pub entity_pos: Pos,
    pub yield_item: Option<(String, f64)>,
}

#[derive(Debug, Clone)]
pub struct CraftRecipe {
    pub header: Rc<PrimitiveHeader>,
    pub recipe: String,
    pub count: u32,
    pub balance: HashMap<String, i64>,
}

#[derive(Debug, Clone)]
pub struct PlaceEntityAction {
    pub header: Rc<PrimitiveHeader>,
    pub item: String,
    pub pos: Pos,
    pub dir: Direction,
}

#[derive(Debug, Clone)]
pub struct PutToInventory {
    pub header: Rc<PrimitiveHeader>,
    pub item: String,
    pub amount: u64,
    pub entity_pos: Pos,
    pub slot: InventorySlot,
}

#[derive(Debug, Clone)]
pub struct TakeFromInventory {
    pub header: Rc<PrimitiveHeader>,
    pub item: String,
    pub amount: u64,
    pub entity_pos: Pos,
    pub slot: InventorySlot,
}

/// A tagged variant standing in for the primitive action hierarchy.
#[derive(Debug, Clone)]
pub enum PrimitiveAction {
    WalkWaypoints(WalkWaypoints),
    MineObject(MineObject),
    CraftRecipe(CraftRecipe),
    PlaceEntity(PlaceEntityAction),
    PutToInventory(PutToInventory),
    TakeFromInventory(TakeFromInventory),
}

impl PrimitiveAction {
    pub fn walk_waypoints(path: Vec<Pos>) -> Self {
        Self::WalkWaypoints(WalkWaypoints { header: PrimitiveHeader::new(), path })
    }

    pub fn mine_object(entity_prototype: impl Into<String>, entity_pos: Pos, yield_item: Option<(String, f64)>) -> Self {
        Self::MineObject(MineObject { header: PrimitiveHeader::new(), entity_prototype: entity_prototype.into(), entity_pos, yield_item })
    }

    pub fn craft_recipe(recipe: impl Into<String>, count: u32, balance: HashMap<String, i64>) -> Self {
        Self::CraftRecipe(CraftRecipe { header: PrimitiveHeader::new(), recipe: recipe.into(), count, balance })
    }

    pub fn place_entity(item: impl Into<String>, pos: Pos, dir: Direction) -> Self {
        Self::PlaceEntity(PlaceEntityAction { header: PrimitiveHeader::new(), item: item.into(), pos, dir })
    }

    pub fn put_to_inventory(item: impl Into<String>, amount: u64, entity_pos: Pos, slot: InventorySlot) -> Self {
        Self::PutToInventory(PutToInventory { header: PrimitiveHeader::new(), item: item.into(), amount, entity_pos, slot })
    }

    pub fn take_from_inventory(item: impl Into<String>, amount: u64, entity_pos: Pos, slot: InventorySlot) -> Self {
        Self::TakeFromInventory(TakeFromInventory { header: PrimitiveHeader::new(), item: item.into(), amount, entity_pos, slot })
    }

    pub fn header(&self) -> &PrimitiveHeader {
        &*self.header_rc()
    }

    /// The shared handle behind this action's header. [`ActionRegistry`]
    /// keys off a weak clone of this handle rather than the action
    /// itself, since registering against `&mut` state living in a
    /// `Vec`/`RefCell` gives no stable `Rc` to the whole action.
    pub fn header_rc(&self) -> &Rc<PrimitiveHeader> {
        match self {
            Self::WalkWaypoints(a) => &a.header,
            Self::MineObject(a) => &a.header,
            Self::CraftRecipe(a) => &a.header,
            Self::PlaceEntity(a) => &a.header,
            Self::PutToInventory(a) => &a.header,
            Self::TakeFromInventory(a) => &a.header,
        }
    }

    pub fn id(&self) -> ActionId {
        self.header().id
    }

    /// Called when the `action_completed` packet names this id.
    pub fn mark_finished(&self, tick: u64) {
        self.header().finished.set(true);
        self.header().confirmed_tick.set(Some(tick));
    }
}

impl ActionLike for PrimitiveAction {
    fn start(&mut self, sink: &mut dyn CommandSink, player_id: u64) {
        match self {
            Self::WalkWaypoints(a) => sink.set_waypoints(a.header.id.0, player_id, &a.path),
            Self::MineObject(a) => sink.set_mining_target(a.header.id.0, player_id, &a.entity_prototype, a.entity_pos),
            Self::CraftRecipe(a) => sink.start_crafting(a.header.id.0, player_id, &a.recipe, a.count),
            Self::PlaceEntity(a) => sink.place_entity(player_id, &a.item, a.pos, to_rpc_dir(a.dir)),
            Self::PutToInventory(a) => sink.insert_to_inventory(player_id, a.entity_pos, a.slot, &a.item, a.amount),
            Self::TakeFromInventory(a) => sink.remove_from_inventory(player_id, a.entity_pos, a.slot, &a.item, a.amount),
        }
    }

    fn is_finished(&self) -> bool {
        self.header().finished.get()
    }

    fn abort(&mut self, sink: &mut dyn CommandSink, player_id: u64) {
        if let Self::MineObject(_) = self {
            sink.stop_mining(player_id);
        }
        self.header().finished.set(true);
    }

    fn walk_result(&self, from: PosF) -> (PosF, f64) {
        match self {
            Self::WalkWaypoints(a) => {
                let mut pos = from;
                let mut total = 0.0;
                for &wp in &a.path {
                    let wp = wp.to_f();
                    total += pos.distance_to(wp);
                    pos = wp;
                }
                (pos, total / WALKING_SPEED)
            }
            _ => (from, 0.0),
        }
    }

    fn inventory_balance(&self) -> HashMap<String, i64> {
        match self {
            Self::MineObject(a) => a.yield_item.as_ref().map(|(item, amount)| HashMap::from([(item.clone(), *amount as i64)])).unwrap_or_default(),
            Self::CraftRecipe(a) => a.balance.clone(),
            Self::PlaceEntity(a) => HashMap::from([(a.item.clone(), -1)]),
            Self::PutToInventory(a) => HashMap::from([(a.item.clone(), -(a.amount as i64))]),
            Self::TakeFromInventory(a) => HashMap::from([(a.item.clone(), a.amount as i64)]),
            Self::WalkWaypoints(_) => HashMap::new(),
        }
    }

    /// Net change applied at `start()`: full delta for transfers and
    /// placements, ingredients only for crafts (products land later, on
    /// `inventory_changed`).
    fn inventory_balance_on_launch(&self) -> HashMap<String, i64> {
        match self {
            Self::CraftRecipe(a) => a.balance.iter().filter(|(_, &v)| v < 0).map(|(k, v)| (k.clone(), *v)).collect(),
            other => other.inventory_balance(),
        }
    }

    fn first_pos(&self) -> Option<PosF> {
        match self {
            Self::WalkWaypoints(a) => a.path.first().map(|p| p.to_f()),
            Self::MineObject(a) => Some(a.entity_pos.to_f()),
            Self::PlaceEntity(a) => Some(a.pos.to_f()),
            Self::PutToInventory(a) => Some(a.entity_pos.to_f()),
            Self::TakeFromInventory(a) => Some(a.entity_pos.to_f()),
            Self::CraftRecipe(_) => None,
        }
    }
}

fn to_rpc_dir(dir: Direction) -> RpcDirection {
    match dir {
        Direction::North => RpcDirection::North,
        Direction::East => RpcDirection::East,
        Direction::South => RpcDirection::South,
        Direction::West => RpcDirection::West,
    }
}

/// An ordered sequence of actions driven by a cursor. `WalkTo` is a
/// compound whose subactions are computed lazily at `start()` via the
/// pathfinder rather than eagerly at construction.
#[derive(Debug, Clone, Default)]
pub struct CompoundAction {
    pub subactions: Vec<PrimitiveAction>,
    pub cursor: usize,
    started: bool,
}

impl CompoundAction {
    pub fn new(subactions: Vec<PrimitiveAction>) -> Self {
        Self { subactions, cursor: 0, started: false }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    pub fn current(&self) -> Option<&PrimitiveAction> {
        self.subactions.get(self.cursor)
    }

    pub fn current_mut(&mut self) -> Option<&mut PrimitiveAction> {
        self.subactions.get_mut(self.cursor)
    }

    /// Dispatches an `action_completed`/`mined_item` style callback.
    /// Per the open question on `on_mined_item`, this reimplementation
    /// routes the callback to the current sub-action only, not to every
    /// sub-action in the sequence (see DESIGN.md).
    pub fn dispatch_mined_item(&self, item: &str, count: u64) -> Option<(String, u64)> {
        match self.current() {
            Some(PrimitiveAction::MineObject(_)) => Some((item.to_string(), count)),
            _ => None,
        }
    }
}

impl ActionLike for CompoundAction {
    fn start(&mut self, sink: &mut dyn CommandSink, player_id: u64) {
        self.started = true;
        if let Some(action) = self.current_mut() {
            action.start(sink, player_id);
        }
    }

    fn tick(&mut self, sink: &mut dyn CommandSink, player_id: u64, registry: &mut ActionRegistry) {
        if !self.started {
            return;
        }
        while let Some(action) = self.current() {
            if action.is_finished() {
                self.cursor += 1;
                if let Some(next) = self.current_mut() {
                    next.start(sink, player_id);
                    registry.register(next);
                }
            } else {
                break;
            }
        }
    }

    fn is_finished(&self) -> bool {
        self.started && self.cursor >= self.subactions.len()
    }

    fn abort(&mut self, sink: &mut dyn CommandSink, player_id: u64) {
        if let Some(action) = self.current_mut() {
            action.abort(sink, player_id);
        }
        self.cursor = self.subactions.len();
    }

    fn walk_result(&self, from: PosF) -> (PosF, f64) {
        let mut pos = from;
        let mut total = 0.0;
        for action in &self.subactions[self.cursor.min(self.subactions.len())..] {
            let (next_pos, duration) = action.walk_result(pos);
            pos = next_pos;
            total += duration;
        }
        (pos, total)
    }

    fn inventory_balance(&self) -> HashMap<String, i64> {
        let mut out: HashMap<String, i64> = HashMap::new();
        for action in &self.subactions {
            for (item, delta) in action.inventory_balance() {
                *out.entry(item).or_insert(0) += delta;
            }
        }
        out
    }

    fn inventory_balance_on_launch(&self) -> HashMap<String, i64> {
        self.current().map(ActionLike::inventory_balance_on_launch).unwrap_or_default()
    }

    fn first_pos(&self) -> Option<PosF> {
        self.subactions.iter().find_map(ActionLike::first_pos)
    }
}

/// Weakly-held map from action id to the live action's header, so
/// telemetry callbacks (§4.3) can find and mutate an in-flight action's
/// `finished`/`confirmed_tick` without keeping the whole action alive
/// past its owning compound's lifetime. Keyed off the header rather
/// than the action itself: actions live as plain values inside
/// `Vec<PrimitiveAction>`/`RefCell<Option<PrimitiveAction>>`, so there
/// is no stable `Rc<PrimitiveAction>` to register against, but the
/// header is `Cell`-based and only needs a shared handle.
#[derive(Default)]
pub struct ActionRegistry {
    actions: HashMap<ActionId, Weak<PrimitiveHeader>>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, action: &PrimitiveAction) {
        self.actions.insert(action.id(), Rc::downgrade(action.header_rc()));
    }

    pub fn find(&self, id: ActionId) -> Option<Rc<PrimitiveHeader>> {
        self.actions.get(&id).and_then(Weak::upgrade)
    }

    /// Marks the registered action `id` finished at `tick`, per §4.3's
    /// `action_completed` handling. Returns `false` if the action is no
    /// longer registered (already finished and dropped, or never
    /// launched).
    pub fn mark_finished(&self, id: ActionId, tick: u64) -> bool {
        let Some(header) = self.find(id) else { return false };
        header.finished.set(true);
        header.confirmed_tick.set(Some(tick));
        true
    }

    /// Drops registry entries whose referent has already been dropped.
    pub fn sweep(&mut self) {
        self.actions.retain(|_, w| w.strong_count() > 0);
    }
}

/// `TakeFromInventory`'s full-amount pickup, snapshotted as a plain
/// [`Inventory`] delta for the scheduler's working-copy arithmetic.
pub fn full_inventory_delta(action: &PrimitiveAction) -> Inventory {
    let mut inv = Inventory::new();
    for (item, delta) in action.inventory_balance() {
        if delta > 0 {
            inv.add(item, delta as u64);
        }
    }
    inv
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::InMemoryCommandSink;

    #[test]
    fn compound_advances_cursor_as_primitives_finish() {
        let mut compound = CompoundAction::new(vec![
            PrimitiveAction::walk_waypoints(vec![Pos::new(1, 0)]),
            PrimitiveAction::walk_waypoints(vec![Pos::new(2, 0)]),
        ]);
        let mut sink = InMemoryCommandSink::new();
        let mut registry = ActionRegistry::new();
        compound.start(&mut sink, 1);
        assert_eq!(compound.cursor, 0);
        compound.subactions[0].header().finished.set(true);
        compound.tick(&mut sink, 1, &mut registry);
        assert_eq!(compound.cursor, 1);
        assert!(!compound.is_finished());
        assert!(registry.find(compound.subactions[1].id()).is_some(), "advancing the cursor should start and register the next subaction");
        compound.subactions[1].header().finished.set(true);
        compound.tick(&mut sink, 1, &mut registry);
        assert!(compound.is_finished());
    }

    #[test]
    fn compound_walk_result_chains_subactions() {
        let a = PrimitiveAction::walk_waypoints(vec![Pos::new(1, 0)]);
        let b = PrimitiveAction::walk_waypoints(vec![Pos::new(1, 1)]);
        let compound = CompoundAction::new(vec![a.clone(), b.clone()]);
        let (pos, duration) = compound.walk_result(PosF::new(0.0, 0.0));
        let (mid, d1) = a.walk_result(PosF::new(0.0, 0.0));
        let (end, d2) = b.walk_result(mid);
        assert_eq!(pos, end);
        assert_eq!(duration, d1 + d2);
    }

    #[test]
    fn craft_balance_on_launch_is_ingredients_only() {
        let mut balance = HashMap::new();
        balance.insert("iron-plate".to_string(), -2);
        balance.insert("iron-gear-wheel".to_string(), 1);
        let action = PrimitiveAction::craft_recipe("iron-gear-wheel", 1, balance);
        let launch = action.inventory_balance_on_launch();
        assert_eq!(launch.get("iron-plate"), Some(&-2));
        assert_eq!(launch.get("iron-gear-wheel"), None);
    }

    #[test]
    fn place_entity_on_launch_equals_full_balance() {
        let action = PrimitiveAction::place_entity("iron-chest", Pos::new(0, 0), Direction::North);
        assert_eq!(action.inventory_balance_on_launch(), action.inventory_balance());
    }
}
