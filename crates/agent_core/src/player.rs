//! Per-player ECS state: connection/position components plus the §4.9
//! runtime state machine. The heavier state a player's runtime actually
//! drives — the live `Task`, its compound actions, the scheduler, the
//! world model — all hang off `Rc`/`RefCell`, so they live outside the
//! component table as non-send resources rather than as components;
//! only small, freely-copyable facts about a player are components.

use crate::action::{ActionLike, ActionRegistry, CompoundAction};
use crate::command::CommandSink;
use crate::geometry::Pos;
use crate::scheduler::{Scheduler, Task};
use bevy_ecs::prelude::*;
use std::collections::HashMap;
use std::rc::Rc;

#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PlayerId(pub u64);

#[derive(Component, Debug, Clone, Copy, Default, PartialEq)]
pub struct Position(pub Pos);

#[derive(Component, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Connected(pub bool);

/// §4.9's four states. `FINISHED` is both the idle state and the one a
/// completed task returns to.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerState {
    Finished,
    ApproachingStartLocation,
    AwaitingLaunch,
    Launched,
}

impl Default for PlayerState {
    fn default() -> Self {
        Self::Finished
    }
}

/// A player entity's full component bundle, spawned once per connected
/// avatar (see [`crate::bootstrap`]).
#[derive(Bundle)]
pub struct PlayerBundle {
    pub id: PlayerId,
    pub position: Position,
    pub connected: Connected,
    pub state: PlayerState,
}

impl PlayerBundle {
    pub fn new(player_id: u64) -> Self {
        Self { id: PlayerId(player_id), position: Position::default(), connected: Connected::default(), state: PlayerState::default() }
    }
}

/// The non-`Send` state a single player's runtime owns between ticks:
/// the approach action toward a newly assigned task's `start_location`,
/// the task's own launch actions once under way, and which craft (if
/// any) the runtime has told the game to start.
#[derive(Default)]
pub struct PlayerRuntime {
    pub current_task: Option<Rc<Task>>,
    pub approach: CompoundAction,
    pub craft_in_progress: bool,
}

/// All players' runtimes, keyed by player id. Held as a non-send
/// resource: `Task`/`CompoundAction` close over `Rc`/`RefCell`/`Weak`
/// and so cannot satisfy the `Send + Sync` bound ECS resources normally
/// require.
#[derive(Default)]
pub struct PlayerRuntimes(pub HashMap<u64, PlayerRuntime>);

impl PlayerRuntimes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entry(&mut self, player_id: u64) -> &mut PlayerRuntime {
        self.0.entry(player_id).or_default()
    }
}

/// Per-player schedulers, likewise non-send (a `Scheduler`'s tasks are
/// `Rc<Task>`).
#[derive(Default)]
pub struct Schedulers(pub HashMap<u64, Scheduler>);

impl Schedulers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entry(&mut self, player_id: u64) -> &mut Scheduler {
        self.0.entry(player_id).or_default()
    }
}

/// Assigns `task` to `player_id`, starting the approach leg toward its
/// `start_location`. Replaces (aborting) any task already in flight.
pub fn assign_task(
    runtimes: &mut PlayerRuntimes,
    sink: &mut dyn CommandSink,
    registry: &mut ActionRegistry,
    player_id: u64,
    task: Rc<Task>,
) {
    let runtime = runtimes.entry(player_id);
    if let Some(old) = runtime.current_task.take() {
        old.actions.borrow_mut().abort(sink, player_id);
    }
    let mut approach = CompoundAction::new(vec![crate::action::PrimitiveAction::walk_waypoints(vec![task.start_location])]);
    approach.start(sink, player_id);
    if let Some(action) = approach.current() {
        registry.register(action);
    }
    runtime.approach = approach;
    runtime.craft_in_progress = false;
    runtime.current_task = Some(task);
}

/// Drives one player's §4.9 state machine for one tick. `inventory`
/// must already reflect this tick's ingestion; `state` is read and
/// written in place.
pub fn advance_player(
    runtime: &mut PlayerRuntime,
    state: &mut PlayerState,
    sink: &mut dyn CommandSink,
    registry: &mut ActionRegistry,
    player_id: u64,
    inventory: &crate::inventory::TaggedInventory,
) {
    let Some(task) = runtime.current_task.clone() else {
        *state = PlayerState::Finished;
        return;
    };

    match *state {
        PlayerState::Finished => {
            *state = PlayerState::ApproachingStartLocation;
        }
        PlayerState::ApproachingStartLocation => {
            runtime.approach.tick(sink, player_id, registry);
            if runtime.approach.is_finished() {
                *state = PlayerState::AwaitingLaunch;
            }
        }
        PlayerState::AwaitingLaunch => {
            let required: Vec<(String, u64)> = task.required_items.iter().map(|(i, &n)| (i.clone(), n)).collect();
            if inventory.can_satisfy(&required, &owner_key(&task)) {
                let mut actions = task.actions.borrow_mut();
                actions.start(sink, player_id);
                if let Some(action) = actions.current() {
                    registry.register(action);
                }
                *state = PlayerState::Launched;
            }
        }
        PlayerState::Launched => {
            task.actions.borrow_mut().tick(sink, player_id, registry);
            if task.actions.borrow().is_finished() {
                task.fire_finished_callback();
                runtime.current_task = None;
                runtime.craft_in_progress = false;
                *state = PlayerState::Finished;
            }
        }
    }
}

/// The tagged-inventory owner key a task's `required_items` are checked
/// against: the task's own id, matching the ingestor's per-owner claims.
fn owner_key(task: &Task) -> String {
    task.id.0.to_string()
}

/// §4.8.6 craft handoff: starts, retreats, or confirms the current
/// player's in-flight `CraftRecipe` action against their active task's
/// crafting list. A no-op while no task is assigned or the task carries
/// no crafting list.
pub fn poll_craft_handoff(runtime: &mut PlayerRuntime, sink: &mut dyn CommandSink, registry: &mut ActionRegistry, player_id: u64, recipes: &crate::recipe::RecipeRegistry) {
    let Some(task) = runtime.current_task.clone() else { return };
    let mut list = task.crafting_list.borrow_mut();

    if runtime.craft_in_progress {
        let Some(entry) = list.peek_current() else {
            runtime.craft_in_progress = false;
            return;
        };
        if entry_action_finished(&task) {
            list.confirm_current();
            runtime.craft_in_progress = false;
        }
        return;
    }

    if list.peek_current().is_some() {
        return;
    }
    let Some(entry) = list.entries.iter().find(|e| e.status == crate::scheduler::CraftingStatus::Pending) else { return };
    let Some(recipe) = recipes.get(&entry.recipe) else { return };
    let count = 1;
    let balance = recipe_balance(recipe, count);
    list.accept_current();
    drop(list);
    let mut action = crate::action::PrimitiveAction::craft_recipe(recipe.id.clone(), count, balance);
    action.start(sink, player_id);
    registry.register(&action);
    *task.crafting_action.borrow_mut() = Some(action);
    runtime.craft_in_progress = true;
}

fn entry_action_finished(task: &Task) -> bool {
    task.crafting_action.borrow().as_ref().map(ActionLike::is_finished).unwrap_or(false)
}

fn recipe_balance(recipe: &crate::recipe::Recipe, count: u32) -> HashMap<String, i64> {
    let mut out = HashMap::new();
    for ingredient in &recipe.inputs {
        *out.entry(ingredient.item.clone()).or_insert(0) -= ingredient.amount as i64 * count as i64;
    }
    for product in &recipe.outputs {
        *out.entry(product.item.clone()).or_insert(0) += (product.amount * count as f64) as i64;
    }
    out
}
