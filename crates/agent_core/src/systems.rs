//! The per-tick system functions chained by [`crate::bootstrap`]:
//! mirroring player facts out of the world model, advancing each
//! player's §4.9 state machine, and polling the craft handoff
//! protocol. Mirrors the shape of a conventional ECS tick (movement,
//! then confinement, then job execution) but over a single-threaded,
//! non-send world, since the state these systems touch holds `Rc`s.

use crate::action::ActionRegistry;
use crate::command::{CommandSink, InventorySlot};
use crate::player::{advance_player, assign_task, poll_craft_handoff, Connected, PlayerId, PlayerRuntimes, PlayerState, Position, Schedulers};
use crate::scheduler::Collectible;
use crate::telemetry::WorldModel;
use crate::worldlist::WorldList;
use bevy_ecs::prelude::*;

/// Tick counter mirrored from the world model after each ingestion
/// pass, for any system that only needs the count and not the rest of
/// [`WorldModel`].
#[derive(Resource, Debug, Clone, Copy, Default)]
pub struct Tick(pub u64);

pub fn advance_tick(world_model: NonSend<WorldModel>, mut tick: ResMut<Tick>) {
    tick.0 = world_model.tick;
}

/// Mirrors each player entity's position/connectivity from the world
/// model, which the ingestion pass (outside this schedule) has already
/// brought up to date for the current tick.
pub fn sync_players_from_world_model(world_model: NonSend<WorldModel>, mut q: Query<(&PlayerId, &mut Position, &mut Connected)>) {
    for (id, mut pos, mut connected) in q.iter_mut() {
        match world_model.players.get(&id.0) {
            Some(p) => {
                pos.0 = p.position;
                connected.0 = p.connected;
            }
            None => connected.0 = false,
        }
    }
}

/// Drives every player's §4.9 state machine one step, using whichever
/// `CommandSink` the caller wired in as a non-send resource.
pub fn advance_player_runtimes(
    world_model: NonSend<WorldModel>,
    mut runtimes: NonSendMut<PlayerRuntimes>,
    mut sink: NonSendMut<Box<dyn CommandSink>>,
    mut registry: NonSendMut<ActionRegistry>,
    mut q: Query<(&PlayerId, &mut PlayerState)>,
) {
    for (id, mut state) in q.iter_mut() {
        let Some(inventory) = world_model.inventories.get(&id.0) else { continue };
        let runtime = runtimes.entry(id.0);
        advance_player(runtime, &mut state, &mut **sink, &mut registry, id.0, inventory);
    }
}

/// §4.8.6: polls each player's active task's crafting list and
/// starts/confirms the current craft.
pub fn poll_all_craft_handoffs(
    world_model: NonSend<WorldModel>,
    mut runtimes: NonSendMut<PlayerRuntimes>,
    mut sink: NonSendMut<Box<dyn CommandSink>>,
    mut registry: NonSendMut<ActionRegistry>,
    q: Query<&PlayerId>,
) {
    for id in q.iter() {
        let runtime = runtimes.entry(id.0);
        poll_craft_handoff(runtime, &mut **sink, &mut registry, id.0, &world_model.recipes);
    }
}

/// §4.3: drains `WorldModel`'s pending `action_completed`/`mined_item`
/// queues, the only two telemetry events that feed back into live
/// action state rather than the world model itself. `action_completed`
/// marks the named action finished via the registry; `mined_item`
/// routes into the reporting player's current task's action chain.
pub fn dispatch_telemetry_events(
    mut world_model: NonSendMut<WorldModel>,
    runtimes: NonSend<PlayerRuntimes>,
    registry: NonSendMut<ActionRegistry>,
) {
    let completions = std::mem::take(&mut world_model.pending_action_completions);
    for (tick, action_id) in completions {
        if !registry.mark_finished(crate::action::ActionId(action_id), tick) {
            crate::error::warn(format!("action_completed for unregistered action {action_id}"));
        }
    }

    let mined = std::mem::take(&mut world_model.pending_mined_items);
    for (tick, player_id, item, count) in mined {
        let Some(runtime) = runtimes.0.get(&player_id) else { continue };
        let Some(task) = runtime.current_task.as_ref() else { continue };
        let actions = task.actions.borrow();
        if actions.dispatch_mined_item(&item, count).is_some() {
            if let Some(current) = actions.current() {
                current.mark_finished(tick);
            }
        }
    }
}

/// §4.5: periodically drops [`ActionRegistry`] entries whose action has
/// already been dropped, so the map does not grow unbounded across a
/// long-running session.
pub fn sweep_action_registry(mut registry: NonSendMut<ActionRegistry>) {
    registry.sweep();
}

/// Builds the `(containers, mineables)` pair §4.8.5 collector synthesis
/// draws from, straight out of the world model: every still-held item in
/// a take-eligible slot of a `Container`-kind entity, and every placed
/// entity whose prototype is mineable.
fn world_collectibles(world_model: &WorldModel) -> (WorldList<Collectible>, WorldList<Collectible>) {
    let mut containers = WorldList::new();
    let mut mineables = WorldList::new();

    for entity in world_model.entities.iter() {
        if let Some(data) = entity.extra_data.container() {
            for (slot_name, item, count) in data.inventories.iter() {
                if count == 0 {
                    continue;
                }
                let Some(slot) = InventorySlot::from_name(slot_name) else { continue };
                if !slot.accepts_takes() {
                    continue;
                }
                containers.insert(Collectible {
                    position: entity.position,
                    item: item.to_string(),
                    available: count,
                    entity_prototype: entity.prototype.clone(),
                    slot: Some(slot),
                    is_container: true,
                });
            }
        }

        if let Some(proto) = world_model.entity_prototypes.get(&entity.prototype) {
            if let Some(mine) = &proto.mineable {
                mineables.insert(Collectible {
                    position: entity.position,
                    item: mine.item.clone(),
                    available: mine.amount.max(0.0) as u64,
                    entity_prototype: entity.prototype.clone(),
                    slot: None,
                    is_container: false,
                });
            }
        }
    }

    (containers, mineables)
}

/// §4.8.4/§4.9 per-tick driver: any player with no active task gets
/// handed the head of their scheduler's tentative schedule, if one is
/// runnable within the grace threshold. Mirrors the original's
/// `get_next_task` being polled from the player's main loop once idle.
pub fn advance_schedulers(
    world_model: NonSend<WorldModel>,
    mut schedulers: NonSendMut<Schedulers>,
    mut runtimes: NonSendMut<PlayerRuntimes>,
    mut sink: NonSendMut<Box<dyn CommandSink>>,
    mut registry: NonSendMut<ActionRegistry>,
    q: Query<&PlayerId>,
) {
    let (containers, mineables) = world_collectibles(&world_model);

    for id in q.iter() {
        if runtimes.0.get(&id.0).is_some_and(|r| r.current_task.is_some()) {
            continue;
        }
        let Some(inventory) = world_model.inventories.get(&id.0) else { continue };
        let owner_id = id.0.to_string();
        let scheduler = schedulers.entry(id.0);
        if let Some(task) = scheduler.next_task(&world_model.recipes, inventory, &owner_id, &containers, &mineables) {
            assign_task(&mut *runtimes, &mut **sink, &mut registry, id.0, task);
        }
    }
}
