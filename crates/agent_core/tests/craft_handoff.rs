//! End-to-end §4.8.6 craft handoff: a task with a multi-recipe crafting
//! list is driven entirely through `poll_craft_handoff` (via the default
//! schedule), one recipe confirmed per simulated craft completion, never
//! touching `CraftingList`'s own methods directly.

use agent_core::action::ActionRegistry;
use agent_core::bootstrap::{build_agent_world, build_default_schedule, WorldOptions};
use agent_core::command::{CommandSink, InMemoryCommandSink};
use agent_core::geometry::Pos;
use agent_core::player::{assign_task, PlayerRuntimes};
use agent_core::scheduler::{CraftingList, CraftingStatus, Task, TaskId};
use agent_core::telemetry::{Player, WorldModel};
use bevy_ecs::prelude::*;
use std::rc::Rc;

const PLAYER: u64 = 3;

struct PendingAssignment(u64, Rc<Task>);

fn apply_pending_assignment(
    assignment: NonSend<PendingAssignment>,
    mut runtimes: NonSendMut<PlayerRuntimes>,
    mut sink: NonSendMut<Box<dyn CommandSink>>,
    mut registry: NonSendMut<ActionRegistry>,
) {
    assign_task(&mut *runtimes, &mut **sink, &mut registry, assignment.0, assignment.1.clone());
}

fn entry_status(task: &Task, recipe: &str) -> CraftingStatus {
    task.crafting_list.borrow().entries.iter().find(|e| e.recipe == recipe).unwrap().status
}

fn finish_current_craft(task: &Task) {
    task.crafting_action.borrow().as_ref().unwrap().header().finished.set(true);
}

#[test]
fn craft_handoff_confirms_one_recipe_per_completion_in_order() {
    let mut world = build_agent_world(Box::new(InMemoryCommandSink::new()), WorldOptions { player_ids: vec![PLAYER], ..Default::default() }).unwrap();

    {
        let mut model = world.get_non_send_resource_mut::<WorldModel>().unwrap();
        model.players.insert(PLAYER, Player { id: PLAYER, position: Pos::new(0, 0), connected: true });
        model.inventories.insert(PLAYER, Default::default());
    }

    let task = Rc::new(Task::new(TaskId::new(), "craft-two-gears-then-a-cable", 0));
    *task.crafting_list.borrow_mut() = CraftingList::new(vec!["iron-gear-wheel".to_string(), "copper-cable".to_string()]);

    world.insert_non_send_resource(PendingAssignment(PLAYER, task.clone()));
    let mut assign_once = Schedule::default();
    assign_once.add_systems(apply_pending_assignment);
    assign_once.run(&mut world);

    let mut schedule = build_default_schedule();

    // First tick starts the first pending entry.
    schedule.run(&mut world);
    assert_eq!(entry_status(&task, "iron-gear-wheel"), CraftingStatus::Current);
    assert_eq!(entry_status(&task, "copper-cable"), CraftingStatus::Pending);
    assert!(task.crafting_action.borrow().is_some());

    // Ticking again with the craft unfinished changes nothing.
    schedule.run(&mut world);
    assert_eq!(entry_status(&task, "iron-gear-wheel"), CraftingStatus::Current);

    finish_current_craft(&task);
    schedule.run(&mut world);
    assert_eq!(entry_status(&task, "iron-gear-wheel"), CraftingStatus::Finished);
    // The same tick that confirms the first entry does not also start the
    // next one: the handoff is one state transition per tick.
    assert_eq!(entry_status(&task, "copper-cable"), CraftingStatus::Pending);

    schedule.run(&mut world);
    assert_eq!(entry_status(&task, "copper-cable"), CraftingStatus::Current);
    assert_eq!(task.crafting_list.borrow().entries[1].recipe, "copper-cable");

    finish_current_craft(&task);
    schedule.run(&mut world);
    assert_eq!(entry_status(&task, "copper-cable"), CraftingStatus::Finished);
    assert!(task.crafting_list.borrow().finished());
}

#[test]
fn craft_handoff_is_a_no_op_without_a_crafting_list() {
    let mut world = build_agent_world(Box::new(InMemoryCommandSink::new()), WorldOptions { player_ids: vec![PLAYER], ..Default::default() }).unwrap();

    {
        let mut model = world.get_non_send_resource_mut::<WorldModel>().unwrap();
        model.players.insert(PLAYER, Player { id: PLAYER, position: Pos::new(0, 0), connected: true });
        model.inventories.insert(PLAYER, Default::default());
    }

    let task = Rc::new(Task::new(TaskId::new(), "no-crafting", 0));
    world.insert_non_send_resource(PendingAssignment(PLAYER, task.clone()));
    let mut assign_once = Schedule::default();
    assign_once.add_systems(apply_pending_assignment);
    assign_once.run(&mut world);

    let mut schedule = build_default_schedule();
    for _ in 0..3 {
        schedule.run(&mut world);
    }
    assert!(task.crafting_action.borrow().is_none());
}
