//! End-to-end player runtime scenario: assigning a task drives a player
//! through every §4.9 state in order, gated on a simulated `action_completed`
//! acknowledgement for each leg (matching how a real telemetry stream
//! confirms actions rather than letting them auto-finish).

use agent_core::action::{ActionRegistry, CompoundAction, PrimitiveAction};
use agent_core::bootstrap::{build_agent_world, build_default_schedule, WorldOptions};
use agent_core::command::{CommandSink, InMemoryCommandSink};
use agent_core::geometry::Pos;
use agent_core::player::{assign_task, PlayerId, PlayerRuntimes, PlayerState};
use agent_core::scheduler::{Task, TaskId};
use agent_core::telemetry::{Player, WorldModel};
use bevy_ecs::prelude::*;
use std::rc::Rc;

const PLAYER: u64 = 7;

fn player_state(world: &mut World) -> PlayerState {
    let mut q = world.query::<(&PlayerId, &PlayerState)>();
    q.iter(world).find(|(id, _)| id.0 == PLAYER).map(|(_, s)| *s).unwrap()
}

fn finish_current_approach_leg(world: &mut World) {
    let runtimes = world.get_non_send_resource::<PlayerRuntimes>().unwrap();
    let runtime = runtimes.0.get(&PLAYER).unwrap();
    if let Some(action) = runtime.approach.current() {
        action.header().finished.set(true);
    }
}

fn finish_current_task_leg(task: &Task) {
    if let Some(action) = task.actions.borrow().current() {
        action.header().finished.set(true);
    }
}

struct PendingAssignment(u64, Rc<Task>);

fn apply_pending_assignment(
    assignment: NonSend<PendingAssignment>,
    mut runtimes: NonSendMut<PlayerRuntimes>,
    mut sink: NonSendMut<Box<dyn CommandSink>>,
    mut registry: NonSendMut<ActionRegistry>,
) {
    assign_task(&mut *runtimes, &mut **sink, &mut registry, assignment.0, assignment.1.clone());
}

#[test]
fn player_runtime_walks_through_every_state_in_order() {
    let mut world = build_agent_world(Box::new(InMemoryCommandSink::new()), WorldOptions { player_ids: vec![PLAYER], ..Default::default() }).unwrap();

    {
        let mut model = world.get_non_send_resource_mut::<WorldModel>().unwrap();
        model.players.insert(PLAYER, Player { id: PLAYER, position: Pos::new(0, 0), connected: true });
        model.inventories.insert(PLAYER, Default::default());
    }

    let task = Rc::new(Task::new(TaskId::new(), "walk-to-drill", 0));
    *task.actions.borrow_mut() = CompoundAction::new(vec![PrimitiveAction::walk_waypoints(vec![Pos::new(5, 0)])]);

    world.insert_non_send_resource(PendingAssignment(PLAYER, task.clone()));
    let mut assign_once = Schedule::default();
    assign_once.add_systems(apply_pending_assignment);
    assign_once.run(&mut world);

    let mut schedule = build_default_schedule();

    schedule.run(&mut world);
    assert_eq!(player_state(&mut world), PlayerState::ApproachingStartLocation);

    schedule.run(&mut world);
    assert_eq!(player_state(&mut world), PlayerState::ApproachingStartLocation, "walk leg hasn't been acked yet");

    finish_current_approach_leg(&mut world);
    schedule.run(&mut world);
    assert_eq!(player_state(&mut world), PlayerState::AwaitingLaunch);

    schedule.run(&mut world);
    assert_eq!(player_state(&mut world), PlayerState::Launched, "empty required_items clears the gate immediately");

    schedule.run(&mut world);
    assert_eq!(player_state(&mut world), PlayerState::Launched, "main task leg hasn't been acked yet");

    finish_current_task_leg(&task);
    schedule.run(&mut world);
    assert_eq!(player_state(&mut world), PlayerState::Finished);
}
