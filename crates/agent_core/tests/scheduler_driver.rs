//! §4.8.4/§4.9 end-to-end: an idle player whose assigned task is missing
//! items gets handed a synthesized collector task by the per-tick
//! scheduler driver, reached purely through `build_default_schedule`.

use agent_core::bootstrap::{build_agent_world, build_default_schedule, WorldOptions};
use agent_core::command::InMemoryCommandSink;
use agent_core::entity::{ContainerData, Entity, ExtraData};
use agent_core::geometry::{Direction, Pos};
use agent_core::player::{PlayerRuntimes, Schedulers};
use agent_core::scheduler::{Task, TaskId};
use agent_core::telemetry::{Player, WorldModel};
use std::rc::Rc;

const PLAYER: u64 = 11;

#[test]
fn idle_player_is_handed_a_synthesized_collector_task_for_missing_items() {
    let mut world = build_agent_world(Box::new(InMemoryCommandSink::new()), WorldOptions { player_ids: vec![PLAYER], ..Default::default() }).unwrap();

    {
        let mut model = world.get_non_send_resource_mut::<WorldModel>().unwrap();
        model.players.insert(PLAYER, Player { id: PLAYER, position: Pos::new(0, 0), connected: true });
        model.inventories.insert(PLAYER, Default::default());

        let mut chest = Entity::new(Pos::new(5, 0), "iron-chest", Direction::North);
        let mut data = ContainerData::default();
        data.inventories.set("chest", "iron-plate", 10);
        chest.extra_data = ExtraData::Container(Rc::new(data));
        model.entities.insert(chest);
    }

    let mut task = Task::new(TaskId::new(), "smelt-plates", 10);
    task.required_items.insert("iron-plate".to_string(), 5);
    let task = Rc::new(task);
    world.get_non_send_resource_mut::<Schedulers>().unwrap().entry(PLAYER).add_task(task.clone());

    let mut schedule = build_default_schedule();
    schedule.run(&mut world);

    let runtimes = world.get_non_send_resource::<PlayerRuntimes>().unwrap();
    let runtime = runtimes.0.get(&PLAYER).expect("player runtime should exist");
    let assigned = runtime.current_task.clone().expect("the scheduler driver should have assigned a task");

    assert!(assigned.is_dependent, "missing items should route through a synthesized collector, not the original task");
    assert_eq!(assigned.end_location, Pos::new(5, 0));
    assert_eq!(assigned.actions.borrow().subactions.len(), 2);
}

#[test]
fn player_with_no_pending_tasks_stays_idle() {
    let mut world = build_agent_world(Box::new(InMemoryCommandSink::new()), WorldOptions { player_ids: vec![PLAYER], ..Default::default() }).unwrap();
    {
        let mut model = world.get_non_send_resource_mut::<WorldModel>().unwrap();
        model.players.insert(PLAYER, Player { id: PLAYER, position: Pos::new(0, 0), connected: true });
        model.inventories.insert(PLAYER, Default::default());
    }

    let mut schedule = build_default_schedule();
    for _ in 0..3 {
        schedule.run(&mut world);
    }

    let runtimes = world.get_non_send_resource::<PlayerRuntimes>().unwrap();
    assert!(runtimes.0.get(&PLAYER).map(|r| r.current_task.is_none()).unwrap_or(true));
}
