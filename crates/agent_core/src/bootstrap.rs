//! Bootstrap: the single source of truth for wiring a fresh agent
//! world and its per-tick schedule, shared by the CLI binary and by
//! tests that want a ready-to-drive `World` without repeating the
//! resource list.

use crate::action::ActionRegistry;
use crate::command::CommandSink;
use crate::config::AgentConfig;
use crate::error::AgentResult;
use crate::pathfinder::PathCache;
use crate::player::{PlayerBundle, PlayerRuntimes, Schedulers};
use crate::systems;
use crate::telemetry::WorldModel;
use bevy_ecs::prelude::*;

pub const DEFAULT_PATH_CACHE_CAPACITY: usize = 256;

/// Options controlling what a freshly built world contains.
#[derive(Debug, Clone)]
pub struct WorldOptions {
    pub player_ids: Vec<u64>,
    pub path_cache_capacity: usize,
}

impl Default for WorldOptions {
    fn default() -> Self {
        Self { player_ids: Vec::new(), path_cache_capacity: DEFAULT_PATH_CACHE_CAPACITY }
    }
}

impl WorldOptions {
    /// Builds options for `player_ids`, taking the path cache capacity
    /// from `config` rather than the hardcoded default.
    pub fn from_config(config: &AgentConfig, player_ids: Vec<u64>) -> Self {
        Self { player_ids, path_cache_capacity: config.pathfinder.path_cache_capacity }
    }
}

/// Builds a world with every resource the player-runtime schedule
/// needs already inserted, and one entity per requested player id.
/// The world model starts pre-seeded with the embedded default
/// recipe/item/entity-prototype catalogues (see
/// [`WorldModel::with_default_catalogues`]).
pub fn build_agent_world(sink: Box<dyn CommandSink>, opts: WorldOptions) -> AgentResult<World> {
    let mut world = World::new();

    world.insert_non_send_resource(WorldModel::with_default_catalogues()?);
    world.insert_non_send_resource(PlayerRuntimes::new());
    world.insert_non_send_resource(Schedulers::new());
    world.insert_non_send_resource(PathCache::new(opts.path_cache_capacity));
    world.insert_non_send_resource(ActionRegistry::new());
    world.insert_non_send_resource(sink);
    world.insert_resource(systems::Tick::default());

    for player_id in &opts.player_ids {
        world.spawn(PlayerBundle::new(*player_id));
    }

    Ok(world)
}

/// Builds the default per-tick schedule: mirror world-model facts onto
/// player entities, advance each player's §4.9 state machine, hand idle
/// players their scheduler's next task (§4.8.4), then poll the craft
/// handoff protocol. Ingestion itself (`WorldModel::apply_line`) runs
/// outside this schedule, once per packet, before the schedule is run
/// for the tick boundary it completes.
pub fn build_default_schedule() -> Schedule {
    let mut schedule = Schedule::default();
    schedule.add_systems(
        (
            systems::advance_tick,
            systems::dispatch_telemetry_events,
            systems::sync_players_from_world_model,
            systems::advance_player_runtimes,
            systems::advance_schedulers,
            systems::poll_all_craft_handoffs,
            systems::sweep_action_registry,
        )
            .chain(),
    );
    schedule
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::InMemoryCommandSink;

    #[test]
    fn build_agent_world_spawns_one_entity_per_player() {
        let mut world =
            build_agent_world(Box::new(InMemoryCommandSink::new()), WorldOptions { player_ids: vec![1, 2, 3], ..Default::default() }).unwrap();
        let mut query = world.query::<&crate::player::PlayerId>();
        assert_eq!(query.iter(&world).count(), 3);
    }

    #[test]
    fn default_schedule_runs_without_players() {
        let mut world = build_agent_world(Box::new(InMemoryCommandSink::new()), WorldOptions::default()).unwrap();
        let mut schedule = build_default_schedule();
        schedule.run(&mut world);
        assert_eq!(world.resource::<systems::Tick>().0, 0);
    }

    #[test]
    fn from_config_uses_configured_path_cache_capacity() {
        let mut config = crate::config::AgentConfig::default();
        config.pathfinder.path_cache_capacity = 42;
        let opts = WorldOptions::from_config(&config, vec![1]);
        assert_eq!(opts.path_cache_capacity, 42);
        assert_eq!(opts.player_ids, vec![1]);
    }

    #[test]
    fn built_world_carries_default_recipe_catalogue() {
        let world = build_agent_world(Box::new(InMemoryCommandSink::new()), WorldOptions::default()).unwrap();
        let model = world.get_non_send_resource::<WorldModel>().unwrap();
        assert!(!model.recipes.is_empty());
        assert!(!model.entity_prototypes.is_empty());
        assert!(!model.item_prototypes.is_empty());
    }
}
