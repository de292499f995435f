//! # Agent Core
//!
//! `agent_core` is the brain of a headless automation agent for a
//! factory-building game, providing:
//!
//! - **World model**: a live mirror of the remote game state, built by
//!   replaying a line-oriented telemetry dialect (see [`telemetry`]).
//! - **Spatial systems**: a chunked, effectively-infinite tile grid
//!   ([`worldmap`]), a spatially-bucketed entity index ([`worldlist`]),
//!   and cached A* pathfinding with per-tile directional margins
//!   ([`pathfinder`]).
//! - **Inventory and crafting**: tagged/claimed inventory arithmetic
//!   ([`inventory`]) and a static recipe catalogue ([`recipe`]).
//! - **Planning**: resource patch discovery ([`resource_patch`]), mine
//!   layout planning ([`mine_planner`]), declarative goals ([`goal`]),
//!   and a per-player task scheduler with crafting-order synthesis
//!   ([`scheduler`]).
//! - **Execution**: a hierarchical action system ([`action`]) dispatched
//!   through an outgoing RPC sink ([`command`]).
//! - **Player runtime**: per-player ECS state and the §4.9-style
//!   approach/launch/execute state machine ([`player`], [`systems`]),
//!   wired together by [`bootstrap`].
//!
//! ## Architecture overview
//!
//! Most of this crate's state is plain data structures manipulated by
//! ordinary functions; only the per-tick player runtime is expressed as
//! a `bevy_ecs` schedule. Because a player's live task graph is built
//! from `Rc`/`RefCell`/`Weak`, it cannot satisfy `Component`'s `Send`
//! bound, so only small `Copy` facts about a player ([`player::PlayerId`],
//! [`player::Position`], [`player::Connected`], [`player::PlayerState`])
//! are ECS components; the world model, schedulers, path cache, and
//! action registry are inserted as non-send resources instead. This
//! keeps everything the agent touches single-threaded, matching the
//! cooperative, one-command-at-a-time relationship it has with the game.
//!
//! ## Module organization
//!
//! - [`geometry`]: tile positions, areas, and the 4-way direction enum
//! - [`worldmap`]: the chunked sparse tile grid and its viewport cache
//! - [`worldlist`]: spatial bucketing for entity/resource lookups
//! - [`entity`]: entity/prototype model and per-instance extra data
//! - [`resource_patch`]: per-tile resource records and flood-filled patches
//! - [`inventory`]: tagged inventory arithmetic
//! - [`recipe`]: the static recipe catalogue
//! - [`pathfinder`]: A* search with a cache and directional margins
//! - [`mine_planner`]: mine layout and belt planning
//! - [`goal`]: declarative goals over world state
//! - [`scheduler`]: per-player task store and crafting-order synthesis
//! - [`action`]: the hierarchical action system
//! - [`command`]: the outgoing RPC sink and its addressing enums
//! - [`telemetry`]: the world-model ingestor
//! - [`player`]: per-player ECS components and runtime state
//! - [`systems`]: the per-tick system functions
//! - [`bootstrap`]: wiring a fresh world and its schedule
//! - [`config`]: tunable parameters collected from across the crate
//! - [`error`]: the crate's error taxonomy
//!
//! ## Usage example
//!
//! ```
//! use agent_core::bootstrap::{build_agent_world, build_default_schedule, WorldOptions};
//! use agent_core::command::InMemoryCommandSink;
//!
//! let mut world = build_agent_world(
//!     Box::new(InMemoryCommandSink::new()),
//!     WorldOptions { player_ids: vec![1], ..Default::default() },
//! ).unwrap();
//! let mut schedule = build_default_schedule();
//! schedule.run(&mut world);
//! ```

pub mod action;
pub mod bootstrap;
pub mod command;
pub mod config;
pub mod entity;
pub mod error;
pub mod geometry;
pub mod goal;
pub mod inventory;
pub mod mine_planner;
pub mod pathfinder;
pub mod player;
pub mod recipe;
pub mod resource_patch;
pub mod scheduler;
pub mod systems;
pub mod telemetry;
pub mod worldlist;
pub mod worldmap;

/// Convenience re-exports of the types most callers reach for.
pub mod prelude {
    pub use crate::action::{ActionLike, ActionRegistry, CompoundAction, PrimitiveAction};
    pub use crate::bootstrap::{build_agent_world, build_default_schedule, WorldOptions};
    pub use crate::command::CommandSink;
    pub use crate::config::AgentConfig;
    pub use crate::entity::{Entity, EntityPrototype, ItemPrototype};
    pub use crate::error::{AgentError, AgentResult};
    pub use crate::geometry::{Area, Direction, Pos};
    pub use crate::goal::{Goal, GoalList};
    pub use crate::inventory::{Inventory, TaggedInventory};
    pub use crate::player::{PlayerBundle, PlayerState};
    pub use crate::recipe::{Recipe, RecipeRegistry};
    pub use crate::scheduler::{Scheduler, Task, TaskId};
    pub use crate::telemetry::WorldModel;
}
