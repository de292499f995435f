//! Declarative goals: predicates on world state paired with a generator
//! of the action sequence that would make the predicate true.

use crate::action::{CompoundAction, PrimitiveAction};
use crate::command::InventorySlot;
use crate::entity::Entity;
use crate::geometry::{Direction, Pos};
use std::collections::HashMap;

/// How an [`InventoryPredicate`] goal should reconcile a slot's current
/// contents against the desired item counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InventoryGoalSense {
    /// Top up each desired item to its target count.
    Positive,
    /// Remove anything beyond the desired counts (or everything, for an
    /// empty desired map).
    Negative,
}

#[derive(Debug, Clone)]
pub enum Goal {
    PlaceEntity { desired: Entity },
    RemoveEntity { target: Entity },
    InventoryPredicate {
        entity_pos: Pos,
        slot: InventorySlot,
        desired: HashMap<String, u64>,
        sense: InventoryGoalSense,
    },
}

/// Read-only snapshot of what a goal needs to inspect to decide
/// fulfillment or generate actions: nearby entities and container
/// contents. Kept minimal and owned so goal evaluation never borrows
/// from the live world model across a planning pass.
pub struct GoalContext<'a> {
    pub nearby_entities: &'a [Entity],
    pub container_contents: &'a dyn Fn(Pos, InventorySlot) -> HashMap<String, u64>,
}

const REACH_DISTANCE: f64 = 2.0;

impl Goal {
    pub fn is_fulfilled(&self, ctx: &GoalContext) -> bool {
        match self {
            Goal::PlaceEntity { desired } => ctx.nearby_entities.iter().any(|e| e.mostly_equal(desired)),
            Goal::RemoveEntity { target } => !ctx.nearby_entities.iter().any(|e| e.mostly_equal(target)),
            Goal::InventoryPredicate { entity_pos, slot, desired, sense } => {
                let contents = (ctx.container_contents)(*entity_pos, *slot);
                match sense {
                    InventoryGoalSense::Positive => desired.iter().all(|(item, &want)| contents.get(item).copied().unwrap_or(0) >= want),
                    InventoryGoalSense::Negative => {
                        if desired.is_empty() {
                            contents.values().all(|&c| c == 0)
                        } else {
                            contents.iter().all(|(item, &have)| have <= desired.get(item).copied().unwrap_or(0))
                        }
                    }
                }
            }
        }
    }

    /// Actions that would fulfill this goal, assuming it currently is
    /// not. The scheduler may legally reorder the returned actions
    /// against those of sibling goals, so each goal's actions must be
    /// individually fulfillable without relying on ordering.
    pub fn actions(&self) -> Vec<PrimitiveAction> {
        match self {
            Goal::PlaceEntity { desired } => {
                vec![
                    walk_to_stub(desired.position, REACH_DISTANCE),
                    PrimitiveAction::place_entity(desired.prototype.clone(), desired.position, desired.direction),
                ]
            }
            Goal::RemoveEntity { target } => {
                vec![
                    walk_to_stub(target.position, REACH_DISTANCE),
                    PrimitiveAction::mine_object(target.prototype.clone(), target.position, None),
                ]
            }
            Goal::InventoryPredicate { entity_pos, slot, desired, sense } => match sense {
                InventoryGoalSense::Positive => {
                    let mut actions = vec![walk_to_stub(*entity_pos, REACH_DISTANCE)];
                    for (item, &amount) in desired {
                        actions.push(PrimitiveAction::put_to_inventory(item.clone(), amount, *entity_pos, *slot));
                    }
                    actions
                }
                InventoryGoalSense::Negative => {
                    let mut actions = vec![walk_to_stub(*entity_pos, REACH_DISTANCE)];
                    for (item, &amount) in desired {
                        actions.push(PrimitiveAction::take_from_inventory(item.clone(), amount, *entity_pos, *slot));
                    }
                    actions
                }
            },
        }
    }
}

/// `WalkTo`'s subactions are computed lazily from the pathfinder at
/// `start()`; here we only need a placeholder `WalkWaypoints` with the
/// destination as its sole waypoint, since the real path is filled in by
/// the scheduler once it knows the player's current position.
fn walk_to_stub(destination: Pos, _allowed_distance: f64) -> PrimitiveAction {
    PrimitiveAction::walk_waypoints(vec![destination])
}

/// A list of goals evaluated together, reporting whether every goal
/// holds and emitting the concatenation of unfulfilled goals' actions.
#[derive(Debug, Clone, Default)]
pub struct GoalList {
    pub goals: Vec<Goal>,
}

impl GoalList {
    pub fn new(goals: Vec<Goal>) -> Self {
        Self { goals }
    }

    pub fn all_fulfilled(&self, ctx: &GoalContext) -> bool {
        self.goals.iter().all(|g| g.is_fulfilled(ctx))
    }

    pub fn actions(&self, ctx: &GoalContext) -> CompoundAction {
        let actions = self.goals.iter().filter(|g| !g.is_fulfilled(ctx)).flat_map(Goal::actions).collect();
        CompoundAction::new(actions)
    }
}
