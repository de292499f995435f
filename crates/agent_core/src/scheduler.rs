//! Task scheduler: per-player task store, item allocation, the
//! "grocery queue" crafting-order heuristic, schedule feasibility
//! checking, and collector-task synthesis.

use crate::action::{ActionLike, CompoundAction, PrimitiveAction};
use crate::geometry::Pos;
use crate::goal::GoalList;
use crate::inventory::{Inventory, TaggedInventory};
use crate::recipe::{Recipe, RecipeRegistry};
use crate::worldlist::{Located, WorldList};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

pub const LOWEST_PRIO: i64 = 99_999;
pub const HIGHEST_PRIO: i64 = -99_999;

/// Priority-inversion grace: a lower-priority predecessor may delay a
/// higher-priority task by at most this many seconds before the
/// schedule insertion is rolled back.
pub const PRIORITY_INVERSION_GRACE_SECONDS: f64 = 10.0;

pub const MAX_CRAFTING_LIST_LEN: usize = 20;

/// Extra grace a synthesized collector task gets on top of whatever is
/// already ahead of it in the schedule, per the original's per-collector
/// time limit (examples/original_source/scheduler.cpp:845).
pub const COLLECTOR_GRACE_SECONDS: f64 = 15.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CraftingStatus {
    Pending,
    Current,
    Finished,
}

#[derive(Debug, Clone)]
pub struct CraftingEntry {
    pub status: CraftingStatus,
    pub recipe: String,
}

/// Ordered `(status, recipe)` entries. Consistent iff at most the
/// initial prefix is FINISHED, followed by at most one CURRENT, then
/// PENDING (§8 invariant 5).
#[derive(Debug, Clone, Default)]
pub struct CraftingList {
    pub entries: Vec<CraftingEntry>,
}

impl CraftingList {
    pub fn new(recipes: impl IntoIterator<Item = String>) -> Self {
        Self { entries: recipes.into_iter().map(|recipe| CraftingEntry { status: CraftingStatus::Pending, recipe }).collect() }
    }

    pub fn is_consistent(&self) -> bool {
        let mut seen_current = false;
        let mut seen_pending = false;
        for entry in &self.entries {
            match entry.status {
                CraftingStatus::Finished => {
                    if seen_current || seen_pending {
                        return false;
                    }
                }
                CraftingStatus::Current => {
                    if seen_current {
                        return false;
                    }
                    seen_current = true;
                }
                CraftingStatus::Pending => {
                    seen_pending = true;
                }
            }
        }
        true
    }

    pub fn peek_current(&self) -> Option<&CraftingEntry> {
        self.entries.iter().find(|e| e.status == CraftingStatus::Current)
    }

    pub fn accept_current(&mut self) -> bool {
        if self.peek_current().is_some() {
            return false;
        }
        if let Some(entry) = self.entries.iter_mut().find(|e| e.status == CraftingStatus::Pending) {
            entry.status = CraftingStatus::Current;
            return true;
        }
        false
    }

    pub fn retreat_current(&mut self) -> bool {
        if let Some(entry) = self.entries.iter_mut().find(|e| e.status == CraftingStatus::Current) {
            entry.status = CraftingStatus::Pending;
            return true;
        }
        false
    }

    pub fn confirm_current(&mut self) -> Option<String> {
        let idx = self.entries.iter().position(|e| e.status == CraftingStatus::Current)?;
        self.entries[idx].status = CraftingStatus::Finished;
        Some(self.entries[idx].recipe.clone())
    }

    pub fn time_remaining(&self, recipes: &RecipeRegistry) -> f64 {
        self.entries
            .iter()
            .filter(|e| e.status != CraftingStatus::Finished)
            .filter_map(|e| recipes.get(&e.recipe))
            .map(|r| r.energy_seconds)
            .sum()
    }

    pub fn finished(&self) -> bool {
        self.entries.iter().all(|e| e.status == CraftingStatus::Finished)
    }

    pub fn almost_finished(&self) -> bool {
        self.entries.iter().filter(|e| e.status != CraftingStatus::Finished).count() <= 1
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskId(pub uuid::Uuid);

impl TaskId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

pub struct Task {
    pub id: TaskId,
    pub name: String,
    pub priority: i64,
    pub required_items: HashMap<String, u64>,
    pub crafting_list: RefCell<CraftingList>,
    pub start_location: Pos,
    pub start_radius: f64,
    pub end_location: Pos,
    pub duration: f64,
    pub actions: RefCell<CompoundAction>,
    pub is_dependent: bool,
    pub owner: Option<Weak<Task>>,
    pub crafting_eta: RefCell<Option<f64>>,
    pub goals: RefCell<GoalList>,
    pub finished_callback: RefCell<Option<Box<dyn FnMut()>>>,
    /// The in-flight `CraftRecipe` action for this task's current craft,
    /// if the player runtime has started one (§4.8.6).
    pub crafting_action: RefCell<Option<PrimitiveAction>>,
}

impl Task {
    pub fn new(id: TaskId, name: impl Into<String>, priority: i64) -> Self {
        Self {
            id,
            name: name.into(),
            priority,
            required_items: HashMap::new(),
            crafting_list: RefCell::new(CraftingList::default()),
            start_location: Pos::default(),
            start_radius: 1.0,
            end_location: Pos::default(),
            duration: 0.0,
            actions: RefCell::new(CompoundAction::empty()),
            is_dependent: false,
            owner: None,
            crafting_eta: RefCell::new(None),
            goals: RefCell::new(GoalList::default()),
            finished_callback: RefCell::new(None),
            crafting_action: RefCell::new(None),
        }
    }

    /// §4.9 AWAITING_LAUNCH gate: true once `owner_id`'s tagged
    /// inventory can cover every required item.
    pub fn check_inventory(&self, inventory: &TaggedInventory, owner_id: &str) -> bool {
        let required: Vec<(String, u64)> = self.required_items.iter().map(|(item, &n)| (item.clone(), n)).collect();
        inventory.can_satisfy(&required, owner_id)
    }

    /// Runs and clears the finish callback, if any. Called once per
    /// task on the LAUNCHED → FINISHED transition.
    pub fn fire_finished_callback(&self) {
        if let Some(mut cb) = self.finished_callback.borrow_mut().take() {
            cb();
        }
    }

    /// Falls back to the owner's priority, or [`LOWEST_PRIO`] if the
    /// owner has expired, matching the original's owner-fallback rule.
    pub fn effective_priority(&self) -> i64 {
        if self.is_dependent {
            return self.owner.as_ref().and_then(Weak::upgrade).map(|o| o.priority).unwrap_or(LOWEST_PRIO);
        }
        self.priority
    }

    pub fn eventually_runnable(&self) -> bool {
        self.crafting_eta.borrow().is_some()
    }

    pub fn missing_items(&self, available: &Inventory) -> Vec<(String, u64)> {
        self.required_items
            .iter()
            .filter_map(|(item, &need)| {
                let have = available.get(item);
                (have < need).then_some((item.clone(), need - have))
            })
            .collect()
    }
}

impl Located for Rc<Task> {
    fn position(&self) -> Pos {
        self.start_location
    }
}

/// A mineable or container entity the collector phase can draw from.
#[derive(Debug, Clone)]
pub struct Collectible {
    pub position: Pos,
    pub item: String,
    pub available: u64,
    /// The source entity's prototype name, addressed by `MineObject` when
    /// `!is_container`; unused for containers, which address by slot.
    pub entity_prototype: String,
    pub slot: Option<crate::command::InventorySlot>,
    pub is_container: bool,
}

impl Located for Collectible {
    fn position(&self) -> Pos {
        self.position
    }
}

/// Per-player scheduler state.
#[derive(Default)]
pub struct Scheduler {
    pending_tasks: Vec<Rc<Task>>,
    pub crafting_order: Vec<Weak<Task>>,
    pub current_item_allocation: HashMap<TaskId, Inventory>,
    walk_cache: WalkDurationCache,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_task(&mut self, task: Rc<Task>) {
        self.pending_tasks.push(task);
    }

    pub fn tasks_by_priority(&self) -> Vec<Rc<Task>> {
        let mut tasks = self.pending_tasks.clone();
        tasks.sort_by_key(|t| t.effective_priority());
        tasks
    }

    /// §4.8.1: tasks in descending priority claim items already held by
    /// their owner, then draw from the shared unclaimed pool.
    pub fn allocate_items(&mut self, inventory: &TaggedInventory, owner_id: &str) {
        self.current_item_allocation.clear();
        let mut unclaimed = inventory.unclaimed();
        for task in self.tasks_by_priority() {
            let mut allocation = inventory.claimed_by(owner_id);
            for (item, &need) in &task.required_items {
                let already = allocation.get(item);
                if already >= need {
                    continue;
                }
                let still_needed = need - already;
                let take = still_needed.min(unclaimed.get(item));
                if take > 0 {
                    unclaimed.try_subtract(item, take);
                    allocation.add(item.clone(), take);
                }
            }
            self.current_item_allocation.insert(task.id.clone(), allocation);
        }
    }

    /// §4.8.2: the "grocery queue" ordering. Tasks are enqueued by
    /// priority; a newly enqueued task repeatedly tries to skip ahead of
    /// its immediate predecessor while the predecessor can still afford
    /// to grant the skip within its 10%-of-cumulative-remaining budget.
    pub fn compute_crafting_order(&mut self, durations: &HashMap<TaskId, f64>) {
        let mut queue: Vec<(Rc<Task>, f64, f64)> = Vec::new(); // (task, time_granted, max_granted)
        let mut cumulative = 0.0;

        for task in self.tasks_by_priority() {
            let own_duration = durations.get(&task.id).copied().unwrap_or(0.0);
            cumulative += own_duration;
            let max_granted = cumulative / 10.0;
            queue.push((task, 0.0, max_granted));

            let mut i = queue.len() - 1;
            while i > 0 {
                let own_duration = durations.get(&queue[i].0.id).copied().unwrap_or(0.0);
                let (granted, max_granted) = (queue[i - 1].1, queue[i - 1].2);
                if granted + own_duration <= max_granted {
                    queue[i - 1].1 += own_duration;
                    queue.swap(i - 1, i);
                    i -= 1;
                } else {
                    break;
                }
            }
        }

        self.crafting_order = queue.into_iter().map(|(task, _, _)| Rc::downgrade(&task)).collect();
    }

    /// §4.8.4: assembles the next tentative schedule. Tasks already
    /// eventually-runnable (§4.8.1 allocation already covers their
    /// crafting list) are scheduled directly at their crafting ETA;
    /// anything still missing items gets a synthesized collector task
    /// (§4.8.5) in its place. Each insertion is feasibility-checked
    /// (§4.8.4/§8); a rejected insertion is rolled back and the next
    /// pending task is tried instead, mirroring
    /// `Scheduler::calculate_schedule` (examples/original_source/scheduler.cpp:819-892),
    /// including its early return once a task is found to be runnable
    /// within the grace threshold.
    pub fn build_schedule(
        &mut self,
        recipes: &RecipeRegistry,
        inventory: &TaggedInventory,
        owner_id: &str,
        positions: &HashMap<TaskId, Pos>,
        containers: &WorldList<Collectible>,
        mineables: &WorldList<Collectible>,
    ) -> Vec<(ScheduleEntry, Rc<Task>)> {
        self.allocate_items(inventory, owner_id);
        let mut positions = positions.clone();
        let mut schedule: Vec<(ScheduleEntry, Rc<Task>)> = Vec::new();
        let mut walk_cache = std::mem::take(&mut self.walk_cache);

        for pending in self.tasks_by_priority() {
            let allocation = self.current_item_allocation.get(&pending.id).cloned().unwrap_or_default();
            let missing = pending.missing_items(&allocation);
            let origin = positions.get(&pending.id).copied().unwrap_or(pending.start_location);

            let task = if missing.is_empty() {
                pending.clone()
            } else {
                // A collector's budget is bounded by whatever is already
                // ahead of it in the schedule, plus a grace window, mirroring
                // the original's per-collector time limit (scheduler.cpp:845-849).
                let max_duration = schedule.first().map(|(e, _)| e.eta + COLLECTOR_GRACE_SECONDS).unwrap_or(f64::MAX);
                match build_collector_task(TaskId::new(), &pending, &missing, max_duration, origin, containers, mineables) {
                    Some(collector) => collector,
                    None => {
                        *pending.crafting_eta.borrow_mut() = None;
                        continue;
                    }
                }
            };

            let eta = task.crafting_list.borrow().time_remaining(recipes);
            *pending.crafting_eta.borrow_mut() = if missing.is_empty() { Some(eta) } else { None };
            positions.insert(task.id, origin);

            let entry = ScheduleEntry { task_id: task.id, eta, priority: task.effective_priority() };
            let insert_at = schedule.partition_point(|(e, _)| e.eta <= entry.eta);
            schedule.insert(insert_at, (entry, task.clone()));

            let entries: Vec<ScheduleEntry> = schedule.iter().map(|(e, _)| e.clone()).collect();
            let walk_durations = memoize_walk_durations(&entries, &positions, &mut walk_cache);
            if feasibility_check(&entries, &walk_durations, &positions) {
                if eta <= PRIORITY_INVERSION_GRACE_SECONDS {
                    break;
                }
            } else {
                schedule.remove(insert_at);
            }
        }

        self.walk_cache = walk_cache;
        schedule
    }

    /// Convenience over [`Scheduler::build_schedule`] for the per-tick
    /// driver (§4.9): the head of the schedule, if runnable within the
    /// grace threshold, else `None` (mirrors `Scheduler::get_next_task`,
    /// examples/original_source/scheduler.cpp:803-816).
    pub fn next_task(
        &mut self,
        recipes: &RecipeRegistry,
        inventory: &TaggedInventory,
        owner_id: &str,
        containers: &WorldList<Collectible>,
        mineables: &WorldList<Collectible>,
    ) -> Option<Rc<Task>> {
        let schedule = self.build_schedule(recipes, inventory, owner_id, &HashMap::new(), containers, mineables);
        let (entry, task) = schedule.into_iter().next()?;
        (entry.eta <= PRIORITY_INVERSION_GRACE_SECONDS).then_some(task)
    }

    pub fn crafting_order_tasks(&self) -> Vec<Rc<Task>> {
        self.crafting_order.iter().filter_map(Weak::upgrade).collect()
    }

    /// §4.8.3: the next `max_n` `(task, recipe)` pairs executable given
    /// the current allocations.
    pub fn next_crafts(&self, recipes: &RecipeRegistry, max_n: usize) -> Vec<(TaskId, String)> {
        let mut out = Vec::new();
        for task in self.crafting_order_tasks() {
            if out.len() >= max_n {
                break;
            }
            let mut working = self.current_item_allocation.get(&task.id).cloned().unwrap_or_default();
            let list = task.crafting_list.borrow();
            for entry in &list.entries {
                if out.len() >= max_n {
                    break;
                }
                match entry.status {
                    CraftingStatus::Finished => continue,
                    CraftingStatus::Current => {
                        if let Some(recipe) = recipes.get(&entry.recipe) {
                            apply_products_only(&mut working, recipe);
                        }
                        out.push((task.id.clone(), entry.recipe.clone()));
                    }
                    CraftingStatus::Pending => {
                        let Some(recipe) = recipes.get(&entry.recipe) else { continue };
                        if can_afford(&working, recipe) {
                            apply_full_recipe(&mut working, recipe);
                            out.push((task.id.clone(), entry.recipe.clone()));
                        } else {
                            break;
                        }
                    }
                }
            }
        }
        out
    }
}

fn can_afford(inv: &Inventory, recipe: &Recipe) -> bool {
    recipe.inputs.iter().all(|i| inv.get(&i.item) >= i.amount)
}

fn apply_full_recipe(inv: &mut Inventory, recipe: &Recipe) {
    for ingredient in &recipe.inputs {
        inv.try_subtract(&ingredient.item, ingredient.amount);
    }
    apply_products_only(inv, recipe);
}

fn apply_products_only(inv: &mut Inventory, recipe: &Recipe) {
    for product in &recipe.outputs {
        inv.add(product.item.clone(), product.amount.max(0.0) as u64);
    }
}

/// One entry of a tentative schedule: the task and the tick (seconds
/// from now) it is slated to start at.
#[derive(Debug, Clone)]
pub struct ScheduleEntry {
    pub task_id: TaskId,
    pub eta: f64,
    pub priority: i64,
}

/// §4.8.4: inserts a task at its computed ETA, then walks consecutive
/// pairs checking walking delays. If a lower-priority predecessor would
/// delay a higher-priority successor beyond the grace period, the
/// insertion is rejected and the caller should retry without it.
pub fn feasibility_check(schedule: &[ScheduleEntry], walk_durations: &HashMap<(Pos, Pos), f64>, positions: &HashMap<TaskId, Pos>) -> bool {
    for pair in schedule.windows(2) {
        let (prev, next) = (&pair[0], &pair[1]);
        if prev.priority > next.priority {
            let (Some(&from), Some(&to)) = (positions.get(&prev.task_id), positions.get(&next.task_id)) else { continue };
            let walk = walk_durations.get(&(from, to)).copied().unwrap_or(0.0);
            let delay = (prev.eta + walk) - next.eta;
            if delay > PRIORITY_INVERSION_GRACE_SECONDS {
                return false;
            }
        }
    }
    true
}

/// Memoizes `(from, to, radius)` walking durations, used by both
/// feasibility checking and collector-budget admission.
#[derive(Default)]
pub struct WalkDurationCache {
    cache: HashMap<(Pos, Pos, u32), f64>,
}

impl WalkDurationCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_insert(&mut self, from: Pos, to: Pos, radius: f64, compute: impl FnOnce() -> f64) -> f64 {
        let key = (from, to, (radius * 1000.0).round() as u32);
        *self.cache.entry(key).or_insert_with(compute)
    }
}

/// Builds the `(from, to) -> seconds` map [`feasibility_check`] needs
/// from a candidate schedule's consecutive task positions, memoizing
/// the straight-line approximation (no player collision radius is
/// tracked at this granularity, so `radius` is always 0) in `cache`.
fn memoize_walk_durations(schedule: &[ScheduleEntry], positions: &HashMap<TaskId, Pos>, cache: &mut WalkDurationCache) -> HashMap<(Pos, Pos), f64> {
    let mut out = HashMap::new();
    for pair in schedule.windows(2) {
        let (Some(&from), Some(&to)) = (positions.get(&pair[0].task_id), positions.get(&pair[1].task_id)) else { continue };
        let duration = cache.get_or_insert(from, to, 0.0, || from.to_f().distance_to(to.to_f()) / crate::action::WALKING_SPEED);
        out.insert((from, to), duration);
    }
    out
}

/// §4.8.5: builds a dependent collector task that walks to containers
/// then mineables to gather `original`'s missing items within
/// `max_duration` seconds.
pub fn build_collector_task(
    next_id: TaskId,
    original: &Rc<Task>,
    missing: &[(String, u64)],
    max_duration: f64,
    origin: Pos,
    containers: &WorldList<Collectible>,
    mineables: &WorldList<Collectible>,
) -> Option<Rc<Task>> {
    let mut still_missing: HashMap<String, u64> = missing.iter().cloned().collect();
    let mut actions = Vec::new();
    let mut budget_used = 0.0;
    let mut end_location = origin;

    for source in [containers, mineables] {
        if still_missing.is_empty() {
            break;
        }
        for candidate in source.around(origin.to_f()) {
            if still_missing.is_empty() || budget_used >= max_duration {
                break;
            }
            let Some(&need) = still_missing.get(&candidate.item) else { continue };
            let travel = end_location.to_f().distance_to(candidate.position.to_f()) / crate::action::WALKING_SPEED;
            if budget_used + travel > max_duration {
                continue;
            }
            let take = need.min(candidate.available);
            if take == 0 {
                continue;
            }
            actions.push(PrimitiveAction::walk_waypoints(vec![candidate.position]));
            if candidate.is_container {
                let Some(slot) = candidate.slot else { continue };
                actions.push(PrimitiveAction::take_from_inventory(candidate.item.clone(), take, candidate.position, slot));
            } else {
                actions.push(PrimitiveAction::mine_object(candidate.entity_prototype.clone(), candidate.position, Some((candidate.item.clone(), take as f64))));
            }
            budget_used += travel;
            end_location = candidate.position;
            let remaining = need - take;
            if remaining == 0 {
                still_missing.remove(&candidate.item);
            } else {
                still_missing.insert(candidate.item.clone(), remaining);
            }
        }
    }

    if actions.is_empty() {
        return None;
    }

    let mut task = Task::new(next_id, format!("collect-for-{}", original.name), original.priority);
    task.is_dependent = true;
    task.owner = Some(Rc::downgrade(original));
    task.end_location = end_location;
    task.start_location = origin;
    *task.actions.borrow_mut() = CompoundAction::new(actions);
    Some(Rc::new(task))
}
