//! Mine layout planner: given a resource patch and machine footprints,
//! produce a grid of miners feeding a snaking belt that satisfies a
//! per-belt-side capacity bound.

use crate::geometry::{Area, Direction, Pos};
use crate::resource_patch::ResourcePatchData;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlannedLevel {
    Ground,
    Belt,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlannedEntity {
    pub level: PlannedLevel,
    pub position: Pos,
    pub prototype: String,
    pub direction: Direction,
}

#[derive(Debug, Clone, Copy)]
pub struct MachineFootprint {
    /// Footprint width/height, belt-horizontal orientation.
    pub outer: (i32, i32),
}

#[derive(Debug, Clone, Copy)]
pub struct MinePlanRequest {
    pub outer: MachineFootprint,
    pub side_max: u32,
    pub destination: Pos,
    pub miner_prototype: &'static str,
    pub belt_prototype: &'static str,
}

struct Row {
    y: i32,
    machine_xs: Vec<i32>,
}

/// Greedily covers the row's ore projection with intervals of length
/// `outer_x`, shifting the final interval inward if it would overhang.
fn place_row_machines(grid_min_x: i32, grid_max_x: i32, ore_columns: &[bool], outer_x: i32) -> Vec<i32> {
    let mut placements = Vec::new();
    let mut x = grid_min_x;
    while x < grid_max_x {
        let col_has_ore = (x..(x + outer_x).min(grid_max_x)).any(|c| {
            let idx = (c - grid_min_x) as usize;
            ore_columns.get(idx).copied().unwrap_or(false)
        });
        if col_has_ore {
            let mut start = x;
            if start + outer_x > grid_max_x {
                start = grid_max_x - outer_x;
            }
            placements.push(start);
            x = start + outer_x;
        } else {
            x += outer_x;
        }
    }
    placements.dedup();
    placements
}

fn build_rows(patch: &ResourcePatchData, bbox: Area, outer_x: i32, outer_y: i32, y_start: i32) -> Vec<Row> {
    let ore: std::collections::HashSet<Pos> = patch.positions.iter().copied().collect();
    let mut rows = Vec::new();
    let mut y = bbox.left_top.y + y_start;
    while y < bbox.right_bottom.y {
        let width = (bbox.width()).max(1) as usize;
        let mut ore_columns = vec![false; width];
        for dy in 0..outer_y {
            let row_y = y + dy;
            for (i, col) in ore_columns.iter_mut().enumerate() {
                let x = bbox.left_top.x + i as i32;
                if ore.contains(&Pos::new(x, row_y)) {
                    *col = true;
                }
            }
        }
        let machine_xs = place_row_machines(bbox.left_top.x, bbox.right_bottom.x, &ore_columns, outer_x);
        if !machine_xs.is_empty() {
            rows.push(Row { y, machine_xs });
        }
        y += outer_y;
    }
    rows
}

/// Splits `rows` into belt groups bounded by `side_max` miners per side,
/// trying both starting parities and keeping whichever yields fewer
/// groups.
fn split_into_groups(rows: &[Row], side_max: u32) -> Vec<Vec<usize>> {
    let group_by_parity = |skip_first: bool| -> Vec<Vec<usize>> {
        let mut groups = Vec::new();
        let mut current = Vec::new();
        let mut count = 0u32;
        for (i, row) in rows.iter().enumerate() {
            if skip_first && i == 0 && rows.len() > 1 {
                // try an offset grouping boundary
            }
            if count + (row.machine_xs.len() as u32) > side_max && !current.is_empty() {
                groups.push(std::mem::take(&mut current));
                count = 0;
            }
            count += row.machine_xs.len() as u32;
            current.push(i);
        }
        if !current.is_empty() {
            groups.push(current);
        }
        groups
    };

    let a = group_by_parity(false);
    let b = group_by_parity(true);
    if b.len() < a.len() {
        b
    } else {
        a
    }
}

/// Cost of a full plan: `Σbelts + 8·Σmachines`.
fn plan_cost(machines: usize, belts: usize) -> usize {
    belts + 8 * machines
}

fn belt_column_for_group(rows: &[Row], group: &[usize]) -> i32 {
    let xs: Vec<i32> = group.iter().flat_map(|&i| rows[i].machine_xs.iter().copied()).collect();
    if xs.is_empty() {
        return 0;
    }
    xs.iter().sum::<i32>() / xs.len() as i32
}

fn lay_group(rows: &[Row], group: &[usize], belt_x: i32, miner_prototype: &str, belt_prototype: &str, flow_south: bool) -> Vec<PlannedEntity> {
    let mut out = Vec::new();
    for &i in group {
        let row = &rows[i];
        for &mx in &row.machine_xs {
            out.push(PlannedEntity {
                level: PlannedLevel::Ground,
                position: Pos::new(mx, row.y),
                prototype: miner_prototype.to_string(),
                direction: if flow_south { Direction::South } else { Direction::North },
            });
        }
    }
    let (min_y, max_y) = (
        group.iter().map(|&i| rows[i].y).min().unwrap_or(0),
        group.iter().map(|&i| rows[i].y).max().unwrap_or(0),
    );
    let dir = if flow_south { Direction::South } else { Direction::North };
    let mut y = min_y;
    while y <= max_y {
        out.push(PlannedEntity { level: PlannedLevel::Belt, position: Pos::new(belt_x, y), prototype: belt_prototype.to_string(), direction: dir });
        y += 1;
    }
    out
}

/// Full plan output: the chosen rotation's entities plus its cost.
pub struct MinePlan {
    pub entities: Vec<PlannedEntity>,
    pub cost: usize,
}

pub fn plan_mine(patch: &ResourcePatchData, req: &MinePlanRequest) -> MinePlan {
    let bbox = patch.bounding_box();
    let (outer_x, outer_y) = req.outer.outer;

    let mut best: Option<MinePlan> = None;
    for &rotated in &[false, true] {
        let (ox, oy) = if rotated { (outer_y, outer_x) } else { (outer_x, outer_y) };
        for y_start in -(oy - 1)..=0 {
            let rows = build_rows(patch, bbox, ox, oy, y_start);
            if rows.is_empty() {
                continue;
            }
            let groups = split_into_groups(&rows, req.side_max);
            let dest_row_y = req
                .destination
                .y
                .clamp(rows.first().map(|r| r.y).unwrap_or(0), rows.last().map(|r| r.y).unwrap_or(0));
            let dest_group = groups
                .iter()
                .enumerate()
                .min_by_key(|(_, g)| g.iter().map(|&i| (rows[i].y - dest_row_y).abs()).min().unwrap_or(i32::MAX))
                .map(|(idx, _)| idx)
                .unwrap_or(0);

            let mut entities = Vec::new();
            let mut total_machines = 0usize;
            let mut total_belts = 0usize;
            let flows_south_from_dest = req.destination.y >= rows.get(0).map(|r| r.y).unwrap_or(0);
            for (gi, group) in groups.iter().enumerate() {
                let belt_x = belt_column_for_group(&rows, group);
                let flow_south = if gi <= dest_group { flows_south_from_dest } else { !flows_south_from_dest };
                let laid = lay_group(&rows, group, belt_x, req.miner_prototype, req.belt_prototype, flow_south);
                total_machines += group.iter().map(|&i| rows[i].machine_xs.len()).sum::<usize>();
                total_belts += laid.iter().filter(|e| e.level == PlannedLevel::Belt).count();
                entities.extend(laid);
            }

            let cost = plan_cost(total_machines, total_belts);
            if best.as_ref().map(|b| cost < b.cost).unwrap_or(true) {
                best = Some(MinePlan { entities, cost });
            }
        }
    }
    best.unwrap_or(MinePlan { entities: Vec::new(), cost: 0 })
}

/// What an early-game drill's output feeds into, across the table the
/// name of the partner prototype it's paired with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EarlyGamePartner {
    Chest,
    Furnace,
    OppositeDrill,
}

#[derive(Debug, Clone, Copy)]
pub struct EarlyGameMinePlanRequest {
    pub outer: MachineFootprint,
    /// Radius of the kernel the patch is dilated by, i.e. how far a
    /// drill's mining area reaches past the tile it stands on.
    pub mining_radius: i32,
    pub miner_prototype: &'static str,
    pub partner: EarlyGamePartner,
    /// Ignored for [`EarlyGamePartner::OppositeDrill`], which pairs a
    /// drill with another drill of `miner_prototype`.
    pub partner_prototype: &'static str,
}

/// Every tile within `radius` (Chebyshev distance) of an ore tile, i.e.
/// the set of tiles a drill standing there could mine from.
fn dilate(patch: &ResourcePatchData, radius: i32) -> std::collections::HashSet<Pos> {
    let mut out = std::collections::HashSet::new();
    for &p in &patch.positions {
        for dy in -radius..=radius {
            for dx in -radius..=radius {
                out.insert(Pos::new(p.x + dx, p.y + dy));
            }
        }
    }
    out
}

/// §4.7's early-game variant: bypasses the belt-snaking logic entirely
/// and lays drill/partner pairs along rows found by dilating the patch
/// with the mining-area kernel, dropping rows whose machine count falls
/// below half the densest row's (thin fringes of the patch aren't worth
/// a dedicated row).
pub fn plan_early_game_mine(patch: &ResourcePatchData, req: &EarlyGameMinePlanRequest) -> MinePlan {
    let bbox = patch.bounding_box();
    let (outer_x, outer_y) = req.outer.outer;
    let dilated = dilate(patch, req.mining_radius);
    let width = bbox.width().max(1) as usize;

    let mut rows: Vec<(i32, Vec<i32>)> = Vec::new();
    let mut y = bbox.left_top.y;
    while y < bbox.right_bottom.y {
        let mut ore_columns = vec![false; width];
        for dy in 0..outer_y {
            let row_y = y + dy;
            for (i, col) in ore_columns.iter_mut().enumerate() {
                let x = bbox.left_top.x + i as i32;
                if dilated.contains(&Pos::new(x, row_y)) {
                    *col = true;
                }
            }
        }
        rows.push((y, place_row_machines(bbox.left_top.x, bbox.right_bottom.x, &ore_columns, outer_x)));
        y += outer_y;
    }

    let densest = rows.iter().map(|(_, xs)| xs.len()).max().unwrap_or(0);
    let threshold = ((densest as f64) * 0.5).ceil() as usize;

    let mut entities = Vec::new();
    for (row_y, machine_xs) in rows {
        if machine_xs.len() < threshold.max(1) {
            continue;
        }
        for mx in machine_xs {
            entities.push(PlannedEntity { level: PlannedLevel::Ground, position: Pos::new(mx, row_y), prototype: req.miner_prototype.to_string(), direction: Direction::South });
            let partner_pos = Pos::new(mx, row_y + outer_y.max(1));
            let (partner_prototype, partner_direction) = match req.partner {
                EarlyGamePartner::OppositeDrill => (req.miner_prototype, Direction::North),
                EarlyGamePartner::Chest | EarlyGamePartner::Furnace => (req.partner_prototype, Direction::North),
            };
            entities.push(PlannedEntity { level: PlannedLevel::Ground, position: partner_pos, prototype: partner_prototype.to_string(), direction: partner_direction });
        }
    }

    let machines = entities.len();
    MinePlan { entities, cost: plan_cost(machines, 0) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource_patch::PatchId;

    fn vertical_strip_patch() -> ResourcePatchData {
        let mut positions = Vec::new();
        for y in 0..10 {
            for x in 0..3 {
                positions.push(Pos::new(x, y));
            }
        }
        ResourcePatchData::new(PatchId(0), "iron-ore", positions)
    }

    #[test]
    fn belt_planner_handles_3_by_10_strip() {
        let patch = vertical_strip_patch();
        let req = MinePlanRequest {
            outer: MachineFootprint { outer: (3, 3) },
            side_max: 4,
            destination: Pos::new(1, -5),
            miner_prototype: "electric-mining-drill",
            belt_prototype: "transport-belt",
        };
        let plan = plan_mine(&patch, &req);
        assert!(!plan.entities.is_empty());
        let miners = plan.entities.iter().filter(|e| e.level == PlannedLevel::Ground).count();
        assert!(miners > 0 && miners <= 10);
        let belts = plan.entities.iter().filter(|e| e.level == PlannedLevel::Belt).count();
        assert!(belts > 0);
    }

    #[test]
    fn cost_function_weighs_machines_eight_times_belts() {
        assert_eq!(plan_cost(1, 0), 8);
        assert_eq!(plan_cost(0, 1), 1);
    }

    #[test]
    fn early_game_pairs_drills_with_a_chest_and_skips_belts() {
        let patch = vertical_strip_patch();
        let req = EarlyGameMinePlanRequest {
            outer: MachineFootprint { outer: (3, 3) },
            mining_radius: 1,
            miner_prototype: "burner-mining-drill",
            partner: EarlyGamePartner::Chest,
            partner_prototype: "wooden-chest",
        };
        let plan = plan_early_game_mine(&patch, &req);
        assert!(!plan.entities.is_empty());
        assert!(plan.entities.iter().all(|e| e.level == PlannedLevel::Ground), "early-game variant lays no belts");
        assert!(plan.entities.iter().any(|e| e.prototype == "wooden-chest"));
        assert!(plan.entities.iter().any(|e| e.prototype == "burner-mining-drill"));
    }

    #[test]
    fn early_game_opposite_drill_pairs_two_drills() {
        let patch = vertical_strip_patch();
        let req = EarlyGameMinePlanRequest {
            outer: MachineFootprint { outer: (3, 3) },
            mining_radius: 1,
            miner_prototype: "electric-mining-drill",
            partner: EarlyGamePartner::OppositeDrill,
            partner_prototype: "",
        };
        let plan = plan_early_game_mine(&patch, &req);
        assert!(plan.entities.iter().all(|e| e.prototype == "electric-mining-drill"));
        assert_eq!(plan.entities.iter().filter(|e| e.direction == Direction::North).count(), plan.entities.iter().filter(|e| e.direction == Direction::South).count());
    }

    #[test]
    fn early_game_drops_rows_thinner_than_half_the_densest() {
        // A dense 5-wide block on top of a single stray ore tile far below:
        // the lone row should be dropped as a thin fringe.
        let mut positions = Vec::new();
        for y in 0..3 {
            for x in 0..5 {
                positions.push(Pos::new(x, y));
            }
        }
        positions.push(Pos::new(0, 20));
        let patch = ResourcePatchData::new(PatchId(0), "iron-ore", positions);
        let req = EarlyGameMinePlanRequest {
            outer: MachineFootprint { outer: (1, 1) },
            mining_radius: 0,
            miner_prototype: "burner-mining-drill",
            partner: EarlyGamePartner::Furnace,
            partner_prototype: "stone-furnace",
        };
        let plan = plan_early_game_mine(&patch, &req);
        assert!(!plan.entities.iter().any(|e| e.position.y == 20 || e.position.y == 21));
    }
}
