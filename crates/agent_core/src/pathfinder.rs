//! A\* pathfinding over a tile grid with per-tile directional margins
//! modeling how far a non-point agent can poke into a tile before
//! hitting a collision box.
//!
//! Admissibility is intentionally relaxed (heuristic multiplied by
//! [`OVERESTIMATE`]) in exchange for speed, matching the reference
//! planner: returned paths may be up to that factor worse than optimal.

use crate::geometry::{Area, Direction, Pos, PosF};
use crate::worldmap::WorldMap;
use lru::LruCache;
use pathfinding::prelude::astar;
use std::num::NonZeroUsize;

pub const OVERESTIMATE: f64 = 1.1;

/// Per-tile walkability + margin record. Margins are in `[0.0, 1.0]` and
/// say how far from each side an agent may enter before its collision
/// box would overlap an obstacle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WalkTile {
    pub known: bool,
    pub can_walk: bool,
    pub margin_north: f32,
    pub margin_east: f32,
    pub margin_south: f32,
    pub margin_west: f32,
}

impl Default for WalkTile {
    fn default() -> Self {
        Self { known: false, can_walk: false, margin_north: 1.0, margin_east: 1.0, margin_south: 1.0, margin_west: 1.0 }
    }
}

impl WalkTile {
    fn margin(&self, dir: Direction) -> f32 {
        match dir {
            Direction::North => self.margin_north,
            Direction::East => self.margin_east,
            Direction::South => self.margin_south,
            Direction::West => self.margin_west,
        }
    }
}

pub type WalkMap = WorldMap<WalkTile>;

#[derive(Debug, Clone, Copy)]
pub struct PathRequest {
    pub start: Pos,
    pub end: PosF,
    /// Outer radius of the goal disc. Default 1.0.
    pub allowed_distance: f64,
    /// Inner radius of the goal disc. Default 0.0.
    pub min_distance: f64,
    /// Early-exit bound on path length; `None` means unbounded.
    pub length_limit: Option<f64>,
    /// Agent width, `<= 1.0`.
    pub size: f64,
}

impl PathRequest {
    pub fn new(start: Pos, end: PosF) -> Self {
        Self { start, end, allowed_distance: 1.0, min_distance: 0.0, length_limit: None, size: 1.0 }
    }
}

pub type PathResult = Vec<Pos>;

/// `ceil(min_distance) >= allowed_distance` makes the goal disc empty;
/// no pathfinder call can succeed.
fn request_is_unsatisfiable(req: &PathRequest) -> bool {
    req.min_distance.ceil() >= req.allowed_distance
}

fn in_goal_disc(p: Pos, req: &PathRequest) -> bool {
    let d = p.to_f().distance_to(req.end);
    d >= req.min_distance && d <= req.allowed_distance
}

fn can_enter(from_tile: WalkTile, to_tile: WalkTile, dir: Direction, half_width: f32) -> bool {
    if !from_tile.can_walk || !to_tile.can_walk {
        return false;
    }
    let opposite = Direction::from_index((dir.index() + 2) % 4);
    from_tile.margin(dir) >= half_width && to_tile.margin(opposite) >= half_width
}

fn neighbors(map: &WalkMap, p: Pos, size: f64) -> Vec<(Pos, f64)> {
    let half_width = (size / 2.0) as f32;
    let here = map.get(p);
    if !here.can_walk {
        return Vec::new();
    }
    let mut out = Vec::new();
    let axis = [
        (Direction::North, Pos::new(p.x, p.y - 1)),
        (Direction::East, Pos::new(p.x + 1, p.y)),
        (Direction::South, Pos::new(p.x, p.y + 1)),
        (Direction::West, Pos::new(p.x - 1, p.y)),
    ];
    let mut axis_walkable = [false; 4];
    for (i, (dir, np)) in axis.iter().enumerate() {
        let nt = map.get(*np);
        if can_enter(here, nt, *dir, half_width) {
            out.push((*np, 1.0));
            axis_walkable[i] = true;
        }
    }
    let diagonals = [
        (Pos::new(p.x + 1, p.y - 1), 0usize, 1usize),
        (Pos::new(p.x + 1, p.y + 1), 1usize, 2usize),
        (Pos::new(p.x - 1, p.y + 1), 2usize, 3usize),
        (Pos::new(p.x - 1, p.y - 1), 3usize, 0usize),
    ];
    for (np, a, b) in diagonals {
        let nt = map.get(np);
        if !nt.can_walk {
            continue;
        }
        let corner_ok = here.margin_north.min(here.margin_east).min(here.margin_south).min(here.margin_west) >= half_width
            && nt.margin_north.min(nt.margin_east).min(nt.margin_south).min(nt.margin_west) >= half_width;
        if corner_ok && (axis_walkable[a] || axis_walkable[b]) {
            out.push((np, std::f64::consts::SQRT_2));
        }
    }
    out
}

/// Drops intermediate waypoints whose direction from the previous point
/// is unchanged, collapsing straight runs into their endpoints.
pub fn simplify_path(path: &[Pos]) -> Vec<Pos> {
    if path.len() < 3 {
        return path.to_vec();
    }
    let mut out = vec![path[0]];
    let mut prev_dir = path[1] - path[0];
    for window in path.windows(2).skip(1) {
        let dir = window[1] - window[0];
        if dir != prev_dir {
            out.push(window[0]);
            prev_dir = dir;
        }
    }
    out.push(*path.last().unwrap());
    out
}

/// Runs A\* for a single request. Returns an empty path iff no path
/// satisfying the bounds exists, `length_limit` is exceeded, or the
/// request's goal disc is degenerate.
pub fn find_path(map: &WalkMap, req: &PathRequest) -> PathResult {
    if request_is_unsatisfiable(req) {
        return Vec::new();
    }
    if req.start.to_f().distance_to(req.end) <= req.allowed_distance
        && req.start.to_f().distance_to(req.end) >= req.min_distance
    {
        return vec![req.start];
    }

    let length_limit = req.length_limit;
    // `pathfinding::astar` wants an integer-like `Ord + Zero` cost; scale
    // Euclidean distances by a fixed factor rather than pull in a
    // dedicated ordered-float wrapper for floating-point edge weights.
    const SCALE: f64 = 1000.0;
    let to_fixed = |v: f64| (v * SCALE).round() as i64;

    let result = astar(
        &req.start,
        |&p| neighbors(map, p, req.size).into_iter().map(move |(np, cost)| (np, to_fixed(cost))),
        |&p| to_fixed(p.to_f().distance_to(req.end) * OVERESTIMATE),
        |&p| in_goal_disc(p, req),
    );

    match result {
        Some((path, cost)) => {
            if let Some(limit) = length_limit {
                if cost as f64 > to_fixed(limit) as f64 * OVERESTIMATE {
                    return Vec::new();
                }
            }
            simplify_path(&path)
        }
        None => Vec::new(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    start: Pos,
    end: (i64, i64),
    allowed_distance_milli: i64,
}

fn quantize(v: f64) -> i64 {
    (v * 1000.0).round() as i64
}

/// Caches recent path queries so repeated scheduler feasibility checks
/// (§4.8.4's memoized walking durations) don't re-run A\* every time.
pub struct PathCache {
    cache: LruCache<CacheKey, PathResult>,
    hits: u64,
    misses: u64,
}

impl PathCache {
    pub fn new(capacity: usize) -> Self {
        Self { cache: LruCache::new(NonZeroUsize::new(capacity.max(1)).unwrap()), hits: 0, misses: 0 }
    }

    pub fn get_or_compute(&mut self, map: &WalkMap, req: &PathRequest) -> PathResult {
        let key = CacheKey {
            start: req.start,
            end: (quantize(req.end.x), quantize(req.end.y)),
            allowed_distance_milli: quantize(req.allowed_distance),
        };
        if let Some(cached) = self.cache.get(&key) {
            self.hits += 1;
            return cached.clone();
        }
        self.misses += 1;
        let result = find_path(map, req);
        self.cache.put(key, result.clone());
        result
    }

    pub fn stats(&self) -> (u64, u64) {
        (self.hits, self.misses)
    }

    pub fn reset_stats(&mut self) {
        self.hits = 0;
        self.misses = 0;
    }
}

/// Marks every tile in `area` as known/walkable per `is_walkable`, for
/// tests and for the ingestor's chunk application.
pub fn fill_open_area(map: &mut WalkMap, area: Area) {
    for y in area.left_top.y..area.right_bottom.y {
        for x in area.left_top.x..area.right_bottom.x {
            map.set(Pos::new(x, y), WalkTile { known: true, can_walk: true, ..Default::default() });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_map(area: Area) -> WalkMap {
        let mut map = WalkMap::new();
        fill_open_area(&mut map, area);
        map
    }

    #[test]
    fn start_equals_end_with_zero_allowed_distance_returns_singleton() {
        let map = open_map(Area::new(Pos::new(-5, -5), Pos::new(5, 5)));
        let mut req = PathRequest::new(Pos::new(0, 0), PosF::new(0.0, 0.0));
        req.allowed_distance = 0.0;
        let path = find_path(&map, &req);
        assert_eq!(path, vec![Pos::new(0, 0)]);
    }

    #[test]
    fn length_limit_smaller_than_distance_returns_empty() {
        let map = open_map(Area::new(Pos::new(-20, -20), Pos::new(20, 20)));
        let mut req = PathRequest::new(Pos::new(0, 0), PosF::new(10.0, 0.0));
        req.length_limit = Some(1.0);
        assert!(find_path(&map, &req).is_empty());
    }

    #[test]
    fn unsatisfiable_goal_disc_fails() {
        let map = open_map(Area::new(Pos::new(-5, -5), Pos::new(5, 5)));
        let mut req = PathRequest::new(Pos::new(0, 0), PosF::new(3.0, 0.0));
        req.min_distance = 2.0;
        req.allowed_distance = 1.0;
        assert!(find_path(&map, &req).is_empty());
    }

    #[test]
    fn finds_a_straight_path_across_open_ground() {
        let map = open_map(Area::new(Pos::new(-5, -5), Pos::new(10, 10)));
        let req = PathRequest::new(Pos::new(0, 0), PosF::new(5.0, 0.0));
        let path = find_path(&map, &req);
        assert!(!path.is_empty());
        assert_eq!(*path.first().unwrap(), Pos::new(0, 0));
    }

    #[test]
    fn walled_off_goal_returns_empty() {
        let mut map = open_map(Area::new(Pos::new(-5, -5), Pos::new(10, 10)));
        for y in -5..10 {
            map.set(Pos::new(3, y), WalkTile { known: true, can_walk: false, ..Default::default() });
        }
        let req = PathRequest::new(Pos::new(0, 0), PosF::new(5.0, 0.0));
        assert!(find_path(&map, &req).is_empty());
    }

    #[test]
    fn simplify_path_is_idempotent() {
        let path = vec![Pos::new(0, 0), Pos::new(1, 0), Pos::new(2, 0), Pos::new(2, 1), Pos::new(2, 2)];
        let once = simplify_path(&path);
        let twice = simplify_path(&once);
        assert_eq!(once, twice);
    }
}
