//! Spatially indexed collection of `T` values bucketed by the chunk of
//! their position, supporting range queries and expanding-ring nearest
//! searches.
//!
//! Per the reimplementation notes, iterators here hand back owned
//! snapshots rather than lazy views: callers (collector synthesis, the
//! mine planner) routinely want to mutate the list while iterating a
//! previous result, which is exactly the hazard the original C++
//! iterator machinery had to work around with careful invalidation
//! rules. A snapshot sidesteps the whole problem.

use crate::geometry::{Area, Pos, PosF};
use std::collections::HashMap;

/// Something that can be stored in a [`WorldList`].
pub trait Located {
    fn position(&self) -> Pos;
}

/// Chunk diagonal threshold above which an `around` ring query collapses
/// the four-rectangle "ring minus hole" shape into a single rectangle,
/// ported from the original implementation's `inner_len > 32` check.
const RING_SPLIT_THRESHOLD: f64 = 32.0;

#[derive(Debug, Clone, Default)]
pub struct WorldList<T> {
    chunks: HashMap<Pos, Vec<T>>,
}

impl<T: Located + Clone> WorldList<T> {
    pub fn new() -> Self {
        Self { chunks: HashMap::new() }
    }

    pub fn insert(&mut self, item: T) {
        let chunk = item.position().chunk();
        self.chunks.entry(chunk).or_default().push(item);
    }

    pub fn insert_all(&mut self, items: impl IntoIterator<Item = T>) {
        for item in items {
            self.insert(item);
        }
    }

    pub fn len(&self) -> usize {
        self.chunks.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Removes the first item matching `pred` from the chunk containing
    /// `pos`, using swap-remove (O(1), order not preserved within the
    /// chunk's bucket).
    pub fn remove_where(&mut self, pos: Pos, pred: impl Fn(&T) -> bool) -> Option<T> {
        let bucket = self.chunks.get_mut(&pos.chunk())?;
        let idx = bucket.iter().position(pred)?;
        Some(bucket.swap_remove(idx))
    }

    pub fn retain(&mut self, mut pred: impl FnMut(&T) -> bool) {
        for bucket in self.chunks.values_mut() {
            bucket.retain(|item| pred(item));
        }
        self.chunks.retain(|_, v| !v.is_empty());
    }

    /// All items whose position lies inside `area`, in unspecified order.
    pub fn range(&self, area: Area) -> Vec<T> {
        let lt = area.left_top.chunk();
        let rb = area.right_bottom.chunk_ceil();
        let mut out = Vec::new();
        for cy in lt.y..=rb.y {
            for cx in lt.x..=rb.x {
                if let Some(bucket) = self.chunks.get(&Pos::new(cx, cy)) {
                    out.extend(bucket.iter().filter(|item| area.contains(item.position())).cloned());
                }
            }
        }
        out
    }

    /// Items in non-decreasing distance from `center`, computed via
    /// expanding-ring search (initial step 32, ring = `[inner, outer)`).
    /// Finite iff the list is finite.
    pub fn around(&self, center: PosF) -> Vec<T> {
        let mut out = Vec::new();
        let mut seen = 0usize;
        let total = self.len();
        let mut inner = 0.0_f64;
        let mut outer = 32.0_f64;
        while seen < total {
            let ring = self.ring(center, inner, outer);
            seen += ring.len();
            out.extend(ring);
            inner = outer;
            outer *= 2.0;
        }
        out
    }

    fn ring(&self, center: PosF, inner: f64, outer: f64) -> Vec<T> {
        let outer_area = Area::new(
            Pos::new((center.x - outer).floor() as i32, (center.y - outer).floor() as i32),
            Pos::new((center.x + outer).ceil() as i32, (center.y + outer).ceil() as i32),
        );
        let candidates = if inner > RING_SPLIT_THRESHOLD {
            let inner_len = inner / std::f64::consts::SQRT_2;
            let inner_area = Area::new(
                Pos::new((center.x - inner_len).floor() as i32, (center.y - inner_len).floor() as i32),
                Pos::new((center.x + inner_len).ceil() as i32, (center.y + inner_len).ceil() as i32),
            );
            let mut v = Vec::new();
            v.extend(self.range(Area::new(outer_area.left_top, Pos::new(outer_area.right_bottom.x, inner_area.left_top.y))));
            v.extend(self.range(Area::new(
                Pos::new(outer_area.left_top.x, inner_area.left_top.y),
                Pos::new(inner_area.left_top.x, inner_area.right_bottom.y),
            )));
            v.extend(self.range(Area::new(
                Pos::new(inner_area.right_bottom.x, inner_area.left_top.y),
                Pos::new(outer_area.right_bottom.x, inner_area.right_bottom.y),
            )));
            v.extend(self.range(Area::new(Pos::new(outer_area.left_top.x, inner_area.right_bottom.y), outer_area.right_bottom)));
            v
        } else {
            self.range(outer_area)
        };

        let mut with_dist: Vec<(f64, T)> = candidates
            .into_iter()
            .filter_map(|item| {
                let d = item.position().to_f().distance_to(center);
                if d >= inner && d < outer {
                    Some((d, item))
                } else {
                    None
                }
            })
            .collect();
        with_dist.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap());
        with_dist.into_iter().map(|(_, item)| item).collect()
    }

    /// Looks up an item equal-by-predicate inside the chunk of `pos`,
    /// mirroring the original's chunk-scoped `mostly_equal` lookup.
    pub fn search_or_none(&self, pos: Pos, pred: impl Fn(&T) -> bool) -> Option<&T> {
        self.chunks.get(&pos.chunk())?.iter().find(|item| pred(item))
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.chunks.values().flatten()
    }
}
