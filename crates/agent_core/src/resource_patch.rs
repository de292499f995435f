//! Per-tile resource records and flood-filled resource patches.
//!
//! A patch holds no back-link to the tiles that reference it; each tile
//! instead holds a weak link to its patch. Both directions must be kept
//! consistent by the ingestor (§8 invariant 1): patches never outlive the
//! last position they contain.

use crate::geometry::{Area, Pos};
use std::cell::RefCell;
use std::collections::{HashMap, HashSet, VecDeque};
use std::rc::{Rc, Weak};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PatchId(pub u64);

/// Step radius used when flood-filling a patch of this kind, per §4.4.
fn step_radius(kind: &str) -> i32 {
    match kind {
        "oil" => 30,
        "ocean" => 1,
        _ => 5,
    }
}

#[derive(Debug, Clone)]
pub struct ResourcePatchData {
    pub id: PatchId,
    pub kind: String,
    pub positions: Vec<Pos>,
    bbox: Area,
}

impl ResourcePatchData {
    pub fn new(id: PatchId, kind: impl Into<String>, positions: Vec<Pos>) -> Self {
        let bbox = Area::bounding(&positions);
        Self { id, kind: kind.into(), positions, bbox }
    }

    pub fn size(&self) -> usize {
        self.positions.len()
    }

    pub fn bounding_box(&self) -> Area {
        self.bbox
    }

    fn recompute_bbox(&mut self) {
        self.bbox = Area::bounding(&self.positions);
    }
}

pub type PatchHandle = Rc<RefCell<ResourcePatchData>>;

/// Per-tile resource record: kind, owning patch id, and a weak link to
/// the patch itself so the tile survives the patch's removal gracefully.
#[derive(Debug, Clone)]
pub struct ResourceTile {
    pub kind: String,
    pub patch_id: PatchId,
    pub patch: Weak<RefCell<ResourcePatchData>>,
}

/// Owns every live patch and the `position -> ResourceTile` layer,
/// implementing the flood-fill/merge/delete rules of §4.4.
#[derive(Debug, Default)]
pub struct ResourceLayer {
    tiles: HashMap<Pos, ResourceTile>,
    patches: HashMap<PatchId, PatchHandle>,
    next_id: u64,
}

impl ResourceLayer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tile_at(&self, p: Pos) -> Option<&ResourceTile> {
        self.tiles.get(&p)
    }

    pub fn patch(&self, id: PatchId) -> Option<&PatchHandle> {
        self.patches.get(&id)
    }

    fn alloc_id(&mut self) -> PatchId {
        let id = PatchId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Sets the resource kind at `p`. `NONE` (empty string) removes the
    /// tile from its patch, deleting the patch if it becomes empty.
    /// Any other kind triggers a flood-fill when `p` has no patch yet.
    pub fn set_kind(&mut self, p: Pos, kind: &str) {
        if kind.is_empty() {
            self.clear_tile(p);
            return;
        }
        if self.tiles.contains_key(&p) {
            return;
        }
        self.flood_fill(p, kind);
    }

    fn clear_tile(&mut self, p: Pos) {
        let Some(tile) = self.tiles.remove(&p) else { return };
        if let Some(patch) = tile.patch.upgrade() {
            let mut data = patch.borrow_mut();
            data.positions.retain(|&pos| pos != p);
            if data.positions.is_empty() {
                drop(data);
                self.patches.remove(&tile.patch_id);
            } else {
                data.recompute_bbox();
            }
        }
    }

    /// Flood-fills from `p`, merging any same-kind neighboring patches
    /// found during the walk into the single largest one encountered.
    fn flood_fill(&mut self, start: Pos, kind: &str) {
        let radius = step_radius(kind);
        let mut visited: HashSet<Pos> = HashSet::new();
        let mut collected: Vec<Pos> = Vec::new();
        let mut absorbed: HashSet<PatchId> = HashSet::new();
        let mut queue = VecDeque::new();
        queue.push_back(start);
        visited.insert(start);

        while let Some(p) = queue.pop_front() {
            let assignable = match self.tiles.get(&p) {
                Some(existing) if existing.kind == kind => {
                    absorbed.insert(existing.patch_id);
                    true
                }
                Some(_) => false,
                None => true,
            };
            if !assignable {
                continue;
            }
            collected.push(p);
            for dx in -radius..=radius {
                for dy in -radius..=radius {
                    if dx == 0 && dy == 0 {
                        continue;
                    }
                    let n = Pos::new(p.x + dx, p.y + dy);
                    if visited.insert(n) {
                        let matches = match self.tiles.get(&n) {
                            Some(existing) => existing.kind == kind,
                            None => false,
                        };
                        if matches || n == start {
                            queue.push_back(n);
                        }
                    }
                }
            }
        }

        // Pick (or create) the target patch: the largest among absorbed.
        let target_id = absorbed
            .iter()
            .copied()
            .max_by_key(|id| self.patches.get(id).map(|p| p.borrow().size()).unwrap_or(0))
            .unwrap_or_else(|| self.alloc_id());

        let target = self
            .patches
            .entry(target_id)
            .or_insert_with(|| {
                Rc::new(RefCell::new(ResourcePatchData {
                    id: target_id,
                    kind: kind.to_string(),
                    positions: Vec::new(),
                    bbox: Area::default(),
                }))
            })
            .clone();
        let target_weak = Rc::downgrade(&target);

        for other_id in absorbed.iter().copied().filter(|&id| id != target_id) {
            if let Some(other) = self.patches.remove(&other_id) {
                let mut other_data = other.borrow_mut();
                target.borrow_mut().positions.append(&mut other_data.positions);
            }
        }

        for p in &collected {
            if !target.borrow().positions.contains(p) {
                target.borrow_mut().positions.push(*p);
            }
            self.tiles.insert(
                *p,
                ResourceTile { kind: kind.to_string(), patch_id: target_id, patch: target_weak.clone() },
            );
        }
        target.borrow_mut().recompute_bbox();

        // Re-point absorbed tiles that weren't part of this flood (rare,
        // but an absorbed patch may have had positions outside the walk).
        for (pos, tile) in self.tiles.iter_mut() {
            if absorbed.contains(&tile.patch_id) && tile.patch_id != target_id {
                tile.patch_id = target_id;
                tile.patch = target_weak.clone();
                let mut data = target.borrow_mut();
                if !data.positions.contains(pos) {
                    data.positions.push(*pos);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flood_fill_groups_adjacent_same_kind_tiles() {
        let mut layer = ResourceLayer::new();
        layer.set_kind(Pos::new(0, 0), "iron-ore");
        layer.set_kind(Pos::new(0, 1), "iron-ore");
        layer.set_kind(Pos::new(1, 0), "iron-ore");

        let tile = layer.tile_at(Pos::new(0, 0)).unwrap();
        let patch = tile.patch.upgrade().unwrap();
        let data = patch.borrow();
        assert_eq!(data.size(), 3);
        assert_eq!(data.bounding_box(), Area::new(Pos::new(0, 0), Pos::new(2, 2)));
    }

    #[test]
    fn clearing_last_tile_removes_patch() {
        let mut layer = ResourceLayer::new();
        layer.set_kind(Pos::new(0, 0), "coal");
        let patch_id = layer.tile_at(Pos::new(0, 0)).unwrap().patch_id;
        layer.set_kind(Pos::new(0, 0), "");
        assert!(layer.patch(patch_id).is_none());
        assert!(layer.tile_at(Pos::new(0, 0)).is_none());
    }

    #[test]
    fn weak_link_matches_tile_patch_id() {
        let mut layer = ResourceLayer::new();
        layer.set_kind(Pos::new(5, 5), "copper-ore");
        let tile = layer.tile_at(Pos::new(5, 5)).unwrap();
        let patch = tile.patch.upgrade().unwrap();
        assert_eq!(patch.borrow().id, tile.patch_id);
    }
}
