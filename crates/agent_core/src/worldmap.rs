//! Infinite sparse tile grid, chunked in 32x32 blocks, plus a [`Viewport`]
//! cache for repeated reads over a rectangle (used by the pathfinder).

use crate::geometry::{chunk_coord, Area, Pos, CHUNK_SIZE};
use std::collections::HashMap;

const CHUNK_CELLS: usize = (CHUNK_SIZE * CHUNK_SIZE) as usize;

fn tile_idx(t: i32) -> usize {
    (((t % CHUNK_SIZE) + CHUNK_SIZE) % CHUNK_SIZE) as usize
}

/// A single 32x32 chunk of `T`, stored flat in row-major order.
#[derive(Debug, Clone)]
struct Chunk<T> {
    cells: Box<[T; CHUNK_CELLS]>,
}

impl<T: Default + Copy> Default for Chunk<T> {
    fn default() -> Self {
        Self { cells: Box::new([T::default(); CHUNK_CELLS]) }
    }
}

impl<T: Default + Copy> Chunk<T> {
    fn at(&self, x: i32, y: i32) -> &T {
        &self.cells[tile_idx(y) * CHUNK_SIZE as usize + tile_idx(x)]
    }

    fn at_mut(&mut self, x: i32, y: i32) -> &mut T {
        &mut self.cells[tile_idx(y) * CHUNK_SIZE as usize + tile_idx(x)]
    }
}

/// Infinite sparse tile map addressed by integer tile coordinates.
/// Absent chunks read as a default-constructed `T`; writing a tile
/// lazily allocates its chunk.
#[derive(Debug, Clone)]
pub struct WorldMap<T> {
    chunks: HashMap<Pos, Chunk<T>>,
}

impl<T: Default + Copy> Default for WorldMap<T> {
    fn default() -> Self {
        Self { chunks: HashMap::new() }
    }
}

impl<T: Default + Copy> WorldMap<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, p: Pos) -> T {
        match self.chunks.get(&p.chunk()) {
            Some(chunk) => *chunk.at(p.x, p.y),
            None => T::default(),
        }
    }

    pub fn set(&mut self, p: Pos, value: T) {
        self.chunks.entry(p.chunk()).or_default().cells[tile_idx(p.y) * CHUNK_SIZE as usize + tile_idx(p.x)] = value;
    }

    pub fn get_mut(&mut self, p: Pos) -> &mut T {
        self.chunks.entry(p.chunk()).or_default().at_mut(p.x, p.y)
    }

    /// Replaces an entire chunk's tiles at once (the telemetry ingestor's
    /// `tiles`/`resources` packets deliver a full 32x32 chunk per packet).
    pub fn set_chunk(&mut self, chunk_pos: Pos, values: [T; CHUNK_CELLS]) {
        self.chunks.insert(chunk_pos, Chunk { cells: Box::new(values) });
    }

    pub fn chunk_exists(&self, chunk_pos: Pos) -> bool {
        self.chunks.contains_key(&chunk_pos)
    }

    pub fn chunk_positions(&self) -> impl Iterator<Item = Pos> + '_ {
        self.chunks.keys().copied()
    }
}

/// A precomputed, cached rectangle of tiles from a [`WorldMap`]. Reading a
/// tile outside the cached rectangle grows the rectangle in place and
/// pulls in the new chunks, while previously cached chunks are retained.
///
/// Used by the pathfinder so that repeated neighbor lookups inside a
/// single A* run don't repeatedly hash into the backing map.
pub struct Viewport<'a, T> {
    map: &'a WorldMap<T>,
    area: Area,
    cache: HashMap<Pos, T>,
}

impl<'a, T: Default + Copy> Viewport<'a, T> {
    pub fn new(map: &'a WorldMap<T>, area: Area) -> Self {
        let mut vp = Self { map, area, cache: HashMap::new() };
        vp.pull(area);
        vp
    }

    fn pull(&mut self, area: Area) {
        for p in self.map.chunk_positions() {
            let tl = p.chunk_to_tile();
            let br = Pos::new(tl.x + CHUNK_SIZE, tl.y + CHUNK_SIZE);
            if tl.x < area.right_bottom.x && br.x > area.left_top.x && tl.y < area.right_bottom.y && br.y > area.left_top.y
            {
                for y in tl.y.max(area.left_top.y)..br.y.min(area.right_bottom.y) {
                    for x in tl.x.max(area.left_top.x)..br.x.min(area.right_bottom.x) {
                        let pos = Pos::new(x, y);
                        self.cache.entry(pos).or_insert_with(|| self.map.get(pos));
                    }
                }
            }
        }
    }

    /// Reads a tile, growing the cached rectangle to cover it if needed.
    pub fn at(&mut self, p: Pos) -> T {
        if let Some(v) = self.cache.get(&p) {
            return *v;
        }
        if !self.area.contains(p) {
            self.area = self.area.expand_to_include(p);
            self.pull(self.area);
        }
        *self.cache.entry(p).or_insert_with(|| self.map.get(p))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_chunk_reads_as_default() {
        let map: WorldMap<i32> = WorldMap::new();
        assert_eq!(map.get(Pos::new(5, 5)), 0);
    }

    #[test]
    fn set_then_get_round_trips() {
        let mut map: WorldMap<i32> = WorldMap::new();
        map.set(Pos::new(-5, 40), 7);
        assert_eq!(map.get(Pos::new(-5, 40)), 7);
        assert_eq!(map.get(Pos::new(-5, 41)), 0);
    }

    #[test]
    fn viewport_grows_when_reading_outside_rect() {
        let mut map: WorldMap<i32> = WorldMap::new();
        map.set(Pos::new(0, 0), 1);
        map.set(Pos::new(100, 100), 2);
        let mut vp = Viewport::new(&map, Area::new(Pos::new(0, 0), Pos::new(1, 1)));
        assert_eq!(vp.at(Pos::new(0, 0)), 1);
        assert_eq!(vp.at(Pos::new(100, 100)), 2);
    }
}
