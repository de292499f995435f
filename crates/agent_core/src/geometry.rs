//! Positions, axis-aligned areas, and the 4-way direction enum.
//!
//! Tile coordinates are plain integers; chunk coordinates use floored
//! division so that negative tiles still map onto a chunk grid without
//! a seam at zero.

use serde::{Deserialize, Serialize};

/// Width/height of a chunk, in tiles.
pub const CHUNK_SIZE: i32 = 32;

/// Floored division, matching `chunk(t) = floor(t/32)` for negative tiles.
pub const fn chunk_coord(t: i32) -> i32 {
    if t >= 0 {
        t / CHUNK_SIZE
    } else {
        (t - (CHUNK_SIZE - 1)) / CHUNK_SIZE
    }
}

/// A tile-space integer position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct Pos {
    pub x: i32,
    pub y: i32,
}

impl Pos {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn chunk(self) -> Pos {
        Pos::new(chunk_coord(self.x), chunk_coord(self.y))
    }

    /// Ceil-rounded chunk coordinate covering this tile, used for the
    /// upper bound of a range query's chunk rectangle.
    pub fn chunk_ceil(self) -> Pos {
        Pos::new(chunk_coord(self.x + CHUNK_SIZE - 1), chunk_coord(self.y + CHUNK_SIZE - 1))
    }

    pub fn chunk_to_tile(self) -> Pos {
        Pos::new(self.x * CHUNK_SIZE, self.y * CHUNK_SIZE)
    }

    pub fn to_f(self) -> PosF {
        PosF::new(self.x as f64, self.y as f64)
    }

    pub fn len(self) -> f64 {
        ((self.x * self.x + self.y * self.y) as f64).sqrt()
    }
}

impl std::ops::Add for Pos {
    type Output = Pos;
    fn add(self, rhs: Pos) -> Pos {
        Pos::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl std::ops::Sub for Pos {
    type Output = Pos;
    fn sub(self, rhs: Pos) -> Pos {
        Pos::new(self.x - rhs.x, self.y - rhs.y)
    }
}

/// A real-valued position, used for sub-tile precision (entity placement,
/// distance queries, pathfinder goal discs).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct PosF {
    pub x: f64,
    pub y: f64,
}

impl PosF {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn len(self) -> f64 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    pub fn to_int(self) -> Pos {
        Pos::new(self.x.round() as i32, self.y.round() as i32)
    }

    pub fn to_int_floor(self) -> Pos {
        Pos::new(self.x.floor() as i32, self.y.floor() as i32)
    }

    pub fn distance_to(self, other: PosF) -> f64 {
        (self - other).len()
    }
}

impl std::ops::Add for PosF {
    type Output = PosF;
    fn add(self, rhs: PosF) -> PosF {
        PosF::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl std::ops::Sub for PosF {
    type Output = PosF;
    fn sub(self, rhs: PosF) -> PosF {
        PosF::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl From<Pos> for PosF {
    fn from(p: Pos) -> PosF {
        p.to_f()
    }
}

/// 4-way cardinal direction. `NORTH = 0`; rotation is defined modulo 4 in
/// clockwise order, matching the in-game `defines.direction` enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    North = 0,
    East = 1,
    South = 2,
    West = 3,
}

impl Direction {
    pub const ALL: [Direction; 4] = [Direction::North, Direction::East, Direction::South, Direction::West];

    pub fn from_index(i: u8) -> Direction {
        match i % 4 {
            0 => Direction::North,
            1 => Direction::East,
            2 => Direction::South,
            _ => Direction::West,
        }
    }

    pub fn index(self) -> u8 {
        self as u8
    }

    /// The enum name used by the RPC sink, e.g. `defines.direction.north`.
    pub fn rpc_name(self) -> &'static str {
        match self {
            Direction::North => "north",
            Direction::East => "east",
            Direction::South => "south",
            Direction::West => "west",
        }
    }
}

/// An axis-aligned rectangle `[left_top, right_bottom)`, generic over
/// integer or real coordinates via [`Pos`]/[`PosF`]. Kept as two small
/// concrete structs (rather than one generic one) since the coordinate
/// arithmetic differs (integer outer-hull rounding only makes sense on
/// [`AreaF`]).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Area {
    pub left_top: Pos,
    pub right_bottom: Pos,
}

impl Area {
    pub fn new(left_top: Pos, right_bottom: Pos) -> Self {
        Self { left_top, right_bottom }
    }

    pub fn from_point(p: Pos) -> Self {
        Self::new(p, Pos::new(p.x + 1, p.y + 1))
    }

    /// Bounding box of a non-empty slice of positions.
    pub fn bounding(positions: &[Pos]) -> Self {
        let mut left_top = positions[0];
        let mut right_bottom = Pos::new(positions[0].x + 1, positions[0].y + 1);
        for p in positions {
            left_top.x = left_top.x.min(p.x);
            left_top.y = left_top.y.min(p.y);
            right_bottom.x = right_bottom.x.max(p.x + 1);
            right_bottom.y = right_bottom.y.max(p.y + 1);
        }
        Self::new(left_top, right_bottom)
    }

    /// Parses the wire format `x1,y1;x2,y2`.
    pub fn parse(s: &str) -> Option<Area> {
        let (lt, rb) = s.split_once(';')?;
        let (x1, y1) = lt.split_once(',')?;
        let (x2, y2) = rb.split_once(',')?;
        Some(Area::new(
            Pos::new(x1.trim().parse().ok()?, y1.trim().parse().ok()?),
            Pos::new(x2.trim().parse().ok()?, y2.trim().parse().ok()?),
        ))
    }

    pub fn contains(self, p: Pos) -> bool {
        self.left_top.x <= p.x && p.x < self.right_bottom.x && self.left_top.y <= p.y && p.y < self.right_bottom.y
    }

    pub fn width(self) -> i32 {
        self.right_bottom.x - self.left_top.x
    }

    pub fn height(self) -> i32 {
        self.right_bottom.y - self.left_top.y
    }

    pub fn intersect(self, other: Area) -> Area {
        Area::new(
            Pos::new(self.left_top.x.max(other.left_top.x), self.left_top.y.max(other.left_top.y)),
            Pos::new(self.right_bottom.x.min(other.right_bottom.x), self.right_bottom.y.min(other.right_bottom.y)),
        )
    }

    pub fn expand(self, radius: i32) -> Area {
        Area::new(
            Pos::new(self.left_top.x - radius, self.left_top.y - radius),
            Pos::new(self.right_bottom.x + radius, self.right_bottom.y + radius),
        )
    }

    pub fn expand_to_include(self, p: Pos) -> Area {
        Area::new(
            Pos::new(self.left_top.x.min(p.x), self.left_top.y.min(p.y)),
            Pos::new(self.right_bottom.x.max(p.x), self.right_bottom.y.max(p.y)),
        )
    }

    pub fn translate(self, offset: Pos) -> Area {
        Area::new(self.left_top + offset, self.right_bottom + offset)
    }

    /// Rotates the box about the origin assuming it was authored in
    /// `NORTH` orientation: `NORTH` is identity, `EAST` is 90° clockwise,
    /// `SOUTH` is 180°, `WEST` is 270°.
    pub fn rotate(self, dir: Direction) -> Area {
        let (lt, rb) = (self.left_top, self.right_bottom);
        match dir {
            Direction::North => self,
            Direction::East => Area::new(Pos::new(-rb.y, lt.x), Pos::new(-lt.y, rb.x)),
            Direction::South => Area::new(Pos::new(-rb.x, -rb.y), Pos::new(-lt.x, -lt.y)),
            Direction::West => Area::new(Pos::new(lt.y, -rb.x), Pos::new(rb.y, -lt.x)),
        }
    }

    pub fn to_f(self) -> AreaF {
        AreaF::new(self.left_top.to_f(), self.right_bottom.to_f())
    }

    pub fn diameter(self) -> i32 {
        self.width().max(self.height())
    }
}

/// Real-valued counterpart of [`Area`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AreaF {
    pub left_top: PosF,
    pub right_bottom: PosF,
}

impl AreaF {
    pub fn new(left_top: PosF, right_bottom: PosF) -> Self {
        Self { left_top, right_bottom }
    }

    pub fn contains(self, p: PosF) -> bool {
        self.left_top.x <= p.x && p.x < self.right_bottom.x && self.left_top.y <= p.y && p.y < self.right_bottom.y
    }

    /// The smallest integer [`Area`] whose tiles fully cover this box:
    /// floor on the top-left, ceil on the bottom-right.
    pub fn outer(self) -> Area {
        Area::new(
            Pos::new(self.left_top.x.floor() as i32, self.left_top.y.floor() as i32),
            Pos::new(self.right_bottom.x.ceil() as i32, self.right_bottom.y.ceil() as i32),
        )
    }

    /// Distance from a point to the nearest point on this box's boundary
    /// or interior (0 if `p` is inside). Ported from the original
    /// implementation's `distance(Pos_f, Area_f)`.
    pub fn distance_to(self, p: PosF) -> f64 {
        if self.contains(p) {
            return 0.0;
        }
        if self.left_top.x <= p.x && p.x <= self.right_bottom.x {
            return (p.y - self.left_top.y).abs().min((p.y - self.right_bottom.y).abs());
        }
        if self.left_top.y <= p.y && p.y <= self.right_bottom.y {
            return (p.x - self.left_top.x).abs().min((p.x - self.right_bottom.x).abs());
        }
        let right_top = PosF::new(self.right_bottom.x, self.left_top.y);
        let left_bottom = PosF::new(self.left_top.x, self.right_bottom.y);
        let d1 = (p - self.left_top).len().min((p - self.right_bottom).len());
        let d2 = (p - right_top).len().min((p - left_bottom).len());
        d1.min(d2)
    }

    pub fn expand(self, radius: f64) -> AreaF {
        AreaF::new(
            PosF::new(self.left_top.x - radius, self.left_top.y - radius),
            PosF::new(self.right_bottom.x + radius, self.right_bottom.y + radius),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_coord_is_negative_safe() {
        assert_eq!(chunk_coord(0), 0);
        assert_eq!(chunk_coord(31), 0);
        assert_eq!(chunk_coord(32), 1);
        assert_eq!(chunk_coord(-1), -1);
        assert_eq!(chunk_coord(-32), -1);
        assert_eq!(chunk_coord(-33), -2);
    }

    #[test]
    fn rotation_matches_cardinal_definitions() {
        let area = Area::new(Pos::new(0, 0), Pos::new(2, 1));
        assert_eq!(area.rotate(Direction::North), area);
        assert_eq!(area.rotate(Direction::East), Area::new(Pos::new(-1, 0), Pos::new(0, 2)));
        assert_eq!(area.rotate(Direction::South), Area::new(Pos::new(-2, -1), Pos::new(0, 0)));
        assert_eq!(area.rotate(Direction::West), Area::new(Pos::new(0, -2), Pos::new(1, 0)));
    }

    #[test]
    fn area_parse_roundtrips_wire_format() {
        let a = Area::parse("1,2;3,4").unwrap();
        assert_eq!(a, Area::new(Pos::new(1, 2), Pos::new(3, 4)));
    }

    #[test]
    fn area_distance_zero_when_containing() {
        let a = AreaF::new(PosF::new(0.0, 0.0), PosF::new(4.0, 4.0));
        assert_eq!(a.distance_to(PosF::new(2.0, 2.0)), 0.0);
    }
}
