//! Geometry helpers shared by the grid and the movement code.
//!
//! Everything here is pure: conversions between angles and vectors,
//! world/cell coordinates, centered bounding boxes and the
//! clamped casts used when a float step lands back on the integer map.

use serde::{Deserialize, Serialize};
use std::f32::consts::{FRAC_PI_2, FRAC_PI_4, PI};

/// Axis-aligned bounding box in signed world space.
///
/// Boxes are built around an entity center with half extents taken by
/// truncating division, so a 15-wide entity spans 14 pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Aabb {
    pub min_x: i32,
    pub min_y: i32,
    pub max_x: i32,
    pub max_y: i32,
}

impl Aabb {
    /// Box of a `w` x `h` footprint centered on `(x, y)`.
    pub fn centered(x: i32, y: i32, w: u16, h: u16) -> Self {
        let half_w = i32::from(w / 2);
        let half_h = i32::from(h / 2);
        Self {
            min_x: x - half_w,
            min_y: y - half_h,
            max_x: x + half_w,
            max_y: y + half_h,
        }
    }

    /// Strict overlap test. Boxes sharing only an edge do not overlap.
    #[inline]
    pub fn overlaps(&self, other: &Aabb) -> bool {
        self.min_x < other.max_x
            && self.max_x > other.min_x
            && self.min_y < other.max_y
            && self.max_y > other.min_y
    }
}

/// Playable area, origin top-left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapBounds {
    pub width: u16,
    pub height: u16,
}

impl MapBounds {
    pub fn new(width: u16, height: u16) -> Self {
        Self { width, height }
    }

    /// True when the whole box lies inside the map.
    pub fn contains(&self, aabb: &Aabb) -> bool {
        aabb.min_x >= 0
            && aabb.min_y >= 0
            && aabb.max_x <= i32::from(self.width)
            && aabb.max_y <= i32::from(self.height)
    }

    /// Clamp a center so that a `w` x `h` footprint stays on the map.
    pub fn clamp_center(&self, x: i32, y: i32, w: u16, h: u16) -> (u16, u16) {
        let half_w = i32::from(w / 2);
        let half_h = i32::from(h / 2);
        let cx = x.min(i32::from(self.width) - half_w).max(half_w);
        let cy = y.min(i32::from(self.height) - half_h).max(half_h);
        (clamp_u16(cx), clamp_u16(cy))
    }

    pub fn center(&self) -> (u16, u16) {
        (self.width / 2, self.height / 2)
    }
}

/// Horizontal or vertical axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
}

impl Axis {
    /// Heading of a move along this axis with the given sign.
    pub fn angle(self, sign: i32) -> f32 {
        match (self, sign >= 0) {
            (Axis::X, true) => 0.0,
            (Axis::X, false) => PI,
            (Axis::Y, true) => FRAC_PI_2,
            (Axis::Y, false) => -FRAC_PI_2,
        }
    }

    /// Split a scalar move into an `(dx, dy)` pair.
    pub fn delta(self, amount: i32) -> (i32, i32) {
        match self {
            Axis::X => (amount, 0),
            Axis::Y => (0, amount),
        }
    }
}

/// Eight-way compass facing. North is towards y = 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Direction {
    North,
    NorthEast,
    East,
    SouthEast,
    #[default]
    South,
    SouthWest,
    West,
    NorthWest,
}

impl Direction {
    pub const ALL: [Direction; 8] = [
        Direction::North,
        Direction::NorthEast,
        Direction::East,
        Direction::SouthEast,
        Direction::South,
        Direction::SouthWest,
        Direction::West,
        Direction::NorthWest,
    ];

    /// Facing for a pair of axis intents in `-1..=1`. `None` when idle.
    pub fn from_axes(dx: i32, dy: i32) -> Option<Self> {
        match (dx.signum(), dy.signum()) {
            (0, -1) => Some(Direction::North),
            (1, -1) => Some(Direction::NorthEast),
            (1, 0) => Some(Direction::East),
            (1, 1) => Some(Direction::SouthEast),
            (0, 1) => Some(Direction::South),
            (-1, 1) => Some(Direction::SouthWest),
            (-1, 0) => Some(Direction::West),
            (-1, -1) => Some(Direction::NorthWest),
            _ => None,
        }
    }

    /// Unit grid offset for this facing.
    pub fn offset(self) -> (i32, i32) {
        match self {
            Direction::North => (0, -1),
            Direction::NorthEast => (1, -1),
            Direction::East => (1, 0),
            Direction::SouthEast => (1, 1),
            Direction::South => (0, 1),
            Direction::SouthWest => (-1, 1),
            Direction::West => (-1, 0),
            Direction::NorthWest => (-1, -1),
        }
    }

    /// Heading in radians, 0 = east, clockwise on screen.
    pub fn angle(self) -> f32 {
        let (dx, dy) = self.offset();
        (dy as f32).atan2(dx as f32)
    }

    /// Nearest compass facing for an arbitrary heading.
    pub fn from_angle(angle: f32) -> Self {
        let octant = (angle / FRAC_PI_4).round() as i32;
        match octant.rem_euclid(8) {
            0 => Direction::East,
            1 => Direction::SouthEast,
            2 => Direction::South,
            3 => Direction::SouthWest,
            4 => Direction::West,
            5 => Direction::NorthWest,
            6 => Direction::North,
            _ => Direction::NorthEast,
        }
    }
}

/// Displacement of length `distance` along `angle`.
#[inline]
pub fn vector(angle: f32, distance: f32) -> (f32, f32) {
    (angle.cos() * distance, angle.sin() * distance)
}

/// Heading from `(x0, y0)` towards `(x1, y1)`.
#[inline]
pub fn angle_between(x0: f32, y0: f32, x1: f32, y1: f32) -> f32 {
    (y1 - y0).atan2(x1 - x0)
}

/// World units covered in one tick at `speed` units per second.
#[inline]
pub fn step_per_tick(speed: f32, tick_rate: f32) -> f32 {
    if tick_rate <= 0.0 {
        0.0
    } else {
        speed / tick_rate
    }
}

/// Truncating float to integer displacement (towards zero).
#[inline]
pub fn truncate(value: f32) -> i32 {
    value.trunc() as i32
}

/// Saturating cast into world coordinate space.
#[inline]
pub fn clamp_u16(value: i32) -> u16 {
    value.clamp(0, i32::from(u16::MAX)) as u16
}

/// Saturating cast used for counts packed into a byte.
#[inline]
pub fn saturating_u8(value: usize) -> u8 {
    value.min(usize::from(u8::MAX)) as u8
}

/// Grid column/row of a world coordinate.
#[inline]
pub fn cell_of(x: u16, y: u16, cell_size: u16) -> (u32, u32) {
    (u32::from(x / cell_size), u32::from(y / cell_size))
}

/// World coordinate of a cell's top-left corner.
#[inline]
pub fn cell_origin(col: u32, row: u32, cell_size: u16) -> (u32, u32) {
    (col * u32::from(cell_size), row * u32::from(cell_size))
}

/// Columns and rows needed to cover the map.
pub fn grid_dimensions(bounds: MapBounds, cell_size: u16) -> (u32, u32) {
    let cs = u32::from(cell_size.max(1));
    (
        u32::from(bounds.width).div_ceil(cs).max(1),
        u32::from(bounds.height).div_ceil(cs).max(1),
    )
}
