//! Spatial partitioning for collision and proximity queries.
//!
//! Positions hash to fixed-size cells. The `Grid` keeps one bucket per
//! occupied cell, a cached 3x3 "section" per cell that is rebuilt when
//! the cellsign of any of its 9 cells changes, and a per-tick scratch
//! buffer that section queries write into instead of allocating.

mod grid;
mod scratch;

pub use grid::{Grid, GridStats};
pub use scratch::ScratchBuffer;

use crate::components::Occupant;
use crate::geometry::saturating_u8;
use serde::{Deserialize, Serialize};

/// Bits of a cellsign holding the saturating occupant count.
pub const CELLSIGN_COUNT_MASK: u32 = 0xff;

/// Maps world coordinates to 64-bit cell keys.
///
/// The column lives in the high 32 bits and the row in the low 32 bits,
/// so keys of distinct cells never collide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpatialHash {
    cell_size: u16,
}

impl SpatialHash {
    pub fn new(cell_size: u16) -> Self {
        Self {
            cell_size: cell_size.max(1),
        }
    }

    pub fn cell_size(&self) -> u16 {
        self.cell_size
    }

    /// Column and row of the cell containing `(x, y)`.
    #[inline]
    pub fn cell(&self, x: u16, y: u16) -> (u32, u32) {
        crate::geometry::cell_of(x, y, self.cell_size)
    }

    /// Cell key of a world coordinate.
    #[inline]
    pub fn key(&self, x: u16, y: u16) -> u64 {
        let (col, row) = self.cell(x, y);
        Self::key_of_cell(col, row)
    }

    #[inline]
    pub const fn key_of_cell(col: u32, row: u32) -> u64 {
        ((col as u64) << 32) | row as u64
    }

    /// Column and row encoded in a cell key.
    #[inline]
    pub const fn cell_of_key(key: u64) -> (u32, u32) {
        ((key >> 32) as u32, key as u32)
    }
}

/// Change-detection fingerprint of a cell's contents.
///
/// Low byte: occupant count (saturating). Bit `8 + discriminant`: at least
/// one occupant of that kind is present. Equal signs are treated as "no
/// change"; two different occupant sets can share a sign.
pub fn cellsign(occupants: &[Occupant]) -> u32 {
    let mut sign = u32::from(saturating_u8(occupants.len()));
    for occupant in occupants {
        sign |= 1 << (8 + u32::from(occupant.kind.discriminant()));
    }
    sign
}
