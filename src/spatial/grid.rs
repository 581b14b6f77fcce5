//! Occupancy grid with cached 3x3 sections.

use super::{cellsign, ScratchBuffer, SpatialHash};
use crate::components::{Occupant, Position};
use crate::error::GridError;
use crate::geometry::{cell_origin, grid_dimensions, MapBounds};
use bevy_ecs::prelude::*;
use std::collections::HashMap;
use tracing::warn;

/// Counters sampled for debug output and snapshots.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GridStats {
    pub occupied_cells: usize,
    pub occupants: usize,
    pub largest_cell: usize,
    /// World coordinate of the top-left corner of the fullest cell.
    pub largest_cell_at: Option<(u32, u32)>,
    pub scratch_used: usize,
    pub scratch_capacity: usize,
}

/// Spatial index of every simulated entity.
///
/// Membership is authoritative: each occupant sits in exactly one cell,
/// the one its position hashes to. Sections and cellsigns are derived
/// from the cells and refreshed once per tick.
///
/// A section is marked stale whenever any of its 9 cells gains or loses
/// an occupant, and only a rebuild clears the mark. Queries read a
/// section that is not stale instead of walking the 9 cells.
#[derive(Resource, Debug)]
pub struct Grid {
    hash: SpatialHash,
    cols: u32,
    rows: u32,
    cells: HashMap<u64, Vec<Occupant>>,
    cellsigns: Vec<u32>,
    sections: Vec<Vec<Occupant>>,
    stale: Vec<bool>,
    scratch: ScratchBuffer,
    /// Reused by `refresh_sections`.
    next_signs: Vec<u32>,
    dirty: Vec<bool>,
}

impl Grid {
    pub fn new(bounds: MapBounds, cell_size: u16, scratch_capacity: usize) -> Self {
        let hash = SpatialHash::new(cell_size);
        let (cols, rows) = grid_dimensions(bounds, hash.cell_size());
        let count = (cols * rows) as usize;
        Self {
            hash,
            cols,
            rows,
            cells: HashMap::new(),
            cellsigns: vec![0; count],
            sections: vec![Vec::new(); count],
            stale: vec![false; count],
            scratch: ScratchBuffer::with_capacity(scratch_capacity),
            next_signs: Vec::with_capacity(count),
            dirty: vec![false; count],
        }
    }

    pub fn hash(&self) -> SpatialHash {
        self.hash
    }

    /// Columns and rows covered by the section array.
    pub fn dimensions(&self) -> (u32, u32) {
        (self.cols, self.rows)
    }

    /// Add `occupant` to the cell at `pos`.
    ///
    /// Returns false (and logs) if it is already there.
    pub fn insert(&mut self, occupant: Occupant, pos: Position) -> bool {
        let key = self.hash.key(pos.x, pos.y);
        let cell = self.cells.entry(key).or_default();
        if cell.contains(&occupant) {
            warn!(entity = ?occupant.entity, key, "duplicate grid insert ignored");
            return false;
        }
        cell.push(occupant);
        self.mark_stale(pos);
        true
    }

    /// Remove `occupant` from the cell at `pos`.
    ///
    /// # Panics
    ///
    /// If the cell does not exist or does not hold the occupant. Either
    /// means the caller's view of the entity's position has drifted from
    /// the grid, and every later query would be wrong.
    pub fn remove(&mut self, occupant: Occupant, pos: Position) {
        let key = self.hash.key(pos.x, pos.y);
        let Some(cell) = self.cells.get_mut(&key) else {
            panic!(
                "grid desync: no cell {key:#x} at ({}, {}) while removing {:?}",
                pos.x, pos.y, occupant.entity
            );
        };
        let Some(index) = cell.iter().position(|o| *o == occupant) else {
            panic!(
                "grid desync: {:?} not found in cell {key:#x} at ({}, {})",
                occupant.entity, pos.x, pos.y
            );
        };
        cell.swap_remove(index);
        if cell.is_empty() {
            self.cells.remove(&key);
        }
        self.mark_stale(pos);
    }

    /// Flag every section whose 3x3 block covers the cell at `pos`.
    fn mark_stale(&mut self, pos: Position) {
        let (col, row) = self.hash.cell(pos.x, pos.y);
        for (c, r) in block(col, row, self.cols, self.rows) {
            if let Some(index) = self.index_of(c, r) {
                self.stale[index] = true;
            }
        }
    }

    /// Move `occupant` between cells if `old` and `new` hash differently.
    ///
    /// Returns true when the cell changed.
    pub fn relocate(&mut self, occupant: Occupant, old: Position, new: Position) -> bool {
        if self.hash.key(old.x, old.y) == self.hash.key(new.x, new.y) {
            return false;
        }
        self.remove(occupant, old);
        self.insert(occupant, new);
        true
    }

    pub fn contains(&self, occupant: Occupant, pos: Position) -> bool {
        self.cell(pos.x, pos.y).contains(&occupant)
    }

    /// Occupants of the single cell containing `(x, y)`.
    pub fn cell(&self, x: u16, y: u16) -> &[Occupant] {
        self.cells
            .get(&self.hash.key(x, y))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Every occupied cell with its key.
    pub fn cells(&self) -> impl Iterator<Item = (u64, &[Occupant])> {
        self.cells.iter().map(|(key, cell)| (*key, cell.as_slice()))
    }

    /// Gather the 3x3 neighborhood of `(x, y)` into the scratch buffer.
    ///
    /// Served from the cached section when it is current, otherwise from
    /// the 9 cells; both paths yield the same occupants in the same order.
    /// The slice stays valid until the grid is next borrowed mutably; its
    /// slots are only reclaimed at the next `reset_scratch`. Cells are
    /// disjoint, so the result holds no duplicates.
    pub fn query_section(&mut self, x: u16, y: u16, limit: usize) -> Result<&[Occupant], GridError> {
        let (col, row) = self.hash.cell(x, y);
        let start = self.scratch.cursor();
        let cached = self.index_of(col, row).filter(|&index| !self.stale[index]);

        let written = match cached {
            Some(index) => gather(&mut self.scratch, [self.sections[index].as_slice()], (x, y), limit),
            None => {
                let cells = &self.cells;
                let parts = block(col, row, self.cols, self.rows)
                    .filter_map(|(c, r)| cells.get(&SpatialHash::key_of_cell(c, r)))
                    .map(Vec::as_slice);
                gather(&mut self.scratch, parts, (x, y), limit)
            }
        };

        match written {
            Ok(()) => Ok(self.scratch.written_since(start)),
            Err(err) => {
                self.scratch.rewind_to(start);
                Err(err)
            }
        }
    }

    /// Recompute every cellsign and rebuild each section whose 3x3 block
    /// holds a cell with a changed sign.
    ///
    /// Returns the number of rebuilt sections.
    pub fn refresh_sections(&mut self) -> usize {
        self.compute_signs();

        self.dirty.fill(false);
        for index in 0..self.cellsigns.len() {
            if self.cellsigns[index] == self.next_signs[index] {
                continue;
            }
            self.cellsigns[index] = self.next_signs[index];
            let (col, row) = (index as u32 % self.cols, index as u32 / self.cols);
            for (c, r) in block(col, row, self.cols, self.rows) {
                self.dirty[(r * self.cols + c) as usize] = true;
            }
        }

        let mut rebuilt = 0;
        for index in 0..self.sections.len() {
            if !self.dirty[index] {
                continue;
            }
            let (col, row) = (index as u32 % self.cols, index as u32 / self.cols);
            let section = &mut self.sections[index];
            section.clear();
            for (c, r) in block(col, row, self.cols, self.rows) {
                if let Some(cell) = self.cells.get(&SpatialHash::key_of_cell(c, r)) {
                    section.extend_from_slice(cell);
                }
            }
            self.stale[index] = false;
            rebuilt += 1;
        }
        rebuilt
    }

    /// True when the section at `(col, row)` may differ from its 9 cells.
    pub fn is_stale(&self, col: u32, row: u32) -> bool {
        self.index_of(col, row).is_some_and(|index| self.stale[index])
    }

    #[cfg(not(feature = "parallel"))]
    fn compute_signs(&mut self) {
        self.next_signs.clear();
        for row in 0..self.rows {
            for col in 0..self.cols {
                let sign = self
                    .cells
                    .get(&SpatialHash::key_of_cell(col, row))
                    .map(|cell| cellsign(cell))
                    .unwrap_or(0);
                self.next_signs.push(sign);
            }
        }
    }

    #[cfg(feature = "parallel")]
    fn compute_signs(&mut self) {
        use rayon::prelude::*;

        let cols = self.cols;
        let cells = &self.cells;
        (0..self.cols * self.rows)
            .into_par_iter()
            .map(|index| {
                cells
                    .get(&SpatialHash::key_of_cell(index % cols, index / cols))
                    .map(|cell| cellsign(cell))
                    .unwrap_or(0)
            })
            .collect_into_vec(&mut self.next_signs);
    }

    /// Cached section of the cell containing `(x, y)`.
    ///
    /// Reflects the grid as of the last `refresh_sections`; empty outside
    /// the grid.
    pub fn section(&self, x: u16, y: u16) -> &[Occupant] {
        let (col, row) = self.hash.cell(x, y);
        self.section_at(col, row).unwrap_or(&[])
    }

    pub fn section_at(&self, col: u32, row: u32) -> Option<&[Occupant]> {
        self.index_of(col, row).map(|index| self.sections[index].as_slice())
    }

    pub fn cellsign_at(&self, col: u32, row: u32) -> Option<u32> {
        self.index_of(col, row).map(|index| self.cellsigns[index])
    }

    /// Drop `occupant` from every cached section.
    pub fn purge(&mut self, occupant: Occupant) {
        for section in &mut self.sections {
            section.retain(|o| *o != occupant);
        }
    }

    pub fn reset_scratch(&mut self) {
        self.scratch.reset();
    }

    pub fn scratch(&self) -> &ScratchBuffer {
        &self.scratch
    }

    /// Total occupants across all cells.
    pub fn len(&self) -> usize {
        self.cells.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn occupied_cells(&self) -> usize {
        self.cells.len()
    }

    pub fn stats(&self) -> GridStats {
        let largest = self.cells.iter().max_by_key(|(_, cell)| cell.len());
        let cell_size = self.hash.cell_size();
        GridStats {
            occupied_cells: self.occupied_cells(),
            occupants: self.len(),
            largest_cell: largest.map_or(0, |(_, cell)| cell.len()),
            largest_cell_at: largest.map(|(key, _)| {
                let (col, row) = SpatialHash::cell_of_key(*key);
                cell_origin(col, row, cell_size)
            }),
            scratch_used: self.scratch.cursor(),
            scratch_capacity: self.scratch.capacity(),
        }
    }

    fn index_of(&self, col: u32, row: u32) -> Option<usize> {
        (col < self.cols && row < self.rows).then(|| (row * self.cols + col) as usize)
    }
}

/// In-grid cells of the 3x3 block centered on `(col, row)`.
fn block(col: u32, row: u32, cols: u32, rows: u32) -> impl Iterator<Item = (u32, u32)> + Clone {
    let col_lo = col.saturating_sub(1);
    let row_lo = row.saturating_sub(1);
    let col_hi = (col + 1).min(cols.saturating_sub(1)).max(col);
    let row_hi = (row + 1).min(rows.saturating_sub(1)).max(row);
    (row_lo..=row_hi).flat_map(move |r| (col_lo..=col_hi).map(move |c| (c, r)))
}

/// Copy `parts` into the scratch buffer. Checks run before the first
/// write; a failed push leaves a partial write for the caller to rewind.
fn gather<'a>(
    scratch: &mut ScratchBuffer,
    parts: impl IntoIterator<Item = &'a [Occupant]> + Clone,
    (x, y): (u16, u16),
    limit: usize,
) -> Result<(), GridError> {
    let total: usize = parts.clone().into_iter().map(<[Occupant]>::len).sum();
    if total > limit {
        return Err(GridError::LimitExceeded { x, y, limit });
    }
    if total > scratch.remaining() {
        return Err(GridError::ScratchOverflow {
            capacity: scratch.capacity(),
        });
    }
    for occupant in parts.into_iter().flatten() {
        scratch.push(*occupant)?;
    }
    Ok(())
}
