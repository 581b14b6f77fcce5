//! Bounded per-tick arena for section query results.

use crate::components::Occupant;
use crate::error::GridError;

/// Fixed-capacity buffer that section queries append into.
///
/// Storage is reserved once; queries never reallocate. The cursor only
/// moves forward until `reset`, which the grid refresh does once per tick.
#[derive(Debug)]
pub struct ScratchBuffer {
    slots: Vec<Occupant>,
    capacity: usize,
}

impl ScratchBuffer {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Rewind the cursor. Previously returned slices are gone by now.
    pub fn reset(&mut self) {
        self.slots.clear();
    }

    /// Slots written since the last reset.
    pub fn cursor(&self) -> usize {
        self.slots.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn remaining(&self) -> usize {
        self.capacity - self.slots.len()
    }

    pub(crate) fn push(&mut self, occupant: Occupant) -> Result<(), GridError> {
        if self.slots.len() >= self.capacity {
            return Err(GridError::ScratchOverflow {
                capacity: self.capacity,
            });
        }
        self.slots.push(occupant);
        Ok(())
    }

    /// Drop a partially written result.
    pub(crate) fn rewind_to(&mut self, cursor: usize) {
        self.slots.truncate(cursor);
    }

    pub(crate) fn written_since(&self, cursor: usize) -> &[Occupant] {
        &self.slots[cursor..]
    }
}
