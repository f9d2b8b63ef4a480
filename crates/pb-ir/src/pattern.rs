//! Step pattern grid.

use crate::{MAX_VELOCITY, NUM_TRACKS, STEPS_PER_PATTERN};

/// A single step on one track.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Cell {
    /// Fires a trigger when the cursor reaches this step.
    pub active: bool,
    /// Trigger velocity (0-127).
    pub velocity: u8,
}

impl Cell {
    /// An inactive cell at full velocity.
    pub const fn empty() -> Self {
        Self {
            active: false,
            velocity: MAX_VELOCITY,
        }
    }
}

impl Default for Cell {
    fn default() -> Self {
        Self::empty()
    }
}

/// Fixed `tracks × steps` grid. Plain data, so copying a whole pattern
/// never allocates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Pattern {
    /// Cells indexed `[track][step]`.
    pub cells: [[Cell; STEPS_PER_PATTERN]; NUM_TRACKS],
}

impl Pattern {
    /// Create an empty pattern.
    pub const fn new() -> Self {
        Self {
            cells: [[Cell::empty(); STEPS_PER_PATTERN]; NUM_TRACKS],
        }
    }

    /// Build a pattern from one bitmask per track (bit `n` = step `n`).
    pub fn from_masks(masks: &[u16; NUM_TRACKS]) -> Self {
        let mut pattern = Self::new();
        for (track, mask) in masks.iter().enumerate() {
            for step in 0..STEPS_PER_PATTERN {
                pattern.cells[track][step].active = mask & (1 << step) != 0;
            }
        }
        pattern
    }

    /// Get a cell. `None` if the track is out of range; the step wraps.
    pub fn cell(&self, track: usize, step: usize) -> Option<&Cell> {
        self.cells
            .get(track)
            .map(|row| &row[step % STEPS_PER_PATTERN])
    }

    /// Get a mutable cell. `None` if the track is out of range; the step wraps.
    pub fn cell_mut(&mut self, track: usize, step: usize) -> Option<&mut Cell> {
        self.cells
            .get_mut(track)
            .map(|row| &mut row[step % STEPS_PER_PATTERN])
    }

    /// Active steps of one track as a bitmask.
    pub fn track_mask(&self, track: usize) -> u16 {
        self.cells.get(track).map_or(0, |row| {
            row.iter()
                .enumerate()
                .filter(|(_, c)| c.active)
                .fold(0u16, |mask, (step, _)| mask | (1 << step))
        })
    }

    /// Deactivate every cell and restore default velocities.
    pub fn clear(&mut self) {
        *self = Self::new();
    }

    /// Returns true if no cell is active.
    pub fn is_empty(&self) -> bool {
        self.cells.iter().flatten().all(|c| !c.active)
    }
}

impl Default for Pattern {
    fn default() -> Self {
        Self::new()
    }
}
