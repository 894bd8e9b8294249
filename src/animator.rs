//! Player move animations (row slide, column colour morph) and the rising
//! new-row intake.

use crate::board::{Occupancy, TILE_SIZE};
use crate::config::Tuning;

/// Column morph finishes once its phase passes this value.
pub const MORPH_PHASE_END: f32 = 120.0;

/// Width of one morph sprite band in phase units.
const MORPH_BAND: f32 = 30.0;

/// Number of intermediate morph bands (index 0 = nearest black, 3 = nearest white).
pub const MORPH_BANDS: usize = 4;

/// A row that was just rotated; its contents already moved, only the offset animates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RowRotation {
    pub row: usize,
    /// Horizontal pixel offset, rising from -32 to 0.
    pub delta: f32,
}

impl RowRotation {
    pub fn start(row: usize) -> Self {
        Self {
            row,
            delta: -TILE_SIZE,
        }
    }

    /// Returns false once the slide has finished.
    pub fn advance(&mut self, dt: f32, tuning: &Tuning) -> bool {
        self.delta = (self.delta + tuning.slide_rate * dt).min(0.0);
        self.delta < 0.0
    }
}

/// A column whose colours were just swapped; the phase drives the morph sprites.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColumnInversion {
    pub col: usize,
    pub phase: f32,
}

impl ColumnInversion {
    pub fn start(col: usize) -> Self {
        Self { col, phase: 0.0 }
    }

    /// Returns false once the morph has finished.
    pub fn advance(&mut self, dt: f32, tuning: &Tuning) -> bool {
        self.phase += tuning.morph_rate * dt;
        if self.phase > MORPH_PHASE_END {
            self.phase = 0.0;
            return false;
        }
        true
    }
}

/// Morph band for a cell in the inverting column. Cells already hold their new
/// colour, so a Black cell morphs from white (band 3) down to black (band 0)
/// and a White cell the other way round. `None` for Empty or before the morph starts.
pub fn morph_band(phase: f32, occupancy: Occupancy) -> Option<usize> {
    if phase <= 0.0 {
        return None;
    }
    let step = (phase / MORPH_BAND) as usize;
    match occupancy {
        Occupancy::Black => Some((MORPH_BANDS - 1).saturating_sub(step)),
        Occupancy::White => Some(step.min(MORPH_BANDS - 1)),
        Occupancy::Empty => None,
    }
}

/// Incoming row offset. Returns true when the row is due to be inserted.
pub fn advance_intake(new_row_delta: &mut f32, dt: f32, tuning: &Tuning) -> bool {
    if *new_row_delta > TILE_SIZE {
        return true;
    }
    *new_row_delta += tuning.intake_rate * dt;
    false
}
