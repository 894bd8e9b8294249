//! Gravity: detach pieces floating over gaps, then drop them one row at a time.

use crate::board::{BOARD_HEIGHT, BOARD_WIDTH, Board, Cell, TILE_SIZE};
use crate::config::Tuning;

/// A piece whose slide offset is within this distance of 0 has arrived.
const ARRIVAL_EPSILON: f32 = 0.10;

/// Marks every settled piece above a gap as falling. Returns true if any piece
/// was newly detached.
pub fn apply_gravity(board: &mut Board, tuning: &Tuning) -> bool {
    let mut detached = false;
    for x in (0..BOARD_WIDTH).rev() {
        for gap in (1..BOARD_HEIGHT).rev() {
            if board.cell(x, gap) != Cell::EMPTY || !board.has_piece_above(x, gap) {
                continue;
            }
            for y in 0..gap {
                let tile = board.tile_mut(x, y);
                if tile.cell.is_empty() || tile.cell.is_falling() {
                    continue;
                }
                tile.cell.set_falling();
                tile.fall_delta = 0.0;
                tile.fall_hold = tuning.hold_time;
                detached = true;
            }
        }
    }
    detached
}

/// Outcome of advancing one falling tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FallStep {
    Holding,
    Sliding,
    Dropped,
    Landed,
}

fn advance_tile(board: &mut Board, x: usize, y: usize, dt: f32, tuning: &Tuning) -> FallStep {
    let tile = board.tile_mut(x, y);
    if tile.fall_hold > 0.0 {
        tile.fall_hold -= tuning.hold_decay_rate * dt;
        return FallStep::Holding;
    }
    if tile.fall_delta < -ARRIVAL_EPSILON {
        tile.fall_delta = (tile.fall_delta + tuning.fall_speed * dt).min(0.0);
        return FallStep::Sliding;
    }
    let blocked = y == BOARD_HEIGHT - 1 || !board.cell(x, y + 1).is_empty();
    if blocked {
        let tile = board.tile_mut(x, y);
        tile.cell.clear_falling();
        tile.fall_delta = 0.0;
        return FallStep::Landed;
    }
    let moving = *board.tile(x, y);
    let below = board.tile_mut(x, y + 1);
    below.cell = moving.cell;
    below.fall_delta = -TILE_SIZE;
    below.fall_hold = 0.0;
    let vacated = board.tile_mut(x, y);
    vacated.cell = Cell::EMPTY;
    vacated.fall_delta = 0.0;
    vacated.fall_hold = 0.0;
    FallStep::Dropped
}

/// Advances every falling piece, bottom to top. Returns true while any piece is still falling.
pub fn advance_falling(board: &mut Board, dt: f32, tuning: &Tuning) -> bool {
    let mut falling = false;
    for x in (0..BOARD_WIDTH).rev() {
        for y in (0..BOARD_HEIGHT).rev() {
            if !board.cell(x, y).is_falling() {
                continue;
            }
            falling |= advance_tile(board, x, y, dt, tuning) != FallStep::Landed;
        }
    }
    falling
}
