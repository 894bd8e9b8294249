//! Board model: cells, per-tile fall animation state, row/column edits.

use bitflags::bitflags;
use rand::Rng;
use std::collections::VecDeque;

pub const BOARD_WIDTH: usize = 10;
pub const BOARD_HEIGHT: usize = 15;

/// Rows filled with random pieces when a board is initialised (counted from the bottom).
pub const INITIAL_FILLED_ROWS: usize = 10;

/// Side of one tile in board pixels. All animation offsets are in these units.
pub const TILE_SIZE: f32 = 32.0;

/// What physically sits in a cell. Exactly one per cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Occupancy {
    #[default]
    Empty,
    Black,
    White,
}

impl Occupancy {
    /// Uniformly random piece colour (never Empty).
    pub fn random_piece<R: Rng + ?Sized>(rng: &mut R) -> Self {
        if rng.random_bool(0.5) {
            Self::White
        } else {
            Self::Black
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            Self::Black => Self::White,
            Self::White => Self::Black,
            Self::Empty => Self::Empty,
        }
    }

    #[inline]
    pub fn is_piece(self) -> bool {
        self != Self::Empty
    }
}

bitflags! {
    /// Transient state layered on top of the occupancy.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct CellFlags: u8 {
        const DESTROY = 0x10;
        const FALLING = 0x20;
    }
}

/// Occupancy plus transient flags. `FALLING` never sits on an Empty cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Cell {
    occupancy: Occupancy,
    flags: CellFlags,
}

impl Cell {
    pub const EMPTY: Self = Self {
        occupancy: Occupancy::Empty,
        flags: CellFlags::empty(),
    };
    pub const BLACK: Self = Self::settled(Occupancy::Black);
    pub const WHITE: Self = Self::settled(Occupancy::White);

    pub const fn settled(occupancy: Occupancy) -> Self {
        Self {
            occupancy,
            flags: CellFlags::empty(),
        }
    }

    #[inline]
    pub fn occupancy(&self) -> Occupancy {
        self.occupancy
    }

    #[inline]
    pub fn flags(&self) -> CellFlags {
        self.flags
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.occupancy == Occupancy::Empty
    }

    #[inline]
    pub fn is_falling(&self) -> bool {
        self.flags.contains(CellFlags::FALLING)
    }

    /// Marks a piece as falling. No-op on Empty.
    pub fn set_falling(&mut self) {
        if self.occupancy.is_piece() {
            self.flags.insert(CellFlags::FALLING);
        }
    }

    pub fn clear_falling(&mut self) {
        self.flags.remove(CellFlags::FALLING);
    }

    pub fn mark_destroy(&mut self) {
        if self.occupancy.is_piece() {
            self.flags.insert(CellFlags::DESTROY);
        }
    }

    #[inline]
    pub fn is_marked_destroy(&self) -> bool {
        self.flags.contains(CellFlags::DESTROY)
    }

    /// Swaps Black and White; flags are kept, Empty stays Empty.
    pub fn inverted(self) -> Self {
        Self {
            occupancy: self.occupancy.opposite(),
            flags: self.flags,
        }
    }
}

/// One board slot: the cell and its gravity animation state.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Tile {
    pub cell: Cell,
    /// Vertical pixel offset; 0 when settled, -32 right after a one-row drop.
    pub fall_delta: f32,
    /// Countdown before a detached piece starts dropping.
    pub fall_hold: f32,
}

impl Tile {
    fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Fixed-size grid. y=0 is the top row; new rows enter at the bottom.
#[derive(Debug, Clone)]
pub struct Board {
    /// rows[y][x]; rows[0] is the top.
    rows: VecDeque<[Tile; BOARD_WIDTH]>,
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

impl Board {
    pub fn new() -> Self {
        let rows = (0..BOARD_HEIGHT)
            .map(|_| [Tile::default(); BOARD_WIDTH])
            .collect();
        Self { rows }
    }

    /// Empties every tile, then fills the bottom rows with random pieces.
    pub fn random_fill<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        for row in &mut self.rows {
            row.iter_mut().for_each(Tile::reset);
        }
        // Column-major to keep the draw order of the random stream stable.
        for x in 0..BOARD_WIDTH {
            for y in BOARD_HEIGHT - INITIAL_FILLED_ROWS..BOARD_HEIGHT {
                self.rows[y][x].cell = Cell::settled(Occupancy::random_piece(rng));
            }
        }
    }

    #[inline]
    pub fn tile(&self, x: usize, y: usize) -> &Tile {
        &self.rows[y][x]
    }

    #[inline]
    pub fn tile_mut(&mut self, x: usize, y: usize) -> &mut Tile {
        &mut self.rows[y][x]
    }

    #[inline]
    pub fn cell(&self, x: usize, y: usize) -> Cell {
        self.rows[y][x].cell
    }

    #[inline]
    pub fn set_cell(&mut self, x: usize, y: usize, cell: Cell) {
        self.rows[y][x].cell = cell;
    }

    /// Row contents left to right.
    #[cfg(test)]
    pub fn row(&self, y: usize) -> [Cell; BOARD_WIDTH] {
        self.rows[y].map(|t| t.cell)
    }

    /// True if any non-empty cell sits strictly above `y` in column `x`.
    pub fn has_piece_above(&self, x: usize, y: usize) -> bool {
        (0..y).any(|above| !self.rows[above][x].cell.is_empty())
    }

    pub fn any_falling(&self) -> bool {
        self.rows
            .iter()
            .any(|row| row.iter().any(|t| t.cell.is_falling()))
    }

    /// Shifts a row one cell to the right; the last column wraps into column 0.
    pub fn rotate_row_right(&mut self, y: usize) {
        assert!(y < BOARD_HEIGHT, "row {y} out of range");
        self.rows[y].rotate_right(1);
    }

    /// Swaps Black and White down a whole column. Cells carrying transient flags are left alone.
    pub fn invert_column(&mut self, x: usize) {
        assert!(x < BOARD_WIDTH, "column {x} out of range");
        for row in &mut self.rows {
            let cell = row[x].cell;
            if cell.flags().is_empty() {
                row[x].cell = cell.inverted();
            }
        }
    }

    /// Moves everything up one row and appends `bottom`; returns the row pushed off the top.
    pub fn push_bottom_row(&mut self, bottom: [Occupancy; BOARD_WIDTH]) -> [Cell; BOARD_WIDTH] {
        let top = self
            .rows
            .pop_front()
            .map(|row| row.map(|t| t.cell))
            .unwrap_or([Cell::EMPTY; BOARD_WIDTH]);
        self.rows.push_back(bottom.map(|occupancy| Tile {
            cell: Cell::settled(occupancy),
            ..Tile::default()
        }));
        top
    }

    /// Occupancy invariant: FALLING never co-occurs with Empty.
    #[cfg(test)]
    pub fn invariants_hold(&self) -> bool {
        self.rows
            .iter()
            .flatten()
            .all(|t| !(t.cell.is_empty() && t.cell.is_falling()))
    }
}

/// Builds a board from a text picture, top row first: `B` black, `W` white,
/// `.` empty, `b`/`w` falling. Rows shorter than the board are padded with empty.
#[cfg(test)]
pub fn board_from_rows(rows: &[&str]) -> Board {
    let mut board = Board::new();
    let offset = BOARD_HEIGHT - rows.len();
    for (dy, line) in rows.iter().enumerate() {
        for (x, ch) in line.chars().enumerate() {
            let mut cell = match ch.to_ascii_uppercase() {
                'B' => Cell::BLACK,
                'W' => Cell::WHITE,
                _ => Cell::EMPTY,
            };
            if ch.is_ascii_lowercase() {
                cell.set_falling();
            }
            board.set_cell(x, offset + dy, cell);
        }
    }
    board
}
