//! Game state: board, incoming row, move animations, score, particles and the tick.

use crate::animator::{self, ColumnInversion, RowRotation};
use crate::board::{BOARD_HEIGHT, BOARD_WIDTH, Board, Occupancy};
use crate::config::Tuning;
use crate::gravity;
use crate::input::Intent;
use crate::matching::{self, CLUSTER_SCORE};
use crate::particles::ParticleSystem;
use log::{debug, info, trace};
use rand::SeedableRng;
use rand::rngs::StdRng;

/// Everything the simulation owns. The renderer only reads it.
#[derive(Debug)]
pub struct GameState {
    tuning: Tuning,
    rng: StdRng,
    seed: u64,
    board: Board,
    pending_row: [Occupancy; BOARD_WIDTH],
    new_row_delta: f32,
    row_anim: Option<RowRotation>,
    col_anim: Option<ColumnInversion>,
    /// Moving state as of the last settle check.
    was_moving: bool,
    score: u32,
    particles: ParticleSystem,
    /// Tiles cleared since the renderer last drained them.
    recent_clears: Vec<(usize, usize)>,
    pub clusters: u32,
    pub rows_added: u32,
    /// Simulated seconds since the board was initialised.
    pub elapsed: f32,
}

impl GameState {
    pub fn new(tuning: Tuning, seed: u64) -> Self {
        let mut state = Self {
            tuning,
            rng: StdRng::seed_from_u64(seed),
            seed,
            board: Board::new(),
            pending_row: [Occupancy::Empty; BOARD_WIDTH],
            new_row_delta: 0.0,
            row_anim: None,
            col_anim: None,
            was_moving: false,
            score: 0,
            particles: ParticleSystem::new(),
            recent_clears: Vec::new(),
            clusters: 0,
            rows_added: 0,
            elapsed: 0.0,
        };
        state.init_board();
        state
    }

    /// Resets the board to a fresh random start. The random stream carries on.
    pub fn init_board(&mut self) {
        self.board.random_fill(&mut self.rng);
        self.pending_row = self.random_row();
        self.new_row_delta = 0.0;
        self.row_anim = None;
        self.col_anim = None;
        self.was_moving = false;
        self.score = 0;
        self.particles.clear();
        self.recent_clears.clear();
        self.clusters = 0;
        self.rows_added = 0;
        self.elapsed = 0.0;
        info!("board initialised (seed {})", self.seed);
    }

    fn random_row(&mut self) -> [Occupancy; BOARD_WIDTH] {
        std::array::from_fn(|_| Occupancy::random_piece(&mut self.rng))
    }

    /// True while a row slide, a column morph or any fall is in progress.
    pub fn pieces_moving(&self) -> bool {
        self.row_anim.is_some() || self.col_anim.is_some() || self.board.any_falling()
    }

    /// Rotates a row right by one (with wrap) and starts its slide. Ignored while anything moves.
    pub fn rotate_row(&mut self, row: usize) {
        assert!(row < BOARD_HEIGHT, "row {row} out of range");
        if self.pieces_moving() {
            trace!("rotate row {row} ignored: board in motion");
            return;
        }
        self.board.rotate_row_right(row);
        self.row_anim = Some(RowRotation::start(row));
        self.was_moving = true;
    }

    /// Swaps black and white down a column and starts its morph. Ignored while anything moves.
    pub fn invert_column(&mut self, col: usize) {
        assert!(col < BOARD_WIDTH, "column {col} out of range");
        if self.pieces_moving() {
            trace!("invert column {col} ignored: board in motion");
            return;
        }
        self.board.invert_column(col);
        self.col_anim = Some(ColumnInversion::start(col));
        self.was_moving = true;
    }

    pub fn dispatch(&mut self, intent: Intent) {
        match intent {
            Intent::RotateRow(row) => self.rotate_row(row),
            Intent::InvertColumn(col) => self.invert_column(col),
        }
    }

    /// Clears every complete 3x3 cluster. Does nothing while pieces move.
    pub fn detect_and_clear_matches(&mut self) -> bool {
        if self.pieces_moving() {
            return false;
        }
        let found = matching::clear_clusters(
            &mut self.board,
            &mut self.particles,
            &mut self.rng,
            &mut self.recent_clears,
        );
        if found > 0 {
            self.score += CLUSTER_SCORE * found;
            self.clusters += found;
            debug!("cleared {found} cluster(s), score {}", self.score);
        }
        found > 0
    }

    /// Detaches pieces floating above gaps.
    pub fn apply_gravity(&mut self) {
        if gravity::apply_gravity(&mut self.board, &self.tuning) {
            debug!("gravity detached pieces");
        }
    }

    pub fn advance_falling(&mut self, dt: f32) -> bool {
        gravity::advance_falling(&mut self.board, dt, &self.tuning)
    }

    fn advance_animations(&mut self, dt: f32) {
        let tuning = self.tuning;
        if self.col_anim.as_mut().is_some_and(|a| !a.advance(dt, &tuning)) {
            self.col_anim = None;
        }
        if self.row_anim.as_mut().is_some_and(|a| !a.advance(dt, &tuning)) {
            self.row_anim = None;
        }
    }

    /// Runs one match pass then one gravity pass once motion has just stopped.
    fn settle_if_stopped(&mut self) {
        let moving = self.pieces_moving();
        if self.was_moving && !moving {
            debug!("board settled, checking clusters");
            self.detect_and_clear_matches();
            self.apply_gravity();
        }
        self.was_moving = self.pieces_moving();
    }

    fn advance_intake(&mut self, dt: f32) {
        if self.pieces_moving() {
            return;
        }
        if animator::advance_intake(&mut self.new_row_delta, dt, &self.tuning) {
            let row = self.pending_row;
            let lost = self.board.push_bottom_row(row);
            if lost.iter().any(|c| !c.is_empty()) {
                debug!("row pushed off the top carried pieces");
            }
            self.pending_row = self.random_row();
            self.new_row_delta = 0.0;
            self.rows_added += 1;
            info!("new row inserted ({} so far)", self.rows_added);
        }
    }

    /// One simulation step of `dt` seconds.
    pub fn tick(&mut self, dt: f32) {
        self.elapsed += dt;
        self.advance_falling(dt);
        self.advance_animations(dt);
        self.settle_if_stopped();
        self.particles.advance(dt);
        self.advance_intake(dt);
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn pending_row(&self) -> &[Occupancy; BOARD_WIDTH] {
        &self.pending_row
    }

    pub fn new_row_delta(&self) -> f32 {
        self.new_row_delta
    }

    pub fn row_animation(&self) -> Option<RowRotation> {
        self.row_anim
    }

    pub fn column_animation(&self) -> Option<ColumnInversion> {
        self.col_anim
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn particles(&self) -> &ParticleSystem {
        &self.particles
    }

    /// Hands over the tiles cleared since the last call.
    pub fn take_recent_clears(&mut self) -> Vec<(usize, usize)> {
        std::mem::take(&mut self.recent_clears)
    }

    #[cfg(test)]
    pub fn board_mut(&mut self) -> &mut Board {
        &mut self.board
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{Cell, board_from_rows};

    const DT: f32 = 1.0 / 60.0;

    fn state() -> GameState {
        GameState::new(Tuning::default(), 42)
    }

    fn run_until_settled(state: &mut GameState) -> usize {
        let mut ticks = 0;
        while state.pieces_moving() {
            state.tick(DT);
            ticks += 1;
            assert!(ticks < 10_000, "never settled");
        }
        ticks
    }

    fn moving_matches_parts(state: &GameState) -> bool {
        state.pieces_moving()
            == (state.row_animation().is_some()
                || state.column_animation().is_some()
                || state.board().any_falling())
    }

    #[test]
    fn test_init_board_layout() {
        let s = state();
        assert_eq!(s.score(), 0);
        assert!(!s.pieces_moving());
        assert_eq!(s.new_row_delta(), 0.0);
        assert!(s.pending_row().iter().all(|o| o.is_piece()));
        assert!(s.particles().is_empty());
        for y in 0..BOARD_HEIGHT - 10 {
            assert!(s.board().row(y).iter().all(Cell::is_empty));
        }
    }

    #[test]
    fn test_same_seed_same_board() {
        let a = state();
        let b = state();
        for y in 0..BOARD_HEIGHT {
            assert_eq!(a.board().row(y), b.board().row(y));
        }
        assert_eq!(a.pending_row(), b.pending_row());
    }

    #[test]
    fn test_rotate_alternating_bottom_row() {
        let mut s = state();
        let bottom = BOARD_HEIGHT - 1;
        for x in 0..BOARD_WIDTH {
            let cell = if x % 2 == 0 { Cell::BLACK } else { Cell::WHITE };
            s.board_mut().set_cell(x, bottom, cell);
        }
        s.rotate_row(bottom);
        let row = s.board().row(bottom);
        for (x, cell) in row.iter().enumerate() {
            let expected = if x % 2 == 0 { Cell::WHITE } else { Cell::BLACK };
            assert_eq!(*cell, expected);
        }
        assert!(s.pieces_moving());
        assert_eq!(s.row_animation().map(|a| a.delta), Some(-32.0));

        let mut last = -32.0;
        while let Some(anim) = s.row_animation() {
            assert!(anim.delta >= last);
            assert!(s.pieces_moving());
            last = anim.delta;
            s.tick(DT);
        }
        // Eligible for input again once everything settles.
        run_until_settled(&mut s);
        let before = s.board().row(bottom);
        s.rotate_row(bottom);
        assert!(s.row_animation().is_some());
        assert_eq!(s.board().row(bottom)[1], before[0]);
    }

    #[test]
    fn test_input_rejected_while_moving() {
        let mut s = state();
        s.rotate_row(12);
        let snapshot: Vec<_> = (0..BOARD_HEIGHT).map(|y| s.board().row(y)).collect();
        s.rotate_row(12);
        s.invert_column(4);
        s.dispatch(Intent::RotateRow(13));
        let after: Vec<_> = (0..BOARD_HEIGHT).map(|y| s.board().row(y)).collect();
        assert_eq!(snapshot, after);
        assert!(s.column_animation().is_none());
        assert_eq!(s.row_animation().map(|a| a.row), Some(12));
    }

    #[test]
    fn test_double_inversion_restores_colours() {
        let mut s = state();
        // Checkerboard so the inversions can't produce clusters.
        for y in 0..BOARD_HEIGHT {
            for x in 0..BOARD_WIDTH {
                let cell = if (x + y) % 2 == 0 { Cell::BLACK } else { Cell::WHITE };
                s.board_mut().set_cell(x, y, cell);
            }
        }
        let original: Vec<_> = (0..BOARD_HEIGHT).map(|y| s.board().row(y)).collect();
        s.invert_column(5);
        assert_ne!(s.board().row(0)[5], original[0][5]);
        run_until_settled(&mut s);
        s.invert_column(5);
        run_until_settled(&mut s);
        let after: Vec<_> = (0..BOARD_HEIGHT).map(|y| s.board().row(y)).collect();
        assert_eq!(original, after);
    }

    #[test]
    fn test_settle_clears_cluster_and_drops_pieces() {
        let mut s = state();
        *s.board_mut() = board_from_rows(&[
            "WW........",
            "BBBWBWBWBW",
            "BBBBWBWBWB",
            "BBBWBWBWBW",
            "WBWBWBWBWB",
        ]);
        // Rotating the top row moves nothing that matters but triggers a settle.
        s.rotate_row(BOARD_HEIGHT - 5);
        run_until_settled(&mut s);
        assert_eq!(s.score(), 100);
        assert_eq!(s.clusters, 1);
        assert_eq!(s.take_recent_clears().len(), 9);
        assert!(s.take_recent_clears().is_empty());
        // The white pieces that were resting on the cluster fell into the hole.
        let y = BOARD_HEIGHT - 2;
        assert_eq!(s.board().cell(1, y), Cell::WHITE);
        assert_eq!(s.board().cell(2, y), Cell::WHITE);
        assert_eq!(s.board().cell(0, y), Cell::EMPTY);
        assert!(s.board().invariants_hold());
    }

    #[test]
    fn test_direct_match_spawns_sparks() {
        let mut s = state();
        *s.board_mut() = board_from_rows(&["WBBBW", "BBBBB", "WBBBW", "BWBWB"]);
        assert!(s.detect_and_clear_matches());
        assert_eq!(s.score(), 100);
        assert_eq!(s.particles().len(), 36);
        assert!(!s.detect_and_clear_matches());
        assert_eq!(s.score(), 100);
    }

    #[test]
    fn test_matches_skipped_while_moving() {
        let mut s = state();
        *s.board_mut() = board_from_rows(&["BBB", "BBB", "BBB", "WBW"]);
        s.rotate_row(0);
        assert!(!s.detect_and_clear_matches());
        assert_eq!(s.score(), 0);
    }

    #[test]
    fn test_intake_inserts_pending_row() {
        let mut s = state();
        *s.board_mut() = board_from_rows(&["BWBWBWBWBW"]);
        let pending = *s.pending_row();
        // 5 px/s: a little over 6.4 s of settled play.
        let mut ticks = 0;
        while s.rows_added == 0 {
            s.tick(DT);
            ticks += 1;
            assert!(ticks < 60 * 10, "intake never fired");
        }
        assert_eq!(s.new_row_delta(), 0.0);
        let bottom = s.board().row(BOARD_HEIGHT - 1);
        assert_eq!(bottom.map(|c| c.occupancy()), pending);
        assert_eq!(s.board().row(BOARD_HEIGHT - 2)[0], Cell::BLACK);
        assert!(s.pending_row().iter().all(|o| o.is_piece()));
    }

    #[test]
    fn test_intake_paused_while_moving() {
        let mut s = state();
        s.rotate_row(14);
        s.tick(DT);
        assert_eq!(s.new_row_delta(), 0.0);
    }

    #[test]
    fn test_moving_flag_tracks_parts() {
        let mut s = state();
        assert!(moving_matches_parts(&s));
        s.invert_column(2);
        for _ in 0..600 {
            s.tick(DT);
            assert!(moving_matches_parts(&s));
            assert!(s.board().invariants_hold());
        }
    }

    #[test]
    fn test_init_board_resets_progress() {
        let mut s = state();
        s.rotate_row(10);
        s.tick(DT);
        s.init_board();
        assert!(!s.pieces_moving());
        assert_eq!(s.score(), 0);
        assert_eq!(s.rows_added, 0);
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn test_out_of_range_column_panics() {
        state().invert_column(BOARD_WIDTH);
    }
}
