//! 3x3 cluster detection and clearing.

use crate::board::{BOARD_HEIGHT, BOARD_WIDTH, Board, Cell, TILE_SIZE};
use crate::particles::ParticleSystem;
use rand::Rng;

/// Score awarded per destroyed cluster.
pub const CLUSTER_SCORE: u32 = 100;

/// Spark origins inside a tile, relative to its top-left pixel.
const SPARK_OFFSETS: [(f32, f32); 4] = [(0.0, 0.0), (16.0, 0.0), (0.0, 16.0), (16.0, 16.0)];

/// The 3x3 neighbourhood around (cx, cy), column-major.
fn neighbourhood(cx: usize, cy: usize) -> impl Iterator<Item = (usize, usize)> {
    (cx - 1..=cx + 1).flat_map(move |x| (cy - 1..=cy + 1).map(move |y| (x, y)))
}

/// True if the 3x3 block centred on (cx, cy) is complete: no empty or falling
/// cell and every cell identical.
pub fn is_cluster(board: &Board, cx: usize, cy: usize) -> bool {
    let first = board.cell(cx - 1, cy - 1);
    neighbourhood(cx, cy).all(|(x, y)| {
        let cell = board.cell(x, y);
        !cell.is_empty() && !cell.is_falling() && cell == first
    })
}

fn random_sign<R: Rng + ?Sized>(rng: &mut R) -> f32 {
    if rng.random_bool(0.5) { 1.0 } else { -1.0 }
}

/// Tags the cluster, throws four sparks per tile and empties it.
fn blow_up<R: Rng + ?Sized>(
    board: &mut Board,
    cx: usize,
    cy: usize,
    particles: &mut ParticleSystem,
    rng: &mut R,
    cleared: &mut Vec<(usize, usize)>,
) {
    for (x, y) in neighbourhood(cx, cy) {
        board.tile_mut(x, y).cell.mark_destroy();
    }
    for (x, y) in neighbourhood(cx, cy) {
        let cell = board.cell(x, y);
        if !cell.is_marked_destroy() {
            continue;
        }
        let (px, py) = (x as f32 * TILE_SIZE, y as f32 * TILE_SIZE);
        for (ox, oy) in SPARK_OFFSETS {
            let (sx, sy) = (random_sign(rng), random_sign(rng));
            particles.spawn(px + ox, py + oy, sx, sy, cell.occupancy(), rng);
        }
        board.set_cell(x, y, Cell::EMPTY);
        cleared.push((x, y));
    }
}

/// Scans every interior centre once, column-outer, row-inner, clearing
/// clusters as they are found. Cleared tiles are appended to `cleared`.
/// Returns how many clusters were destroyed.
pub fn clear_clusters<R: Rng + ?Sized>(
    board: &mut Board,
    particles: &mut ParticleSystem,
    rng: &mut R,
    cleared: &mut Vec<(usize, usize)>,
) -> u32 {
    let mut clusters = 0;
    for cx in 1..BOARD_WIDTH - 1 {
        for cy in 1..BOARD_HEIGHT - 1 {
            if is_cluster(board, cx, cy) {
                blow_up(board, cx, cy, particles, rng, cleared);
                clusters += 1;
            }
        }
    }
    clusters
}
