//! Move resolution: slide and merge every line toward the move's edge.
//!
//! The resolver is pure. Given the same board, registry and direction it
//! always returns the same result, including the ids it allocates for merged
//! tiles (they come from the registry's own counter).

use super::board::{Board, Position, Tile, TileId, TileRegistry, GRID_SIZE};
use super::Direction;

/// Everything a committed move changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveOutcome {
    pub board: Board,
    /// Registry after the move. Merge sources are still present, parked on
    /// their destination cell, until the post-move cleanup drops them.
    pub tiles: TileRegistry,
    /// Tiles consumed by a merge, at the position they slid to.
    pub removed: Vec<Tile>,
    /// Tiles produced by merges.
    pub created: Vec<Tile>,
    /// Sum of the values of all created tiles.
    pub score_delta: u64,
}

/// Result of resolving a move.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Nothing slid and nothing merged; the board is unchanged.
    NoOp,
    Moved(MoveOutcome),
}

impl Resolution {
    #[inline]
    pub fn is_noop(&self) -> bool {
        matches!(self, Resolution::NoOp)
    }
}

/// Cells of line `idx` ordered from the leading edge of `dir` inward.
///
/// For horizontal moves a line is a row, for vertical moves a column.
pub fn line_positions(dir: Direction, idx: usize) -> [Position; GRID_SIZE] {
    let mut out = [Position::new(0, 0); GRID_SIZE];
    for (step, slot) in out.iter_mut().enumerate() {
        let far = GRID_SIZE - 1 - step;
        *slot = match dir {
            Direction::Left => Position::new(step, idx),
            Direction::Right => Position::new(far, idx),
            Direction::Up => Position::new(idx, step),
            Direction::Down => Position::new(idx, far),
        };
    }
    out
}

/// Slide and merge all tiles toward `dir`.
///
/// Each line is resolved in a single pass from the leading edge: a tile merges
/// into the last placed tile when their values match and that tile is not
/// itself a merge product. Tiles that neither slide nor merge keep their id
/// and position.
pub fn resolve(board: &Board, tiles: &TileRegistry, dir: Direction) -> Resolution {
    let mut next_board = Board::EMPTY;
    let mut next_tiles = tiles.clone();
    let mut removed = Vec::new();
    let mut created = Vec::new();
    let mut score_delta = 0u64;
    let mut changed = false;

    for idx in 0..GRID_SIZE {
        let cells = line_positions(dir, idx);
        let mut fill = 0usize;
        // (slot, id, value) of the last placed tile that may still absorb a neighbour
        let mut open: Option<(usize, TileId, u32)> = None;

        for &pos in &cells {
            let Some(id) = board.get(pos) else { continue };
            let Some(tile) = tiles.get(id).copied() else { continue };

            match open.filter(|&(_, _, v)| v == tile.value).zip(tile.value.checked_mul(2)) {
                Some(((slot, target_id, _), doubled)) => {
                    let dest = cells[slot];
                    next_tiles.relocate(id, dest);
                    let merged = next_tiles.create(doubled, dest);
                    next_board.set(dest, Some(merged.id));
                    if let Some(target) = next_tiles.get(target_id) {
                        removed.push(*target);
                    }
                    removed.push(Tile { position: dest, ..tile });
                    created.push(merged);
                    score_delta += u64::from(merged.value);
                    open = None;
                    changed = true;
                }
                _ => {
                    let dest = cells[fill];
                    if dest != pos {
                        next_tiles.relocate(id, dest);
                        changed = true;
                    }
                    next_board.set(dest, Some(id));
                    open = Some((fill, id, tile.value));
                    fill += 1;
                }
            }
        }
    }

    if !changed {
        return Resolution::NoOp;
    }
    Resolution::Moved(MoveOutcome { board: next_board, tiles: next_tiles, removed, created, score_delta })
}

/// True if some move in any direction would change the board: an empty cell
/// or two orthogonally adjacent tiles with equal value.
pub fn has_available_move(board: &Board, tiles: &TileRegistry) -> bool {
    if !board.is_full() {
        return true;
    }
    let values = board.values(tiles);
    for y in 0..GRID_SIZE {
        for x in 0..GRID_SIZE {
            let v = values[y][x];
            if v.checked_mul(2).is_none() {
                continue;
            }
            if x + 1 < GRID_SIZE && values[y][x + 1] == v {
                return true;
            }
            if y + 1 < GRID_SIZE && values[y + 1][x] == v {
                return true;
            }
        }
    }
    false
}
