use rand::rngs::StdRng;
use rand::seq::{index, SliceRandom};
use rand::{Rng, SeedableRng};

use super::board::{Board, NewTile, Position};

/// Chance that an in-game spawn is a 4 instead of a 2.
pub const FOUR_PROBABILITY: f64 = 0.1;

/// Picks where new tiles appear and what they are worth.
///
/// All randomness in the engine flows through the wrapped RNG, so a seeded
/// RNG reproduces a whole game exactly.
#[derive(Debug, Clone)]
pub struct TileSpawner<R> {
    rng: R,
}

impl TileSpawner<StdRng> {
    /// Deterministic spawner for a given seed.
    pub fn seeded(seed: u64) -> Self {
        TileSpawner::new(StdRng::seed_from_u64(seed))
    }

    /// Spawner seeded from OS entropy, for unseeded sessions.
    pub fn from_entropy() -> Self {
        TileSpawner::new(StdRng::from_entropy())
    }
}

impl<R: Rng> TileSpawner<R> {
    /// Wrap any RNG.
    ///
    /// ```
    /// use mint_2048::engine::{Board, TileSpawner};
    /// use rand::{rngs::StdRng, SeedableRng};
    /// let mut spawner = TileSpawner::new(StdRng::seed_from_u64(1));
    /// let tile = spawner.spawn(&Board::EMPTY).unwrap();
    /// assert!(tile.value == 2 || tile.value == 4);
    /// ```
    pub fn new(rng: R) -> Self {
        TileSpawner { rng }
    }

    /// A uniformly chosen empty cell, or `None` on a full board.
    pub fn spawn_position(&mut self, board: &Board) -> Option<Position> {
        board.empty_cells().choose(&mut self.rng).copied()
    }

    /// Value of an ordinary post-move spawn: 2 (90%) or 4 (10%).
    pub fn spawn_value(&mut self) -> u32 {
        if self.rng.gen_bool(FOUR_PROBABILITY) { 4 } else { 2 }
    }

    /// Pick a cell and a value for an ordinary post-move spawn.
    pub fn spawn(&mut self, board: &Board) -> Option<NewTile> {
        let position = self.spawn_position(board)?;
        Some(NewTile { position, value: self.spawn_value() })
    }

    /// The two seed tiles of a fresh game.
    ///
    /// Cells are two distinct empty cells chosen uniformly. The first value is
    /// 2 or 4 with equal odds; a 2 is followed by another fair 2-or-4 draw, a
    /// 4 forces the second value to 2. Returns `None` with fewer than two
    /// empty cells.
    pub fn seed_pair(&mut self, board: &Board) -> Option<[NewTile; 2]> {
        let empty = board.empty_cells();
        if empty.len() < 2 {
            return None;
        }
        let picked = index::sample(&mut self.rng, empty.len(), 2);
        let first_value = if self.rng.gen_bool(0.5) { 2 } else { 4 };
        let second_value = match first_value {
            2 if self.rng.gen_bool(0.5) => 4,
            _ => 2,
        };
        Some([
            NewTile { position: empty[picked.index(0)], value: first_value },
            NewTile { position: empty[picked.index(1)], value: second_value },
        ])
    }
}
