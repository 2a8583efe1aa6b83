//! The tile-grid engine: board model, move resolver, tile spawner and the
//! game state machine. Nothing here performs I/O or reads the clock.

use serde::{Deserialize, Serialize};
use std::fmt;

pub mod board;
pub mod resolver;
pub mod spawner;
pub mod state;

pub use board::{is_tile_value, Board, NewTile, Position, Tile, TileId, TileRegistry, GRID_SIZE};
pub use resolver::{resolve, MoveOutcome, Resolution};
pub use spawner::TileSpawner;
pub use state::{Command, GameMachine, GameState, Status};

/// A direction to move/merge tiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub const ALL: [Direction; 4] = [Direction::Up, Direction::Down, Direction::Left, Direction::Right];
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Direction::Up => "UP",
            Direction::Down => "DOWN",
            Direction::Left => "LEFT",
            Direction::Right => "RIGHT",
        };
        f.write_str(s)
    }
}
