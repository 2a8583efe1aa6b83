use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::SystemTime;
use tracing::{debug, info};

use super::board::{is_tile_value, render_values, Board, NewTile, Tile, TileRegistry, GRID_SIZE};
use super::resolver::{has_available_move, resolve, Resolution};
use super::spawner::TileSpawner;
use super::Direction;

/// Lifecycle of a game. `Lost` and `Ended` are terminal until a reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Status {
    Ongoing,
    Lost,
    Ended,
}

impl Status {
    #[inline]
    pub fn is_terminal(self) -> bool {
        !matches!(self, Status::Ongoing)
    }
}

/// Reducer actions accepted by [`GameMachine::dispatch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Move(Direction),
    /// Drop merge sources and close the post-move window.
    Cleanup,
    CreateTile(NewTile),
    /// Explicit end of game at the given wall-clock time.
    End { at: SystemTime },
    /// Discard everything and return to an empty `Ongoing` state.
    Reset,
}

/// Authoritative game state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameState {
    board: Board,
    tiles: TileRegistry,
    score: u64,
    max_score: u64,
    status: Status,
    game_end_time: Option<SystemTime>,
    has_changed: bool,
    generation: u64,
}

impl Default for GameState {
    fn default() -> Self {
        GameState {
            board: Board::EMPTY,
            tiles: TileRegistry::new(),
            score: 0,
            max_score: 0,
            status: Status::Ongoing,
            game_end_time: None,
            has_changed: false,
            generation: 0,
        }
    }
}

impl GameState {
    #[inline]
    pub fn board(&self) -> &Board {
        &self.board
    }

    #[inline]
    pub fn registry(&self) -> &TileRegistry {
        &self.tiles
    }

    /// Live tiles in insertion order, merge sources included while a move is pending.
    pub fn tiles(&self) -> impl Iterator<Item = &Tile> + '_ {
        self.tiles.iter()
    }

    #[inline]
    pub fn score(&self) -> u64 {
        self.score
    }

    /// Score frozen at the terminal transition; 0 while ongoing.
    #[inline]
    pub fn max_score(&self) -> u64 {
        self.max_score
    }

    #[inline]
    pub fn status(&self) -> Status {
        self.status
    }

    #[inline]
    pub fn game_end_time(&self) -> Option<SystemTime> {
        self.game_end_time
    }

    /// A move committed and its cleanup has not run yet.
    #[inline]
    pub fn has_changed(&self) -> bool {
        self.has_changed
    }

    /// Bumped by every committed move and every reset.
    #[inline]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn values(&self) -> [[u32; GRID_SIZE]; GRID_SIZE] {
        self.board.values(&self.tiles)
    }

    pub fn highest_tile(&self) -> u32 {
        self.board
            .occupied()
            .filter_map(|(_, id)| self.tiles.get(id))
            .map(|t| t.value)
            .max()
            .unwrap_or(0)
    }
}

impl fmt::Display for GameState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        render_values(&self.values(), f)
    }
}

/// Single-writer state machine around [`GameState`].
///
/// Every operation is total: inputs that do not apply in the current state
/// are ignored and reported as `false`.
#[derive(Debug, Clone, Default)]
pub struct GameMachine {
    state: GameState,
}

impl GameMachine {
    /// An empty, ongoing game with no tiles.
    pub fn new() -> Self {
        Self::default()
    }

    /// An ongoing game positioned on the given value grid (`[y][x]`, 0 = empty).
    pub fn from_values(values: [[u32; GRID_SIZE]; GRID_SIZE]) -> Self {
        let (board, tiles) = Board::from_values(values);
        GameMachine { state: GameState { board, tiles, ..GameState::default() } }
    }

    #[inline]
    pub fn state(&self) -> &GameState {
        &self.state
    }

    /// Apply one command. Returns whether the state changed.
    pub fn dispatch(&mut self, command: Command) -> bool {
        match command {
            Command::Reset => {
                self.reset_state();
                true
            }
            _ if self.state.status.is_terminal() => {
                debug!(?command, status = ?self.state.status, "command ignored in terminal state");
                false
            }
            Command::Move(dir) => self.apply_move(dir),
            Command::Cleanup => self.cleanup(),
            Command::CreateTile(tile) => self.create_tile(tile),
            Command::End { at } => self.end(at),
        }
    }

    /// Reset and place the two seed tiles drawn from `spawner`.
    pub fn reset<R: Rng>(&mut self, spawner: &mut TileSpawner<R>) {
        self.dispatch(Command::Reset);
        if let Some(seeds) = spawner.seed_pair(&self.state.board) {
            for seed in seeds {
                self.dispatch(Command::CreateTile(seed));
            }
        }
    }

    /// Explicitly end the game now.
    pub fn end_game(&mut self, at: SystemTime) -> bool {
        self.dispatch(Command::End { at })
    }

    /// Transition to `Lost` when no move can change the board.
    ///
    /// Only runs between moves (`has_changed` false) while ongoing. Returns
    /// true if the game was lost by this call.
    pub fn check_terminal(&mut self) -> bool {
        let state = &mut self.state;
        if state.has_changed || state.status.is_terminal() {
            return false;
        }
        if has_available_move(&state.board, &state.tiles) {
            return false;
        }
        state.status = Status::Lost;
        state.max_score = state.score;
        info!(score = state.score, "game lost");
        true
    }

    fn apply_move(&mut self, dir: Direction) -> bool {
        if self.state.has_changed {
            debug!(?dir, "move ignored: cleanup pending");
            return false;
        }
        match resolve(&self.state.board, &self.state.tiles, dir) {
            Resolution::NoOp => {
                debug!(?dir, "move is a no-op");
                false
            }
            Resolution::Moved(outcome) => {
                let state = &mut self.state;
                state.board = outcome.board;
                state.tiles = outcome.tiles;
                state.score += outcome.score_delta;
                state.has_changed = true;
                state.generation += 1;
                debug!(?dir, delta = outcome.score_delta, merges = outcome.created.len(), "move committed");
                true
            }
        }
    }

    fn cleanup(&mut self) -> bool {
        if !self.state.has_changed {
            return false;
        }
        self.settle();
        true
    }

    /// Drop every registered tile the board no longer references.
    fn settle(&mut self) {
        let state = &mut self.state;
        let board = state.board;
        state.tiles.retain(|t| board.get(t.position) == Some(t.id));
        state.has_changed = false;
    }

    fn create_tile(&mut self, tile: NewTile) -> bool {
        let state = &mut self.state;
        if !tile.position.in_bounds() || !is_tile_value(tile.value) {
            debug!(?tile, "create ignored: invalid tile");
            return false;
        }
        if state.board.get(tile.position).is_some() {
            debug!(?tile, "create ignored: cell occupied");
            return false;
        }
        let created = state.tiles.create(tile.value, tile.position);
        state.board.set(created.position, Some(created.id));
        true
    }

    fn end(&mut self, at: SystemTime) -> bool {
        if self.state.has_changed {
            self.settle();
        }
        let state = &mut self.state;
        state.status = Status::Ended;
        state.max_score = state.score;
        state.game_end_time = Some(at);
        info!(score = state.score, "game ended");
        true
    }

    fn reset_state(&mut self) {
        let generation = self.state.generation + 1;
        self.state = GameState { generation, ..GameState::default() };
    }
}
