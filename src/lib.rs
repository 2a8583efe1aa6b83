//! mint-2048: a 2048 tile engine with an animation-gated game session and
//! hooks for minting final scores.
//!
//! This crate provides:
//! - The tile engine (`engine` module): identity-bearing tiles on a 4x4 board,
//!   a pure move resolver, a seedable tile spawner and the game state machine
//! - A session controller (`session` module) that throttles input, runs the
//!   post-move cleanup after the merge animation and reports game over
//! - Replayable binary game records (`record` module)
//! - Wallet and score-sink contracts for minting a finished game (`mint` module)
//!
//! Quick start:
//! ```
//! use mint_2048::engine::{Command, Direction, GameMachine, TileSpawner};
//!
//! // Deterministic game with a seeded spawner
//! let mut spawner = TileSpawner::seeded(42);
//! let mut game = GameMachine::new();
//! game.reset(&mut spawner);
//! assert_eq!(game.state().tiles().count(), 2);
//!
//! // A move commits, then cleanup and a spawn close it out
//! if game.dispatch(Command::Move(Direction::Left)) || game.dispatch(Command::Move(Direction::Right)) {
//!     game.dispatch(Command::Cleanup);
//!     if let Some(tile) = spawner.spawn(game.state().board()) {
//!         game.dispatch(Command::CreateTile(tile));
//!     }
//!     game.check_terminal();
//! }
//! assert!(game.state().score() % 2 == 0);
//! ```
pub mod engine;
pub mod mint;
pub mod record;
pub mod session;
