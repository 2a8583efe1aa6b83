//! Game controller: turns input events into engine commands and runs the
//! post-move cleanup after the merge animation.
//!
//! A session is single-threaded and never blocks. After an accepted move it
//! arms one pending cleanup, due [`MERGE_ANIMATION`] later; the host calls
//! [`GameSession::poll`] (or [`GameSession::complete_move`] from its own timer)
//! to run cleanup, spawn a tile and check for a loss, in that order.
//!
//! ```
//! use mint_2048::engine::Direction;
//! use mint_2048::session::{GameSession, InputResult, ManualClock, SessionOptions, MOVE_THROTTLE};
//!
//! let clock = ManualClock::default();
//! let mut session = GameSession::new(SessionOptions { seed: Some(7) }, clock.clone());
//! session.start_game();
//! assert_eq!(session.tiles().count(), 2);
//!
//! for dir in Direction::ALL {
//!     if session.move_tiles(dir) == InputResult::Accepted {
//!         clock.advance(MOVE_THROTTLE);
//!         assert!(session.poll());
//!         break;
//!     }
//! }
//! assert!(!session.state().has_changed());
//! ```

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::{Duration, Instant, SystemTime};
use tracing::{debug, info, instrument};

use crate::engine::{Command, Direction, GameMachine, GameState, Status, Tile, TileSpawner};
use crate::record::{unix_seconds, GameRecord};

mod clock;
mod input;

pub use clock::{Clock, ManualClock, SystemClock};
pub use input::{direction_for_key, direction_for_swipe};

/// Length of the merge animation between a committed move and its cleanup.
pub const MERGE_ANIMATION: Duration = Duration::from_millis(100);

/// Moves are throttled for slightly longer than the animation.
pub const MOVE_THROTTLE: Duration = Duration::from_millis(105);

/// Library-level session knobs.
#[derive(Debug, Clone, Default)]
pub struct SessionOptions {
    /// Seed for the per-game seed stream; `None` draws from OS entropy.
    pub seed: Option<u64>,
}

/// What happened to a move request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputResult {
    Accepted,
    /// Dropped: inside the throttle window or a cleanup is still pending.
    Throttled,
    /// The board would not change.
    NoOp,
    /// The game is over.
    Inactive,
    /// The input event does not map to a direction.
    Unmapped,
}

/// How a game finished, reported to termination listeners.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    Lost { score: u64 },
    Ended { max_score: u64, at: SystemTime },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PendingCleanup {
    generation: u64,
    due: Instant,
}

type Listener = Box<dyn FnMut(&Termination)>;

/// One player's game session.
///
/// Owns the state machine, the spawner and the timing gate. Sessions share
/// nothing, so any number can run side by side.
pub struct GameSession<C: Clock = SystemClock> {
    machine: GameMachine,
    seeder: StdRng,
    spawner: TileSpawner<StdRng>,
    clock: C,
    game_seed: u64,
    throttle_until: Option<Instant>,
    pending: Option<PendingCleanup>,
    history: Vec<Direction>,
    started_at: SystemTime,
    finished_at: Option<SystemTime>,
    /// The game was ended while the last move's cleanup was still pending.
    cut_short: bool,
    /// Best terminal score of any game in this session.
    high_score: u64,
    listeners: Vec<Listener>,
}

impl GameSession<SystemClock> {
    pub fn with_options(options: SessionOptions) -> Self {
        GameSession::new(options, SystemClock)
    }
}

impl<C: Clock> GameSession<C> {
    /// Create a session. No game is running until [`start_game`](Self::start_game).
    pub fn new(options: SessionOptions, clock: C) -> Self {
        let seeder = match options.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let started_at = clock.wall();
        GameSession {
            machine: GameMachine::new(),
            seeder,
            spawner: TileSpawner::seeded(0),
            clock,
            game_seed: 0,
            throttle_until: None,
            pending: None,
            history: Vec::new(),
            started_at,
            finished_at: None,
            cut_short: false,
            high_score: 0,
            listeners: Vec::new(),
        }
    }

    /// Start a fresh game, superseding anything in flight.
    #[instrument(level = "debug", skip(self))]
    pub fn start_game(&mut self) {
        let game_seed = self.seeder.gen();
        self.start_seeded(game_seed);
    }

    /// Start a game whose spawns are fully determined by `game_seed`.
    pub fn start_seeded(&mut self, game_seed: u64) {
        self.game_seed = game_seed;
        self.spawner = TileSpawner::seeded(game_seed);
        self.machine.reset(&mut self.spawner);
        self.pending = None;
        self.throttle_until = None;
        self.history.clear();
        self.started_at = self.clock.wall();
        self.finished_at = None;
        self.cut_short = false;
        info!(game_seed, "game started");
    }

    /// Request a move.
    ///
    /// Fires a due cleanup first, then applies the throttle: while a move's
    /// window is open every further request is dropped, not queued.
    #[instrument(level = "debug", skip(self))]
    pub fn move_tiles(&mut self, dir: Direction) -> InputResult {
        self.poll();
        if self.machine.state().status().is_terminal() {
            return InputResult::Inactive;
        }
        let now = self.clock.now();
        if self.pending.is_some() || self.throttle_until.is_some_and(|until| now < until) {
            debug!("move throttled");
            return InputResult::Throttled;
        }
        if !self.machine.dispatch(Command::Move(dir)) {
            return InputResult::NoOp;
        }
        self.throttle_until = Some(now + MOVE_THROTTLE);
        self.pending = Some(PendingCleanup { generation: self.machine.state().generation(), due: now + MERGE_ANIMATION });
        self.history.push(dir);
        InputResult::Accepted
    }

    /// Keyboard entry point; see [`direction_for_key`].
    pub fn handle_key(&mut self, code: &str) -> InputResult {
        match direction_for_key(code) {
            Some(dir) => self.move_tiles(dir),
            None => InputResult::Unmapped,
        }
    }

    /// Touch entry point; see [`direction_for_swipe`].
    pub fn handle_swipe(&mut self, dx: f32, dy: f32) -> InputResult {
        match direction_for_swipe(dx, dy) {
            Some(dir) => self.move_tiles(dir),
            None => InputResult::Unmapped,
        }
    }

    /// Run the pending cleanup if its animation delay has elapsed.
    ///
    /// Returns true if cleanup ran.
    pub fn poll(&mut self) -> bool {
        match self.pending {
            Some(pending) if self.clock.now() >= pending.due => self.complete_move(pending.generation),
            _ => false,
        }
    }

    /// Run the cleanup armed by the move with `generation`, regardless of its
    /// due time. For hosts that drive their own timers; a callback whose
    /// generation no longer matches (the game moved on or was restarted) is
    /// ignored.
    pub fn complete_move(&mut self, generation: u64) -> bool {
        let Some(pending) = self.pending else {
            debug!(generation, "no cleanup pending");
            return false;
        };
        if pending.generation != generation || generation != self.machine.state().generation() {
            debug!(generation, current = self.machine.state().generation(), "stale cleanup dropped");
            return false;
        }
        self.pending = None;
        self.machine.dispatch(Command::Cleanup);
        if let Some(tile) = self.spawner.spawn(self.machine.state().board()) {
            self.machine.dispatch(Command::CreateTile(tile));
        }
        if !self.machine.state().has_changed() && self.machine.check_terminal() {
            let at = self.clock.wall();
            self.finish(at, Termination::Lost { score: self.machine.state().max_score() });
        }
        true
    }

    /// End the game on the player's request.
    ///
    /// A cleanup that is already due runs first, so its spawn and loss check
    /// happen before the end. Returns false if the game was already over,
    /// including when that cleanup lost it.
    #[instrument(level = "debug", skip(self))]
    pub fn end_game(&mut self) -> bool {
        self.poll();
        let at = self.clock.wall();
        if !self.machine.end_game(at) {
            return false;
        }
        // Ending mid-animation settles the board; the pending spawn never happens
        self.cut_short = self.pending.take().is_some();
        self.finish(at, Termination::Ended { max_score: self.machine.state().max_score(), at });
        true
    }

    fn finish(&mut self, at: SystemTime, event: Termination) {
        self.finished_at = Some(at);
        self.high_score = self.high_score.max(self.machine.state().max_score());
        self.notify(event);
    }

    /// Register a callback for loss and explicit end of game.
    pub fn on_termination<F: FnMut(&Termination) + 'static>(&mut self, listener: F) {
        self.listeners.push(Box::new(listener));
    }

    fn notify(&mut self, event: Termination) {
        info!(?event, "game terminated");
        for listener in self.listeners.iter_mut() {
            listener(&event);
        }
    }

    /// Tiles in insertion order, for rendering keyed by tile id.
    pub fn tiles(&self) -> impl Iterator<Item = &Tile> + '_ {
        self.machine.state().tiles()
    }

    #[inline]
    pub fn state(&self) -> &GameState {
        self.machine.state()
    }

    #[inline]
    pub fn score(&self) -> u64 {
        self.machine.state().score()
    }

    #[inline]
    pub fn status(&self) -> Status {
        self.machine.state().status()
    }

    #[inline]
    pub fn max_score(&self) -> u64 {
        self.machine.state().max_score()
    }

    #[inline]
    pub fn game_end_time(&self) -> Option<SystemTime> {
        self.machine.state().game_end_time()
    }

    /// Best final score across every finished game of this session.
    #[inline]
    pub fn high_score(&self) -> u64 {
        self.high_score
    }

    /// When the current game reached a terminal state, lost or ended.
    #[inline]
    pub fn finished_at(&self) -> Option<SystemTime> {
        self.finished_at
    }

    #[inline]
    pub fn game_seed(&self) -> u64 {
        self.game_seed
    }

    /// Accepted moves of the current game, in order.
    pub fn history(&self) -> &[Direction] {
        &self.history
    }

    /// When the pending cleanup becomes due, if one is armed.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.map(|p| p.due)
    }

    /// Generation captured by the pending cleanup, if one is armed.
    pub fn pending_generation(&self) -> Option<u64> {
        self.pending.map(|p| p.generation)
    }

    /// A replayable record of the finished game; `None` while ongoing.
    pub fn record(&self) -> Option<GameRecord> {
        let state = self.machine.state();
        if !state.status().is_terminal() {
            return None;
        }
        Some(GameRecord {
            game_seed: self.game_seed,
            moves: self.history.clone(),
            final_score: state.max_score(),
            highest_tile: state.highest_tile(),
            status: state.status(),
            start_unix_s: unix_seconds(self.started_at),
            end_unix_s: self.finished_at.map(unix_seconds).unwrap_or_default(),
            cut_short: self.cut_short,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn session(seed: u64) -> (GameSession<ManualClock>, ManualClock) {
        let clock = ManualClock::default();
        let mut s = GameSession::new(SessionOptions { seed: Some(seed) }, clock.clone());
        s.start_game();
        (s, clock)
    }

    /// First direction that changes the board.
    fn accept_any(s: &mut GameSession<ManualClock>) -> Direction {
        for dir in Direction::ALL {
            if s.move_tiles(dir) == InputResult::Accepted {
                return dir;
            }
        }
        panic!("no legal move on a fresh board");
    }

    #[test]
    fn test_start_game_seeds_two_tiles() {
        for seed in 0..50 {
            let (s, _) = session(seed);
            let values: Vec<u32> = s.tiles().map(|t| t.value).collect();
            assert_eq!(values.len(), 2);
            assert!(values.iter().all(|v| *v == 2 || *v == 4));
            assert!(values.contains(&2));
            assert_eq!(s.status(), Status::Ongoing);
        }
    }

    #[test]
    fn test_burst_collapses_to_first_move() {
        let (mut s, clock) = session(1);
        let first = accept_any(&mut s);
        for dir in Direction::ALL {
            assert_eq!(s.move_tiles(dir), InputResult::Throttled);
        }
        assert_eq!(s.history(), &[first]);

        clock.advance(MERGE_ANIMATION);
        assert!(s.poll());
        // cleanup ran but the throttle window is still open
        for dir in Direction::ALL {
            assert_eq!(s.move_tiles(dir), InputResult::Throttled);
        }
        clock.advance(MOVE_THROTTLE - MERGE_ANIMATION);
        accept_any(&mut s);
        assert_eq!(s.history().len(), 2);
    }

    #[test]
    fn test_cleanup_waits_for_animation() {
        let (mut s, clock) = session(2);
        accept_any(&mut s);
        assert!(s.state().has_changed());
        clock.advance(MERGE_ANIMATION - Duration::from_millis(1));
        assert!(!s.poll());
        assert!(s.state().has_changed());
        clock.advance(Duration::from_millis(1));
        assert!(s.poll());
        assert!(!s.state().has_changed());
        assert_eq!(s.next_deadline(), None);
        let live = s.tiles().count();
        assert_eq!(live, s.state().board().occupied().count());
    }

    #[test]
    fn test_spawn_after_cleanup() {
        let (mut s, clock) = session(3);
        let before: usize = s.tiles().count();
        accept_any(&mut s);
        clock.advance(MERGE_ANIMATION);
        s.poll();
        let merged = before + 1 - s.tiles().count();
        assert!(merged <= 1);
        assert_eq!(s.state().board().occupied().count(), s.tiles().count());
    }

    #[test]
    fn test_stale_timer_after_restart_is_ignored() {
        let (mut s, clock) = session(4);
        accept_any(&mut s);
        let stale = s.pending_generation().unwrap();
        s.start_game();
        let fresh = s.state().clone();
        assert!(!s.complete_move(stale));
        clock.advance(MOVE_THROTTLE);
        assert!(!s.poll());
        assert_eq!(s.state(), &fresh);
        assert!(s.history().is_empty());
    }

    #[test]
    fn test_host_timer_with_current_generation() {
        let (mut s, _clock) = session(5);
        accept_any(&mut s);
        let generation = s.pending_generation().unwrap();
        assert!(!s.complete_move(generation + 1));
        assert!(s.complete_move(generation));
        assert!(!s.complete_move(generation));
    }

    #[test]
    fn test_end_game_notifies_and_freezes() {
        let (mut s, clock) = session(6);
        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = events.clone();
        s.on_termination(move |t| sink.borrow_mut().push(*t));

        accept_any(&mut s);
        clock.advance(Duration::from_secs(3));
        assert!(s.end_game());
        assert_eq!(s.status(), Status::Ended);
        assert_eq!(s.max_score(), s.score());
        assert_eq!(s.game_end_time(), Some(SystemTime::UNIX_EPOCH + Duration::from_secs(3)));
        assert_eq!(s.move_tiles(Direction::Left), InputResult::Inactive);
        assert!(!s.end_game());
        assert_eq!(
            events.borrow().as_slice(),
            &[Termination::Ended { max_score: s.score(), at: SystemTime::UNIX_EPOCH + Duration::from_secs(3) }]
        );
        let record = s.record().unwrap();
        assert_eq!(record.moves.len(), 1);
        assert_eq!(record.status, Status::Ended);
    }

    #[test]
    fn test_end_game_runs_overdue_cleanup() {
        let (mut s, clock) = session(3);
        accept_any(&mut s);
        let occupied = s.state().board().occupied().count();
        clock.advance(MERGE_ANIMATION * 5);
        assert!(s.end_game());
        assert_eq!(s.state().board().occupied().count(), occupied + 1);
        assert_eq!(s.tiles().count(), occupied + 1);
        let record = s.record().unwrap();
        assert!(!record.cut_short);
        assert_eq!(crate::record::replay(&record).unwrap().values(), s.state().values());
    }

    #[test]
    fn test_high_score_survives_restart() {
        let (mut s, clock) = session(12);
        assert_eq!(s.high_score(), 0);
        while s.score() == 0 && s.status() == Status::Ongoing {
            accept_any(&mut s);
            clock.advance(MOVE_THROTTLE);
        }
        assert!(s.end_game());
        let first = s.max_score();
        assert!(first > 0);
        assert_eq!(s.high_score(), first);

        s.start_game();
        assert_eq!(s.max_score(), 0);
        assert_eq!(s.high_score(), first);
        accept_any(&mut s);
        clock.advance(MOVE_THROTTLE);
        assert!(s.end_game());
        assert_eq!(s.high_score(), first.max(s.max_score()));
    }

    #[test]
    fn test_unmapped_input() {
        let (mut s, _) = session(8);
        assert_eq!(s.handle_key("Enter"), InputResult::Unmapped);
        assert_eq!(s.handle_swipe(0.0, 0.0), InputResult::Unmapped);
        assert!(s.record().is_none());
    }

    #[test]
    fn it_plays_until_lost() {
        let (mut s, clock) = session(10);
        let lost = Rc::new(RefCell::new(None));
        let sink = lost.clone();
        s.on_termination(move |t| *sink.borrow_mut() = Some(*t));

        let mut last_score = 0;
        let mut steps = 0;
        while s.status() == Status::Ongoing && steps < 100_000 {
            for dir in [Direction::Left, Direction::Down, Direction::Right, Direction::Up] {
                if s.move_tiles(dir) == InputResult::Accepted {
                    break;
                }
            }
            clock.advance(MOVE_THROTTLE);
            s.poll();
            assert!(s.score() >= last_score);
            last_score = s.score();
            steps += 1;
        }
        assert_eq!(s.status(), Status::Lost);
        assert_eq!(*lost.borrow(), Some(Termination::Lost { score: s.score() }));
        assert_eq!(s.max_score(), s.score());
        assert!(s.finished_at().is_some());
    }
}
