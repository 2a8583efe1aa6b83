use std::cell::RefCell;
use std::rc::Rc;

use mint_2048::engine::{Command, Direction, GameMachine, Status};
use mint_2048::mint::{submit_final_score, AccountId, ScoreSink, ScoreSubmission, SubmissionOutcome, WalletProvider};
use mint_2048::record::{decode_record, replay};
use mint_2048::session::{
    GameSession, InputResult, ManualClock, SessionOptions, Termination, MERGE_ANIMATION, MOVE_THROTTLE,
};

struct Connected;

impl WalletProvider for Connected {
    fn account(&self) -> Option<AccountId> {
        "0x0000000000000000000000000000000000002048".parse().ok()
    }
}

#[derive(Default)]
struct Ledger {
    minted: Vec<ScoreSubmission>,
}

impl ScoreSink for Ledger {
    fn submit(&mut self, submission: &ScoreSubmission) -> SubmissionOutcome {
        self.minted.push(submission.clone());
        SubmissionOutcome::Confirmed { tx_hash: format!("0x{:064x}", self.minted.len()) }
    }
}

fn session(seed: u64) -> (GameSession<ManualClock>, ManualClock) {
    let clock = ManualClock::default();
    let session = GameSession::new(SessionOptions { seed: Some(seed) }, clock.clone());
    (session, clock)
}

#[test]
fn it_plays_to_a_loss_then_mints_a_verifiable_score() {
    let (mut game, clock) = session(2048);
    let events = Rc::new(RefCell::new(Vec::new()));
    let sink = events.clone();
    game.on_termination(move |t| sink.borrow_mut().push(*t));
    game.start_game();

    let order = [Direction::Left, Direction::Down, Direction::Right, Direction::Down, Direction::Up];
    let mut last_score = 0;
    let mut i = 0;
    while game.status() == Status::Ongoing {
        game.move_tiles(order[i % order.len()]);
        i += 1;
        clock.advance(MOVE_THROTTLE);
        game.poll();

        let state = game.state();
        assert!(!state.has_changed());
        assert_eq!(state.board().occupied().count(), state.registry().len());
        assert!(state.board().is_consistent_with(state.registry()));
        assert!(game.score() >= last_score);
        assert_eq!(game.score() % 2, 0);
        last_score = game.score();
    }

    assert_eq!(game.status(), Status::Lost);
    assert_eq!(game.max_score(), game.score());
    assert_eq!(*events.borrow(), vec![Termination::Lost { score: game.score() }]);
    assert_eq!(game.move_tiles(Direction::Left), InputResult::Inactive);

    let mut ledger = Ledger::default();
    let outcome = submit_final_score(&game, &Connected, &mut ledger).unwrap();
    assert!(matches!(outcome, SubmissionOutcome::Confirmed { .. }));
    assert_eq!(ledger.minted.len(), 1);
    let proof = decode_record(&ledger.minted[0].proof).unwrap();
    assert_eq!(proof.moves, game.history());
    let replayed = replay(&proof).unwrap();
    assert_eq!(replayed.status(), Status::Lost);
    assert_eq!(replayed.max_score(), game.max_score());
    assert_eq!(replayed.values(), game.state().values());
}

#[test]
fn it_throttles_moves_inside_the_animation_window() {
    let (mut game, clock) = session(5);
    game.start_game();
    let first = Direction::ALL
        .into_iter()
        .find(|&d| game.move_tiles(d) == InputResult::Accepted)
        .unwrap();

    for dir in Direction::ALL {
        assert_eq!(game.move_tiles(dir), InputResult::Throttled);
    }
    clock.advance(MERGE_ANIMATION);
    assert!(game.poll());
    // Cleanup ran but the throttle window is still open
    assert_eq!(game.tiles().count(), game.state().board().occupied().count());
    for dir in Direction::ALL {
        assert_eq!(game.move_tiles(dir), InputResult::Throttled);
    }
    clock.advance(MOVE_THROTTLE - MERGE_ANIMATION);
    assert_eq!(game.history(), &[first]);
    let accepted = Direction::ALL.into_iter().any(|d| game.move_tiles(d) == InputResult::Accepted);
    assert!(accepted);
    assert_eq!(game.history().len(), 2);
}

#[test]
fn it_restart_supersedes_a_pending_cleanup() {
    let (mut game, clock) = session(77);
    game.start_game();
    assert!(Direction::ALL.into_iter().any(|d| game.move_tiles(d) == InputResult::Accepted));
    let stale = game.pending_generation().unwrap();

    game.start_game();
    let fresh = game.state().values();
    assert!(!game.complete_move(stale));
    clock.advance(MOVE_THROTTLE);
    assert!(!game.poll());
    assert_eq!(game.state().values(), fresh);
    assert_eq!(game.tiles().count(), 2);
    assert!(game.history().is_empty());
}

#[test]
fn it_ends_on_request_and_exports_the_record() {
    let (mut game, clock) = session(11);
    game.start_game();
    for key in ["ArrowLeft", "ArrowUp", "KeyD", "KeyS", "ArrowLeft", "KeyW"] {
        game.handle_key(key);
        clock.advance(MOVE_THROTTLE);
    }
    game.handle_swipe(-40.0, 3.0);
    assert!(game.end_game());
    assert!(!game.end_game());
    assert_eq!(game.status(), Status::Ended);
    assert!(game.game_end_time().is_some());
    assert!(!game.state().has_changed());

    let record = game.record().unwrap();
    assert_eq!(record.status, Status::Ended);
    assert_eq!(record.final_score, game.max_score());
    let replayed = replay(&record).unwrap();
    assert_eq!(replayed.values(), game.state().values());
}

#[test]
fn it_resolves_single_rows() {
    let mut machine = GameMachine::from_values([[2, 2, 0, 0], [0; 4], [0; 4], [0; 4]]);
    assert!(machine.dispatch(Command::Move(Direction::Left)));
    assert_eq!(machine.state().values()[0], [4, 0, 0, 0]);
    assert_eq!(machine.state().score(), 4);

    let mut machine = GameMachine::from_values([[2, 0, 2, 4], [0; 4], [0; 4], [0; 4]]);
    assert!(machine.dispatch(Command::Move(Direction::Right)));
    assert_eq!(machine.state().values()[0], [0, 0, 4, 4]);
    assert_eq!(machine.state().score(), 4);
}

#[test]
fn it_keeps_a_full_board_with_a_pair_alive() {
    let mut machine = GameMachine::from_values([[2, 4, 2, 4], [4, 2, 4, 2], [2, 4, 2, 4], [4, 2, 4, 4]]);
    assert!(!machine.check_terminal());
    assert_eq!(machine.state().status(), Status::Ongoing);
}
