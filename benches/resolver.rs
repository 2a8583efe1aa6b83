use criterion::{criterion_group, criterion_main, Criterion};
use mint_2048::engine::{resolve, Command, Direction, GameMachine, GameState, Resolution, TileSpawner};
use mint_2048::session::{GameSession, InputResult, ManualClock, SessionOptions, MOVE_THROTTLE};
use std::hint::black_box;

fn corpus() -> Vec<GameState> {
    let mut spawner = TileSpawner::seeded(7777);
    let mut game = GameMachine::new();
    game.reset(&mut spawner);
    let mut states = vec![game.state().clone()];
    let seq = [Direction::Left, Direction::Up, Direction::Right, Direction::Down];
    for i in 0..256 {
        if game.state().status().is_terminal() {
            game.reset(&mut spawner);
        }
        if game.dispatch(Command::Move(seq[i % seq.len()])) {
            game.dispatch(Command::Cleanup);
            if let Some(tile) = spawner.spawn(game.state().board()) {
                game.dispatch(Command::CreateTile(tile));
            }
            game.check_terminal();
        }
        states.push(game.state().clone());
    }
    states
}

fn bench_resolve(c: &mut Criterion) {
    let states = corpus();
    c.bench_function("resolver/all_directions", |b| {
        b.iter(|| {
            let mut acc = 0u64;
            for s in &states {
                for dir in Direction::ALL {
                    if let Resolution::Moved(out) = resolve(s.board(), s.registry(), dir) {
                        acc += out.score_delta;
                    }
                }
            }
            black_box(acc)
        })
    });
}

fn bench_session(c: &mut Criterion) {
    c.bench_function("session/128_moves", |b| {
        b.iter(|| {
            let clock = ManualClock::default();
            let mut session = GameSession::new(SessionOptions { seed: Some(13) }, clock.clone());
            session.start_game();
            let mut steps = 0;
            while steps < 128 && !session.status().is_terminal() {
                for dir in Direction::ALL {
                    if session.move_tiles(dir) == InputResult::Accepted {
                        break;
                    }
                }
                clock.advance(MOVE_THROTTLE);
                session.poll();
                steps += 1;
            }
            black_box(session.score())
        })
    });
}

criterion_group!(benches, bench_resolve, bench_session);
criterion_main!(benches);
