use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Instant;

use anyhow::Context;
use clap::{Parser, Subcommand};
use mint_2048::engine::{Direction, Status};
use mint_2048::record::{read_record_from_path, replay, write_record_to_path};
use mint_2048::session::{Clock, GameSession, InputResult, SessionOptions, Termination};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "mint-2048", version, about = "Play 2048 in the terminal and export replayable game records")]
struct Args {
    #[command(subcommand)]
    cmd: Option<Cmd>,

    /// Seed for the game's tile spawns (random when omitted)
    #[arg(long)]
    seed: Option<u64>,

    /// Write the finished game's record to this path
    #[arg(long)]
    out: Option<PathBuf>,

    /// Only log warnings and errors
    #[arg(long)]
    quiet: bool,
}

#[derive(Debug, Subcommand)]
enum Cmd {
    /// Verify a game record by replaying it
    Replay {
        /// Record file written with --out
        path: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.quiet);
    match args.cmd {
        Some(Cmd::Replay { path }) => run_replay(&path),
        None => run_play(args.seed, args.out),
    }
}

fn init_tracing(quiet: bool) {
    let default = if quiet { "warn" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(io::stderr).init();
}

fn parse_command(line: &str) -> Option<Input> {
    match line.trim().to_ascii_lowercase().as_str() {
        "w" | "up" | "k" => Some(Input::Move(Direction::Up)),
        "s" | "down" | "j" => Some(Input::Move(Direction::Down)),
        "a" | "left" | "h" => Some(Input::Move(Direction::Left)),
        "d" | "right" | "l" => Some(Input::Move(Direction::Right)),
        "end" => Some(Input::End),
        "new" => Some(Input::New),
        "q" | "quit" => Some(Input::Quit),
        _ => None,
    }
}

enum Input {
    Move(Direction),
    End,
    New,
    Quit,
}

fn run_play(seed: Option<u64>, out: Option<PathBuf>) -> anyhow::Result<()> {
    let mut session = GameSession::with_options(SessionOptions { seed });
    session.on_termination(|t| match t {
        Termination::Lost { score } => println!("Game over! Final score: {score}"),
        Termination::Ended { max_score, .. } => println!("Game ended. Final score: {max_score}"),
    });
    session.start_game();
    print_board(&session);

    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = line?;
        let Some(input) = parse_command(&line) else {
            println!("moves: w/a/s/d (or up/down/left/right), end, new, quit");
            continue;
        };
        match input {
            Input::Move(dir) => {
                if session.move_tiles(dir) == InputResult::Accepted {
                    // Play out the merge animation, then run the cleanup
                    if let Some(due) = session.next_deadline() {
                        thread::sleep(due.saturating_duration_since(Instant::now()));
                    }
                    session.poll();
                }
            }
            Input::End => {
                session.end_game();
            }
            Input::New => session.start_game(),
            Input::Quit => break,
        }
        print_board(&session);
        if session.status() != Status::Ongoing {
            if let (Some(path), Some(record)) = (&out, session.record()) {
                write_record_to_path(path, &record)
                    .with_context(|| format!("writing record to {}", path.display()))?;
                println!("Record written to {}", path.display());
            }
            println!("Type 'new' to play again or 'quit' to exit.");
        }
        io::stdout().flush()?;
    }
    Ok(())
}

fn print_board<C: Clock>(session: &GameSession<C>) {
    println!("{}", session.state());
    println!("Score: {} | Best: {}", session.score(), session.high_score());
}

fn run_replay(path: &Path) -> anyhow::Result<()> {
    let record = read_record_from_path(path).with_context(|| format!("reading {}", path.display()))?;
    let state = replay(&record)?;
    println!("{}", state);
    println!(
        "Verified: {} moves, status {:?}, score {}, highest tile {}",
        record.moves.len(),
        state.status(),
        state.max_score(),
        state.highest_tile()
    );
    Ok(())
}
