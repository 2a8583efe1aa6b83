use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use anyhow::Context;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use mint_2048::engine::{Direction, Status};
use mint_2048::record::{write_record_to_path, GameRecord};
use mint_2048::session::{GameSession, InputResult, ManualClock, SessionOptions, MOVE_THROTTLE};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rayon::prelude::*;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "simulate", about = "Play many random-policy 2048 games in parallel")]
struct Args {
    /// Number of games to play
    #[arg(long, default_value_t = 100)]
    games: u64,

    /// Base seed; game i uses seed + i
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// End a game after this many accepted moves
    #[arg(long)]
    max_moves: Option<usize>,

    /// Write each game's record into this directory
    #[arg(long)]
    out_dir: Option<PathBuf>,

    /// Suppress the progress bar and info logs
    #[arg(long)]
    quiet: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let default = if args.quiet { "warn" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    if let Some(dir) = &args.out_dir {
        fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    }

    let pb = if args.quiet { ProgressBar::hidden() } else { ProgressBar::new(args.games) };
    pb.set_style(
        ProgressStyle::with_template("{bar:40} {pos}/{len} games | {elapsed_precise} | {msg}")?
            .progress_chars("##-"),
    );

    let start = Instant::now();
    let records: Vec<GameRecord> = (0..args.games)
        .into_par_iter()
        .map(|i| {
            let record = play_random_game(args.seed.wrapping_add(i), args.max_moves);
            pb.inc(1);
            record
        })
        .collect::<Option<Vec<_>>>()
        .context("a simulated game did not finish")?;
    pb.finish_and_clear();

    if let Some(dir) = &args.out_dir {
        for (i, record) in records.iter().enumerate() {
            let path = dir.join(format!("game-{:06}.m2r", i));
            if let Err(e) = write_record_to_path(&path, record) {
                warn!(path = %path.display(), error = %e, "failed to write record");
            }
        }
    }

    let elapsed = start.elapsed().as_secs_f64().max(1e-6);
    let total_moves: usize = records.iter().map(|r| r.moves.len()).sum();
    let mean_score = records.iter().map(|r| r.final_score as f64).sum::<f64>() / records.len().max(1) as f64;
    let best = records.iter().map(|r| r.final_score).max().unwrap_or(0);
    let highest = records.iter().map(|r| r.highest_tile).max().unwrap_or(0);
    let lost = records.iter().filter(|r| r.status == Status::Lost).count();
    info!(games = records.len(), total_moves, elapsed_s = elapsed, "simulation finished");
    println!(
        "games: {} | lost: {} | mean score: {:.1} | best score: {} | highest tile: {} | moves/sec: {:.1}",
        records.len(),
        lost,
        mean_score,
        best,
        highest,
        total_moves as f64 / elapsed
    );
    Ok(())
}

/// Drive one session on a manual clock with uniformly random moves.
fn play_random_game(seed: u64, max_moves: Option<usize>) -> Option<GameRecord> {
    let clock = ManualClock::default();
    let mut session = GameSession::new(SessionOptions { seed: Some(seed) }, clock.clone());
    let mut policy = StdRng::seed_from_u64(seed ^ 0x9E37_79B9_7F4A_7C15);
    session.start_game();
    while session.status() == Status::Ongoing {
        if max_moves.is_some_and(|cap| session.history().len() >= cap) {
            session.end_game();
            break;
        }
        let mut dirs = Direction::ALL;
        dirs.shuffle(&mut policy);
        // A non-terminal board always has at least one accepted direction
        for dir in dirs {
            if session.move_tiles(dir) == InputResult::Accepted {
                break;
            }
        }
        clock.advance(MOVE_THROTTLE);
        session.poll();
    }
    session.record()
}
