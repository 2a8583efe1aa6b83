//! Replayable game records.
//!
//! A finished game is fully described by its spawn seed and the list of
//! accepted moves, plus whether it was ended before the last cleanup ran.
//! Layout on disk:
//!
//! ```text
//! 4 magic "M2R1" | 1 version | postcard(GameRecord) | 4 CRC32C (LE) of everything before
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::engine::{Direction, GameState, Status};
use crate::session::{GameSession, InputResult, ManualClock, SessionOptions, MOVE_THROTTLE};

const MAGIC: &[u8; 4] = b"M2R1";
const VERSION: u8 = 1;
const HEADER_LEN: usize = 5;
const TRAILER_LEN: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameRecord {
    /// Seed of the game's tile spawner.
    pub game_seed: u64,
    /// Accepted moves in order.
    pub moves: Vec<Direction>,
    pub final_score: u64,
    pub highest_tile: u32,
    pub status: Status,
    pub start_unix_s: u64,
    pub end_unix_s: u64,
    /// Ended before the last move's cleanup and spawn ran.
    pub cut_short: bool,
}

#[derive(thiserror::Error, Debug)]
pub enum RecordError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("invalid magic or version")]
    MagicOrVersion,
    #[error("file too short or malformed")]
    Malformed,
    #[error("checksum mismatch")]
    Checksum,
    #[error("postcard error: {0}")]
    Postcard(#[from] postcard::Error),
    #[error("move {index} ({dir}) was not accepted on replay")]
    IllegalMove { index: usize, dir: Direction },
    #[error("replayed score {actual} does not match recorded {expected}")]
    ScoreMismatch { expected: u64, actual: u64 },
    #[error("replayed status {actual:?} does not match recorded {expected:?}")]
    StatusMismatch { expected: Status, actual: Status },
}

pub fn encode_record(record: &GameRecord) -> Result<Vec<u8>, RecordError> {
    let body = postcard::to_allocvec(record)?;
    let mut buf = Vec::with_capacity(HEADER_LEN + body.len() + TRAILER_LEN);
    buf.extend_from_slice(MAGIC);
    buf.push(VERSION);
    buf.extend_from_slice(&body);
    let checksum = crc32c::crc32c(&buf);
    buf.extend_from_slice(&checksum.to_le_bytes());
    Ok(buf)
}

pub fn decode_record(bytes: &[u8]) -> Result<GameRecord, RecordError> {
    if bytes.len() < HEADER_LEN + TRAILER_LEN {
        return Err(RecordError::Malformed);
    }
    // Validate checksum first so a corrupt body never reaches the decoder
    let (content, trailer) = bytes.split_at(bytes.len() - TRAILER_LEN);
    let file_crc = u32::from_le_bytes([trailer[0], trailer[1], trailer[2], trailer[3]]);
    if file_crc != crc32c::crc32c(content) {
        return Err(RecordError::Checksum);
    }
    if &content[..4] != MAGIC || content[4] != VERSION {
        return Err(RecordError::MagicOrVersion);
    }
    Ok(postcard::from_bytes(&content[HEADER_LEN..])?)
}

pub fn write_record_to_path<P: AsRef<Path>>(path: P, record: &GameRecord) -> Result<(), RecordError> {
    let bytes = encode_record(record)?;
    fs::write(path, bytes)?;
    Ok(())
}

pub fn read_record_from_path<P: AsRef<Path>>(path: P) -> Result<GameRecord, RecordError> {
    let bytes = fs::read(path)?;
    decode_record(&bytes)
}

/// Re-run a record on a fresh session and check it lands where it claims.
///
/// Returns the replayed final state.
pub fn replay(record: &GameRecord) -> Result<GameState, RecordError> {
    let clock = ManualClock::default();
    let mut session = GameSession::new(SessionOptions { seed: Some(record.game_seed) }, clock.clone());
    session.start_seeded(record.game_seed);
    for (index, &dir) in record.moves.iter().enumerate() {
        clock.advance(MOVE_THROTTLE);
        if session.move_tiles(dir) != InputResult::Accepted {
            return Err(RecordError::IllegalMove { index, dir });
        }
    }
    if !record.cut_short {
        clock.advance(MOVE_THROTTLE);
        session.poll();
    }
    if record.status == Status::Ended {
        session.end_game();
    }
    let state = session.state();
    if state.status() != record.status {
        return Err(RecordError::StatusMismatch { expected: record.status, actual: state.status() });
    }
    if state.max_score() != record.final_score {
        return Err(RecordError::ScoreMismatch { expected: record.final_score, actual: state.max_score() });
    }
    Ok(state.clone())
}

pub fn unix_seconds(t: SystemTime) -> u64 {
    t.duration_since(UNIX_EPOCH).unwrap_or_default().as_secs()
}
