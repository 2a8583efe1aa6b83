//! Boundary to the wallet and the score-minting contract.
//!
//! The engine never talks to a chain. It hands a [`ScoreSubmission`] to a
//! [`ScoreSink`] once, on the player's request, after the game reached a
//! terminal state. Whatever the sink answers, the game state is untouched.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{info, warn};

use crate::record::{encode_record, unix_seconds, RecordError};
use crate::session::{Clock, GameSession};

/// A connected account address (`0x` followed by 40 hex digits).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccountId(String);

impl AccountId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for AccountId {
    type Err = MintError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s.strip_prefix("0x").ok_or_else(|| MintError::InvalidAddress(s.to_string()))?;
        if hex.len() != 40 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(MintError::InvalidAddress(s.to_string()));
        }
        Ok(AccountId(s.to_string()))
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Supplies the connected account, if any.
pub trait WalletProvider {
    fn account(&self) -> Option<AccountId>;
}

/// Records a final score as a mint transaction.
pub trait ScoreSink {
    fn submit(&mut self, submission: &ScoreSubmission) -> SubmissionOutcome;
}

/// Token metadata attached to a minted score.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NftMetadata {
    pub name: String,
    pub description: String,
    pub score: u64,
    pub highest_tile: u32,
    pub timestamp: u64,
}

impl NftMetadata {
    pub fn new(score: u64, highest_tile: u32, timestamp: u64) -> Self {
        NftMetadata {
            name: format!("2048 Game Score - {score}"),
            description: format!("Score achieved in 2048 game: {score}"),
            score,
            highest_tile,
            timestamp,
        }
    }

    pub fn to_json(&self) -> Result<String, MintError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Everything the sink needs to mint one finished game.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreSubmission {
    pub account: AccountId,
    pub score: u64,
    pub ended_at_unix_s: u64,
    pub metadata: NftMetadata,
    /// Encoded game record for verifiers that want to replay the game.
    pub proof: Vec<u8>,
}

/// Answer from the sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionOutcome {
    Confirmed { tx_hash: String },
    Rejected { reason: String },
    /// The player declined to sign.
    Cancelled,
}

impl SubmissionOutcome {
    /// Text for the user-visible notice.
    pub fn notice(&self) -> String {
        match self {
            SubmissionOutcome::Confirmed { .. } => "NFT mint success!".to_string(),
            SubmissionOutcome::Rejected { reason } => format!("Mint failed: {reason}"),
            SubmissionOutcome::Cancelled => "User cancelled transaction".to_string(),
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum MintError {
    #[error("game is still in progress")]
    NotTerminal,
    #[error("wallet not connected")]
    WalletNotConnected,
    #[error("invalid address: {0}")]
    InvalidAddress(String),
    #[error("metadata encoding failed: {0}")]
    Metadata(#[from] serde_json::Error),
    #[error("record encoding failed: {0}")]
    Record(#[from] RecordError),
}

/// Build the submission for a finished session.
pub fn prepare_submission<C: Clock>(session: &GameSession<C>, account: AccountId) -> Result<ScoreSubmission, MintError> {
    let record = session.record().ok_or(MintError::NotTerminal)?;
    let ended_at_unix_s = session.finished_at().map(unix_seconds).unwrap_or(record.end_unix_s);
    let metadata = NftMetadata::new(record.final_score, record.highest_tile, ended_at_unix_s);
    Ok(ScoreSubmission {
        account,
        score: record.final_score,
        ended_at_unix_s,
        metadata,
        proof: encode_record(&record)?,
    })
}

/// Submit the session's final score exactly once. No retries.
///
/// Precondition failures come back as `Err`; anything the sink says,
/// including rejection and cancellation, is an `Ok` outcome for the UI to
/// surface.
pub fn submit_final_score<C: Clock>(
    session: &GameSession<C>,
    wallet: &dyn WalletProvider,
    sink: &mut dyn ScoreSink,
) -> Result<SubmissionOutcome, MintError> {
    if !session.status().is_terminal() {
        return Err(MintError::NotTerminal);
    }
    let account = wallet.account().ok_or(MintError::WalletNotConnected)?;
    let submission = prepare_submission(session, account)?;
    info!(score = submission.score, account = %submission.account, "submitting score");
    let outcome = sink.submit(&submission);
    match &outcome {
        SubmissionOutcome::Confirmed { tx_hash } => info!(%tx_hash, "score minted"),
        SubmissionOutcome::Rejected { reason } => warn!(%reason, "score submission rejected"),
        SubmissionOutcome::Cancelled => warn!("score submission cancelled"),
    }
    Ok(outcome)
}
