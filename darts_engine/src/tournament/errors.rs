//! Tournament error types.

use super::models::{BoardId, MatchId, MatchStatus, TournamentId, TournamentStatus};
use crate::roster::PlayerId;
use thiserror::Error;

/// Broad failure classes surfaced to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Operation not allowed in the current tournament state. Never retried.
    Precondition,
    /// Malformed result payload, rejected before any mutation.
    Validation,
    /// Unknown tournament, match, group, board or player.
    NotFound,
    /// Stored state contradicts itself (prior bug or concurrent corruption).
    Consistency,
    /// Database or serialization failure in the storage collaborator.
    Storage,
}

/// Tournament errors
#[derive(Debug, Error)]
pub enum TournamentError {
    #[error("Tournament not in correct state: expected {expected:?}, got {actual:?}")]
    InvalidState {
        expected: Vec<TournamentStatus>,
        actual: TournamentStatus,
    },

    #[error("Match {match_id} not in correct state: expected {expected:?}, got {actual:?}")]
    InvalidMatchState {
        match_id: MatchId,
        expected: MatchStatus,
        actual: MatchStatus,
    },

    #[error("Insufficient players: need {needed}, have {current}")]
    InsufficientPlayers { needed: usize, current: usize },

    #[error("Insufficient boards: need {needed}, have {available}")]
    InsufficientBoards { needed: usize, available: usize },

    #[error("Insufficient qualifiers: need {needed}, have {available}")]
    InsufficientQualifiers { needed: usize, available: usize },

    #[error("Group {group} would eliminate a negative number of players ({eliminations})")]
    NegativeEliminations { group: usize, eliminations: i64 },

    #[error("Group stage unfinished: {pending} matches still open")]
    GroupStageIncomplete { pending: usize },

    #[error("Knockout bracket not resolved")]
    BracketUnresolved,

    #[error("Duplicate player in roster: {0}")]
    DuplicatePlayer(PlayerId),

    #[error("Correcting match {match_id} would orphan finished match {downstream}")]
    CorrectionBlocked {
        match_id: MatchId,
        downstream: MatchId,
    },

    #[error("Winner {winner} did not play in match {match_id}")]
    WinnerNotInMatch { match_id: MatchId, winner: PlayerId },

    #[error("Invalid highest checkout: {0}")]
    InvalidCheckout(i64),

    #[error("Invalid 180 dart count: {0}")]
    InvalidOneEighty(i64),

    #[error("Leg winner {winner} did not play in match {match_id}")]
    LegWinnerNotInMatch { match_id: MatchId, winner: PlayerId },

    #[error("Leg count mismatch for player {player}: stats say {reported}, legs say {counted}")]
    LegCountMismatch {
        player: PlayerId,
        reported: u32,
        counted: u32,
    },

    #[error("Tournament not found: {0}")]
    TournamentNotFound(TournamentId),

    #[error("Match not found: {0}")]
    MatchNotFound(MatchId),

    #[error("Group {group} not found in tournament {tournament_id}")]
    GroupNotFound {
        tournament_id: TournamentId,
        group: usize,
    },

    #[error("Board {board_id} not found in tournament {tournament_id}")]
    BoardNotFound {
        tournament_id: TournamentId,
        board_id: BoardId,
    },

    #[error("Player not found: {0}")]
    PlayerNotFound(String),

    #[error("Standings of group {group} have no row for player {player}")]
    MissingStanding { group: usize, player: PlayerId },

    #[error("Reverting a result would drive standings of player {player} in group {group} negative")]
    StandingUnderflow { group: usize, player: PlayerId },

    #[error("Bracket inconsistent: {0}")]
    BracketInconsistent(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Malformed stored record: {0}")]
    MalformedRecord(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl TournamentError {
    /// Classify the error into the caller-facing taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            TournamentError::InvalidState { .. }
            | TournamentError::InvalidMatchState { .. }
            | TournamentError::InsufficientPlayers { .. }
            | TournamentError::InsufficientBoards { .. }
            | TournamentError::InsufficientQualifiers { .. }
            | TournamentError::NegativeEliminations { .. }
            | TournamentError::GroupStageIncomplete { .. }
            | TournamentError::BracketUnresolved
            | TournamentError::DuplicatePlayer(_)
            | TournamentError::CorrectionBlocked { .. } => ErrorKind::Precondition,

            TournamentError::WinnerNotInMatch { .. }
            | TournamentError::InvalidCheckout(_)
            | TournamentError::InvalidOneEighty(_)
            | TournamentError::LegWinnerNotInMatch { .. }
            | TournamentError::LegCountMismatch { .. } => ErrorKind::Validation,

            TournamentError::TournamentNotFound(_)
            | TournamentError::MatchNotFound(_)
            | TournamentError::GroupNotFound { .. }
            | TournamentError::BoardNotFound { .. }
            | TournamentError::PlayerNotFound(_) => ErrorKind::NotFound,

            TournamentError::MissingStanding { .. }
            | TournamentError::StandingUnderflow { .. }
            | TournamentError::BracketInconsistent(_) => ErrorKind::Consistency,

            TournamentError::Database(_)
            | TournamentError::Serialization(_)
            | TournamentError::MalformedRecord(_)
            | TournamentError::Configuration(_) => ErrorKind::Storage,
        }
    }

    /// Get a client-safe error message that doesn't leak storage internals
    pub fn client_message(&self) -> String {
        match self {
            TournamentError::Database(_) | TournamentError::Configuration(_) => {
                "Internal server error".to_string()
            }
            TournamentError::Serialization(_) | TournamentError::MalformedRecord(_) => {
                "Stored tournament data is malformed".to_string()
            }
            _ => self.to_string(),
        }
    }
}

/// Result type for tournament operations
pub type TournamentResult<T> = Result<T, TournamentError>;
