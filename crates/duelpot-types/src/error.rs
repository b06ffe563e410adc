//! Error types for the Duelpot escrow engine.
//!
//! All errors use the `DP_ERR_` prefix convention for easy grepping in logs.
//! Error codes are grouped by subsystem:
//! - 1xx: Match / validation errors
//! - 2xx: Funds errors
//! - 3xx: Settlement errors
//! - 4xx: Chain errors
//! - 5xx: Custody errors
//! - 9xx: General / internal errors

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{MatchId, Network, TransactionId};

/// Central error enum for all Duelpot operations.
#[derive(Debug, Error)]
pub enum DuelpotError {
    // =================================================================
    // Match / Validation Errors (1xx)
    // =================================================================
    /// No match is registered under this ID.
    #[error("DP_ERR_100: Match not found: {0}")]
    MatchNotFound(MatchId),

    /// A match with this ID already exists.
    #[error("DP_ERR_101: Match already exists: {0}")]
    DuplicateMatch(MatchId),

    /// The match already holds `max_players` players.
    #[error("DP_ERR_102: Match {match_id} is full ({max_players} players)")]
    MatchFull { match_id: MatchId, max_players: usize },

    /// The wallet address has already joined this match.
    #[error("DP_ERR_103: Player {wallet} already joined match {match_id}")]
    DuplicatePlayer { match_id: MatchId, wallet: String },

    /// The declared winner is not a participant of the match.
    #[error("DP_ERR_104: Winner {winner} is not a player in match {match_id}")]
    WinnerNotInMatch { match_id: MatchId, winner: String },

    /// Settlement requires a full match.
    #[error("DP_ERR_105: Match {match_id} is not full: {joined}/{required} players")]
    MatchNotFull {
        match_id: MatchId,
        joined: usize,
        required: usize,
    },

    /// The address is malformed for the chain in use.
    #[error("DP_ERR_106: Invalid address: {reason}")]
    InvalidAddress { reason: String },

    /// Match identifiers must be non-empty.
    #[error("DP_ERR_107: Invalid match ID: {reason}")]
    InvalidMatchId { reason: String },

    // =================================================================
    // Funds Errors (2xx)
    // =================================================================
    /// The escrow balance does not exceed the chain's minimum reserve.
    #[error("DP_ERR_200: Insufficient escrow funds: balance {balance}, reserve {reserve}")]
    InsufficientFunds { balance: Decimal, reserve: Decimal },

    /// A native amount could not be represented in the chain's base units.
    #[error("DP_ERR_201: Amount out of range: {amount}")]
    AmountOutOfRange { amount: Decimal },

    // =================================================================
    // Settlement Errors (3xx)
    // =================================================================
    /// The pot has already been paid out (idempotency guard).
    #[error("DP_ERR_300: Match already settled: {0}")]
    AlreadySettled(MatchId),

    /// Another caller currently holds the settlement claim for this match.
    #[error("DP_ERR_301: Settlement already in progress for match {0}")]
    SettlementInProgress(MatchId),

    /// The match was absorbed into the FAILED state and cannot settle.
    #[error("DP_ERR_302: Match {match_id} has failed: {reason}")]
    MatchFailed { match_id: MatchId, reason: String },

    /// A settlement status transition was attempted out of order.
    #[error("DP_ERR_303: Illegal settlement transition: {reason}")]
    IllegalTransition { reason: String },

    // =================================================================
    // Chain Errors (4xx)
    // =================================================================
    /// Transient RPC / network failure talking to the chain. Safe to retry.
    #[error("DP_ERR_400: Chain communication failed: {reason}")]
    ChainCommunication { reason: String },

    /// The chain rejected the transaction. Fatal for this attempt.
    #[error("DP_ERR_401: Chain rejected transaction: {reason}")]
    ChainRejection { reason: String },

    /// The adapter does not serve the requested network.
    #[error("DP_ERR_402: Unsupported network: {0}")]
    UnsupportedNetwork(Network),

    /// The chain returned a transaction ID we did not ask for.
    #[error("DP_ERR_403: Transaction ID mismatch: expected {expected}, got {actual}")]
    TransactionIdMismatch {
        expected: TransactionId,
        actual: TransactionId,
    },

    // =================================================================
    // Custody Errors (5xx)
    // =================================================================
    /// The adapter could not produce a usable keypair.
    #[error("DP_ERR_500: Key generation failed: {reason}")]
    KeyGeneration { reason: String },

    /// Key derivation or sealing failed.
    #[error("DP_ERR_501: Encryption failed: {reason}")]
    Encryption { reason: String },

    /// Wrong secret, corrupted blob, or tampering. Carries no detail.
    #[error("DP_ERR_502: Decryption failed")]
    Decryption,

    /// The machine secret is missing or too weak.
    #[error("DP_ERR_503: Invalid machine secret: {reason}")]
    InvalidSecret { reason: String },

    // =================================================================
    // General / Internal (9xx)
    // =================================================================
    /// Unrecoverable internal error.
    #[error("DP_ERR_900: Internal error: {0}")]
    Internal(String),

    /// Serialization / deserialization error.
    #[error("DP_ERR_901: Serialization error: {0}")]
    Serialization(String),

    /// Configuration error (invalid config file, missing fields, etc.).
    #[error("DP_ERR_902: Configuration error: {0}")]
    Configuration(String),

    /// I/O error (disk, network).
    #[error("DP_ERR_903: I/O error: {0}")]
    Io(String),
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, DuelpotError>;

impl From<std::io::Error> for DuelpotError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for DuelpotError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Coarse classification of an error, used by callers to decide between
/// "try again" and "stop".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Unknown match ID.
    NotFound,
    /// Caller mistake: full match, duplicate player, foreign winner, bad address.
    Validation,
    /// Escrow balance below the payable threshold.
    InsufficientFunds,
    /// The pot was already paid out.
    AlreadySettled,
    /// Another settlement attempt holds the claim.
    InProgress,
    /// The match is in the FAILED absorption state.
    Failed,
    /// Transient chain failure.
    ChainCommunication,
    /// Chain refused the transaction.
    ChainRejection,
    /// Key generation, encryption, or decryption failure.
    Custody,
    /// Configuration or internal fault.
    Internal,
}

impl ErrorKind {
    /// Whether the same call may succeed if simply repeated later.
    #[must_use]
    pub fn is_retryable(self) -> bool {
        matches!(
            self,
            Self::ChainCommunication | Self::InsufficientFunds | Self::InProgress
        )
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::NotFound => "NOT_FOUND",
            Self::Validation => "VALIDATION",
            Self::InsufficientFunds => "INSUFFICIENT_FUNDS",
            Self::AlreadySettled => "ALREADY_SETTLED",
            Self::InProgress => "IN_PROGRESS",
            Self::Failed => "FAILED",
            Self::ChainCommunication => "CHAIN_COMMUNICATION",
            Self::ChainRejection => "CHAIN_REJECTION",
            Self::Custody => "CUSTODY",
            Self::Internal => "INTERNAL",
        };
        f.write_str(s)
    }
}

impl DuelpotError {
    /// Classify this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MatchNotFound(_) => ErrorKind::NotFound,
            Self::DuplicateMatch(_)
            | Self::MatchFull { .. }
            | Self::DuplicatePlayer { .. }
            | Self::WinnerNotInMatch { .. }
            | Self::MatchNotFull { .. }
            | Self::InvalidAddress { .. }
            | Self::InvalidMatchId { .. }
            | Self::AmountOutOfRange { .. } => ErrorKind::Validation,
            Self::InsufficientFunds { .. } => ErrorKind::InsufficientFunds,
            Self::AlreadySettled(_) => ErrorKind::AlreadySettled,
            Self::SettlementInProgress(_) => ErrorKind::InProgress,
            Self::MatchFailed { .. } => ErrorKind::Failed,
            Self::ChainCommunication { .. } => ErrorKind::ChainCommunication,
            Self::ChainRejection { .. }
            | Self::UnsupportedNetwork(_)
            | Self::TransactionIdMismatch { .. } => ErrorKind::ChainRejection,
            Self::KeyGeneration { .. }
            | Self::Encryption { .. }
            | Self::Decryption
            | Self::InvalidSecret { .. } => ErrorKind::Custody,
            Self::IllegalTransition { .. }
            | Self::Internal(_)
            | Self::Serialization(_)
            | Self::Configuration(_)
            | Self::Io(_) => ErrorKind::Internal,
        }
    }

    /// Shorthand for `self.kind().is_retryable()`.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.kind().is_retryable()
    }

    /// The `DP_ERR_nnn` code of this error.
    #[must_use]
    pub fn code(&self) -> String {
        let msg = self.to_string();
        msg.split(':').next().unwrap_or_default().to_string()
    }

    /// Convenience constructor for transient chain failures.
    pub fn chain_communication(reason: impl Into<String>) -> Self {
        Self::ChainCommunication {
            reason: reason.into(),
        }
    }

    /// Convenience constructor for chain rejections.
    pub fn chain_rejection(reason: impl Into<String>) -> Self {
        Self::ChainRejection {
            reason: reason.into(),
        }
    }
}
