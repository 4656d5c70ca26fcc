//! Unified error types for the wager engine.

use rust_decimal::Decimal;
use thiserror::Error;

/// Unified error type for the wager engine.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Configuration loading error.
    #[error("configuration error: {0}")]
    Config(#[from] envy::Error),

    /// Price feed error.
    #[error("feed error: {0}")]
    Feed(#[from] FeedError),

    /// Wager placement/settlement error.
    #[error("wager error: {0}")]
    Wager(#[from] WagerError),

    /// Session persistence error.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// HTTP request error.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Price feed connection and message errors.
#[derive(Error, Debug)]
pub enum FeedError {
    /// Connection failed.
    #[error("feed connection failed: {0}")]
    ConnectionFailed(String),

    /// Connection closed unexpectedly.
    #[error("feed connection closed: {reason}")]
    ConnectionClosed {
        /// Close reason.
        reason: String,
    },

    /// Already connected.
    #[error("feed already connected")]
    AlreadyConnected,

    /// Historical backfill request failed.
    #[error("backfill failed: {0}")]
    BackfillFailed(String),

    /// Message parsing failed.
    #[error("failed to parse feed message: {0}")]
    ParseError(String),

    /// Tungstenite error.
    #[error("tungstenite error: {0}")]
    Tungstenite(#[from] tokio_tungstenite::tungstenite::Error),
}

/// Wager placement rejections and lifecycle errors.
///
/// Placement rejections are returned synchronously from `place_bet` and
/// leave the ledger untouched. Callers surface them (e.g. disabled
/// controls); they are never retried automatically.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WagerError {
    /// No price has been received from the feed yet.
    #[error("no current price available")]
    NoPrice,

    /// The feed is disconnected; new bets are not permitted.
    #[error("price feed disconnected")]
    FeedDisconnected,

    /// A wager is already pending; only one may be active at a time.
    #[error("a wager is already pending")]
    WagerPending,

    /// Balance too low to escrow the stake.
    #[error("insufficient balance: need {required}, have {available}")]
    InsufficientBalance {
        /// Stake amount required.
        required: Decimal,
        /// Current balance.
        available: Decimal,
    },

    /// Stake amount outside the allowed set.
    #[error("invalid stake amount: {0}")]
    InvalidStake(u64),
}

/// Session store errors. Always recovered locally; a fresh session is a
/// valid fallback, so these never reach the user.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Read from the backing store failed.
    #[error("store read failed: {0}")]
    ReadFailed(String),

    /// Write to the backing store failed.
    #[error("store write failed: {0}")]
    WriteFailed(String),

    /// Serialization of the envelope failed.
    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Convenient Result type alias.
pub type Result<T> = std::result::Result<T, EngineError>;
