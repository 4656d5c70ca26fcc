//! Real-time BTC wager engine.
//!
//! This library implements the wager game behind the trading UI: a user
//! commits a directional bet against the live BTC price and the engine
//! resolves it autonomously after a fixed delay against the price at
//! settlement time.
//!
//! # Flow
//!
//! ```text
//! price stream ──▶ current-price slot ──▶ place_bet (escrow stake)
//!                        │                      │
//!                        │              settlement timer (3s)
//!                        ▼                      ▼
//!                 read at fire time ──▶ evaluate ──▶ ledger ──▶ store
//! ```
//!
//! Settlement always scores against the freshest price in the shared
//! slot, no matter how many ticks arrived while the timer was armed. A
//! feed disconnect while a wager is pending refunds the stake instead of
//! settling against an untrusted price.
//!
//! # Modules
//!
//! - [`config`]: Configuration loading from environment
//! - [`error`]: Unified error types
//! - [`feed`]: Price stream adapter, backfill, and test mock
//! - [`settlement`]: Pure outcome and payout evaluation
//! - [`wager`]: Active-bet state machine and session ledger
//! - [`store`]: Durable session persistence
//! - [`api`]: HTTP API for the surrounding UI

pub mod api;
pub mod config;
pub mod error;
pub mod feed;
pub mod metrics;
pub mod settlement;
pub mod store;
pub mod utils;
pub mod wager;

pub use config::Config;
pub use error::{EngineError, Result};
