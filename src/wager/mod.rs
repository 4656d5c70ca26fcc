//! Wager lifecycle: domain types and the active-bet state machine.

pub mod manager;
pub mod types;

pub use manager::{WagerConfig, WagerManager};
pub use types::{Direction, Outcome, SessionLedger, Stake, Wager, WagerPhase};
