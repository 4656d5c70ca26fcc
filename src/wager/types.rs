//! Wager and session ledger types.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

use crate::error::WagerError;

/// Direction of a wager against the entry price.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, Default,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum Direction {
    /// Wins when the exit price is above entry.
    #[default]
    Up,
    /// Wins when the exit price is below entry.
    Down,
}

/// Allowed stake amounts. A fixed enumerated set, not arbitrary numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u64", into = "u64")]
pub enum Stake {
    /// 10 virtual dollars.
    Ten,
    /// 25 virtual dollars.
    TwentyFive,
    /// 50 virtual dollars.
    Fifty,
    /// 100 virtual dollars.
    Hundred,
}

impl Stake {
    /// All allowed stakes, smallest first.
    pub const ALL: [Stake; 4] = [Stake::Ten, Stake::TwentyFive, Stake::Fifty, Stake::Hundred];

    /// The stake amount as a decimal.
    pub fn amount(&self) -> Decimal {
        Decimal::from(u64::from(*self))
    }
}

impl TryFrom<u64> for Stake {
    type Error = WagerError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        match value {
            10 => Ok(Stake::Ten),
            25 => Ok(Stake::TwentyFive),
            50 => Ok(Stake::Fifty),
            100 => Ok(Stake::Hundred),
            other => Err(WagerError::InvalidStake(other)),
        }
    }
}

impl From<Stake> for u64 {
    fn from(stake: Stake) -> Self {
        match stake {
            Stake::Ten => 10,
            Stake::TwentyFive => 25,
            Stake::Fifty => 50,
            Stake::Hundred => 100,
        }
    }
}

/// Settlement outcome of a wager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, Default)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum Outcome {
    /// Direction matched the price move.
    Win,
    /// Direction opposed the price move.
    Loss,
    /// Movement within tolerance; neither win nor loss.
    Tie,
    /// Not yet settled.
    #[default]
    Pending,
}

/// Lifecycle phase of a wager. Created `Pending`, transitions exactly
/// once to `Settled`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, Default)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum WagerPhase {
    /// Placed, settlement timer armed.
    #[default]
    Pending,
    /// Resolved with a final outcome.
    Settled,
}

/// A single directional bet against the live price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Wager {
    /// Opaque unique token.
    pub id: String,
    /// Bet direction.
    pub direction: Direction,
    /// Escrowed stake.
    pub stake: Stake,
    /// Price at placement.
    pub entry_price: Decimal,
    /// Placement time, epoch ms.
    pub entry_time: i64,
    /// Price at settlement.
    pub exit_price: Option<Decimal>,
    /// Settlement time, epoch ms.
    pub exit_time: Option<i64>,
    /// Lifecycle phase.
    pub phase: WagerPhase,
    /// Settlement outcome.
    pub outcome: Outcome,
    /// Net profit and loss once settled.
    pub profit_and_loss: Option<Decimal>,
}

impl Wager {
    /// Create a pending wager at the given entry.
    pub fn new(direction: Direction, stake: Stake, entry_price: Decimal, entry_time: i64) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            direction,
            stake,
            entry_price,
            entry_time,
            exit_price: None,
            exit_time: None,
            phase: WagerPhase::Pending,
            outcome: Outcome::Pending,
            profit_and_loss: None,
        }
    }

    /// Apply the settlement result. The single phase transition.
    pub fn settle(&mut self, exit_price: Decimal, exit_time: i64, outcome: Outcome, pnl: Decimal) {
        self.exit_price = Some(exit_price);
        self.exit_time = Some(exit_time);
        self.phase = WagerPhase::Settled;
        self.outcome = outcome;
        self.profit_and_loss = Some(pnl);
    }

    /// Whether the wager is still pending settlement.
    pub fn is_pending(&self) -> bool {
        self.phase == WagerPhase::Pending
    }
}

/// Running record of balance, history, and statistics for one session.
///
/// Exclusively owned and mutated by the wager lifecycle manager; everyone
/// else sees snapshots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionLedger {
    /// Current balance, stake escrow already applied.
    pub balance: Decimal,
    /// Balance the session started with.
    pub starting_balance: Decimal,
    /// Settled wager count, ties included.
    pub total_wagers: u64,
    /// Winning wager count.
    pub wins: u64,
    /// Losing wager count.
    pub losses: u64,
    /// round(wins / (wins + losses) * 100); 0 before any decided wager.
    pub win_rate: u8,
    /// The single pending wager, if any.
    pub active_wager: Option<Wager>,
    /// Most recent settled wagers, newest first.
    pub history: Vec<Wager>,
    /// Last mutation time, epoch ms.
    pub last_activity_ms: i64,
}

impl SessionLedger {
    /// Retained settled wagers.
    pub const HISTORY_CAP: usize = 5;

    /// Fresh ledger at session start.
    pub fn new(starting_balance: Decimal, now_ms: i64) -> Self {
        Self {
            balance: starting_balance,
            starting_balance,
            total_wagers: 0,
            wins: 0,
            losses: 0,
            win_rate: 0,
            active_wager: None,
            history: Vec::new(),
            last_activity_ms: now_ms,
        }
    }

    /// Record a settled wager: history (capped, newest first), counters,
    /// and win rate. Ties count toward `total_wagers` only.
    pub fn record_settlement(&mut self, wager: Wager) {
        self.total_wagers += 1;
        match wager.outcome {
            Outcome::Win => self.wins += 1,
            Outcome::Loss => self.losses += 1,
            Outcome::Tie | Outcome::Pending => {}
        }
        self.recompute_win_rate();

        self.history.insert(0, wager);
        self.history.truncate(Self::HISTORY_CAP);
    }

    /// Recompute the win rate, guarding the zero-denominator case.
    fn recompute_win_rate(&mut self) {
        let decided = self.wins + self.losses;
        self.win_rate = if decided == 0 {
            0
        } else {
            ((self.wins as f64 / decided as f64) * 100.0).round() as u8
        };
    }

    /// Net session profit and loss.
    pub fn session_pnl(&self) -> Decimal {
        self.balance - self.starting_balance
    }

    /// Structural invariants a trusted ledger must hold. Used by the
    /// persistence gateway to reject corrupt stored payloads.
    pub fn is_structurally_valid(&self) -> bool {
        self.balance >= Decimal::ZERO
            && self.starting_balance > Decimal::ZERO
            && self.wins + self.losses <= self.total_wagers
            && self.win_rate <= 100
            && self.history.len() <= Self::HISTORY_CAP
            && self.history.iter().all(|w| !w.is_pending())
            && self.active_wager.as_ref().map_or(true, |w| w.is_pending())
    }
}
