//! Outcome and payout calculations for wager settlement.

use rust_decimal::Decimal;

use crate::wager::{Direction, Outcome};

/// Settlement parameters. Product constants with no derived relationship;
/// always injected from configuration.
#[derive(Debug, Clone, Copy)]
pub struct SettlementParams {
    /// Payout multiplier on a win (> 1, reflects the house edge).
    pub win_multiplier: Decimal,
    /// Refund multiplier on a tie (0 < x < 1, acts as a settlement fee).
    pub tie_multiplier: Decimal,
    /// Price delta below which movement is scored as a tie.
    pub price_tolerance: Decimal,
}

impl Default for SettlementParams {
    fn default() -> Self {
        Self {
            win_multiplier: Decimal::new(19, 1), // 1.9
            tie_multiplier: Decimal::new(9, 1),  // 0.9
            price_tolerance: Decimal::new(1, 2), // 0.01
        }
    }
}

/// Score a wager against entry and exit prices.
///
/// Movement within `price_tolerance` is a tie regardless of direction;
/// this guards both floating-point noise in upstream feeds and degenerate
/// no-movement windows. Otherwise the sign of the delta decides.
pub fn evaluate(
    direction: Direction,
    entry_price: Decimal,
    exit_price: Decimal,
    price_tolerance: Decimal,
) -> Outcome {
    let delta = exit_price - entry_price;

    if delta.abs() < price_tolerance {
        return Outcome::Tie;
    }

    let went_up = delta > Decimal::ZERO;
    let won = match direction {
        Direction::Up => went_up,
        Direction::Down => !went_up,
    };

    if won {
        Outcome::Win
    } else {
        Outcome::Loss
    }
}

/// Gross payout for a settled wager. The stake was escrowed at placement,
/// so this is the full amount credited back to the balance.
pub fn payout(stake: Decimal, outcome: Outcome, params: &SettlementParams) -> Decimal {
    match outcome {
        Outcome::Win => stake * params.win_multiplier,
        Outcome::Tie => stake * params.tie_multiplier,
        Outcome::Loss | Outcome::Pending => Decimal::ZERO,
    }
}

/// Net profit and loss relative to the escrowed stake.
pub fn net_pnl(stake: Decimal, outcome: Outcome, params: &SettlementParams) -> Decimal {
    payout(stake, outcome, params) - stake
}
