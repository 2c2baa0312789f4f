//! ClosedTrade — a completed round trip through the margin account.

use super::side::Side;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Why a position was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    /// The signal moved away from the position's side.
    Signal,
    /// Equity fell below the stop-out level and the position was
    /// force-liquidated.
    StopOut,
    /// The bar series ended while the position was still open; the trade is
    /// marked to the final bar so the trade list reconciles with the ledger.
    EndOfData,
}

/// A closed position. Immutable once recorded.
///
/// `entry_price` already includes the half-spread entry cost, so
/// `quantity * (exit_price - entry_price) * side.signum()` is the gross PnL
/// including spread. `carry_fees` accumulates daily swap and FX charges over
/// the trade's life; `net_pnl` nets them out.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClosedTrade {
    pub entry_date: NaiveDate,
    pub exit_date: NaiveDate,
    pub side: Side,
    pub quantity: f64,
    pub entry_price: f64,
    pub exit_price: f64,
    pub net_pnl: f64,
    pub carry_fees: f64,
    pub margin_at_entry: f64,
    /// Best unrealised PnL observed while the position was open.
    pub run_up: f64,
    /// Worst unrealised PnL observed while the position was open.
    pub drawdown: f64,
    pub exit_reason: ExitReason,
}

impl ClosedTrade {
    pub fn is_winner(&self) -> bool {
        self.net_pnl > 0.0
    }

    pub fn is_stop_out(&self) -> bool {
        self.exit_reason == ExitReason::StopOut
    }
}
