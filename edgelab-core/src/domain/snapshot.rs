//! AccountSnapshot — one day of the simulated margin-account ledger.

use super::side::Side;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// End-of-day state of the margin account.
///
/// Invariants maintained by the simulator:
/// - `margin_used > 0` exactly when `side` is not flat;
/// - `free_cash = equity - margin_used`, and it stays non-negative except on
///   the day a stop-out force-closes the position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AccountSnapshot {
    pub date: NaiveDate,
    pub equity: f64,
    pub margin_used: f64,
    pub free_cash: f64,
    pub unrealised_pnl: f64,
    pub side: Side,
    pub quantity: f64,
}

impl AccountSnapshot {
    /// Flat day: no position, no margin reserved.
    pub fn flat(date: NaiveDate, equity: f64) -> Self {
        Self {
            date,
            equity,
            margin_used: 0.0,
            free_cash: equity,
            unrealised_pnl: 0.0,
            side: Side::Flat,
            quantity: 0.0,
        }
    }

    /// Margin level as a fraction of reserved margin; `None` while flat.
    pub fn margin_level(&self) -> Option<f64> {
        if self.margin_used > 0.0 {
            Some(self.equity / self.margin_used)
        } else {
            None
        }
    }
}
