//! Margin account simulator — day-by-day leveraged CFD ledger.
//!
//! Processes signal-tagged bars strictly in date order, carrying
//! {cash, open position, accumulated carry fees} forward. Per bar:
//!
//! 1. mark the open position to market (tracking run-up/drawdown extremes),
//! 2. margin check on marked equity — stop-out force-closes, the margin-call
//!    band only records an event; the check runs *before* the day's carry
//!    accrual,
//! 3. signal transition — close on change, then open the new side sized as
//!    `equity * position_fraction * leverage / price` with the half-spread
//!    charged against the entry price,
//! 4. carry accrual (side-dependent swap + FX fee on notional) on the
//!    position open at end of day, entry day included,
//! 5. snapshot.
//!
//! Unusable bars (non-positive price, out-of-order date) are skipped with no
//! snapshot; an empty series yields an empty run. A ledger that reaches
//! non-positive equity aborts the run with a typed error — no partial
//! snapshot sequence is ever returned.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{AccountSnapshot, ClosedTrade, ExitReason, Side, SignalBar};

use super::config::{ConfigError, SimConfig};

/// Complete output of one simulation run.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SimRun {
    pub snapshots: Vec<AccountSnapshot>,
    pub trades: Vec<ClosedTrade>,
    /// Days on which the margin level sat between stop-out and margin-call.
    pub margin_calls: Vec<NaiveDate>,
}

impl SimRun {
    /// Equity per snapshot, in date order.
    pub fn equity_curve(&self) -> Vec<f64> {
        self.snapshots.iter().map(|s| s.equity).collect()
    }

    pub fn final_equity(&self) -> Option<f64> {
        self.snapshots.last().map(|s| s.equity)
    }
}

/// Failures that abort a simulation run.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimError {
    #[error("configuration rejected: {0}")]
    Config(#[from] ConfigError),
    #[error("ledger invariant violated on {date}: equity {equity} is not positive")]
    LedgerInvariant { date: NaiveDate, equity: f64 },
}

/// Position state carried between days.
#[derive(Debug, Clone, Copy)]
struct OpenPosition {
    side: Side,
    quantity: f64,
    entry_date: NaiveDate,
    /// Market price at entry worsened by the half-spread.
    entry_price: f64,
    margin_reserved: f64,
    carry_fees: f64,
    run_up: f64,
    drawdown: f64,
}

impl OpenPosition {
    fn unrealised(&self, price: f64) -> f64 {
        self.quantity * (price - self.entry_price) * self.side.signum()
    }

    fn close(&self, exit_date: NaiveDate, exit_price: f64, reason: ExitReason) -> ClosedTrade {
        let gross = self.unrealised(exit_price);
        ClosedTrade {
            entry_date: self.entry_date,
            exit_date,
            side: self.side,
            quantity: self.quantity,
            entry_price: self.entry_price,
            exit_price,
            net_pnl: gross - self.carry_fees,
            carry_fees: self.carry_fees,
            margin_at_entry: self.margin_reserved,
            run_up: self.run_up.max(gross),
            drawdown: self.drawdown.min(gross),
            exit_reason: reason,
        }
    }
}

/// Run the simulator over a signal-tagged bar series.
///
/// Deterministic: identical `(bars, config)` inputs produce bit-identical
/// output. All money arithmetic is plain `f64` with no intermediate rounding.
pub fn simulate(bars: &[SignalBar], config: &SimConfig) -> Result<SimRun, SimError> {
    config.validate()?;

    let mut cash = config.initial_equity;
    let mut position: Option<OpenPosition> = None;
    let mut snapshots: Vec<AccountSnapshot> = Vec::with_capacity(bars.len());
    let mut trades: Vec<ClosedTrade> = Vec::new();
    let mut margin_calls: Vec<NaiveDate> = Vec::new();
    let mut last_usable: Option<(NaiveDate, f64)> = None;

    for bar in bars {
        if !bar.is_usable() {
            continue;
        }
        if let Some((prev_date, _)) = last_usable {
            // Out-of-order or duplicate dates break the carried-state model.
            if bar.date <= prev_date {
                continue;
            }
        }
        let price = bar.price;

        // ── 1. Mark to market ──
        if let Some(pos) = position.as_mut() {
            let unrealised = pos.unrealised(price);
            pos.run_up = pos.run_up.max(unrealised);
            pos.drawdown = pos.drawdown.min(unrealised);
        }

        // ── 2. Margin check (before carry accrual) ──
        if let Some(pos) = position {
            let equity = cash + pos.unrealised(price);
            let level = equity / pos.margin_reserved;
            if level < config.stop_out_level {
                cash += pos.unrealised(price);
                trades.push(pos.close(bar.date, price, ExitReason::StopOut));
                position = None;
            } else if level < config.margin_call_level {
                margin_calls.push(bar.date);
            }
        }

        // ── 3. Signal transition ──
        let current = position.as_ref().map_or(Side::Flat, |p| p.side);
        if bar.signal != current {
            if let Some(pos) = position.take() {
                cash += pos.unrealised(price);
                trades.push(pos.close(bar.date, price, ExitReason::Signal));
            }
            if bar.signal.is_open() {
                if cash <= 0.0 {
                    return Err(SimError::LedgerInvariant {
                        date: bar.date,
                        equity: cash,
                    });
                }
                let quantity = cash * config.position_fraction * config.leverage / price;
                let entry_price =
                    price * (1.0 + bar.signal.signum() * config.half_spread_fraction());
                let margin_reserved = quantity * price / config.leverage;
                let entry_mark = quantity * (price - entry_price) * bar.signal.signum();
                position = Some(OpenPosition {
                    side: bar.signal,
                    quantity,
                    entry_date: bar.date,
                    entry_price,
                    margin_reserved,
                    carry_fees: 0.0,
                    run_up: entry_mark,
                    drawdown: entry_mark,
                });
            }
        }

        // ── 4. Carry accrual on the end-of-day position ──
        if let Some(pos) = position.as_mut() {
            let fee = pos.quantity * price * config.daily_carry_rate(pos.side);
            if fee != 0.0 {
                cash -= fee;
                pos.carry_fees += fee;
            }
        }

        // ── 5. Snapshot ──
        let (unrealised, margin_used, side, quantity) = match position.as_ref() {
            Some(pos) => (pos.unrealised(price), pos.margin_reserved, pos.side, pos.quantity),
            None => (0.0, 0.0, Side::Flat, 0.0),
        };
        let equity = cash + unrealised;
        if equity <= 0.0 {
            return Err(SimError::LedgerInvariant {
                date: bar.date,
                equity,
            });
        }
        snapshots.push(AccountSnapshot {
            date: bar.date,
            equity,
            margin_used,
            free_cash: equity - margin_used,
            unrealised_pnl: unrealised,
            side,
            quantity,
        });
        last_usable = Some((bar.date, price));
    }

    // Open position at series end: mark to the final bar so the trade list
    // reconciles with the equity curve.
    if let (Some(pos), Some((date, price))) = (position.take(), last_usable) {
        trades.push(pos.close(date, price, ExitReason::EndOfData));
    }

    Ok(SimRun {
        snapshots,
        trades,
        margin_calls,
    })
}
