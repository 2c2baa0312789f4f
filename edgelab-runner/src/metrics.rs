//! Performance metrics — pure functions over equity curves and trade lists.
//!
//! Every metric is equity curve and/or trades in, scalar out. No dependency
//! on the optimizer or data loading.

use edgelab_core::domain::ClosedTrade;
use serde::{Deserialize, Serialize};

/// Floor for the drawdown denominator in the Calmar-style score.
pub const DRAWDOWN_EPSILON: f64 = 1e-4;

/// Aggregate metrics for a single simulation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunMetrics {
    pub total_return: f64,
    pub max_drawdown: f64,
    pub sharpe: f64,
    pub sortino: f64,
    /// Drawdown-adjusted return: `total_return / max(|max_drawdown|, ε)`.
    pub score: f64,
    pub trade_count: usize,
    pub profitable_trades: usize,
    pub short_entries: usize,
    pub stop_outs: usize,
    pub win_rate: f64,
}

impl RunMetrics {
    pub fn compute(equity_curve: &[f64], trades: &[ClosedTrade]) -> Self {
        let total_return = total_return(equity_curve);
        let max_dd = max_drawdown(equity_curve);
        Self {
            total_return,
            max_drawdown: max_dd,
            sharpe: sharpe_ratio(equity_curve),
            sortino: sortino_ratio(equity_curve),
            score: calmar_score(total_return, max_dd),
            trade_count: trades.len(),
            profitable_trades: trades.iter().filter(|t| t.is_winner()).count(),
            short_entries: trades
                .iter()
                .filter(|t| t.side == edgelab_core::domain::Side::Short)
                .count(),
            stop_outs: trades.iter().filter(|t| t.is_stop_out()).count(),
            win_rate: win_rate(trades),
        }
    }

    /// Candidate ranking rule: a run with at least one profitable trade beats
    /// any zero-trade run regardless of raw score; otherwise compare scores.
    pub fn beats(&self, other: &RunMetrics) -> bool {
        if self.profitable_trades > 0 && other.trade_count == 0 {
            return true;
        }
        if other.profitable_trades > 0 && self.trade_count == 0 {
            return false;
        }
        self.score > other.score
    }
}

// ─── Individual metric functions ────────────────────────────────────

/// Total return as a fraction: (final - initial) / initial.
pub fn total_return(equity_curve: &[f64]) -> f64 {
    if equity_curve.len() < 2 {
        return 0.0;
    }
    let initial = equity_curve[0];
    let final_eq = *equity_curve.last().unwrap();
    if initial <= 0.0 {
        return 0.0;
    }
    (final_eq - initial) / initial
}

/// Maximum drawdown as a negative fraction (e.g., -0.15 = 15% drawdown).
pub fn max_drawdown(equity_curve: &[f64]) -> f64 {
    if equity_curve.len() < 2 {
        return 0.0;
    }
    let mut peak = equity_curve[0];
    let mut max_dd = 0.0_f64;
    for &eq in equity_curve {
        if eq > peak {
            peak = eq;
        }
        if peak > 0.0 {
            let dd = (eq - peak) / peak;
            if dd < max_dd {
                max_dd = dd;
            }
        }
    }
    max_dd
}

/// Drawdown-adjusted return with an epsilon floor on the denominator so
/// drawdown-free runs do not divide by zero.
pub fn calmar_score(total_return: f64, max_drawdown: f64) -> f64 {
    total_return / max_drawdown.abs().max(DRAWDOWN_EPSILON)
}

/// Annualized Sharpe ratio from daily returns (zero risk-free rate).
///
/// Returns 0.0 if variance is zero or fewer than 2 bars.
pub fn sharpe_ratio(equity_curve: &[f64]) -> f64 {
    let returns = daily_returns(equity_curve);
    if returns.len() < 2 {
        return 0.0;
    }
    let mean = mean_f64(&returns);
    let std = std_dev(&returns);
    if std < 1e-15 {
        return 0.0;
    }
    (mean / std) * (252.0_f64).sqrt()
}

/// Annualized Sortino ratio (downside deviation only).
pub fn sortino_ratio(equity_curve: &[f64]) -> f64 {
    let returns = daily_returns(equity_curve);
    if returns.len() < 2 {
        return 0.0;
    }
    let mean = mean_f64(&returns);
    let downside_sq: Vec<f64> = returns.iter().filter(|&&r| r < 0.0).map(|r| r * r).collect();
    if downside_sq.is_empty() {
        return 0.0;
    }
    let downside_var = downside_sq.iter().sum::<f64>() / returns.len() as f64;
    let downside_std = downside_var.sqrt();
    if downside_std < 1e-15 {
        return 0.0;
    }
    (mean / downside_std) * (252.0_f64).sqrt()
}

/// Win rate: fraction of trades that were winners.
pub fn win_rate(trades: &[ClosedTrade]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    let winners = trades.iter().filter(|t| t.is_winner()).count();
    winners as f64 / trades.len() as f64
}

// ─── Helpers ────────────────────────────────────────────────────────

/// Daily returns from an equity curve.
pub fn daily_returns(equity_curve: &[f64]) -> Vec<f64> {
    if equity_curve.len() < 2 {
        return Vec::new();
    }
    equity_curve
        .windows(2)
        .map(|w| if w[0] > 0.0 { (w[1] - w[0]) / w[0] } else { 0.0 })
        .collect()
}

pub(crate) fn mean_f64(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

pub(crate) fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let mean = mean_f64(values);
    let variance =
        values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}
