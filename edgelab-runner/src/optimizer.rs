//! Walk-forward threshold optimizer.
//!
//! Slides train/validation folds over the edge series, derives candidate
//! thresholds from train-window quantiles, scores each candidate on its
//! validation window only (forced-flat start), and aggregates per-fold
//! winners by median. The aggregate is then put through the recency gate
//! before it may be auto-applied.
//!
//! The fold × candidate grid is embarrassingly parallel: every cell reads an
//! immutable index-range view of the shared series and allocates its own
//! result. Cells check the cancellation flag at candidate boundaries — a
//! single day-by-day simulation is cheap and not worth preempting.

use std::sync::atomic::{AtomicBool, Ordering};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use edgelab_core::domain::{Side, ThresholdSet};
use edgelab_core::edge::{EdgePoint, EdgeSeries};
use edgelab_core::signal;
use edgelab_core::sim::{simulate, ConfigError, SimConfig};

use crate::candidates::{auto_baseline, derive_candidates, CandidateGrid};
use crate::folds::{create_folds, FoldConfig, FoldError, FoldSpec};
use crate::gate::{evaluate_recency, Decision, ReasonCode, RecencyConfig};
use crate::metrics::RunMetrics;

// ─── Configuration ───────────────────────────────────────────────────

/// Complete optimizer configuration.
///
/// Every field participates in the cache key: change anything here and the
/// derived thresholds are recomputed, never served stale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizerConfig {
    #[serde(default)]
    pub folds: FoldConfig,
    #[serde(default)]
    pub grid: CandidateGrid,
    #[serde(default)]
    pub recency: RecencyConfig,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            folds: FoldConfig::default(),
            grid: CandidateGrid::default(),
            recency: RecencyConfig::default(),
        }
    }
}

// ─── Result types ────────────────────────────────────────────────────

/// Best surviving candidate of one fold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoldResult {
    pub fold_index: usize,
    pub train_range: (usize, usize),
    pub validation_range: (usize, usize),
    pub thresholds: ThresholdSet,
    pub score: f64,
    pub trade_count: usize,
    pub short_entry_count: usize,
}

/// Why a fold was excluded from aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FoldSkipReason {
    /// Train-window edge distribution produced no valid candidates.
    DegenerateEdge,
    /// No candidate offered a clean flat restart in the validation window.
    NoFlatRestart,
    /// Every candidate's validation simulation aborted.
    AllCandidatesFailed,
}

/// Per-fold audit record: excluded folds stay visible, they are never
/// silently dropped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FoldOutcome {
    Scored(FoldResult),
    Infeasible {
        fold_index: usize,
        reason: FoldSkipReason,
    },
}

/// Complete optimizer output: the recommendation (when one could be formed),
/// the gate decision, and the full per-fold audit trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizeReport {
    pub recommended: Option<ThresholdSet>,
    pub decision: Decision,
    pub folds: Vec<FoldOutcome>,
}

impl OptimizeReport {
    fn infeasible(reason: ReasonCode, folds: Vec<FoldOutcome>) -> Self {
        Self {
            recommended: None,
            decision: Decision::not_applied(reason, None),
            folds,
        }
    }
}

/// Computation errors — distinct from "no viable thresholds found", which is
/// a structured outcome, not an error.
#[derive(Debug, Error)]
pub enum OptimizeError {
    #[error("optimization cancelled")]
    Cancelled,
    #[error("simulation config rejected: {0}")]
    Config(#[from] ConfigError),
    #[error("fold geometry rejected: {0}")]
    Folds(FoldError),
}

// ─── Candidate evaluation ────────────────────────────────────────────

enum CandidateOutcome {
    Scored(ThresholdSet, RunMetrics),
    NoFlatRestart,
    SimFailed,
    Skipped,
}

/// Evaluate one (fold, candidate) grid cell.
///
/// Feasibility: a machine run flat from the train start must pass through at
/// least one flat day inside the validation window — otherwise forcing a
/// flat start there would invent a trajectory no full-history run supports.
fn evaluate_candidate(
    edges: &[EdgePoint],
    prices: &[f64],
    fold: &FoldSpec,
    thresholds: ThresholdSet,
    sim: &SimConfig,
    cancel: Option<&AtomicBool>,
) -> CandidateOutcome {
    if cancel.is_some_and(|flag| flag.load(Ordering::Relaxed)) {
        return CandidateOutcome::Skipped;
    }

    let context = &edges[fold.train_start..fold.validation_end];
    let context_days = signal::run(context, Side::Flat, &thresholds);
    let validation_offset = fold.validation_start - fold.train_start;
    let has_flat_day = context_days[validation_offset..]
        .iter()
        .any(|d| d.side == Side::Flat);
    if !has_flat_day {
        return CandidateOutcome::NoFlatRestart;
    }

    let val_edges = &edges[fold.validation_start..fold.validation_end];
    let val_prices = &prices[fold.validation_start..fold.validation_end];
    let days = signal::run(val_edges, Side::Flat, &thresholds);
    let bars = signal::tag_bars(val_edges, val_prices, &days);

    match simulate(&bars, sim) {
        Ok(run) => {
            let metrics = RunMetrics::compute(&run.equity_curve(), &run.trades);
            CandidateOutcome::Scored(thresholds, metrics)
        }
        Err(_) => CandidateOutcome::SimFailed,
    }
}

fn evaluate_fold(
    edges: &[EdgePoint],
    prices: &[f64],
    fold: &FoldSpec,
    config: &OptimizerConfig,
    sim: &SimConfig,
    cancel: Option<&AtomicBool>,
) -> FoldOutcome {
    let train_z: Vec<f64> = edges[fold.train_start..fold.train_end]
        .iter()
        .map(|p| p.z)
        .collect();
    let candidates = derive_candidates(&train_z, &config.grid);
    if candidates.is_empty() {
        return FoldOutcome::Infeasible {
            fold_index: fold.fold_index,
            reason: FoldSkipReason::DegenerateEdge,
        };
    }

    let outcomes: Vec<CandidateOutcome> = candidates
        .into_par_iter()
        .map(|candidate| evaluate_candidate(edges, prices, fold, candidate, sim, cancel))
        .collect();

    let mut best: Option<(ThresholdSet, RunMetrics)> = None;
    let mut saw_sim_failure = false;
    let mut saw_restart_failure = false;
    for outcome in outcomes {
        match outcome {
            CandidateOutcome::Scored(thresholds, metrics) => {
                let replace = match &best {
                    Some((_, incumbent)) => metrics.beats(incumbent),
                    None => true,
                };
                if replace {
                    best = Some((thresholds, metrics));
                }
            }
            CandidateOutcome::NoFlatRestart => saw_restart_failure = true,
            CandidateOutcome::SimFailed => saw_sim_failure = true,
            CandidateOutcome::Skipped => {}
        }
    }

    match best {
        Some((thresholds, metrics)) => FoldOutcome::Scored(FoldResult {
            fold_index: fold.fold_index,
            train_range: (fold.train_start, fold.train_end),
            validation_range: (fold.validation_start, fold.validation_end),
            thresholds,
            score: metrics.score,
            trade_count: metrics.trade_count,
            short_entry_count: metrics.short_entries,
        }),
        None => FoldOutcome::Infeasible {
            fold_index: fold.fold_index,
            reason: if saw_restart_failure && !saw_sim_failure {
                FoldSkipReason::NoFlatRestart
            } else {
                FoldSkipReason::AllCandidatesFailed
            },
        },
    }
}

// ─── Aggregation ─────────────────────────────────────────────────────

fn median(values: &mut [f64]) -> f64 {
    values.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let n = values.len();
    if n % 2 == 1 {
        values[n / 2]
    } else {
        (values[n / 2 - 1] + values[n / 2]) / 2.0
    }
}

/// Median of each threshold field across per-fold winners.
fn aggregate_thresholds(results: &[&FoldResult]) -> ThresholdSet {
    let field = |extract: fn(&ThresholdSet) -> f64| {
        let mut values: Vec<f64> = results.iter().map(|r| extract(&r.thresholds)).collect();
        median(&mut values)
    };
    ThresholdSet {
        enter_long: field(|t| t.enter_long),
        enter_short: field(|t| t.enter_short),
        exit_long: field(|t| t.exit_long),
        exit_short: field(|t| t.exit_short),
        flip_long: field(|t| t.flip_long),
        flip_short: field(|t| t.flip_short),
    }
}

// ─── Entry point ─────────────────────────────────────────────────────

/// Run the walk-forward optimization.
///
/// `prices` must be aligned index-for-index with `series` (both derived from
/// the same forecast rows). Data insufficiency and per-fold infeasibility
/// are structured outcomes; only cancellation and rejected configuration are
/// errors.
pub fn optimize(
    series: &EdgeSeries,
    prices: &[f64],
    sim: &SimConfig,
    config: &OptimizerConfig,
    cancel: Option<&AtomicBool>,
) -> Result<OptimizeReport, OptimizeError> {
    sim.validate()?;

    let edges = series.points();
    assert_eq!(
        edges.len(),
        prices.len(),
        "edge series and price array must be aligned"
    );

    let folds = match create_folds(edges.len(), &config.folds) {
        Ok(folds) => folds,
        Err(FoldError::InsufficientData { .. }) => {
            return Ok(OptimizeReport::infeasible(
                ReasonCode::InsufficientData,
                Vec::new(),
            ))
        }
        Err(err) => return Err(OptimizeError::Folds(err)),
    };

    let fold_outcomes: Vec<FoldOutcome> = folds
        .par_iter()
        .map(|fold| evaluate_fold(edges, prices, fold, config, sim, cancel))
        .collect();

    if cancel.is_some_and(|flag| flag.load(Ordering::Relaxed)) {
        return Err(OptimizeError::Cancelled);
    }

    let scored: Vec<&FoldResult> = fold_outcomes
        .iter()
        .filter_map(|o| match o {
            FoldOutcome::Scored(result) => Some(result),
            FoldOutcome::Infeasible { .. } => None,
        })
        .collect();

    if scored.is_empty() {
        let all_degenerate = fold_outcomes.iter().all(|o| {
            matches!(
                o,
                FoldOutcome::Infeasible {
                    reason: FoldSkipReason::DegenerateEdge,
                    ..
                }
            )
        });
        let reason = if all_degenerate {
            ReasonCode::DegenerateEdge
        } else {
            ReasonCode::NoFeasibleFold
        };
        return Ok(OptimizeReport::infeasible(reason, fold_outcomes));
    }

    let aggregated = aggregate_thresholds(&scored);
    if aggregated.validate().is_err() {
        return Ok(OptimizeReport::infeasible(
            ReasonCode::NoCandidateStrict,
            fold_outcomes,
        ));
    }

    // ── Recency gate ──
    let window = config.recency.window_len;
    if edges.len() < window {
        return Ok(OptimizeReport {
            recommended: Some(aggregated),
            decision: Decision::not_applied(ReasonCode::InsufficientData, None),
            folds: fold_outcomes,
        });
    }
    let recency_start = edges.len() - window;
    let history_z: Vec<f64> = edges[..recency_start].iter().map(|p| p.z).collect();
    let baseline = auto_baseline(&history_z);

    let decision = evaluate_recency(
        &edges[recency_start..],
        &prices[recency_start..],
        &aggregated,
        baseline.as_ref(),
        sim,
        &config.recency,
    );

    Ok(OptimizeReport {
        recommended: Some(aggregated),
        decision,
        folds: fold_outcomes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn make_series(zs: &[f64]) -> EdgeSeries {
        // Build through ForecastRow so the test exercises the real
        // construction path: z = ln(forecast/spot) / (sigma * sqrt(h)).
        // With sigma = 0.25 and h = 16, scale = 1.0, so forecast = spot * e^z.
        let base = NaiveDate::from_ymd_opt(2020, 1, 2).unwrap();
        let rows: Vec<edgelab_core::edge::ForecastRow> = zs
            .iter()
            .enumerate()
            .map(|(i, &z)| edgelab_core::edge::ForecastRow {
                date: base + chrono::Duration::days(i as i64),
                spot: 100.0,
                forecast_price: 100.0 * z.exp(),
                sigma: 0.25,
            })
            .collect();
        EdgeSeries::build(&rows, 16)
    }

    /// Edge pattern with regular entries and exits so folds are feasible:
    /// a burst above the enter band followed by a decay through the exit
    /// band, repeating.
    fn cyclical_zs(n: usize) -> Vec<f64> {
        (0..n)
            .map(|i| match i % 10 {
                0 | 1 => 0.0,
                2..=4 => 1.4,
                5 | 6 => 0.6,
                _ => 0.05,
            })
            .collect()
    }

    /// Prices that trend up during the long bursts so entries are profitable.
    fn trending_prices(n: usize) -> Vec<f64> {
        let mut price = 100.0;
        (0..n)
            .map(|i| {
                let drift = if matches!(i % 10, 2..=6) { 0.004 } else { -0.0005 };
                price *= 1.0 + drift;
                price
            })
            .collect()
    }

    fn tame_sim() -> SimConfig {
        let mut sim = SimConfig::frictionless(10_000.0, 2.0);
        sim.position_fraction = 0.5;
        sim.stop_out_level = 0.05;
        sim.margin_call_level = 0.1;
        sim
    }

    #[test]
    fn too_little_data_is_structured_infeasible() {
        let series = make_series(&cyclical_zs(100));
        let prices = trending_prices(series.len());
        let report = optimize(
            &series,
            &prices,
            &tame_sim(),
            &OptimizerConfig::default(),
            None,
        )
        .unwrap();
        assert_eq!(report.recommended, None);
        assert_eq!(report.decision.reason, Some(ReasonCode::InsufficientData));
        assert!(!report.decision.applied);
    }

    #[test]
    fn full_run_produces_recommendation_and_audit_trail() {
        let zs = cyclical_zs(500);
        let series = make_series(&zs);
        let prices = trending_prices(series.len());
        let report = optimize(
            &series,
            &prices,
            &tame_sim(),
            &OptimizerConfig::default(),
            None,
        )
        .unwrap();

        let recommended = report.recommended.expect("feasible data must recommend");
        assert!(recommended.validate().is_ok());
        assert!(!report.folds.is_empty());

        // Every scored fold carries a valid threshold set and its spans.
        for outcome in &report.folds {
            if let FoldOutcome::Scored(result) = outcome {
                assert!(result.thresholds.validate().is_ok());
                assert_eq!(result.train_range.1, result.validation_range.0);
            }
        }
    }

    #[test]
    fn degenerate_edge_reported_not_crashed() {
        let series = make_series(&vec![0.0; 400]);
        let prices = vec![100.0; series.len()];
        let report = optimize(
            &series,
            &prices,
            &tame_sim(),
            &OptimizerConfig::default(),
            None,
        )
        .unwrap();
        assert_eq!(report.decision.reason, Some(ReasonCode::DegenerateEdge));
        assert_eq!(report.recommended, None);
        assert!(report
            .folds
            .iter()
            .all(|o| matches!(o, FoldOutcome::Infeasible { .. })));
    }

    #[test]
    fn never_flat_recency_window_is_not_applied() {
        // Feasible folds early on, but the last 63 points hold the edge
        // permanently above every candidate enter band: the forced-flat
        // restart enters on day 0 and never goes flat again.
        let mut zs = cyclical_zs(400);
        let n = zs.len();
        for z in zs.iter_mut().skip(n - 63) {
            *z = 1.6;
        }
        let series = make_series(&zs);
        let prices = trending_prices(series.len());
        let report = optimize(
            &series,
            &prices,
            &tame_sim(),
            &OptimizerConfig::default(),
            None,
        )
        .unwrap();

        assert!(report.recommended.is_some());
        assert_ne!(report.decision.tier, crate::gate::SelectionTier::Strict);
        assert!(!report.decision.applied);
        assert_eq!(
            report.decision.reason,
            Some(ReasonCode::InsufficientFlatDays)
        );
    }

    #[test]
    fn cancellation_stops_the_grid() {
        let series = make_series(&cyclical_zs(500));
        let prices = trending_prices(series.len());
        let cancel = AtomicBool::new(true);
        let err = optimize(
            &series,
            &prices,
            &tame_sim(),
            &OptimizerConfig::default(),
            Some(&cancel),
        )
        .unwrap_err();
        assert!(matches!(err, OptimizeError::Cancelled));
    }

    #[test]
    fn invalid_sim_config_rejected() {
        let series = make_series(&cyclical_zs(500));
        let prices = trending_prices(series.len());
        let mut sim = tame_sim();
        sim.leverage = 0.0;
        let err = optimize(&series, &prices, &sim, &OptimizerConfig::default(), None).unwrap_err();
        assert!(matches!(err, OptimizeError::Config(_)));
    }

    #[test]
    fn report_is_deterministic() {
        let series = make_series(&cyclical_zs(500));
        let prices = trending_prices(series.len());
        let a = optimize(
            &series,
            &prices,
            &tame_sim(),
            &OptimizerConfig::default(),
            None,
        )
        .unwrap();
        let b = optimize(
            &series,
            &prices,
            &tame_sim(),
            &OptimizerConfig::default(),
            None,
        )
        .unwrap();
        assert_eq!(a, b);
    }
}
