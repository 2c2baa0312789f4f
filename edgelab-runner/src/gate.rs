//! Recommendation gate — recency/stability checks and the decision object.
//!
//! An aggregated threshold recommendation is only auto-applied on a hard
//! pass: the fold scoring succeeded *and* a forced-flat re-simulation of the
//! most recent window shows a clean restart, enough flat days, and a score
//! above the auto-baseline. Everything else is still a valid, reportable
//! recommendation — it just must not be applied silently.

use serde::{Deserialize, Serialize};

use edgelab_core::domain::{Side, ThresholdSet};
use edgelab_core::edge::EdgePoint;
use edgelab_core::signal;
use edgelab_core::sim::{simulate, SimConfig};

use crate::metrics::RunMetrics;

/// How strongly the optimizer backs its recommendation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionTier {
    /// Hard pass: fold scoring and every recency check succeeded on real
    /// data. May be auto-applied.
    Strict,
    /// All checks passed, but at least one only because its reference data
    /// was missing (e.g. no baseline could be derived). Behaves as a pass,
    /// recorded distinctly so it is never mistaken for a genuine one.
    StrictLenient,
    /// At least one check failed; the recommendation must not be
    /// auto-applied.
    NotApplied,
}

/// Fixed, enumerable failure reasons surfaced to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasonCode {
    /// Too few edge points for even one train/validation fold.
    InsufficientData,
    /// The edge distribution has no usable variation.
    DegenerateEdge,
    /// Every fold was infeasible (no clean flat restart anywhere).
    NoFeasibleFold,
    /// Folds were feasible but no aggregate candidate survived validation.
    NoCandidateStrict,
    /// No flat→open transition in the recency window; the restart cannot be
    /// verified.
    NoFlatRestart,
    /// The recency window spends too little time flat.
    InsufficientFlatDays,
    /// The recommendation does not beat the auto-baseline on recent data.
    BestScoreNotAboveBaseline,
}

impl ReasonCode {
    pub fn describe(&self) -> &'static str {
        match self {
            Self::InsufficientData => "not enough history for one train/validation fold",
            Self::DegenerateEdge => "edge distribution has no usable variation",
            Self::NoFeasibleFold => "no fold offered a clean flat restart",
            Self::NoCandidateStrict => "no candidate survived out-of-sample validation",
            Self::NoFlatRestart => "no flat-to-open transition in the recent window",
            Self::InsufficientFlatDays => "too few flat days in the recent window",
            Self::BestScoreNotAboveBaseline => {
                "recent score does not beat the baseline thresholds"
            }
        }
    }
}

impl std::fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.describe())
    }
}

/// Diagnostics from the recency re-simulation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RecencyStats {
    pub window_len: usize,
    pub flat_fraction: f64,
    pub flat_entry_seen: bool,
    pub recommended_score: f64,
    /// None when no baseline could be derived from pre-window data; the
    /// score check then passes leniently (tier `StrictLenient`).
    pub baseline_score: Option<f64>,
}

/// Machine-checkable outcome consumed by the apply-policy collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub tier: SelectionTier,
    pub hard_pass: bool,
    pub applied: bool,
    pub reason: Option<ReasonCode>,
    pub recency: Option<RecencyStats>,
}

impl Decision {
    pub fn strict(recency: RecencyStats) -> Self {
        Self {
            tier: SelectionTier::Strict,
            hard_pass: true,
            applied: true,
            reason: None,
            recency: Some(recency),
        }
    }

    pub fn strict_lenient(recency: RecencyStats) -> Self {
        Self {
            tier: SelectionTier::StrictLenient,
            hard_pass: true,
            applied: true,
            reason: None,
            recency: Some(recency),
        }
    }

    pub fn not_applied(reason: ReasonCode, recency: Option<RecencyStats>) -> Self {
        Self {
            tier: SelectionTier::NotApplied,
            hard_pass: false,
            applied: false,
            reason: Some(reason),
            recency,
        }
    }
}

/// Recency gate configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RecencyConfig {
    /// Fixed window re-simulated under the recommendation (trading days).
    pub window_len: usize,
    /// Minimum fraction of flat days required in the window.
    pub min_flat_fraction: f64,
}

impl Default for RecencyConfig {
    fn default() -> Self {
        Self {
            window_len: 63,
            min_flat_fraction: 0.10,
        }
    }
}

/// Score a threshold set over an edge window by forced-flat simulation.
fn score_window(
    edges: &[EdgePoint],
    prices: &[f64],
    thresholds: &ThresholdSet,
    sim: &SimConfig,
) -> Option<RunMetrics> {
    let days = signal::run(edges, Side::Flat, thresholds);
    let bars = signal::tag_bars(edges, prices, &days);
    let run = simulate(&bars, sim).ok()?;
    Some(RunMetrics::compute(&run.equity_curve(), &run.trades))
}

/// Run the recency/stability gate over the most recent window.
///
/// `edges`/`prices` are the recency window only; `baseline` is derived from
/// data preceding it (None when that data is degenerate).
pub fn evaluate_recency(
    edges: &[EdgePoint],
    prices: &[f64],
    recommended: &ThresholdSet,
    baseline: Option<&ThresholdSet>,
    sim: &SimConfig,
    config: &RecencyConfig,
) -> Decision {
    let days = signal::run(edges, Side::Flat, recommended);
    let flat_entry_seen = signal::has_flat_entry(&days, Side::Flat);
    let flat_fraction = signal::flat_fraction(&days);

    let recommended_score = score_window(edges, prices, recommended, sim)
        .map(|m| m.score)
        .unwrap_or(f64::NEG_INFINITY);
    let baseline_score = baseline
        .and_then(|b| score_window(edges, prices, b, sim))
        .map(|m| m.score);

    let stats = RecencyStats {
        window_len: edges.len(),
        flat_fraction,
        flat_entry_seen,
        recommended_score,
        baseline_score,
    };

    // Checks run in a fixed order; the first failure is the reported reason.
    if !flat_entry_seen {
        return Decision::not_applied(ReasonCode::NoFlatRestart, Some(stats));
    }
    if flat_fraction < config.min_flat_fraction {
        return Decision::not_applied(ReasonCode::InsufficientFlatDays, Some(stats));
    }
    match baseline_score {
        Some(base) => {
            if recommended_score <= base {
                Decision::not_applied(ReasonCode::BestScoreNotAboveBaseline, Some(stats))
            } else {
                Decision::strict(stats)
            }
        }
        // No baseline derivable: the score check passes by leniency, and the
        // tier records that explicitly.
        None => Decision::strict_lenient(stats),
    }
}
