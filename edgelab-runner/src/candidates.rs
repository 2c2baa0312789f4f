//! Candidate threshold derivation from train-window edge quantiles.
//!
//! For each enter-quantile × exit-ratio × flip-ratio grid cell two candidates
//! are built: a symmetric set from quantiles of `|z|`, and an asymmetric set
//! whose long side comes from the positive-z distribution and short side from
//! the negative-z distribution. Candidates that violate the hysteresis band
//! ordering are filtered out before scoring.

use edgelab_core::domain::ThresholdSet;
use serde::{Deserialize, Serialize};

/// Quantile grid searched per fold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateGrid {
    /// Quantile of the train |z| distribution used for the enter band.
    pub enter_quantiles: Vec<f64>,
    /// Exit band as a fraction of the enter band.
    pub exit_ratios: Vec<f64>,
    /// Flip band as a multiple of the enter band.
    pub flip_ratios: Vec<f64>,
}

impl Default for CandidateGrid {
    fn default() -> Self {
        Self {
            enter_quantiles: vec![0.85, 0.90, 0.95],
            exit_ratios: vec![0.2, 0.3, 0.4],
            flip_ratios: vec![1.5, 2.0, 2.5],
        }
    }
}

impl CandidateGrid {
    /// Upper bound on candidates per fold (symmetric + asymmetric per cell).
    pub fn max_candidates(&self) -> usize {
        self.enter_quantiles.len() * self.exit_ratios.len() * self.flip_ratios.len() * 2
    }
}

/// The q-th quantile (0..=1) of a sorted slice, by linear interpolation.
pub fn quantile(sorted: &[f64], q: f64) -> f64 {
    let n = sorted.len();
    if n == 0 {
        return f64::NAN;
    }
    if n == 1 {
        return sorted[0];
    }
    let rank = q.clamp(0.0, 1.0) * (n - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = (lo + 1).min(n - 1);
    let frac = rank - lo as f64;
    sorted[lo] * (1.0 - frac) + sorted[hi] * frac
}

/// Derive all ordering-valid candidates from a train window's z values.
///
/// Returns an empty vector when the edge distribution is degenerate (all
/// zeros, or too few observations to form a band) — the caller reports the
/// fold infeasible rather than erroring.
pub fn derive_candidates(train_z: &[f64], grid: &CandidateGrid) -> Vec<ThresholdSet> {
    let mut abs: Vec<f64> = train_z.iter().map(|z| z.abs()).filter(|z| z.is_finite()).collect();
    abs.sort_by(|a, b| a.partial_cmp(b).unwrap());

    let mut pos: Vec<f64> = train_z.iter().copied().filter(|&z| z > 0.0).collect();
    pos.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let mut neg: Vec<f64> = train_z.iter().map(|&z| -z).filter(|&z| z > 0.0).collect();
    neg.sort_by(|a, b| a.partial_cmp(b).unwrap());

    let mut candidates = Vec::with_capacity(grid.max_candidates());
    for &q in &grid.enter_quantiles {
        let enter_sym = quantile(&abs, q);
        let enter_long = quantile(&pos, q);
        let enter_short = quantile(&neg, q);

        for &exit_ratio in &grid.exit_ratios {
            for &flip_ratio in &grid.flip_ratios {
                if enter_sym.is_finite() {
                    let sym = ThresholdSet::symmetric(
                        enter_sym,
                        enter_sym * exit_ratio,
                        enter_sym * flip_ratio,
                    );
                    if sym.is_valid() {
                        candidates.push(sym);
                    }
                }
                if enter_long.is_finite() && enter_short.is_finite() {
                    let asym = ThresholdSet {
                        enter_long,
                        enter_short,
                        exit_long: enter_long * exit_ratio,
                        exit_short: enter_short * exit_ratio,
                        flip_long: enter_long * flip_ratio,
                        flip_short: enter_short * flip_ratio,
                    };
                    if asym.is_valid() {
                        candidates.push(asym);
                    }
                }
            }
        }
    }
    candidates
}

/// Baseline thresholds: the symmetric 90th-percentile set with the
/// conventional 0.3× exit and 2.0× flip bands.
///
/// Used by the recency gate as the score a recommendation must beat, and as
/// the fallback "auto" configuration.
pub fn auto_baseline(z_values: &[f64]) -> Option<ThresholdSet> {
    let mut abs: Vec<f64> = z_values.iter().map(|z| z.abs()).filter(|z| z.is_finite()).collect();
    if abs.is_empty() {
        return None;
    }
    abs.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let enter = quantile(&abs, 0.90);
    let set = ThresholdSet::symmetric(enter, enter * 0.3, enter * 2.0);
    set.is_valid().then_some(set)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quantile_interpolates() {
        let sorted = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        assert!((quantile(&sorted, 0.5) - 3.0).abs() < 1e-12);
        assert!((quantile(&sorted, 0.0) - 1.0).abs() < 1e-12);
        assert!((quantile(&sorted, 1.0) - 5.0).abs() < 1e-12);
        assert!((quantile(&sorted, 0.25) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn quantile_empty_is_nan() {
        assert!(quantile(&[], 0.5).is_nan());
    }

    #[test]
    fn quantile_single_value() {
        assert_eq!(quantile(&[7.0], 0.9), 7.0);
    }

    #[test]
    fn derived_candidates_all_valid() {
        let z: Vec<f64> = (0..200)
            .map(|i| ((i as f64) * 0.37).sin() * 2.0)
            .collect();
        let candidates = derive_candidates(&z, &CandidateGrid::default());
        assert!(!candidates.is_empty());
        for c in &candidates {
            assert!(c.validate().is_ok(), "invalid candidate {c:?}");
        }
    }

    #[test]
    fn symmetric_and_asymmetric_variants_present() {
        // Skewed distribution: positive z's much larger than negative.
        let mut z: Vec<f64> = (0..100).map(|i| 2.0 + (i as f64) * 0.01).collect();
        z.extend((0..100).map(|i| -0.5 - (i as f64) * 0.001));
        let candidates = derive_candidates(&z, &CandidateGrid::default());

        // Asymmetric candidates differ between sides.
        assert!(candidates
            .iter()
            .any(|c| (c.enter_long - c.enter_short).abs() > 1e-9));
        // Symmetric candidates have identical sides.
        assert!(candidates
            .iter()
            .any(|c| (c.enter_long - c.enter_short).abs() < 1e-12));
    }

    #[test]
    fn degenerate_distribution_yields_no_candidates() {
        let z = vec![0.0; 300];
        assert!(derive_candidates(&z, &CandidateGrid::default()).is_empty());
    }

    #[test]
    fn one_sided_distribution_still_yields_symmetric() {
        // All z positive: the asymmetric short side has no data, but the
        // symmetric candidates survive.
        let z: Vec<f64> = (1..100).map(|i| i as f64 * 0.02).collect();
        let candidates = derive_candidates(&z, &CandidateGrid::default());
        assert!(!candidates.is_empty());
    }

    #[test]
    fn auto_baseline_shape() {
        let z: Vec<f64> = (0..100).map(|i| ((i as f64) * 0.37).sin() * 2.0).collect();
        let t = auto_baseline(&z).unwrap();
        assert!(t.validate().is_ok());
        assert!((t.exit_long - t.enter_long * 0.3).abs() < 1e-12);
        assert!((t.flip_long - t.enter_long * 2.0).abs() < 1e-12);
    }

    #[test]
    fn auto_baseline_degenerate_is_none() {
        assert!(auto_baseline(&[0.0; 10]).is_none());
        assert!(auto_baseline(&[]).is_none());
    }
}
