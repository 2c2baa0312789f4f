//! ThresholdSet — hysteresis trigger levels for the signal state machine.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Hysteresis thresholds, all non-negative magnitudes compared against the
/// signed standardized edge.
///
/// Per side the bands must be strictly ordered: `exit < enter < flip`.
/// The exit band sits inside the entry band so a position is not dropped by
/// the same noise that opened it, and the flip band sits outside the entry
/// band so a direct long↔short reversal requires a stronger reading than a
/// fresh entry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdSet {
    pub enter_long: f64,
    pub enter_short: f64,
    pub exit_long: f64,
    pub exit_short: f64,
    pub flip_long: f64,
    pub flip_short: f64,
}

/// Why a ThresholdSet was rejected.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ThresholdError {
    #[error("threshold '{0}' is not a finite non-negative number")]
    NotFinite(&'static str),
    #[error("long band ordering violated: exit {exit} < enter {enter} < flip {flip} required")]
    LongBandOrdering { exit: f64, enter: f64, flip: f64 },
    #[error("short band ordering violated: exit {exit} < enter {enter} < flip {flip} required")]
    ShortBandOrdering { exit: f64, enter: f64, flip: f64 },
}

impl ThresholdSet {
    /// Symmetric set: both sides share the same enter/exit/flip magnitudes.
    pub fn symmetric(enter: f64, exit: f64, flip: f64) -> Self {
        Self {
            enter_long: enter,
            enter_short: enter,
            exit_long: exit,
            exit_short: exit,
            flip_long: flip,
            flip_short: flip,
        }
    }

    /// Validate the hysteresis band ordering invariant.
    ///
    /// Violated sets must be rejected before any use; the state machine
    /// assumes a valid set.
    pub fn validate(&self) -> Result<(), ThresholdError> {
        let fields = [
            ("enter_long", self.enter_long),
            ("enter_short", self.enter_short),
            ("exit_long", self.exit_long),
            ("exit_short", self.exit_short),
            ("flip_long", self.flip_long),
            ("flip_short", self.flip_short),
        ];
        for (name, value) in fields {
            if !value.is_finite() || value < 0.0 {
                return Err(ThresholdError::NotFinite(name));
            }
        }
        if !(self.exit_long < self.enter_long && self.enter_long < self.flip_long) {
            return Err(ThresholdError::LongBandOrdering {
                exit: self.exit_long,
                enter: self.enter_long,
                flip: self.flip_long,
            });
        }
        if !(self.exit_short < self.enter_short && self.enter_short < self.flip_short) {
            return Err(ThresholdError::ShortBandOrdering {
                exit: self.exit_short,
                enter: self.enter_short,
                flip: self.flip_short,
            });
        }
        Ok(())
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }
}
