//! Walk-forward fold creation — rolling train/validation window pairs.
//!
//! Unlike an expanding-window scheme, folds here slide forward with a fixed
//! train length: the train window is only used to derive threshold
//! candidates from edge quantiles, never to score them, so older data does
//! not need to accumulate.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Fold geometry configuration, in trading days.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FoldConfig {
    /// Train window length (candidate derivation only).
    pub train_len: usize,
    /// Validation window length (scoring only).
    pub validation_len: usize,
    /// Slide distance between consecutive folds.
    pub step_len: usize,
}

impl Default for FoldConfig {
    fn default() -> Self {
        Self {
            train_len: 252,
            validation_len: 63,
            step_len: 63,
        }
    }
}

/// A single fold: index ranges into the shared edge series.
///
/// All bounds are half-open `[start, end)`. The validation window starts
/// exactly where the train window ends, so a candidate never sees the data
/// it is scored on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FoldSpec {
    pub fold_index: usize,
    pub train_start: usize,
    pub train_end: usize,
    pub validation_start: usize,
    pub validation_end: usize,
}

/// Errors from fold creation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FoldError {
    #[error("fold geometry invalid: train {train_len}, validation {validation_len}, step {step_len} must all be positive")]
    InvalidGeometry {
        train_len: usize,
        validation_len: usize,
        step_len: usize,
    },
    #[error("insufficient data: {total} points < minimum {min} (train + validation)")]
    InsufficientData { total: usize, min: usize },
}

/// Create sliding walk-forward folds over `total` points.
///
/// Fold k trains on `[k*step, k*step + train_len)` and validates on the
/// following `validation_len` points. Folds are emitted while the validation
/// window fits entirely inside the data.
pub fn create_folds(total: usize, config: &FoldConfig) -> Result<Vec<FoldSpec>, FoldError> {
    if config.train_len == 0 || config.validation_len == 0 || config.step_len == 0 {
        return Err(FoldError::InvalidGeometry {
            train_len: config.train_len,
            validation_len: config.validation_len,
            step_len: config.step_len,
        });
    }
    let min = config.train_len + config.validation_len;
    if total < min {
        return Err(FoldError::InsufficientData { total, min });
    }

    let mut folds = Vec::new();
    let mut fold_index = 0;
    let mut train_start = 0;
    loop {
        let train_end = train_start + config.train_len;
        let validation_end = train_end + config.validation_len;
        if validation_end > total {
            break;
        }
        folds.push(FoldSpec {
            fold_index,
            train_start,
            train_end,
            validation_start: train_end,
            validation_end,
        });
        fold_index += 1;
        train_start += config.step_len;
    }
    Ok(folds)
}
