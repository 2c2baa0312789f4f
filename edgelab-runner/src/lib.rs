//! edgelab runner — walk-forward orchestration on top of `edgelab-core`.
//!
//! This crate provides:
//! - Forecast series loading (CSV) with a synthetic GBM fallback
//! - Performance metrics and the candidate ranking rule
//! - Walk-forward fold creation and the threshold optimizer
//! - The recency/stability gate and its decision object
//! - Versioned, write-once threshold caching
//! - TOML run configuration
//! - CSV export of trades and the daily ledger

pub mod cache;
pub mod candidates;
pub mod config;
pub mod data_loader;
pub mod export;
pub mod folds;
pub mod gate;
pub mod metrics;
pub mod optimizer;

pub use cache::{CacheKey, CachedEntry, ThresholdCache, SCHEMA_VERSION};
pub use config::{RunConfig, RunConfigError};
pub use candidates::{auto_baseline, derive_candidates, CandidateGrid};
pub use data_loader::{generate_synthetic, load_csv, LoadError, LoadedSeries, SyntheticConfig};
pub use export::save_artifacts;
pub use folds::{create_folds, FoldConfig, FoldError, FoldSpec};
pub use gate::{Decision, ReasonCode, RecencyConfig, RecencyStats, SelectionTier};
pub use metrics::RunMetrics;
pub use optimizer::{
    optimize, FoldOutcome, FoldResult, FoldSkipReason, OptimizeError, OptimizeReport,
    OptimizerConfig,
};
