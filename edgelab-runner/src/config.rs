//! TOML run configuration for the CLI.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use edgelab_core::domain::{ThresholdError, ThresholdSet};
use edgelab_core::sim::{ConfigError, SimConfig};

use crate::optimizer::OptimizerConfig;

/// Complete run configuration.
///
/// `[account]` is required; `[thresholds]` is required for plain simulation
/// and ignored by the optimizer; `[optimizer]` falls back to defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    pub account: SimConfig,
    pub thresholds: Option<ThresholdSet>,
    #[serde(default)]
    pub optimizer: OptimizerConfig,
}

/// Errors from configuration loading.
#[derive(Debug, Error)]
pub enum RunConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("account section rejected: {0}")]
    Account(#[from] ConfigError),
    #[error("thresholds section rejected: {0}")]
    Thresholds(#[from] ThresholdError),
}

impl RunConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, RunConfigError> {
        let path_str = path.as_ref().display().to_string();
        let content = std::fs::read_to_string(&path).map_err(|source| RunConfigError::Io {
            path: path_str,
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, RunConfigError> {
        let config: RunConfig = toml::from_str(content)?;
        config.account.validate()?;
        if let Some(thresholds) = &config.thresholds {
            thresholds.validate()?;
        }
        Ok(config)
    }
}
