//! Threshold cache — versioned, deterministic keys over file-backed JSON.
//!
//! The key is a strongly typed struct covering every parameter that affects
//! the optimization result. It is serialized canonically (fixed struct field
//! order) and hashed with BLAKE3, so identical inputs always produce an
//! identical key string. `SCHEMA_VERSION` lives inside the key struct: any
//! change to key derivation or entry format bumps it, which changes every
//! key and strands stale entries instead of mutating key semantics silently.
//!
//! Entries are write-once per key — a hit is authoritative and never
//! partially stale.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use edgelab_core::domain::ThresholdSet;
use edgelab_core::sim::SimConfig;

use crate::gate::Decision;
use crate::optimizer::OptimizerConfig;

/// Bump on any change to key derivation or the cached entry format.
pub const SCHEMA_VERSION: u32 = 1;

/// Everything that determines an optimization result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheKey {
    pub schema_version: u32,
    pub symbol: String,
    /// Last date covered by the edge series.
    pub data_end: NaiveDate,
    /// Forecast horizon in trading days.
    pub horizon: u32,
    /// Number of edge points the series contains.
    pub coverage: usize,
    pub sim: SimConfig,
    pub optimizer: OptimizerConfig,
}

impl CacheKey {
    pub fn new(
        symbol: impl Into<String>,
        data_end: NaiveDate,
        horizon: u32,
        coverage: usize,
        sim: SimConfig,
        optimizer: OptimizerConfig,
    ) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            symbol: symbol.into(),
            data_end,
            horizon,
            coverage,
            sim,
            optimizer,
        }
    }

    /// Deterministic key string: version prefix + BLAKE3 of the canonical
    /// JSON encoding.
    pub fn key_string(&self) -> String {
        let canonical = serde_json::to_string(self).expect("CacheKey must serialize");
        let hash = blake3::hash(canonical.as_bytes());
        format!("v{}-{}", self.schema_version, hash.to_hex())
    }
}

/// A cached optimization outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedEntry {
    pub schema_version: u32,
    pub thresholds: Option<ThresholdSet>,
    pub decision: Decision,
}

/// File-backed threshold cache; one JSON file per key.
#[derive(Debug, Clone)]
pub struct ThresholdCache {
    cache_dir: PathBuf,
}

impl ThresholdCache {
    /// Creates the cache, creating the directory if needed.
    pub fn new(cache_dir: impl AsRef<Path>) -> Result<Self> {
        let cache_dir = cache_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&cache_dir).context("failed to create cache directory")?;
        Ok(Self { cache_dir })
    }

    pub fn contains(&self, key: &CacheKey) -> bool {
        self.entry_path(key).exists()
    }

    /// Retrieve a cached entry; `None` on miss. Entries written under a
    /// different schema version are unreachable by construction (the version
    /// participates in the key).
    pub fn get(&self, key: &CacheKey) -> Result<Option<CachedEntry>> {
        let path = self.entry_path(key);
        if !path.exists() {
            return Ok(None);
        }
        let json = std::fs::read_to_string(&path).context("failed to read cached entry")?;
        let entry: CachedEntry =
            serde_json::from_str(&json).context("failed to deserialize cached entry")?;
        Ok(Some(entry))
    }

    /// Store an entry. Write-once: an existing entry for the key is kept and
    /// the new value is discarded.
    pub fn put(&self, key: &CacheKey, entry: &CachedEntry) -> Result<()> {
        let path = self.entry_path(key);
        if path.exists() {
            return Ok(());
        }
        let json = serde_json::to_string_pretty(entry).context("failed to serialize entry")?;
        std::fs::write(&path, json).context("failed to write cached entry")?;
        Ok(())
    }

    pub fn len(&self) -> Result<usize> {
        let count = std::fs::read_dir(&self.cache_dir)?
            .filter_map(|entry| entry.ok())
            .filter(|entry| {
                entry.path().is_file()
                    && entry.path().extension().and_then(|s| s.to_str()) == Some("json")
            })
            .count();
        Ok(count)
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    fn entry_path(&self, key: &CacheKey) -> PathBuf {
        self.cache_dir.join(format!("{}.json", key.key_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gate::{Decision, ReasonCode};

    fn sample_key() -> CacheKey {
        CacheKey::new(
            "EURUSD",
            NaiveDate::from_ymd_opt(2024, 6, 28).unwrap(),
            16,
            1260,
            SimConfig::frictionless(10_000.0, 5.0),
            OptimizerConfig::default(),
        )
    }

    fn sample_entry() -> CachedEntry {
        CachedEntry {
            schema_version: SCHEMA_VERSION,
            thresholds: Some(ThresholdSet::symmetric(1.1, 0.33, 2.2)),
            decision: Decision::not_applied(ReasonCode::NoFlatRestart, None),
        }
    }

    #[test]
    fn identical_inputs_identical_key() {
        assert_eq!(sample_key().key_string(), sample_key().key_string());
    }

    #[test]
    fn key_carries_version_prefix() {
        assert!(sample_key().key_string().starts_with("v1-"));
    }

    #[test]
    fn any_field_change_changes_key() {
        let base = sample_key().key_string();

        let mut k = sample_key();
        k.symbol = "GBPUSD".into();
        assert_ne!(k.key_string(), base);

        let mut k = sample_key();
        k.data_end = NaiveDate::from_ymd_opt(2024, 7, 1).unwrap();
        assert_ne!(k.key_string(), base);

        let mut k = sample_key();
        k.horizon = 21;
        assert_ne!(k.key_string(), base);

        let mut k = sample_key();
        k.coverage = 1261;
        assert_ne!(k.key_string(), base);

        let mut k = sample_key();
        k.sim.spread_bps = 10.0;
        assert_ne!(k.key_string(), base);

        let mut k = sample_key();
        k.optimizer.folds.train_len = 126;
        assert_ne!(k.key_string(), base);
    }

    #[test]
    fn schema_version_changes_key() {
        let mut k = sample_key();
        k.schema_version = 2;
        assert_ne!(k.key_string(), sample_key().key_string());
        assert!(k.key_string().starts_with("v2-"));
    }

    #[test]
    fn put_get_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ThresholdCache::new(dir.path()).unwrap();
        let key = sample_key();

        assert!(!cache.contains(&key));
        assert!(cache.get(&key).unwrap().is_none());

        cache.put(&key, &sample_entry()).unwrap();
        assert!(cache.contains(&key));
        assert_eq!(cache.get(&key).unwrap().unwrap(), sample_entry());
    }

    #[test]
    fn second_build_hits_cache_with_identical_thresholds() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ThresholdCache::new(dir.path()).unwrap();

        // Two independently constructed but identical keys resolve to the
        // same entry.
        cache.put(&sample_key(), &sample_entry()).unwrap();
        let hit = cache.get(&sample_key()).unwrap().expect("cache hit");
        assert_eq!(hit.thresholds, sample_entry().thresholds);
        assert_eq!(cache.len().unwrap(), 1);
    }

    #[test]
    fn put_is_write_once() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ThresholdCache::new(dir.path()).unwrap();
        let key = sample_key();

        cache.put(&key, &sample_entry()).unwrap();

        let mut other = sample_entry();
        other.thresholds = Some(ThresholdSet::symmetric(9.0, 1.0, 20.0));
        cache.put(&key, &other).unwrap();

        // First write wins.
        assert_eq!(cache.get(&key).unwrap().unwrap(), sample_entry());
    }
}
