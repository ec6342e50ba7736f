//! CLI configuration.

use anyhow::{Context, Result};
use seqmeta_store::{ApplyStrategy, StoreOptions};
use std::path::PathBuf;
use std::time::Duration;

/// CLI configuration.
#[derive(Debug, Clone)]
pub struct CliConfig {
    /// Database path
    pub db_path: PathBuf,

    /// Options passed to the store
    pub store: StoreOptions,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("./seqmeta.db"),
            store: StoreOptions::default(),
        }
    }
}

impl CliConfig {
    /// Load configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `SEQMETA_DB_PATH`: SQLite database path
    /// - `SEQMETA_BUSY_TIMEOUT_MS`: Lock wait before reporting busy
    /// - `SEQMETA_MAX_ATTEMPTS`: Attempts for a patch on transient failures
    /// - `SEQMETA_RETRY_BACKOFF_MS`: Base delay between attempts
    /// - `SEQMETA_APPLY_STRATEGY`: "transactional" or "in-engine"
    ///
    /// # Errors
    ///
    /// Returns error if a variable is set to an invalid value.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(db_path) = lookup("SEQMETA_DB_PATH") {
            config.db_path = PathBuf::from(db_path);
        }

        if let Some(ms) = lookup("SEQMETA_BUSY_TIMEOUT_MS") {
            config.store.busy_timeout = Duration::from_millis(
                ms.parse().context("Invalid SEQMETA_BUSY_TIMEOUT_MS")?,
            );
        }

        if let Some(attempts) = lookup("SEQMETA_MAX_ATTEMPTS") {
            let attempts: u32 = attempts.parse().context("Invalid SEQMETA_MAX_ATTEMPTS")?;
            anyhow::ensure!(attempts > 0, "SEQMETA_MAX_ATTEMPTS must be at least 1");
            config.store.retry.max_attempts = attempts;
        }

        if let Some(ms) = lookup("SEQMETA_RETRY_BACKOFF_MS") {
            config.store.retry.backoff = Duration::from_millis(
                ms.parse().context("Invalid SEQMETA_RETRY_BACKOFF_MS")?,
            );
        }

        if let Some(strategy) = lookup("SEQMETA_APPLY_STRATEGY") {
            config.store.strategy = strategy
                .parse::<ApplyStrategy>()
                .map_err(anyhow::Error::msg)
                .context("Invalid SEQMETA_APPLY_STRATEGY")?;
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn from_pairs(pairs: &[(&str, &str)]) -> Result<CliConfig> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        CliConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_without_environment() {
        let config = from_pairs(&[]).unwrap();
        assert_eq!(config.db_path, PathBuf::from("./seqmeta.db"));
        assert_eq!(config.store, StoreOptions::default());
    }

    #[test]
    fn overrides_from_environment() {
        let config = from_pairs(&[
            ("SEQMETA_DB_PATH", "/var/lib/seqmeta/meta.db"),
            ("SEQMETA_BUSY_TIMEOUT_MS", "250"),
            ("SEQMETA_MAX_ATTEMPTS", "5"),
            ("SEQMETA_RETRY_BACKOFF_MS", "20"),
            ("SEQMETA_APPLY_STRATEGY", "in-engine"),
        ])
        .unwrap();

        assert_eq!(config.db_path, PathBuf::from("/var/lib/seqmeta/meta.db"));
        assert_eq!(config.store.busy_timeout, Duration::from_millis(250));
        assert_eq!(config.store.retry.max_attempts, 5);
        assert_eq!(config.store.retry.backoff, Duration::from_millis(20));
        assert_eq!(config.store.strategy, ApplyStrategy::InEngine);
    }

    #[test]
    fn invalid_values_are_reported() {
        let err = from_pairs(&[("SEQMETA_BUSY_TIMEOUT_MS", "soon")]).unwrap_err();
        assert!(err.to_string().contains("SEQMETA_BUSY_TIMEOUT_MS"));

        let err = from_pairs(&[("SEQMETA_APPLY_STRATEGY", "pushdown")]).unwrap_err();
        assert!(err.to_string().contains("SEQMETA_APPLY_STRATEGY"));

        assert!(from_pairs(&[("SEQMETA_MAX_ATTEMPTS", "0")]).is_err());
    }
}
