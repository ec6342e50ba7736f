//! Store options.

use std::str::FromStr;
use std::time::Duration;

/// How [`crate::SqliteStore::apply_patch`] performs the read-merge-write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ApplyStrategy {
    /// Immediate transaction around an in-process merge
    #[default]
    Transactional,
    /// Single `UPDATE` statement using SQLite's `json_patch`
    InEngine,
}

impl FromStr for ApplyStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "transactional" => Ok(ApplyStrategy::Transactional),
            "in-engine" => Ok(ApplyStrategy::InEngine),
            other => Err(format!(
                "unknown apply strategy {other:?} (expected \"transactional\" or \"in-engine\")"
            )),
        }
    }
}

impl std::fmt::Display for ApplyStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApplyStrategy::Transactional => write!(f, "transactional"),
            ApplyStrategy::InEngine => write!(f, "in-engine"),
        }
    }
}

/// Retry behaviour for [`crate::StoreError::StorageUnavailable`].
///
/// Retrying is safe because re-applying a committed merge patch is a no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first; `1` disables retrying
    pub max_attempts: u32,
    /// Delay before the second attempt; grows linearly afterwards
    pub backoff: Duration,
}

impl RetryPolicy {
    /// Never retry.
    #[must_use]
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            backoff: Duration::ZERO,
        }
    }

    /// Delay to wait after `attempt` (1-based) failed.
    #[must_use]
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.backoff.saturating_mul(attempt)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::from_millis(50),
        }
    }
}

/// Options for opening a [`crate::SqliteStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreOptions {
    /// How long SQLite waits on a locked database before reporting busy
    pub busy_timeout: Duration,
    /// Read-merge-write strategy
    pub strategy: ApplyStrategy,
    /// Retry policy for transient storage failures
    pub retry: RetryPolicy,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            busy_timeout: Duration::from_secs(5),
            strategy: ApplyStrategy::default(),
            retry: RetryPolicy::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn options_default() {
        let options = StoreOptions::default();
        assert_eq!(options.busy_timeout, Duration::from_secs(5));
        assert_eq!(options.strategy, ApplyStrategy::Transactional);
        assert_eq!(options.retry.max_attempts, 3);
    }

    #[test]
    fn strategy_parse_and_display() {
        for strategy in [ApplyStrategy::Transactional, ApplyStrategy::InEngine] {
            assert_eq!(strategy.to_string().parse::<ApplyStrategy>(), Ok(strategy));
        }
        assert!("pushdown".parse::<ApplyStrategy>().is_err());
    }

    #[test]
    fn backoff_grows_linearly() {
        let retry = RetryPolicy {
            max_attempts: 4,
            backoff: Duration::from_millis(10),
        };
        assert_eq!(retry.delay_after(1), Duration::from_millis(10));
        assert_eq!(retry.delay_after(3), Duration::from_millis(30));
        assert_eq!(RetryPolicy::none().delay_after(5), Duration::ZERO);
    }
}
