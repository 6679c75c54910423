//! Configuration for the replicator.

use osmsync_store::StoreConfig;
use std::path::PathBuf;
use std::time::Duration;

/// Default maximum number of transaction ids covered by one batch.
pub const DEFAULT_MAX_TXN_QUERY_COUNT: u32 = 100_000;

/// Configuration for replication runs.
#[derive(Debug, Clone)]
pub struct ReplicatorConfig {
    /// Maximum transaction ids walked per batch.
    pub max_txn_query_count: u32,
    /// Number of batches [`crate::Replicator::run`] performs; 0 runs forever.
    pub iterations: u32,
    /// Pause after a batch that caught up with the source.
    pub min_interval: Duration,
    /// Longest time allowed between written sequences. An empty batch is
    /// only written once this much time has passed since the last one.
    pub max_interval: Duration,
    /// Emit every version of an entity instead of only the latest per batch.
    pub full_history: bool,
    /// Spill store settings for materialized row streams.
    pub store: StoreConfig,
}

impl ReplicatorConfig {
    /// Creates a configuration with defaults: one iteration, no pacing.
    pub fn new() -> Self {
        Self {
            max_txn_query_count: DEFAULT_MAX_TXN_QUERY_COUNT,
            iterations: 1,
            min_interval: Duration::ZERO,
            max_interval: Duration::ZERO,
            full_history: false,
            store: StoreConfig::default(),
        }
    }

    /// Sets the per-batch transaction id cap (minimum 1).
    pub fn with_max_txn_query_count(mut self, count: u32) -> Self {
        self.max_txn_query_count = count.max(1);
        self
    }

    /// Sets the iteration count; 0 runs until an error occurs.
    pub fn with_iterations(mut self, iterations: u32) -> Self {
        self.iterations = iterations;
        self
    }

    /// Sets the pause after a caught-up batch.
    pub fn with_min_interval(mut self, interval: Duration) -> Self {
        self.min_interval = interval;
        self
    }

    /// Sets the longest gap between written sequences.
    pub fn with_max_interval(mut self, interval: Duration) -> Self {
        self.max_interval = interval;
        self
    }

    /// Enables or disables full history output.
    pub fn with_full_history(mut self, full_history: bool) -> Self {
        self.full_history = full_history;
        self
    }

    /// Sets the directory for spill files.
    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.store = self.store.with_temp_dir(dir);
        self
    }

    /// Sets the spill store configuration.
    pub fn with_store_config(mut self, store: StoreConfig) -> Self {
        self.store = store;
        self
    }
}

impl Default for ReplicatorConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replicator_config_builder() {
        let config = ReplicatorConfig::new()
            .with_max_txn_query_count(0)
            .with_iterations(0)
            .with_min_interval(Duration::from_secs(10))
            .with_max_interval(Duration::from_secs(60))
            .with_full_history(true);

        assert_eq!(config.max_txn_query_count, 1);
        assert_eq!(config.iterations, 0);
        assert_eq!(config.min_interval, Duration::from_secs(10));
        assert_eq!(config.max_interval, Duration::from_secs(60));
        assert!(config.full_history);
    }

    #[test]
    fn defaults() {
        let config = ReplicatorConfig::default();
        assert_eq!(config.max_txn_query_count, DEFAULT_MAX_TXN_QUERY_COUNT);
        assert_eq!(config.iterations, 1);
        assert!(!config.full_history);
    }
}
