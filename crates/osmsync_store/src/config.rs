//! Configuration for object stores and sorting.

use osmsync_storage::StorageConfig;
use std::path::PathBuf;

/// Default number of records sorted in memory per run.
pub const DEFAULT_SORT_RUN_SIZE: usize = 16 * 1024;

/// Default number of runs merged together in one pass.
pub const DEFAULT_SORT_FAN_IN: usize = 8;

/// Configuration shared by stores, indexes and the external sort.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Spill file settings.
    pub storage: StorageConfig,
    /// Records held in memory before a sorted run is spilled.
    pub sort_run_size: usize,
    /// Maximum runs read concurrently during a merge pass.
    pub sort_fan_in: usize,
}

impl StoreConfig {
    /// Creates a configuration with default limits.
    pub fn new() -> Self {
        Self {
            storage: StorageConfig::default(),
            sort_run_size: DEFAULT_SORT_RUN_SIZE,
            sort_fan_in: DEFAULT_SORT_FAN_IN,
        }
    }

    /// Sets the directory for spill files.
    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.storage = self.storage.with_temp_dir(dir);
        self
    }

    /// Sets the I/O buffer size.
    pub fn with_buffer_size(mut self, size: usize) -> Self {
        self.storage = self.storage.with_buffer_size(size);
        self
    }

    /// Sets the in-memory run size for sorting.
    pub fn with_sort_run_size(mut self, size: usize) -> Self {
        self.sort_run_size = size.max(1);
        self
    }

    /// Sets the merge fan-in. Values below 2 are raised to 2.
    pub fn with_sort_fan_in(mut self, fan_in: usize) -> Self {
        self.sort_fan_in = fan_in.max(2);
        self
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_config_builder() {
        let config = StoreConfig::new()
            .with_temp_dir("/tmp/spill")
            .with_sort_run_size(0)
            .with_sort_fan_in(1);

        assert_eq!(config.storage.temp_dir, Some(PathBuf::from("/tmp/spill")));
        assert_eq!(config.sort_run_size, 1);
        assert_eq!(config.sort_fan_in, 2);
    }

    #[test]
    fn defaults() {
        let config = StoreConfig::default();
        assert_eq!(config.sort_run_size, DEFAULT_SORT_RUN_SIZE);
        assert_eq!(config.sort_fan_in, DEFAULT_SORT_FAN_IN);
        assert!(config.storage.temp_dir.is_none());
    }
}
