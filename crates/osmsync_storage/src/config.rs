//! Storage configuration.

use std::path::PathBuf;

/// Default I/O buffer size for spill file readers and writers.
pub const DEFAULT_BUFFER_SIZE: usize = 64 * 1024;

/// Configuration for spill file creation.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Directory for temporary files. `None` uses the system temp directory.
    pub temp_dir: Option<PathBuf>,
    /// Buffer size for readers and writers.
    pub buffer_size: usize,
}

impl StorageConfig {
    /// Creates a configuration using the system temp directory.
    pub fn new() -> Self {
        Self {
            temp_dir: None,
            buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }

    /// Sets the directory for temporary files.
    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = Some(dir.into());
        self
    }

    /// Sets the I/O buffer size.
    pub fn with_buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size.max(1);
        self
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self::new()
    }
}
