//! Durable storage of replication state.

use super::record::ReplicationState;
use crate::error::{ReplicationError, ReplicationResult};
use osmsync_storage::{write_atomic, DirLock};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Name of the current state file in the working directory.
pub const STATE_FILE_NAME: &str = "state.txt";

/// Name of the lock file held while replicating.
pub const LOCK_FILE_NAME: &str = "replicate.lock";

/// Loads and saves replication state.
///
/// `save_state` is the commit point of a batch: once it returns, the batch
/// is never replayed. It must therefore replace the state atomically.
pub trait ReplicationStatePersister {
    /// Returns true if a state has been saved.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be inspected.
    fn state_exists(&self) -> ReplicationResult<bool>;

    /// Loads the saved state.
    ///
    /// # Errors
    ///
    /// Returns [`ReplicationError::NotInitialized`] if nothing was saved,
    /// or a format error for a corrupt state.
    fn load_state(&self) -> ReplicationResult<ReplicationState>;

    /// Replaces the saved state.
    ///
    /// # Errors
    ///
    /// Returns an error if the state could not be written; the previous
    /// state is then still in place.
    fn save_state(&mut self, state: &ReplicationState) -> ReplicationResult<()>;
}

/// Persists state as `state.txt` in a working directory.
///
/// Each save also writes an audit copy named after the sequence number,
/// split into three-digit directories: sequence 1234567 is kept at
/// `001/234/567.state.txt`. The directory lock is held for the lifetime
/// of the persister.
#[derive(Debug)]
pub struct FileReplicationStatePersister {
    dir: PathBuf,
    lock: DirLock,
}

impl FileReplicationStatePersister {
    /// Opens `dir`, creating it if needed, and takes the replication lock.
    ///
    /// # Errors
    ///
    /// Returns [`ReplicationError::Locked`] if another process holds the
    /// lock.
    pub fn open(dir: impl Into<PathBuf>) -> ReplicationResult<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        let lock = DirLock::acquire(&dir, LOCK_FILE_NAME)?;
        tracing::debug!(dir = %dir.display(), "opened state directory");
        Ok(Self { dir, lock })
    }

    /// The working directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the held lock file.
    pub fn lock_path(&self) -> &Path {
        self.lock.path()
    }

    /// Path of the current state file in `dir`.
    pub fn state_path(dir: &Path) -> PathBuf {
        dir.join(STATE_FILE_NAME)
    }

    /// Path of the audit copy for `sequence` in `dir`.
    pub fn audit_path(dir: &Path, sequence: u64) -> PathBuf {
        let digits = format!("{sequence:09}");
        let (top, rest) = digits.split_at(digits.len() - 6);
        let (middle, file) = rest.split_at(3);
        dir.join(top).join(middle).join(format!("{file}.{STATE_FILE_NAME}"))
    }

    /// Reads and parses a state file without taking the lock.
    ///
    /// # Errors
    ///
    /// Returns [`ReplicationError::NotInitialized`] if the file is missing.
    pub fn read_state(path: &Path) -> ReplicationResult<ReplicationState> {
        match std::fs::read_to_string(path) {
            Ok(text) => text.parse(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(ReplicationError::NotInitialized),
            Err(e) => Err(e.into()),
        }
    }
}

impl ReplicationStatePersister for FileReplicationStatePersister {
    fn state_exists(&self) -> ReplicationResult<bool> {
        Ok(Self::state_path(&self.dir).try_exists()?)
    }

    fn load_state(&self) -> ReplicationResult<ReplicationState> {
        Self::read_state(&Self::state_path(&self.dir))
    }

    fn save_state(&mut self, state: &ReplicationState) -> ReplicationResult<()> {
        let text = state.to_properties();
        // Audit copy first, so the current state always has one.
        write_atomic(&Self::audit_path(&self.dir, state.sequence_number), text.as_bytes())?;
        write_atomic(&Self::state_path(&self.dir), text.as_bytes())?;
        tracing::info!(sequence = state.sequence_number, "saved replication state");
        Ok(())
    }
}

/// Keeps state in memory. Clones share the same state.
#[derive(Debug, Clone, Default)]
pub struct MemoryStatePersister {
    inner: Arc<Mutex<MemoryStateInner>>,
}

#[derive(Debug, Default)]
struct MemoryStateInner {
    state: Option<ReplicationState>,
    saves: Vec<ReplicationState>,
}

impl MemoryStatePersister {
    /// Creates an empty persister.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a persister already holding `state`.
    pub fn with_state(state: ReplicationState) -> Self {
        let persister = Self::new();
        persister.inner.lock().state = Some(state);
        persister
    }

    /// The current state, if any.
    pub fn current(&self) -> Option<ReplicationState> {
        self.inner.lock().state.clone()
    }

    /// Every saved state in order.
    pub fn history(&self) -> Vec<ReplicationState> {
        self.inner.lock().saves.clone()
    }
}

impl ReplicationStatePersister for MemoryStatePersister {
    fn state_exists(&self) -> ReplicationResult<bool> {
        Ok(self.inner.lock().state.is_some())
    }

    fn load_state(&self) -> ReplicationResult<ReplicationState> {
        self.inner.lock().state.clone().ok_or(ReplicationError::NotInitialized)
    }

    fn save_state(&mut self, state: &ReplicationState) -> ReplicationResult<()> {
        let mut inner = self.inner.lock();
        inner.state = Some(state.clone());
        inner.saves.push(state.clone());
        Ok(())
    }
}
