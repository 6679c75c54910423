//! Inspect command implementation.

use osmsync_replication::{FileReplicationStatePersister, ReplicationState, LOCK_FILE_NAME};
use osmsync_storage::{DirLock, StorageError};
use serde::Serialize;
use std::path::Path;

/// Replication directory inspection result.
#[derive(Debug, Serialize)]
pub struct InspectResult {
    /// Working directory path.
    pub path: String,
    /// Whether a replicator currently holds the directory lock.
    pub locked: bool,
    /// Transaction ids not yet covered by a batch.
    pub txn_backlog: u64,
    /// The current state.
    pub state: ReplicationState,
}

/// Reads the state of the working directory at `path`.
pub fn inspect(path: &Path) -> Result<InspectResult, Box<dyn std::error::Error>> {
    let state_path = FileReplicationStatePersister::state_path(path);
    if !state_path.exists() {
        return Err(format!("No replication state found at {}", path.display()).into());
    }
    let state = FileReplicationStatePersister::read_state(&state_path)?;

    Ok(InspectResult {
        path: path.display().to_string(),
        locked: is_locked(path)?,
        txn_backlog: backlog(&state),
        state,
    })
}

/// Runs the inspect command.
pub fn run(path: &Path, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let result = inspect(path)?;

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        _ => {
            print_text_output(&result);
        }
    }

    Ok(())
}

fn is_locked(path: &Path) -> Result<bool, Box<dyn std::error::Error>> {
    // Only probe an existing lock file; inspecting must not create one.
    if !path.join(LOCK_FILE_NAME).exists() {
        return Ok(false);
    }
    match DirLock::acquire(path, LOCK_FILE_NAME) {
        Ok(_) => Ok(false),
        Err(StorageError::Locked { .. }) => Ok(true),
        Err(e) => Err(e.into()),
    }
}

/// Ids between `txn_max_queried` and `txn_max`, ignoring wraparound
/// beyond one cycle of the 32-bit counter.
fn backlog(state: &ReplicationState) -> u64 {
    if state.txn_max >= state.txn_max_queried {
        state.txn_max - state.txn_max_queried
    } else {
        // Wrapped: up to the top of the counter, then from the first normal id.
        u64::from(u32::MAX).saturating_sub(state.txn_max_queried) + state.txn_max.saturating_sub(2)
    }
}

fn join(ids: &[u64]) -> String {
    if ids.is_empty() {
        return "-".to_string();
    }
    ids.iter().map(u64::to_string).collect::<Vec<_>>().join(", ")
}

fn print_text_output(result: &InspectResult) {
    let state = &result.state;
    println!("osmsync Replication State");
    println!("=========================");
    println!();
    println!("Path:      {}", result.path);
    println!("Locked:    {}", if result.locked { "yes (replicator running)" } else { "no" });
    println!();
    println!("Sequence:  {}", state.sequence_number);
    println!("Timestamp: {}", state.timestamp.format("%Y-%m-%dT%H:%M:%SZ"));
    println!();
    println!("Transactions:");
    println!("  Max:         {}", state.txn_max);
    println!("  Max queried: {}", state.txn_max_queried);
    println!("  Backlog:     {}", result.txn_backlog);
    println!("  Active:      {}", join(&state.txn_active));
    println!("  Ready:       {}", join(&state.txn_ready));
}
