//! Crash replay testing.
//!
//! A batch is failed part way through delivery, then run again with a
//! working sink. The saved state must not have moved, and the second run
//! must deliver the same batch from the start.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use osmsync_testkit::crash::{fail_and_replay, FailPoint};
//!
//! let report = fail_and_replay(source, persister, ReplicatorConfig::new(), FailPoint::Process(3))?;
//! assert!(report.is_consistent());
//! ```

use crate::fixtures::{FailPoint, FailingChangeSink, MemoryChangeSink};
use osmsync_replication::{
    ChangeContainer, MemoryStatePersister, ReplicationError, ReplicationResult, ReplicationSource, Replicator,
    ReplicatorConfig,
};

/// What happened when a batch was failed and replayed.
#[derive(Debug, Clone)]
pub struct ReplayReport {
    /// Error returned by the failed run.
    pub error: String,
    /// Whether the saved state was untouched by the failed run.
    pub state_unchanged: bool,
    /// Changes the failing sink accepted.
    pub attempted: Vec<ChangeContainer>,
    /// Changes delivered by the replay.
    pub replayed: Vec<ChangeContainer>,
    /// Sequence number written by the replay.
    pub sequence_number: u64,
}

impl ReplayReport {
    /// True if the state held and the replay started over from the same
    /// first change.
    pub fn is_consistent(&self) -> bool {
        self.state_unchanged && self.replayed.starts_with(&self.attempted)
    }
}

/// Fails one batch at `fail_point`, then replays it.
///
/// `persister` must already hold a state; otherwise the first run is the
/// bootstrap, which delivers no changes.
///
/// # Errors
///
/// Returns an error if the first run unexpectedly succeeds or the replay
/// fails.
pub fn fail_and_replay<S: ReplicationSource>(
    source: S,
    persister: MemoryStatePersister,
    config: ReplicatorConfig,
    fail_point: FailPoint,
) -> ReplicationResult<ReplayReport> {
    let before = persister.current();

    let mut replicator = Replicator::new(source, FailingChangeSink::new(fail_point), persister.clone(), config.clone());
    let error = match replicator.replicate() {
        Ok(outcome) => {
            return Err(ReplicationError::destination_failed(format!(
                "batch {} did not fail at {fail_point:?}",
                outcome.sequence_number
            )))
        }
        Err(e) => e.to_string(),
    };
    let state_unchanged = persister.current() == before;

    let (source, failing, persister) = replicator.into_parts();
    let sink = MemoryChangeSink::new();
    let mut replicator = Replicator::new(source, sink.clone(), persister, config);
    let outcome = replicator.replicate()?;

    Ok(ReplayReport {
        error,
        state_unchanged,
        attempted: failing.seen().to_vec(),
        replayed: sink.changes(),
        sequence_number: outcome.sequence_number,
    })
}
