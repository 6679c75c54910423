//! The replication state machine.

use crate::change::ChangeContainer;
use crate::config::ReplicatorConfig;
use crate::error::ReplicationResult;
use crate::sink::ChangeSink;
use crate::source::ReplicationSource;
use crate::state::{ReplicationState, ReplicationStatePersister};
use crate::txn::{PostgresTxnIdSpace, QueryPredicates, TxnIdSpace};
use osmsync_store::{BoxedIterator, Release};
use serde::Serialize;
use std::fmt;
use std::time::Instant;

/// Where a replication batch currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReplicationStage {
    /// No batch in progress.
    #[default]
    Idle,
    /// Reading a fresh transaction snapshot.
    SnapshotRefresh,
    /// Choosing the transaction ids of the batch.
    RangeBuild,
    /// Copying changes to the sink.
    Extract,
    /// Completing the sink and saving the state.
    Commit,
}

impl fmt::Display for ReplicationStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ReplicationStage::Idle => "idle",
            ReplicationStage::SnapshotRefresh => "snapshot-refresh",
            ReplicationStage::RangeBuild => "range-build",
            ReplicationStage::Extract => "extract",
            ReplicationStage::Commit => "commit",
        };
        f.write_str(name)
    }
}

/// Result of one batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReplicationOutcome {
    /// Sequence number of the batch.
    pub sequence_number: u64,
    /// Changes sent to the sink.
    pub changes: u64,
    /// Whether every assigned transaction id has now been covered.
    pub caught_up: bool,
    /// Whether the state was saved. An empty batch is skipped by
    /// [`Replicator::run`] until `max_interval` has passed.
    pub committed: bool,
}

/// Counters across the batches of one replicator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReplicatorStats {
    /// Batches whose state was saved.
    pub batches_committed: u64,
    /// Empty batches that were not saved.
    pub batches_skipped: u64,
    /// Changes sent to the sink.
    pub changes: u64,
}

/// Copies changes from a source to a sink in crash-safe batches.
///
/// Each batch loads the saved state, picks the next transaction ids,
/// forwards their changes and only then saves the advanced state. Any
/// failure before the save leaves the saved state as it was, so the next
/// run repeats the same batch.
pub struct Replicator<S, K, P> {
    source: S,
    sink: K,
    persister: P,
    config: ReplicatorConfig,
    id_space: Box<dyn TxnIdSpace>,
    stage: ReplicationStage,
    stats: ReplicatorStats,
    last_commit: Option<Instant>,
}

impl<S, K, P> Replicator<S, K, P>
where
    S: ReplicationSource,
    K: ChangeSink,
    P: ReplicationStatePersister,
{
    /// Creates a replicator using PostgreSQL transaction ids.
    pub fn new(source: S, sink: K, persister: P, config: ReplicatorConfig) -> Self {
        Self {
            source,
            sink,
            persister,
            config,
            id_space: Box::new(PostgresTxnIdSpace),
            stage: ReplicationStage::Idle,
            stats: ReplicatorStats::default(),
            last_commit: None,
        }
    }

    /// Uses a different transaction id scheme.
    #[must_use]
    pub fn with_id_space(mut self, id_space: impl TxnIdSpace + 'static) -> Self {
        self.id_space = Box::new(id_space);
        self
    }

    /// The stage of the batch in progress.
    pub fn stage(&self) -> ReplicationStage {
        self.stage
    }

    /// Counters so far.
    pub fn stats(&self) -> ReplicatorStats {
        self.stats
    }

    /// The configuration.
    pub fn config(&self) -> &ReplicatorConfig {
        &self.config
    }

    /// The change source.
    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    /// The change sink.
    pub fn sink(&self) -> &K {
        &self.sink
    }

    /// The state persister.
    pub fn persister(&self) -> &P {
        &self.persister
    }

    /// Takes the replicator apart.
    pub fn into_parts(self) -> (S, K, P) {
        (self.source, self.sink, self.persister)
    }

    /// Replicates one batch and saves the state, even if the batch is
    /// empty.
    ///
    /// On the very first run no state exists yet: the current snapshot is
    /// recorded as sequence 0 and an empty batch is written.
    ///
    /// # Errors
    ///
    /// Returns the first source, sink or persistence error. The saved
    /// state is unchanged in that case.
    pub fn replicate(&mut self) -> ReplicationResult<ReplicationOutcome> {
        self.replicate_batch(true)
    }

    /// Replicates batches as configured, then releases the sink.
    ///
    /// Runs `iterations` batches, or forever when it is 0. An empty batch
    /// is only written once `max_interval` has passed since the last
    /// written one. After a batch that caught up, sleeps `min_interval`.
    ///
    /// # Errors
    ///
    /// Stops at the first failed batch and returns its error.
    pub fn run(&mut self) -> ReplicationResult<ReplicatorStats> {
        let result = self.run_batches();
        self.sink.release();
        result.map(|()| self.stats)
    }

    fn run_batches(&mut self) -> ReplicationResult<()> {
        let mut iteration = 0u32;
        while self.config.iterations == 0 || iteration < self.config.iterations {
            iteration += 1;
            let allow_empty = self
                .last_commit
                .map_or(true, |last| last.elapsed() >= self.config.max_interval);
            let outcome = self.replicate_batch(allow_empty)?;

            let more = self.config.iterations == 0 || iteration < self.config.iterations;
            if more && outcome.caught_up && !self.config.min_interval.is_zero() {
                tracing::debug!(interval = ?self.config.min_interval, "caught up, sleeping");
                std::thread::sleep(self.config.min_interval);
            }
        }
        Ok(())
    }

    fn replicate_batch(&mut self, allow_empty: bool) -> ReplicationResult<ReplicationOutcome> {
        let result = self.try_replicate(allow_empty);
        self.stage = ReplicationStage::Idle;
        if let Err(e) = &result {
            tracing::warn!(error = %e, "replication batch failed, state left unchanged");
        }
        result
    }

    fn try_replicate(&mut self, allow_empty: bool) -> ReplicationResult<ReplicationOutcome> {
        if !self.persister.state_exists()? {
            return self.initialize();
        }

        let mut state = self.persister.load_state()?;
        state.sequence_number += 1;

        let mut system_time = None;
        if state.is_caught_up() {
            self.stage = ReplicationStage::SnapshotRefresh;
            // The clock is read first so it never runs ahead of the snapshot.
            let time = self.source.system_time()?;
            let snapshot = self.source.snapshot()?;
            state.apply_snapshot(&snapshot, self.id_space.as_ref());
            system_time = Some(time);
        }

        self.stage = ReplicationStage::RangeBuild;
        let predicates = QueryPredicates::build(&mut state, self.id_space.as_ref(), self.config.max_txn_query_count);

        self.stage = ReplicationStage::Extract;
        let mut changes = self.source.changes(&predicates, self.config.full_history)?;
        let copied = Self::copy(&mut changes, &mut self.sink);
        changes.release();
        let changes = copied?;

        let caught_up = state.is_caught_up();
        if caught_up {
            if let Some(time) = system_time {
                state.timestamp = time;
            }
        }

        if changes == 0 && predicates.is_empty() && !allow_empty {
            self.stats.batches_skipped += 1;
            tracing::debug!(sequence = state.sequence_number, "empty batch skipped");
            return Ok(ReplicationOutcome {
                sequence_number: state.sequence_number,
                changes,
                caught_up,
                committed: false,
            });
        }

        self.commit(&state)?;
        self.stats.changes += changes;
        tracing::info!(
            sequence = state.sequence_number,
            changes,
            txn_max_queried = state.txn_max_queried,
            txn_max = state.txn_max,
            caught_up,
            "replicated batch"
        );
        Ok(ReplicationOutcome {
            sequence_number: state.sequence_number,
            changes,
            caught_up,
            committed: true,
        })
    }

    fn initialize(&mut self) -> ReplicationResult<ReplicationOutcome> {
        self.stage = ReplicationStage::SnapshotRefresh;
        let time = self.source.system_time()?;
        let snapshot = self.source.snapshot()?;
        let state = ReplicationState::initial(&snapshot, time);
        tracing::info!(txn_max = state.txn_max, "initializing replication state");

        self.commit(&state)?;
        Ok(ReplicationOutcome {
            sequence_number: state.sequence_number,
            changes: 0,
            caught_up: true,
            committed: true,
        })
    }

    fn commit(&mut self, state: &ReplicationState) -> ReplicationResult<()> {
        self.stage = ReplicationStage::Commit;
        self.sink.complete(state)?;
        self.persister.save_state(state)?;
        self.stats.batches_committed += 1;
        self.last_commit = Some(Instant::now());
        Ok(())
    }

    fn copy(changes: &mut BoxedIterator<ChangeContainer>, sink: &mut K) -> ReplicationResult<u64> {
        let mut count = 0;
        for change in changes {
            sink.process(change?)?;
            count += 1;
        }
        Ok(count)
    }
}
