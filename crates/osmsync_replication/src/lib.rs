//! # osmsync Replication
//!
//! Turns the full-history tables of a map database into an ordered stream
//! of changes, one crash-safe batch at a time.
//!
//! This crate provides:
//! - The entity model in [`model`]: nodes, ways, relations and their
//!   versioned history rows
//! - [`EntityHistoryAssembler`] - a merge-join of sorted entity and child
//!   streams
//! - [`ChangeReader`] and [`SnapshotReader`] - change and point-in-time
//!   views of a history stream
//! - [`Replicator`] - the batch state machine, driven by
//!   [`ReplicationState`] and [`QueryPredicates`]
//! - [`FileReplicationStatePersister`] - atomic state files with an audit
//!   trail
//!
//! ## Example
//!
//! ```rust,ignore
//! use osmsync_replication::{
//!     EntityHistoryLoader, FileReplicationStatePersister, HistoryReplicationSource, Replicator,
//!     ReplicatorConfig,
//! };
//!
//! let config = ReplicatorConfig::new().with_iterations(0);
//! let source = HistoryReplicationSource::new(rows, EntityHistoryLoader::new(config.store.clone()));
//! let persister = FileReplicationStatePersister::open("/var/lib/osmsync")?;
//! let mut replicator = Replicator::new(source, sink, persister, config);
//! replicator.run()?;
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod assemble;
pub mod change;
mod config;
mod error;
mod loader;
pub mod model;
mod replicator;
mod sink;
mod source;
mod state;
mod txn;

pub use assemble::{AnyEntityIterator, EntityHistoryAssembler, FeaturePopulator, JoinPopulator, JoinScope};
pub use change::{ChangeAction, ChangeContainer, ChangeReader, SnapshotReader};
pub use config::{ReplicatorConfig, DEFAULT_MAX_TXN_QUERY_COUNT};
pub use error::{ReplicationError, ReplicationResult};
pub use loader::EntityHistoryLoader;
pub use model::{
    Entity, EntityHeader, EntityHistory, EntityType, FeatureRow, Node, OsmEntity, Relation, RelationMember, Tag,
    Way, WayNode,
};
pub use replicator::{ReplicationOutcome, ReplicationStage, Replicator, ReplicatorStats};
pub use sink::ChangeSink;
pub use source::{HistoryReplicationSource, HistoryRowSource, ReplicationSource};
pub use state::{
    FileReplicationStatePersister, MemoryStatePersister, ReplicationState, ReplicationStatePersister,
    LOCK_FILE_NAME, STATE_FILE_NAME,
};
pub use txn::{PostgresTxnIdSpace, QueryPredicates, TransactionSnapshot, TxnIdSpace, TxnRange};
