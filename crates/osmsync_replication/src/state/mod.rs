//! Replication state and its persistence.

mod persister;
mod record;

pub use persister::{
    FileReplicationStatePersister, MemoryStatePersister, ReplicationStatePersister, LOCK_FILE_NAME,
    STATE_FILE_NAME,
};
pub use record::ReplicationState;
