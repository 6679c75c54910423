//! Change destinations.

use crate::change::ChangeContainer;
use crate::error::ReplicationResult;
use crate::state::ReplicationState;
use osmsync_store::Release;

/// Receives the changes of each batch.
///
/// A batch whose state save fails is sent again on the next run, so a
/// sink must tolerate seeing the same entity versions twice.
pub trait ChangeSink: Release {
    /// Accepts one change.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ReplicationError::Destination`] on failure; the
    /// batch is then abandoned.
    fn process(&mut self, change: ChangeContainer) -> ReplicationResult<()>;

    /// Finishes the batch described by `state`. Called before the state is
    /// saved.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ReplicationError::Destination`] on failure.
    fn complete(&mut self, state: &ReplicationState) -> ReplicationResult<()>;
}

impl<K: ChangeSink + ?Sized> ChangeSink for Box<K> {
    fn process(&mut self, change: ChangeContainer) -> ReplicationResult<()> {
        (**self).process(change)
    }

    fn complete(&mut self, state: &ReplicationState) -> ReplicationResult<()> {
        (**self).complete(state)
    }
}
