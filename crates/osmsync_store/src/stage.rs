//! Store lifecycle stages.

/// The lifecycle stage of a spill store.
///
/// Stages only move forward: `NotStarted → Add → Reading → Released`.
/// A store that never received a record may go straight to `Reading`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum StoreStage {
    /// Nothing written yet; no file exists.
    NotStarted,
    /// Records are being added.
    Add,
    /// Writing is closed; records may be read.
    Reading,
    /// The backing file has been deleted.
    Released,
}

impl StoreStage {
    /// Returns true if records may still be added.
    pub fn can_add(self) -> bool {
        matches!(self, StoreStage::NotStarted | StoreStage::Add)
    }

    /// Returns true if the store can move to (or is in) `Reading`.
    pub fn can_read(self) -> bool {
        self != StoreStage::Released
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_checks() {
        assert!(StoreStage::NotStarted.can_add());
        assert!(StoreStage::Add.can_add());
        assert!(!StoreStage::Reading.can_add());
        assert!(!StoreStage::Released.can_add());

        assert!(StoreStage::NotStarted.can_read());
        assert!(StoreStage::Reading.can_read());
        assert!(!StoreStage::Released.can_read());
    }

    #[test]
    fn stages_are_ordered() {
        assert!(StoreStage::NotStarted < StoreStage::Add);
        assert!(StoreStage::Add < StoreStage::Reading);
        assert!(StoreStage::Reading < StoreStage::Released);
    }
}
