//! History rows to change stream.

use super::action::{ChangeAction, ChangeContainer};
use crate::model::{Entity, EntityHistory, EntityType};
use osmsync_store::{PeekableIterator, Release, StoreResult};

/// Converts an ordered entity history stream into changes.
///
/// The input is ordered by `(type, id, version)`. Each version is
/// classified with [`ChangeAction::derive`], treating the entity as
/// previously created when the version is above 1.
///
/// Unless full history is requested, consecutive versions of one entity
/// are collapsed to the latest; whether the entity existed before is taken
/// from the earliest version in the window. An entity created and deleted
/// within the window produces no change.
pub struct ChangeReader<I> {
    source: PeekableIterator<EntityHistory<Entity>, I>,
    full_history: bool,
}

impl<I> ChangeReader<I>
where
    I: Iterator<Item = StoreResult<EntityHistory<Entity>>> + Release,
{
    /// Wraps `source`.
    pub fn new(source: I, full_history: bool) -> Self {
        Self {
            source: PeekableIterator::new(source),
            full_history,
        }
    }

    fn key(history: &EntityHistory<Entity>) -> (EntityType, i64) {
        (history.entity.entity_type(), history.entity.id())
    }
}

impl<I> Iterator for ChangeReader<I>
where
    I: Iterator<Item = StoreResult<EntityHistory<Entity>>> + Release,
{
    type Item = StoreResult<ChangeContainer>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let first = match self.source.next()? {
                Ok(history) => history,
                Err(e) => return Some(Err(e)),
            };
            let created_previously = first.entity.version() > 1;
            let key = Self::key(&first);
            let mut latest = first;

            if !self.full_history {
                loop {
                    match self.source.next_if(|h| Self::key(h) == key) {
                        Ok(Some(history)) => latest = history,
                        Ok(None) => break,
                        Err(e) => return Some(Err(e)),
                    }
                }
            }

            if let Some(action) = ChangeAction::derive(latest.visible, created_previously) {
                return Some(Ok(ChangeContainer::new(latest.entity, action)));
            }
        }
    }
}

impl<I: Release> Release for ChangeReader<I> {
    fn release(&mut self) {
        self.source.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{EntityHeader, Node, Way};
    use chrono::{TimeZone, Utc};
    use osmsync_store::ReleasableVecIterator;

    fn node(id: i64, version: i32, visible: bool) -> EntityHistory<Entity> {
        let timestamp = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, version as u32).unwrap();
        EntityHistory::new(Node::new(EntityHeader::new(id, version, timestamp, 1), 0.0, 0.0).into(), visible)
    }

    fn way(id: i64, version: i32, visible: bool) -> EntityHistory<Entity> {
        let timestamp = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
        EntityHistory::new(Way::new(EntityHeader::new(id, version, timestamp, 1)).into(), visible)
    }

    fn changes(rows: Vec<EntityHistory<Entity>>, full_history: bool) -> Vec<(i64, i32, ChangeAction)> {
        ChangeReader::new(ReleasableVecIterator::new(rows), full_history)
            .map(|r| {
                let change = r.unwrap();
                (change.entity.id(), change.entity.version(), change.action)
            })
            .collect()
    }

    #[test]
    fn collapses_to_latest_version() {
        let rows = vec![
            node(1, 1, true),
            node(1, 2, true),
            node(1, 3, true),
            node(2, 4, true),
            node(2, 5, false),
        ];
        assert_eq!(
            changes(rows, false),
            vec![(1, 3, ChangeAction::Create), (2, 5, ChangeAction::Delete)]
        );
    }

    #[test]
    fn created_and_deleted_in_window_vanishes() {
        let rows = vec![node(1, 1, true), node(1, 2, false), node(2, 3, true)];
        assert_eq!(changes(rows, false), vec![(2, 3, ChangeAction::Modify)]);
    }

    #[test]
    fn full_history_emits_every_version() {
        let rows = vec![node(1, 1, true), node(1, 2, true), node(1, 3, false)];
        assert_eq!(
            changes(rows, true),
            vec![
                (1, 1, ChangeAction::Create),
                (1, 2, ChangeAction::Modify),
                (1, 3, ChangeAction::Delete),
            ]
        );
    }

    #[test]
    fn same_id_different_type_not_collapsed() {
        let rows = vec![node(7, 1, true), way(7, 2, true)];
        assert_eq!(
            changes(rows, false),
            vec![(7, 1, ChangeAction::Create), (7, 2, ChangeAction::Modify)]
        );
    }
}
