//! Point-in-time view over a change stream.

use super::action::{ChangeAction, ChangeContainer};
use crate::model::{Entity, EntityType};
use chrono::{DateTime, Utc};
use osmsync_store::{PeekableIterator, Release, StoreResult};

/// Collapses an ordered `(type, id, version)` change stream into the
/// entities that existed at one instant.
///
/// For each entity only the latest version timestamped at or before the
/// instant is kept, and it is dropped if that version was a delete.
pub struct SnapshotReader<I> {
    source: PeekableIterator<ChangeContainer, I>,
    instant: DateTime<Utc>,
}

impl<I> SnapshotReader<I>
where
    I: Iterator<Item = StoreResult<ChangeContainer>> + Release,
{
    /// Wraps `source`, producing the view as of `instant`.
    pub fn new(source: I, instant: DateTime<Utc>) -> Self {
        Self {
            source: PeekableIterator::new(source),
            instant,
        }
    }

    fn key(change: &ChangeContainer) -> (EntityType, i64) {
        (change.entity.entity_type(), change.entity.id())
    }
}

impl<I> Iterator for SnapshotReader<I>
where
    I: Iterator<Item = StoreResult<ChangeContainer>> + Release,
{
    type Item = StoreResult<Entity>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let first = match self.source.next()? {
                Ok(change) => change,
                Err(e) => return Some(Err(e)),
            };
            let key = Self::key(&first);
            let instant = self.instant;
            let mut retained = (first.entity.timestamp() <= instant).then_some(first);

            loop {
                match self.source.next_if(|c| Self::key(c) == key) {
                    Ok(Some(change)) => {
                        if change.entity.timestamp() <= instant {
                            retained = Some(change);
                        }
                    }
                    Ok(None) => break,
                    Err(e) => return Some(Err(e)),
                }
            }

            match retained {
                Some(change) if change.action != ChangeAction::Delete => return Some(Ok(change.entity)),
                _ => continue,
            }
        }
    }
}

impl<I: Release> Release for SnapshotReader<I> {
    fn release(&mut self) {
        self.source.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{EntityHeader, Node};
    use chrono::TimeZone;
    use osmsync_store::ReleasableVecIterator;

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, hour, 0, 0).unwrap()
    }

    fn change(id: i64, version: i32, hour: u32, action: ChangeAction) -> ChangeContainer {
        ChangeContainer::new(Node::new(EntityHeader::new(id, version, at(hour), 1), 0.0, 0.0).into(), action)
    }

    fn snapshot(changes: Vec<ChangeContainer>, hour: u32) -> Vec<(i64, i32)> {
        SnapshotReader::new(ReleasableVecIterator::new(changes), at(hour))
            .map(|r| {
                let entity = r.unwrap();
                (entity.id(), entity.version())
            })
            .collect()
    }

    #[test]
    fn keeps_latest_version_before_instant() {
        let changes = vec![
            change(1, 1, 1, ChangeAction::Create),
            change(1, 2, 3, ChangeAction::Modify),
            change(1, 3, 9, ChangeAction::Modify),
            change(2, 1, 2, ChangeAction::Create),
        ];
        assert_eq!(snapshot(changes, 5), vec![(1, 2), (2, 1)]);
    }

    #[test]
    fn deleted_before_instant_is_dropped() {
        let changes = vec![
            change(1, 1, 1, ChangeAction::Create),
            change(1, 2, 2, ChangeAction::Delete),
            change(2, 1, 1, ChangeAction::Create),
            change(2, 2, 8, ChangeAction::Delete),
        ];
        assert_eq!(snapshot(changes, 5), vec![(2, 1)]);
    }

    #[test]
    fn entity_created_after_instant_is_absent() {
        let changes = vec![change(1, 1, 6, ChangeAction::Create)];
        assert!(snapshot(changes, 5).is_empty());
    }
}
