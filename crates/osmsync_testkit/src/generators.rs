//! Property-based test generators using proptest.
//!
//! Generated history streams are already in the order a database query
//! would return them, so they can feed the assembler and readers directly.

use crate::fixtures::utc;
use osmsync_replication::{EntityHeader, EntityHistory, Node, ReplicationState, Tag, TransactionSnapshot};
use proptest::prelude::*;

/// Strategy for tags with short keys and values.
pub fn tag_strategy() -> impl Strategy<Value = Tag> {
    ("[a-z]{1,8}", "[a-zA-Z0-9 ]{0,16}").prop_map(|(key, value)| Tag::new(key, value))
}

/// Strategy for whole-second timestamps between 2005 and 2035.
pub fn timestamp_strategy() -> impl Strategy<Value = chrono::DateTime<chrono::Utc>> {
    (1_104_537_600i64..2_051_222_400).prop_map(utc)
}

/// Strategy for node history ordered by `(id, version)`, with unique keys.
pub fn node_history_strategy(max_len: usize) -> impl Strategy<Value = Vec<EntityHistory<Node>>> {
    prop::collection::btree_map(
        (1i64..64, 1i32..6),
        (any::<bool>(), timestamp_strategy(), prop::collection::vec(tag_strategy(), 0..3)),
        0..max_len,
    )
    .prop_map(|rows| {
        rows.into_iter()
            .map(|((id, version), (visible, timestamp, tags))| {
                let mut header = EntityHeader::new(id, version, timestamp, 1);
                header.tags = tags;
                EntityHistory::new(Node::new(header, 0.0, 0.0), visible)
            })
            .collect()
    })
}

/// Strategy for PostgreSQL transaction ids, including ones near the wrap.
pub fn txn_id_strategy() -> impl Strategy<Value = u64> {
    prop_oneof![
        3u64..1_000_000,
        (u64::from(u32::MAX) - 1000)..=u64::from(u32::MAX),
    ]
}

/// Strategy for snapshots with a few in-flight ids below `txn_max`.
pub fn txn_snapshot_strategy() -> impl Strategy<Value = TransactionSnapshot> {
    (1_000u64..1_000_000, prop::collection::btree_set(1u64..1000, 0..8)).prop_map(|(txn_max, offsets)| {
        let active = offsets.into_iter().map(|offset| txn_max - offset).collect();
        TransactionSnapshot::new(txn_max, active)
    })
}

/// Strategy for arbitrary replication states.
pub fn replication_state_strategy() -> impl Strategy<Value = ReplicationState> {
    (
        txn_id_strategy(),
        txn_id_strategy(),
        prop::collection::vec(txn_id_strategy(), 0..6),
        prop::collection::vec(txn_id_strategy(), 0..6),
        timestamp_strategy(),
        0u64..1_000_000_000,
    )
        .prop_map(
            |(txn_max, txn_max_queried, txn_active, txn_ready, timestamp, sequence_number)| ReplicationState {
                txn_max,
                txn_max_queried,
                txn_active,
                txn_ready,
                timestamp,
                sequence_number,
            },
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use osmsync_replication::{ChangeAction, ChangeReader, Entity, SnapshotReader};
    use osmsync_store::ReleasableVecIterator;
    use std::collections::BTreeMap;

    fn lifted(rows: &[EntityHistory<Node>]) -> ReleasableVecIterator<EntityHistory<Entity>> {
        ReleasableVecIterator::new(rows.iter().cloned().map(EntityHistory::into_entity).collect())
    }

    proptest! {
        #[test]
        fn state_text_roundtrip(state in replication_state_strategy()) {
            let parsed: ReplicationState = state.to_string().parse().unwrap();
            prop_assert_eq!(parsed, state);
        }

        #[test]
        fn collapsed_changes_one_per_entity(rows in node_history_strategy(60)) {
            let changes: Vec<_> = ChangeReader::new(lifted(&rows), false).map(|c| c.unwrap()).collect();

            let mut latest: BTreeMap<i64, &EntityHistory<Node>> = BTreeMap::new();
            let mut first: BTreeMap<i64, i32> = BTreeMap::new();
            for row in &rows {
                latest.insert(row.id(), row);
                first.entry(row.id()).or_insert(row.version());
            }
            let expected: Vec<(i64, i32, ChangeAction)> = latest
                .iter()
                .filter_map(|(id, row)| {
                    ChangeAction::derive(row.visible, first[id] > 1).map(|action| (*id, row.version(), action))
                })
                .collect();
            let actual: Vec<(i64, i32, ChangeAction)> = changes
                .iter()
                .map(|c| (c.entity.id(), c.entity.version(), c.action))
                .collect();
            prop_assert_eq!(actual, expected);
        }

        #[test]
        fn full_history_emits_each_visible_or_prior_version(rows in node_history_strategy(60)) {
            let changes: Vec<_> = ChangeReader::new(lifted(&rows), true).map(|c| c.unwrap()).collect();
            let expected = rows
                .iter()
                .filter(|row| ChangeAction::derive(row.visible, row.version() > 1).is_some())
                .count();
            prop_assert_eq!(changes.len(), expected);
        }

        #[test]
        fn snapshot_never_emits_deleted_or_future(rows in node_history_strategy(60), at in timestamp_strategy()) {
            let changes = ChangeReader::new(lifted(&rows), true);
            let entities: Vec<_> = SnapshotReader::new(changes, at).map(|e| e.unwrap()).collect();
            let mut ids: Vec<i64> = entities.iter().map(Entity::id).collect();
            ids.dedup();
            prop_assert_eq!(ids.len(), entities.len());
            for entity in &entities {
                prop_assert!(entity.timestamp() <= at);
                let row = rows
                    .iter()
                    .find(|row| row.id() == entity.id() && row.version() == entity.version())
                    .unwrap();
                prop_assert!(row.visible);
            }
        }
    }
}
