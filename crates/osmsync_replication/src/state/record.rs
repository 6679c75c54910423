//! The persisted replication state and its text form.

use crate::error::{ReplicationError, ReplicationResult};
use crate::txn::{TransactionSnapshot, TxnIdSpace};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::str::FromStr;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

const KEY_SEQUENCE_NUMBER: &str = "sequenceNumber";
const KEY_TIMESTAMP: &str = "timestamp";
const KEY_TXN_ACTIVE: &str = "txnActiveList";
const KEY_TXN_MAX: &str = "txnMax";
const KEY_TXN_MAX_QUERIED: &str = "txnMaxQueried";
const KEY_TXN_READY: &str = "txnReadyList";

/// Replication progress after a committed batch.
///
/// Stored as a `key=value` properties file. `timestamp` is written with
/// second precision, so a loaded state may differ from the saved one by
/// sub-second digits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplicationState {
    /// Highest transaction id seen in the last snapshot.
    pub txn_max: u64,
    /// Highest transaction id already covered by a batch.
    pub txn_max_queried: u64,
    /// Ids that were in flight at the last snapshot.
    pub txn_active: Vec<u64>,
    /// Ids passed over while in flight that have since finished.
    pub txn_ready: Vec<u64>,
    /// Point in time up to which all changes have been replicated.
    pub timestamp: DateTime<Utc>,
    /// Number of the last committed batch.
    pub sequence_number: u64,
}

impl ReplicationState {
    /// The state before any batch: everything up to the snapshot is
    /// considered already replicated.
    pub fn initial(snapshot: &TransactionSnapshot, timestamp: DateTime<Utc>) -> Self {
        Self {
            txn_max: snapshot.txn_max,
            txn_max_queried: snapshot.txn_max,
            txn_active: snapshot.active.clone(),
            txn_ready: Vec::new(),
            timestamp,
            sequence_number: 0,
        }
    }

    /// Returns true if every assigned id has been covered by a batch.
    pub fn is_caught_up(&self) -> bool {
        self.txn_max_queried == self.txn_max
    }

    /// Folds a fresh backend snapshot into the state.
    ///
    /// Ids that were in flight and have now finished become ready if they
    /// were already walked past; the rest will be reached by the walk
    /// itself. The active list and `txn_max` are taken from the snapshot.
    pub fn apply_snapshot(&mut self, snapshot: &TransactionSnapshot, space: &dyn TxnIdSpace) {
        let still_active: HashSet<u64> = snapshot.active.iter().copied().collect();
        for id in std::mem::take(&mut self.txn_active) {
            if still_active.contains(&id) {
                continue;
            }
            if space.precedes_or_equals(id, self.txn_max_queried) && !self.txn_ready.contains(&id) {
                self.txn_ready.push(id);
            }
        }
        self.txn_active = snapshot.active.clone();
        self.txn_max = snapshot.txn_max;
    }

    /// Returns the state text as written to disk.
    pub fn to_properties(&self) -> String {
        self.to_string()
    }
}

fn join_ids(ids: &[u64]) -> String {
    ids.iter().map(u64::to_string).collect::<Vec<_>>().join(",")
}

fn escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '\\' | ':' | '=') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn unescape(value: &str) -> String {
    let mut unescaped = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                unescaped.push(next);
            }
        } else {
            unescaped.push(c);
        }
    }
    unescaped
}

/// Splits a properties line at the first unescaped `=`.
fn split_property(line: &str) -> Option<(&str, &str)> {
    let mut escaped = false;
    for (i, c) in line.char_indices() {
        match c {
            '\\' if !escaped => escaped = true,
            '=' if !escaped => return Some((line[..i].trim(), line[i + 1..].trim())),
            _ => escaped = false,
        }
    }
    None
}

impl fmt::Display for ReplicationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "# osmsync replication state")?;
        writeln!(f, "{KEY_SEQUENCE_NUMBER}={}", self.sequence_number)?;
        writeln!(
            f,
            "{KEY_TIMESTAMP}={}",
            escape(&self.timestamp.format(TIMESTAMP_FORMAT).to_string())
        )?;
        writeln!(f, "{KEY_TXN_ACTIVE}={}", join_ids(&self.txn_active))?;
        writeln!(f, "{KEY_TXN_MAX}={}", self.txn_max)?;
        writeln!(f, "{KEY_TXN_MAX_QUERIED}={}", self.txn_max_queried)?;
        writeln!(f, "{KEY_TXN_READY}={}", join_ids(&self.txn_ready))
    }
}

struct Properties(BTreeMap<String, String>);

impl Properties {
    fn parse(text: &str) -> ReplicationResult<Self> {
        let mut values = BTreeMap::new();
        for (number, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
                continue;
            }
            let (key, value) = split_property(line).ok_or_else(|| {
                ReplicationError::state_format(format!("line {} has no '=': {line}", number + 1))
            })?;
            values.insert(unescape(key), unescape(value));
        }
        Ok(Self(values))
    }

    fn get(&self, key: &str) -> ReplicationResult<&str> {
        self.0
            .get(key)
            .map(String::as_str)
            .ok_or_else(|| ReplicationError::state_format(format!("missing key {key}")))
    }

    fn id(&self, key: &str) -> ReplicationResult<u64> {
        let value = self.get(key)?;
        value
            .parse()
            .map_err(|_| ReplicationError::state_format(format!("{key} is not a number: {value}")))
    }

    fn ids(&self, key: &str) -> ReplicationResult<Vec<u64>> {
        let value = self.get(key)?;
        if value.is_empty() {
            return Ok(Vec::new());
        }
        value
            .split(',')
            .map(|id| {
                id.trim()
                    .parse()
                    .map_err(|_| ReplicationError::state_format(format!("{key} has a bad id: {id}")))
            })
            .collect()
    }

    fn timestamp(&self, key: &str) -> ReplicationResult<DateTime<Utc>> {
        let value = self.get(key)?;
        NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT)
            .map(|naive| naive.and_utc())
            .map_err(|e| ReplicationError::state_format(format!("{key} is not a timestamp: {value} ({e})")))
    }
}

impl FromStr for ReplicationState {
    type Err = ReplicationError;

    fn from_str(text: &str) -> ReplicationResult<Self> {
        let properties = Properties::parse(text)?;
        Ok(Self {
            txn_max: properties.id(KEY_TXN_MAX)?,
            txn_max_queried: properties.id(KEY_TXN_MAX_QUERIED)?,
            txn_active: properties.ids(KEY_TXN_ACTIVE)?,
            txn_ready: properties.ids(KEY_TXN_READY)?,
            timestamp: properties.timestamp(KEY_TIMESTAMP)?,
            sequence_number: properties.id(KEY_SEQUENCE_NUMBER)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::txn::PostgresTxnIdSpace;
    use chrono::TimeZone;

    fn sample() -> ReplicationState {
        ReplicationState {
            txn_max: 1200,
            txn_max_queried: 1100,
            txn_active: vec![1050, 1150],
            txn_ready: vec![990],
            timestamp: Utc.with_ymd_and_hms(2024, 6, 1, 12, 30, 5).unwrap(),
            sequence_number: 42,
        }
    }

    #[test]
    fn text_roundtrip() {
        let state = sample();
        let text = state.to_properties();
        assert!(text.contains("timestamp=2024-06-01T12\\:30\\:05Z"));
        assert!(text.contains("txnActiveList=1050,1150"));
        assert_eq!(text.parse::<ReplicationState>().unwrap(), state);
    }

    #[test]
    fn empty_lists_roundtrip() {
        let mut state = sample();
        state.txn_active.clear();
        state.txn_ready.clear();
        let parsed: ReplicationState = state.to_string().parse().unwrap();
        assert!(parsed.txn_active.is_empty());
        assert!(parsed.txn_ready.is_empty());
    }

    #[test]
    fn comments_blank_lines_and_unknown_keys_ignored() {
        let text = "# header\n\n! bang comment\nextra=1\ntxnMax=7\ntxnMaxQueried=7\ntxnActiveList=\n\
                    txnReadyList=\nsequenceNumber=3\ntimestamp=2020-01-01T00\\:00\\:00Z\n";
        let state: ReplicationState = text.parse().unwrap();
        assert_eq!(state.sequence_number, 3);
        assert_eq!(state.txn_max, 7);
    }

    #[test]
    fn missing_key_rejected() {
        let text = "txnMax=7\ntxnMaxQueried=7\n";
        let err = text.parse::<ReplicationState>().unwrap_err();
        assert!(matches!(err, ReplicationError::StateFormat { .. }));
    }

    #[test]
    fn bad_values_rejected() {
        let mut text = sample().to_string();
        text = text.replace("txnMax=1200", "txnMax=abc");
        assert!(text.parse::<ReplicationState>().is_err());

        let text = sample().to_string().replace("txnActiveList=1050,1150", "txnActiveList=1050,,x");
        assert!(text.parse::<ReplicationState>().is_err());

        let text = sample().to_string().replace("2024-06-01", "June");
        assert!(text.parse::<ReplicationState>().is_err());
    }

    #[test]
    fn initial_state_is_caught_up() {
        let snapshot = TransactionSnapshot::new(500, vec![498]);
        let state = ReplicationState::initial(&snapshot, Utc::now());
        assert_eq!(state.sequence_number, 0);
        assert!(state.is_caught_up());
        assert_eq!(state.txn_active, vec![498]);
    }

    #[test]
    fn snapshot_moves_finished_ids() {
        let mut state = sample();
        state.txn_max_queried = 1200;
        // 1050 finished and was walked past; 1150 still running; 1300 new.
        let snapshot = TransactionSnapshot::new(1400, vec![1150, 1300]);
        state.apply_snapshot(&snapshot, &PostgresTxnIdSpace);
        assert_eq!(state.txn_ready, vec![990, 1050]);
        assert_eq!(state.txn_active, vec![1150, 1300]);
        assert_eq!(state.txn_max, 1400);
    }

    #[test]
    fn finished_ids_not_yet_walked_are_dropped() {
        let mut state = sample();
        state.txn_ready.clear();
        // 1150 is beyond txn_max_queried; the walk will reach it.
        let snapshot = TransactionSnapshot::new(1200, vec![]);
        state.apply_snapshot(&snapshot, &PostgresTxnIdSpace);
        assert_eq!(state.txn_ready, vec![1050]);
        assert!(state.txn_active.is_empty());
    }
}
