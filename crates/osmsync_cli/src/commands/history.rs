//! History command implementation.

use osmsync_replication::{FileReplicationStatePersister, STATE_FILE_NAME};
use std::path::{Path, PathBuf};

/// One saved sequence in the audit trail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditEntry {
    /// Sequence number encoded in the path.
    pub sequence: u64,
    /// Path of the audit copy.
    pub path: PathBuf,
}

fn digits(name: &str) -> Option<u64> {
    (name.len() == 3 && name.bytes().all(|b| b.is_ascii_digit()))
        .then(|| name.parse().ok())
        .flatten()
}

fn subdirs(path: &Path) -> std::io::Result<Vec<(u64, PathBuf)>> {
    let mut found = Vec::new();
    for entry in std::fs::read_dir(path)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        if let Some(value) = entry.file_name().to_str().and_then(digits) {
            found.push((value, entry.path()));
        }
    }
    Ok(found)
}

/// Lists audit copies under `path`, newest first.
pub fn list(path: &Path) -> std::io::Result<Vec<AuditEntry>> {
    let suffix = format!(".{STATE_FILE_NAME}");
    let mut entries = Vec::new();

    for (top, top_path) in subdirs(path)? {
        for (middle, middle_path) in subdirs(&top_path)? {
            for file in std::fs::read_dir(&middle_path)? {
                let file = file?;
                let name = file.file_name();
                let Some(low) = name.to_str().and_then(|n| n.strip_suffix(&suffix)).and_then(digits) else {
                    continue;
                };
                entries.push(AuditEntry {
                    sequence: top * 1_000_000 + middle * 1000 + low,
                    path: file.path(),
                });
            }
        }
    }

    entries.sort_by(|a, b| b.sequence.cmp(&a.sequence));
    Ok(entries)
}

/// Runs the history command.
pub fn run(path: &Path, limit: Option<usize>) -> Result<(), Box<dyn std::error::Error>> {
    let entries = list(path)?;
    if entries.is_empty() {
        println!("No saved sequences at {}", path.display());
        return Ok(());
    }

    println!("{:>12}  {:<20}  {:>12}  {:>12}", "SEQUENCE", "TIMESTAMP", "TXN MAX", "QUERIED");
    let shown = limit.unwrap_or(entries.len());
    for entry in entries.iter().take(shown) {
        match FileReplicationStatePersister::read_state(&entry.path) {
            Ok(state) => println!(
                "{:>12}  {:<20}  {:>12}  {:>12}",
                entry.sequence,
                state.timestamp.format("%Y-%m-%dT%H:%M:%SZ"),
                state.txn_max,
                state.txn_max_queried
            ),
            Err(e) => println!("{:>12}  unreadable: {e}", entry.sequence),
        }
    }
    if shown < entries.len() {
        println!("... {} older sequences", entries.len() - shown);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use osmsync_replication::{ReplicationState, ReplicationStatePersister};

    #[test]
    fn lists_newest_first() {
        let dir = tempfile::tempdir().unwrap();
        let mut persister = FileReplicationStatePersister::open(dir.path()).unwrap();
        for sequence in [0, 1, 999, 1000, 2_000_001] {
            let state = ReplicationState {
                txn_max: 10,
                txn_max_queried: 10,
                txn_active: vec![],
                txn_ready: vec![],
                timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
                sequence_number: sequence,
            };
            persister.save_state(&state).unwrap();
        }
        std::fs::write(dir.path().join("000/000/notes.txt"), "ignored").unwrap();

        let sequences: Vec<u64> = list(dir.path()).unwrap().iter().map(|e| e.sequence).collect();
        assert_eq!(sequences, vec![2_000_001, 1000, 999, 1, 0]);
    }

    #[test]
    fn empty_directory_has_no_history() {
        let dir = tempfile::tempdir().unwrap();
        assert!(list(dir.path()).unwrap().is_empty());
    }
}
