//! Verify command implementation.

use osmsync_replication::{FileReplicationStatePersister, PostgresTxnIdSpace, ReplicationState, TxnIdSpace};
use std::collections::HashSet;
use std::path::Path;

/// Verification result.
#[derive(Debug, Default)]
pub struct VerifyResult {
    /// Number of checks run.
    pub checks: usize,
    /// List of problems found.
    pub errors: Vec<String>,
}

impl VerifyResult {
    fn check(&mut self, ok: bool, error: impl FnOnce() -> String) {
        self.checks += 1;
        if !ok {
            self.errors.push(error());
        }
    }

    /// Returns true if no problem was found.
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Checks the working directory at `path`.
pub fn verify(path: &Path) -> Result<VerifyResult, Box<dyn std::error::Error>> {
    let mut result = VerifyResult::default();

    let state_path = FileReplicationStatePersister::state_path(path);
    let state = match FileReplicationStatePersister::read_state(&state_path) {
        Ok(state) => state,
        Err(e) => {
            result.check(false, || format!("{}: {e}", state_path.display()));
            return Ok(result);
        }
    };
    result.check(true, String::new);

    let audit_path = FileReplicationStatePersister::audit_path(path, state.sequence_number);
    match FileReplicationStatePersister::read_state(&audit_path) {
        Ok(audit) => result.check(audit == state, || {
            format!("audit copy {} differs from the current state", audit_path.display())
        }),
        Err(e) => result.check(false, || format!("audit copy {}: {e}", audit_path.display())),
    }

    check_transactions(&state, &PostgresTxnIdSpace, &mut result);
    tracing::debug!(checks = result.checks, errors = result.errors.len(), "verification finished");
    Ok(result)
}

fn check_transactions(state: &ReplicationState, space: &dyn TxnIdSpace, result: &mut VerifyResult) {
    for (name, id) in [("txnMax", state.txn_max), ("txnMaxQueried", state.txn_max_queried)] {
        result.check(space.is_normal(id), || format!("{name} {id} is not a valid transaction id"));
    }
    for id in state.txn_active.iter().chain(&state.txn_ready) {
        result.check(space.is_normal(*id), || format!("transaction id {id} is not valid"));
    }

    result.check(space.precedes_or_equals(state.txn_max_queried, state.txn_max), || {
        format!(
            "txnMaxQueried {} is ahead of txnMax {}",
            state.txn_max_queried, state.txn_max
        )
    });

    let active: HashSet<u64> = state.txn_active.iter().copied().collect();
    let both: Vec<u64> = state.txn_ready.iter().copied().filter(|id| active.contains(id)).collect();
    result.check(both.is_empty(), || format!("ids both active and ready: {both:?}"));

    for id in &state.txn_ready {
        result.check(space.precedes_or_equals(*id, state.txn_max_queried), || {
            format!("ready id {id} has not been queried yet")
        });
    }
}

/// Runs the verify command.
pub fn run(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    println!("Verifying replication state at {}", path.display());
    println!();

    let result = verify(path)?;
    for error in &result.errors {
        println!("  ✗ {error}");
    }

    println!();
    println!("Checks run: {}", result.checks);
    if result.is_ok() {
        println!("✓ Replication state verification passed");
        Ok(())
    } else {
        println!("✗ Replication state verification failed");
        Err("Verification failed".into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use osmsync_replication::ReplicationStatePersister;

    fn state() -> ReplicationState {
        ReplicationState {
            txn_max: 500,
            txn_max_queried: 480,
            txn_active: vec![470, 490],
            txn_ready: vec![460],
            timestamp: Utc.with_ymd_and_hms(2024, 5, 6, 7, 8, 9).unwrap(),
            sequence_number: 1_002_003,
        }
    }

    #[test]
    fn saved_state_verifies() {
        let dir = tempfile::tempdir().unwrap();
        let mut persister = FileReplicationStatePersister::open(dir.path()).unwrap();
        persister.save_state(&state()).unwrap();

        let result = verify(dir.path()).unwrap();
        assert!(result.is_ok(), "{:?}", result.errors);
        assert!(result.checks > 5);
    }

    #[test]
    fn missing_state_fails() {
        let dir = tempfile::tempdir().unwrap();
        let result = verify(dir.path()).unwrap();
        assert!(!result.is_ok());
    }

    #[test]
    fn missing_or_stale_audit_copy_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut persister = FileReplicationStatePersister::open(dir.path()).unwrap();
        persister.save_state(&state()).unwrap();

        let audit = FileReplicationStatePersister::audit_path(dir.path(), 1_002_003);
        let mut stale = state();
        stale.txn_max = 501;
        std::fs::write(&audit, stale.to_string()).unwrap();
        assert_eq!(verify(dir.path()).unwrap().errors.len(), 1);

        std::fs::remove_file(&audit).unwrap();
        assert!(!verify(dir.path()).unwrap().is_ok());
    }

    #[test]
    fn inconsistent_transactions_reported() {
        let mut bad = state();
        bad.txn_ready = vec![490, 495];
        bad.txn_active.push(1);
        let mut result = VerifyResult::default();
        check_transactions(&bad, &PostgresTxnIdSpace, &mut result);

        let text = result.errors.join("\n");
        assert!(text.contains("transaction id 1 is not valid"));
        assert!(text.contains("both active and ready: [490]"));
        assert!(text.contains("ready id 495 has not been queried yet"));
        assert!(text.contains("ready id 490 has not been queried yet"));
    }
}
