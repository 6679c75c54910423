//! Benchmark utilities.

#![warn(missing_docs)]

use osmsync_store::StoreConfig;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use tempfile::TempDir;

/// A scratch directory with a store configuration pointing into it.
pub fn scratch_store() -> (TempDir, StoreConfig) {
    let dir = tempfile::tempdir().expect("Failed to create temp directory");
    let config = StoreConfig::new().with_temp_dir(dir.path());
    (dir, config)
}

/// `0..count` in a reproducible random order.
pub fn shuffled_keys(count: usize, seed: u64) -> Vec<i64> {
    let mut keys: Vec<i64> = (0..count as i64).collect();
    keys.shuffle(&mut StdRng::seed_from_u64(seed));
    keys
}

/// Random ASCII strings of the given length.
pub fn random_strings(count: usize, len: usize, seed: u64) -> Vec<String> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count)
        .map(|_| (0..len).map(|_| rng.gen_range(b'a'..=b'z') as char).collect())
        .collect()
}
