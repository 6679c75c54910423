//! Atomic whole-file replacement.

use crate::error::StorageResult;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

/// Replaces `path` with `contents` so readers see either the old file or
/// the new one, never a partial write.
///
/// Writes to a temporary file in the same directory, syncs it, renames it
/// over the target and then syncs the directory.
///
/// # Errors
///
/// Returns an error if any step fails. The previous file is left intact.
pub fn write_atomic(path: &Path, contents: &[u8]) -> StorageResult<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;

    let mut temp = NamedTempFile::new_in(dir)?;
    temp.write_all(contents)?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| e.error)?;

    sync_directory(dir)
}

/// Makes a rename inside `dir` durable.
#[cfg(unix)]
fn sync_directory(dir: &Path) -> StorageResult<()> {
    std::fs::File::open(dir)?.sync_all()?;
    Ok(())
}

/// Directory fsync is not available on Windows; NTFS journals the rename.
#[cfg(not(unix))]
fn sync_directory(_dir: &Path) -> StorageResult<()> {
    Ok(())
}
