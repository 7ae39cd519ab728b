use std::fs::{self, File};
use std::io::{self, Write};
use std::path::Path;

use tempfile::NamedTempFile;

use crate::error::StorageError;
use crate::types::TableData;

/// Durability mode for table writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncMode {
    /// Fsync the new table file and its directory before the write returns (default).
    #[default]
    Full,
    /// Skip fsync. The rename is still atomic, but a crash may lose the
    /// latest writes. Useful for bulk loads and tests.
    None,
}

/// Read and deserialize a persisted table.
pub fn read_table(path: &Path) -> Result<TableData, StorageError> {
    let bytes = fs::read(path)?;
    serde_json::from_slice(&bytes).map_err(|e| StorageError::Corrupted {
        path: path.display().to_string(),
        reason: e.to_string(),
    })
}

/// Replace the table file at `path` with `table`.
///
/// The document is written to a temp file in the same directory and renamed
/// over the target, so readers and crashes only ever see the old or the new
/// contents.
pub fn write_table(path: &Path, table: &TableData, sync: SyncMode) -> Result<(), StorageError> {
    let tmp = stage(path, table, sync)?;
    tmp.persist(path).map_err(|e| StorageError::Io(e.error))?;
    sync_parent(path, sync);
    Ok(())
}

/// Write a brand-new table file. Never replaces an existing one.
///
/// Returns `false` without touching the target if a file already exists
/// at `path`.
pub fn create_table_file(
    path: &Path,
    table: &TableData,
    sync: SyncMode,
) -> Result<bool, StorageError> {
    let tmp = stage(path, table, sync)?;
    match tmp.persist_noclobber(path) {
        Ok(_) => {
            sync_parent(path, sync);
            Ok(true)
        }
        Err(e) if e.error.kind() == io::ErrorKind::AlreadyExists => Ok(false),
        Err(e) => Err(StorageError::Io(e.error)),
    }
}

/// Delete a table file.
pub fn remove_table_file(path: &Path, sync: SyncMode) -> Result<(), StorageError> {
    fs::remove_file(path)?;
    sync_parent(path, sync);
    Ok(())
}

/// Serialize `table` into a hidden temp file next to `path`.
fn stage(path: &Path, table: &TableData, sync: SyncMode) -> Result<NamedTempFile, StorageError> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let bytes = serde_json::to_vec_pretty(table).map_err(|e| StorageError::Corrupted {
        path: path.display().to_string(),
        reason: format!("failed to serialize table: {e}"),
    })?;

    let mut tmp = tempfile::Builder::new()
        .prefix(".")
        .suffix(".tmp")
        .tempfile_in(dir)?;
    tmp.write_all(&bytes)?;
    if sync == SyncMode::Full {
        tmp.as_file().sync_all()?;
    }
    Ok(tmp)
}

/// Make a rename or unlink in the parent directory durable.
fn sync_parent(path: &Path, sync: SyncMode) {
    if sync == SyncMode::None {
        return;
    }
    if let Some(dir) = path.parent() {
        if let Ok(d) = File::open(dir) {
            let _ = d.sync_all();
        }
    }
}
