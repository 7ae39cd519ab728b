use std::fs::{File, OpenOptions};
use std::path::Path;

use fs2::FileExt;

use crate::error::StorageError;

/// Name of the lock file kept in every data directory.
pub const LOCK_FILE_NAME: &str = ".jsondb.lock";

/// An advisory exclusive lock over a data directory (`flock(2)` on Unix).
///
/// The lock is released automatically when this struct is dropped (the
/// underlying file descriptor is closed).
#[derive(Debug)]
pub struct DirLock {
    _file: File,
}

impl DirLock {
    /// Try to acquire the directory lock without blocking.
    ///
    /// Creates the lock file if it does not exist. Returns
    /// `Err(StorageError::DirectoryLocked)` if another handle holds it.
    pub fn try_acquire(dir: &Path) -> Result<Self, StorageError> {
        let path = dir.join(LOCK_FILE_NAME);
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;

        file.try_lock_exclusive()
            .map_err(|_| StorageError::DirectoryLocked(dir.display().to_string()))?;

        Ok(Self { _file: file })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_second_acquire_fails() {
        let dir = tempdir().unwrap();

        let _lock = DirLock::try_acquire(dir.path()).unwrap();
        // flock is per open file description, so a second fd from the same
        // process conflicts just like another process would.
        match DirLock::try_acquire(dir.path()) {
            Err(StorageError::DirectoryLocked(_)) => {}
            other => panic!("expected DirectoryLocked, got {other:?}"),
        }
    }

    #[test]
    fn test_lock_released_on_drop() {
        let dir = tempdir().unwrap();

        {
            let _lock = DirLock::try_acquire(dir.path()).unwrap();
        }
        let _lock2 = DirLock::try_acquire(dir.path()).unwrap();
    }

    #[test]
    fn test_lock_file_created() {
        let dir = tempdir().unwrap();
        let _lock = DirLock::try_acquire(dir.path()).unwrap();
        assert!(dir.path().join(LOCK_FILE_NAME).exists());
    }
}
