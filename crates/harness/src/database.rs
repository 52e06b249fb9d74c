use std::path::PathBuf;

use opsync_storage::{SqliteStorage, StorageError};
use tempfile::TempDir;

/// One on-disk database that several storage handles open at once, the way
/// concurrent requests share a store. Removed when dropped.
pub struct SharedDatabase {
    _dir: TempDir,
    path: PathBuf,
}

impl SharedDatabase {
    pub fn new() -> Result<Self, Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("operations.db");
        // create the schema once up front
        SqliteStorage::open(&path)?;
        Ok(Self { _dir: dir, path })
    }

    pub fn open(&self) -> Result<SqliteStorage, StorageError> {
        SqliteStorage::open(&self.path)
    }
}
