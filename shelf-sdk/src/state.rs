//! Persistent key/value state for the client.
//!
//! The session layer only needs a handful of string values to survive
//! restarts, so the port is a minimal get/set/remove over string keys.
//! The file-backed implementation keeps everything in one JSON object,
//! written atomically under a file lock so concurrent processes can't
//! interleave partial writes.

use std::collections::BTreeMap;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use fslock::LockFile;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum StateStoreError {
    #[error("couldn't acquire state file lock")]
    AcquireLock(#[source] fslock::Error),
    #[error("couldn't read state file")]
    ReadFile(#[source] std::io::Error),
    #[error("couldn't parse state file")]
    Parse(#[source] serde_json::Error),
    #[error("couldn't encode state value")]
    Encode(#[source] serde_json::Error),
    #[error("invalid state file location: {0}")]
    InvalidLocation(PathBuf),
    #[error("couldn't open temporary state file")]
    OpenTmpFile(#[source] std::io::Error),
    #[error("couldn't write temporary state file")]
    WriteTmpFile(#[source] serde_json::Error),
    #[error("couldn't replace state file")]
    RenameTmpFile(#[source] tempfile::PersistError),
}

/// Where the session keeps its persisted values.
pub trait StateStore {
    fn get(&self, key: &str) -> Result<Option<String>, StateStoreError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StateStoreError>;
    fn remove(&self, key: &str) -> Result<(), StateStoreError>;
}

/// A [StateStore] backed by a single JSON file.
#[derive(Debug, Clone)]
pub struct FileStateStore {
    path: PathBuf,
}

impl FileStateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileStateStore { path: path.into() }
    }

    /// The lock file sits next to the state file. Its presence doesn't
    /// indicate an active lock since it isn't removed after use; it's a
    /// separate file because writes replace the state file itself.
    fn lock_path(&self) -> PathBuf {
        self.path.with_extension("lock")
    }

    fn acquire_lock(&self) -> Result<LockFile, StateStoreError> {
        let lock_path = self.lock_path();
        let mut lock =
            LockFile::open(lock_path.as_os_str()).map_err(StateStoreError::AcquireLock)?;
        lock.lock().map_err(StateStoreError::AcquireLock)?;
        Ok(lock)
    }

    /// Returns the parsed state file, or an empty map if it doesn't
    /// exist yet.
    fn read_map(&self) -> Result<BTreeMap<String, String>, StateStoreError> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "state file not found");
            return Ok(BTreeMap::new());
        }
        let contents = std::fs::read_to_string(&self.path).map_err(StateStoreError::ReadFile)?;
        serde_json::from_str(&contents).map_err(StateStoreError::Parse)
    }

    /// Writes the map to a temporary file and renames it into place so
    /// the write appears atomic. Takes the lock as an argument so a
    /// write can only happen while it's held.
    fn write_map(
        &self,
        map: &BTreeMap<String, String>,
        _lock: LockFile,
    ) -> Result<(), StateStoreError> {
        let parent = parent_dir(&self.path)?;
        let temp_file = tempfile::NamedTempFile::new_in(parent)
            .map_err(StateStoreError::OpenTmpFile)?;
        let writer = BufWriter::new(&temp_file);
        serde_json::to_writer_pretty(writer, map).map_err(StateStoreError::WriteTmpFile)?;
        temp_file
            .persist(&self.path)
            .map_err(StateStoreError::RenameTmpFile)?;
        Ok(())
    }
}

fn parent_dir(path: &Path) -> Result<&Path, StateStoreError> {
    // Fails only for degenerate paths like `/` or the empty string.
    path.parent()
        .ok_or_else(|| StateStoreError::InvalidLocation(path.to_path_buf()))
}

impl StateStore for FileStateStore {
    fn get(&self, key: &str) -> Result<Option<String>, StateStoreError> {
        Ok(self.read_map()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StateStoreError> {
        let lock = self.acquire_lock()?;
        let mut map = self.read_map()?;
        map.insert(key.to_string(), value.to_string());
        self.write_map(&map, lock)
    }

    fn remove(&self, key: &str) -> Result<(), StateStoreError> {
        let lock = self.acquire_lock()?;
        let mut map = self.read_map()?;
        if map.remove(key).is_none() {
            return Ok(());
        }
        self.write_map(&map, lock)
    }
}
