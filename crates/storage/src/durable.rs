//! Durable store contract and implementations
//!
//! The cache persists its entire root-key→value mapping as one serialized
//! record in a single fixed slot, and reads it back exactly once at
//! hydration. The contract is one string record in one slot, `write_record`
//! and `read_record`, leaving the storage medium pluggable.
//!
//! [`FileStore`] uses the write-fsync-rename pattern for crash safety:
//!
//! 1. Write to a temporary file next to the slot
//! 2. fsync the temporary file
//! 3. Atomic rename over the slot path
//! 4. fsync the parent directory

use canopy_core::{Error, Result};
use parking_lot::Mutex;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// A single-slot durable record store
///
/// Implementations must be safe to call from the cache's mutex domain:
/// `write_record` is invoked synchronously after every mutation.
pub trait DurableStore: Send + Sync {
    /// Replace the slot's contents with `record`
    fn write_record(&self, record: &str) -> Result<()>;

    /// Read the slot's contents, `None` when the slot has never been written
    fn read_record(&self) -> Result<Option<String>>;
}

/// In-memory durable store, for tests and ephemeral caches
#[derive(Debug, Default)]
pub struct MemoryStore {
    slot: Mutex<Option<String>>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        MemoryStore::default()
    }
}

impl DurableStore for MemoryStore {
    fn write_record(&self, record: &str) -> Result<()> {
        *self.slot.lock() = Some(record.to_string());
        Ok(())
    }

    fn read_record(&self) -> Result<Option<String>> {
        Ok(self.slot.lock().clone())
    }
}

/// File-backed durable store: one slot file, replaced atomically on write
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    /// Create a store writing to the given slot path.
    ///
    /// The parent directory must already exist; the slot file itself is
    /// created on first write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileStore { path: path.into() }
    }

    /// The slot path this store writes to
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "record".to_string());
        self.path.with_file_name(format!(".{name}.tmp"))
    }
}

impl DurableStore for FileStore {
    fn write_record(&self, record: &str) -> Result<()> {
        let tmp = self.temp_path();

        let mut file = File::create(&tmp)?;
        file.write_all(record.as_bytes())?;
        file.sync_all()?;
        drop(file);

        fs::rename(&tmp, &self.path)?;

        // Make the rename itself durable
        if let Some(parent) = self.path.parent() {
            if let Ok(dir) = File::open(parent) {
                let _ = dir.sync_all();
            }
        }

        Ok(())
    }

    fn read_record(&self) -> Result<Option<String>> {
        match fs::read_to_string(&self.path) {
            Ok(record) => Ok(Some(record)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::Io(e)),
        }
    }
}
