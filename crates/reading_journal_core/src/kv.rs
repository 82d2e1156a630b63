//! crates/reading_journal_core/src/kv.rs
//!
//! Key-value storage backends implementing the `KeyValueStore` port.

use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Mutex;

use crate::ports::{KeyValueStore, PortError, PortResult};

//=========================================================================================
// In-Memory Backend
//=========================================================================================

/// Ephemeral in-memory store. The default backend for tests and for
/// running without a data directory.
#[derive(Debug, Default)]
pub struct MemoryKeyValueStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryKeyValueStore {
    fn get(&self, key: &str) -> PortResult<Option<String>> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| PortError::Unexpected("storage mutex poisoned".to_string()))?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> PortResult<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| PortError::Unexpected("storage mutex poisoned".to_string()))?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> PortResult<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| PortError::Unexpected("storage mutex poisoned".to_string()))?;
        entries.remove(key);
        Ok(())
    }
}

//=========================================================================================
// File Backend
//=========================================================================================

/// Stores each key as one JSON file inside a root directory.
#[derive(Debug)]
pub struct FileKeyValueStore {
    root: PathBuf,
}

impl FileKeyValueStore {
    /// Opens (and creates if missing) the backing directory.
    pub fn new(root: impl Into<PathBuf>) -> PortResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|e| {
            PortError::Unexpected(format!("failed to create data directory: {e}"))
        })?;
        Ok(Self { root })
    }

    // Keys map to file names. Anything outside [A-Za-z0-9._-] flattens to
    // '_'; journal keys only use ':' as a separator so this stays unique.
    fn path_for(&self, key: &str) -> PathBuf {
        let name: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.root.join(format!("{name}.json"))
    }
}

impl KeyValueStore for FileKeyValueStore {
    fn get(&self, key: &str) -> PortResult<Option<String>> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(PortError::Unexpected(format!("failed to read {key}: {e}"))),
        }
    }

    fn set(&self, key: &str, value: &str) -> PortResult<()> {
        fs::write(self.path_for(key), value)
            .map_err(|e| PortError::Unexpected(format!("failed to write {key}: {e}")))
    }

    fn remove(&self, key: &str) -> PortResult<()> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(PortError::Unexpected(format!("failed to remove {key}: {e}"))),
        }
    }
}
