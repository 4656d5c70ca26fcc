//! Narrow key-value storage seam.
//!
//! The gateway only ever needs get/set/remove on string keys, so the
//! backing store is swappable: a JSON file tree in production, an
//! in-memory map in tests, a server-backed store later.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use crate::error::StoreError;

/// Minimal durable key-value store.
pub trait StateStore: Send + Sync {
    /// Read a value; `None` when the key is absent.
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Write a value, replacing any existing one.
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Delete a key. Removing an absent key is not an error.
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// File-backed store: one JSON file per key under a directory.
#[derive(Debug)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Create a store rooted at `dir`. The directory is created lazily on
    /// first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl StateStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }
        std::fs::read_to_string(&path)
            .map(Some)
            .map_err(|e| StoreError::ReadFailed(e.to_string()))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        std::fs::create_dir_all(&self.dir).map_err(|e| StoreError::WriteFailed(e.to_string()))?;

        // Write-then-rename so a crash mid-write never leaves a torn file.
        let path = self.path_for(key);
        let tmp = self.dir.join(format!("{key}.json.tmp"));
        std::fs::write(&tmp, value).map_err(|e| StoreError::WriteFailed(e.to_string()))?;
        std::fs::rename(&tmp, &path).map_err(|e| StoreError::WriteFailed(e.to_string()))?;

        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let path = self.path_for(key);
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::WriteFailed(e.to_string())),
        }
    }
}

/// In-memory store for tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    map: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl StateStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self
            .map
            .lock()
            .map_err(|_| StoreError::ReadFailed("poisoned lock".to_string()))?
            .get(key)
            .cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.map
            .lock()
            .map_err(|_| StoreError::WriteFailed("poisoned lock".to_string()))?
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.map
            .lock()
            .map_err(|_| StoreError::WriteFailed("poisoned lock".to_string()))?
            .remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_set_get_remove() {
        let store = MemoryStore::new();

        assert_eq!(store.get("session").unwrap(), None);

        store.set("session", "{\"x\":1}").unwrap();
        assert_eq!(store.get("session").unwrap().as_deref(), Some("{\"x\":1}"));

        store.remove("session").unwrap();
        assert_eq!(store.get("session").unwrap(), None);
    }

    #[test]
    fn memory_store_remove_absent_key_is_ok() {
        let store = MemoryStore::new();
        assert!(store.remove("missing").is_ok());
    }

    #[test]
    fn file_store_round_trips_values() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());

        assert_eq!(store.get("session").unwrap(), None);

        store.set("session", "payload").unwrap();
        assert_eq!(store.get("session").unwrap().as_deref(), Some("payload"));

        store.set("session", "replaced").unwrap();
        assert_eq!(store.get("session").unwrap().as_deref(), Some("replaced"));

        store.remove("session").unwrap();
        assert_eq!(store.get("session").unwrap(), None);
    }

    #[test]
    fn file_store_remove_absent_key_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        assert!(store.remove("missing").is_ok());
    }

    #[test]
    fn file_store_creates_directory_on_first_write() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("state").join("deep");
        let store = FileStore::new(&nested);

        assert!(!nested.is_dir());
        store.set("session", "x").unwrap();
        assert!(nested.is_dir());
    }
}
