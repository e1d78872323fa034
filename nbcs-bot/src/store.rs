//! Per-user settings persistence.
//!
//! Settings live in flat `{ userId: value }` JSON files that are rewritten in
//! full on every mutation. The mapping is also held in memory, so a failed
//! write leaves memory ahead of disk until the next successful write.
//!
//! Writes inside one process are serialized by the store's mutex. Two
//! processes pointed at the same file still race: the last whole-file write
//! wins and the other process's update to a different key is lost.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Persistence failure. Never surfaced to users; logged and absorbed.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Key-value store for one kind of per-user setting.
pub trait SettingsStore<T>: Send + Sync {
    /// Current value for `key`.
    fn get(&self, key: &str) -> Option<T>;

    /// Insert or replace the value for `key` and persist.
    fn set(&self, key: &str, value: T);

    /// Remove `key` and persist. Returns the removed value.
    fn delete(&self, key: &str) -> Option<T>;

    /// Number of stored keys.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// ============================================================================
// JSON file store
// ============================================================================

/// Store backed by a pretty-printed JSON object on disk.
pub struct JsonFileStore<T> {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, T>>,
}

impl<T> JsonFileStore<T>
where
    T: Serialize + DeserializeOwned + Clone + Send + Sync,
{
    /// Open the store at `path`, loading whatever it currently holds.
    ///
    /// A missing file is an empty store. An unreadable or corrupt file is
    /// logged and also treated as empty.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                if let Err(e) = fs::create_dir_all(parent) {
                    tracing::warn!(path = %parent.display(), error = %e, "Failed to create data directory");
                }
            }
        }

        let entries = match load_map(&path) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(error = %e, "Settings file unreadable, starting empty");
                BTreeMap::new()
            }
        };

        tracing::debug!(path = %path.display(), entries = entries.len(), "Settings store opened");

        Self {
            path,
            entries: Mutex::new(entries),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, entries: &BTreeMap<String, T>) {
        if let Err(e) = write_map(&self.path, entries) {
            tracing::warn!(error = %e, "Failed to persist settings; in-memory state kept");
        }
    }
}

impl<T> SettingsStore<T> for JsonFileStore<T>
where
    T: Serialize + DeserializeOwned + Clone + Send + Sync,
{
    fn get(&self, key: &str) -> Option<T> {
        lock(&self.entries).get(key).cloned()
    }

    fn set(&self, key: &str, value: T) {
        let mut entries = lock(&self.entries);
        entries.insert(key.to_string(), value);
        self.persist(&entries);
    }

    fn delete(&self, key: &str) -> Option<T> {
        let mut entries = lock(&self.entries);
        let removed = entries.remove(key);
        if removed.is_some() {
            self.persist(&entries);
        }
        removed
    }

    fn len(&self) -> usize {
        lock(&self.entries).len()
    }
}

fn load_map<T: DeserializeOwned>(path: &Path) -> Result<BTreeMap<String, T>, StoreError> {
    if !path.exists() {
        return Ok(BTreeMap::new());
    }

    let content = fs::read_to_string(path).map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    serde_json::from_str(&content).map_err(|source| StoreError::Json {
        path: path.to_path_buf(),
        source,
    })
}

fn write_map<T: Serialize>(path: &Path, entries: &BTreeMap<String, T>) -> Result<(), StoreError> {
    let json = serde_json::to_string_pretty(entries).map_err(|source| StoreError::Json {
        path: path.to_path_buf(),
        source,
    })?;

    fs::write(path, json).map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })
}

// ============================================================================
// In-memory store
// ============================================================================

/// Store with no backing file. Used by tests and throwaway deployments.
pub struct MemoryStore<T> {
    entries: Mutex<HashMap<String, T>>,
}

impl<T> MemoryStore<T> {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }
}

impl<T> Default for MemoryStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + Send + Sync> SettingsStore<T> for MemoryStore<T> {
    fn get(&self, key: &str) -> Option<T> {
        lock(&self.entries).get(key).cloned()
    }

    fn set(&self, key: &str, value: T) {
        lock(&self.entries).insert(key.to_string(), value);
    }

    fn delete(&self, key: &str) -> Option<T> {
        lock(&self.entries).remove(key)
    }

    fn len(&self) -> usize {
        lock(&self.entries).len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store: JsonFileStore<String> = JsonFileStore::open(dir.path().join("prompts.json"));
        assert!(store.is_empty());
        assert!(store.get("u1").is_none());
    }

    #[test]
    fn set_writes_whole_mapping_pretty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prompts.json");
        let store: JsonFileStore<String> = JsonFileStore::open(&path);

        store.set("u1", "be brief".into());
        store.set("u2", "be verbose".into());

        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\n  \"u1\": \"be brief\""));
        let parsed: Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed["u2"], "be verbose");
    }

    #[test]
    fn reopen_reads_previous_state() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prompts.json");
        {
            let store: JsonFileStore<String> = JsonFileStore::open(&path);
            store.set("u1", "hello".into());
        }
        let store: JsonFileStore<String> = JsonFileStore::open(&path);
        assert_eq!(store.get("u1").as_deref(), Some("hello"));
    }

    #[test]
    fn corrupt_file_degrades_to_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prompts.json");
        fs::write(&path, "{ this is not json").unwrap();

        let store: JsonFileStore<String> = JsonFileStore::open(&path);
        assert!(store.is_empty());

        // The next write replaces the corrupt file
        store.set("u1", "fresh".into());
        let reopened: JsonFileStore<String> = JsonFileStore::open(&path);
        assert_eq!(reopened.get("u1").as_deref(), Some("fresh"));
    }

    #[test]
    fn failed_write_keeps_memory_state() {
        let dir = tempfile::tempdir().unwrap();
        // A directory at the file path makes every write fail
        let path = dir.path().join("blocked.json");
        fs::create_dir(&path).unwrap();

        let store: JsonFileStore<String> = JsonFileStore::open(&path);
        store.set("u1", "kept".into());
        assert_eq!(store.get("u1").as_deref(), Some("kept"));
    }

    #[test]
    fn delete_removes_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prompts.json");
        let store: JsonFileStore<String> = JsonFileStore::open(&path);
        store.set("u1", "x".into());

        assert_eq!(store.delete("u1").as_deref(), Some("x"));
        assert!(store.delete("u1").is_none());

        let reopened: JsonFileStore<String> = JsonFileStore::open(&path);
        assert!(reopened.is_empty());
    }

    #[test]
    fn memory_store_roundtrip() {
        let store = MemoryStore::new();
        store.set("a", 1u32);
        store.set("a", 2u32);
        assert_eq!(store.get("a"), Some(2));
        assert_eq!(store.len(), 1);
        assert_eq!(store.delete("a"), Some(2));
        assert!(store.is_empty());
    }
}
