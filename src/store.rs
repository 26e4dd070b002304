//! Key-value store abstraction.
//!
//! History and identity records are persisted through [`KeyValueStore`] so the
//! storage backend is injected rather than global. [`JsonFileStore`] keeps a
//! single JSON document on disk; [`MemoryStore`] is for tests and ephemeral
//! sessions.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use crate::error::{GatewayError, Result};

/// String-keyed store of JSON values.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<Value>>;
    fn set(&self, key: &str, value: Value) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

/// Read and deserialize `key`, or `None` when absent.
pub fn load<T: DeserializeOwned>(store: &dyn KeyValueStore, key: &str) -> Result<Option<T>> {
    store
        .get(key)?
        .map(|v| serde_json::from_value(v).map_err(GatewayError::from))
        .transpose()
}

/// Serialize `value` and write it under `key`.
pub fn save<T: Serialize>(store: &dyn KeyValueStore, key: &str, value: &T) -> Result<()> {
    store.set(key, serde_json::to_value(value)?)
}

fn lock_err<T>(_: T) -> GatewayError {
    GatewayError::Storage("store lock poisoned".into())
}

/// In-memory store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.entries.lock().map_err(lock_err)?.get(key).cloned())
    }

    fn set(&self, key: &str, value: Value) -> Result<()> {
        self.entries
            .lock()
            .map_err(lock_err)?
            .insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.entries.lock().map_err(lock_err)?.remove(key);
        Ok(())
    }
}

/// Store persisted as one pretty-printed JSON object.
///
/// Every operation re-reads the file, so several handles (or processes) on the
/// same path see each other's writes. Mutations merge into the current file
/// contents before the atomic replace instead of rewriting a stale snapshot. A
/// corrupt file is logged and treated as empty.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    // Serializes read-modify-write within this process.
    lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        Self::load_from_disk(&path)?;
        Ok(Self {
            path,
            lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load_from_disk(path: &Path) -> Result<HashMap<String, Value>> {
        match std::fs::read_to_string(path) {
            Ok(data) => match serde_json::from_str(&data) {
                Ok(entries) => Ok(entries),
                Err(e) => {
                    warn!(path = %path.display(), "Store file is corrupt, starting empty: {}", e);
                    Ok(HashMap::new())
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HashMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn save_to_disk(&self, entries: &HashMap<String, Value>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_string_pretty(entries)?;
        // Atomic replace.
        let tmp = self.path.with_extension(format!("json.{}.tmp", std::process::id()));
        std::fs::write(&tmp, data)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    /// Apply `mutate` to the current on-disk contents and persist the result
    /// when it reports a change.
    fn update(&self, mutate: impl FnOnce(&mut HashMap<String, Value>) -> bool) -> Result<()> {
        let _guard = self.lock.lock().map_err(lock_err)?;
        let mut entries = Self::load_from_disk(&self.path)?;
        if mutate(&mut entries) {
            self.save_to_disk(&entries)?;
        }
        Ok(())
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<Value>> {
        let _guard = self.lock.lock().map_err(lock_err)?;
        Ok(Self::load_from_disk(&self.path)?.remove(key))
    }

    fn set(&self, key: &str, value: Value) -> Result<()> {
        self.update(|entries| {
            entries.insert(key.to_string(), value);
            true
        })
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.update(|entries| entries.remove(key).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_memory_store_roundtrip() {
        let store = MemoryStore::new();
        assert!(store.get("k").unwrap().is_none());
        store.set("k", json!({"a": 1})).unwrap();
        assert_eq!(store.get("k").unwrap(), Some(json!({"a": 1})));
        store.remove("k").unwrap();
        assert!(store.get("k").unwrap().is_none());
    }

    #[test]
    fn test_typed_helpers() {
        let store = MemoryStore::new();
        save(&store, "list", &vec![1u32, 2, 3]).unwrap();
        let list: Vec<u32> = load(&store, "list").unwrap().unwrap();
        assert_eq!(list, vec![1, 2, 3]);
        let missing: Option<Vec<u32>> = load(&store, "other").unwrap();
        assert!(missing.is_none());
    }

    #[test]
    fn test_typed_load_reports_shape_mismatch() {
        let store = MemoryStore::new();
        store.set("k", json!("text")).unwrap();
        let err = load::<Vec<u32>>(&store, "k").unwrap_err();
        assert!(matches!(err, GatewayError::Serialization(_)));
    }

    #[test]
    fn test_json_file_store_persists_across_opens() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("nested").join("store.json");
        {
            let store = JsonFileStore::open(&path).unwrap();
            store.set("users", json!(["A"])).unwrap();
            store.set("drop", json!(1)).unwrap();
            store.remove("drop").unwrap();
        }
        let reopened = JsonFileStore::open(&path).unwrap();
        assert_eq!(reopened.get("users").unwrap(), Some(json!(["A"])));
        assert!(reopened.get("drop").unwrap().is_none());
    }

    #[test]
    fn test_json_file_store_handles_share_writes() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("store.json");
        let chat = JsonFileStore::open(&path).unwrap();
        let admin = JsonFileStore::open(&path).unwrap();

        admin.set("users", json!(["BOB"])).unwrap();
        assert_eq!(chat.get("users").unwrap(), Some(json!(["BOB"])));
        chat.set("history:guest", json!([{"title": "hi"}])).unwrap();
        admin.remove("missing").unwrap();

        let reopened = JsonFileStore::open(&path).unwrap();
        assert_eq!(reopened.get("users").unwrap(), Some(json!(["BOB"])));
        assert_eq!(
            reopened.get("history:guest").unwrap(),
            Some(json!([{"title": "hi"}]))
        );
    }

    #[test]
    fn test_json_file_store_remove_keeps_other_handles_keys() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("store.json");
        let a = JsonFileStore::open(&path).unwrap();
        let b = JsonFileStore::open(&path).unwrap();

        a.set("history:alice", json!([])).unwrap();
        b.set("users", json!(["ALICE"])).unwrap();
        a.remove("history:alice").unwrap();

        assert_eq!(b.get("users").unwrap(), Some(json!(["ALICE"])));
        assert!(b.get("history:alice").unwrap().is_none());
    }

    #[test]
    fn test_json_file_store_corrupt_file_starts_empty() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("store.json");
        std::fs::write(&path, "{ broken").unwrap();
        let store = JsonFileStore::open(&path).unwrap();
        assert!(store.get("anything").unwrap().is_none());
    }
}
