//! Local fallback storage.
//!
//! A persistent string key-value map used when the backend is unreachable.
//! Store values live under `store_{storeId}` as serialized JSON.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde_json::Value;

use crate::error::{PersistError, Result};
use crate::merge::{JsonObject, shallow_merge};

/// Prefix of every store entry in local storage.
pub const STORE_KEY_PREFIX: &str = "store_";

/// Local key holding the fallback copy of a store.
pub fn store_key(store_id: &str) -> String {
    format!("{STORE_KEY_PREFIX}{store_id}")
}

/// Persistent string key-value storage.
pub trait LocalStore: Send + Sync + std::fmt::Debug {
    /// Read the raw value stored under `key`.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Delete `key`. Deleting an absent key is not an error.
    fn remove(&self, key: &str) -> Result<()>;

    /// All keys currently stored.
    fn keys(&self) -> Result<Vec<String>>;
}

/// In-memory local store, lost when the process exits.
#[derive(Debug, Default)]
pub struct MemoryLocalStore {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryLocalStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, String>> {
        // A panic while holding the lock cannot leave the map half-written.
        self.entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl LocalStore for MemoryLocalStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.lock().remove(key);
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>> {
        Ok(self.lock().keys().cloned().collect())
    }
}

/// File-backed local store: one `<key>.json` file per entry.
///
/// Writes go to a temp file first and are renamed into place.
#[derive(Debug, Clone)]
pub struct FileLocalStore {
    dir: PathBuf,
}

impl FileLocalStore {
    /// Open (and create if needed) a store rooted at `dir`.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| PersistError::LocalStorage {
            operation: "create directory for",
            key: dir.display().to_string(),
            source: e,
        })?;
        Ok(Self { dir })
    }

    /// Directory holding the entries.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let file_name: String = key
            .chars()
            .map(|c| if matches!(c, '/' | '\\' | ':') { '_' } else { c })
            .collect();
        self.dir.join(format!("{file_name}.json"))
    }
}

impl LocalStore for FileLocalStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(PersistError::LocalStorage {
                operation: "read",
                key: key.to_string(),
                source: e,
            }),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let path = self.path_for(key);
        let temp_path = path.with_extension("json.tmp");
        let io_err = |operation: &'static str| {
            let key = key.to_string();
            move |source| PersistError::LocalStorage {
                operation,
                key,
                source,
            }
        };

        let mut file = File::create(&temp_path).map_err(io_err("create"))?;
        file.write_all(value.as_bytes()).map_err(io_err("write"))?;
        file.sync_all().map_err(io_err("sync"))?;
        fs::rename(&temp_path, &path).map_err(io_err("replace"))?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(PersistError::LocalStorage {
                operation: "remove",
                key: key.to_string(),
                source: e,
            }),
        }
    }

    fn keys(&self) -> Result<Vec<String>> {
        let entries = fs::read_dir(&self.dir).map_err(|e| PersistError::LocalStorage {
            operation: "list",
            key: self.dir.display().to_string(),
            source: e,
        })?;

        let mut keys: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| {
                entry
                    .file_name()
                    .to_str()
                    .and_then(|name| name.strip_suffix(".json"))
                    .map(str::to_string)
            })
            .collect();
        keys.sort();
        Ok(keys)
    }
}

/// Read the fallback copy of a store.
///
/// Absence, read failures and unparsable content all yield `{}`.
pub fn read_store(local: &dyn LocalStore, store_id: &str) -> Value {
    let key = store_key(store_id);
    let raw = match local.get(&key) {
        Ok(raw) => raw,
        Err(e) => {
            tracing::warn!(store_id, error = %e, "Local store read failed, using empty object");
            None
        }
    };

    raw.and_then(|content| match serde_json::from_str::<Value>(&content) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!(store_id, error = %e, "Local store entry is not valid JSON");
            None
        }
    })
    .unwrap_or_else(|| Value::Object(JsonObject::new()))
}

/// Replace the fallback copy of a store.
pub fn write_store(local: &dyn LocalStore, store_id: &str, value: &Value) -> Result<()> {
    let content = serde_json::to_string(value).map_err(|e| PersistError::Json {
        context: format!("local copy of '{store_id}'"),
        source: e,
    })?;
    local.set(&store_key(store_id), &content)
}

/// Shallow-merge `partial` into the fallback copy of a store and return the result.
pub fn merge_store(local: &dyn LocalStore, store_id: &str, partial: &JsonObject) -> Result<Value> {
    let current = read_store(local, store_id);
    let merged = shallow_merge(&current, partial);
    write_store(local, store_id, &merged)?;
    Ok(merged)
}

/// Drop cached local entries of a module whose cache version changed.
///
/// When `{module}_cache_version` differs from `version`, every key
/// containing `module` is removed and the new version is recorded.
/// Returns the number of removed keys.
pub fn clean_module_cache(local: &dyn LocalStore, module: &str, version: &str) -> Result<usize> {
    let version_key = format!("{module}_cache_version");
    if local.get(&version_key)?.as_deref() == Some(version) {
        tracing::debug!(module, "Module cache is current");
        return Ok(0);
    }

    let mut removed = 0;
    for key in local.keys()? {
        if key.contains(module) {
            local.remove(&key)?;
            removed += 1;
        }
    }
    local.set(&version_key, version)?;

    tracing::info!(module, removed, version, "Cleaned module cache");
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    fn object(value: Value) -> JsonObject {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_read_missing_store_is_empty() {
        let local = MemoryLocalStore::new();
        assert_eq!(read_store(&local, "losses"), json!({}));
    }

    #[test]
    fn test_read_corrupt_store_is_empty() {
        let local = MemoryLocalStore::new();
        local.set("store_losses", "{not json").unwrap();
        assert_eq!(read_store(&local, "losses"), json!({}));
    }

    #[test]
    fn test_merge_store_is_shallow() {
        let local = MemoryLocalStore::new();
        write_store(&local, "impulse", &json!({"formData": {"a": 1}, "results": [1]})).unwrap();

        let merged = merge_store(&local, "impulse", &object(json!({"formData": {"b": 2}}))).unwrap();
        assert_eq!(merged, json!({"formData": {"b": 2}, "results": [1]}));
        assert_eq!(read_store(&local, "impulse"), merged);
    }

    #[test]
    fn test_file_store_round_trip() {
        let dir = tempdir().unwrap();
        let local = FileLocalStore::open(dir.path().join("stores")).unwrap();

        local.set("store_losses", "{\"a\":1}").unwrap();
        local.set("theme", "dark").unwrap();

        assert_eq!(local.get("store_losses").unwrap().as_deref(), Some("{\"a\":1}"));
        assert_eq!(local.keys().unwrap(), vec!["store_losses", "theme"]);

        local.remove("theme").unwrap();
        local.remove("theme").unwrap();
        assert_eq!(local.get("theme").unwrap(), None);
        assert!(!local.dir().join("store_losses.json.tmp").exists());
    }

    #[test]
    fn test_clean_module_cache() {
        let local = MemoryLocalStore::new();
        local.set("store_history", "[]").unwrap();
        local.set("history_filter", "x").unwrap();
        local.set("store_losses", "{}").unwrap();

        assert_eq!(clean_module_cache(&local, "history", "1.0.0").unwrap(), 2);
        assert_eq!(
            local.get("history_cache_version").unwrap().as_deref(),
            Some("1.0.0")
        );
        assert!(local.get("store_losses").unwrap().is_some());

        // Same version again is a no-op
        local.set("store_history", "[]").unwrap();
        assert_eq!(clean_module_cache(&local, "history", "1.0.0").unwrap(), 0);
        assert!(local.get("store_history").unwrap().is_some());
    }
}
