//! Key/value storage for client session state.
//!
//! Two backends:
//! - [`MemoryStorage`] lives as long as the process, like a browser tab's
//!   session storage
//! - [`FileStorage`] keeps a small JSON object on disk so a terminal host can
//!   pick up the same session after a restart

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde_json::{Map, Value};

use crate::error::{ChatError, Result};

/// Storage key for the session id.
pub const SESSION_KEY: &str = "chat_uuid";
/// Storage key for the reload-detection flag.
pub const RELOAD_FLAG_KEY: &str = "chatRefreshFlag";

const APP_DIR: &str = "loyalty-chat";
const SESSION_FILE: &str = "session.json";

/// String key/value store scoped to one client.
pub trait SessionStorage: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

/// In-process storage.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>> {
        self.entries
            .lock()
            .map_err(|_| ChatError::Storage("memory storage lock poisoned".into()))
    }
}

impl SessionStorage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.lock()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.lock()?.remove(key);
        Ok(())
    }
}

/// JSON file storage.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    // Serializes read-modify-write cycles within this process.
    guard: Mutex<()>,
}

impl FileStorage {
    /// Use the file at `path`. It is created on first write.
    pub fn open_at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            guard: Mutex::new(()),
        }
    }

    /// Use the default location under the user's data directory.
    pub fn open() -> Result<Self> {
        Ok(Self::open_at(Self::default_path()?))
    }

    /// `<data dir>/loyalty-chat/session.json`.
    pub fn default_path() -> Result<PathBuf> {
        let dir = dirs::data_dir()
            .ok_or_else(|| ChatError::Storage("could not find data directory".into()))?
            .join(APP_DIR);
        Ok(dir.join(SESSION_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<Map<String, Value>> {
        if !self.path.exists() {
            return Ok(Map::new());
        }

        let content = std::fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(Map::new());
        }

        match serde_json::from_str::<Value>(&content)? {
            Value::Object(map) => Ok(map),
            _ => Err(ChatError::Storage(format!(
                "{} does not contain a JSON object",
                self.path.display()
            ))),
        }
    }

    fn write_all(&self, entries: &Map<String, Value>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_vec_pretty(entries)?)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn update(&self, f: impl FnOnce(&mut Map<String, Value>)) -> Result<()> {
        let _guard = self
            .guard
            .lock()
            .map_err(|_| ChatError::Storage("file storage lock poisoned".into()))?;
        let mut entries = self.read_all()?;
        f(&mut entries);
        self.write_all(&entries)
    }
}

impl SessionStorage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let entries = self.read_all()?;
        Ok(entries
            .get(key)
            .and_then(Value::as_str)
            .map(str::to_string))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.update(|entries| {
            entries.insert(key.to_string(), Value::String(value.to_string()));
        })
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.update(|entries| {
            entries.remove(key);
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn memory_roundtrip() {
        let storage = MemoryStorage::new();
        assert_eq!(storage.get(SESSION_KEY).unwrap(), None);
        storage.set(SESSION_KEY, "0123456789").unwrap();
        assert_eq!(storage.get(SESSION_KEY).unwrap().as_deref(), Some("0123456789"));
        storage.remove(SESSION_KEY).unwrap();
        assert_eq!(storage.get(SESSION_KEY).unwrap(), None);
    }

    #[test]
    fn file_storage_persists_between_instances() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("session.json");

        let storage = FileStorage::open_at(&path);
        assert_eq!(storage.get(SESSION_KEY).unwrap(), None);
        storage.set(SESSION_KEY, "0000000042").unwrap();
        storage.set(RELOAD_FLAG_KEY, "true").unwrap();

        let reopened = FileStorage::open_at(&path);
        assert_eq!(reopened.get(SESSION_KEY).unwrap().as_deref(), Some("0000000042"));
        reopened.remove(RELOAD_FLAG_KEY).unwrap();
        assert_eq!(storage.get(RELOAD_FLAG_KEY).unwrap(), None);
        assert_eq!(storage.get(SESSION_KEY).unwrap().as_deref(), Some("0000000042"));
    }

    #[test]
    fn file_storage_rejects_non_object() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, "[1, 2]").unwrap();

        let storage = FileStorage::open_at(&path);
        assert!(matches!(storage.get(SESSION_KEY), Err(ChatError::Storage(_))));
    }
}
