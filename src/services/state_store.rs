// State Storage Service
// Whole-document persistence for the result cache, selected sources and analytics

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage quota exceeded for '{key}'")]
    QuotaExceeded { key: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// A key/value store of whole JSON documents.
pub trait DocumentStore: Send + Sync {
    fn read(&self, key: &str) -> Option<String>;
    fn write(&self, key: &str, document: &str) -> Result<(), StoreError>;
}

/// Read and parse a document; unreadable or malformed documents count as absent.
pub fn load_json<T: DeserializeOwned>(store: &dyn DocumentStore, key: &str) -> Option<T> {
    let raw = store.read(key)?;
    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(key = key, error = %e, "[STATE] Ignoring unparseable document");
            None
        }
    }
}

pub fn save_json<T: Serialize>(store: &dyn DocumentStore, key: &str, value: &T) -> Result<(), StoreError> {
    let document = serde_json::to_string(value)?;
    store.write(key, &document)
}

/// Write once; on failure shrink the value with `trim` and retry once.
/// A second failure is logged and swallowed.
pub fn save_with_retry<T, F>(store: &dyn DocumentStore, key: &str, value: &mut T, trim: F)
where
    T: Serialize,
    F: FnOnce(&mut T),
{
    let first = match save_json(store, key, value) {
        Ok(()) => return,
        Err(e) => e,
    };
    warn!(key = key, error = %first, "[STATE] Write failed, trimming and retrying once");
    trim(value);
    if let Err(e) = save_json(store, key, value) {
        warn!(key = key, error = %e, "[STATE] Retry failed, dropping write");
    }
}

/// One `<key>.json` file per document.
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn default_state_dir() -> Option<PathBuf> {
        dirs::data_local_dir().map(|p| p.join("scholarpen").join("state"))
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

impl DocumentStore for FileStore {
    fn read(&self, key: &str) -> Option<String> {
        fs::read_to_string(self.path_for(key)).ok()
    }

    fn write(&self, key: &str, document: &str) -> Result<(), StoreError> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, document)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }
}

/// In-memory store with an optional per-document size quota.
#[derive(Default)]
pub struct MemoryStore {
    docs: Mutex<HashMap<String, String>>,
    quota: Option<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quota(quota: usize) -> Self {
        Self { docs: Mutex::new(HashMap::new()), quota: Some(quota) }
    }
}

impl DocumentStore for MemoryStore {
    fn read(&self, key: &str) -> Option<String> {
        self.docs.lock().ok()?.get(key).cloned()
    }

    fn write(&self, key: &str, document: &str) -> Result<(), StoreError> {
        if let Some(quota) = self.quota {
            if document.len() > quota {
                return Err(StoreError::QuotaExceeded { key: key.to_string() });
            }
        }
        if let Ok(mut docs) = self.docs.lock() {
            docs.insert(key.to_string(), document.to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("state"));
        assert!(store.read("selectedSources").is_none());

        save_json(&store, "selectedSources", &vec![1, 2, 3]).unwrap();
        let back: Option<Vec<i32>> = load_json(&store, "selectedSources");
        assert_eq!(back, Some(vec![1, 2, 3]));
    }

    #[test]
    fn test_malformed_document_is_absent() {
        let store = MemoryStore::new();
        store.write("resultsCache", "{not json").unwrap();
        let back: Option<Vec<i32>> = load_json(&store, "resultsCache");
        assert!(back.is_none());
    }

    #[test]
    fn test_quota_triggers_trim_and_retry() {
        let store = MemoryStore::with_quota(10);
        let mut value: Vec<u32> = (0..20).collect();
        save_with_retry(&store, "events", &mut value, |v| v.truncate(2));
        assert_eq!(value, vec![0, 1]);
        let back: Option<Vec<u32>> = load_json(&store, "events");
        assert_eq!(back, Some(vec![0, 1]));
    }

    #[test]
    fn test_second_failure_is_swallowed() {
        let store = MemoryStore::with_quota(1);
        let mut value: Vec<u32> = (0..20).collect();
        save_with_retry(&store, "events", &mut value, |_| {});
        assert!(store.read("events").is_none());
    }
}
