//! Key/value persistence for settings and high scores
//!
//! Records are JSON text stored under a file-like key:
//! - Native: one file per key in `<config dir>/circle-clicker/`
//! - Web: one LocalStorage entry per key
//!
//! Load failures are reported to the caller, which falls back to defaults.

#[cfg(not(target_arch = "wasm32"))]
mod file;
#[cfg(target_arch = "wasm32")]
mod local;

use std::collections::HashMap;

use serde::Serialize;
use serde::de::DeserializeOwned;

#[cfg(not(target_arch = "wasm32"))]
pub use file::FileStore;
#[cfg(target_arch = "wasm32")]
pub use local::LocalStorageStore;

/// Persistence errors
#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// No backing storage (no config dir, LocalStorage blocked)
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Text storage addressed by key
pub trait Store {
    /// Read a record, `None` if it was never written
    fn load(&self, key: &str) -> Result<Option<String>>;
    fn save(&mut self, key: &str, text: &str) -> Result<()>;
}

/// Deserialize the record under `key`
pub fn load_json<T: DeserializeOwned>(store: &dyn Store, key: &str) -> Result<Option<T>> {
    match store.load(key)? {
        Some(text) => Ok(Some(serde_json::from_str(&text)?)),
        None => Ok(None),
    }
}

/// Serialize `value` under `key`
pub fn save_json<T: Serialize + ?Sized>(store: &mut dyn Store, key: &str, value: &T) -> Result<()> {
    let text = serde_json::to_string(value)?;
    store.save(key, &text)
}

/// In-memory store for tests and headless runs without a data dir
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    records: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.records.get(key).map(String::as_str)
    }
}

impl Store for MemoryStore {
    fn load(&self, key: &str) -> Result<Option<String>> {
        Ok(self.records.get(key).cloned())
    }

    fn save(&mut self, key: &str, text: &str) -> Result<()> {
        self.records.insert(key.to_string(), text.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_roundtrip() {
        let mut store = MemoryStore::new();
        assert!(store.load("a.json").unwrap().is_none());
        store.save("a.json", "[1,2]").unwrap();
        assert_eq!(store.load("a.json").unwrap().as_deref(), Some("[1,2]"));
    }

    #[test]
    fn test_json_helpers() {
        let mut store = MemoryStore::new();
        save_json(&mut store, "v.json", &vec![3u32, 4]).unwrap();
        let back: Option<Vec<u32>> = load_json(&store, "v.json").unwrap();
        assert_eq!(back, Some(vec![3, 4]));
        let missing: Option<Vec<u32>> = load_json(&store, "x.json").unwrap();
        assert!(missing.is_none());
    }

    #[test]
    fn test_malformed_json_is_an_error() {
        let mut store = MemoryStore::new();
        store.save("bad.json", "{not json").unwrap();
        let result: Result<Option<Vec<u32>>> = load_json(&store, "bad.json");
        assert!(matches!(result, Err(StoreError::Json(_))));
    }
}
