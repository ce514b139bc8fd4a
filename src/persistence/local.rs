//! Browser LocalStorage

use web_sys::Storage;

use super::{Result, Store, StoreError};

/// Prefix keeping our keys apart from other apps on the same origin
const KEY_PREFIX: &str = "circle_clicker/";

pub struct LocalStorageStore {
    storage: Storage,
}

impl LocalStorageStore {
    pub fn new() -> Result<Self> {
        let storage = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten()
            .ok_or_else(|| StoreError::Unavailable("LocalStorage blocked".into()))?;
        Ok(Self { storage })
    }
}

impl Store for LocalStorageStore {
    fn load(&self, key: &str) -> Result<Option<String>> {
        self.storage
            .get_item(&format!("{KEY_PREFIX}{key}"))
            .map_err(|e| StoreError::Unavailable(format!("{e:?}")))
    }

    fn save(&mut self, key: &str, text: &str) -> Result<()> {
        self.storage
            .set_item(&format!("{KEY_PREFIX}{key}"), text)
            .map_err(|e| StoreError::Unavailable(format!("{e:?}")))
    }
}
