//! File-per-key storage in the platform config directory

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use super::{Result, Store, StoreError};

/// Directory name under the platform config dir
const APP_DIR: &str = "circle-clicker";

pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Store rooted at `dir`
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { root: dir.into() }
    }

    /// Store in `~/.config/circle-clicker` (or the platform equivalent)
    pub fn in_config_dir() -> Result<Self> {
        let mut root = dirs::config_dir()
            .ok_or_else(|| StoreError::Unavailable("no config directory".into()))?;
        root.push(APP_DIR);
        Ok(Self::new(root))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }
}

impl Store for FileStore {
    fn load(&self, key: &str) -> Result<Option<String>> {
        match fs::read_to_string(self.path(key)) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&mut self, key: &str, text: &str) -> Result<()> {
        fs::create_dir_all(&self.root)?;
        // Write then rename so a crash never leaves a half-written record
        let tmp = self.path(&format!("{key}.tmp"));
        fs::write(&tmp, text)?;
        fs::rename(&tmp, self.path(key))?;
        Ok(())
    }
}
