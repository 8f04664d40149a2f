//! File-backed collaborators for the CLI and tests.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{HotUpdateError, HotUpdateResult};
use crate::host::{FileSystem, KeyValueStore};

/// Key-value store persisted as a single JSON object.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    items: BTreeMap<String, String>,
}

impl JsonFileStore {
    /// Open the store at `path`, starting empty if the file does not exist.
    pub fn open(path: impl Into<PathBuf>) -> HotUpdateResult<Self> {
        let path = path.into();
        let items = if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            if content.trim().is_empty() {
                BTreeMap::new()
            } else {
                serde_json::from_str(&content)?
            }
        } else {
            BTreeMap::new()
        };

        debug!(path = %path.display(), entries = items.len(), "Opened key-value store");
        Ok(Self { path, items })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn save(&self) -> HotUpdateResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(&self.items)?;
        std::fs::write(&self.path, content)?;
        Ok(())
    }
}

impl KeyValueStore for JsonFileStore {
    fn get_item(&self, key: &str) -> HotUpdateResult<Option<String>> {
        Ok(self.items.get(key).cloned())
    }

    fn set_item(&mut self, key: &str, value: &str) -> HotUpdateResult<()> {
        self.items.insert(key.to_string(), value.to_string());
        self.save().map_err(|e| HotUpdateError::StoreFailed {
            key: key.to_string(),
            message: e.to_string(),
        })
    }
}

/// Filesystem rooted at a writable directory with an in-process search-path list.
#[derive(Debug, Clone)]
pub struct LocalFileSystem {
    root: PathBuf,
    search_paths: Vec<String>,
}

impl LocalFileSystem {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            search_paths: Vec::new(),
        }
    }

    /// Root under the platform data directory (`<data>/cortex`).
    pub fn from_data_dir() -> HotUpdateResult<Self> {
        let root = dirs::data_local_dir()
            .ok_or(HotUpdateError::NoWritablePath)?
            .join("cortex");
        Ok(Self::new(root))
    }

    pub fn with_search_paths(mut self, paths: Vec<String>) -> Self {
        self.search_paths = paths;
        self
    }
}

impl FileSystem for LocalFileSystem {
    fn writable_path(&self) -> HotUpdateResult<PathBuf> {
        std::fs::create_dir_all(&self.root)?;
        if !self.root.is_absolute() {
            return Ok(std::fs::canonicalize(&self.root)?);
        }
        Ok(self.root.clone())
    }

    fn search_paths(&self) -> Vec<String> {
        self.search_paths.clone()
    }

    fn set_search_paths(&mut self, paths: Vec<String>) {
        self.search_paths = paths;
    }
}
