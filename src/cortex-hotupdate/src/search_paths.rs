//! Search-path merging and persistence.
//!
//! After a successful update the search paths declared by the new bundle are
//! placed ahead of the current ones, saved under a fixed key so the next
//! launch can restore them, and applied to the running process.

use tracing::{debug, info, warn};

use crate::error::HotUpdateResult;
use crate::host::{FileSystem, KeyValueStore};

/// Storage key for the persisted search-path list.
pub const SEARCH_PATHS_KEY: &str = "HotUpdateSearchPaths-game";

/// Prepend `new_paths` to `existing`, keeping the order inside each list.
pub fn merge_search_paths(existing: &[String], new_paths: &[String]) -> Vec<String> {
    new_paths.iter().chain(existing.iter()).cloned().collect()
}

/// Commits merged search paths to storage and the filesystem.
#[derive(Debug, Clone)]
pub struct SearchPathMerger {
    key: String,
}

impl Default for SearchPathMerger {
    fn default() -> Self {
        Self::new(SEARCH_PATHS_KEY)
    }
}

impl SearchPathMerger {
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Merge `new_paths` ahead of the filesystem's current paths, persist the
    /// result and make it active.
    ///
    /// Existing entries already present in `new_paths` are dropped first, so
    /// committing the same bundle twice yields the same list.
    pub fn commit<F, S>(
        &self,
        fs: &mut F,
        store: &mut S,
        new_paths: &[String],
    ) -> HotUpdateResult<Vec<String>>
    where
        F: FileSystem + ?Sized,
        S: KeyValueStore + ?Sized,
    {
        let existing: Vec<String> = fs
            .search_paths()
            .into_iter()
            .filter(|p| !new_paths.contains(p))
            .collect();
        let merged = merge_search_paths(&existing, new_paths);

        let json = serde_json::to_string(&merged)?;
        store.set_item(&self.key, &json)?;
        fs.set_search_paths(merged.clone());

        info!(
            added = new_paths.len(),
            total = merged.len(),
            "Committed hot update search paths"
        );
        Ok(merged)
    }

    /// Read the persisted list.
    pub fn load<S>(&self, store: &S) -> HotUpdateResult<Option<Vec<String>>>
    where
        S: KeyValueStore + ?Sized,
    {
        match store.get_item(&self.key)? {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    /// Apply persisted search paths at launch.
    ///
    /// A corrupt entry is logged and skipped so the application still starts
    /// with its built-in paths.
    pub fn restore<F, S>(&self, fs: &mut F, store: &S) -> Vec<String>
    where
        F: FileSystem + ?Sized,
        S: KeyValueStore + ?Sized,
    {
        let persisted = match self.load(store) {
            Ok(Some(paths)) => paths,
            Ok(None) => {
                debug!("No persisted hot update search paths");
                return fs.search_paths();
            }
            Err(e) => {
                warn!("Ignoring persisted search paths: {}", e);
                return fs.search_paths();
            }
        };

        let current: Vec<String> = fs
            .search_paths()
            .into_iter()
            .filter(|p| !persisted.contains(p))
            .collect();
        let merged = merge_search_paths(&current, &persisted);
        fs.set_search_paths(merged.clone());
        merged
    }
}
