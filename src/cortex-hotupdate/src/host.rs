//! Collaborators supplied by the host application.

use std::path::PathBuf;

use crate::error::HotUpdateResult;

/// Filesystem path resolution used by the running application.
pub trait FileSystem: Send {
    /// Writable root directory, stable for the process lifetime.
    fn writable_path(&self) -> HotUpdateResult<PathBuf>;

    /// Active asset search paths, highest priority first.
    fn search_paths(&self) -> Vec<String>;

    /// Replace the active asset search paths.
    fn set_search_paths(&mut self, paths: Vec<String>);
}

/// Durable key-value storage that survives restarts.
pub trait KeyValueStore: Send {
    fn get_item(&self, key: &str) -> HotUpdateResult<Option<String>>;

    fn set_item(&mut self, key: &str, value: &str) -> HotUpdateResult<()>;
}

/// Callbacks into the host application.
pub trait HostApplication: Send + Sync {
    /// Display progress in `[0, 1]`.
    fn on_progress(&self, fraction: f64);

    /// A check reached a terminal outcome.
    fn on_update_complete(&self, requires_restart: bool);

    /// Continue into the application's main entry point with current assets.
    fn launch_main(&self);

    /// Restart the application so updated assets take effect.
    fn restart(&self);
}
