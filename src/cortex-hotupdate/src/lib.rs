//! Cortex HotUpdate - hot-update orchestration for remote asset bundles
//!
//! Drives an external asset update engine through one update attempt:
//! - Builds the local manifest the engine compares the remote bundle against
//! - Classifies the engine's event stream into progress, success and failure
//! - Commits the new bundle's search paths and schedules a restart
//! - Falls back to the current assets on any failure
//!
//! # Example
//!
//! ```rust,ignore
//! use cortex_hotupdate::{HotUpdateConfig, HotUpdater, UpdateOutcome};
//!
//! let mut updater: HotUpdater<MyEngine, _, _> =
//!     HotUpdater::new(HotUpdateConfig::load(), fs, store, host)?;
//!
//! match updater.check_and_update("https://cdn.example.com/remote-assets/").await? {
//!     UpdateOutcome::Restarting { .. } => { /* restart fires after the delay */ }
//!     UpdateOutcome::ContinueWithCurrent { retryable } => { /* main scene loaded */ }
//!     UpdateOutcome::AlreadyInFlight => {}
//! }
//! ```

mod config;
mod engine;
mod error;
mod event;
mod host;
mod interpreter;
mod manifest;
mod restart;
mod search_paths;
mod session;
mod splash;
mod store;
mod updater;
mod verify;
mod version;

pub use config::{DEFAULT_STORAGE_DIR, HotUpdateConfig};
pub use engine::{
    AssetUpdateEngine, EngineOptions, EventReceiver, EventSender, ScriptedEngine, VerifyCallback,
};
pub use error::{HotUpdateError, HotUpdateResult};
pub use event::{EventCode, UpdateEvent};
pub use host::{FileSystem, HostApplication, KeyValueStore};
pub use interpreter::{Classification, FatalReason, Verdict, interpret};
pub use manifest::{
    AssetMeta, LOCAL_VERSION_BASELINE, Manifest, PROJECT_MANIFEST_FILE, VERSION_MANIFEST_FILE,
};
pub use restart::{DEFAULT_RESTART_DELAY, RestartHandle, RestartScheduler};
pub use search_paths::{SEARCH_PATHS_KEY, SearchPathMerger, merge_search_paths};
pub use session::{SessionState, UpdateSession};
pub use splash::{DEFAULT_SPLASH_STEP, DEFAULT_SPLASH_TICK, SplashTicker};
pub use store::{JsonFileStore, LocalFileSystem};
pub use updater::{HotUpdater, UpdateOutcome};
pub use verify::verify_asset;
pub use version::{VersionCompareFn, VersionComparison, classify, compare_versions, is_newer};
