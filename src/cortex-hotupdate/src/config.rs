//! Hot-update configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{HotUpdateError, HotUpdateResult};
use crate::search_paths::SEARCH_PATHS_KEY;

/// Directory name for downloaded assets under the writable path.
pub const DEFAULT_STORAGE_DIR: &str = "remote-assets";

/// User configuration for hot updates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HotUpdateConfig {
    /// Check for updates at startup
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Remote asset host (e.g. "https://cdn.example.com/remote-assets/")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host_url: Option<String>,

    /// Directory under the writable path where assets are stored
    #[serde(default = "default_storage_dir")]
    pub storage_dir_name: String,

    /// Storage key for persisted search paths
    #[serde(default = "default_search_paths_key")]
    pub search_paths_key: String,

    /// Delay before restarting after a successful update (default: 500)
    #[serde(default = "default_restart_delay_ms")]
    pub restart_delay_ms: u64,

    /// Abandon an attempt that emits no terminal event within this many seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub watchdog_timeout_secs: Option<u64>,

    /// Splash ticker interval (default: 30)
    #[serde(default = "default_splash_tick_ms")]
    pub splash_tick_ms: u64,

    /// Splash ticker increment per tick (default: 0.01)
    #[serde(default = "default_splash_step")]
    pub splash_step: f64,
}

fn default_true() -> bool {
    true
}

fn default_storage_dir() -> String {
    DEFAULT_STORAGE_DIR.to_string()
}

fn default_search_paths_key() -> String {
    SEARCH_PATHS_KEY.to_string()
}

fn default_restart_delay_ms() -> u64 {
    500
}

fn default_splash_tick_ms() -> u64 {
    30
}

fn default_splash_step() -> f64 {
    0.01
}

impl Default for HotUpdateConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            host_url: None,
            storage_dir_name: default_storage_dir(),
            search_paths_key: default_search_paths_key(),
            restart_delay_ms: default_restart_delay_ms(),
            watchdog_timeout_secs: None,
            splash_tick_ms: default_splash_tick_ms(),
            splash_step: default_splash_step(),
        }
    }
}

impl HotUpdateConfig {
    /// Standard config location (~/.cortex/hotupdate.json).
    pub fn config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(".cortex").join("hotupdate.json"))
    }

    /// Load config from the standard location, falling back to defaults.
    pub fn load() -> Self {
        let config = Self::config_path()
            .filter(|p| p.exists())
            .and_then(|path| match Self::load_from(&path) {
                Ok(config) => Some(config),
                Err(e) => {
                    tracing::warn!("Ignoring {}: {}", path.display(), e);
                    None
                }
            });

        config.unwrap_or_default()
    }

    /// Load config from a specific file.
    pub fn load_from(path: &Path) -> HotUpdateResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| HotUpdateError::ConfigError {
            message: format!("{}: {}", path.display(), e),
        })?;
        serde_json::from_str(&content).map_err(|e| HotUpdateError::ConfigError {
            message: format!("{}: {}", path.display(), e),
        })
    }

    /// Save config to the standard location.
    pub fn save(&self) -> HotUpdateResult<()> {
        let path = Self::config_path().ok_or_else(|| HotUpdateError::ConfigError {
            message: "No home directory".to_string(),
        })?;
        self.save_to(&path)
    }

    /// Save config to a specific file.
    pub fn save_to(&self, path: &Path) -> HotUpdateResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Whether a check should run at startup.
    pub fn should_check_on_startup(&self) -> bool {
        self.enabled && self.host_url.as_deref().is_some_and(|h| !h.trim().is_empty())
    }

    pub fn restart_delay(&self) -> Duration {
        Duration::from_millis(self.restart_delay_ms)
    }

    pub fn watchdog_timeout(&self) -> Option<Duration> {
        self.watchdog_timeout_secs.map(Duration::from_secs)
    }

    pub fn splash_tick(&self) -> Duration {
        Duration::from_millis(self.splash_tick_ms)
    }

    /// Builder: set the remote host.
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host_url = Some(host.into());
        self
    }

    /// Builder: set enabled.
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Builder: set the restart delay.
    pub fn restart_delay_duration(mut self, delay: Duration) -> Self {
        self.restart_delay_ms = delay.as_millis() as u64;
        self
    }

    /// Builder: set the watchdog timeout.
    pub fn watchdog(mut self, timeout: Duration) -> Self {
        self.watchdog_timeout_secs = Some(timeout.as_secs());
        self
    }
}
