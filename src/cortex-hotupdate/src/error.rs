//! Error types for cortex-hotupdate.

use thiserror::Error;

use crate::session::SessionState;

/// Result type for hot-update operations.
pub type HotUpdateResult<T> = std::result::Result<T, HotUpdateError>;

/// Errors that can occur while orchestrating a hot update.
#[derive(Debug, Error)]
pub enum HotUpdateError {
    // Session errors
    #[error("Invalid session transition: {from} -> {to}")]
    InvalidTransition {
        from: SessionState,
        to: SessionState,
    },

    #[error("No update host has been set for this session")]
    NoHost,

    #[error("Retry not permitted in state {state}")]
    RetryNotPermitted { state: SessionState },

    // Engine errors
    #[error("Asset update engine rejected manifest: {message}")]
    ManifestRejected { message: String },

    #[error("Update timed out after {secs}s without a terminal event")]
    WatchdogExpired { secs: u64 },

    // Storage errors
    #[error("No writable directory available")]
    NoWritablePath,

    #[error("Failed to persist {key}: {message}")]
    StoreFailed { key: String, message: String },

    // Config errors
    #[error("Failed to load config: {message}")]
    ConfigError { message: String },

    // File system errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl HotUpdateError {
    /// Check if the failed operation may be attempted again.
    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            Self::WatchdogExpired { .. } | Self::StoreFailed { .. } | Self::Io(_)
        )
    }
}
