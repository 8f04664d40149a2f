//! Events emitted by the asset update engine.

use serde::{Deserialize, Serialize};

/// Event codes of the asset update engine.
///
/// Discriminants match the engine's raw integer codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventCode {
    ErrorNoLocalManifest = 0,
    ErrorDownloadManifest = 1,
    ErrorParseManifest = 2,
    NewVersionFound = 3,
    AlreadyUpToDate = 4,
    UpdateProgression = 5,
    AssetUpdated = 6,
    ErrorUpdating = 7,
    UpdateFinished = 8,
    UpdateFailed = 9,
    ErrorDecompress = 10,
    /// Any code this crate does not know about
    #[serde(other)]
    Other = -1,
}

impl EventCode {
    /// Raw engine code.
    pub fn as_raw(&self) -> i32 {
        *self as i32
    }
}

/// One event from the engine's stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateEvent {
    pub code: EventCode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub downloaded_files: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_files: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset_id: Option<String>,
}

impl UpdateEvent {
    /// Create an event with no payload.
    pub fn new(code: EventCode) -> Self {
        Self {
            code,
            downloaded_files: None,
            total_files: None,
            message: None,
            asset_id: None,
        }
    }

    /// Create a progress event.
    pub fn progress(downloaded_files: u32, total_files: u32) -> Self {
        Self {
            downloaded_files: Some(downloaded_files),
            total_files: Some(total_files),
            ..Self::new(EventCode::UpdateProgression)
        }
    }

    /// Attach a message.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Attach an asset id.
    pub fn with_asset(mut self, asset_id: impl Into<String>) -> Self {
        self.asset_id = Some(asset_id.into());
        self
    }

    /// Fraction of files downloaded, if it can be computed.
    pub fn file_fraction(&self) -> Option<f64> {
        match (self.downloaded_files, self.total_files) {
            (Some(_), Some(0)) | (None, _) | (_, None) => None,
            (Some(done), Some(total)) => Some((done as f64 / total as f64).clamp(0.0, 1.0)),
        }
    }

    /// Message text or an empty string.
    pub fn message_or_empty(&self) -> &str {
        self.message.as_deref().unwrap_or("")
    }
}
