//! Classification of engine events.
//!
//! [`interpret`] is a pure mapping from one [`UpdateEvent`] to a [`Verdict`].
//! It keeps no state between events; the session and the orchestrator act on
//! the `failed` and `needs_restart` flags.

use tracing::{debug, info, warn};

use crate::event::{EventCode, UpdateEvent};

/// What a single engine event means for the update attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum Classification {
    /// Files are being downloaded. `None` when the total is unknown.
    Progress(Option<f64>),
    /// Informational event with no effect on the attempt
    Ignored,
    /// Local and remote bundles already match
    UpToDate,
    /// New bundle downloaded and applied on disk
    Finished,
    /// Engine-level failure; the attempt may be retried
    FailedRetryable,
    /// Unrecoverable failure for this attempt
    FatalFailure(FatalReason),
}

/// Cause of a fatal failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FatalReason {
    NoLocalManifest,
    ManifestDownload,
    ManifestParse,
    AssetUpdate { asset_id: String },
    Decompress,
}

/// Classification plus the two decisions derived from it.
#[derive(Debug, Clone, PartialEq)]
pub struct Verdict {
    pub classification: Classification,
    pub failed: bool,
    pub needs_restart: bool,
}

impl Verdict {
    fn continuing(classification: Classification) -> Self {
        Self {
            classification,
            failed: false,
            needs_restart: false,
        }
    }

    fn failure(classification: Classification) -> Self {
        Self {
            classification,
            failed: true,
            needs_restart: false,
        }
    }

    fn success(classification: Classification) -> Self {
        Self {
            classification,
            failed: false,
            needs_restart: true,
        }
    }

    /// Whether this verdict ends the attempt.
    pub fn is_terminal(&self) -> bool {
        self.failed || self.needs_restart
    }

    /// Whether the failure offers a retry.
    pub fn is_retryable(&self) -> bool {
        self.classification == Classification::FailedRetryable
    }

    /// Progress fraction carried by this verdict, if any.
    pub fn progress(&self) -> Option<f64> {
        match self.classification {
            Classification::Progress(fraction) => fraction,
            _ => None,
        }
    }
}

/// Classify one engine event.
pub fn interpret(event: &UpdateEvent) -> Verdict {
    match event.code {
        EventCode::ErrorNoLocalManifest => {
            warn!("No local manifest file found, hot update skipped");
            Verdict::failure(Classification::FatalFailure(FatalReason::NoLocalManifest))
        }
        EventCode::ErrorDownloadManifest => {
            warn!("Failed to download manifest file, hot update skipped");
            Verdict::failure(Classification::FatalFailure(FatalReason::ManifestDownload))
        }
        EventCode::ErrorParseManifest => {
            warn!("Failed to parse manifest file, hot update skipped");
            Verdict::failure(Classification::FatalFailure(FatalReason::ManifestParse))
        }
        EventCode::UpdateProgression => {
            let fraction = event.file_fraction();
            if let Some(msg) = event.message.as_deref() {
                debug!(?fraction, "Update progression: {}", msg);
            }
            Verdict::continuing(Classification::Progress(fraction))
        }
        EventCode::AlreadyUpToDate => {
            info!("Already up to date with the latest remote version");
            Verdict::success(Classification::UpToDate)
        }
        EventCode::UpdateFinished => {
            info!("Update finished. {}", event.message_or_empty());
            Verdict::success(Classification::Finished)
        }
        EventCode::UpdateFailed => {
            warn!("Update failed. {}", event.message_or_empty());
            Verdict::failure(Classification::FailedRetryable)
        }
        EventCode::ErrorUpdating => {
            let asset_id = event.asset_id.clone().unwrap_or_default();
            warn!(
                "Asset update error: {}, {}",
                asset_id,
                event.message_or_empty()
            );
            Verdict::failure(Classification::FatalFailure(FatalReason::AssetUpdate {
                asset_id,
            }))
        }
        EventCode::ErrorDecompress => {
            warn!("Decompression error: {}", event.message_or_empty());
            Verdict::failure(Classification::FatalFailure(FatalReason::Decompress))
        }
        EventCode::NewVersionFound | EventCode::AssetUpdated | EventCode::Other => {
            debug!(
                code = event.code.as_raw(),
                kind = ?event.code,
                "Ignoring engine event"
            );
            Verdict::continuing(Classification::Ignored)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flags(code: EventCode) -> (bool, bool) {
        let verdict = interpret(&UpdateEvent::new(code));
        (verdict.failed, verdict.needs_restart)
    }

    #[test]
    fn test_decision_table() {
        assert_eq!(flags(EventCode::ErrorNoLocalManifest), (true, false));
        assert_eq!(flags(EventCode::ErrorDownloadManifest), (true, false));
        assert_eq!(flags(EventCode::ErrorParseManifest), (true, false));
        assert_eq!(flags(EventCode::UpdateProgression), (false, false));
        assert_eq!(flags(EventCode::AlreadyUpToDate), (false, true));
        assert_eq!(flags(EventCode::UpdateFinished), (false, true));
        assert_eq!(flags(EventCode::UpdateFailed), (true, false));
        assert_eq!(flags(EventCode::ErrorUpdating), (true, false));
        assert_eq!(flags(EventCode::ErrorDecompress), (true, false));
        assert_eq!(flags(EventCode::NewVersionFound), (false, false));
        assert_eq!(flags(EventCode::AssetUpdated), (false, false));
        assert_eq!(flags(EventCode::Other), (false, false));
    }

    #[test]
    fn test_no_local_manifest_is_fatal() {
        let verdict = interpret(&UpdateEvent::new(EventCode::ErrorNoLocalManifest));
        assert_eq!(
            verdict.classification,
            Classification::FatalFailure(FatalReason::NoLocalManifest)
        );
        assert!(!verdict.is_retryable());
        assert!(verdict.is_terminal());
    }

    #[test]
    fn test_update_failed_is_retryable() {
        let verdict = interpret(&UpdateEvent::new(EventCode::UpdateFailed).with_message("timeout"));
        assert_eq!(verdict.classification, Classification::FailedRetryable);
        assert!(verdict.is_retryable());
    }

    #[test]
    fn test_asset_error_keeps_asset_id() {
        let event = UpdateEvent::new(EventCode::ErrorUpdating)
            .with_asset("src/main.js")
            .with_message("md5 mismatch");
        assert_eq!(
            interpret(&event).classification,
            Classification::FatalFailure(FatalReason::AssetUpdate {
                asset_id: "src/main.js".to_string()
            })
        );
    }

    #[test]
    fn test_progress_fraction() {
        let verdict = interpret(&UpdateEvent::progress(3, 4));
        assert_eq!(verdict.progress(), Some(0.75));
        assert!(!verdict.is_terminal());
    }

    #[test]
    fn test_progress_with_zero_total() {
        let verdict = interpret(&UpdateEvent::progress(0, 0));
        assert_eq!(verdict.classification, Classification::Progress(None));
        assert_eq!(verdict.progress(), None);
    }
}
