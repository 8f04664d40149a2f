//! Lifecycle of one update attempt.
//!
//! ```text
//!   Idle ──start──▶ Checking ──update()──▶ Updating ──┬──▶ Succeeded
//!    ▲                 │                               ├──▶ FailedRetryable
//!    │                 │                               └──▶ FailedFatal
//!    └──────stop───────┴───────────────stop / reset─────────────┘
//! ```
//!
//! A manifest the engine refuses fails the attempt straight from `Checking`,
//! and a commit that cannot be persisted turns `Succeeded` into a failure.
//!
//! At most one attempt is in flight: `start` while `Updating` is a no-op.

use std::fmt;
use std::path::{Path, PathBuf};

use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::engine::{AssetUpdateEngine, EventReceiver};
use crate::error::{HotUpdateError, HotUpdateResult};
use crate::event::UpdateEvent;
use crate::interpreter::Verdict;
use crate::manifest::Manifest;

/// State of an [`UpdateSession`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Idle,
    Checking,
    Updating,
    Succeeded,
    FailedRetryable,
    FailedFatal,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Checking => "checking",
            Self::Updating => "updating",
            Self::Succeeded => "succeeded",
            Self::FailedRetryable => "failed_retryable",
            Self::FailedFatal => "failed_fatal",
        }
    }

    /// Whether the attempt has ended.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Succeeded | Self::FailedRetryable | Self::FailedFatal
        )
    }

    /// Whether `self -> to` is a legal transition.
    pub fn can_transition_to(&self, to: SessionState) -> bool {
        use SessionState::*;
        matches!(
            (self, to),
            (Idle, Checking)
                | (Checking, Updating)
                | (Checking, Idle)
                | (Checking, FailedRetryable)
                | (Checking, FailedFatal)
                | (Updating, Succeeded)
                | (Updating, FailedRetryable)
                | (Updating, FailedFatal)
                | (Updating, Idle)
                | (Succeeded, Idle)
                | (Succeeded, FailedRetryable)
                | (Succeeded, FailedFatal)
                | (FailedRetryable, Idle)
                | (FailedFatal, Idle)
        )
    }

    /// Move to `to`, rejecting illegal transitions.
    pub fn transition(self, to: SessionState) -> HotUpdateResult<SessionState> {
        if self == to || self.can_transition_to(to) {
            Ok(to)
        } else {
            Err(HotUpdateError::InvalidTransition { from: self, to })
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One update attempt against an asset update engine.
pub struct UpdateSession<E: AssetUpdateEngine> {
    engine: E,
    storage_path: PathBuf,
    host: Option<String>,
    state: SessionState,
    can_retry: bool,
    events: Option<EventReceiver>,
}

impl<E: AssetUpdateEngine> UpdateSession<E> {
    /// Create an idle session.
    pub fn new(engine: E, storage_path: impl Into<PathBuf>) -> Self {
        Self {
            engine,
            storage_path: storage_path.into(),
            host: None,
            state: SessionState::Idle,
            can_retry: false,
            events: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Whether an attempt is in flight.
    pub fn is_updating(&self) -> bool {
        self.state == SessionState::Updating
    }

    /// Whether the last attempt ended in a retryable failure.
    pub fn can_retry(&self) -> bool {
        self.can_retry
    }

    pub fn host(&self) -> Option<&str> {
        self.host.as_deref()
    }

    pub fn storage_path(&self) -> &Path {
        &self.storage_path
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    /// Start an attempt against `host`.
    ///
    /// Returns `Ok(false)` without touching anything when an attempt is
    /// already in flight.
    pub fn start(&mut self, host: &str) -> HotUpdateResult<bool> {
        if self.is_updating() {
            debug!(host, "Update already in flight, ignoring start");
            return Ok(false);
        }

        if self.state.is_terminal() {
            self.set_state(SessionState::Idle)?;
        }
        self.set_state(SessionState::Checking)?;
        self.host = Some(host.to_string());
        self.can_retry = false;

        let (tx, rx) = mpsc::unbounded_channel();
        self.engine.set_event_sender(Some(tx));
        self.events = Some(rx);

        let manifest = Manifest::for_host(host);
        if let Err(e) = self
            .engine
            .load_local_manifest(&manifest, &self.storage_path)
        {
            self.fail(e.is_retriable())?;
            return Err(e);
        }

        // Engines may emit synchronously from update(); the receiver buffers them.
        self.set_state(SessionState::Updating)?;
        info!(host, storage = %self.storage_path.display(), "Starting hot update");
        self.engine.update();

        Ok(true)
    }

    /// Restart the last attempt after a retryable failure.
    pub fn retry(&mut self) -> HotUpdateResult<bool> {
        if !self.can_retry {
            return Err(HotUpdateError::RetryNotPermitted { state: self.state });
        }
        let host = self.host.clone().ok_or(HotUpdateError::NoHost)?;
        self.start(&host)
    }

    /// Detach from the engine and return to `Idle`.
    pub fn stop(&mut self) {
        self.detach();
        if self.state != SessionState::Idle {
            debug!(from = %self.state, "Stopping update session");
        }
        self.state = SessionState::Idle;
    }

    /// Wait for the next engine event.
    ///
    /// Returns `None` once the session is detached or the engine dropped its
    /// sender.
    pub async fn next_event(&mut self) -> Option<UpdateEvent> {
        self.events.as_mut()?.recv().await
    }

    /// Apply a verdict to the session state.
    ///
    /// Terminal verdicts detach the event channel. Verdicts arriving while no
    /// attempt is in flight are ignored.
    pub fn apply(&mut self, verdict: &Verdict) -> HotUpdateResult<SessionState> {
        if !self.is_updating() {
            debug!(state = %self.state, "Ignoring verdict outside of an update");
            return Ok(self.state);
        }

        if verdict.failed {
            self.fail(verdict.is_retryable())?;
        } else if verdict.needs_restart {
            self.set_state(SessionState::Succeeded)?;
            self.detach();
        }

        Ok(self.state)
    }

    /// End an in-flight attempt that never reached a terminal event.
    pub fn expire(&mut self) -> HotUpdateResult<()> {
        if self.is_updating() {
            self.fail(true)?;
        }
        Ok(())
    }

    /// End the attempt as failed and detach from the engine.
    ///
    /// Also valid after `Succeeded`, for when the result could not be
    /// committed.
    pub fn fail(&mut self, retryable: bool) -> HotUpdateResult<()> {
        if retryable {
            self.set_state(SessionState::FailedRetryable)?;
        } else {
            self.set_state(SessionState::FailedFatal)?;
        }
        self.can_retry = retryable;
        self.detach();
        Ok(())
    }

    fn detach(&mut self) {
        self.engine.set_event_sender(None);
        self.events = None;
    }

    fn set_state(&mut self, to: SessionState) -> HotUpdateResult<()> {
        self.state = self.state.transition(to)?;
        Ok(())
    }
}

impl<E: AssetUpdateEngine> Drop for UpdateSession<E> {
    fn drop(&mut self) {
        self.detach();
    }
}
