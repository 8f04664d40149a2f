//! Cosmetic splash progress shown before an update check starts.
//!
//! The ticker is unrelated to real download progress. It fills up at a fixed
//! cadence and, if nothing cancels it first, hands over to the host's main
//! entry point when it reaches 1.0.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::host::HostApplication;

/// Default tick interval.
pub const DEFAULT_SPLASH_TICK: Duration = Duration::from_millis(30);

/// Default increment per tick.
pub const DEFAULT_SPLASH_STEP: f64 = 0.01;

const FULL_EPSILON: f64 = 1e-9;

/// Running splash ticker.
#[derive(Debug)]
pub struct SplashTicker {
    cancel: CancellationToken,
    task: JoinHandle<bool>,
}

impl SplashTicker {
    /// Start ticking. Must be called from within a tokio runtime.
    pub fn spawn(host: Arc<dyn HostApplication>, tick: Duration, step: f64) -> Self {
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let step = if step > 0.0 { step } else { DEFAULT_SPLASH_STEP };

        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(tick);
            // The first tick of an interval completes immediately.
            interval.tick().await;
            let mut ticks: u32 = 0;

            loop {
                tokio::select! {
                    _ = token.cancelled() => {
                        debug!(ticks, "Splash ticker cancelled");
                        return false;
                    }
                    _ = interval.tick() => {
                        ticks += 1;
                        let fraction = ticks as f64 * step;
                        host.on_progress(fraction.min(1.0));
                        if fraction >= 1.0 - FULL_EPSILON {
                            host.launch_main();
                            return true;
                        }
                    }
                }
            }
        });

        Self { cancel, task }
    }

    /// Stop ticking; the host's main entry point is not launched.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Wait for the ticker to end. Returns true if it ran to completion.
    pub async fn finished(self) -> bool {
        self.task.await.unwrap_or(false)
    }
}
