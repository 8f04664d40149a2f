//! Deferred restart once new search paths are committed.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::info;

use crate::host::HostApplication;

/// Default delay between committing search paths and restarting.
pub const DEFAULT_RESTART_DELAY: Duration = Duration::from_millis(500);

/// Schedules the host restart, at most once per scheduler.
#[derive(Debug, Clone)]
pub struct RestartScheduler {
    delay: Duration,
    scheduled: Arc<AtomicBool>,
}

impl Default for RestartScheduler {
    fn default() -> Self {
        Self::new(DEFAULT_RESTART_DELAY)
    }
}

impl RestartScheduler {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            scheduled: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Whether a restart has already been scheduled.
    pub fn is_scheduled(&self) -> bool {
        self.scheduled.load(Ordering::SeqCst)
    }

    /// Restart the host after the configured delay.
    ///
    /// Returns `None` if a restart is already pending or has fired. A cancelled
    /// restart can be scheduled again. Must be called from within a tokio
    /// runtime.
    pub fn schedule(&self, host: Arc<dyn HostApplication>) -> Option<RestartHandle> {
        if self.scheduled.swap(true, Ordering::SeqCst) {
            return None;
        }

        let delay = self.delay;
        info!(delay_ms = delay.as_millis() as u64, "Scheduling restart");
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            info!("Restarting to apply hot update");
            host.restart();
        });

        Some(RestartHandle {
            task,
            scheduled: self.scheduled.clone(),
        })
    }
}

/// Handle to a scheduled restart.
#[derive(Debug)]
pub struct RestartHandle {
    task: JoinHandle<()>,
    scheduled: Arc<AtomicBool>,
}

impl RestartHandle {
    /// Cancel the restart if it has not fired yet, re-arming the scheduler.
    pub fn cancel(self) {
        self.task.abort();
        if !self.task.is_finished() {
            self.scheduled.store(false, Ordering::SeqCst);
        }
    }

    /// Wait until the restart has fired (or was cancelled).
    pub async fn wait(self) {
        let _ = self.task.await;
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[derive(Default)]
    struct CountingHost {
        restarts: AtomicUsize,
    }

    impl HostApplication for CountingHost {
        fn on_progress(&self, _fraction: f64) {}
        fn on_update_complete(&self, _requires_restart: bool) {}
        fn launch_main(&self) {}
        fn restart(&self) {
            self.restarts.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_fires_after_delay() {
        let host = Arc::new(CountingHost::default());
        let scheduler = RestartScheduler::default();

        let handle = scheduler.schedule(host.clone()).unwrap();
        tokio::time::sleep(Duration::from_millis(499)).await;
        assert_eq!(host.restarts.load(Ordering::SeqCst), 0);

        handle.wait().await;
        assert_eq!(host.restarts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_scheduled_once() {
        let host = Arc::new(CountingHost::default());
        let scheduler = RestartScheduler::new(Duration::from_millis(10));

        let handle = scheduler.schedule(host.clone()).unwrap();
        assert!(scheduler.schedule(host.clone()).is_none());
        assert!(scheduler.is_scheduled());

        handle.wait().await;
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(host.restarts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_restart_never_fires() {
        let host = Arc::new(CountingHost::default());
        let scheduler = RestartScheduler::default();

        scheduler.schedule(host.clone()).unwrap().cancel();
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(host.restarts.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_allows_reschedule() {
        let host = Arc::new(CountingHost::default());
        let scheduler = RestartScheduler::default();

        scheduler.schedule(host.clone()).unwrap().cancel();
        assert!(!scheduler.is_scheduled());

        let handle = scheduler.schedule(host.clone()).unwrap();
        handle.wait().await;
        assert_eq!(host.restarts.load(Ordering::SeqCst), 1);
        assert!(scheduler.schedule(host.clone()).is_none());
    }
}
