//! Hot updater - main API for update operations.

use std::sync::Arc;

use tokio::time::Instant;
use tracing::{info, warn};

use crate::config::HotUpdateConfig;
use crate::engine::{AssetUpdateEngine, EngineOptions};
use crate::error::{HotUpdateError, HotUpdateResult};
use crate::host::{FileSystem, HostApplication, KeyValueStore};
use crate::interpreter::interpret;
use crate::restart::{RestartHandle, RestartScheduler};
use crate::search_paths::SearchPathMerger;
use crate::session::UpdateSession;
use crate::splash::SplashTicker;
use crate::verify::verify_asset;
use crate::version::compare_versions;

/// Outcome of an update check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// New search paths are committed and a restart is scheduled
    Restarting { search_paths: Vec<String> },
    /// The host continues with its current assets
    ContinueWithCurrent { retryable: bool },
    /// Another check is still in flight
    AlreadyInFlight,
}

/// Drives update sessions against an asset update engine.
pub struct HotUpdater<E, F, S>
where
    E: AssetUpdateEngine,
    F: FileSystem,
    S: KeyValueStore,
{
    config: HotUpdateConfig,
    session: UpdateSession<E>,
    fs: F,
    store: S,
    host: Arc<dyn HostApplication>,
    merger: SearchPathMerger,
    scheduler: RestartScheduler,
    splash: Option<SplashTicker>,
    restart: Option<RestartHandle>,
}

impl<E, F, S> HotUpdater<E, F, S>
where
    E: AssetUpdateEngine,
    F: FileSystem,
    S: KeyValueStore,
{
    /// Create an updater, constructing the engine from the config.
    pub fn new(
        config: HotUpdateConfig,
        fs: F,
        store: S,
        host: Arc<dyn HostApplication>,
    ) -> HotUpdateResult<Self> {
        let storage_path = fs.writable_path()?.join(&config.storage_dir_name);
        let engine = E::create(EngineOptions {
            local_manifest: None,
            storage_path,
            version_compare: compare_versions,
        });
        Self::with_engine(config, engine, fs, store, host)
    }

    /// Create an updater around an existing engine.
    pub fn with_engine(
        config: HotUpdateConfig,
        mut engine: E,
        fs: F,
        store: S,
        host: Arc<dyn HostApplication>,
    ) -> HotUpdateResult<Self> {
        let storage_path = fs.writable_path()?.join(&config.storage_dir_name);
        engine.set_verify_callback(Box::new(verify_asset));

        Ok(Self {
            merger: SearchPathMerger::new(config.search_paths_key.clone()),
            scheduler: RestartScheduler::new(config.restart_delay()),
            session: UpdateSession::new(engine, storage_path),
            config,
            fs,
            store,
            host,
            splash: None,
            restart: None,
        })
    }

    pub fn config(&self) -> &HotUpdateConfig {
        &self.config
    }

    pub fn session(&self) -> &UpdateSession<E> {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut UpdateSession<E> {
        &mut self.session
    }

    pub fn file_system(&self) -> &F {
        &self.fs
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Take the handle of a scheduled restart, if any.
    pub fn take_restart_handle(&mut self) -> Option<RestartHandle> {
        self.restart.take()
    }

    /// Startup policy: restore persisted search paths, start the splash
    /// ticker, and begin checking right away when a host is configured.
    ///
    /// Returns `None` when no check was started; the splash ticker then
    /// launches the main entry point on its own.
    pub async fn run(&mut self) -> HotUpdateResult<Option<UpdateOutcome>> {
        self.restore_search_paths();

        self.splash = Some(SplashTicker::spawn(
            self.host.clone(),
            self.config.splash_tick(),
            self.config.splash_step,
        ));

        if !self.config.should_check_on_startup() {
            info!("Hot update disabled or no host configured");
            return Ok(None);
        }

        let host = self.config.host_url.clone().ok_or(HotUpdateError::NoHost)?;
        self.check_and_update(&host).await.map(Some)
    }

    /// Wait for the splash ticker, if one is running. Returns true when it
    /// ran to completion and launched the main entry point.
    pub async fn wait_splash(&mut self) -> bool {
        match self.splash.take() {
            Some(splash) => splash.finished().await,
            None => false,
        }
    }

    /// Apply persisted search paths from a previous update.
    pub fn restore_search_paths(&mut self) -> Vec<String> {
        self.merger.restore(&mut self.fs, &self.store)
    }

    /// Check `host` for a newer bundle and drive the attempt to a terminal
    /// outcome.
    ///
    /// An engine that refuses to start still hands control to the host's main
    /// entry point.
    pub async fn check_and_update(&mut self, host: &str) -> HotUpdateResult<UpdateOutcome> {
        self.cancel_splash();

        match self.session.start(host) {
            Ok(true) => self.drive().await,
            Ok(false) => Ok(UpdateOutcome::AlreadyInFlight),
            Err(e) => {
                warn!(host, "Hot update could not start: {}", e);
                Ok(self.continue_with_current(e.is_retriable()))
            }
        }
    }

    /// Re-run the last check after a retryable failure.
    pub async fn retry(&mut self) -> HotUpdateResult<UpdateOutcome> {
        if !self.session.can_retry() {
            return Err(HotUpdateError::RetryNotPermitted {
                state: self.session.state(),
            });
        }
        let host = self
            .session
            .host()
            .map(str::to_string)
            .ok_or(HotUpdateError::NoHost)?;
        self.check_and_update(&host).await
    }

    /// Abandon any in-flight attempt and stop the splash ticker.
    pub fn stop(&mut self) {
        self.cancel_splash();
        self.session.stop();
    }

    async fn drive(&mut self) -> HotUpdateResult<UpdateOutcome> {
        let deadline = self.config.watchdog_timeout().map(|t| Instant::now() + t);

        loop {
            let next = match deadline {
                Some(deadline) => {
                    let waited =
                        tokio::time::timeout_at(deadline, self.session.next_event()).await;
                    match waited {
                        Ok(next) => next,
                        Err(_) => {
                            let err = HotUpdateError::WatchdogExpired {
                                secs: self.config.watchdog_timeout_secs.unwrap_or_default(),
                            };
                            warn!("{}", err);
                            self.session.expire()?;
                            return Ok(self.continue_with_current(true));
                        }
                    }
                }
                None => self.session.next_event().await,
            };

            let Some(event) = next else {
                warn!("Engine closed its event stream before a terminal event");
                self.session.expire()?;
                return Ok(self.continue_with_current(true));
            };

            let verdict = interpret(&event);
            if let Some(fraction) = verdict.progress() {
                self.host.on_progress(fraction);
            }
            self.session.apply(&verdict)?;

            if verdict.failed {
                return Ok(self.continue_with_current(verdict.is_retryable()));
            }
            if verdict.needs_restart {
                return Ok(self.commit_and_restart());
            }
        }
    }

    fn commit_and_restart(&mut self) -> UpdateOutcome {
        let new_paths = self.session.engine().local_search_paths();

        match self.merger.commit(&mut self.fs, &mut self.store, &new_paths) {
            Ok(search_paths) => {
                self.host.on_update_complete(true);
                self.restart = self.scheduler.schedule(self.host.clone());
                if self.restart.is_none() {
                    warn!("Restart already scheduled, new search paths apply with it");
                }
                UpdateOutcome::Restarting { search_paths }
            }
            Err(e) => {
                warn!("Failed to commit search paths, keeping current assets: {}", e);
                let retryable = e.is_retriable();
                if let Err(e) = self.session.fail(retryable) {
                    warn!("{}", e);
                }
                self.continue_with_current(retryable)
            }
        }
    }

    fn continue_with_current(&mut self, retryable: bool) -> UpdateOutcome {
        self.host.on_update_complete(false);
        self.host.launch_main();
        UpdateOutcome::ContinueWithCurrent { retryable }
    }

    fn cancel_splash(&mut self) {
        if let Some(splash) = self.splash.take() {
            splash.cancel();
        }
    }
}
