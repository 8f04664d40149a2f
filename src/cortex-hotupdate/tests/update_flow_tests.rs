//! End-to-end tests for the hot update flow: start → events → commit → restart.

use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use pretty_assertions::assert_eq;
use tempfile::TempDir;

use cortex_hotupdate::{
    AssetUpdateEngine, EngineOptions, EventCode, FileSystem, HostApplication, HotUpdateConfig,
    HotUpdateError, HotUpdateResult, HotUpdater, JsonFileStore, KeyValueStore, LocalFileSystem,
    SEARCH_PATHS_KEY, ScriptedEngine, SessionState, UpdateEvent, UpdateOutcome,
};

// =============================================================================
// Recording host
// =============================================================================

#[derive(Default)]
struct RecordingHost {
    progress: Mutex<Vec<f64>>,
    completions: Mutex<Vec<bool>>,
    launches: Mutex<u32>,
    restarts: Mutex<u32>,
}

impl RecordingHost {
    fn progress(&self) -> Vec<f64> {
        self.progress.lock().unwrap().clone()
    }

    fn completions(&self) -> Vec<bool> {
        self.completions.lock().unwrap().clone()
    }

    fn launches(&self) -> u32 {
        *self.launches.lock().unwrap()
    }

    fn restarts(&self) -> u32 {
        *self.restarts.lock().unwrap()
    }
}

impl HostApplication for RecordingHost {
    fn on_progress(&self, fraction: f64) {
        self.progress.lock().unwrap().push(fraction);
    }

    fn on_update_complete(&self, requires_restart: bool) {
        self.completions.lock().unwrap().push(requires_restart);
    }

    fn launch_main(&self) {
        *self.launches.lock().unwrap() += 1;
    }

    fn restart(&self) {
        *self.restarts.lock().unwrap() += 1;
    }
}

/// Store whose writes always fail, as on a full disk.
struct ReadOnlyStore;

impl KeyValueStore for ReadOnlyStore {
    fn get_item(&self, _key: &str) -> HotUpdateResult<Option<String>> {
        Ok(None)
    }

    fn set_item(&mut self, key: &str, _value: &str) -> HotUpdateResult<()> {
        Err(HotUpdateError::StoreFailed {
            key: key.to_string(),
            message: "No space left on device".to_string(),
        })
    }
}

type TestUpdater = HotUpdater<ScriptedEngine, LocalFileSystem, JsonFileStore>;

struct Fixture {
    dir: TempDir,
    host: Arc<RecordingHost>,
}

impl Fixture {
    fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
            host: Arc::new(RecordingHost::default()),
        }
    }

    fn file_system(&self) -> LocalFileSystem {
        LocalFileSystem::new(self.dir.path()).with_search_paths(vec!["/builtin/".to_string()])
    }

    fn updater(&self, config: HotUpdateConfig, engine: ScriptedEngine) -> TestUpdater {
        let store = JsonFileStore::open(self.dir.path().join("local-storage.json")).unwrap();
        HotUpdater::with_engine(config, engine, self.file_system(), store, self.host.clone())
            .unwrap()
    }

    fn engine(&self, script: Vec<UpdateEvent>) -> ScriptedEngine {
        ScriptedEngine::create(EngineOptions::new(self.dir.path().join("remote-assets")))
            .with_script(script)
            .with_remote_search_paths(vec!["/data/remote-assets/".to_string()])
    }
}

// =============================================================================
// Success paths
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_progress_then_finished_restarts_once() {
    let fx = Fixture::new();
    let engine = fx.engine(vec![
        UpdateEvent::progress(1, 2),
        UpdateEvent::new(EventCode::UpdateFinished).with_message("2 files"),
    ]);
    let mut updater = fx.updater(HotUpdateConfig::default(), engine);

    let outcome = updater
        .check_and_update("https://cdn.example.com/remote-assets/")
        .await
        .unwrap();

    let expected = vec!["/data/remote-assets/".to_string(), "/builtin/".to_string()];
    assert_eq!(
        outcome,
        UpdateOutcome::Restarting {
            search_paths: expected.clone()
        }
    );
    assert!(!updater.session().is_updating());
    assert_eq!(updater.session().state(), SessionState::Succeeded);
    assert!(!updater.session().engine().is_attached());
    assert_eq!(updater.file_system().search_paths(), expected);

    let persisted = updater.store().get_item(SEARCH_PATHS_KEY).unwrap().unwrap();
    let persisted: Vec<String> = serde_json::from_str(&persisted).unwrap();
    assert_eq!(persisted, expected);

    assert_eq!(fx.host.progress(), vec![0.5]);
    assert_eq!(fx.host.completions(), vec![true]);
    assert_eq!(fx.host.launches(), 0);

    // Not yet: the restart waits for the configured delay.
    assert_eq!(fx.host.restarts(), 0);
    updater.take_restart_handle().unwrap().wait().await;
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(fx.host.restarts(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_already_up_to_date_also_restarts() {
    let fx = Fixture::new();
    let engine = fx
        .engine(vec![UpdateEvent::new(EventCode::AlreadyUpToDate)])
        .with_remote_version("1.0.3");
    let mut updater = fx.updater(HotUpdateConfig::default(), engine);

    let outcome = updater.check_and_update("http://h").await.unwrap();

    assert!(matches!(outcome, UpdateOutcome::Restarting { .. }));
    assert_eq!(fx.host.completions(), vec![true]);
}

#[tokio::test]
async fn test_progress_is_monotonic() {
    let fx = Fixture::new();
    let mut script: Vec<UpdateEvent> = (1..=8).map(|i| UpdateEvent::progress(i, 8)).collect();
    script.push(UpdateEvent::new(EventCode::UpdateFinished));
    let mut updater = fx.updater(HotUpdateConfig::default(), fx.engine(script));

    updater.check_and_update("http://h").await.unwrap();

    let progress = fx.host.progress();
    assert_eq!(progress.len(), 8);
    assert!(progress.windows(2).all(|w| w[0] <= w[1]));
    assert!(progress.iter().all(|p| (0.0..=1.0).contains(p)));
    assert_eq!(progress.last().copied(), Some(1.0));
}

#[tokio::test]
async fn test_manifest_points_at_host() {
    let fx = Fixture::new();
    let mut updater = fx.updater(
        HotUpdateConfig::default(),
        fx.engine(vec![UpdateEvent::new(EventCode::UpdateFinished)]),
    );

    updater
        .check_and_update("https://cdn.example.com/v1")
        .await
        .unwrap();

    let manifest = updater.session().engine().loaded_manifest().unwrap();
    assert_eq!(manifest.package_url, "https://cdn.example.com/v1/");
    assert_eq!(
        manifest.remote_manifest_url,
        "https://cdn.example.com/v1/project.manifest"
    );
    assert_eq!(manifest.version, "0.0.0");
    assert_eq!(
        updater.session().storage_path(),
        fx.dir.path().join("remote-assets")
    );
}

// =============================================================================
// Failure paths
// =============================================================================

#[tokio::test]
async fn test_update_failed_allows_retry() {
    let fx = Fixture::new();
    let mut updater = fx.updater(
        HotUpdateConfig::default(),
        fx.engine(vec![
            UpdateEvent::progress(1, 3),
            UpdateEvent::new(EventCode::UpdateFailed).with_message("2 assets failed"),
        ]),
    );

    let outcome = updater.check_and_update("http://h").await.unwrap();

    assert_eq!(outcome, UpdateOutcome::ContinueWithCurrent { retryable: true });
    assert!(updater.session().can_retry());
    assert!(!updater.session().is_updating());
    assert_eq!(fx.host.launches(), 1);
    assert_eq!(fx.host.completions(), vec![false]);
    assert!(updater.store().get_item(SEARCH_PATHS_KEY).unwrap().is_none());

    updater
        .session_mut()
        .engine_mut()
        .set_script(vec![UpdateEvent::new(EventCode::UpdateFinished)]);
    let outcome = updater.retry().await.unwrap();

    assert!(matches!(outcome, UpdateOutcome::Restarting { .. }));
    assert_eq!(updater.session().engine().attach_count(), 2);
    assert_eq!(fx.host.completions(), vec![false, true]);
}

#[tokio::test]
async fn test_fatal_failures_continue_without_retry() {
    for code in [
        EventCode::ErrorNoLocalManifest,
        EventCode::ErrorDownloadManifest,
        EventCode::ErrorParseManifest,
        EventCode::ErrorUpdating,
        EventCode::ErrorDecompress,
    ] {
        let fx = Fixture::new();
        let mut updater = fx.updater(
            HotUpdateConfig::default(),
            fx.engine(vec![UpdateEvent::new(code)]),
        );

        let outcome = updater.check_and_update("http://h").await.unwrap();

        assert_eq!(
            outcome,
            UpdateOutcome::ContinueWithCurrent { retryable: false },
            "{code:?}"
        );
        assert_eq!(updater.session().state(), SessionState::FailedFatal);
        assert!(!updater.session().can_retry());
        assert_eq!(fx.host.launches(), 1);
        assert_eq!(
            updater.file_system().search_paths(),
            vec!["/builtin/".to_string()]
        );
    }
}

#[tokio::test]
async fn test_rejected_manifest_continues_with_current() {
    let fx = Fixture::new();
    let mut updater = fx.updater(
        HotUpdateConfig::default(),
        fx.engine(vec![UpdateEvent::new(EventCode::UpdateFinished)]),
    );

    let outcome = updater.check_and_update("cdn.example.com/assets").await.unwrap();

    assert_eq!(outcome, UpdateOutcome::ContinueWithCurrent { retryable: false });
    assert_eq!(updater.session().state(), SessionState::FailedFatal);
    assert!(!updater.session().engine().is_attached());
    assert_eq!(updater.session().engine().update_count(), 0);
    assert_eq!(fx.host.completions(), vec![false]);
    assert_eq!(fx.host.launches(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_rejected_manifest_at_startup_still_launches_main() {
    let fx = Fixture::new();
    let config = HotUpdateConfig::default().with_host("cdn.example.com/assets");
    let mut updater = fx.updater(config, fx.engine(Vec::new()));

    let outcome = updater.run().await.unwrap();

    assert_eq!(
        outcome,
        Some(UpdateOutcome::ContinueWithCurrent { retryable: false })
    );
    assert!(!updater.wait_splash().await);
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(fx.host.launches(), 1);
}

#[tokio::test]
async fn test_failed_commit_ends_attempt_as_retryable() {
    let fx = Fixture::new();
    let mut updater = HotUpdater::with_engine(
        HotUpdateConfig::default(),
        fx.engine(vec![UpdateEvent::new(EventCode::UpdateFinished)]),
        fx.file_system(),
        ReadOnlyStore,
        fx.host.clone(),
    )
    .unwrap();

    let outcome = updater.check_and_update("http://h").await.unwrap();

    assert_eq!(outcome, UpdateOutcome::ContinueWithCurrent { retryable: true });
    assert_eq!(updater.session().state(), SessionState::FailedRetryable);
    assert!(updater.session().can_retry());
    assert!(updater.take_restart_handle().is_none());
    assert_eq!(
        updater.file_system().search_paths(),
        vec!["/builtin/".to_string()]
    );
    assert_eq!(fx.host.completions(), vec![false]);
    assert_eq!(fx.host.launches(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_watchdog_ends_stalled_attempt() {
    let fx = Fixture::new();
    let config = HotUpdateConfig::default().watchdog(Duration::from_secs(30));
    let mut updater = fx.updater(config, fx.engine(vec![UpdateEvent::progress(1, 4)]));

    let outcome = updater.check_and_update("http://h").await.unwrap();

    assert_eq!(outcome, UpdateOutcome::ContinueWithCurrent { retryable: true });
    assert_eq!(updater.session().state(), SessionState::FailedRetryable);
    assert!(!updater.session().engine().is_attached());
    assert_eq!(fx.host.progress(), vec![0.25]);
    assert_eq!(fx.host.launches(), 1);
}

// =============================================================================
// Startup policy
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_run_without_host_lets_splash_finish() {
    let fx = Fixture::new();
    let mut updater = fx.updater(HotUpdateConfig::default(), fx.engine(Vec::new()));

    assert_eq!(updater.run().await.unwrap(), None);
    assert!(updater.wait_splash().await);

    assert_eq!(fx.host.launches(), 1);
    assert_eq!(fx.host.progress().len(), 100);
    assert_eq!(updater.session().engine().update_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_run_with_host_cancels_splash() {
    let fx = Fixture::new();
    let config = HotUpdateConfig::default().with_host("https://cdn.example.com/remote-assets/");
    let mut updater = fx.updater(
        config,
        fx.engine(vec![UpdateEvent::new(EventCode::UpdateFinished)]),
    );

    let outcome = updater.run().await.unwrap();

    assert!(matches!(outcome, Some(UpdateOutcome::Restarting { .. })));
    assert!(!updater.wait_splash().await);
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(fx.host.launches(), 0);
    assert_eq!(fx.host.restarts(), 1);
}

#[tokio::test]
async fn test_run_restores_persisted_paths() {
    let fx = Fixture::new();
    {
        let mut store = JsonFileStore::open(fx.dir.path().join("local-storage.json")).unwrap();
        store
            .set_item(SEARCH_PATHS_KEY, r#"["/data/remote-assets/","/builtin/"]"#)
            .unwrap();
    }
    let mut updater = fx.updater(HotUpdateConfig::default().enabled(false), fx.engine(Vec::new()));

    updater.run().await.unwrap();
    updater.stop();

    assert_eq!(
        updater.file_system().search_paths(),
        vec!["/data/remote-assets/".to_string(), "/builtin/".to_string()]
    );
}
