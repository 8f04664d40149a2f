//! Replay and restore commands.
//!
//! `replay` drives a real [`HotUpdater`] with a [`ScriptedEngine`] fed from a
//! JSON array of events, so the state machine, persistence and restart
//! scheduling can be checked without an asset server.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;

use cortex_hotupdate::{
    AssetUpdateEngine, EngineOptions, FileSystem, HostApplication, HotUpdateConfig, HotUpdater,
    JsonFileStore, LocalFileSystem, ScriptedEngine, SearchPathMerger, UpdateEvent, UpdateOutcome,
};

/// File under the state directory holding the key-value store.
const STORE_FILE: &str = "local-storage.json";

/// Host that reports to the terminal.
struct ConsoleHost;

impl HostApplication for ConsoleHost {
    fn on_progress(&self, fraction: f64) {
        println!("Update {}%", (fraction * 100.0).round() as u32);
    }

    fn on_update_complete(&self, requires_restart: bool) {
        if requires_restart {
            println!("Update complete, restart pending");
        } else {
            println!("Update abandoned");
        }
    }

    fn launch_main(&self) {
        println!("Launching main entry point with current assets");
    }

    fn restart(&self) {
        println!("Restart requested");
    }
}

fn open_state(state_dir: Option<PathBuf>) -> Result<(LocalFileSystem, JsonFileStore)> {
    let fs = match state_dir {
        Some(dir) => LocalFileSystem::new(dir),
        None => LocalFileSystem::from_data_dir()?,
    };
    let root = fs
        .writable_path()
        .context("Failed to prepare state directory")?;
    let store = JsonFileStore::open(root.join(STORE_FILE))
        .with_context(|| format!("Failed to open {}", root.join(STORE_FILE).display()))?;
    Ok((fs, store))
}

/// Replay CLI.
#[derive(Debug, Parser)]
pub struct ReplayCli {
    /// JSON file with an array of engine events
    #[arg(value_name = "EVENTS")]
    pub events: PathBuf,

    /// Remote asset host; defaults to the configured host
    #[arg(long)]
    pub host: Option<String>,

    /// Directory for the key-value store and downloaded assets
    #[arg(long)]
    pub state_dir: Option<PathBuf>,

    /// Search paths active before the update (repeatable)
    #[arg(long = "search-path", value_name = "PATH")]
    pub search_paths: Vec<String>,

    /// Version advertised by the remote bundle
    #[arg(long)]
    pub remote_version: Option<String>,

    /// Search paths declared by the remote bundle (repeatable)
    #[arg(long = "remote-search-path", value_name = "PATH")]
    pub remote_search_paths: Vec<String>,

    /// Abandon the session after this many seconds without a terminal event
    #[arg(long)]
    pub watchdog_secs: Option<u64>,
}

impl ReplayCli {
    pub async fn run(self, mut config: HotUpdateConfig) -> Result<()> {
        let content = std::fs::read_to_string(&self.events)
            .with_context(|| format!("Failed to read {}", self.events.display()))?;
        let script: Vec<UpdateEvent> = serde_json::from_str(&content)
            .with_context(|| format!("Invalid event list in {}", self.events.display()))?;

        let host = self
            .host
            .or_else(|| config.host_url.clone())
            .context("No host given and none configured")?;
        if let Some(secs) = self.watchdog_secs {
            config.watchdog_timeout_secs = Some(secs);
        }

        let (fs, store) = open_state(self.state_dir)?;
        let fs = fs.with_search_paths(self.search_paths);
        let storage_path = fs.writable_path()?.join(&config.storage_dir_name);

        let mut engine = ScriptedEngine::create(EngineOptions::new(storage_path))
            .with_script(script)
            .with_remote_search_paths(self.remote_search_paths);
        if let Some(version) = self.remote_version {
            engine = engine.with_remote_version(version);
        }

        let mut updater =
            HotUpdater::with_engine(config, engine, fs, store, Arc::new(ConsoleHost))?;
        updater.restore_search_paths();

        match updater.check_and_update(&host).await? {
            UpdateOutcome::Restarting { search_paths } => {
                println!("Search paths:");
                for path in &search_paths {
                    println!("  {}", path);
                }
                if let Some(restart) = updater.take_restart_handle() {
                    restart.wait().await;
                }
            }
            UpdateOutcome::ContinueWithCurrent { retryable } => {
                println!(
                    "Continuing with current assets ({})",
                    if retryable { "retry possible" } else { "no retry" }
                );
            }
            UpdateOutcome::AlreadyInFlight => {
                println!("An update is already in flight");
            }
        }

        Ok(())
    }
}

/// Restore CLI.
#[derive(Debug, Parser)]
pub struct RestoreCli {
    /// Directory holding the key-value store
    #[arg(long)]
    pub state_dir: Option<PathBuf>,
}

impl RestoreCli {
    pub fn run(self, config: &HotUpdateConfig) -> Result<()> {
        let (_, store) = open_state(self.state_dir)?;
        let merger = SearchPathMerger::new(config.search_paths_key.clone());

        match merger.load(&store)? {
            Some(paths) if !paths.is_empty() => {
                for path in paths {
                    println!("{}", path);
                }
            }
            _ => println!("No persisted search paths under {}", merger.key()),
        }
        Ok(())
    }
}
