//! Cortex HotUpdate CLI - inspect manifests and replay update sessions.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::error;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use cortex_hotupdate::HotUpdateConfig;

mod inspect_cmd;
mod replay_cmd;

use inspect_cmd::{CompareCli, ManifestCli};
use replay_cmd::{ReplayCli, RestoreCli};

/// Cortex hot update tooling
#[derive(Parser)]
#[command(name = "cortex-hotupdate")]
#[command(about = "Inspect manifests and replay hot update sessions")]
#[command(version)]
struct Cli {
    /// Configuration file path (defaults to ~/.cortex/hotupdate.json)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log level
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Enable JSON logging
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compare two bundle versions
    Compare(CompareCli),
    /// Print the local manifest built for a host
    Manifest(ManifestCli),
    /// Drive a full session from a recorded event stream
    Replay(ReplayCli),
    /// Print persisted search paths
    Restore(RestoreCli),
}

fn setup_logging(level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = tracing_subscriber::registry().with(filter);

    if json {
        subscriber
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        subscriber
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<HotUpdateConfig> {
    match path {
        Some(path) => Ok(HotUpdateConfig::load_from(path)?),
        None => Ok(HotUpdateConfig::load()),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    setup_logging(&cli.log_level, cli.json_logs);

    let config = match load_config(cli.config.as_ref()) {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let result = match cli.command {
        Commands::Compare(cmd) => cmd.run(),
        Commands::Manifest(cmd) => cmd.run(&config),
        Commands::Replay(cmd) => cmd.run(config).await,
        Commands::Restore(cmd) => cmd.run(&config),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}
