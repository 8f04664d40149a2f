//! Compare and manifest commands.

use anyhow::{Context, Result, bail};
use clap::Parser;

use cortex_hotupdate::{HotUpdateConfig, Manifest, VersionComparison, compare_versions};

/// Compare CLI.
#[derive(Debug, Parser)]
pub struct CompareCli {
    /// First version (e.g. the local bundle)
    #[arg(value_name = "A")]
    pub a: String,

    /// Second version (e.g. the remote bundle)
    #[arg(value_name = "B")]
    pub b: String,
}

impl CompareCli {
    pub fn run(self) -> Result<()> {
        let diff = compare_versions(&self.a, &self.b);
        let relation = match VersionComparison::from(diff) {
            VersionComparison::Older => "<",
            VersionComparison::Equal => "==",
            VersionComparison::Newer => ">",
        };
        println!("{} {} {} ({})", self.a, relation, self.b, diff);
        Ok(())
    }
}

/// Manifest CLI.
#[derive(Debug, Parser)]
pub struct ManifestCli {
    /// Remote asset host; defaults to the configured host
    #[arg(value_name = "HOST")]
    pub host: Option<String>,

    /// Pretty-print the JSON
    #[arg(long)]
    pub pretty: bool,
}

impl ManifestCli {
    pub fn run(self, config: &HotUpdateConfig) -> Result<()> {
        let Some(host) = self.host.or_else(|| config.host_url.clone()) else {
            bail!("No host given and none configured");
        };

        let manifest = Manifest::for_host(&host);
        let json = if self.pretty {
            serde_json::to_string_pretty(&manifest)
        } else {
            serde_json::to_string(&manifest)
        }
        .context("Failed to serialize manifest")?;

        println!("{}", json);
        Ok(())
    }
}
