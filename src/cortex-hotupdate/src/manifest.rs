//! Local manifest construction.
//!
//! The orchestrator never ships a real local manifest. Each attempt hands the
//! engine a synthetic baseline pointing at the configured host, with version
//! [`LOCAL_VERSION_BASELINE`], so the engine's own comparison always treats
//! the remote bundle as newer and re-verifies it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::HotUpdateResult;

/// Version written into every synthetic local manifest.
pub const LOCAL_VERSION_BASELINE: &str = "0.0.0";

/// Remote file describing the full asset set.
pub const PROJECT_MANIFEST_FILE: &str = "project.manifest";

/// Remote file carrying only the bundle version.
pub const VERSION_MANIFEST_FILE: &str = "version.manifest";

/// Metadata the engine tracks for one asset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetMeta {
    /// Path relative to the storage root
    #[serde(default)]
    pub path: String,
    /// Expected MD5 of the file
    #[serde(default)]
    pub md5: String,
    /// Whether the asset ships as an archive that the engine unpacks
    #[serde(default)]
    pub compressed: bool,
    /// File size in bytes, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

/// Manifest in the asset update engine's JSON schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    /// Base URL the engine downloads assets from
    pub package_url: String,
    /// URL of the full remote manifest
    pub remote_manifest_url: String,
    /// URL of the version-only remote manifest
    pub remote_version_url: String,
    /// Local bundle version
    pub version: String,
    /// Known assets by id
    #[serde(default)]
    pub assets: BTreeMap<String, AssetMeta>,
    /// Search paths the bundle declares
    #[serde(default)]
    pub search_paths: Vec<String>,
}

impl Manifest {
    /// Build the synthetic local manifest for a host endpoint.
    pub fn for_host(host: &str) -> Self {
        let package_url = format!("{}/", host.trim_end_matches('/'));

        Self {
            remote_manifest_url: format!("{}{}", package_url, PROJECT_MANIFEST_FILE),
            remote_version_url: format!("{}{}", package_url, VERSION_MANIFEST_FILE),
            package_url,
            version: LOCAL_VERSION_BASELINE.to_string(),
            assets: BTreeMap::new(),
            search_paths: Vec::new(),
        }
    }

    /// Serialize to the JSON string the engine loads.
    pub fn to_json(&self) -> HotUpdateResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse a manifest from JSON.
    pub fn from_json(json: &str) -> HotUpdateResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
