//! Seam to the asset update engine.
//!
//! The engine performs network transfer, checksum verification,
//! decompression and file placement. This crate only drives it: it loads a
//! manifest, triggers `update()`, and consumes the events the engine pushes
//! into an [`EventSender`].

use std::path::{Path, PathBuf};

use tokio::sync::mpsc;
use tracing::debug;

use crate::error::{HotUpdateError, HotUpdateResult};
use crate::event::{EventCode, UpdateEvent};
use crate::manifest::{AssetMeta, Manifest};
use crate::version::{VersionCompareFn, compare_versions};

/// Channel end the engine publishes events on.
pub type EventSender = mpsc::UnboundedSender<UpdateEvent>;

/// Channel end the session consumes events from.
pub type EventReceiver = mpsc::UnboundedReceiver<UpdateEvent>;

/// Hook called for each downloaded asset before it is accepted.
pub type VerifyCallback = Box<dyn Fn(&Path, &AssetMeta) -> bool + Send + Sync>;

/// Options used to construct an engine.
#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// Path of a bundled local manifest; `None` when the manifest is loaded later
    pub local_manifest: Option<PathBuf>,
    /// Writable directory the engine stores downloaded assets in
    pub storage_path: PathBuf,
    /// Comparator deciding whether the remote version is newer
    pub version_compare: VersionCompareFn,
}

impl EngineOptions {
    /// Options for a storage path, no bundled manifest and the default comparator.
    pub fn new(storage_path: impl Into<PathBuf>) -> Self {
        Self {
            local_manifest: None,
            storage_path: storage_path.into(),
            version_compare: compare_versions,
        }
    }
}

/// Operations the orchestrator needs from an asset update engine.
pub trait AssetUpdateEngine: Send {
    /// Construct the engine.
    fn create(options: EngineOptions) -> Self
    where
        Self: Sized;

    /// Install the per-asset verification hook.
    fn set_verify_callback(&mut self, callback: VerifyCallback);

    /// Load the local manifest the remote one is compared against.
    fn load_local_manifest(&mut self, manifest: &Manifest, storage_path: &Path)
    -> HotUpdateResult<()>;

    /// Attach or detach the event channel.
    fn set_event_sender(&mut self, sender: Option<EventSender>);

    /// Begin checking and downloading. Events follow on the attached channel.
    fn update(&mut self);

    /// Search paths declared by the current local manifest.
    fn local_search_paths(&self) -> Vec<String>;
}

/// Engine that replays a prerecorded event stream.
///
/// Used to exercise the orchestrator without network access. When a remote
/// version is configured, the engine first runs the comparator against the
/// local manifest version and reports `AlreadyUpToDate` if nothing is newer.
///
/// Manifests whose package URL is not absolute are rejected, like a real
/// engine that cannot resolve where to download from.
pub struct ScriptedEngine {
    options: EngineOptions,
    script: Vec<UpdateEvent>,
    remote_version: Option<String>,
    remote_search_paths: Vec<String>,
    manifest: Option<Manifest>,
    sender: Option<EventSender>,
    verify: Option<VerifyCallback>,
    applied: bool,
    attach_count: usize,
    update_count: usize,
}

impl ScriptedEngine {
    /// Set the events replayed by `update()`.
    pub fn with_script(mut self, script: Vec<UpdateEvent>) -> Self {
        self.script = script;
        self
    }

    /// Replace the events replayed by the next `update()`.
    pub fn set_script(&mut self, script: Vec<UpdateEvent>) {
        self.script = script;
    }

    /// Set the version the remote bundle advertises.
    pub fn with_remote_version(mut self, version: impl Into<String>) -> Self {
        self.remote_version = Some(version.into());
        self
    }

    /// Set the search paths the remote bundle declares once applied.
    pub fn with_remote_search_paths(mut self, paths: Vec<String>) -> Self {
        self.remote_search_paths = paths;
        self
    }

    /// Push an event on the attached channel, outside of `update()`.
    ///
    /// Returns false when no channel is attached or the receiver is gone.
    pub fn emit(&self, event: UpdateEvent) -> bool {
        match &self.sender {
            Some(tx) => tx.send(event).is_ok(),
            None => false,
        }
    }

    /// Whether an event channel is currently attached.
    pub fn is_attached(&self) -> bool {
        self.sender.is_some()
    }

    /// Number of times a channel was attached.
    pub fn attach_count(&self) -> usize {
        self.attach_count
    }

    /// Number of `update()` calls.
    pub fn update_count(&self) -> usize {
        self.update_count
    }

    /// The manifest loaded most recently.
    pub fn loaded_manifest(&self) -> Option<&Manifest> {
        self.manifest.as_ref()
    }

    /// Storage path the engine was created with.
    pub fn storage_path(&self) -> &Path {
        &self.options.storage_path
    }

    fn verify_asset(&self, event: &UpdateEvent) -> bool {
        let (Some(verify), Some(asset_id)) = (&self.verify, &event.asset_id) else {
            return true;
        };
        let meta = AssetMeta {
            path: asset_id.clone(),
            ..AssetMeta::default()
        };
        verify(&self.options.storage_path.join(asset_id), &meta)
    }
}

impl AssetUpdateEngine for ScriptedEngine {
    fn create(options: EngineOptions) -> Self {
        Self {
            options,
            script: Vec::new(),
            remote_version: None,
            remote_search_paths: Vec::new(),
            manifest: None,
            sender: None,
            verify: None,
            applied: false,
            attach_count: 0,
            update_count: 0,
        }
    }

    fn set_verify_callback(&mut self, callback: VerifyCallback) {
        self.verify = Some(callback);
    }

    fn load_local_manifest(
        &mut self,
        manifest: &Manifest,
        storage_path: &Path,
    ) -> HotUpdateResult<()> {
        if !manifest.package_url.contains("://") {
            return Err(HotUpdateError::ManifestRejected {
                message: format!("package URL '{}' is not absolute", manifest.package_url),
            });
        }

        debug!(
            package_url = %manifest.package_url,
            storage = %storage_path.display(),
            "Loading local manifest"
        );
        self.manifest = Some(manifest.clone());
        self.applied = false;
        Ok(())
    }

    fn set_event_sender(&mut self, sender: Option<EventSender>) {
        if sender.is_some() {
            self.attach_count += 1;
        }
        self.sender = sender;
    }

    fn update(&mut self) {
        self.update_count += 1;

        let Some(local_version) = self.manifest.as_ref().map(|m| m.version.clone()) else {
            self.emit(UpdateEvent::new(EventCode::ErrorNoLocalManifest));
            return;
        };

        if let Some(remote) = &self.remote_version {
            if (self.options.version_compare)(&local_version, remote) >= 0 {
                self.applied = true;
                self.emit(UpdateEvent::new(EventCode::AlreadyUpToDate));
                return;
            }
        }

        for event in self.script.clone() {
            let event = if event.code == EventCode::AssetUpdated && !self.verify_asset(&event) {
                UpdateEvent::new(EventCode::ErrorUpdating)
                    .with_asset(event.asset_id.unwrap_or_default())
                    .with_message("verification failed")
            } else {
                event
            };
            let code = event.code;

            if !self.emit(event) {
                break;
            }
            if matches!(code, EventCode::UpdateFinished | EventCode::AlreadyUpToDate) {
                self.applied = true;
            }
        }
    }

    fn local_search_paths(&self) -> Vec<String> {
        if self.applied {
            return self.remote_search_paths.clone();
        }
        self.manifest
            .as_ref()
            .map(|m| m.search_paths.clone())
            .unwrap_or_default()
    }
}
