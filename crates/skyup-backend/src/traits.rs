//! Backend traits consumed by the update orchestrator

use std::convert::Infallible;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, mpsc};

use skyup_api::{DeviceInfo, DownloadEvent, UpdateProgress};

use crate::error::BackendError;

/// Device-side primitives: detection, bundle transfer, diagnostics
///
/// Progress of `fetch_bundle` is not part of its return value; it is published
/// on the channel returned by `subscribe_progress`, independently of the call
/// resolving.
#[async_trait]
pub trait DeviceBackend: Send + Sync {
    /// Read the connected device's model and firmware version
    async fn detect_device(&self) -> Result<DeviceInfo, BackendError>;

    /// Download a bundle and apply it to the device
    async fn fetch_bundle(&self, url: &str) -> Result<(), BackendError>;

    /// Subscribe to progress notifications of all bundle transfers
    fn subscribe_progress(&self) -> broadcast::Receiver<UpdateProgress>;

    /// Upload pending crash reports from the device
    async fn send_diagnostics(&self) -> Result<(), BackendError>;

    /// Fetch the remote installer version descriptor
    async fn fetch_installer_version(&self, url: &str) -> Result<String, BackendError>;
}

/// A host application release newer than the running one
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppRelease {
    pub version: String,
    pub url: String,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Host application self-update primitives
#[async_trait]
pub trait AppUpdater: Send + Sync {
    /// Whether the running executable sits in its canonical install location
    async fn is_installed_location(&self) -> Result<bool, BackendError>;

    /// Look for a release newer than `current_version`
    async fn check_for_update(
        &self,
        current_version: &str,
    ) -> Result<Option<AppRelease>, BackendError>;

    /// Download the release, reporting chunk events, and install it
    async fn download_and_install(
        &self,
        release: &AppRelease,
        events: mpsc::UnboundedSender<DownloadEvent>,
    ) -> Result<(), BackendError>;

    /// Replace the running process with the installed release
    async fn restart(&self) -> Result<Infallible, BackendError>;
}
