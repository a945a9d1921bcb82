//! Host application self-update and installer version check

use std::convert::Infallible;
use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

use skyup_api::{DownloadEvent, SessionEvent};
use skyup_backend::version::is_newer;
use skyup_backend::{AppRelease, AppUpdater, DeviceBackend};

use crate::config::SelfUpdateConfig;
use crate::error::CoreError;

/// Percentage accumulator over chunk events of a release download
#[derive(Debug, Default)]
pub struct DownloadTracker {
    content_length: Option<u64>,
    received: u64,
}

impl DownloadTracker {
    /// Fold one event; returns the new percentage when it is known
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
    pub fn apply(&mut self, event: &DownloadEvent) -> Option<u8> {
        match event {
            DownloadEvent::Started { content_length } => {
                self.content_length = *content_length;
                self.received = 0;
                Some(0)
            }
            DownloadEvent::Progress { chunk_length } => {
                self.received += chunk_length;
                let total = self.content_length.filter(|len| *len > 0)?;
                let percent = (self.received as f64 / total as f64 * 100.0).round();
                Some(percent.clamp(0.0, 100.0) as u8)
            }
            DownloadEvent::Finished => Some(100),
        }
    }
}

/// Checks for and applies new host application releases
pub struct SelfUpdateController {
    updater: Arc<dyn AppUpdater>,
    config: SelfUpdateConfig,
    current_version: String,
    event_tx: broadcast::Sender<SessionEvent>,
}

impl SelfUpdateController {
    #[must_use]
    pub fn new(
        updater: Arc<dyn AppUpdater>,
        config: SelfUpdateConfig,
        current_version: impl Into<String>,
        event_tx: broadcast::Sender<SessionEvent>,
    ) -> Self {
        Self {
            updater,
            config,
            current_version: current_version.into(),
            event_tx,
        }
    }

    /// Look for a newer release
    ///
    /// # Errors
    ///
    /// Returns `CoreError::SelfUpdate` if the install location or the release
    /// manifest cannot be read.
    pub async fn check(&self) -> Result<Option<AppRelease>, CoreError> {
        if !self.config.enabled {
            debug!("self-update disabled");
            return Ok(None);
        }

        if self.config.verify_install_location {
            let installed = self
                .updater
                .is_installed_location()
                .await
                .map_err(|e| CoreError::SelfUpdate(e.to_string()))?;
            if !installed {
                warn!("not running from the install location, skipping self-update");
                return Ok(None);
            }
        }

        let release = self
            .updater
            .check_for_update(&self.current_version)
            .await
            .map_err(|e| CoreError::SelfUpdate(e.to_string()))?;

        match &release {
            Some(r) => info!(current = %self.current_version, latest = %r.version, "self-update available"),
            None => debug!(current = %self.current_version, "host application is up to date"),
        }
        Ok(release)
    }

    /// Download and install `release`, then relaunch
    ///
    /// Progress is published as `SessionEvent::SelfUpdateProgress`. Only returns
    /// on failure.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::SelfUpdate` if download, install or relaunch fails.
    pub async fn apply(&self, release: &AppRelease) -> Result<Infallible, CoreError> {
        info!(version = %release.version, "applying self-update");

        let (events_tx, mut events_rx) = mpsc::unbounded_channel();
        let install = self.updater.download_and_install(release, events_tx);
        let report = async {
            let mut tracker = DownloadTracker::default();
            let mut last = None;
            while let Some(event) = events_rx.recv().await {
                if let Some(percent) = tracker.apply(&event)
                    && last != Some(percent)
                {
                    last = Some(percent);
                    let _ = self.event_tx.send(SessionEvent::SelfUpdateProgress { percent });
                }
            }
        };

        let (installed, ()) = tokio::join!(install, report);
        installed.map_err(|e| CoreError::SelfUpdate(e.to_string()))?;

        info!(version = %release.version, "self-update installed, relaunching");
        self.updater
            .restart()
            .await
            .map_err(|e| CoreError::SelfUpdate(e.to_string()))
    }
}

/// Whether the remote installer is newer than `current_version`
///
/// Fails open: network errors and unparseable versions report no update.
pub async fn installer_update_available(
    backend: &dyn DeviceBackend,
    version_url: &str,
    current_version: &str,
) -> bool {
    let remote = match backend.fetch_installer_version(version_url).await {
        Ok(v) => v,
        Err(e) => {
            warn!(url = %version_url, error = %e, "installer version check failed");
            return false;
        }
    };

    match is_newer(current_version, &remote) {
        Ok(newer) => {
            debug!(local = %current_version, remote = %remote, newer, "installer version compared");
            newer
        }
        Err(e) => {
            warn!(remote = %remote, error = %e, "unparseable installer version");
            false
        }
    }
}
