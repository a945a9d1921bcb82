//! Manifest-based self-update of the host application

use std::convert::Infallible;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use reqwest::Client;
use tokio::sync::mpsc;
use tracing::{info, instrument, warn};
use url::Url;

use skyup_api::DownloadEvent;

use crate::error::BackendError;
use crate::http;
use crate::traits::{AppRelease, AppUpdater};
use crate::version;

/// Prefix of mounted disk images on macOS
const MOUNTED_IMAGE_ROOT: &str = "/Volumes";

/// Self-updater driven by a JSON release manifest
///
/// The manifest is `{"version": "X.Y.Z", "url": "...", "notes": "..."}`.
#[derive(Debug, Clone)]
pub struct ReleaseUpdater {
    manifest_url: Url,
    client: Client,
    executable: PathBuf,
}

impl ReleaseUpdater {
    /// Create an updater for the running executable
    ///
    /// # Errors
    /// Returns an error if the executable path or HTTP client is unavailable
    pub fn new(manifest_url: Url) -> Result<Self, BackendError> {
        let executable = std::env::current_exe()?;
        Self::for_executable(manifest_url, executable)
    }

    /// Create an updater replacing `executable` instead of the running binary
    pub fn for_executable(manifest_url: Url, executable: PathBuf) -> Result<Self, BackendError> {
        Ok(Self {
            manifest_url,
            client: http::build_client()?,
            executable,
        })
    }

    fn sibling(&self, extension: &str) -> PathBuf {
        let mut name = self.executable.as_os_str().to_os_string();
        name.push(".");
        name.push(extension);
        PathBuf::from(name)
    }
}

/// Whether `path` is outside a mounted disk image
pub fn is_canonical_location(path: &Path) -> bool {
    !path.starts_with(MOUNTED_IMAGE_ROOT)
}

#[async_trait]
impl AppUpdater for ReleaseUpdater {
    async fn is_installed_location(&self) -> Result<bool, BackendError> {
        Ok(is_canonical_location(&self.executable))
    }

    #[instrument(skip(self))]
    async fn check_for_update(
        &self,
        current_version: &str,
    ) -> Result<Option<AppRelease>, BackendError> {
        let body = http::fetch_text(&self.client, self.manifest_url.as_str()).await?;
        let release: AppRelease = serde_json::from_str(&body)
            .map_err(|e| BackendError::SelfUpdate(format!("invalid release manifest: {e}")))?;

        if version::is_newer(current_version, &release.version)? {
            info!(current = current_version, latest = %release.version, "application update available");
            Ok(Some(release))
        } else {
            Ok(None)
        }
    }

    #[instrument(skip(self, events), fields(version = %release.version))]
    async fn download_and_install(
        &self,
        release: &AppRelease,
        events: mpsc::UnboundedSender<DownloadEvent>,
    ) -> Result<(), BackendError> {
        let staged = self.sibling("new");
        let backup = self.sibling("old");

        let result = http::download_to_file(&self.client, &release.url, &staged, |event| {
            let _ = events.send(event);
        })
        .await;
        if let Err(e) = result {
            let _ = tokio::fs::remove_file(&staged).await;
            return Err(e);
        }

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = tokio::fs::metadata(&staged).await?.permissions();
            perms.set_mode(0o755);
            tokio::fs::set_permissions(&staged, perms).await?;
        }

        if tokio::fs::try_exists(&backup).await? {
            tokio::fs::remove_file(&backup).await?;
        }
        tokio::fs::rename(&self.executable, &backup)
            .await
            .map_err(|e| BackendError::SelfUpdate(format!("failed to back up executable: {e}")))?;

        if let Err(e) = tokio::fs::rename(&staged, &self.executable).await {
            warn!(error = %e, "install failed, restoring previous executable");
            tokio::fs::rename(&backup, &self.executable).await?;
            return Err(BackendError::SelfUpdate(format!("failed to install: {e}")));
        }

        info!(path = %self.executable.display(), "application update installed");
        Ok(())
    }

    async fn restart(&self) -> Result<Infallible, BackendError> {
        info!(path = %self.executable.display(), "restarting application");

        std::process::Command::new(&self.executable)
            .args(std::env::args_os().skip(1))
            .spawn()
            .map_err(|e| BackendError::SelfUpdate(format!("failed to relaunch: {e}")))?;

        std::process::exit(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_location() {
        assert!(is_canonical_location(Path::new("/Applications/SkyUp.app/Contents/MacOS/skyup")));
        assert!(!is_canonical_location(Path::new("/Volumes/SkyUp/SkyUp.app/Contents/MacOS/skyup")));
    }

    #[tokio::test]
    async fn test_check_for_update() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/latest.json")
            .with_status(200)
            .with_body(r#"{"version":"1.3.0","url":"https://example.com/skyup"}"#)
            .create_async()
            .await;

        let manifest = Url::parse(&format!("{}/latest.json", server.url())).unwrap();
        let updater = ReleaseUpdater::for_executable(manifest, PathBuf::from("/opt/skyup")).unwrap();

        let release = updater.check_for_update("1.2.9").await.unwrap().unwrap();
        assert_eq!(release.version, "1.3.0");
        assert!(release.notes.is_none());

        assert!(updater.check_for_update("1.3.0").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_download_and_install_swaps_executable() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/skyup-1.3.0")
            .with_status(200)
            .with_body("v2")
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let exe = dir.path().join("skyup");
        std::fs::write(&exe, "v1").unwrap();

        let manifest = Url::parse(&format!("{}/latest.json", server.url())).unwrap();
        let updater = ReleaseUpdater::for_executable(manifest, exe.clone()).unwrap();
        let release = AppRelease {
            version: "1.3.0".to_string(),
            url: format!("{}/skyup-1.3.0", server.url()),
            notes: None,
        };

        let (tx, mut rx) = mpsc::unbounded_channel();
        updater.download_and_install(&release, tx).await.unwrap();

        assert_eq!(std::fs::read_to_string(&exe).unwrap(), "v2");
        assert_eq!(std::fs::read_to_string(dir.path().join("skyup.old")).unwrap(), "v1");
        assert!(matches!(rx.recv().await, Some(DownloadEvent::Started { .. })));
    }

    #[tokio::test]
    async fn test_failed_download_keeps_executable() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/missing")
            .with_status(500)
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let exe = dir.path().join("skyup");
        std::fs::write(&exe, "v1").unwrap();

        let manifest = Url::parse(&format!("{}/latest.json", server.url())).unwrap();
        let updater = ReleaseUpdater::for_executable(manifest, exe.clone()).unwrap();
        let release = AppRelease {
            version: "9.9.9".to_string(),
            url: format!("{}/missing", server.url()),
            notes: None,
        };

        let (tx, _rx) = mpsc::unbounded_channel();
        assert!(updater.download_and_install(&release, tx).await.is_err());
        assert_eq!(std::fs::read_to_string(&exe).unwrap(), "v1");
        assert!(!dir.path().join("skyup.new").exists());
    }
}
