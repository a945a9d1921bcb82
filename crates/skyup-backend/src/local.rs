//! Backend for a vario mounted as a local mass-storage volume

use std::fs::File;
use std::io::{Read, Write};
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tar::{Archive, Entry};
use tokio::sync::broadcast;
use tracing::{debug, info, instrument, warn};
use url::Url;

use skyup_api::{DeviceInfo, UpdateProgress};

use crate::device::{CRASH_REPORT_DIR, DeviceLocator, read_device_info};
use crate::error::BackendError;
use crate::http;
use crate::traits::DeviceBackend;

/// Capacity of the progress broadcast channel
const PROGRESS_CHANNEL_CAPACITY: usize = 1024;

/// Crash report payload posted to the diagnostics endpoint
#[derive(Debug, Serialize)]
struct CrashReport<'a> {
    filename: &'a str,
    device: Option<&'a str>,
    content: &'a str,
}

/// Device backend operating on the locally mounted vario volume
#[derive(Debug)]
pub struct LocalBackend {
    locator: DeviceLocator,
    client: Client,
    progress_tx: broadcast::Sender<UpdateProgress>,
    diagnostics_endpoint: Option<Url>,
}

impl LocalBackend {
    /// Create a backend for the volume found by `locator`
    ///
    /// # Errors
    /// Returns `BackendError::Network` if the HTTP client cannot be built
    pub fn new(locator: DeviceLocator, diagnostics_endpoint: Option<Url>) -> Result<Self, BackendError> {
        let (progress_tx, _) = broadcast::channel(PROGRESS_CHANNEL_CAPACITY);

        Ok(Self {
            locator,
            client: http::build_client()?,
            progress_tx,
            diagnostics_endpoint,
        })
    }

    fn publish(&self, event: UpdateProgress) {
        // No subscribers is fine
        let _ = self.progress_tx.send(event);
    }

    /// Collect `*.txt` crash reports from the device
    async fn crash_reports(dir: &Path) -> Result<Vec<PathBuf>, BackendError> {
        let mut read_dir = match tokio::fs::read_dir(dir).await {
            Ok(read_dir) => read_dir,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut reports = Vec::new();
        while let Some(entry) = read_dir.next_entry().await? {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "txt") {
                reports.push(path);
            }
        }
        reports.sort();

        Ok(reports)
    }
}

#[async_trait]
impl DeviceBackend for LocalBackend {
    #[instrument(skip(self), level = "debug")]
    async fn detect_device(&self) -> Result<DeviceInfo, BackendError> {
        let mountpoint = self.locator.locate()?;
        let info = read_device_info(&mountpoint).await?;

        info!(
            device = %info.device_name,
            software = %info.software_version,
            mount = %mountpoint.display(),
            "device detected"
        );

        Ok(info)
    }

    #[instrument(skip(self))]
    async fn fetch_bundle(&self, url: &str) -> Result<(), BackendError> {
        let mountpoint = self.locator.locate()?;

        let buffer = http::download_bytes(&self.client, url, |total, downloaded| {
            self.publish(UpdateProgress::download(url, total, downloaded));
        })
        .await?;

        let archive_size = buffer.len() as u64;
        let tx = self.progress_tx.clone();
        let event_url = url.to_string();

        let processed = tokio::task::spawn_blocking(move || {
            unpack_archive(&buffer[..], &mountpoint, |file, total, processed| {
                let _ = tx.send(UpdateProgress::install(
                    event_url.as_str(),
                    archive_size,
                    file,
                    total,
                    processed,
                ));
            })
        })
        .await
        .map_err(|e| BackendError::Archive(format!("unpack task failed: {e}")))??;

        info!(url, files = processed, bytes = archive_size, "bundle applied");
        Ok(())
    }

    fn subscribe_progress(&self) -> broadcast::Receiver<UpdateProgress> {
        self.progress_tx.subscribe()
    }

    #[instrument(skip(self), level = "debug")]
    async fn send_diagnostics(&self) -> Result<(), BackendError> {
        let mountpoint = self.locator.locate()?;
        let reports = Self::crash_reports(&mountpoint.join(CRASH_REPORT_DIR)).await?;

        if reports.is_empty() {
            debug!("no crash reports found");
            return Ok(());
        }

        let Some(endpoint) = &self.diagnostics_endpoint else {
            warn!(
                count = reports.len(),
                "no diagnostics endpoint configured, keeping crash reports"
            );
            return Ok(());
        };

        let device = read_device_info(&mountpoint).await.ok();
        for path in &reports {
            let content = tokio::fs::read_to_string(path).await?;
            let filename = path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default();

            let report = CrashReport {
                filename: &filename,
                device: device.as_ref().map(|d| d.device_name.as_str()),
                content: &content,
            };

            let response = self
                .client
                .post(endpoint.clone())
                .json(&report)
                .send()
                .await
                .map_err(|e| BackendError::Diagnostics(e.to_string()))?;

            if !response.status().is_success() {
                return Err(BackendError::Diagnostics(format!(
                    "{filename}: endpoint returned {}",
                    response.status()
                )));
            }

            info!(report = %filename, "crash report sent");
        }

        for path in &reports {
            tokio::fs::remove_file(path).await?;
        }
        info!(count = reports.len(), "crash report folder cleaned");

        Ok(())
    }

    async fn fetch_installer_version(&self, url: &str) -> Result<String, BackendError> {
        let version = http::fetch_text(&self.client, url).await?;
        Ok(version.trim().to_string())
    }
}

/// Install steps reported while unpacking a single-entry archive
const SINGLE_ENTRY_STEPS: u32 = 100;

/// Copy buffer size for single-entry archives
const CHUNK_SIZE: usize = 64 * 1024;

/// Unpack a tar archive below `root`, calling `on_entry(path, total, processed)`
///
/// Multi-entry archives report once per entry. An archive holding a single
/// entry reports chunk progress instead, as `processed` out of 100 steps.
/// Entries that would land outside `root` abort the unpack.
pub fn unpack_archive<R: Read + Copy>(
    reader: R,
    root: &Path,
    mut on_entry: impl FnMut(&str, u32, u32),
) -> Result<u32, BackendError> {
    let total = Archive::new(reader)
        .entries()
        .map_err(|e| BackendError::Archive(e.to_string()))?
        .count();
    let total = u32::try_from(total).unwrap_or(u32::MAX);

    let mut archive = Archive::new(reader);
    let mut processed = 0u32;

    for entry in archive
        .entries()
        .map_err(|e| BackendError::Archive(e.to_string()))?
    {
        let mut entry = entry.map_err(|e| BackendError::Archive(e.to_string()))?;
        let path = entry
            .path()
            .map_err(|e| BackendError::Archive(e.to_string()))?
            .to_string_lossy()
            .into_owned();

        if total == 1 {
            unpack_chunked(&mut entry, root, &path, &mut on_entry)?;
            return Ok(1);
        }

        let inside = entry
            .unpack_in(root)
            .map_err(|e| BackendError::Archive(format!("{path}: {e}")))?;
        if !inside {
            return Err(BackendError::Archive(format!(
                "{path}: entry escapes the device root"
            )));
        }

        processed += 1;
        on_entry(&path, total, processed);
    }

    Ok(processed)
}

fn unpack_chunked<R: Read>(
    entry: &mut Entry<'_, R>,
    root: &Path,
    path: &str,
    on_entry: &mut impl FnMut(&str, u32, u32),
) -> Result<(), BackendError> {
    let relative = PathBuf::from(path);
    if !relative
        .components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
    {
        return Err(BackendError::Archive(format!(
            "{path}: entry escapes the device root"
        )));
    }

    let dest = root.join(&relative);
    if entry.header().entry_type().is_dir() {
        std::fs::create_dir_all(&dest)?;
        on_entry(path, SINGLE_ENTRY_STEPS, SINGLE_ENTRY_STEPS);
        return Ok(());
    }
    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let size = entry.size();
    let mut file = File::create(&dest)?;
    let mut buf = vec![0u8; CHUNK_SIZE];
    let mut written = 0u64;
    let mut last_step = 0u32;

    loop {
        let n = entry.read(&mut buf)?;
        if n == 0 {
            break;
        }
        file.write_all(&buf[..n])?;
        written += n as u64;

        let step = if size == 0 {
            SINGLE_ENTRY_STEPS
        } else {
            u32::try_from(written * u64::from(SINGLE_ENTRY_STEPS) / size)
                .unwrap_or(SINGLE_ENTRY_STEPS)
                .min(SINGLE_ENTRY_STEPS)
        };
        if step != last_step {
            last_step = step;
            on_entry(path, SINGLE_ENTRY_STEPS, step);
        }
    }

    if last_step != SINGLE_ENTRY_STEPS {
        on_entry(path, SINGLE_ENTRY_STEPS, SINGLE_ENTRY_STEPS);
    }
    Ok(())
}
