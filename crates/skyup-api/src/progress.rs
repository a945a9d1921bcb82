//! Progress notification types
//!
//! `UpdateProgress` is the payload of the bundle progress channel. Its JSON shape
//! is a fixed contract with the front end and must not change.

use serde::{Deserialize, Serialize};

/// Progress of a single bundle transfer, keyed by the bundle URL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProgress {
    pub url: String,
    pub total_bytes: u64,
    pub downloaded: u64,
    pub current_file: String,
    pub total_files: u32,
    pub processed_files: u32,
}

impl UpdateProgress {
    /// Event emitted while the archive is still being downloaded
    pub fn download(url: impl Into<String>, total_bytes: u64, downloaded: u64) -> Self {
        Self {
            url: url.into(),
            total_bytes,
            downloaded,
            current_file: String::new(),
            total_files: 0,
            processed_files: 0,
        }
    }

    /// Event emitted once per unpacked archive entry
    pub fn install(
        url: impl Into<String>,
        archive_size: u64,
        current_file: impl Into<String>,
        total_files: u32,
        processed_files: u32,
    ) -> Self {
        Self {
            url: url.into(),
            total_bytes: archive_size,
            downloaded: archive_size,
            current_file: current_file.into(),
            total_files,
            processed_files,
        }
    }
}

/// Chunk-level events of a host application self-update download
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum DownloadEvent {
    #[serde(rename_all = "camelCase")]
    Started { content_length: Option<u64> },
    #[serde(rename_all = "camelCase")]
    Progress { chunk_length: u64 },
    Finished,
}
