//! Error types for skyup-backend

use thiserror::Error;

/// Errors reported by backend operations
#[derive(Error, Debug, Clone)]
pub enum BackendError {
    /// No mounted volume carries the device label
    #[error("device not found: {0}")]
    DeviceNotFound(String),

    /// The device info file is missing or incomplete
    #[error("invalid device info: {0}")]
    DeviceInfo(String),

    /// HTTP request failed or returned an error status
    #[error("network error: {0}")]
    Network(String),

    /// Archive could not be read or unpacked
    #[error("archive error: {0}")]
    Archive(String),

    /// Local file system operation failed
    #[error("I/O error: {0}")]
    Io(String),

    /// Diagnostics upload failed
    #[error("diagnostics upload failed: {0}")]
    Diagnostics(String),

    /// Self-update install or restart failed
    #[error("self-update failed: {0}")]
    SelfUpdate(String),

    /// Version string could not be parsed
    #[error("invalid version: {0}")]
    Version(String),
}

impl From<std::io::Error> for BackendError {
    fn from(e: std::io::Error) -> Self {
        BackendError::Io(e.to_string())
    }
}

impl From<reqwest::Error> for BackendError {
    fn from(e: reqwest::Error) -> Self {
        BackendError::Network(e.to_string())
    }
}
