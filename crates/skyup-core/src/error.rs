//! Core error types for skyup-core

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::state::SessionState;

/// Errors that can occur in the update orchestrator
#[derive(Error, Debug, Clone)]
pub enum CoreError {
    /// Device query failed
    #[error("device not found: {0}")]
    DeviceNotFound(String),

    /// Device model is outside the supported set
    #[error("unsupported device: {0}")]
    UnsupportedDevice(String),

    /// Progress event for a URL that is not a known resource
    #[error("progress event for unknown resource: {0}")]
    UnknownResource(String),

    /// Any failure during the download phase
    #[error("update transfer failed: {0}")]
    UpdateTransfer(String),

    /// Host application self-update failed
    #[error("self-update failed: {0}")]
    SelfUpdate(String),

    /// Invalid state transition attempted
    #[error("invalid state transition from {from} to {to}")]
    InvalidTransition {
        /// Current state
        from: SessionState,
        /// Attempted target state
        to: SessionState,
    },

    /// Actor communication error
    #[error("actor communication error: {0}")]
    ActorError(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    ConfigError(String),
}

/// User-visible classification of a failed attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    DeviceNotFound,
    UnsupportedDevice,
    UpdateError,
}

impl CoreError {
    /// Classify for display; everything past the device check is an update error
    #[must_use]
    pub fn class(&self) -> ErrorClass {
        match self {
            CoreError::DeviceNotFound(_) => ErrorClass::DeviceNotFound,
            CoreError::UnsupportedDevice(_) => ErrorClass::UnsupportedDevice,
            _ => ErrorClass::UpdateError,
        }
    }
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorClass::DeviceNotFound => "device_not_found",
            ErrorClass::UnsupportedDevice => "unsupported_device",
            ErrorClass::UpdateError => "update_error",
        };
        write!(f, "{s}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_download_phase_errors_are_update_errors() {
        assert_eq!(
            CoreError::UnknownResource("https://x".into()).class(),
            ErrorClass::UpdateError
        );
        assert_eq!(
            CoreError::UpdateTransfer("reset".into()).class(),
            ErrorClass::UpdateError
        );
        assert_eq!(
            CoreError::DeviceNotFound("no volume".into()).class(),
            ErrorClass::DeviceNotFound
        );
        assert_eq!(
            CoreError::UnsupportedDevice("3".into()).class(),
            ErrorClass::UnsupportedDevice
        );
    }
}
