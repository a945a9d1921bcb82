//! Render events published by the update orchestrator

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SessionEvent {
    StateChanged {
        attempt: u64,
        from: String,
        to: String,
    },
    DeviceDetected {
        attempt: u64,
        device_name: String,
        software_version: String,
    },
    TransferProgress {
        attempt: u64,
        resource: String,
        download_percent: u8,
        install_percent: u8,
        current_file: String,
    },
    AttemptFailed {
        attempt: u64,
        class: String,
        message: String,
        at: DateTime<Utc>,
    },
    AttemptSucceeded {
        attempt: u64,
        message: String,
        at: DateTime<Utc>,
    },
    SelfUpdateProgress {
        percent: u8,
    },
}

impl SessionEvent {
    /// Whether this event ends an update attempt
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionEvent::AttemptFailed { .. } | SessionEvent::AttemptSucceeded { .. }
        )
    }
}
