//! Update session state machine types

use std::fmt;

use serde::{Deserialize, Serialize};

/// States of the `SessionActor` state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    #[default]
    Idle,
    DeviceCheckPending,
    DeviceCheckFailed,
    DownloadPending,
    DownloadFailed,
    Succeeded,
}

impl SessionState {
    /// Whether an attempt has ended in this state
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            SessionState::DeviceCheckFailed | SessionState::DownloadFailed | SessionState::Succeeded
        )
    }

    /// Whether an attempt is in progress
    #[must_use]
    pub fn is_busy(self) -> bool {
        matches!(
            self,
            SessionState::DeviceCheckPending | SessionState::DownloadPending
        )
    }

    /// Check whether moving to `next` is a legal transition
    #[must_use]
    pub fn can_transition_to(self, next: SessionState) -> bool {
        use SessionState::{
            DeviceCheckFailed, DeviceCheckPending, DownloadFailed, DownloadPending, Idle,
            Succeeded,
        };

        match (self, next) {
            (Idle, DeviceCheckPending)
            | (DeviceCheckPending, DeviceCheckFailed | DownloadPending)
            | (DownloadPending, DownloadFailed | Succeeded) => true,
            (from, Idle) => from.is_terminal(),
            _ => false,
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SessionState::Idle => "idle",
            SessionState::DeviceCheckPending => "device_check_pending",
            SessionState::DeviceCheckFailed => "device_check_failed",
            SessionState::DownloadPending => "download_pending",
            SessionState::DownloadFailed => "download_failed",
            SessionState::Succeeded => "succeeded",
        };
        write!(f, "{s}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path_transitions() {
        assert!(SessionState::Idle.can_transition_to(SessionState::DeviceCheckPending));
        assert!(SessionState::DeviceCheckPending.can_transition_to(SessionState::DownloadPending));
        assert!(SessionState::DownloadPending.can_transition_to(SessionState::Succeeded));
        assert!(SessionState::Succeeded.can_transition_to(SessionState::Idle));
    }

    #[test]
    fn test_failures_reenter_idle() {
        assert!(SessionState::DeviceCheckPending.can_transition_to(SessionState::DeviceCheckFailed));
        assert!(SessionState::DownloadPending.can_transition_to(SessionState::DownloadFailed));
        assert!(SessionState::DeviceCheckFailed.can_transition_to(SessionState::Idle));
        assert!(SessionState::DownloadFailed.can_transition_to(SessionState::Idle));
    }

    #[test]
    fn test_illegal_transitions() {
        assert!(!SessionState::Idle.can_transition_to(SessionState::DownloadPending));
        assert!(!SessionState::DeviceCheckPending.can_transition_to(SessionState::Succeeded));
        assert!(!SessionState::DownloadPending.can_transition_to(SessionState::Idle));
        assert!(!SessionState::DeviceCheckFailed.can_transition_to(SessionState::DownloadPending));
    }

    #[test]
    fn test_busy_states() {
        assert!(SessionState::DeviceCheckPending.is_busy());
        assert!(SessionState::DownloadPending.is_busy());
        assert!(!SessionState::Idle.is_busy());
        assert!(!SessionState::Succeeded.is_busy());
    }
}
