//! Observable state of the update session

use serde::Serialize;

use skyup_api::DeviceInfo;

use crate::error::ErrorClass;
use crate::progress::Transfers;

/// Classified failure of the last attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionFailure {
    pub class: ErrorClass,
    /// Localized message shown to the user
    pub message: String,
    /// Underlying cause, for logs
    pub cause: String,
}

/// Current attempt's transfers and outcome
///
/// `error` and `success_message` are never both set, and `loading` is false
/// whenever either is set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UpdateSession {
    pub transfers: Transfers,
    pub device: Option<DeviceInfo>,
    pub error: Option<SessionFailure>,
    pub loading: bool,
    pub success_message: Option<String>,
}

impl UpdateSession {
    /// Clear the previous outcome and mark an attempt as running
    pub fn begin(&mut self) {
        *self = Self {
            loading: true,
            ..Self::default()
        };
    }

    /// Record a failure; transfer records stay as they were
    pub fn fail(&mut self, failure: SessionFailure) {
        self.error = Some(failure);
        self.success_message = None;
        self.loading = false;
    }

    pub fn succeed(&mut self, message: impl Into<String>) {
        self.success_message = Some(message.into());
        self.error = None;
        self.loading = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::ResourceKind;

    #[test]
    fn test_begin_clears_previous_outcome() {
        let mut session = UpdateSession::default();
        session.transfers.get_mut(ResourceKind::System).downloaded_bytes = 42;
        session.fail(SessionFailure {
            class: ErrorClass::UpdateError,
            message: "failed".into(),
            cause: "reset".into(),
        });
        assert_eq!(session.transfers.system.downloaded_bytes, 42);

        session.begin();
        assert!(session.loading);
        assert!(session.error.is_none());
        assert_eq!(session.transfers.system.downloaded_bytes, 0);
    }

    #[test]
    fn test_outcomes_are_exclusive() {
        let mut session = UpdateSession::default();
        session.begin();
        session.fail(SessionFailure {
            class: ErrorClass::DeviceNotFound,
            message: "not found".into(),
            cause: "no volume".into(),
        });
        session.succeed("done");

        assert!(session.error.is_none());
        assert_eq!(session.success_message.as_deref(), Some("done"));
        assert!(!session.loading);
    }
}
