//! Message types for actor communication
//!
//! Message handlers are implemented in `actor::session`.

use kameo_macros::Reply;

use skyup_api::DeviceInfo;

use crate::error::CoreError;
use crate::progress::ResourceTransfer;
use crate::resource::ResourceKind;
use crate::session::UpdateSession;
use crate::state::SessionState;

/// Begin an update attempt; a no-op while one is running
#[derive(Debug)]
pub struct StartAttempt;

/// Reply to `StartAttempt`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptStatus {
    Started { attempt: u64 },
    AlreadyRunning,
}

/// Record whether a newer desktop installer is available
#[derive(Debug)]
pub struct SetInstallerUpdate {
    pub available: bool,
}

/// Query the session state
#[derive(Debug)]
pub struct GetSession;

/// Session snapshot
#[derive(Debug, Clone, Reply)]
pub struct SessionSnapshot {
    pub attempt: u64,
    pub state: SessionState,
    pub session: UpdateSession,
    pub installer_update: bool,
}

// ============================================================================
// Attempt task reports
// ============================================================================

/// Device passed the model check
#[derive(Debug)]
pub(crate) struct DeviceAccepted {
    pub attempt: u64,
    pub device: DeviceInfo,
}

/// Updated transfer record of one bundle
#[derive(Debug)]
pub(crate) struct ReportProgress {
    pub attempt: u64,
    pub kind: ResourceKind,
    pub transfer: ResourceTransfer,
}

/// Final outcome of an attempt
#[derive(Debug)]
pub(crate) struct CompleteAttempt {
    pub attempt: u64,
    pub outcome: Result<(), CoreError>,
}
