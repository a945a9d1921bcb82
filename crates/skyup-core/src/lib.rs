//! skyup-core: Update orchestration for Skytraxx varios
//!
//! Implements the `SessionActor` using the kameo framework, together with the
//! bundle progress aggregation, the bandwidth gate and the host application
//! self-update flow.

pub mod actor;
pub mod config;
pub mod download;
pub mod error;
pub mod gate;
pub mod lang;
pub mod message;
pub mod probe;
pub mod progress;
pub mod resource;
pub mod self_update;
pub mod session;
pub mod state;

pub use actor::{SessionActor, SessionActorArgs};
pub use config::{BandwidthConfig, ResourceUrls, SelfUpdateConfig, SessionConfig};
pub use download::DownloadPhase;
pub use error::{CoreError, ErrorClass};
pub use gate::{BandwidthGate, GateDecision, MandatoryStatus};
pub use lang::{Language, Texts};
pub use message::{AttemptStatus, GetSession, SessionSnapshot, SetInstallerUpdate, StartAttempt};
pub use probe::TransferProbe;
pub use progress::{ProgressAggregator, ResourceTransfer, Transfers};
pub use resource::{ResourceKind, ResourceTable};
pub use self_update::{DownloadTracker, SelfUpdateController, installer_update_available};
pub use session::{SessionFailure, UpdateSession};
pub use state::SessionState;
