//! skyup-backend: Device and host application backends
//!
//! Defines the `DeviceBackend` and `AppUpdater` seams consumed by the update
//! orchestrator, plus implementations for a locally mounted vario and a
//! manifest-driven application updater.

pub mod device;
pub mod error;
pub mod http;
pub mod local;
pub mod release;
pub mod traits;
pub mod version;

pub use device::{DeviceLocator, parse_device_info};
pub use error::BackendError;
pub use local::LocalBackend;
pub use release::ReleaseUpdater;
pub use traits::{AppRelease, AppUpdater, DeviceBackend};
