//! skyup-api: Shared wire types
//!
//! Progress notifications published by the backend, device descriptors and the
//! render events emitted by the update orchestrator. Used across the backend,
//! the core and the front end.

pub mod device;
pub mod events;
pub mod progress;

pub use device::DeviceInfo;
pub use events::SessionEvent;
pub use progress::{DownloadEvent, UpdateProgress};
