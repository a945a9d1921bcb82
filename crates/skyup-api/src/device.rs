//! Device descriptor types

use serde::{Deserialize, Serialize};

/// Snapshot of the connected vario, read once per update attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceInfo {
    /// Hardware model name (e.g. `5mini`)
    pub device_name: String,
    /// Firmware build number without the `build-` prefix
    pub software_version: String,
}

impl DeviceInfo {
    pub fn new(device_name: impl Into<String>, software_version: impl Into<String>) -> Self {
        Self {
            device_name: device_name.into(),
            software_version: software_version.into(),
        }
    }
}
