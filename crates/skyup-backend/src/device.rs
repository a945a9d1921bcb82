//! Locating the mounted vario and reading its identity

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use sysinfo::Disks;
use tracing::debug;

use skyup_api::DeviceInfo;

use crate::error::BackendError;

/// Device info file, relative to the volume root
pub const DEVICE_INFO_FILE: &str = ".sys/hwsw.info";

/// Crash report directory, relative to the volume root
pub const CRASH_REPORT_DIR: &str = "cr";

/// Finds the mass-storage volume exposed by the vario
#[derive(Debug, Clone)]
pub struct DeviceLocator {
    volume_label: String,
    mount_override: Option<PathBuf>,
}

impl DeviceLocator {
    pub fn new(volume_label: impl Into<String>) -> Self {
        Self {
            volume_label: volume_label.into(),
            mount_override: None,
        }
    }

    /// Skip disk enumeration and use a fixed mount path
    #[must_use]
    pub fn with_mount_override(mut self, path: impl Into<PathBuf>) -> Self {
        self.mount_override = Some(path.into());
        self
    }

    /// Resolve the mount point of the device volume
    ///
    /// # Errors
    /// Returns `BackendError::DeviceNotFound` if no such volume is mounted
    pub fn locate(&self) -> Result<PathBuf, BackendError> {
        if let Some(path) = &self.mount_override {
            if path.is_dir() {
                return Ok(path.clone());
            }
            return Err(BackendError::DeviceNotFound(format!(
                "{} is not a directory",
                path.display()
            )));
        }

        let disks = Disks::new_with_refreshed_list();
        disks
            .iter()
            .find(|disk| {
                disk.name()
                    .to_string_lossy()
                    .eq_ignore_ascii_case(&self.volume_label)
            })
            .map(|disk| disk.mount_point().to_path_buf())
            .ok_or_else(|| BackendError::DeviceNotFound(self.volume_label.clone()))
    }
}

/// Read and parse the device info file below `mountpoint`
pub async fn read_device_info(mountpoint: &Path) -> Result<DeviceInfo, BackendError> {
    let path = mountpoint.join(DEVICE_INFO_FILE);
    debug!(path = %path.display(), "reading device info");

    let content = tokio::fs::read_to_string(&path)
        .await
        .map_err(|e| BackendError::DeviceInfo(format!("{}: {e}", path.display())))?;

    parse_device_info(&content)
}

/// Parse `hw`/`sw` from the device info file
pub fn parse_device_info(content: &str) -> Result<DeviceInfo, BackendError> {
    let dict = parse_lines(content);

    let device_name = dict
        .get("hw")
        .ok_or_else(|| BackendError::DeviceInfo("hw not found".to_string()))?;
    let software_version = dict
        .get("sw")
        .map(|sw| sw.replace("build-", ""))
        .ok_or_else(|| BackendError::DeviceInfo("sw not found".to_string()))?;

    Ok(DeviceInfo::new(device_name.as_str(), software_version))
}

/// Parse `key="value"` lines; malformed lines are skipped
pub fn parse_lines(content: &str) -> HashMap<String, String> {
    content
        .lines()
        .filter_map(|line| {
            let parts: Vec<&str> = line.split('=').collect();
            if parts.len() == 2 {
                Some((parts[0].trim().to_string(), parts[1].trim().replace('"', "")))
            } else {
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_lines() {
        let dict = parse_lines("hw=\"Skytraxx 3.0\"\nsw=\"3.0.0\"\ngarbage\na=b=c");

        assert_eq!(dict.get("hw").unwrap(), "Skytraxx 3.0");
        assert_eq!(dict.get("sw").unwrap(), "3.0.0");
        assert_eq!(dict.len(), 2);
    }

    #[test]
    fn test_parse_device_info_strips_build_prefix() {
        let info = parse_device_info("hw=\"5mini\"\nsw=\"build-2404\"\n").unwrap();

        assert_eq!(info.device_name, "5mini");
        assert_eq!(info.software_version, "2404");
    }

    #[test]
    fn test_parse_device_info_missing_keys() {
        assert!(matches!(
            parse_device_info("sw=\"build-1\""),
            Err(BackendError::DeviceInfo(_))
        ));
        assert!(matches!(
            parse_device_info("hw=\"5mini\""),
            Err(BackendError::DeviceInfo(_))
        ));
    }

    #[tokio::test]
    async fn test_read_device_info_from_mount() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join(".sys")).unwrap();
        std::fs::write(
            dir.path().join(DEVICE_INFO_FILE),
            "hw=\"5mini\"\nsw=\"build-100\"\n",
        )
        .unwrap();

        let mount = DeviceLocator::new("Skytraxx")
            .with_mount_override(dir.path())
            .locate()
            .unwrap();
        let info = read_device_info(&mount).await.unwrap();

        assert_eq!(info, DeviceInfo::new("5mini", "100"));
    }

    #[test]
    fn test_locate_missing_override() {
        let locator = DeviceLocator::new("Skytraxx").with_mount_override("/nonexistent/skyup");
        assert!(matches!(
            locator.locate(),
            Err(BackendError::DeviceNotFound(_))
        ));
    }
}
