//! Configuration types for update sessions and the host application

use std::time::Duration;

use serde::{Deserialize, Serialize};

const ESSENTIALS_URL: &str = "https://www.skytraxx.org/skytraxx5mini/skytraxx5mini-essentials.tar";
const SYSTEM_URL: &str = "https://www.skytraxx.org/skytraxx5mini/skytraxx5mini-system.tar";
const APP_INSTALLER_URL: &str = "https://www.skytraxx.org/skytraxx5mini/skytraxx5mini-app.tar";
const APP_VERSION_URL: &str = "https://www.skytraxx.org/skytraxx5mini/skytraxx5mini-app.ver";

/// Update session settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Device model names that may be updated
    #[serde(default = "default_supported_devices")]
    pub supported_devices: Vec<String>,
}

fn default_supported_devices() -> Vec<String> {
    vec!["5mini".to_string()]
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            supported_devices: default_supported_devices(),
        }
    }
}

impl SessionConfig {
    /// Exact, case-sensitive membership check
    #[must_use]
    pub fn supports(&self, device_name: &str) -> bool {
        self.supported_devices.iter().any(|d| d == device_name)
    }
}

/// Remote locations of the update bundles
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceUrls {
    #[serde(default = "default_essentials")]
    pub essentials: String,
    #[serde(default = "default_system")]
    pub system: String,
    #[serde(default = "default_app_installer")]
    pub app_installer: String,
    /// Plain text file holding the current installer version
    #[serde(default = "default_app_version")]
    pub app_version: String,
}

fn default_essentials() -> String {
    ESSENTIALS_URL.to_string()
}

fn default_system() -> String {
    SYSTEM_URL.to_string()
}

fn default_app_installer() -> String {
    APP_INSTALLER_URL.to_string()
}

fn default_app_version() -> String {
    APP_VERSION_URL.to_string()
}

impl Default for ResourceUrls {
    fn default() -> Self {
        Self {
            essentials: default_essentials(),
            system: default_system(),
            app_installer: default_app_installer(),
            app_version: default_app_version(),
        }
    }
}

/// Bandwidth probe settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BandwidthConfig {
    /// Length of the probe window in milliseconds
    #[serde(default = "default_probe_window_ms")]
    pub probe_window_ms: u64,
    /// Minimum essentials bytes at the end of the window
    #[serde(default = "default_threshold_bytes")]
    pub threshold_bytes: u64,
}

fn default_probe_window_ms() -> u64 {
    2000
}

fn default_threshold_bytes() -> u64 {
    200 * 1024
}

impl Default for BandwidthConfig {
    fn default() -> Self {
        Self {
            probe_window_ms: default_probe_window_ms(),
            threshold_bytes: default_threshold_bytes(),
        }
    }
}

impl BandwidthConfig {
    #[must_use]
    pub fn probe_window(&self) -> Duration {
        Duration::from_millis(self.probe_window_ms)
    }
}

/// Host application self-update settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelfUpdateConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Release manifest; self-update is skipped when unset
    #[serde(default)]
    pub manifest_url: Option<String>,
    /// Refuse to self-update when not running from the install location
    #[serde(default = "default_verify_install_location")]
    pub verify_install_location: bool,
}

fn default_enabled() -> bool {
    true
}

fn default_verify_install_location() -> bool {
    cfg!(target_os = "macos")
}

impl Default for SelfUpdateConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            manifest_url: None,
            verify_install_location: default_verify_install_location(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supported_devices_exact_match() {
        let config = SessionConfig::default();
        assert!(config.supports("5mini"));
        assert!(!config.supports("5Mini"));
        assert!(!config.supports("5mini "));
        assert!(!config.supports("3"));
    }

    #[test]
    fn test_bandwidth_defaults() {
        let config = BandwidthConfig::default();
        assert_eq!(config.threshold_bytes, 204_800);
        assert_eq!(config.probe_window(), Duration::from_secs(2));
    }

    #[test]
    fn test_resource_defaults_point_at_skytraxx() {
        let urls = ResourceUrls::default();
        assert!(urls.essentials.ends_with("skytraxx5mini-essentials.tar"));
        assert!(urls.system.ends_with("skytraxx5mini-system.tar"));
        assert!(urls.app_installer.ends_with("skytraxx5mini-app.tar"));
        assert!(urls.app_version.ends_with("skytraxx5mini-app.ver"));
    }
}
