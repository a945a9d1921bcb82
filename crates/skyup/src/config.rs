//! Configuration loading and types

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use skyup_core::{BandwidthConfig, ResourceUrls, SelfUpdateConfig, SessionConfig};

/// Top-level configuration for the skyup application
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub resources: ResourceUrls,
    #[serde(default)]
    pub bandwidth: BandwidthConfig,
    #[serde(default)]
    pub device: DeviceConfig,
    #[serde(default)]
    pub diagnostics: DiagnosticsConfig,
    #[serde(default)]
    pub self_update: SelfUpdateConfig,
    #[serde(default)]
    pub log: LogConfig,
}

/// How the vario's mass storage volume is found
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Volume label the vario mounts under
    #[serde(default = "default_volume_label")]
    pub volume_label: String,
    /// Fixed mount point, bypassing volume discovery
    #[serde(default)]
    pub mount_path: Option<PathBuf>,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            volume_label: default_volume_label(),
            mount_path: None,
        }
    }
}

fn default_volume_label() -> String {
    "Skytraxx".to_string()
}

/// Crash report upload
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiagnosticsConfig {
    /// Reports stay on the device when unset
    #[serde(default)]
    pub endpoint: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Log level (trace, debug, info, warn, error); `RUST_LOG` takes precedence
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from file
    ///
    /// # Errors
    /// Returns error if file cannot be read or parsed
    pub fn load(path: &Path) -> eyre::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| eyre::eyre!("reading {}: {e}", path.display()))?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load from the environment, the working directory or the user config dir
    ///
    /// # Errors
    /// Returns error if a config file exists but cannot be parsed
    pub fn load_default() -> eyre::Result<Self> {
        if let Ok(path) = std::env::var("SKYUP_CONFIG") {
            return Self::load(Path::new(&path));
        }

        let mut paths = vec![PathBuf::from("skyup.toml")];
        if let Some(dir) = dirs::config_dir() {
            paths.push(dir.join("skyup/skyup.toml"));
        }

        for path in paths {
            if path.exists() {
                return Self::load(&path);
            }
        }

        tracing::warn!("no config file found, using defaults");
        Ok(Config::default())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_empty_file_yields_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.session.supported_devices, vec!["5mini".to_string()]);
        assert_eq!(config.bandwidth.threshold_bytes, 204_800);
        assert_eq!(config.device.volume_label, "Skytraxx");
        assert!(config.diagnostics.endpoint.is_none());
        assert_eq!(config.log.level, "info");
    }

    #[test]
    fn test_partial_sections_keep_other_defaults() {
        let config: Config = toml::from_str(
            r#"
            [bandwidth]
            probe_window_ms = 500

            [resources]
            system = "https://mirror.example.com/system.tar"

            [device]
            mount_path = "/media/vario"
            "#,
        )
        .unwrap();

        assert_eq!(config.bandwidth.probe_window_ms, 500);
        assert_eq!(config.bandwidth.threshold_bytes, 204_800);
        assert_eq!(config.resources.system, "https://mirror.example.com/system.tar");
        assert_eq!(config.resources.essentials, ResourceUrls::default().essentials);
        assert_eq!(config.device.mount_path, Some(PathBuf::from("/media/vario")));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[session]\nsupported_devices = [\"5mini\", \"6\"]").unwrap();

        let config = Config::load(file.path()).unwrap();
        assert!(config.session.supports("6"));
    }

    #[test]
    fn test_load_rejects_invalid_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[bandwidth\nthreshold_bytes = 1").unwrap();

        assert!(Config::load(file.path()).is_err());
    }
}
