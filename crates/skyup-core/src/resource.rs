//! Closed set of update bundles and their URL lookup table

use std::fmt;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::ResourceUrls;
use crate::error::CoreError;

/// One of the three bundles an update attempt may transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// Mandatory bundle, always transferred first
    Essentials,
    /// Optional system bundle
    System,
    /// Optional desktop installer bundle
    AppInstaller,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 3] = [
        ResourceKind::Essentials,
        ResourceKind::System,
        ResourceKind::AppInstaller,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ResourceKind::Essentials => "essentials",
            ResourceKind::System => "system",
            ResourceKind::AppInstaller => "app_installer",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validated mapping between bundle URLs and resource kinds
///
/// Built once at startup. Every URL is absolute and the bundle URLs are
/// pairwise distinct, so a progress event maps to at most one kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceTable {
    essentials: String,
    system: String,
    app_installer: String,
    app_version: String,
}

impl ResourceTable {
    /// Validate the configured URLs
    ///
    /// # Errors
    ///
    /// Returns `CoreError::ConfigError` if a URL does not parse or two bundle
    /// URLs are identical.
    pub fn from_urls(urls: &ResourceUrls) -> Result<Self, CoreError> {
        for (name, raw) in [
            ("essentials", &urls.essentials),
            ("system", &urls.system),
            ("app_installer", &urls.app_installer),
            ("app_version", &urls.app_version),
        ] {
            Url::parse(raw)
                .map_err(|e| CoreError::ConfigError(format!("invalid {name} url {raw}: {e}")))?;
        }

        let bundles = [&urls.essentials, &urls.system, &urls.app_installer];
        for (i, a) in bundles.iter().enumerate() {
            if bundles[i + 1..].contains(a) {
                return Err(CoreError::ConfigError(format!(
                    "bundle url {a} is configured more than once"
                )));
            }
        }

        Ok(Self {
            essentials: urls.essentials.clone(),
            system: urls.system.clone(),
            app_installer: urls.app_installer.clone(),
            app_version: urls.app_version.clone(),
        })
    }

    #[must_use]
    pub fn url(&self, kind: ResourceKind) -> &str {
        match kind {
            ResourceKind::Essentials => &self.essentials,
            ResourceKind::System => &self.system,
            ResourceKind::AppInstaller => &self.app_installer,
        }
    }

    /// Resolve a progress event URL; exact string match
    #[must_use]
    pub fn kind_of(&self, url: &str) -> Option<ResourceKind> {
        ResourceKind::ALL.into_iter().find(|kind| self.url(*kind) == url)
    }

    /// Installer version descriptor URL
    #[must_use]
    pub fn app_version_url(&self) -> &str {
        &self.app_version
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_table_resolves_every_kind() {
        let table = ResourceTable::from_urls(&ResourceUrls::default()).unwrap();
        for kind in ResourceKind::ALL {
            assert_eq!(table.kind_of(table.url(kind)), Some(kind));
        }
    }

    #[test]
    fn test_unknown_url_does_not_resolve() {
        let table = ResourceTable::from_urls(&ResourceUrls::default()).unwrap();
        assert_eq!(table.kind_of("https://www.skytraxx.org/other.tar"), None);
        assert_eq!(table.kind_of(table.app_version_url()), None);
    }

    #[test]
    fn test_duplicate_bundle_urls_rejected() {
        let mut urls = ResourceUrls::default();
        urls.system = urls.essentials.clone();
        let err = ResourceTable::from_urls(&urls).unwrap_err();
        assert!(matches!(err, CoreError::ConfigError(_)));
    }

    #[test]
    fn test_relative_url_rejected() {
        let urls = ResourceUrls {
            app_installer: "skytraxx5mini-app.tar".to_string(),
            ..ResourceUrls::default()
        };
        assert!(ResourceTable::from_urls(&urls).is_err());
    }
}
