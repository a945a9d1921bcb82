//! User-facing texts in the supported languages

use serde::{Deserialize, Serialize};

use crate::error::ErrorClass;
use crate::resource::ResourceKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    De,
}

impl Language {
    /// Pick a language from a locale tag such as `de_DE.UTF-8`
    #[must_use]
    pub fn from_locale(locale: &str) -> Self {
        if locale.to_ascii_lowercase().starts_with("de") {
            Language::De
        } else {
            Language::En
        }
    }

    #[must_use]
    pub fn texts(self) -> &'static Texts {
        match self {
            Language::En => &EN,
            Language::De => &DE,
        }
    }
}

/// Label and message table for one language
#[derive(Debug)]
pub struct Texts {
    pub download_essentials: &'static str,
    pub download_system: &'static str,
    pub download_app: &'static str,
    pub update_essentials: &'static str,
    pub update_system: &'static str,
    pub update_app: &'static str,
    pub device_not_found: &'static str,
    pub unsupported_device: &'static str,
    pub update_error: &'static str,
    pub success: &'static str,
    pub update: &'static str,
    pub self_update: &'static str,
}

impl Texts {
    #[must_use]
    pub fn download_label(&self, kind: ResourceKind) -> &'static str {
        match kind {
            ResourceKind::Essentials => self.download_essentials,
            ResourceKind::System => self.download_system,
            ResourceKind::AppInstaller => self.download_app,
        }
    }

    #[must_use]
    pub fn install_label(&self, kind: ResourceKind) -> &'static str {
        match kind {
            ResourceKind::Essentials => self.update_essentials,
            ResourceKind::System => self.update_system,
            ResourceKind::AppInstaller => self.update_app,
        }
    }

    #[must_use]
    pub fn error_message(&self, class: ErrorClass) -> &'static str {
        match class {
            ErrorClass::DeviceNotFound => self.device_not_found,
            ErrorClass::UnsupportedDevice => self.unsupported_device,
            ErrorClass::UpdateError => self.update_error,
        }
    }
}

static EN: Texts = Texts {
    download_essentials: "Download essential files",
    download_system: "Download system files",
    download_app: "Download SkyUp",
    update_essentials: "Update essential files",
    update_system: "Update system files",
    update_app: "Update SkyUp",
    device_not_found: "Skytraxx Vario not found. Is it connected?",
    unsupported_device: "Only Skytraxx 5 Mini devices can be updated at the moment.",
    update_error: "Error updating. Are you connected to the internet? Is the Skytraxx 5 Mini connected?",
    success: "Your vario has been successfully updated! You can close the app now. Afterwards, eject the drive!",
    update: "Update Vario",
    self_update: "Updating SkyUp",
};

static DE: Texts = Texts {
    download_essentials: "Download essentieller Dateien",
    download_system: "Download System Dateien",
    download_app: "Download SkyUp",
    update_essentials: "Essentielle Dateien aktualisieren",
    update_system: "System Dateien aktualisieren",
    update_app: "Aktualisiere SkyUp",
    device_not_found: "Skytraxx Vario konnte nicht gefunden werden. Ist es angeschlossen?",
    unsupported_device: "Im Moment können nur Skytraxx 5 Mini Geräte aktualisiert werden.",
    update_error: "Fehler beim Aktualisieren. Bist du mit dem Internet verbunden? Ist das Skytraxx 5 Mini angeschlossen?",
    success: "Dein Vario wurde erfolgreich aktualisiert! Du kannst die App jetzt schließen. Danach das Laufwerk auswerfen!",
    update: "Vario aktualisieren",
    self_update: "SkyUp wird aktualisiert",
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_locale() {
        assert_eq!(Language::from_locale("de_DE.UTF-8"), Language::De);
        assert_eq!(Language::from_locale("DE"), Language::De);
        assert_eq!(Language::from_locale("en_US"), Language::En);
        assert_eq!(Language::from_locale(""), Language::En);
    }

    #[test]
    fn test_error_messages_by_class() {
        let texts = Language::En.texts();
        assert_eq!(
            texts.error_message(ErrorClass::UnsupportedDevice),
            "Only Skytraxx 5 Mini devices can be updated at the moment."
        );
        assert_eq!(
            Language::De.texts().install_label(ResourceKind::System),
            "System Dateien aktualisieren"
        );
    }
}
