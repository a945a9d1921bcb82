//! Line-based console rendering of session events

use std::collections::HashMap;

use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, warn};

use skyup_api::SessionEvent;
use skyup_core::{ResourceKind, Texts};

/// Progress line for one bundle
pub fn transfer_line(
    texts: &Texts,
    kind: ResourceKind,
    download_percent: u8,
    install_percent: u8,
    current_file: &str,
) -> String {
    let mut line = format!(
        "{}: {download_percent:>3}%  {}: {install_percent:>3}%",
        texts.download_label(kind),
        texts.install_label(kind),
    );
    if !current_file.is_empty() {
        line.push_str("  ");
        line.push_str(current_file);
    }
    line
}

fn resource_kind(name: &str) -> Option<ResourceKind> {
    ResourceKind::ALL.into_iter().find(|kind| kind.as_str() == name)
}

/// Print events until the channel closes
pub async fn render_events(mut events: broadcast::Receiver<SessionEvent>, texts: &'static Texts) {
    let mut last: HashMap<ResourceKind, (u8, u8)> = HashMap::new();
    let mut last_self_update = None;

    loop {
        let event = match events.recv().await {
            Ok(event) => event,
            Err(RecvError::Lagged(skipped)) => {
                warn!(skipped, "renderer lagged behind");
                continue;
            }
            Err(RecvError::Closed) => break,
        };

        match event {
            SessionEvent::StateChanged { to, .. } => {
                if to == "device_check_pending" {
                    last.clear();
                }
                debug!(state = %to, "rendered state");
            }
            SessionEvent::DeviceDetected {
                device_name,
                software_version,
                ..
            } => println!("Skytraxx {device_name} ({software_version})"),
            SessionEvent::TransferProgress {
                resource,
                download_percent,
                install_percent,
                current_file,
                ..
            } => {
                let Some(kind) = resource_kind(&resource) else {
                    continue;
                };
                let percents = (download_percent, install_percent);
                if last.insert(kind, percents) != Some(percents) {
                    println!(
                        "{}",
                        transfer_line(texts, kind, download_percent, install_percent, &current_file)
                    );
                }
            }
            SessionEvent::AttemptFailed { message, .. } => eprintln!("{message}"),
            SessionEvent::AttemptSucceeded { message, .. } => println!("{message}"),
            SessionEvent::SelfUpdateProgress { percent } => {
                if last_self_update != Some(percent) {
                    last_self_update = Some(percent);
                    println!("{}: {percent:>3}%", texts.self_update);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use skyup_core::Language;

    use super::*;

    #[test]
    fn test_transfer_line_labels() {
        let line = transfer_line(Language::En.texts(), ResourceKind::System, 50, 0, "");
        assert_eq!(line, "Download system files:  50%  Update system files:   0%");
    }

    #[test]
    fn test_transfer_line_with_file() {
        let line = transfer_line(Language::De.texts(), ResourceKind::Essentials, 100, 25, "fw/a.bin");
        assert!(line.starts_with("Download essentieller Dateien: 100%"));
        assert!(line.ends_with("  fw/a.bin"));
    }

    #[test]
    fn test_resource_kind_lookup() {
        assert_eq!(resource_kind("app_installer"), Some(ResourceKind::AppInstaller));
        assert_eq!(resource_kind("firmware"), None);
    }
}
