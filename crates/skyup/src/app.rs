//! Application flow: self-update first, then the interactive update session

use std::path::PathBuf;
use std::sync::Arc;

use eyre::eyre;
use kameo::actor::{ActorRef, Spawn};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use url::Url;

use skyup_api::SessionEvent;
use skyup_backend::{DeviceLocator, LocalBackend, ReleaseUpdater};
use skyup_core::{
    AttemptStatus, BandwidthGate, Language, ResourceTable, SelfUpdateController, SessionActor,
    SessionActorArgs, StartAttempt, SetInstallerUpdate, installer_update_available,
};

use crate::config::Config;
use crate::render;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Runtime options from the command line
pub struct Options {
    pub language: Language,
    /// Development mode: no self-update
    pub dev: bool,
    pub mount_path: Option<PathBuf>,
}

fn parse_url(name: &str, raw: &str) -> eyre::Result<Url> {
    Url::parse(raw).map_err(|e| eyre!("invalid {name} url {raw}: {e}"))
}

/// Apply a pending self-update, which takes over the whole session
///
/// Returns when there is nothing to apply. A failed check is logged and the
/// device session goes ahead; a failed download or install is returned.
async fn self_update_first(controller: &SelfUpdateController) -> eyre::Result<()> {
    match controller.check().await {
        Ok(Some(release)) => {
            controller.apply(&release).await?;
        }
        Ok(None) => {}
        Err(e) => warn!(error = %e, "self-update check failed, continuing without it"),
    }
    Ok(())
}

pub async fn run(config: Config, options: Options) -> eyre::Result<()> {
    let table = Arc::new(ResourceTable::from_urls(&config.resources)?);
    let texts = options.language.texts();

    let (event_tx, _) = broadcast::channel(256);
    let renderer = tokio::spawn(render::render_events(event_tx.subscribe(), texts));

    if options.dev {
        debug!("development mode, skipping self-update");
    } else if let Some(manifest) = &config.self_update.manifest_url {
        let updater = Arc::new(ReleaseUpdater::new(parse_url("manifest", manifest)?)?);
        let controller = SelfUpdateController::new(
            updater,
            config.self_update.clone(),
            VERSION,
            event_tx.clone(),
        );
        self_update_first(&controller).await?;
    }

    let mut locator = DeviceLocator::new(config.device.volume_label.clone());
    if let Some(path) = options.mount_path.or(config.device.mount_path.clone()) {
        locator = locator.with_mount_override(path);
    }
    let endpoint = config
        .diagnostics
        .endpoint
        .as_deref()
        .map(|raw| parse_url("diagnostics", raw))
        .transpose()?;
    let backend = Arc::new(LocalBackend::new(locator, endpoint)?);

    let installer_update =
        installer_update_available(backend.as_ref(), table.app_version_url(), VERSION).await;

    let session = SessionActor::spawn(SessionActorArgs {
        config: config.session.clone(),
        table,
        gate: BandwidthGate::from_config(&config.bandwidth),
        backend,
        language: options.language,
        event_tx: event_tx.clone(),
    });
    session
        .tell(SetInstallerUpdate {
            available: installer_update,
        })
        .await
        .map_err(|e| eyre!("{e}"))?;

    interact(&session, event_tx.subscribe(), texts.update).await?;

    drop(event_tx);
    let _ = renderer.await;
    Ok(())
}

fn prompt(label: &str) {
    println!("[Enter] {label}   [q] quit");
}

async fn interact(
    session: &ActorRef<SessionActor>,
    mut events: broadcast::Receiver<SessionEvent>,
    label: &str,
) -> eyre::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    prompt(label);

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                if line.trim().eq_ignore_ascii_case("q") {
                    break;
                }
                match session.ask(StartAttempt).await.map_err(|e| eyre!("{e}"))? {
                    AttemptStatus::Started { attempt } => info!(attempt, "update started"),
                    AttemptStatus::AlreadyRunning => debug!("update already running"),
                }
            }
            event = events.recv() => match event {
                Ok(event) if event.is_terminal() => prompt(label),
                Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => {}
                Err(broadcast::error::RecvError::Closed) => break,
            },
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::convert::Infallible;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use tokio::sync::mpsc;

    use skyup_api::DownloadEvent;
    use skyup_backend::{AppRelease, AppUpdater, BackendError};
    use skyup_core::SelfUpdateConfig;

    use super::*;

    struct MockUpdater {
        check: Result<Option<AppRelease>, BackendError>,
        install: Result<(), BackendError>,
        calls: Mutex<Vec<&'static str>>,
    }

    impl MockUpdater {
        fn new(check: Result<Option<AppRelease>, BackendError>) -> Self {
            Self {
                check,
                install: Ok(()),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<&'static str> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl AppUpdater for MockUpdater {
        async fn is_installed_location(&self) -> Result<bool, BackendError> {
            Ok(true)
        }

        async fn check_for_update(&self, _current: &str) -> Result<Option<AppRelease>, BackendError> {
            self.calls.lock().unwrap().push("check");
            self.check.clone()
        }

        async fn download_and_install(
            &self,
            _release: &AppRelease,
            _events: mpsc::UnboundedSender<DownloadEvent>,
        ) -> Result<(), BackendError> {
            self.calls.lock().unwrap().push("install");
            self.install.clone()
        }

        async fn restart(&self) -> Result<Infallible, BackendError> {
            self.calls.lock().unwrap().push("restart");
            Err(BackendError::SelfUpdate("relaunch blocked in tests".into()))
        }
    }

    fn controller(updater: Arc<MockUpdater>) -> SelfUpdateController {
        let config = SelfUpdateConfig {
            enabled: true,
            manifest_url: Some("https://example.com/latest.json".into()),
            verify_install_location: false,
        };
        let (event_tx, _) = broadcast::channel(16);
        SelfUpdateController::new(updater, config, "0.3.0", event_tx)
    }

    fn release() -> AppRelease {
        AppRelease {
            version: "0.4.0".into(),
            url: "https://example.com/skyup".into(),
            notes: None,
        }
    }

    #[tokio::test]
    async fn test_failed_check_continues_to_session() {
        let updater = Arc::new(MockUpdater::new(Err(BackendError::Network(
            "manifest returned 404".into(),
        ))));

        assert!(self_update_first(&controller(updater.clone())).await.is_ok());
        assert_eq!(updater.calls(), vec!["check"]);
    }

    #[tokio::test]
    async fn test_up_to_date_continues_to_session() {
        let updater = Arc::new(MockUpdater::new(Ok(None)));

        assert!(self_update_first(&controller(updater.clone())).await.is_ok());
        assert_eq!(updater.calls(), vec!["check"]);
    }

    #[tokio::test]
    async fn test_failed_install_is_returned() {
        let mut updater = MockUpdater::new(Ok(Some(release())));
        updater.install = Err(BackendError::Network("connection reset".into()));
        let updater = Arc::new(updater);

        assert!(self_update_first(&controller(updater.clone())).await.is_err());
        assert_eq!(updater.calls(), vec!["check", "install"]);
    }
}
