//! Background task driving a single update attempt

use std::sync::Arc;

use kameo::actor::ActorRef;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use skyup_api::UpdateProgress;
use skyup_backend::{BackendError, DeviceBackend};

use crate::actor::session::SessionActor;
use crate::config::SessionConfig;
use crate::download::DownloadPhase;
use crate::error::CoreError;
use crate::gate::BandwidthGate;
use crate::message::{CompleteAttempt, DeviceAccepted, ReportProgress};
use crate::probe::TransferProbe;
use crate::progress::ProgressAggregator;
use crate::resource::ResourceTable;

/// One update attempt
///
/// Every task the attempt spawns holds a clone of `settle`. The next attempt
/// receives the matching receiver as `previous` and waits for it to close, so
/// transfers left running by a failed attempt never publish into its successor.
pub(crate) struct Attempt {
    pub id: u64,
    pub config: SessionConfig,
    pub table: Arc<ResourceTable>,
    pub gate: BandwidthGate,
    pub backend: Arc<dyn DeviceBackend>,
    pub fetch_app_installer: bool,
    pub session: ActorRef<SessionActor>,
    pub previous: Option<mpsc::Receiver<()>>,
    pub settle: mpsc::Sender<()>,
}

impl Attempt {
    pub async fn run(mut self) {
        if let Some(mut previous) = self.previous.take() {
            debug!(attempt = self.id, "waiting for previous attempt to settle");
            while previous.recv().await.is_some() {}
        }

        let outcome = self.execute().await;
        let report = CompleteAttempt {
            attempt: self.id,
            outcome,
        };
        if self.session.tell(report).await.is_err() {
            debug!(attempt = self.id, "session actor gone, dropping outcome");
        }
    }

    async fn execute(&self) -> Result<(), CoreError> {
        let device = self
            .backend
            .detect_device()
            .await
            .map_err(|e| match e {
                BackendError::DeviceNotFound(label) => CoreError::DeviceNotFound(label),
                other => CoreError::DeviceNotFound(other.to_string()),
            })?;

        if !self.config.supports(&device.device_name) {
            return Err(CoreError::UnsupportedDevice(device.device_name));
        }

        info!(
            attempt = self.id,
            device = %device.device_name,
            software = %device.software_version,
            "device accepted"
        );
        self.session
            .tell(DeviceAccepted {
                attempt: self.id,
                device,
            })
            .await
            .map_err(|e| CoreError::ActorError(e.to_string()))?;

        let mut progress_rx = self.backend.subscribe_progress();

        let diagnostics = tokio::spawn({
            let backend = Arc::clone(&self.backend);
            let guard = self.settle.clone();
            async move {
                let _guard = guard;
                backend.send_diagnostics().await
            }
        });

        let probe = Arc::new(TransferProbe::default());
        let mut aggregator = ProgressAggregator::new(Arc::clone(&self.table), Arc::clone(&probe));
        let phase = DownloadPhase::new(
            Arc::clone(&self.backend),
            Arc::clone(&self.table),
            self.gate,
            self.fetch_app_installer,
        );
        let mut phase = tokio::spawn(phase.run(probe, self.settle.clone()));

        let mut listening = true;
        let result = loop {
            tokio::select! {
                joined = &mut phase => {
                    break joined.unwrap_or_else(|e| {
                        Err(CoreError::UpdateTransfer(format!("download task failed: {e}")))
                    });
                }
                event = progress_rx.recv(), if listening => match event {
                    Ok(event) => self.aggregate(&mut aggregator, &event).await?,
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(attempt = self.id, skipped, "progress receiver lagged");
                    }
                    Err(RecvError::Closed) => listening = false,
                },
            }
        };

        loop {
            match progress_rx.try_recv() {
                Ok(event) => self.aggregate(&mut aggregator, &event).await?,
                Err(TryRecvError::Lagged(skipped)) => {
                    warn!(attempt = self.id, skipped, "progress receiver lagged");
                }
                Err(TryRecvError::Empty | TryRecvError::Closed) => break,
            }
        }

        let decision = result?;
        debug!(attempt = self.id, ?decision, "download phase finished");

        match diagnostics.await {
            Ok(Ok(())) => debug!(attempt = self.id, "diagnostics sent"),
            Ok(Err(e)) => warn!(attempt = self.id, error = %e, "diagnostics upload failed"),
            Err(e) => warn!(attempt = self.id, error = %e, "diagnostics task failed"),
        }

        Ok(())
    }

    async fn aggregate(
        &self,
        aggregator: &mut ProgressAggregator,
        event: &UpdateProgress,
    ) -> Result<(), CoreError> {
        let kind = aggregator.apply(event)?;
        let report = ReportProgress {
            attempt: self.id,
            kind,
            transfer: aggregator.transfer(kind).clone(),
        };
        self.session
            .tell(report)
            .await
            .map_err(|e| CoreError::ActorError(e.to_string()))
    }
}
