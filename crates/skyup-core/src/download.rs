//! Download phase: mandatory essentials plus gated optional bundles

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tracing::{info, warn};

use skyup_backend::DeviceBackend;

use crate::error::CoreError;
use crate::gate::{BandwidthGate, GateDecision, MandatoryStatus};
use crate::probe::TransferProbe;
use crate::resource::{ResourceKind, ResourceTable};

/// One execution of the download phase for an accepted device
pub struct DownloadPhase {
    backend: Arc<dyn DeviceBackend>,
    table: Arc<ResourceTable>,
    gate: BandwidthGate,
    fetch_app_installer: bool,
}

impl DownloadPhase {
    #[must_use]
    pub fn new(
        backend: Arc<dyn DeviceBackend>,
        table: Arc<ResourceTable>,
        gate: BandwidthGate,
        fetch_app_installer: bool,
    ) -> Self {
        Self {
            backend,
            table,
            gate,
            fetch_app_installer,
        }
    }

    /// Run the phase to completion
    ///
    /// The gate runs concurrently with the essentials transfer. If essentials
    /// fails, this returns at once and the gate task is left to observe the
    /// failure on its own. A clone of `settle` lives in that task, so the
    /// receiving side closes only once every transfer of the phase has ended.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::UpdateTransfer` if any bundle transfer fails.
    pub async fn run(
        self,
        probe: Arc<TransferProbe>,
        settle: mpsc::Sender<()>,
    ) -> Result<GateDecision, CoreError> {
        let (status_tx, status_rx) = watch::channel(MandatoryStatus::Running);

        let transfers = optional_transfers(
            Arc::clone(&self.backend),
            Arc::clone(&self.table),
            self.gate,
            probe,
            status_rx,
            self.fetch_app_installer,
        );
        let guard = settle.clone();
        let optional = tokio::spawn(async move {
            let _guard = guard;
            transfers.await
        });

        let essentials_url = self.table.url(ResourceKind::Essentials);
        if let Err(e) = self.backend.fetch_bundle(essentials_url).await {
            let _ = status_tx.send(MandatoryStatus::Failed);
            warn!(url = %essentials_url, error = %e, "essentials transfer failed");
            return Err(CoreError::UpdateTransfer(format!("essentials: {e}")));
        }
        let _ = status_tx.send(MandatoryStatus::Completed);
        info!("essentials transfer completed");

        optional
            .await
            .map_err(|e| CoreError::UpdateTransfer(format!("optional transfers aborted: {e}")))?
    }
}

async fn optional_transfers(
    backend: Arc<dyn DeviceBackend>,
    table: Arc<ResourceTable>,
    gate: BandwidthGate,
    probe: Arc<TransferProbe>,
    status: watch::Receiver<MandatoryStatus>,
    fetch_app_installer: bool,
) -> Result<GateDecision, CoreError> {
    let decision = gate.probe(&probe, status).await;

    match decision {
        GateDecision::Sufficient { bytes } => {
            info!(bytes, "connection fast enough, fetching optional bundles");
            if fetch_app_installer {
                fetch(backend.as_ref(), &table, ResourceKind::AppInstaller).await?;
            }
            fetch(backend.as_ref(), &table, ResourceKind::System).await?;
        }
        GateDecision::Insufficient { bytes } => {
            info!(bytes, "connection too slow, skipping optional bundles");
        }
        GateDecision::Abandoned => {}
    }

    Ok(decision)
}

async fn fetch(
    backend: &dyn DeviceBackend,
    table: &ResourceTable,
    kind: ResourceKind,
) -> Result<(), CoreError> {
    backend
        .fetch_bundle(table.url(kind))
        .await
        .map_err(|e| CoreError::UpdateTransfer(format!("{kind}: {e}")))
}
