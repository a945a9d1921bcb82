//! Per-resource progress aggregation

use std::sync::Arc;

use serde::Serialize;

use skyup_api::UpdateProgress;

use crate::error::CoreError;
use crate::probe::TransferProbe;
use crate::resource::{ResourceKind, ResourceTable};

/// Progress record of one bundle within the current attempt
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResourceTransfer {
    pub total_bytes: u64,
    pub downloaded_bytes: u64,
    pub current_file: String,
    pub total_files: u32,
    pub processed_files: u32,
}

impl ResourceTransfer {
    /// Download completion, 0 while the size is unknown
    #[must_use]
    pub fn download_percent(&self) -> u8 {
        percent(self.downloaded_bytes, self.total_bytes)
    }

    /// Install completion, 0 while the file count is unknown
    #[must_use]
    pub fn install_percent(&self) -> u8 {
        percent(
            u64::from(self.processed_files),
            u64::from(self.total_files),
        )
    }

    fn apply(&mut self, event: &UpdateProgress) {
        self.total_bytes = event.total_bytes;
        self.downloaded_bytes = event.downloaded;
        self.current_file.clone_from(&event.current_file);
        self.total_files = event.total_files;
        self.processed_files = event.processed_files;
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
fn percent(done: u64, total: u64) -> u8 {
    if total == 0 {
        return 0;
    }
    let value = (done as f64 / total as f64 * 100.0).round();
    value.clamp(0.0, 100.0) as u8
}

/// Transfer records for all three bundles
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Transfers {
    pub essentials: ResourceTransfer,
    pub system: ResourceTransfer,
    pub app_installer: ResourceTransfer,
}

impl Transfers {
    #[must_use]
    pub fn get(&self, kind: ResourceKind) -> &ResourceTransfer {
        match kind {
            ResourceKind::Essentials => &self.essentials,
            ResourceKind::System => &self.system,
            ResourceKind::AppInstaller => &self.app_installer,
        }
    }

    pub fn get_mut(&mut self, kind: ResourceKind) -> &mut ResourceTransfer {
        match kind {
            ResourceKind::Essentials => &mut self.essentials,
            ResourceKind::System => &mut self.system,
            ResourceKind::AppInstaller => &mut self.app_installer,
        }
    }

    pub fn set(&mut self, kind: ResourceKind, transfer: ResourceTransfer) {
        *self.get_mut(kind) = transfer;
    }
}

/// Routes progress events to the transfer record of their bundle
///
/// Essentials samples are also recorded into the shared `TransferProbe` read by
/// the bandwidth gate.
pub struct ProgressAggregator {
    table: Arc<ResourceTable>,
    transfers: Transfers,
    probe: Arc<TransferProbe>,
}

impl ProgressAggregator {
    #[must_use]
    pub fn new(table: Arc<ResourceTable>, probe: Arc<TransferProbe>) -> Self {
        Self {
            table,
            transfers: Transfers::default(),
            probe,
        }
    }

    /// Apply one progress event
    ///
    /// # Errors
    ///
    /// Returns `CoreError::UnknownResource` if the event URL is not one of the
    /// bundle URLs. No record is touched in that case.
    pub fn apply(&mut self, event: &UpdateProgress) -> Result<ResourceKind, CoreError> {
        let kind = self
            .table
            .kind_of(&event.url)
            .ok_or_else(|| CoreError::UnknownResource(event.url.clone()))?;

        self.transfers.get_mut(kind).apply(event);
        if kind == ResourceKind::Essentials {
            self.probe.record(event.downloaded);
        }

        Ok(kind)
    }

    #[must_use]
    pub fn transfer(&self, kind: ResourceKind) -> &ResourceTransfer {
        self.transfers.get(kind)
    }

    #[must_use]
    pub fn transfers(&self) -> &Transfers {
        &self.transfers
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ResourceUrls;

    fn aggregator() -> (ProgressAggregator, Arc<ResourceTable>, Arc<TransferProbe>) {
        let table = Arc::new(ResourceTable::from_urls(&ResourceUrls::default()).unwrap());
        let probe = Arc::new(TransferProbe::default());
        (
            ProgressAggregator::new(Arc::clone(&table), Arc::clone(&probe)),
            table,
            probe,
        )
    }

    #[test]
    fn test_percentages_round_and_cap() {
        let transfer = ResourceTransfer {
            total_bytes: 3,
            downloaded_bytes: 2,
            total_files: 8,
            processed_files: 9,
            ..ResourceTransfer::default()
        };
        assert_eq!(transfer.download_percent(), 67);
        assert_eq!(transfer.install_percent(), 100);
    }

    #[test]
    fn test_percentages_zero_when_totals_unknown() {
        let transfer = ResourceTransfer {
            downloaded_bytes: 5000,
            processed_files: 3,
            ..ResourceTransfer::default()
        };
        assert_eq!(transfer.download_percent(), 0);
        assert_eq!(transfer.install_percent(), 0);
    }

    #[test]
    fn test_events_routed_by_url() {
        let (mut agg, table, probe) = aggregator();

        let system = UpdateProgress::download(table.url(ResourceKind::System), 1000, 250);
        assert_eq!(agg.apply(&system).unwrap(), ResourceKind::System);
        assert_eq!(agg.transfer(ResourceKind::System).download_percent(), 25);
        assert_eq!(agg.transfer(ResourceKind::Essentials), &ResourceTransfer::default());
        assert_eq!(probe.downloaded(), 0);

        let essentials = UpdateProgress::install(
            table.url(ResourceKind::Essentials),
            4096,
            "fw/main.bin",
            4,
            1,
        );
        assert_eq!(agg.apply(&essentials).unwrap(), ResourceKind::Essentials);
        let record = agg.transfer(ResourceKind::Essentials);
        assert_eq!(record.current_file, "fw/main.bin");
        assert_eq!(record.install_percent(), 25);
        assert_eq!(probe.downloaded(), 4096);
    }

    #[test]
    fn test_unknown_url_rejected_without_side_effects() {
        let (mut agg, _, probe) = aggregator();

        let stray = UpdateProgress::download("https://example.com/other.tar", 10, 10);
        let err = agg.apply(&stray).unwrap_err();

        assert!(matches!(err, CoreError::UnknownResource(url) if url == "https://example.com/other.tar"));
        assert_eq!(agg.transfers(), &Transfers::default());
        assert_eq!(probe.downloaded(), 0);
    }
}
