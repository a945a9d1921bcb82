//! Bandwidth gate deciding whether the optional bundles are worth fetching

use std::time::Duration;

use tokio::sync::watch;
use tracing::debug;

use crate::config::BandwidthConfig;
use crate::probe::TransferProbe;

/// Progress of the mandatory essentials transfer as seen by the gate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MandatoryStatus {
    Running,
    Completed,
    Failed,
}

/// Outcome of a bandwidth probe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// Enough bytes arrived within the window
    Sufficient { bytes: u64 },
    /// Connection too slow; optional bundles are skipped
    Insufficient { bytes: u64 },
    /// The mandatory transfer failed before a decision was made
    Abandoned,
}

impl GateDecision {
    #[must_use]
    pub fn is_sufficient(self) -> bool {
        matches!(self, GateDecision::Sufficient { .. })
    }
}

#[derive(Debug, Clone, Copy)]
pub struct BandwidthGate {
    probe_window: Duration,
    threshold_bytes: u64,
}

impl BandwidthGate {
    #[must_use]
    pub fn new(probe_window: Duration, threshold_bytes: u64) -> Self {
        Self {
            probe_window,
            threshold_bytes,
        }
    }

    #[must_use]
    pub fn from_config(config: &BandwidthConfig) -> Self {
        Self::new(config.probe_window(), config.threshold_bytes)
    }

    /// Compare a byte count against the threshold, inclusive
    #[must_use]
    pub fn evaluate(&self, bytes: u64) -> GateDecision {
        if bytes >= self.threshold_bytes {
            GateDecision::Sufficient { bytes }
        } else {
            GateDecision::Insufficient { bytes }
        }
    }

    /// Sample the essentials counter once at the end of the probe window
    ///
    /// The window opens at the first non-zero sample, or when the essentials
    /// transfer completes without producing one.
    pub async fn probe(
        &self,
        probe: &TransferProbe,
        mut mandatory: watch::Receiver<MandatoryStatus>,
    ) -> GateDecision {
        tokio::select! {
            () = probe.first_bytes() => {}
            _ = mandatory.wait_for(|status| *status != MandatoryStatus::Running) => {}
        }

        if *mandatory.borrow() == MandatoryStatus::Failed {
            return GateDecision::Abandoned;
        }

        debug!(window_ms = self.probe_window.as_millis(), "bandwidth probe window opened");
        tokio::time::sleep(self.probe_window).await;

        if *mandatory.borrow() == MandatoryStatus::Failed {
            return GateDecision::Abandoned;
        }

        let decision = self.evaluate(probe.downloaded());
        debug!(?decision, threshold = self.threshold_bytes, "bandwidth probe finished");
        decision
    }
}
