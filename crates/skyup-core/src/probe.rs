//! Bytes-received counter shared between the aggregator and the bandwidth gate

use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::Notify;

/// Latest essentials download counter of the current attempt
#[derive(Debug, Default)]
pub struct TransferProbe {
    downloaded: AtomicU64,
    started: Notify,
}

impl TransferProbe {
    /// Record the cumulative byte count from a progress event
    pub fn record(&self, downloaded: u64) {
        let previous = self.downloaded.swap(downloaded, Ordering::SeqCst);
        if previous == 0 && downloaded > 0 {
            self.started.notify_waiters();
        }
    }

    #[must_use]
    pub fn downloaded(&self) -> u64 {
        self.downloaded.load(Ordering::SeqCst)
    }

    /// Resolve once a non-zero byte count has been recorded
    pub async fn first_bytes(&self) {
        loop {
            let notified = self.started.notified();
            if self.downloaded() > 0 {
                return;
            }
            notified.await;
        }
    }
}
