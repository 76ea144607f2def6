//! Fixed-interval poll driver.

use std::time::Duration;

use tokio::time::{interval, MissedTickBehavior};
use tracing::info;

use crate::error::Result;
use crate::metrics::SnapshotProcessor;
use crate::smi::SmiClient;

pub struct Poller {
    client: SmiClient,
    processor: SnapshotProcessor,
    period: Duration,
}

impl Poller {
    pub fn new(client: SmiClient, processor: SnapshotProcessor, period: Duration) -> Self {
        Self {
            client,
            processor,
            period,
        }
    }

    /// Drive poll cycles forever. The first cycle runs immediately; a cycle
    /// that outlives the period delays the next tick instead of bursting.
    /// Returns only when a snapshot stays unavailable through every client
    /// retry.
    pub async fn run(&self) -> Result<()> {
        let mut ticker = interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            let snapshot = self.client.snapshot().await?;
            self.processor.process(&snapshot);
            info!(devices = snapshot.device_count(), "refreshed GPU metrics");
        }
    }
}
