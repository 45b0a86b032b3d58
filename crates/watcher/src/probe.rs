//! Periodic state probe
//!
//! Periodically asks the versioning engine whether uncommitted artifacts
//! exist, catching changes the file watcher missed (queue overflow,
//! coalesced notifications, files dropped while the daemon was down).

use crate::detector::Wake;
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Source of truth for "are there uncommitted artifacts?"
#[async_trait]
pub trait ChangeProbe: Send + Sync {
    async fn has_pending_changes(&self) -> Result<bool>;
}

/// Periodic prober feeding the detector channel
pub struct StateProbe {
    probe: Arc<dyn ChangeProbe>,

    /// Probe interval (default: 10 seconds)
    interval: Duration,

    /// Sender into the detector channel
    wake_tx: mpsc::Sender<Wake>,
}

impl StateProbe {
    pub(crate) fn new(
        probe: Arc<dyn ChangeProbe>,
        interval: Duration,
        wake_tx: mpsc::Sender<Wake>,
    ) -> Self {
        Self {
            probe,
            interval,
            wake_tx,
        }
    }

    /// Run the probe loop until aborted
    ///
    /// The first probe fires immediately so artifacts left over from a
    /// previous run are picked up at startup.
    pub async fn run(self) {
        let mut timer = interval(self.interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!("Starting state probe (interval: {:?})", self.interval);

        loop {
            timer.tick().await;

            match self.probe.has_pending_changes().await {
                Ok(true) => {
                    debug!("State probe found uncommitted artifacts");
                    // Full channel means a wake is already queued
                    let _ = self.wake_tx.try_send(Wake::Pending);
                }
                Ok(false) => {
                    debug!("State probe: nothing pending");
                }
                Err(e) => {
                    warn!("State probe failed: {:#}", e);
                }
            }
        }
    }
}
