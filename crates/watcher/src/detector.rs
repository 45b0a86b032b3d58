//! Change detector
//!
//! Merges two producers into one bounded channel:
//! - filesystem notifications for the watched directory (non-recursive)
//! - the periodic [`StateProbe`] fallback
//!
//! The consumer sees a single blocking call, [`ChangeDetector::next_signal`].
//! Wakes are coalesced: when the channel is full a new wake is dropped,
//! since only "is there a change" matters, never how many.

use crate::probe::{ChangeProbe, StateProbe};
use anyhow::{Context, Result};
use lull_core::ArtifactFilter;
use notify::event::{AccessKind, AccessMode, ModifyKind};
use notify::{Config as NotifyConfig, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Capacity of the wake channel
const WAKE_CAPACITY: usize = 16;

/// Upper bound between checks that the watched directory still exists
const LIVENESS_INTERVAL: Duration = Duration::from_secs(1);

/// Internal message from producers to the detector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Wake {
    /// A matching artifact changed (or might have)
    Change,
    /// The engine reports uncommitted artifacts
    Pending,
    /// Something happened to the watched directory itself
    Root,
}

/// Result of waiting for the next signal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    /// A commit-worthy change was observed
    Changed,
    /// Nothing changed just now, but uncommitted artifacts exist
    Pending,
    /// The wait elapsed without a change
    Quiet,
    /// The watched directory is gone; the daemon should exit
    Gone,
}

/// Watches one directory for captured artifacts
pub struct ChangeDetector {
    root: PathBuf,
    wake_tx: mpsc::Sender<Wake>,
    wake_rx: mpsc::Receiver<Wake>,
    watcher: Option<RecommendedWatcher>,
    probe_task: Option<JoinHandle<()>>,
}

impl ChangeDetector {
    /// Subscribe to filesystem events for `filter.root()`
    pub fn watch(filter: ArtifactFilter) -> Result<Self> {
        let root = filter.root().to_path_buf();
        let (wake_tx, wake_rx) = mpsc::channel(WAKE_CAPACITY);

        let event_tx = wake_tx.clone();
        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if let Some(wake) = classify(&event, &filter) {
                        let _ = event_tx.try_send(wake);
                    }
                }
                Err(e) => {
                    // Events may have been lost; let the consumer re-check
                    warn!("File watcher error: {}", e);
                    let _ = event_tx.try_send(Wake::Change);
                }
            },
            NotifyConfig::default(),
        )
        .context("Failed to create file watcher")?;

        watcher
            .watch(&root, RecursiveMode::NonRecursive)
            .with_context(|| format!("Failed to watch {}", root.display()))?;

        info!("Watching {}", root.display());

        Ok(Self {
            root,
            wake_tx,
            wake_rx,
            watcher: Some(watcher),
            probe_task: None,
        })
    }

    /// Layer the periodic engine probe on top of filesystem events
    ///
    /// Must be called from within a tokio runtime.
    pub fn with_probe(mut self, probe: Arc<dyn ChangeProbe>, interval: Duration) -> Self {
        let prober = StateProbe::new(probe, interval, self.wake_tx.clone());
        self.probe_task = Some(tokio::spawn(prober.run()));
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Wait for the next signal
    ///
    /// `wait` bounds the wait; `None` waits until a change or until the
    /// directory disappears. Cancel-safe: dropping the future loses nothing.
    pub async fn next_signal(&mut self, wait: Option<Duration>) -> Signal {
        let deadline = wait.map(|w| Instant::now() + w);

        loop {
            let mut nap = LIVENESS_INTERVAL;
            if let Some(deadline) = deadline {
                nap = nap.min(deadline.saturating_duration_since(Instant::now()));
            }

            tokio::select! {
                wake = self.wake_rx.recv() => {
                    if !self.root.is_dir() {
                        return Signal::Gone;
                    }
                    match wake {
                        Some(Wake::Change) => return Signal::Changed,
                        Some(Wake::Pending) => return Signal::Pending,
                        Some(Wake::Root) => continue,
                        None => return Signal::Gone,
                    }
                }
                _ = tokio::time::sleep(nap) => {
                    if !self.root.is_dir() {
                        return Signal::Gone;
                    }
                    if deadline.is_some_and(|d| Instant::now() >= d) {
                        return Signal::Quiet;
                    }
                }
            }
        }
    }

    /// Drop the event subscription and stop the probe
    pub fn stop(&mut self) {
        if let Some(task) = self.probe_task.take() {
            task.abort();
        }
        if self.watcher.take().is_some() {
            debug!("Stopped watching {}", self.root.display());
        }
    }
}

impl Drop for ChangeDetector {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Map a raw notification to a wake, if it matters
fn classify(event: &Event, filter: &ArtifactFilter) -> Option<Wake> {
    if event.paths.iter().any(|p| p == filter.root()) {
        return Some(Wake::Root);
    }

    let relevant_kind = match event.kind {
        EventKind::Create(_) | EventKind::Remove(_) => true,
        EventKind::Modify(ModifyKind::Metadata(_)) => false,
        EventKind::Modify(_) => true,
        EventKind::Access(AccessKind::Close(AccessMode::Write)) => true,
        EventKind::Access(_) | EventKind::Any | EventKind::Other => false,
    };

    if relevant_kind && event.paths.iter().any(|p| filter.matches(p)) {
        Some(Wake::Change)
    } else {
        None
    }
}
