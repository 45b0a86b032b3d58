//! Daemon lifecycle
//!
//! Startup: locate (or create) the repository, make the directory a
//! checkout. Either failing aborts before the loop starts.
//!
//! Loop: detector signal -> debounce decision -> commit attempt -> cooldown.
//! Commits run inline, so shutdown is only observed between attempts and an
//! in-flight commit always completes.

use anyhow::{Context, Result};
use async_trait::async_trait;
use lull_core::{ArtifactFilter, LullConfig, RepositoryNaming};
use lull_vcs::{
    ensure_checkout, locate, CheckoutState, CommitExecutor, CommitOutcome, RepositoryHandle,
    VersioningBackend,
};
use lull_watcher::{ChangeDetector, ChangeProbe, DebouncePolicy, DebounceScheduler, Decision, Signal};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Everything the daemon needs besides the backend
#[derive(Debug, Clone)]
pub struct DaemonSettings {
    pub filter: ArtifactFilter,
    pub naming: RepositoryNaming,
    pub policy: DebouncePolicy,
    pub probe_interval: Duration,
    pub commit_marker: String,
}

impl DaemonSettings {
    pub fn from_config(dir: &Path, config: &LullConfig) -> Result<Self> {
        Ok(Self {
            filter: config.filter(dir).context("Invalid exclude pattern")?,
            naming: config.naming(),
            policy: DebouncePolicy {
                quiet_period: config.quiet_period(),
                cooldown: config.cooldown(),
            },
            probe_interval: config.probe_interval(),
            commit_marker: config.repository.commit_marker.clone(),
        })
    }

    pub fn dir(&self) -> &Path {
        self.filter.root()
    }
}

/// Why the loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    /// Termination requested
    Shutdown,
    /// Watched directory disappeared
    DirectoryGone,
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitReason::Shutdown => write!(f, "shutdown requested"),
            ExitReason::DirectoryGone => write!(f, "watched directory removed"),
        }
    }
}

/// Locate the repository and ensure the checkout (fatal on failure)
pub async fn bootstrap(
    backend: &dyn VersioningBackend,
    dir: &Path,
    naming: &RepositoryNaming,
) -> Result<(RepositoryHandle, CheckoutState)> {
    let handle = locate(backend, dir, naming)
        .await
        .context("Repository bootstrap failed")?;
    let checkout = ensure_checkout(backend, dir, &handle)
        .await
        .context("Checkout failed")?;
    Ok((handle, checkout))
}

/// Probe adapter: asks the executor (and therefore the engine) for pending artifacts
struct PendingProbe {
    executor: Arc<CommitExecutor>,
}

#[async_trait]
impl ChangeProbe for PendingProbe {
    async fn has_pending_changes(&self) -> Result<bool> {
        let pending = self.executor.pending_changes().await?;
        Ok(!pending.is_empty())
    }
}

/// Run the daemon until `shutdown` flips to true or the directory goes away
pub async fn run(
    settings: DaemonSettings,
    backend: Arc<dyn VersioningBackend>,
    mut shutdown: watch::Receiver<bool>,
) -> Result<ExitReason> {
    let dir: PathBuf = settings.dir().to_path_buf();

    let (handle, checkout) = bootstrap(backend.as_ref(), &dir, &settings.naming).await?;
    info!(
        "Daemon ready: {} (repository {}, {})",
        dir.display(),
        handle.path.display(),
        match checkout {
            CheckoutState::AlreadyOpen => "existing checkout",
            CheckoutState::Opened => "new checkout",
        }
    );

    let executor = Arc::new(CommitExecutor::new(
        backend,
        settings.filter.clone(),
        settings.commit_marker.clone(),
    ));
    let probe = Arc::new(PendingProbe {
        executor: executor.clone(),
    });

    let mut detector = ChangeDetector::watch(settings.filter.clone())
        .context("Failed to start change detector")?
        .with_probe(probe, settings.probe_interval);
    let mut scheduler = DebounceScheduler::new(settings.policy);

    let reason = loop {
        if *shutdown.borrow() {
            break ExitReason::Shutdown;
        }

        let wait = match scheduler.poll(Instant::now()) {
            Decision::Commit => {
                match executor.attempt_commit().await {
                    CommitOutcome::Committed { files } => debug!("Commit attempt: {} file(s)", files),
                    CommitOutcome::NoOp => debug!("Commit attempt: nothing pending"),
                    // Retried on the next eligible signal
                    CommitOutcome::Failed(_) => {}
                }
                scheduler.commit_finished(Instant::now());
                continue;
            }
            Decision::Wait(remaining) => Some(remaining),
            Decision::Idle => None,
        };

        tokio::select! {
            biased;

            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break ExitReason::Shutdown;
                }
            }

            signal = detector.next_signal(wait) => match signal {
                Signal::Changed => scheduler.on_signal(Instant::now()),
                Signal::Pending => scheduler.on_pending(Instant::now()),
                Signal::Quiet => {}
                Signal::Gone => {
                    warn!("Watched directory {} disappeared", dir.display());
                    break ExitReason::DirectoryGone;
                }
            },
        }
    };

    detector.stop();
    info!("Daemon stopped: {}", reason);
    Ok(reason)
}

/// Install SIGINT/SIGTERM handlers; the receiver flips to true on either
///
/// Registration happens before returning, so a failure is a startup error.
pub fn termination_signal() -> Result<watch::Receiver<bool>> {
    let (tx, rx) = watch::channel(false);

    let mut sigterm =
        signal(SignalKind::terminate()).context("Failed to install SIGTERM handler")?;
    let mut sigint = signal(SignalKind::interrupt()).context("Failed to install SIGINT handler")?;

    tokio::spawn(async move {
        tokio::select! {
            _ = sigterm.recv() => info!("Received SIGTERM"),
            _ = sigint.recv() => info!("Received SIGINT"),
        }
        let _ = tx.send(true);
    });

    Ok(rx)
}
