//! Commit execution
//!
//! One attempt = query pending artifacts, stage additions/removals, commit
//! them with `<marker> YYYY-MM-DD HH:MM:SS`. Nothing pending is a no-op:
//! add/commit are not invoked at all. Failures are reported, never raised.

use crate::{BackendError, PendingChange, VersioningBackend};
use chrono::{DateTime, Local};
use lull_core::ArtifactFilter;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

/// Timestamp format placed in commit messages
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Result of one commit attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    Committed { files: usize },
    NoOp,
    Failed(String),
}

/// Runs commit attempts against one checkout
///
/// Engine access is serialized: a probe querying pending changes never
/// runs while a commit is in flight.
pub struct CommitExecutor {
    backend: Arc<dyn VersioningBackend>,
    filter: ArtifactFilter,
    marker: String,
    engine: Mutex<()>,
}

impl CommitExecutor {
    pub fn new(backend: Arc<dyn VersioningBackend>, filter: ArtifactFilter, marker: impl Into<String>) -> Self {
        Self {
            backend,
            filter,
            marker: marker.into(),
            engine: Mutex::new(()),
        }
    }

    pub fn dir(&self) -> &Path {
        self.filter.root()
    }

    /// Commit message for `now`
    pub fn message(&self, now: DateTime<Local>) -> String {
        format!("{} {}", self.marker, now.format(TIMESTAMP_FORMAT))
    }

    /// Uncommitted artifacts
    pub async fn pending_changes(&self) -> Result<Vec<PendingChange>, BackendError> {
        let _engine = self.engine.lock().await;
        self.backend.pending_changes(self.dir(), &self.filter).await
    }

    /// Run one commit attempt
    pub async fn attempt_commit(&self) -> CommitOutcome {
        let _engine = self.engine.lock().await;

        match self.commit_pending().await {
            Ok(0) => CommitOutcome::NoOp,
            Ok(files) => {
                info!("Committed {} artifact(s)", files);
                CommitOutcome::Committed { files }
            }
            Err(e) => {
                warn!("Commit attempt failed: {}", e);
                CommitOutcome::Failed(e.to_string())
            }
        }
    }

    async fn commit_pending(&self) -> Result<usize, BackendError> {
        let dir = self.dir();
        let pending = self.backend.pending_changes(dir, &self.filter).await?;
        if pending.is_empty() {
            return Ok(0);
        }

        let to_stage: Vec<PendingChange> = pending
            .iter()
            .filter(|c| c.kind.needs_staging())
            .cloned()
            .collect();
        if !to_stage.is_empty() {
            self.backend.stage(dir, &to_stage).await?;
        }

        let paths: Vec<PathBuf> = pending.iter().map(|c| c.path.clone()).collect();
        let message = self.message(Local::now());
        self.backend.commit(dir, &message, &paths).await?;

        Ok(paths.len())
    }
}
