//! Versioning-engine integration for lull
//!
//! This crate provides:
//! - The [`VersioningBackend`] capability trait (init/open/status/add/commit)
//! - A Fossil CLI backend and an in-memory backend
//! - Repository discovery/bootstrap, checkout management, commit execution

pub mod checkout;
pub mod commit;
pub mod fossil;
pub mod locate;
pub mod memory;

// Re-exports
pub use checkout::{ensure_checkout, CheckoutError, CheckoutState};
pub use commit::{CommitExecutor, CommitOutcome};
pub use fossil::FossilBackend;
pub use locate::{locate, LocateError, RepositoryHandle};
pub use memory::MemoryBackend;

use async_trait::async_trait;
use lull_core::ArtifactFilter;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors reported by a versioning backend
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{command}` failed ({status}): {stderr}")]
    Command {
        command: String,
        status: String,
        stderr: String,
    },

    #[error("{0}")]
    Rejected(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Kind of uncommitted change reported by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ChangeKind {
    /// Scheduled for addition, not yet committed
    Added,
    /// Tracked and modified
    Edited,
    /// Scheduled for removal
    Deleted,
    /// Tracked but gone from disk
    Missing,
    /// Present on disk, unknown to the engine
    Untracked,
}

impl ChangeKind {
    /// True if the change must be staged before it can be committed
    pub fn needs_staging(self) -> bool {
        matches!(self, ChangeKind::Untracked | ChangeKind::Missing)
    }
}

/// One uncommitted change, path relative to the checkout root
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct PendingChange {
    pub path: PathBuf,
    pub kind: ChangeKind,
}

impl PendingChange {
    pub fn new(path: impl Into<PathBuf>, kind: ChangeKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }
}

/// Operations the daemon consumes from a versioning engine
///
/// Every operation may fail; callers never assume success.
#[async_trait]
pub trait VersioningBackend: Send + Sync {
    /// Create a new repository file at `repository`
    async fn init(&self, repository: &Path) -> Result<(), BackendError>;

    /// Open `repository` as a checkout rooted at `dir`, keeping existing files
    async fn open_checkout(&self, repository: &Path, dir: &Path) -> Result<(), BackendError>;

    /// True if `dir` itself is the root of an active checkout
    async fn is_checkout(&self, dir: &Path) -> Result<bool, BackendError>;

    /// Uncommitted changes in `dir` accepted by `filter`
    async fn pending_changes(
        &self,
        dir: &Path,
        filter: &ArtifactFilter,
    ) -> Result<Vec<PendingChange>, BackendError>;

    /// Schedule additions and removals so they can be committed
    async fn stage(&self, dir: &Path, changes: &[PendingChange]) -> Result<(), BackendError>;

    /// Commit `paths` with `message`
    async fn commit(&self, dir: &Path, message: &str, paths: &[PathBuf]) -> Result<(), BackendError>;

    /// Add `entry` to the repository's ignore list
    async fn ignore_list_add(&self, repository: &Path, entry: &str) -> Result<(), BackendError>;
}
