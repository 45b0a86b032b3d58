//! Checkout management

use crate::locate::RepositoryHandle;
use crate::{BackendError, VersioningBackend};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("failed to query checkout status of {dir}: {source}")]
    Status {
        dir: PathBuf,
        #[source]
        source: BackendError,
    },

    #[error("failed to open {repository} in {dir}: {source}")]
    Open {
        repository: PathBuf,
        dir: PathBuf,
        #[source]
        source: BackendError,
    },
}

/// How the checkout came to be active
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckoutState {
    /// Directory was already a checkout; nothing done
    AlreadyOpen,
    /// Checkout opened by this call
    Opened,
}

/// Make `dir` an active checkout of `handle`
///
/// Idempotent. Existing files in `dir` are kept as they are.
pub async fn ensure_checkout(
    backend: &dyn VersioningBackend,
    dir: &Path,
    handle: &RepositoryHandle,
) -> Result<CheckoutState, CheckoutError> {
    let open = backend
        .is_checkout(dir)
        .await
        .map_err(|source| CheckoutError::Status {
            dir: dir.to_path_buf(),
            source,
        })?;

    if open {
        return Ok(CheckoutState::AlreadyOpen);
    }

    backend
        .open_checkout(&handle.path, dir)
        .await
        .map_err(|source| CheckoutError::Open {
            repository: handle.path.clone(),
            dir: dir.to_path_buf(),
            source,
        })?;

    info!("Opened {} as a checkout of {}", dir.display(), handle.path.display());
    Ok(CheckoutState::Opened)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locate::locate;
    use crate::MemoryBackend;
    use lull_core::RepositoryNaming;
    use std::fs;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_open_then_noop() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path();
        fs::write(dir.join("existing.txt"), b"keep me").unwrap();

        let backend = MemoryBackend::new();
        let handle = locate(&backend, dir, &RepositoryNaming::default()).await.unwrap();

        let state = ensure_checkout(&backend, dir, &handle).await.unwrap();
        assert_eq!(state, CheckoutState::Opened);
        assert_eq!(fs::read(dir.join("existing.txt")).unwrap(), b"keep me");

        let calls = backend.calls();
        let state = ensure_checkout(&backend, dir, &handle).await.unwrap();
        assert_eq!(state, CheckoutState::AlreadyOpen);
        assert_eq!(backend.calls(), calls);
    }

    #[tokio::test]
    async fn test_open_failure_is_reported() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path();

        let backend = MemoryBackend::new();
        let handle = locate(&backend, dir, &RepositoryNaming::default()).await.unwrap();
        backend.fail_open(true);

        let err = ensure_checkout(&backend, dir, &handle).await.unwrap_err();
        assert!(matches!(err, CheckoutError::Open { .. }));
    }
}
