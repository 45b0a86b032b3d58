//! Repository discovery and bootstrap
//!
//! Finds the highest-numbered repository in the watched directory, or
//! creates `<prefix>_001<suffix>` when there is none. Numbers are never
//! reused or skipped; gaps left by deleted repositories are tolerated.

use crate::{BackendError, VersioningBackend};
use lull_core::naming::{next_number, RepositoryNaming};
use lull_core::LOCK_FILE_NAME;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

/// Repository location errors (all fatal at startup)
#[derive(Debug, Error)]
pub enum LocateError {
    #[error("failed to scan {dir} for repositories: {source}")]
    Scan {
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to initialize repository {path}: {source}")]
    Init {
        path: PathBuf,
        #[source]
        source: BackendError,
    },
}

/// A numbered repository file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryHandle {
    pub path: PathBuf,
    pub number: u32,
    /// True if this call created the repository
    pub created: bool,
}

/// Find the repository for `dir`, creating the first one if needed
///
/// At most one `init` per directory lifetime: once a repository file
/// exists, later calls only read the directory.
pub async fn locate(
    backend: &dyn VersioningBackend,
    dir: &Path,
    naming: &RepositoryNaming,
) -> Result<RepositoryHandle, LocateError> {
    let scan_error = |source| LocateError::Scan {
        dir: dir.to_path_buf(),
        source,
    };

    if let Some((number, path)) = naming.highest(dir).map_err(scan_error)? {
        info!("Using existing repository {}", path.display());
        return Ok(RepositoryHandle {
            path,
            number,
            created: false,
        });
    }

    let number = next_number(None);
    let file_name = naming.file_name(number);
    let path = dir.join(&file_name);

    info!("Creating repository {}", path.display());
    backend
        .init(&path)
        .await
        .map_err(|source| LocateError::Init {
            path: path.clone(),
            source,
        })?;

    // The artifact filter already excludes these; the ignore list keeps
    // the engine itself from ever offering them as extras.
    for entry in [file_name.as_str(), LOCK_FILE_NAME] {
        if let Err(e) = backend.ignore_list_add(&path, entry).await {
            warn!("Failed to add {} to the ignore list: {}", entry, e);
        }
    }

    Ok(RepositoryHandle {
        path,
        number,
        created: true,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryBackend;
    use std::fs;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_creates_first_repository() {
        let temp_dir = TempDir::new().unwrap();
        let backend = MemoryBackend::new();
        let naming = RepositoryNaming::default();

        let handle = locate(&backend, temp_dir.path(), &naming).await.unwrap();

        assert!(handle.created);
        assert_eq!(handle.number, 1);
        assert!(handle.path.ends_with("captures_001.fossil"));
        assert!(handle.path.is_file());
        assert_eq!(backend.calls().init, 1);
        assert_eq!(
            backend.ignore_globs(&handle.path),
            vec!["captures_001.fossil".to_string(), LOCK_FILE_NAME.to_string()]
        );
    }

    #[tokio::test]
    async fn test_existing_repositories_are_discovered_not_created() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("captures_001.fossil"), b"").unwrap();
        fs::write(temp_dir.path().join("captures_002.fossil"), b"").unwrap();

        let backend = MemoryBackend::new();
        let handle = locate(&backend, temp_dir.path(), &RepositoryNaming::default())
            .await
            .unwrap();

        assert!(!handle.created);
        assert_eq!(handle.number, 2);
        assert_eq!(backend.calls().mutations(), 0);

        // Another, empty directory still starts at 001
        let other = TempDir::new().unwrap();
        let handle = locate(&backend, other.path(), &RepositoryNaming::default())
            .await
            .unwrap();
        assert!(handle.created);
        assert_eq!(handle.number, 1);
    }

    #[tokio::test]
    async fn test_second_locate_is_read_only() {
        let temp_dir = TempDir::new().unwrap();
        let backend = MemoryBackend::new();
        let naming = RepositoryNaming::default();

        let first = locate(&backend, temp_dir.path(), &naming).await.unwrap();
        let calls = backend.calls();

        let second = locate(&backend, temp_dir.path(), &naming).await.unwrap();
        assert_eq!(second.path, first.path);
        assert!(!second.created);
        assert_eq!(backend.calls(), calls);
    }

    #[tokio::test]
    async fn test_gap_keeps_highest() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("captures_003.fossil"), b"").unwrap();

        let backend = MemoryBackend::new();
        let handle = locate(&backend, temp_dir.path(), &RepositoryNaming::default())
            .await
            .unwrap();
        assert_eq!(handle.number, 3);
        assert!(!handle.created);
    }

    #[tokio::test]
    async fn test_init_failure_is_reported() {
        let temp_dir = TempDir::new().unwrap();
        let backend = MemoryBackend::new();
        backend.fail_init(true);

        let err = locate(&backend, temp_dir.path(), &RepositoryNaming::default())
            .await
            .unwrap_err();
        assert!(matches!(err, LocateError::Init { .. }));
        assert_eq!(backend.calls().ignore, 0);
    }

    #[tokio::test]
    async fn test_missing_directory_is_scan_error() {
        let temp_dir = TempDir::new().unwrap();
        let backend = MemoryBackend::new();

        let err = locate(
            &backend,
            &temp_dir.path().join("missing"),
            &RepositoryNaming::default(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, LocateError::Scan { .. }));
    }
}
