//! In-memory backend
//!
//! Keeps repository history in memory while reading artifacts from the real
//! directory, so the daemon can be exercised end to end without a `fossil`
//! binary. It also touches a `.fslckout` file on open and on every commit,
//! like a real engine would.

use crate::{BackendError, ChangeKind, PendingChange, VersioningBackend};
use async_trait::async_trait;
use lull_core::ArtifactFilter;
use parking_lot::Mutex;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};

/// Checkout database the in-memory engine maintains on disk
const CHECKOUT_DB: &str = ".fslckout";

/// One recorded commit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryCommit {
    pub message: String,
    pub files: Vec<PathBuf>,
}

/// Number of calls per mutating operation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounts {
    pub init: usize,
    pub open: usize,
    pub stage: usize,
    pub commit: usize,
    pub ignore: usize,
}

impl CallCounts {
    pub fn mutations(&self) -> usize {
        self.init + self.open + self.stage + self.commit + self.ignore
    }
}

/// History of one checkout root
#[derive(Debug)]
struct Checkout {
    repository: PathBuf,
    /// Committed content per path
    tracked: BTreeMap<PathBuf, Vec<u8>>,
    staged_add: BTreeSet<PathBuf>,
    staged_rm: BTreeSet<PathBuf>,
}

impl Checkout {
    fn new(repository: &Path) -> Self {
        Self {
            repository: repository.to_path_buf(),
            tracked: BTreeMap::new(),
            staged_add: BTreeSet::new(),
            staged_rm: BTreeSet::new(),
        }
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    /// Checkout root -> its history
    checkouts: HashMap<PathBuf, Checkout>,
    commits: Vec<MemoryCommit>,
    ignore_globs: HashMap<PathBuf, Vec<String>>,
    calls: CallCounts,
    fail_init: bool,
    fail_open: bool,
    fail_commits: bool,
}

impl MemoryState {
    fn checkout_mut(&mut self, dir: &Path) -> Result<&mut Checkout, BackendError> {
        self.checkouts
            .get_mut(dir)
            .ok_or_else(|| BackendError::Rejected("not within an open checkout".to_string()))
    }
}

/// In-memory versioning engine
#[derive(Debug, Default)]
pub struct MemoryBackend {
    state: Mutex<MemoryState>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commits(&self) -> Vec<MemoryCommit> {
        self.state.lock().commits.clone()
    }

    pub fn calls(&self) -> CallCounts {
        self.state.lock().calls
    }

    /// Repository `dir` is a checkout of, if any
    pub fn checkout_repository(&self, dir: &Path) -> Option<PathBuf> {
        self.state
            .lock()
            .checkouts
            .get(dir)
            .map(|c| c.repository.clone())
    }

    pub fn ignore_globs(&self, repository: &Path) -> Vec<String> {
        self.state
            .lock()
            .ignore_globs
            .get(repository)
            .cloned()
            .unwrap_or_default()
    }

    pub fn fail_init(&self, fail: bool) {
        self.state.lock().fail_init = fail;
    }

    pub fn fail_open(&self, fail: bool) {
        self.state.lock().fail_open = fail;
    }

    /// Make every commit fail, as if the engine held a lock
    pub fn fail_commits(&self, fail: bool) {
        self.state.lock().fail_commits = fail;
    }
}

#[async_trait]
impl VersioningBackend for MemoryBackend {
    async fn init(&self, repository: &Path) -> Result<(), BackendError> {
        let mut state = self.state.lock();
        state.calls.init += 1;

        if state.fail_init {
            return Err(BackendError::Rejected("permission denied".to_string()));
        }
        if repository.exists() {
            return Err(BackendError::Rejected(format!(
                "file already exists: {}",
                repository.display()
            )));
        }

        std::fs::write(repository, b"")?;
        Ok(())
    }

    async fn open_checkout(&self, repository: &Path, dir: &Path) -> Result<(), BackendError> {
        let mut state = self.state.lock();
        state.calls.open += 1;

        if state.fail_open {
            return Err(BackendError::Rejected("cannot open checkout".to_string()));
        }
        if !repository.is_file() {
            return Err(BackendError::Rejected(format!(
                "repository does not exist: {}",
                repository.display()
            )));
        }

        std::fs::write(dir.join(CHECKOUT_DB), b"checkout")?;
        state
            .checkouts
            .entry(dir.to_path_buf())
            .and_modify(|c| c.repository = repository.to_path_buf())
            .or_insert_with(|| Checkout::new(repository));
        Ok(())
    }

    async fn is_checkout(&self, dir: &Path) -> Result<bool, BackendError> {
        Ok(self.state.lock().checkouts.contains_key(dir))
    }

    async fn pending_changes(
        &self,
        dir: &Path,
        filter: &ArtifactFilter,
    ) -> Result<Vec<PendingChange>, BackendError> {
        let state = self.state.lock();
        let Some(checkout) = state.checkouts.get(dir) else {
            return Err(BackendError::Rejected("not within an open checkout".to_string()));
        };

        let mut on_disk = BTreeMap::new();
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                let name = PathBuf::from(entry.file_name());
                on_disk.insert(name, entry.path());
            }
        }

        let mut pending = Vec::new();

        for (name, path) in &on_disk {
            let kind = match checkout.tracked.get(name) {
                Some(committed) => {
                    if *committed == std::fs::read(path)? {
                        continue;
                    }
                    ChangeKind::Edited
                }
                None if checkout.staged_add.contains(name) => ChangeKind::Added,
                None => ChangeKind::Untracked,
            };
            pending.push(PendingChange::new(name.clone(), kind));
        }

        for name in checkout.tracked.keys().filter(|n| !on_disk.contains_key(*n)) {
            let kind = if checkout.staged_rm.contains(name) {
                ChangeKind::Deleted
            } else {
                ChangeKind::Missing
            };
            pending.push(PendingChange::new(name.clone(), kind));
        }

        pending.retain(|c| filter.matches(&c.path));
        pending.sort();
        Ok(pending)
    }

    async fn stage(&self, dir: &Path, changes: &[PendingChange]) -> Result<(), BackendError> {
        let mut state = self.state.lock();
        state.calls.stage += 1;
        let checkout = state.checkout_mut(dir)?;

        for change in changes {
            match change.kind {
                ChangeKind::Untracked => {
                    checkout.staged_add.insert(change.path.clone());
                }
                ChangeKind::Missing => {
                    checkout.staged_rm.insert(change.path.clone());
                }
                _ => {}
            }
        }
        Ok(())
    }

    async fn commit(&self, dir: &Path, message: &str, paths: &[PathBuf]) -> Result<(), BackendError> {
        let mut state = self.state.lock();
        state.calls.commit += 1;

        if state.fail_commits {
            return Err(BackendError::Rejected("database is locked".to_string()));
        }
        if paths.is_empty() {
            return Err(BackendError::Rejected("nothing has changed".to_string()));
        }
        let checkout = state.checkout_mut(dir)?;

        // Validate everything before mutating history
        let mut contents = Vec::with_capacity(paths.len());
        for path in paths {
            let known = checkout.tracked.contains_key(path) || checkout.staged_add.contains(path);
            if !known {
                return Err(BackendError::Rejected(format!(
                    "file not tracked: {}",
                    path.display()
                )));
            }

            let full = dir.join(path);
            let content = if full.is_file() {
                Some(std::fs::read(&full)?)
            } else {
                None
            };
            contents.push((path.clone(), content));
        }

        for (path, content) in contents {
            checkout.staged_add.remove(&path);
            checkout.staged_rm.remove(&path);
            match content {
                Some(bytes) => {
                    checkout.tracked.insert(path, bytes);
                }
                None => {
                    checkout.tracked.remove(&path);
                }
            }
        }

        state.commits.push(MemoryCommit {
            message: message.to_string(),
            files: paths.to_vec(),
        });

        // Engine bookkeeping, exactly what must never trigger another commit
        std::fs::write(dir.join(CHECKOUT_DB), format!("commit {}", state.commits.len()))?;
        Ok(())
    }

    async fn ignore_list_add(&self, repository: &Path, entry: &str) -> Result<(), BackendError> {
        let mut state = self.state.lock();
        state.calls.ignore += 1;

        let globs = state
            .ignore_globs
            .entry(repository.to_path_buf())
            .or_default();
        if !globs.iter().any(|g| g == entry) {
            globs.push(entry.to_string());
        }
        Ok(())
    }
}
