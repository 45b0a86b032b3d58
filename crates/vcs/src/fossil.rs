//! Fossil command-line backend
//!
//! Every operation shells out to the `fossil` executable. Child processes
//! are killed if the calling future is dropped, so cancelling a probe or
//! shutting down never leaves a stray `fossil` behind.

use crate::{BackendError, ChangeKind, PendingChange, VersioningBackend};
use async_trait::async_trait;
use lull_core::ArtifactFilter;
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

/// Scopes `fossil settings` may print between the name and the value
const SETTING_SCOPES: &[&str] = &["(local)", "(global)", "(versioned)"];

/// Backend driving the `fossil` CLI
#[derive(Debug, Clone)]
pub struct FossilBackend {
    binary: PathBuf,
    user: Option<String>,
}

impl FossilBackend {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            user: None,
        }
    }

    /// Commit as `user` instead of the repository default
    pub fn with_user(mut self, user: Option<String>) -> Self {
        self.user = user;
        self
    }

    /// Run fossil in `cwd`, returning stdout on success
    async fn run<I, S>(&self, cwd: &Path, args: I) -> Result<String, BackendError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let args: Vec<OsString> = args.into_iter().map(|a| a.as_ref().to_os_string()).collect();
        let command = describe(&self.binary, &args);
        debug!("Running {} in {}", command, cwd.display());

        let output = Command::new(&self.binary)
            .args(&args)
            .current_dir(cwd)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| BackendError::Spawn {
                program: self.binary.display().to_string(),
                source,
            })?;

        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).into_owned())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stdout = String::from_utf8_lossy(&output.stdout);
            let detail = if stderr.trim().is_empty() { stdout } else { stderr };
            Err(BackendError::Command {
                command,
                status: output.status.to_string(),
                stderr: detail.trim().to_string(),
            })
        }
    }
}

impl Default for FossilBackend {
    fn default() -> Self {
        Self::new("fossil")
    }
}

#[async_trait]
impl VersioningBackend for FossilBackend {
    async fn init(&self, repository: &Path) -> Result<(), BackendError> {
        let cwd = parent_or_current(repository);
        let mut args: Vec<OsString> = vec!["init".into()];
        if let Some(ref user) = self.user {
            args.push("--admin-user".into());
            args.push(user.into());
        }
        args.push(repository.as_os_str().to_os_string());

        self.run(cwd, args).await.map(|_| ())
    }

    async fn open_checkout(&self, repository: &Path, dir: &Path) -> Result<(), BackendError> {
        // --force: directory need not be empty; --keep: never overwrite files on disk
        let args = [
            OsStr::new("open"),
            OsStr::new("--force"),
            OsStr::new("--keep"),
            OsStr::new("--nested"),
            repository.as_os_str(),
        ];
        self.run(dir, args).await.map(|_| ())
    }

    async fn is_checkout(&self, dir: &Path) -> Result<bool, BackendError> {
        let output = match self.run(dir, ["status"]).await {
            Ok(output) => output,
            Err(BackendError::Command { ref stderr, .. }) if is_outside_checkout(stderr) => {
                return Ok(false)
            }
            // Locked or corrupt checkout: never reopen over it
            Err(e) => return Err(e),
        };

        let Some(root) = parse_local_root(&output) else {
            return Ok(false);
        };

        // A checkout of a parent directory does not count
        Ok(same_dir(Path::new(&root), dir))
    }

    async fn pending_changes(
        &self,
        dir: &Path,
        filter: &ArtifactFilter,
    ) -> Result<Vec<PendingChange>, BackendError> {
        let changes = self.run(dir, ["changes"]).await?;
        let extras = self.run(dir, ["extras"]).await?;

        let mut pending: Vec<PendingChange> = parse_changes(&changes)
            .into_iter()
            .chain(parse_extras(&extras))
            .filter(|c| filter.matches(&c.path))
            .collect();

        pending.sort();
        pending.dedup_by(|a, b| a.path == b.path);
        Ok(pending)
    }

    async fn stage(&self, dir: &Path, changes: &[PendingChange]) -> Result<(), BackendError> {
        let additions: Vec<&OsStr> = changes
            .iter()
            .filter(|c| c.kind == ChangeKind::Untracked)
            .map(|c| c.path.as_os_str())
            .collect();
        let removals: Vec<&OsStr> = changes
            .iter()
            .filter(|c| c.kind == ChangeKind::Missing)
            .map(|c| c.path.as_os_str())
            .collect();

        if !additions.is_empty() {
            let args = std::iter::once(OsStr::new("add")).chain(additions);
            self.run(dir, args).await?;
        }
        if !removals.is_empty() {
            let args = std::iter::once(OsStr::new("rm")).chain(removals);
            self.run(dir, args).await?;
        }

        Ok(())
    }

    async fn commit(&self, dir: &Path, message: &str, paths: &[PathBuf]) -> Result<(), BackendError> {
        let mut args: Vec<OsString> = vec![
            "commit".into(),
            "--no-warnings".into(),
            "--nosync".into(),
            "-m".into(),
            message.into(),
        ];
        if let Some(ref user) = self.user {
            args.push("--user-override".into());
            args.push(user.into());
        }
        args.extend(paths.iter().map(|p| p.as_os_str().to_os_string()));

        self.run(dir, args).await.map(|_| ())
    }

    async fn ignore_list_add(&self, repository: &Path, entry: &str) -> Result<(), BackendError> {
        let cwd = parent_or_current(repository);
        let repo: &OsStr = repository.as_os_str();

        let current = self
            .run(cwd, [OsStr::new("settings"), OsStr::new("ignore-glob"), OsStr::new("-R"), repo])
            .await?;
        let Some(value) = extend_glob_list(&parse_setting(&current, "ignore-glob"), entry) else {
            return Ok(());
        };

        self.run(
            cwd,
            [
                OsStr::new("settings"),
                OsStr::new("ignore-glob"),
                OsStr::new(&value),
                OsStr::new("-R"),
                repo,
            ],
        )
        .await
        .map(|_| ())
    }
}

/// Parse `fossil changes` output (`EDITED     notes.txt`)
fn parse_changes(output: &str) -> Vec<PendingChange> {
    output
        .lines()
        .filter_map(|line| {
            let line = line.trim_end();
            let (status, path) = line.split_once(char::is_whitespace)?;
            let path = path.trim_start();
            if path.is_empty() {
                return None;
            }

            let kind = match status {
                "ADDED" | "ADDED_BY_MERGE" | "ADDED_BY_INTEGRATE" => ChangeKind::Added,
                "DELETED" => ChangeKind::Deleted,
                "MISSING" => ChangeKind::Missing,
                _ => ChangeKind::Edited,
            };
            Some(PendingChange::new(path, kind))
        })
        .collect()
}

/// Parse `fossil extras` output (one path per line)
fn parse_extras(output: &str) -> Vec<PendingChange> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| PendingChange::new(line, ChangeKind::Untracked))
        .collect()
}

/// True if fossil refused because `cwd` is not inside any checkout
///
/// Older releases spell it "checkout", newer ones "check-out".
fn is_outside_checkout(stderr: &str) -> bool {
    stderr
        .replace("check-out", "checkout")
        .contains("not within an open checkout")
}

/// Extract `local-root:` from `fossil status`
fn parse_local_root(output: &str) -> Option<String> {
    output.lines().find_map(|line| {
        line.strip_prefix("local-root:")
            .map(|root| root.trim().to_string())
            .filter(|root| !root.is_empty())
    })
}

/// Extract a setting value from `fossil settings <name>`
///
/// Output looks like `ignore-glob          (local)  *.o,*.obj`, or just the
/// name when unset.
fn parse_setting(output: &str, name: &str) -> String {
    let Some(rest) = output
        .lines()
        .find_map(|line| line.trim_start().strip_prefix(name))
    else {
        return String::new();
    };

    let rest = rest.trim();
    let rest = SETTING_SCOPES
        .iter()
        .find_map(|scope| rest.strip_prefix(scope))
        .unwrap_or(rest);
    rest.trim().to_string()
}

/// Append `entry` to a comma/whitespace separated glob list
///
/// Returns `None` when the entry is already present.
fn extend_glob_list(current: &str, entry: &str) -> Option<String> {
    let mut globs = current
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|g| !g.is_empty());

    if globs.any(|g| g == entry) {
        return None;
    }

    if current.trim().is_empty() {
        Some(entry.to_string())
    } else {
        Some(format!("{},{}", current.trim(), entry))
    }
}

fn parent_or_current(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

fn same_dir(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

fn describe(binary: &Path, args: &[OsString]) -> String {
    let mut command = binary.display().to_string();
    for arg in args {
        command.push(' ');
        command.push_str(&arg.to_string_lossy());
    }
    command
}
