//! Artifact filtering for the watched directory
//!
//! Decides whether a path is a captured artifact worth committing:
//! 1. Built-in exclusions (always enforced): Fossil checkout database,
//!    SQLite side files, repository files, the daemon lock, editor temp files
//! 2. User exclude globs (gitignore syntax, from `[watch] exclude`)
//! 3. The watched suffix (default `.txt`)
//!
//! Only direct children of the watched directory ever match.

use crate::naming::RepositoryNaming;
use crate::LOCK_FILE_NAME;
use ignore::gitignore::{Gitignore, GitignoreBuilder};
use std::path::{Component, Path, PathBuf};

/// Checkout database names Fossil may create in a working directory
const CHECKOUT_DB_NAMES: &[&str] = &[".fslckout", "_FOSSIL_"];

/// SQLite side files written next to any database on every transaction
const SQLITE_SIDE_SUFFIXES: &[&str] = &["-journal", "-wal", "-shm"];

/// Filter for captured artifacts
#[derive(Debug, Clone)]
pub struct ArtifactFilter {
    /// Watched directory
    root: PathBuf,

    /// Required file suffix
    extension: String,

    /// Repository naming, so repository files are never treated as artifacts
    naming: RepositoryNaming,

    /// User exclude globs (optional)
    excludes: Option<Gitignore>,
}

impl ArtifactFilter {
    /// Build a filter for `root`
    pub fn new(
        root: &Path,
        extension: impl Into<String>,
        naming: RepositoryNaming,
        exclude_patterns: &[String],
    ) -> Result<Self, ignore::Error> {
        let excludes = if exclude_patterns.is_empty() {
            None
        } else {
            let mut builder = GitignoreBuilder::new(root);
            for pattern in exclude_patterns {
                builder.add_line(None, pattern)?;
            }
            Some(builder.build()?)
        };

        Ok(Self {
            root: root.to_path_buf(),
            extension: extension.into(),
            naming,
            excludes,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Check if path is a captured artifact
    ///
    /// Accepts absolute paths under the root or paths relative to it.
    pub fn matches(&self, path: &Path) -> bool {
        let Some(file_name) = self.direct_child_name(path) else {
            return false;
        };

        if self.is_engine_internal(file_name) || is_editor_temp(file_name) {
            return false;
        }

        if let Some(ref excludes) = self.excludes {
            if excludes.matched(Path::new(file_name), false).is_ignore() {
                return false;
            }
        }

        file_name.len() > self.extension.len() && file_name.ends_with(&self.extension)
    }

    /// Check if a file name belongs to the versioning engine or the daemon
    ///
    /// These are touched by every commit and must never count as a change.
    pub fn is_engine_internal(&self, file_name: &str) -> bool {
        if CHECKOUT_DB_NAMES.contains(&file_name) || file_name == LOCK_FILE_NAME {
            return true;
        }

        if SQLITE_SIDE_SUFFIXES.iter().any(|s| file_name.ends_with(s)) {
            return true;
        }

        self.naming.matches(file_name)
    }

    /// File name of `path` if it sits directly inside the root
    fn direct_child_name<'a>(&self, path: &'a Path) -> Option<&'a str> {
        let relative = if path.is_absolute() {
            path.strip_prefix(&self.root).ok()?
        } else {
            path
        };

        let mut components = relative.components();
        let first = components.next()?;
        if components.next().is_some() {
            return None;
        }

        match first {
            Component::Normal(name) => name.to_str(),
            _ => None,
        }
    }
}

/// Check if name is an editor temporary or OS metadata file
///
/// Covers: Vim swap/backup, Emacs auto-save and lock files, macOS/Windows metadata
fn is_editor_temp(file_name: &str) -> bool {
    // Vim swap files (.swp, .swo, .swn, .swm)
    if file_name.ends_with(".swp")
        || file_name.ends_with(".swo")
        || file_name.ends_with(".swn")
        || file_name.ends_with(".swm")
    {
        return true;
    }

    // Vim/Emacs backup files (~)
    if file_name.ends_with('~') {
        return true;
    }

    // Emacs auto-save (#*#) and lock files (.#*)
    if (file_name.starts_with('#') && file_name.ends_with('#')) || file_name.starts_with(".#") {
        return true;
    }

    file_name == ".DS_Store" || file_name.starts_with("._") || file_name == "Thumbs.db"
}
