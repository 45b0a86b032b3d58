//! Numbered repository naming
//!
//! Repository files live inside the watched directory and are named
//! `<prefix>_<NNN><suffix>`, where `NNN` is zero-padded to at least three
//! digits. Gaps are tolerated: the highest number found always wins.

use std::path::{Path, PathBuf};

/// Width of the zero-padded repository number
const NUMBER_WIDTH: usize = 3;

/// Naming convention for repository files
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryNaming {
    prefix: String,
    suffix: String,
}

impl RepositoryNaming {
    pub fn new(prefix: impl Into<String>, suffix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            suffix: suffix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    /// File name for repository number `number` (e.g. `captures_007.fossil`)
    pub fn file_name(&self, number: u32) -> String {
        format!(
            "{}_{:0width$}{}",
            self.prefix,
            number,
            self.suffix,
            width = NUMBER_WIDTH
        )
    }

    /// Parse the repository number out of a file name
    ///
    /// Returns `None` unless the name is exactly `<prefix>_<digits><suffix>`
    /// with at least three digits.
    pub fn parse(&self, file_name: &str) -> Option<u32> {
        let rest = file_name.strip_prefix(&self.prefix)?.strip_prefix('_')?;
        let digits = rest.strip_suffix(&self.suffix)?;

        if digits.len() < NUMBER_WIDTH || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }

        digits.parse().ok()
    }

    /// True if `file_name` is a repository file under this convention
    pub fn matches(&self, file_name: &str) -> bool {
        self.parse(file_name).is_some()
    }

    /// Scan `dir` (non-recursive) and return every repository found,
    /// sorted by number ascending
    pub fn scan(&self, dir: &Path) -> std::io::Result<Vec<(u32, PathBuf)>> {
        let mut found = Vec::new();

        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }

            let name = entry.file_name();
            if let Some(number) = name.to_str().and_then(|n| self.parse(n)) {
                found.push((number, entry.path()));
            }
        }

        found.sort_by_key(|(number, _)| *number);
        Ok(found)
    }

    /// Highest-numbered repository in `dir`, if any
    pub fn highest(&self, dir: &Path) -> std::io::Result<Option<(u32, PathBuf)>> {
        Ok(self.scan(dir)?.pop())
    }
}

impl Default for RepositoryNaming {
    fn default() -> Self {
        Self::new("captures", ".fossil")
    }
}

/// Number to allocate next given the highest one already present
pub fn next_number(highest: Option<u32>) -> u32 {
    highest.unwrap_or(0) + 1
}
