//! Daemon configuration
//!
//! Loaded from TOML; every field has a default so a missing file or a
//! partial file is fine. Lookup order for the file:
//! 1. Explicit path (`--config` / `LULL_CONFIG`)
//! 2. `<watched dir>/.lull.toml`
//! 3. `<user config dir>/lull/config.toml`

use crate::filter::ArtifactFilter;
use crate::naming::RepositoryNaming;
use crate::CONFIG_FILE_NAME;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error("invalid exclude pattern: {0}")]
    Pattern(#[from] ignore::Error),
}

/// Full daemon configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LullConfig {
    pub debounce: DebounceConfig,
    pub watch: WatchConfig,
    pub repository: RepositoryConfig,
    pub engine: EngineConfig,
}

/// `[debounce]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DebounceConfig {
    /// Seconds of silence required after the last change
    pub quiet_period_secs: u64,

    /// Minimum seconds between two commit attempts
    pub cooldown_secs: u64,

    /// Seconds between engine state probes
    pub probe_interval_secs: u64,
}

impl Default for DebounceConfig {
    fn default() -> Self {
        Self {
            quiet_period_secs: 10,
            cooldown_secs: 5,
            probe_interval_secs: 10,
        }
    }
}

/// `[watch]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// Suffix of captured artifacts
    pub extension: String,

    /// Extra exclude globs (gitignore syntax)
    pub exclude: Vec<String>,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            extension: ".txt".to_string(),
            exclude: Vec::new(),
        }
    }
}

/// `[repository]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepositoryConfig {
    pub prefix: String,
    pub suffix: String,

    /// Marker placed before the timestamp in every commit message
    pub commit_marker: String,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            prefix: "captures".to_string(),
            suffix: ".fossil".to_string(),
            commit_marker: "lull autosave".to_string(),
        }
    }
}

/// `[engine]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Fossil executable
    pub binary: PathBuf,

    /// Commit as this user instead of the repository default
    pub user: Option<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("fossil"),
            user: None,
        }
    }
}

impl LullConfig {
    /// Load configuration from an explicit TOML file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Find and load the configuration for `dir`, falling back to defaults
    ///
    /// An explicit path must exist; the implicit locations are optional.
    pub fn discover(dir: &Path, explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::load(path);
        }

        let local = dir.join(CONFIG_FILE_NAME);
        if local.is_file() {
            return Self::load(&local);
        }

        if let Some(user) = user_config_path().filter(|p| p.is_file()) {
            return Self::load(&user);
        }

        Ok(Self::default())
    }

    /// Validate ranges and required strings
    pub fn validate(&self) -> Result<(), ConfigError> {
        let d = &self.debounce;
        if !(1..=3600).contains(&d.quiet_period_secs) {
            return Err(ConfigError::Invalid(format!(
                "debounce.quiet_period_secs must be 1-3600 (got {})",
                d.quiet_period_secs
            )));
        }
        if d.cooldown_secs > 3600 {
            return Err(ConfigError::Invalid(format!(
                "debounce.cooldown_secs must be 0-3600 (got {})",
                d.cooldown_secs
            )));
        }
        if !(1..=3600).contains(&d.probe_interval_secs) {
            return Err(ConfigError::Invalid(format!(
                "debounce.probe_interval_secs must be 1-3600 (got {})",
                d.probe_interval_secs
            )));
        }

        if !self.watch.extension.starts_with('.') || self.watch.extension.len() < 2 {
            return Err(ConfigError::Invalid(format!(
                "watch.extension must look like \".txt\" (got {:?})",
                self.watch.extension
            )));
        }

        let r = &self.repository;
        if r.prefix.is_empty() || r.prefix.contains(std::path::is_separator) {
            return Err(ConfigError::Invalid(format!(
                "repository.prefix must be a non-empty file name part (got {:?})",
                r.prefix
            )));
        }
        if r.suffix.is_empty() || r.suffix.contains(std::path::is_separator) {
            return Err(ConfigError::Invalid(format!(
                "repository.suffix must be a non-empty file name part (got {:?})",
                r.suffix
            )));
        }
        if r.commit_marker.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "repository.commit_marker must not be empty".to_string(),
            ));
        }

        Ok(())
    }

    pub fn quiet_period(&self) -> Duration {
        Duration::from_secs(self.debounce.quiet_period_secs)
    }

    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.debounce.cooldown_secs)
    }

    pub fn probe_interval(&self) -> Duration {
        Duration::from_secs(self.debounce.probe_interval_secs)
    }

    pub fn naming(&self) -> RepositoryNaming {
        RepositoryNaming::new(&self.repository.prefix, &self.repository.suffix)
    }

    /// Artifact filter for the watched directory `root`
    pub fn filter(&self, root: &Path) -> Result<ArtifactFilter, ConfigError> {
        Ok(ArtifactFilter::new(
            root,
            &self.watch.extension,
            self.naming(),
            &self.watch.exclude,
        )?)
    }

    /// Render as TOML
    pub fn to_toml(&self) -> String {
        // Every field is a plain scalar, string or list; serialization cannot fail
        toml::to_string_pretty(self).unwrap_or_default()
    }
}

/// `<user config dir>/lull/config.toml`
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("lull").join("config.toml"))
}

/// Commented example configuration
pub fn example_config() -> &'static str {
    r#"# lull configuration
# Place at <watched dir>/.lull.toml or ~/.config/lull/config.toml

[debounce]
# Seconds of silence after the last change before committing (1-3600)
quiet_period_secs = 10
# Minimum seconds between commit attempts (0-3600)
cooldown_secs = 5
# Seconds between engine probes for missed changes (1-3600)
probe_interval_secs = 10

[watch]
# Suffix of captured artifacts
extension = ".txt"
# Extra exclude globs (gitignore syntax)
exclude = []

[repository]
# Repository files are named <prefix>_<NNN><suffix>
prefix = "captures"
suffix = ".fossil"
commit_marker = "lull autosave"

[engine]
binary = "fossil"
# user = "archiver"
"#
}
