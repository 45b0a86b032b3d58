//! Command-line and environment settings
//!
//! Precedence: command line > environment > config file > defaults.

use anyhow::{Context, Result};
use clap::Args;
use lull_core::LullConfig;
use std::path::{Path, PathBuf};

/// Settings shared by every subcommand
#[derive(Debug, Clone, Default, Args)]
pub struct SettingsArgs {
    /// Directory to watch (default: current directory)
    #[arg(long, short = 'C', env = "LULL_DIR", global = true)]
    pub dir: Option<PathBuf>,

    /// Config file (default: <dir>/.lull.toml, then ~/.config/lull/config.toml)
    #[arg(long, env = "LULL_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Suffix of captured artifacts (e.g. ".txt")
    #[arg(long, env = "LULL_EXTENSION", global = true)]
    pub extension: Option<String>,

    /// Seconds of silence before committing
    #[arg(long, env = "LULL_QUIET_SECS", global = true)]
    pub quiet_secs: Option<u64>,

    /// Minimum seconds between commit attempts
    #[arg(long, env = "LULL_COOLDOWN_SECS", global = true)]
    pub cooldown_secs: Option<u64>,

    /// Seconds between engine probes for missed changes
    #[arg(long, env = "LULL_PROBE_SECS", global = true)]
    pub probe_secs: Option<u64>,

    /// Repository file name prefix
    #[arg(long, env = "LULL_REPO_PREFIX", global = true)]
    pub repo_prefix: Option<String>,

    /// Repository file name suffix
    #[arg(long, env = "LULL_REPO_SUFFIX", global = true)]
    pub repo_suffix: Option<String>,

    /// Fossil executable
    #[arg(long, env = "LULL_FOSSIL", global = true)]
    pub fossil: Option<PathBuf>,

    /// Write logs to this file instead of stderr
    #[arg(long, env = "LULL_LOG_FILE", global = true)]
    pub log_file: Option<PathBuf>,
}

impl SettingsArgs {
    /// Absolute, canonical watched directory
    pub fn watched_dir(&self) -> Result<PathBuf> {
        let dir = match self.dir {
            Some(ref dir) => dir.clone(),
            None => std::env::current_dir().context("Failed to get current directory")?,
        };

        let dir = dir
            .canonicalize()
            .with_context(|| format!("Watched directory {} is not accessible", dir.display()))?;

        if !dir.is_dir() {
            anyhow::bail!("Watched path {} is not a directory", dir.display());
        }
        Ok(dir)
    }

    /// Watched directory plus the effective, validated configuration
    pub fn resolve(&self) -> Result<(PathBuf, LullConfig)> {
        let dir = self.watched_dir()?;
        let config = self.config_for(&dir)?;
        Ok((dir, config))
    }

    /// Effective configuration for `dir`
    pub fn config_for(&self, dir: &Path) -> Result<LullConfig> {
        let mut config =
            LullConfig::discover(dir, self.config.as_deref()).context("Failed to load configuration")?;
        self.apply(&mut config);
        config.validate().context("Invalid configuration")?;
        Ok(config)
    }

    /// Overlay command-line/environment values
    fn apply(&self, config: &mut LullConfig) {
        if let Some(ref extension) = self.extension {
            config.watch.extension = extension.clone();
        }
        if let Some(secs) = self.quiet_secs {
            config.debounce.quiet_period_secs = secs;
        }
        if let Some(secs) = self.cooldown_secs {
            config.debounce.cooldown_secs = secs;
        }
        if let Some(secs) = self.probe_secs {
            config.debounce.probe_interval_secs = secs;
        }
        if let Some(ref prefix) = self.repo_prefix {
            config.repository.prefix = prefix.clone();
        }
        if let Some(ref suffix) = self.repo_suffix {
            config.repository.suffix = suffix.clone();
        }
        if let Some(ref fossil) = self.fossil {
            config.engine.binary = fossil.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lull_core::CONFIG_FILE_NAME;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_arguments_override_file() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(
            temp_dir.path().join(CONFIG_FILE_NAME),
            "[debounce]\nquiet_period_secs = 30\ncooldown_secs = 20\n",
        )
        .unwrap();

        let args = SettingsArgs {
            dir: Some(temp_dir.path().to_path_buf()),
            quiet_secs: Some(3),
            repo_prefix: Some("notes".to_string()),
            ..Default::default()
        };

        let (dir, config) = args.resolve().unwrap();
        assert_eq!(dir, temp_dir.path().canonicalize().unwrap());
        assert_eq!(config.debounce.quiet_period_secs, 3);
        assert_eq!(config.debounce.cooldown_secs, 20);
        assert_eq!(config.repository.prefix, "notes");
    }

    #[test]
    fn test_invalid_override_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let args = SettingsArgs {
            dir: Some(temp_dir.path().to_path_buf()),
            extension: Some("txt".to_string()),
            ..Default::default()
        };

        let err = args.resolve().unwrap_err();
        assert!(format!("{:#}", err).contains("watch.extension"));
    }

    #[test]
    fn test_missing_directory() {
        let temp_dir = TempDir::new().unwrap();
        let args = SettingsArgs {
            dir: Some(temp_dir.path().join("missing")),
            ..Default::default()
        };

        let err = args.watched_dir().unwrap_err();
        assert!(err.to_string().contains("not accessible"));
    }
}
