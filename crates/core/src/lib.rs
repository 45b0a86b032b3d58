//! Shared building blocks for lull
//!
//! This crate provides:
//! - Daemon configuration (TOML file, defaults, validation)
//! - Numbered repository naming (`<prefix>_<NNN><suffix>`)
//! - Artifact filtering (watched suffix, engine internals, editor temp files)

pub mod config;
pub mod filter;
pub mod naming;

// Re-exports
pub use config::{ConfigError, LullConfig};
pub use filter::ArtifactFilter;
pub use naming::RepositoryNaming;

/// Name of the per-directory daemon lock file
pub const LOCK_FILE_NAME: &str = ".lull.lock";

/// Name of the per-directory configuration file
pub const CONFIG_FILE_NAME: &str = ".lull.toml";
