//! CLI command implementations

pub mod commit;
pub mod config;
pub mod init;
pub mod run;
pub mod status;
pub mod stop;

use lull_core::LullConfig;
use lull_vcs::{FossilBackend, VersioningBackend};
use std::sync::Arc;

/// Fossil backend as configured
pub fn backend(config: &LullConfig) -> Arc<dyn VersioningBackend> {
    Arc::new(FossilBackend::new(&config.engine.binary).with_user(config.engine.user.clone()))
}
