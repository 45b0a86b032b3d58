//! lull daemon and command-line support
//!
//! The binary (`lull`) is a thin clap front end over this library so the
//! daemon loop can be driven directly from integration tests.
//!
//! Unix only: the daemon lock relies on `flock` and shutdown on SIGTERM/SIGINT.

#[cfg(not(unix))]
compile_error!("lull supports unix platforms only (flock, SIGTERM/SIGINT)");

pub mod daemon;
pub mod locks;
pub mod settings;

pub use daemon::{run, DaemonSettings, ExitReason};
pub use locks::DaemonLock;
pub use settings::SettingsArgs;
