//! Change detection and debouncing for lull
//!
//! This crate provides:
//! - Non-recursive directory watching filtered to captured artifacts
//! - A periodic engine probe as a fallback for missed notifications
//! - The debounce state machine that decides when to commit

pub mod debounce;
pub mod detector;
pub mod probe;

// Re-exports
pub use debounce::{DebouncePolicy, DebounceScheduler, DebounceState, Decision};
pub use detector::{ChangeDetector, Signal};
pub use probe::ChangeProbe;
