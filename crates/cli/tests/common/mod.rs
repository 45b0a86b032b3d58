//! Common utilities for integration tests

pub mod cli;

// Re-export commonly used items
#[allow(unused_imports)]
pub use cli::{CommandResult, LullCommand};

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Just enough of the `fossil` CLI for the daemon to bootstrap and idle
#[allow(dead_code)]
const FAKE_FOSSIL: &str = r#"#!/bin/sh
case "$1" in
  init) : > "$2" ;;
  open) : > .fslckout ;;
  status)
    if [ -f .fslckout ]; then
      echo "local-root:   $(pwd)/"
    else
      echo "current directory is not within an open checkout" >&2
      exit 1
    fi
    ;;
  settings) echo "ignore-glob" ;;
esac
exit 0
"#;

/// Write the stand-in `fossil` into `dir` and return its path
#[allow(dead_code)]
pub fn fake_fossil(dir: &Path) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join("fossil");
    std::fs::write(&path, FAKE_FOSSIL).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

/// Poll `condition` until it holds or `timeout` elapses
#[allow(dead_code)]
pub async fn wait_for(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    condition()
}

/// Blocking variant of [`wait_for`] for plain `#[test]`s
#[allow(dead_code)]
pub fn wait_for_blocking(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(25));
    }
    condition()
}
