//! Stop the daemon watching this directory

use anyhow::{Context, Result};
use lull_cli::locks::is_process_alive;
use lull_cli::{DaemonLock, SettingsArgs};
use lull_core::LOCK_FILE_NAME;
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use owo_colors::OwoColorize;
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

pub async fn run(settings: &SettingsArgs, timeout_secs: u64) -> Result<()> {
    let dir = settings.watched_dir()?;

    let Some(owner) = DaemonLock::owner(&dir)? else {
        println!("Daemon not running for {}", dir.display());
        return Ok(());
    };

    println!("Stopping daemon (pid {})...", owner.pid);
    kill(Pid::from_raw(owner.pid as i32), Signal::SIGTERM)
        .with_context(|| format!("Failed to signal pid {}", owner.pid))?;

    // Daemon removes its lock file on the way out
    let lock_path = dir.join(LOCK_FILE_NAME);
    let deadline = Instant::now() + Duration::from_secs(timeout_secs);
    while Instant::now() < deadline {
        if !lock_path.exists() || !is_process_alive(owner.pid) {
            println!("{} Daemon stopped", "✓".green());
            return Ok(());
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }

    anyhow::bail!("Daemon (pid {}) did not exit within {}s", owner.pid, timeout_secs)
}
