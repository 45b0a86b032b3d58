//! Run the lull daemon in the foreground

use crate::cmd;
use anyhow::Result;
use lull_cli::daemon::{self, DaemonSettings};
use lull_cli::{DaemonLock, SettingsArgs};
use tracing::info;

pub async fn run(settings: &SettingsArgs) -> Result<()> {
    let (dir, config) = settings.resolve()?;

    let lock = DaemonLock::acquire(&dir)?;
    let shutdown = daemon::termination_signal()?;
    let daemon_settings = DaemonSettings::from_config(&dir, &config)?;

    info!(
        "Starting lull in {} (quiet {}s, cooldown {}s, watching *{})",
        dir.display(),
        config.debounce.quiet_period_secs,
        config.debounce.cooldown_secs,
        config.watch.extension
    );

    let result = daemon::run(daemon_settings, cmd::backend(&config), shutdown).await;

    // The directory may be gone by now; dropping ignores a missing lock file
    drop(lock);
    result.map(|_| ())
}
