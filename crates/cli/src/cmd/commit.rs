//! Commit pending artifacts immediately, bypassing the debounce loop

use crate::cmd;
use anyhow::Result;
use lull_cli::{daemon, DaemonLock, SettingsArgs};
use lull_vcs::{CommitExecutor, CommitOutcome};
use owo_colors::OwoColorize;

pub async fn run(settings: &SettingsArgs) -> Result<()> {
    let (dir, config) = settings.resolve()?;
    let backend = cmd::backend(&config);

    // Refuses while a daemon owns the directory; one writer per checkout
    let _lock = DaemonLock::acquire(&dir)?;

    daemon::bootstrap(backend.as_ref(), &dir, &config.naming()).await?;

    let executor = CommitExecutor::new(
        backend,
        config.filter(&dir)?,
        config.repository.commit_marker.clone(),
    );

    match executor.attempt_commit().await {
        CommitOutcome::Committed { files } => {
            println!("{} Committed {} artifact(s)", "✓".green(), files);
            Ok(())
        }
        CommitOutcome::NoOp => {
            println!("Nothing to commit");
            Ok(())
        }
        CommitOutcome::Failed(reason) => anyhow::bail!("Commit failed: {}", reason),
    }
}
