//! Show repository, checkout and daemon status

use crate::cmd;
use anyhow::Result;
use lull_cli::{DaemonLock, SettingsArgs};
use lull_vcs::CommitExecutor;
use owo_colors::OwoColorize;

pub async fn run(settings: &SettingsArgs) -> Result<()> {
    let (dir, config) = settings.resolve()?;
    let naming = config.naming();
    let backend = cmd::backend(&config);

    println!("{}", "Capture Directory Status".bold());
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!();
    println!("Directory:     {}", dir.display().to_string().cyan());

    // Repository (read-only: never creates one)
    print!("Repository:    ");
    match naming.highest(&dir)? {
        Some((_, path)) => println!("{}", path.display()),
        None => {
            println!("{}", "none".yellow());
            println!("  {}", "Tip: Create one with 'lull init'".dimmed());
        }
    }

    // Checkout
    print!("Checkout:      ");
    let open = match backend.is_checkout(&dir).await {
        Ok(true) => {
            println!("{}", "open ✓".green());
            true
        }
        Ok(false) => {
            println!("{}", "not open".yellow());
            false
        }
        Err(e) => {
            println!("{} ({})", "unknown".yellow(), e.to_string().dimmed());
            false
        }
    };

    // Daemon
    print!("Daemon:        ");
    match DaemonLock::owner(&dir)? {
        Some(owner) => println!("{} (pid {})", "Running ✓".green(), owner.pid),
        None => {
            println!("{}", "Not running".yellow());
            println!("  {}", "Tip: Start with 'lull run'".dimmed());
        }
    }
    println!();

    // Pending artifacts
    if open {
        let executor = CommitExecutor::new(
            backend,
            config.filter(&dir)?,
            config.repository.commit_marker.clone(),
        );
        match executor.pending_changes().await {
            Ok(pending) if pending.is_empty() => println!("Pending:       nothing to commit"),
            Ok(pending) => {
                println!("Pending:       {} artifact(s)", pending.len());
                for change in &pending {
                    println!("  {:<10} {}", format!("{:?}", change.kind).dimmed(), change.path.display());
                }
            }
            Err(e) => println!("Pending:       {} ({})", "unknown".yellow(), e),
        }
    }

    Ok(())
}
