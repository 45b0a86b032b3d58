//! Bootstrap the repository and checkout without starting the daemon

use crate::cmd;
use anyhow::Result;
use lull_cli::{daemon, DaemonLock, SettingsArgs};
use lull_vcs::CheckoutState;
use owo_colors::OwoColorize;

pub async fn run(settings: &SettingsArgs) -> Result<()> {
    let (dir, config) = settings.resolve()?;
    let backend = cmd::backend(&config);

    // Refuses while a daemon owns the directory; one writer per checkout
    let _lock = DaemonLock::acquire(&dir)?;

    let (handle, checkout) = daemon::bootstrap(backend.as_ref(), &dir, &config.naming()).await?;

    if handle.created {
        println!("{} Created repository {}", "✓".green(), handle.path.display().cyan());
    } else {
        println!("Using repository {}", handle.path.display().cyan());
    }

    match checkout {
        CheckoutState::Opened => println!("{} Opened checkout in {}", "✓".green(), dir.display()),
        CheckoutState::AlreadyOpen => println!("Checkout already open in {}", dir.display()),
    }

    println!();
    println!("Next steps:");
    println!("  - Run 'lull run' to start watching for *{} files", config.watch.extension);
    println!("  - Run 'lull status' to check pending artifacts");
    Ok(())
}
