//! Show configuration
//!
//! Prints the effective configuration (file + environment + flags) as TOML,
//! or a commented example file.

use anyhow::Result;
use lull_cli::SettingsArgs;
use lull_core::config::{example_config, user_config_path};
use lull_core::CONFIG_FILE_NAME;
use owo_colors::OwoColorize;

pub async fn run(settings: &SettingsArgs, example: bool) -> Result<()> {
    if example {
        print!("{}", example_config());
        return Ok(());
    }

    let (dir, config) = settings.resolve()?;

    let source = match settings.config {
        Some(ref path) => path.display().to_string(),
        None => {
            let local = dir.join(CONFIG_FILE_NAME);
            match user_config_path() {
                _ if local.is_file() => local.display().to_string(),
                Some(user) if user.is_file() => user.display().to_string(),
                _ => "defaults".to_string(),
            }
        }
    };

    println!("{} {}", "# Watched directory:".dimmed(), dir.display());
    println!("{} {}", "# Loaded from:".dimmed(), source);
    println!();
    print!("{}", config.to_toml());
    Ok(())
}
