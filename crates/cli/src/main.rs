//! lull CLI - watch a directory and commit captured artifacts once it goes quiet

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use lull_cli::SettingsArgs;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

mod cmd;

/// lull - quiet-period autocommit for captured text
#[derive(Parser)]
#[command(name = "lull")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    settings: SettingsArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the daemon in the foreground until SIGINT/SIGTERM
    Run,
    /// Create or discover the repository and open the checkout, then exit
    Init,
    /// Show repository, checkout and daemon status
    Status,
    /// Stop the daemon watching this directory
    Stop {
        /// Seconds to wait for the daemon to exit
        #[arg(long, default_value = "10")]
        timeout: u64,
    },
    /// Commit pending artifacts immediately
    Commit,
    /// Show the effective configuration
    Config {
        /// Print a commented example file instead
        #[arg(long)]
        example: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let _log_guard = init_tracing(cli.settings.log_file.as_deref())?;

    match cli.command {
        Commands::Run => cmd::run::run(&cli.settings).await,
        Commands::Init => cmd::init::run(&cli.settings).await,
        Commands::Status => cmd::status::run(&cli.settings).await,
        Commands::Stop { timeout } => cmd::stop::run(&cli.settings, timeout).await,
        Commands::Commit => cmd::commit::run(&cli.settings).await,
        Commands::Config { example } => cmd::config::run(&cli.settings, example).await,
    }
}

/// Initialize tracing (stderr, or a log file when requested)
fn init_tracing(log_file: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let Some(path) = log_file else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
        return Ok(None);
    };

    let file_name = path
        .file_name()
        .with_context(|| format!("Invalid log file path: {}", path.display()))?;
    let log_dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(log_dir).context("Failed to create log directory")?;

    let appender = tracing_appender::rolling::never(log_dir, file_name);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .init();

    Ok(Some(guard))
}
