//! assetsync CLI - Command-line interface
//!
//! Synchronizes a local directory with a server manifest.

mod commands;
mod error;
mod progress;

use std::path::PathBuf;
use std::process;

use assetsync::{logging, ConfigFile};
use clap::{Parser, Subcommand};

use commands::common::{load_config, SyncArgs};
use commands::config::ConfigCommands;
use error::CliError;

#[derive(Parser)]
#[command(name = "assetsync")]
#[command(version, about = "Keep a local asset directory in sync with a remote manifest", long_about = None)]
struct Cli {
    /// Path to the config file (default: platform config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Download, verify and clean up files to match the manifest
    Sync(SyncArgs),

    /// Show what `sync` would change without touching disk
    Plan(SyncArgs),

    /// Inspect configuration
    #[command(subcommand)]
    Config(ConfigCommands),
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        process::exit(e.exit_code());
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let config_path = cli.config.as_deref();

    match &cli.command {
        Commands::Config(command) => commands::config::run(command, config_path),
        Commands::Sync(args) => {
            let file = load_config(config_path)?;
            let _log_guard = init_logging(&file, cli.verbose)?;
            commands::sync::run(args, &file)
        }
        Commands::Plan(args) => {
            let file = load_config(config_path)?;
            let _log_guard = init_logging(&file, cli.verbose)?;
            commands::plan::run(args, &file)
        }
    }
}

fn init_logging(
    file: &ConfigFile,
    verbose: bool,
) -> Result<Option<logging::WorkerGuard>, CliError> {
    let mut log_config = file.logging.clone();
    if verbose {
        log_config.level = "debug".to_string();
    }
    Ok(logging::init(&log_config)?)
}
