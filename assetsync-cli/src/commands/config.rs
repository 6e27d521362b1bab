//! Configuration inspection commands.
//!
//! Provides `config path` and `config show`.

use std::path::Path;

use clap::Subcommand;

use super::common::{config_path, load_config};
use crate::error::CliError;

/// Config subcommands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Show the configuration file path
    Path,

    /// Print the effective configuration as INI
    Show,
}

/// Run a config subcommand.
pub fn run(command: &ConfigCommands, cli_path: Option<&Path>) -> Result<(), CliError> {
    match command {
        ConfigCommands::Path => run_path(cli_path),
        ConfigCommands::Show => run_show(cli_path),
    }
}

fn run_path(cli_path: Option<&Path>) -> Result<(), CliError> {
    let path = config_path(cli_path).ok_or_else(|| {
        CliError::Config("No configuration directory on this platform".to_string())
    })?;

    println!("{}", path.display());
    if !path.exists() {
        println!("(file does not exist; defaults are in effect)");
    }
    Ok(())
}

fn run_show(cli_path: Option<&Path>) -> Result<(), CliError> {
    let config = load_config(cli_path)?;
    print!("{}", config.to_ini_string());
    Ok(())
}
