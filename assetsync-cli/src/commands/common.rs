//! Common types and utilities shared across CLI commands.

use std::path::{Path, PathBuf};
use std::time::Duration;

use assetsync::{ConfigFile, SyncConfig, VerifyMode};
use clap::{Args, ValueEnum};

use crate::error::CliError;

/// Verification strategy for CLI arguments.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum VerifyArg {
    /// Skip directories whose total size already matches
    Shortcut,
    /// Check every file individually
    Full,
}

impl From<VerifyArg> for VerifyMode {
    fn from(arg: VerifyArg) -> Self {
        match arg {
            VerifyArg::Shortcut => VerifyMode::SizeShortcut,
            VerifyArg::Full => VerifyMode::Full,
        }
    }
}

/// Arguments shared by `sync` and `plan`.
#[derive(Debug, Clone, Default, Args)]
pub struct SyncArgs {
    /// Manifest endpoint URL
    #[arg(long)]
    pub endpoint: Option<String>,

    /// Package id to synchronize
    #[arg(short, long)]
    pub package: Option<String>,

    /// Local directory to keep in sync
    #[arg(short, long = "target-dir")]
    pub target_dir: Option<PathBuf>,

    /// Maximum simultaneous downloads
    #[arg(short = 'j', long)]
    pub concurrency: Option<usize>,

    /// Manifest request timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// How existing files are verified
    #[arg(long, value_enum)]
    pub verify: Option<VerifyArg>,

    /// Keep files the manifest no longer lists
    #[arg(long)]
    pub no_reap: bool,
}

impl SyncArgs {
    /// Merge with file settings. Command-line values win.
    pub fn resolve(&self, file: &ConfigFile) -> Result<SyncConfig, CliError> {
        let mut config = file.sync.clone();

        if let Some(endpoint) = &self.endpoint {
            config.endpoint = endpoint.clone();
        }
        if let Some(package) = &self.package {
            config = config.with_package(package.clone());
        }
        if let Some(dir) = &self.target_dir {
            config = config.with_target_dir(dir.clone());
        }
        if let Some(n) = self.concurrency {
            if n == 0 {
                return Err(CliError::Config(
                    "--concurrency must be at least 1".to_string(),
                ));
            }
            config = config.with_concurrency(n);
        }
        if let Some(secs) = self.timeout {
            config = config.with_timeout(Duration::from_secs(secs));
        }
        if let Some(verify) = self.verify {
            config = config.with_verify_mode(verify.into());
        }
        if self.no_reap {
            config = config.with_reap_stale(false);
        }

        config.validate().map_err(|e| {
            CliError::Config(format!(
                "{}. Set it in config.ini or pass --endpoint",
                e
            ))
        })?;
        Ok(config)
    }
}

/// Path of the config file in use: `--config` or the platform default.
pub fn config_path(cli_path: Option<&Path>) -> Option<PathBuf> {
    cli_path.map(Path::to_path_buf).or_else(ConfigFile::default_path)
}

/// Load the config file, falling back to defaults when there is none.
pub fn load_config(cli_path: Option<&Path>) -> Result<ConfigFile, CliError> {
    match config_path(cli_path) {
        Some(path) => {
            tracing::debug!(path = %path.display(), "Loading config");
            Ok(ConfigFile::load(&path)?)
        }
        None => Ok(ConfigFile::default()),
    }
}

/// Format a byte count for display.
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} B", bytes)
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}
