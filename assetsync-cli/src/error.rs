//! CLI error type and exit codes.

use std::fmt;

use assetsync::logging::LoggingError;
use assetsync::{ConfigError, SyncError};

/// Exit code for fatal errors.
pub const EXIT_FATAL: i32 = 1;

/// Exit code when the run finished but some files failed.
pub const EXIT_FILES_FAILED: i32 = 2;

#[derive(Debug)]
pub enum CliError {
    /// Invalid or missing configuration.
    Config(String),
    /// Logging could not be set up.
    Logging(LoggingError),
    /// The synchronization run could not complete.
    Sync(SyncError),
    /// The run was interrupted by the user.
    Cancelled,
    /// The run completed but this many files failed.
    FilesFailed(usize),
}

impl CliError {
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::FilesFailed(_) => EXIT_FILES_FAILED,
            _ => EXIT_FATAL,
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CliError::Logging(e) => write!(f, "Logging error: {}", e),
            CliError::Sync(SyncError::Cancelled) | CliError::Cancelled => {
                write!(f, "Sync cancelled")
            }
            CliError::Sync(e) if e.is_network() => {
                write!(f, "Cannot reach the server: {}", e)
            }
            CliError::Sync(e) => write!(f, "Sync failed: {}", e),
            CliError::FilesFailed(1) => write!(f, "1 file failed to synchronize"),
            CliError::FilesFailed(n) => write!(f, "{} files failed to synchronize", n),
        }
    }
}

impl std::error::Error for CliError {}

impl From<SyncError> for CliError {
    fn from(e: SyncError) -> Self {
        CliError::Sync(e)
    }
}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        CliError::Config(e.to_string())
    }
}

impl From<LoggingError> for CliError {
    fn from(e: LoggingError) -> Self {
        CliError::Logging(e)
    }
}
