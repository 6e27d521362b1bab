//! Error types for manifest fetching and synchronization runs.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, SyncError>;

/// Errors that can occur while synchronizing a directory against a manifest.
///
/// Manifest-level errors (`Network`, `Timeout`, `Server`, `Parse`,
/// `InvalidManifest`) abort a run. Per-file errors (`HttpStatus`, `Filesystem`,
/// `IntegrityMismatch`, and transport errors while fetching a file) are recorded
/// against the file and the run continues.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Connection to the server failed.
    #[error("network error reaching {url}: {reason}")]
    Network { url: String, reason: String },

    /// Request exceeded the configured timeout.
    #[error("request to {url} timed out after {timeout_secs}s")]
    Timeout { url: String, timeout_secs: u64 },

    /// The manifest endpoint answered with a non-ok status.
    #[error("server error: {message}")]
    Server { message: String },

    /// A file request answered with a status other than 200.
    #[error("HTTP {status}")]
    HttpStatus { url: String, status: u16 },

    /// The manifest body is not valid JSON of the expected shape.
    #[error("failed to parse manifest: {0}")]
    Parse(String),

    /// The manifest parsed but violates a structural rule.
    #[error("invalid manifest: {0}")]
    InvalidManifest(String),

    /// Reading, writing or deleting a local path failed.
    #[error("filesystem error at {}: {source}", path.display())]
    Filesystem {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A freshly written file does not hash to the manifest checksum.
    #[error("checksum mismatch for {path}: expected {expected}, got {actual}")]
    IntegrityMismatch {
        path: String,
        expected: String,
        actual: String,
    },

    /// The download worker pool could not be started.
    #[error("failed to start download workers: {0}")]
    WorkerPool(String),

    /// The run was cancelled by the caller.
    #[error("cancelled")]
    Cancelled,
}

impl SyncError {
    /// Wrap an I/O error with the path it happened on.
    pub fn filesystem(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Filesystem {
            path: path.into(),
            source,
        }
    }

    /// Map a reqwest transport error, distinguishing timeouts.
    pub(crate) fn from_transport(url: &str, err: &reqwest::Error, timeout_secs: u64) -> Self {
        if err.is_timeout() {
            Self::Timeout {
                url: url.to_string(),
                timeout_secs,
            }
        } else {
            Self::Network {
                url: url.to_string(),
                reason: err.to_string(),
            }
        }
    }

    /// Map an I/O error raised while reading a response body.
    ///
    /// reqwest reports body timeouts either as `TimedOut` or as a wrapped
    /// `reqwest::Error`; both become [`SyncError::Timeout`].
    pub(crate) fn from_body_read(url: &str, err: &io::Error, timeout_secs: u64) -> Self {
        let timed_out = err.kind() == io::ErrorKind::TimedOut
            || err
                .get_ref()
                .and_then(|inner| inner.downcast_ref::<reqwest::Error>())
                .is_some_and(reqwest::Error::is_timeout);
        if timed_out {
            Self::Timeout {
                url: url.to_string(),
                timeout_secs,
            }
        } else {
            Self::Network {
                url: url.to_string(),
                reason: format!("read error: {}", err),
            }
        }
    }

    /// Whether this error means the server could not be reached at all.
    pub fn is_network(&self) -> bool {
        matches!(self, Self::Network { .. } | Self::Timeout { .. })
    }
}
