//! assetsync - manifest-driven directory synchronization
//!
//! Keeps a local directory tree identical to the file set a server describes
//! in a JSON manifest: fetches missing or changed files on a bounded worker
//! pool, verifies them by SHA-256, and removes files the manifest no longer
//! declares inside server-managed subtrees.
//!
//! ```no_run
//! use assetsync::{SyncConfig, SyncEngine, NullSink};
//!
//! let config = SyncConfig::new("https://example.com/api/manifest")
//!     .with_package("vanilla-plus")
//!     .with_target_dir("/home/user/.game");
//! let engine = SyncEngine::from_config(&config)?;
//! let result = engine.install(
//!     config.package.as_deref(),
//!     &config.target_dir,
//!     config.concurrency,
//!     &NullSink,
//! )?;
//! assert!(result.is_clean());
//! # Ok::<(), assetsync::SyncError>(())
//! ```

pub mod config;
pub mod error;
pub mod logging;
pub mod manifest;
pub mod sync;

pub use config::{ConfigError, ConfigFile, SyncConfig};
pub use error::{EngineResult, SyncError};
pub use manifest::{Manifest, ManifestClient, ManifestNode};
pub use sync::{
    NullSink, ProgressEvent, ProgressSink, ProgressStatus, SyncEngine, SyncOptions, SyncPlan,
    SyncResult, VerifyMode,
};
