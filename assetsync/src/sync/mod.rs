//! Manifest-driven directory synchronization.
//!
//! Components, in the order a run uses them:
//!
//! - [`StaleFileReaper`]: deletes undeclared files in sync-enabled subtrees
//! - [`TreeDiffer`]: decides what to fetch, consulting [`IntegrityVerifier`]
//! - [`DownloadScheduler`]: runs fetches on a bounded worker pool
//! - [`ProgressAggregator`]: byte-weighted completion counter
//! - [`SyncEngine`]: wires them together
//!
//! Network access goes through the [`ManifestSource`] and [`FileFetcher`]
//! traits; [`HttpDownloader`] and [`ManifestClient`](crate::manifest::ManifestClient)
//! are the HTTP implementations.

mod checksum;
mod differ;
mod engine;
mod http;
mod progress;
mod reaper;
mod result;
mod scheduler;
mod task;
mod traits;
mod verifier;

pub use checksum::{calculate_file_checksum, verify_checksum};
pub use differ::{
    local_tree_size, local_tree_size_excluding, DiffPlan, SkippedEntry, TreeDiffer, VerifyMode,
};
pub use engine::{SyncEngine, SyncOptions, SyncPlan};
pub use http::{is_partial_download, HttpDownloader, DEFAULT_TIMEOUT_SECS, PARTIAL_SUFFIX};
pub use progress::{ProgressAggregator, ProgressEvent, ProgressReporter, ProgressStatus};
pub use reaper::{ReapReport, StaleFileReaper};
pub use result::{FailedFile, SyncResult};
pub use scheduler::{DownloadScheduler, DEFAULT_CONCURRENCY};
pub use task::{local_path, DownloadTask, FileUrlBuilder, PUBLIC_SEGMENT};
pub use traits::{FileFetcher, ManifestSource, NullSink, ProgressSink};
pub use verifier::{ExpectedFile, IntegrityVerifier, LocalFileInfo};
