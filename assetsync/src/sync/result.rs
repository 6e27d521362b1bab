//! Outcome of a synchronization run.

use crate::error::SyncError;

/// A file that could not be synchronized.
#[derive(Debug)]
pub struct FailedFile {
    /// Relative path of the file.
    pub path: String,
    pub error: SyncError,
}

/// Final report of one `install` run.
///
/// `completed` means the run reached its end: the manifest was fetched and
/// every scheduled task was attempted. It stays `true` when individual files
/// failed; check [`is_clean`](Self::is_clean) or `files_failed` for that.
#[derive(Debug, Default)]
pub struct SyncResult {
    pub completed: bool,
    /// Per-file failures, in manifest order.
    pub files_failed: Vec<FailedFile>,
    /// Relative paths written during this run.
    pub files_downloaded: Vec<String>,
    /// Files and directories that already matched.
    pub entries_skipped: usize,
    /// Bytes credited without a download.
    pub bytes_pre_skipped: u64,
    /// Bytes actually written.
    pub bytes_downloaded: u64,
    /// Stale files deleted before the download phase.
    pub files_removed: Vec<String>,
    /// Stale files that could not be deleted.
    pub files_not_removed: Vec<FailedFile>,
    /// Set when the caller cancelled before all tasks ran.
    pub cancelled: bool,
}

impl SyncResult {
    /// Completed with every download and every stale-file removal done.
    pub fn is_clean(&self) -> bool {
        self.completed && !self.has_failures()
    }

    /// Check if any download or stale-file removal failed.
    pub fn has_failures(&self) -> bool {
        !self.files_failed.is_empty() || !self.files_not_removed.is_empty()
    }

    /// Number of failed downloads plus failed removals.
    pub fn failure_count(&self) -> usize {
        self.files_failed.len() + self.files_not_removed.len()
    }

    /// Record a successful download.
    pub fn record_success(&mut self, path: String, bytes: u64) {
        self.bytes_downloaded += bytes;
        self.files_downloaded.push(path);
    }

    /// Record a failed download.
    pub fn record_failure(&mut self, path: String, error: SyncError) {
        self.files_failed.push(FailedFile { path, error });
    }
}
