//! Bounded-concurrency execution of download tasks.
//!
//! Tasks run on a dedicated rayon pool with exactly `concurrency` threads.
//! Each worker blocks on one HTTP request at a time, so the pool size is the
//! ceiling on open file-fetch connections. A failed task is recorded and the
//! pool moves on; nothing short of cancellation stops the batch.

use std::path::Path;

use rayon::prelude::*;
use tokio_util::sync::CancellationToken;

use super::checksum::verify_checksum;
use super::progress::{ProgressReporter, ProgressStatus};
use super::result::SyncResult;
use super::task::{DownloadTask, FileUrlBuilder};
use super::traits::FileFetcher;
use crate::error::{EngineResult, SyncError};

/// Default number of download workers.
pub const DEFAULT_CONCURRENCY: usize = 10;

/// What happened to one task.
#[derive(Debug)]
enum TaskOutcome {
    Downloaded { path: String, bytes: u64 },
    Failed { path: String, error: SyncError },
    NotStarted,
}

/// Runs download tasks on a fixed-size worker pool.
pub struct DownloadScheduler<'a, F: FileFetcher + ?Sized> {
    fetcher: &'a F,
    urls: FileUrlBuilder,
    local_root: &'a Path,
    concurrency: usize,
    cancellation: CancellationToken,
}

impl<'a, F: FileFetcher + ?Sized> DownloadScheduler<'a, F> {
    /// Create a scheduler writing under `local_root`.
    ///
    /// `concurrency` is clamped to at least 1.
    pub fn new(
        fetcher: &'a F,
        urls: FileUrlBuilder,
        local_root: &'a Path,
        concurrency: usize,
    ) -> Self {
        Self {
            fetcher,
            urls,
            local_root,
            concurrency: concurrency.max(1),
            cancellation: CancellationToken::new(),
        }
    }

    /// Stop starting new tasks once `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Execute every task, advancing `reporter` by each task's expected size
    /// whether it succeeds or fails.
    ///
    /// # Errors
    ///
    /// Only fails if the worker pool cannot be created; per-task errors are
    /// collected in the returned [`SyncResult`].
    pub fn run(
        &self,
        tasks: &[DownloadTask],
        reporter: &ProgressReporter<'_>,
    ) -> EngineResult<SyncResult> {
        let mut result = SyncResult::default();
        if tasks.is_empty() {
            result.completed = true;
            return Ok(result);
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.concurrency)
            .thread_name(|i| format!("assetsync-download-{}", i))
            .build()
            .map_err(|e| SyncError::WorkerPool(e.to_string()))?;

        tracing::info!(
            tasks = tasks.len(),
            workers = self.concurrency,
            "Starting downloads"
        );

        let outcomes: Vec<TaskOutcome> = pool.install(|| {
            tasks
                .par_iter()
                .map(|task| self.run_task(task, reporter))
                .collect()
        });

        for outcome in outcomes {
            match outcome {
                TaskOutcome::Downloaded { path, bytes } => result.record_success(path, bytes),
                TaskOutcome::Failed { path, error } => result.record_failure(path, error),
                TaskOutcome::NotStarted => result.cancelled = true,
            }
        }
        result.completed = !result.cancelled;

        Ok(result)
    }

    fn run_task(&self, task: &DownloadTask, reporter: &ProgressReporter<'_>) -> TaskOutcome {
        if self.cancellation.is_cancelled() {
            return TaskOutcome::NotStarted;
        }

        let url = self.urls.url_for(&task.source_url);
        let dest = task.destination(self.local_root);

        let fetched = self.fetcher.fetch(&url, &dest).and_then(|bytes| {
            if let Some(expected) = task.expected_checksum.as_deref() {
                verify_checksum(&dest, &task.relative_path, expected)?;
            }
            Ok(bytes)
        });

        match fetched {
            Ok(bytes) => {
                tracing::debug!(path = %task.relative_path, bytes, "Downloaded");
                reporter.advance(
                    task.expected_size,
                    &task.relative_path,
                    ProgressStatus::Downloaded,
                    None,
                );
                TaskOutcome::Downloaded {
                    path: task.relative_path.clone(),
                    bytes,
                }
            }
            Err(error) => {
                tracing::warn!(path = %task.relative_path, url = %url, error = %error, "Download failed");
                reporter.advance(
                    task.expected_size,
                    &task.relative_path,
                    ProgressStatus::Error,
                    Some(error.to_string()),
                );
                TaskOutcome::Failed {
                    path: task.relative_path.clone(),
                    error,
                }
            }
        }
    }
}
