//! Synchronization run orchestration.
//!
//! One [`SyncEngine::install`] call performs a full run:
//!
//! 1. fetch and validate the manifest (fatal on failure)
//! 2. index it and remove stale files from sync-enabled subtrees
//! 3. diff against disk, crediting already-present bytes to progress
//! 4. download the remaining files on a bounded worker pool
//! 5. emit `complete` and return the [`SyncResult`]

use std::path::Path;

use tokio_util::sync::CancellationToken;

use super::differ::{DiffPlan, TreeDiffer, VerifyMode};
use super::http::HttpDownloader;
use super::progress::{ProgressEvent, ProgressReporter, ProgressStatus};
use super::reaper::{ReapReport, StaleFileReaper};
use super::result::SyncResult;
use super::scheduler::DownloadScheduler;
use super::task::{local_path, FileUrlBuilder};
use super::traits::{FileFetcher, ManifestSource, ProgressSink};
use crate::config::SyncConfig;
use crate::error::{EngineResult, SyncError};
use crate::manifest::{Manifest, ManifestClient, ManifestIndex};

/// Behavior switches for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncOptions {
    pub verify_mode: VerifyMode,
    /// Delete undeclared files inside sync-enabled subtrees.
    pub reap_stale: bool,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            verify_mode: VerifyMode::default(),
            reap_stale: true,
        }
    }
}

/// What a run would do, computed without touching disk.
#[derive(Debug, Clone)]
pub struct SyncPlan {
    /// Declared `total_size` of the manifest.
    pub total_size: u64,
    pub diff: DiffPlan,
    /// Relative paths that would be removed.
    pub stale: Vec<String>,
}

impl SyncPlan {
    /// Bytes that would be downloaded.
    pub fn fetch_bytes(&self) -> u64 {
        self.diff.fetch_bytes()
    }

    /// Whether a run would change nothing on disk.
    pub fn is_noop(&self) -> bool {
        self.diff.is_up_to_date() && self.stale.is_empty()
    }
}

/// Drives manifest fetch, cleanup, diff and download.
pub struct SyncEngine<M, F> {
    source: M,
    fetcher: F,
    options: SyncOptions,
    cancellation: CancellationToken,
}

impl<M: ManifestSource, F: FileFetcher> SyncEngine<M, F> {
    pub fn new(source: M, fetcher: F) -> Self {
        Self {
            source,
            fetcher,
            options: SyncOptions::default(),
            cancellation: CancellationToken::new(),
        }
    }

    pub fn with_options(mut self, options: SyncOptions) -> Self {
        self.options = options;
        self
    }

    /// Use an externally owned cancellation token.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    pub fn options(&self) -> SyncOptions {
        self.options
    }

    /// Token that stops the current and future runs when cancelled.
    ///
    /// Downloads already in flight finish; nothing new starts.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation.clone()
    }

    /// Synchronize `target_dir` with the manifest for `package_id`.
    ///
    /// # Errors
    ///
    /// Manifest fetch, parse and validation failures abort the run and are
    /// returned after an `error` event reaches `sink`. Per-file failures do not
    /// abort; they are collected in [`SyncResult::files_failed`].
    pub fn install(
        &self,
        package_id: Option<&str>,
        target_dir: &Path,
        concurrency: usize,
        sink: &dyn ProgressSink,
    ) -> EngineResult<SyncResult> {
        sink.on_event(&ProgressEvent::new(0.0, "", ProgressStatus::Start));
        tracing::info!(
            package = package_id.unwrap_or("<default>"),
            target = %target_dir.display(),
            concurrency,
            "Starting sync"
        );

        let (manifest, index) = match self.load(package_id) {
            Ok(loaded) => loaded,
            Err(e) => {
                tracing::error!(error = %e, "Sync aborted");
                sink.on_event(
                    &ProgressEvent::new(0.0, "", ProgressStatus::Error).with_message(e.to_string()),
                );
                return Err(e);
            }
        };

        let mut result = SyncResult::default();
        let reporter = ProgressReporter::new(manifest.total_size, sink);

        if self.options.reap_stale {
            let report = StaleFileReaper::new().cleanup(&index, target_dir);
            record_reap(report, &mut result, &reporter);
        }

        // Stale files that survived cleanup are still stale; keep them out of
        // directory size sums the same way `plan` does.
        let leftovers = result
            .files_not_removed
            .iter()
            .map(|f| local_path(target_dir, &f.path));
        let plan = TreeDiffer::new(self.options.verify_mode)
            .with_ignored(leftovers)
            .diff(&index, target_dir);

        for entry in &plan.skipped {
            reporter.advance(entry.bytes, &entry.path, ProgressStatus::Skipped, None);
        }

        let urls = FileUrlBuilder::new(&manifest.base_url, &manifest.target);
        let downloads = DownloadScheduler::new(&self.fetcher, urls, target_dir, concurrency)
            .with_cancellation(self.cancellation.clone())
            .run(&plan.tasks, &reporter)?;

        result.completed = downloads.completed;
        result.cancelled = downloads.cancelled;
        result.files_downloaded = downloads.files_downloaded;
        result.files_failed = downloads.files_failed;
        result.bytes_downloaded = downloads.bytes_downloaded;
        result.entries_skipped = plan.skipped.len();
        result.bytes_pre_skipped = plan.pre_skipped_bytes;

        if result.cancelled {
            tracing::warn!(
                downloaded = result.files_downloaded.len(),
                pending = plan
                    .tasks
                    .len()
                    .saturating_sub(result.files_downloaded.len() + result.files_failed.len()),
                "Sync cancelled"
            );
            reporter.emit(ProgressStatus::Error, Some(SyncError::Cancelled.to_string()));
        } else {
            tracing::info!(
                downloaded = result.files_downloaded.len(),
                failed = result.files_failed.len(),
                not_removed = result.files_not_removed.len(),
                skipped = result.entries_skipped,
                removed = result.files_removed.len(),
                "Sync complete"
            );
            reporter.emit(ProgressStatus::Complete, None);
        }

        Ok(result)
    }

    /// Compute what [`install`](Self::install) would do without changing
    /// anything on disk.
    pub fn plan(&self, package_id: Option<&str>, target_dir: &Path) -> EngineResult<SyncPlan> {
        let (manifest, index) = self.load(package_id)?;

        let found = if self.options.reap_stale {
            StaleFileReaper::new().find_stale(&index, target_dir)
        } else {
            Vec::new()
        };
        let (stale, stale_paths): (Vec<String>, Vec<_>) = found.into_iter().unzip();

        // `install` deletes stale files before diffing, so they must not
        // count toward directory sizes here either.
        let diff = TreeDiffer::new(self.options.verify_mode)
            .with_ignored(stale_paths)
            .diff(&index, target_dir);

        Ok(SyncPlan {
            total_size: manifest.total_size,
            diff,
            stale,
        })
    }

    fn load(&self, package_id: Option<&str>) -> EngineResult<(Manifest, ManifestIndex)> {
        if self.cancellation.is_cancelled() {
            return Err(SyncError::Cancelled);
        }

        let manifest = self.source.fetch(package_id)?;
        let index = ManifestIndex::build(&manifest)?;
        tracing::debug!(
            entries = index.len(),
            total_size = manifest.total_size,
            target = %manifest.target,
            "Manifest loaded"
        );

        Ok((manifest, index))
    }
}

/// Move a cleanup report into `result`, reporting each failed removal.
fn record_reap(report: ReapReport, result: &mut SyncResult, reporter: &ProgressReporter<'_>) {
    for failed in &report.failed {
        reporter.advance(
            0,
            &failed.path,
            ProgressStatus::Error,
            Some(format!("could not remove stale file: {}", failed.error)),
        );
    }
    result.files_removed = report.removed;
    result.files_not_removed = report.failed;
}

impl SyncEngine<ManifestClient, HttpDownloader> {
    /// Build an engine backed by HTTP from runtime configuration.
    pub fn from_config(config: &SyncConfig) -> EngineResult<Self> {
        let source = ManifestClient::with_timeout(config.endpoint.clone(), config.timeout)?;
        let fetcher = HttpDownloader::with_timeout(config.download_timeout)?;

        Ok(Self::new(source, fetcher).with_options(SyncOptions {
            verify_mode: config.verify_mode,
            reap_stale: config.reap_stale,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::parse_manifest;
    use crate::sync::traits::NullSink;
    use std::fs;
    use std::sync::Mutex;
    use tempfile::TempDir;

    struct StaticSource(String);

    impl ManifestSource for StaticSource {
        fn fetch(&self, _package_id: Option<&str>) -> EngineResult<Manifest> {
            parse_manifest(&self.0)
        }
    }

    struct FailingSource;

    impl ManifestSource for FailingSource {
        fn fetch(&self, _package_id: Option<&str>) -> EngineResult<Manifest> {
            Err(SyncError::Server {
                message: "maintenance".to_string(),
            })
        }
    }

    struct WriteName;

    impl FileFetcher for WriteName {
        fn fetch(&self, url: &str, dest: &Path) -> EngineResult<u64> {
            fs::create_dir_all(dest.parent().unwrap()).unwrap();
            fs::write(dest, url).unwrap();
            Ok(url.len() as u64)
        }
    }

    const MANIFEST: &str = r#"{
        "status": "ok", "total_size": 3, "target": "", "base_url": "http://h",
        "files": [
            {"type": "dir", "name": "mods", "size": 3, "sync": true, "children": [
                {"type": "file", "name": "a.jar", "size": 3}
            ]}
        ]
    }"#;

    #[test]
    fn test_manifest_failure_is_fatal_and_reported() {
        let temp = TempDir::new().unwrap();
        let events = Mutex::new(Vec::new());
        let sink = |e: &ProgressEvent| events.lock().unwrap().push(e.clone());

        let engine = SyncEngine::new(FailingSource, WriteName);
        let err = engine.install(None, temp.path(), 2, &sink).unwrap_err();

        assert!(matches!(err, SyncError::Server { .. }));
        let events = events.lock().unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].status, ProgressStatus::Start);
        assert_eq!(events[1].status, ProgressStatus::Error);
        assert_eq!(events[1].message.as_deref(), Some("server error: maintenance"));
    }

    #[test]
    fn test_plan_does_not_touch_disk() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("mods")).unwrap();
        fs::write(temp.path().join("mods/old.jar"), b"x").unwrap();

        let engine = SyncEngine::new(StaticSource(MANIFEST.to_string()), WriteName);
        let plan = engine.plan(None, temp.path()).unwrap();

        assert_eq!(plan.total_size, 3);
        assert_eq!(plan.diff.tasks.len(), 1);
        assert_eq!(plan.stale, vec!["mods/old.jar"]);
        assert!(!plan.is_noop());
        assert!(temp.path().join("mods/old.jar").exists());
        assert!(!temp.path().join("mods/a.jar").exists());
    }

    #[test]
    fn test_reap_disabled_keeps_stale_files() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("mods")).unwrap();
        fs::write(temp.path().join("mods/old.jar"), b"x").unwrap();

        let engine = SyncEngine::new(StaticSource(MANIFEST.to_string()), WriteName).with_options(
            SyncOptions {
                reap_stale: false,
                ..Default::default()
            },
        );
        let result = engine.install(None, temp.path(), 1, &NullSink).unwrap();

        assert!(result.is_clean());
        assert!(result.files_removed.is_empty());
        assert!(temp.path().join("mods/old.jar").exists());
        assert!(engine.plan(None, temp.path()).unwrap().stale.is_empty());
    }

    const MODS_WITH_TWO_JARS: &str = r#"{
        "status": "ok", "total_size": 100, "target": "", "base_url": "http://h",
        "files": [
            {"type": "dir", "name": "mods", "size": 100, "sync": true, "children": [
                {"type": "file", "name": "a.jar", "size": 60},
                {"type": "file", "name": "b.jar", "size": 40}
            ]}
        ]
    }"#;

    struct SizedBodies;

    impl FileFetcher for SizedBodies {
        fn fetch(&self, url: &str, dest: &Path) -> EngineResult<u64> {
            let size = if url.ends_with("a.jar") { 60 } else { 40 };
            fs::create_dir_all(dest.parent().unwrap()).unwrap();
            fs::write(dest, vec![0u8; size]).unwrap();
            Ok(size as u64)
        }
    }

    #[test]
    fn test_plan_matches_install_when_stale_file_fills_directory_size() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("mods")).unwrap();
        fs::write(temp.path().join("mods/a.jar"), vec![0u8; 60]).unwrap();
        fs::write(temp.path().join("mods/old.jar"), vec![0u8; 40]).unwrap();

        let engine = SyncEngine::new(StaticSource(MODS_WITH_TWO_JARS.to_string()), SizedBodies);
        let plan = engine.plan(None, temp.path()).unwrap();
        let planned: Vec<&str> = plan
            .diff
            .tasks
            .iter()
            .map(|t| t.relative_path.as_str())
            .collect();
        assert_eq!(plan.stale, vec!["mods/old.jar"]);

        let result = engine.install(None, temp.path(), 1, &NullSink).unwrap();

        assert_eq!(planned, vec!["mods/b.jar"]);
        assert_eq!(result.files_downloaded, planned);
        assert_eq!(result.files_removed, plan.stale);
        assert!(result.is_clean());
    }

    #[test]
    fn test_failed_stale_removal_is_reported() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("mods")).unwrap();
        fs::write(temp.path().join("mods/old.jar"), b"x").unwrap();
        let index = ManifestIndex::build(&parse_manifest(MANIFEST).unwrap()).unwrap();

        let report = StaleFileReaper::new().cleanup_with(&index, temp.path(), |_| {
            Err(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "denied",
            ))
        });

        let events = Mutex::new(Vec::new());
        let sink = |e: &ProgressEvent| events.lock().unwrap().push(e.clone());
        let reporter = ProgressReporter::new(3, &sink);
        let mut result = SyncResult {
            completed: true,
            ..Default::default()
        };
        record_reap(report, &mut result, &reporter);

        assert!(!result.is_clean());
        assert!(result.files_removed.is_empty());
        assert_eq!(result.files_not_removed.len(), 1);
        assert_eq!(result.files_not_removed[0].path, "mods/old.jar");

        let events = events.lock().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].status, ProgressStatus::Error);
        assert_eq!(events[0].path, "mods/old.jar");
        assert_eq!(events[0].percent, 0.0);
        assert!(events[0]
            .message
            .as_deref()
            .unwrap()
            .starts_with("could not remove stale file"));
    }

    #[test]
    fn test_cancel_before_fetch() {
        let temp = TempDir::new().unwrap();
        let engine = SyncEngine::new(StaticSource(MANIFEST.to_string()), WriteName);
        engine.cancellation_token().cancel();

        let err = engine.install(None, temp.path(), 1, &NullSink).unwrap_err();
        assert!(matches!(err, SyncError::Cancelled));
    }
}
