//! Removal of local files that the manifest no longer declares.
//!
//! Only files inside sync-enabled subtrees are touched (see
//! [`ManifestIndex::in_sync_subtree`]); anything else on disk is treated as
//! user content and left alone. Directories are never removed.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use super::result::FailedFile;
use crate::error::SyncError;
use crate::manifest::ManifestIndex;

/// Result of a cleanup pass.
#[derive(Debug, Default)]
pub struct ReapReport {
    /// Relative paths that were deleted.
    pub removed: Vec<String>,
    /// Files that could not be deleted.
    pub failed: Vec<FailedFile>,
}

/// Finds and deletes stale files.
#[derive(Debug, Default, Clone, Copy)]
pub struct StaleFileReaper;

impl StaleFileReaper {
    pub fn new() -> Self {
        Self
    }

    /// List stale files under `local_root` without deleting anything.
    ///
    /// Returned paths are relative, forward-slash separated, in walk order.
    pub fn find_stale(&self, index: &ManifestIndex, local_root: &Path) -> Vec<(String, PathBuf)> {
        if !local_root.is_dir() {
            return Vec::new();
        }

        let declared = index.file_paths();
        let mut stale = Vec::new();

        let walker = WalkDir::new(local_root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter();
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!(error = %e, "Skipping unreadable path during cleanup");
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let Some(rel) = relative_key(local_root, entry.path()) else {
                continue;
            };
            if !declared.contains(rel.as_str()) && index.in_sync_subtree(&rel) {
                stale.push((rel, entry.into_path()));
            }
        }

        stale
    }

    /// Delete every stale file under `local_root`.
    ///
    /// Failures are collected per file and never abort the pass.
    pub fn cleanup(&self, index: &ManifestIndex, local_root: &Path) -> ReapReport {
        self.cleanup_with(index, local_root, |path| fs::remove_file(path))
    }

    /// [`cleanup`](Self::cleanup) with a custom delete operation.
    pub fn cleanup_with<D>(
        &self,
        index: &ManifestIndex,
        local_root: &Path,
        remove: D,
    ) -> ReapReport
    where
        D: Fn(&Path) -> io::Result<()>,
    {
        let mut report = ReapReport::default();

        for (rel, path) in self.find_stale(index, local_root) {
            match remove(&path) {
                Ok(()) => {
                    tracing::info!(path = %rel, "Removed stale file");
                    report.removed.push(rel);
                }
                Err(e) => {
                    tracing::warn!(path = %rel, error = %e, "Failed to remove stale file");
                    report.failed.push(FailedFile {
                        path: rel,
                        error: SyncError::filesystem(path, e),
                    });
                }
            }
        }

        report
    }
}

/// Forward-slash relative path of `path` under `root`, if it is valid UTF-8.
fn relative_key(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let parts: Option<Vec<&str>> = rel.components().map(|c| c.as_os_str().to_str()).collect();
    match parts {
        Some(parts) => Some(parts.join("/")),
        None => {
            tracing::warn!(path = %path.display(), "Skipping non UTF-8 path during cleanup");
            None
        }
    }
}
