//! Manifest-vs-disk comparison producing the minimal fetch set.
//!
//! The differ walks the manifest index with an explicit stack. Directories may
//! be skipped wholesale by the aggregate-size shortcut: when the local
//! directory's total file size equals the declared size, none of its files are
//! inspected. Two different file sets with the same total size look identical
//! to this rule; [`VerifyMode::Full`] disables it.
//!
//! The size sum leaves out interrupted downloads (`*.part`) and any files the
//! caller marks as ignored, normally the stale files a run is about to delete.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use super::http::is_partial_download;
use super::task::{local_path, DownloadTask};
use super::verifier::{ExpectedFile, IntegrityVerifier, LocalFileInfo};
use crate::manifest::{IndexedKind, ManifestIndex, NodeId};

/// How thoroughly existing files are checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VerifyMode {
    /// Skip directories whose local total size matches the manifest.
    #[default]
    SizeShortcut,
    /// Check every file individually.
    Full,
}

impl VerifyMode {
    /// Parse a config value (`shortcut` or `full`).
    pub fn from_config_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "shortcut" | "size" => Some(Self::SizeShortcut),
            "full" => Some(Self::Full),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SizeShortcut => "shortcut",
            Self::Full => "full",
        }
    }
}

/// A manifest entry that needs no download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedEntry {
    pub path: String,
    /// Bytes credited to progress for this entry.
    pub bytes: u64,
    /// `true` when a whole directory was skipped by the size shortcut.
    pub directory: bool,
}

/// Output of a diff.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiffPlan {
    /// Files to download, in manifest order.
    pub tasks: Vec<DownloadTask>,
    /// Entries already satisfied locally, in manifest order.
    pub skipped: Vec<SkippedEntry>,
    /// Sum of `skipped[*].bytes`.
    pub pre_skipped_bytes: u64,
}

impl DiffPlan {
    /// Sum of expected sizes of all scheduled downloads.
    pub fn fetch_bytes(&self) -> u64 {
        self.tasks.iter().map(|t| t.expected_size).sum()
    }

    /// Whether nothing needs to be downloaded.
    pub fn is_up_to_date(&self) -> bool {
        self.tasks.is_empty()
    }

    fn skip(&mut self, path: &str, bytes: u64, directory: bool) {
        self.pre_skipped_bytes = self.pre_skipped_bytes.saturating_add(bytes);
        self.skipped.push(SkippedEntry {
            path: path.to_string(),
            bytes,
            directory,
        });
    }
}

/// Computes which manifest files must be fetched.
#[derive(Debug, Clone, Default)]
pub struct TreeDiffer {
    verifier: IntegrityVerifier,
    mode: VerifyMode,
    ignored: HashSet<PathBuf>,
}

impl TreeDiffer {
    pub fn new(mode: VerifyMode) -> Self {
        Self {
            verifier: IntegrityVerifier::new(),
            mode,
            ignored: HashSet::new(),
        }
    }

    /// Leave `paths` out of directory size sums.
    pub fn with_ignored<I>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = PathBuf>,
    {
        self.ignored.extend(paths);
        self
    }

    pub fn mode(&self) -> VerifyMode {
        self.mode
    }

    /// Compare the manifest against `local_root`.
    ///
    /// Skipped directories credit the sum of their descendant file sizes, so
    /// `pre_skipped_bytes + fetch_bytes()` always equals the manifest's file
    /// total.
    pub fn diff(&self, index: &ManifestIndex, local_root: &Path) -> DiffPlan {
        let mut plan = DiffPlan::default();
        let mut stack: Vec<NodeId> = index.roots().iter().rev().copied().collect();

        while let Some(id) = stack.pop() {
            let node = index.node(id);
            let local = local_path(local_root, &node.path);

            match &node.kind {
                IndexedKind::Directory { children } => {
                    if self.mode == VerifyMode::SizeShortcut
                        && local_tree_size_excluding(&local, &self.ignored) == Some(node.size)
                    {
                        let bytes = index.descendant_file_bytes(id);
                        tracing::debug!(path = %node.path, bytes, "Directory size matches, skipping subtree");
                        plan.skip(&node.path, bytes, true);
                    } else {
                        stack.extend(children.iter().rev().copied());
                    }
                }
                IndexedKind::File { checksum, url } => {
                    let info = LocalFileInfo::inspect(&local).unwrap_or_else(|e| {
                        tracing::warn!(path = %node.path, error = %e, "Cannot stat local file");
                        None
                    });
                    let expected = ExpectedFile {
                        size: node.size,
                        checksum: checksum.as_deref(),
                        sync: node.sync,
                    };

                    if self.verifier.should_fetch(info.as_ref(), &expected) {
                        plan.tasks.push(DownloadTask {
                            relative_path: node.path.clone(),
                            expected_size: node.size,
                            expected_checksum: checksum.clone(),
                            source_url: url.clone(),
                        });
                    } else {
                        plan.skip(&node.path, node.size, false);
                    }
                }
            }
        }

        tracing::debug!(
            fetch = plan.tasks.len(),
            skipped = plan.skipped.len(),
            pre_skipped_bytes = plan.pre_skipped_bytes,
            "Diff complete"
        );
        plan
    }
}

/// Recursive sum of file sizes under `dir`, or `None` if `dir` is not a
/// readable directory.
pub fn local_tree_size(dir: &Path) -> Option<u64> {
    local_tree_size_excluding(dir, &HashSet::new())
}

/// [`local_tree_size`] without the files in `ignored`.
///
/// Interrupted downloads (`*.part`) are never counted.
pub fn local_tree_size_excluding(dir: &Path, ignored: &HashSet<PathBuf>) -> Option<u64> {
    if !dir.is_dir() {
        return None;
    }
    let mut total = 0u64;
    for entry in WalkDir::new(dir).follow_links(false) {
        let entry = entry.ok()?;
        if !entry.file_type().is_file()
            || is_partial_download(entry.path())
            || ignored.contains(entry.path())
        {
            continue;
        }
        total = total.saturating_add(entry.metadata().ok()?.len());
    }
    Some(total)
}
