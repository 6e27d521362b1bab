//! Download tasks and file URL construction.

use std::path::{Path, PathBuf};

/// Fixed path segment between the server origin and package files.
pub const PUBLIC_SEGMENT: &str = "public";

/// One file to fetch. Produced by the differ, consumed once by the scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadTask {
    /// Forward-slash path relative to the sync root.
    pub relative_path: String,
    pub expected_size: u64,
    pub expected_checksum: Option<String>,
    /// Source path relative to the package's public root.
    pub source_url: String,
}

impl DownloadTask {
    /// Destination of this task under `root`.
    pub fn destination(&self, root: &Path) -> PathBuf {
        local_path(root, &self.relative_path)
    }
}

/// Join a forward-slash relative path onto a local root.
pub fn local_path(root: &Path, relative: &str) -> PathBuf {
    relative
        .split('/')
        .filter(|c| !c.is_empty())
        .fold(root.to_path_buf(), |acc, c| acc.join(c))
}

/// Builds download URLs: `{base_url}/public/{target/}{source_url}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileUrlBuilder {
    prefix: String,
}

impl FileUrlBuilder {
    pub fn new(base_url: &str, target: &str) -> Self {
        let base = base_url.trim_end_matches('/');
        let target = target.trim_matches('/');
        let prefix = if target.is_empty() {
            format!("{}/{}/", base, PUBLIC_SEGMENT)
        } else {
            format!("{}/{}/{}/", base, PUBLIC_SEGMENT, target)
        };
        Self { prefix }
    }

    /// Full URL for a task's source path.
    pub fn url_for(&self, source_url: &str) -> String {
        format!("{}{}", self.prefix, source_url.trim_start_matches('/'))
    }
}
