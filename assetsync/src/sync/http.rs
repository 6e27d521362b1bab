//! HTTP file downloader.
//!
//! Each file is fetched with a single GET and streamed to disk, replacing any
//! previous content. There is no resume support: a failed transfer is simply
//! retried on the next run.

use std::fs::{self, File};
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::StatusCode;

use super::traits::FileFetcher;
use crate::error::{EngineResult, SyncError};

/// Default timeout for a single file request in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 300; // 5 minutes

/// Buffer size for reading/writing during downloads (64KB).
const BUFFER_SIZE: usize = 64 * 1024;

/// Suffix of in-progress download files.
pub const PARTIAL_SUFFIX: &str = ".part";

/// Blocking HTTP downloader shared by all download workers.
#[derive(Debug, Clone)]
pub struct HttpDownloader {
    client: Client,
    timeout: Duration,
}

impl HttpDownloader {
    /// Create a downloader with the default timeout.
    pub fn new() -> EngineResult<Self> {
        Self::with_timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// Create a downloader with a custom per-request timeout.
    pub fn with_timeout(timeout: Duration) -> EngineResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SyncError::Network {
                url: String::new(),
                reason: format!("failed to create HTTP client: {}", e),
            })?;

        Ok(Self { client, timeout })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Stream the response body into `dest`.
    ///
    /// The body goes to a `.part` sibling first and is renamed over `dest`
    /// once complete, so an interrupted transfer never leaves a truncated
    /// file behind.
    fn stream_to_file(
        &self,
        url: &str,
        response: reqwest::blocking::Response,
        dest: &Path,
    ) -> EngineResult<u64> {
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).map_err(|e| SyncError::filesystem(parent, e))?;
        }

        let partial = partial_path(dest);
        let written = match self.write_body(url, response, &partial) {
            Ok(written) => written,
            Err(e) => {
                fs::remove_file(&partial).ok();
                return Err(e);
            }
        };

        fs::rename(&partial, dest).map_err(|e| {
            fs::remove_file(&partial).ok();
            SyncError::filesystem(dest, e)
        })?;

        Ok(written)
    }

    fn write_body(
        &self,
        url: &str,
        mut response: reqwest::blocking::Response,
        path: &Path,
    ) -> EngineResult<u64> {
        let file = File::create(path).map_err(|e| SyncError::filesystem(path, e))?;

        let mut writer = BufWriter::new(file);
        let mut buffer = vec![0u8; BUFFER_SIZE];
        let mut downloaded = 0u64;

        loop {
            let bytes_read = response
                .read(&mut buffer)
                .map_err(|e| SyncError::from_body_read(url, &e, self.timeout.as_secs()))?;

            if bytes_read == 0 {
                break;
            }

            writer
                .write_all(&buffer[..bytes_read])
                .map_err(|e| SyncError::filesystem(path, e))?;

            downloaded += bytes_read as u64;
        }

        writer.flush().map_err(|e| SyncError::filesystem(path, e))?;

        Ok(downloaded)
    }
}

/// Temporary download location next to `dest`.
fn partial_path(dest: &Path) -> PathBuf {
    let mut name = dest.file_name().unwrap_or_default().to_os_string();
    name.push(PARTIAL_SUFFIX);
    dest.with_file_name(name)
}

/// Whether `path` is a download left behind by an interrupted run.
pub fn is_partial_download(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.len() > PARTIAL_SUFFIX.len() && name.ends_with(PARTIAL_SUFFIX))
}

impl FileFetcher for HttpDownloader {
    fn fetch(&self, url: &str, dest: &Path) -> EngineResult<u64> {
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|e| SyncError::from_transport(url, &e, self.timeout.as_secs()))?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(SyncError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        self.stream_to_file(url, response, dest)
    }
}
