//! Core traits for the synchronization engine.
//!
//! The engine talks to the network and to its caller only through these
//! traits, so every component can be exercised with in-memory doubles.

use std::path::Path;

use super::progress::ProgressEvent;
use crate::error::EngineResult;
use crate::manifest::Manifest;

/// Source of manifests for a package.
pub trait ManifestSource: Send + Sync {
    /// Fetch and parse the manifest for `package_id` (or the default package).
    fn fetch(&self, package_id: Option<&str>) -> EngineResult<Manifest>;
}

/// Fetches a single remote file to a local path.
pub trait FileFetcher: Send + Sync {
    /// Download `url` into `dest`, creating parent directories and replacing
    /// any existing file.
    ///
    /// Returns the number of bytes written.
    fn fetch(&self, url: &str, dest: &Path) -> EngineResult<u64>;
}

impl<T: ManifestSource + ?Sized> ManifestSource for &T {
    fn fetch(&self, package_id: Option<&str>) -> EngineResult<Manifest> {
        (**self).fetch(package_id)
    }
}

impl<T: FileFetcher + ?Sized> FileFetcher for &T {
    fn fetch(&self, url: &str, dest: &Path) -> EngineResult<u64> {
        (**self).fetch(url, dest)
    }
}

/// Receiver of progress events from a synchronization run.
///
/// Events arrive unthrottled and possibly from worker threads; consumers that
/// render progress should apply their own rate limiting.
pub trait ProgressSink: Send + Sync {
    fn on_event(&self, event: &ProgressEvent);
}

impl<F> ProgressSink for F
where
    F: Fn(&ProgressEvent) + Send + Sync,
{
    fn on_event(&self, event: &ProgressEvent) {
        self(event)
    }
}

/// A sink that discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl ProgressSink for NullSink {
    fn on_event(&self, _event: &ProgressEvent) {}
}
