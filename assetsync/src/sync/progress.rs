//! Progress accounting for synchronization runs.
//!
//! [`ProgressAggregator`] is the shared byte counter; it only ever grows.
//! [`ProgressReporter`] pairs the counter with the caller's sink and
//! serializes "advance then emit", so the percentages a sink observes are
//! non-decreasing even when workers finish concurrently.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use super::traits::ProgressSink;

/// Kind of progress event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressStatus {
    /// Run started.
    Start,
    /// A file was written.
    Downloaded,
    /// A file or directory already matched the manifest.
    Skipped,
    /// Run finished (possibly with per-file failures).
    Complete,
    /// A file failed, or the run aborted.
    Error,
}

impl ProgressStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Downloaded => "downloaded",
            Self::Skipped => "skipped",
            Self::Complete => "complete",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for ProgressStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One progress notification.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressEvent {
    /// Overall completion, 0–100.
    pub percent: f64,
    /// Relative path the event is about; empty for run-level events.
    pub path: String,
    pub status: ProgressStatus,
    pub message: Option<String>,
}

impl ProgressEvent {
    pub fn new(percent: f64, path: impl Into<String>, status: ProgressStatus) -> Self {
        Self {
            percent,
            path: path.into(),
            status,
            message: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

/// Thread-safe done/total byte counter.
///
/// `total` is fixed at construction; `done` only grows through
/// [`advance`](Self::advance).
#[derive(Debug)]
pub struct ProgressAggregator {
    total: u64,
    done: AtomicU64,
}

impl ProgressAggregator {
    pub fn new(total: u64) -> Self {
        Self {
            total,
            done: AtomicU64::new(0),
        }
    }

    /// Add `bytes` to the done counter and return the resulting percentage.
    pub fn advance(&self, bytes: u64) -> f64 {
        let previous = self.done.fetch_add(bytes, Ordering::SeqCst);
        self.percent_of(previous.saturating_add(bytes))
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn done(&self) -> u64 {
        self.done.load(Ordering::SeqCst)
    }

    /// Current percentage without advancing.
    pub fn percent(&self) -> f64 {
        self.percent_of(self.done())
    }

    fn percent_of(&self, done: u64) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        (done as f64 / self.total as f64 * 100.0).min(100.0)
    }
}

/// Emits progress events to a sink in counter order.
pub struct ProgressReporter<'a> {
    aggregator: ProgressAggregator,
    sink: &'a dyn ProgressSink,
    emit_lock: Mutex<()>,
}

impl<'a> ProgressReporter<'a> {
    pub fn new(total: u64, sink: &'a dyn ProgressSink) -> Self {
        Self {
            aggregator: ProgressAggregator::new(total),
            sink,
            emit_lock: Mutex::new(()),
        }
    }

    /// Advance by `bytes` and emit an event for `path`.
    pub fn advance(
        &self,
        bytes: u64,
        path: &str,
        status: ProgressStatus,
        message: Option<String>,
    ) -> f64 {
        let _guard = self.emit_lock.lock().unwrap_or_else(|e| e.into_inner());
        let percent = self.aggregator.advance(bytes);
        self.sink.on_event(&ProgressEvent {
            percent,
            path: path.to_string(),
            status,
            message,
        });
        percent
    }

    /// Emit a run-level event at the current percentage.
    pub fn emit(&self, status: ProgressStatus, message: Option<String>) {
        let _guard = self.emit_lock.lock().unwrap_or_else(|e| e.into_inner());
        self.sink.on_event(&ProgressEvent {
            percent: self.aggregator.percent(),
            path: String::new(),
            status,
            message,
        });
    }

    pub fn aggregator(&self) -> &ProgressAggregator {
        &self.aggregator
    }
}
