//! Terminal progress rendering for sync runs.

use assetsync::{ProgressEvent, ProgressSink, ProgressStatus};
use indicatif::{ProgressBar, ProgressStyle};

/// Bar resolution: one step per tenth of a percent.
const BAR_STEPS: u64 = 1000;

/// Renders engine events as a single progress bar.
///
/// indicatif limits redraws on its own, so every event can be forwarded.
pub struct ConsoleProgress {
    bar: ProgressBar,
}

impl ConsoleProgress {
    pub fn new() -> Self {
        let bar = ProgressBar::new(BAR_STEPS);
        let style = ProgressStyle::with_template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {percent:>3}% {wide_msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("#>-");
        bar.set_style(style);
        Self { bar }
    }

    fn set_percent(&self, percent: f64) {
        let position = (percent.clamp(0.0, 100.0) * BAR_STEPS as f64 / 100.0).round() as u64;
        self.bar.set_position(position);
    }
}

impl Default for ConsoleProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressSink for ConsoleProgress {
    fn on_event(&self, event: &ProgressEvent) {
        self.set_percent(event.percent);

        match event.status {
            ProgressStatus::Start => self.bar.set_message("fetching manifest"),
            ProgressStatus::Downloaded | ProgressStatus::Skipped => {
                self.bar.set_message(event.path.clone())
            }
            ProgressStatus::Error if !event.path.is_empty() => {
                self.bar.println(format!(
                    "  failed: {} ({})",
                    event.path,
                    event.message.as_deref().unwrap_or("unknown error")
                ));
            }
            ProgressStatus::Error => self
                .bar
                .abandon_with_message(event.message.clone().unwrap_or_default()),
            ProgressStatus::Complete => self.bar.finish_with_message("done"),
        }
    }
}
