//! Progress reporting for mapper runs
//!
//! Observers are driven by the mapper's collector loop, one event per
//! completed key. They never run on worker tasks and cannot hold up
//! dispatch.

use crate::keys::Key;
use indicatif::{ProgressBar, ProgressStyle};

/// Snapshot emitted after each completed fetch
#[derive(Debug, Clone, Copy)]
pub struct ProgressEvent<'a> {
    /// Keys completed so far, success or failure
    pub completed: usize,

    /// Keys in the run
    pub total: usize,

    /// Failures so far
    pub failures: usize,

    /// The key that just completed
    pub key: &'a Key,

    /// Its error, if it failed
    pub error: Option<&'a str>,
}

/// Receives progress from a running mapper
pub trait ProgressObserver: Send {
    /// Called once before dispatch with the number of keys
    fn on_start(&mut self, _total: usize) {}

    /// Called after each completed fetch
    fn on_progress(&mut self, event: &ProgressEvent<'_>);

    /// Called once after the last outcome has been collected
    fn on_finish(&mut self, _completed: usize, _failures: usize) {}
}

/// Discards all progress
#[derive(Debug, Default)]
pub struct NoProgress;

impl ProgressObserver for NoProgress {
    fn on_progress(&mut self, _event: &ProgressEvent<'_>) {}
}

/// Reports progress through `tracing`
///
/// Logs a summary line every `every` completions and a warning for each
/// failed key.
#[derive(Debug)]
pub struct LogProgress {
    every: usize,
}

impl LogProgress {
    pub fn new(every: usize) -> Self {
        Self {
            every: every.max(1),
        }
    }
}

impl Default for LogProgress {
    fn default() -> Self {
        Self::new(25)
    }
}

impl ProgressObserver for LogProgress {
    fn on_start(&mut self, total: usize) {
        tracing::info!("Fetching weather for {} locations", total);
    }

    fn on_progress(&mut self, event: &ProgressEvent<'_>) {
        if let Some(error) = event.error {
            tracing::warn!("Failed to fetch {}: {}", event.key, error);
        }

        if event.completed % self.every == 0 || event.completed == event.total {
            tracing::info!(
                "Progress: {}/{} locations, {} failed",
                event.completed,
                event.total,
                event.failures
            );
        }
    }

    fn on_finish(&mut self, completed: usize, failures: usize) {
        tracing::info!("Completed {} locations ({} failed)", completed, failures);
    }
}

/// Terminal progress bar showing completed count and running failure count
pub struct BarProgress {
    bar: ProgressBar,
}

impl BarProgress {
    pub fn new() -> Self {
        let bar = ProgressBar::new(0).with_style(
            ProgressStyle::with_template(
                "{prefix} [{bar:40.cyan/blue}] {pos}/{len} locations ({percent}%) {eta} {msg}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> "),
        );
        bar.set_prefix("Fetching weather");
        Self { bar }
    }

    /// Wraps an existing bar (hidden bars are useful in tests)
    pub fn with_bar(bar: ProgressBar) -> Self {
        Self { bar }
    }

    pub fn bar(&self) -> &ProgressBar {
        &self.bar
    }
}

impl Default for BarProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressObserver for BarProgress {
    fn on_start(&mut self, total: usize) {
        self.bar.set_length(total as u64);
    }

    fn on_progress(&mut self, event: &ProgressEvent<'_>) {
        self.bar.set_position(event.completed as u64);
        if event.error.is_some() {
            self.bar.set_message(format!("err={}", event.failures));
        }
    }

    fn on_finish(&mut self, completed: usize, failures: usize) {
        self.bar.finish_with_message(format!(
            "✓ {} done, {} failed",
            completed, failures
        ));
    }
}
