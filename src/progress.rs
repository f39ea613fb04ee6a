//! Decorative spinner shown while a report is being assembled.
//!
//! Purely terminal UX: the spinner ticks on indicatif's background thread,
//! carries no data dependency, and is cleared whether the wrapped work
//! succeeded or failed. Disabled entirely in quiet/plain mode.

use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

pub struct Spinner {
    bar: Option<ProgressBar>,
}

impl Spinner {
    pub fn start(message: &str, enabled: bool) -> Self {
        if !enabled {
            return Self { bar: None };
        }
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.set_message(message.to_string());
        bar.enable_steady_tick(Duration::from_millis(100));
        Self { bar: Some(bar) }
    }

    pub fn stop(&self) {
        if let Some(bar) = &self.bar {
            bar.finish_and_clear();
        }
    }
}

impl Drop for Spinner {
    // Clear on the error path too so a failed report doesn't leave a
    // half-drawn spinner line above the error message.
    fn drop(&mut self) {
        self.stop();
    }
}
