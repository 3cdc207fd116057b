//! Progress display for long-running backend commands.
//!
//! The percentage is synthetic: backends don't report progress when their
//! output is discarded, so the bar climbs toward [`ESTIMATE_CEILING`] over
//! [`ESTIMATE_WINDOW`] and only reaches 100 once the command has finished.

use std::time::Duration;

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

/// Highest percentage shown while the command is still running.
pub const ESTIMATE_CEILING: u64 = 95;
/// Time after which the estimate stops climbing.
pub const ESTIMATE_WINDOW: Duration = Duration::from_secs(10);
/// Redraw cadence of the foreground loop.
pub const REDRAW_INTERVAL: Duration = Duration::from_millis(50);

/// Estimated completion for a command that has been running for `elapsed`.
pub fn estimate_percent(elapsed: Duration) -> u64 {
    let elapsed_ms = elapsed.as_millis() as u64;
    let window_ms = ESTIMATE_WINDOW.as_millis() as u64;
    ESTIMATE_CEILING.min(elapsed_ms.saturating_mul(ESTIMATE_CEILING) / window_ms)
}

pub struct ProgressDisplay {
    bar: ProgressBar,
}

impl ProgressDisplay {
    pub fn new(label: &str) -> Self {
        let bar = ProgressBar::with_draw_target(Some(100), ProgressDrawTarget::stderr_with_hz(20));
        bar.set_style(running_style());
        bar.set_prefix(label.to_string());
        Self { bar }
    }

    pub fn draw(&self, percent: u64) {
        self.bar.set_position(percent.min(100));
    }

    pub fn finish_success(self) {
        self.bar.set_position(100);
        self.bar.finish();
    }

    pub fn finish_failed(self) {
        self.bar.set_style(failed_style());
        self.bar.set_position(100);
        self.bar.finish();
    }
}

fn running_style() -> ProgressStyle {
    ProgressStyle::with_template("{prefix:.cyan} [{wide_bar:.green/red}] {pos:>3}%")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=>-")
}

fn failed_style() -> ProgressStyle {
    ProgressStyle::with_template("{prefix:.cyan} [{wide_bar:.red/red}] FAILED")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("==-")
}
