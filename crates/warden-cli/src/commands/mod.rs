pub mod health;
pub mod pipeline;
pub mod serve;
pub mod sync;

use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;
use warden_core::ProgressSink;

pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_FAILURE: u8 = 1;
pub const EXIT_CONFIG_ERROR: u8 = 2;
pub const EXIT_PIPELINE_FAILED: u8 = 3;
pub const EXIT_BUSY: u8 = 4;

pub fn json_pretty(value: &impl serde::Serialize) -> Result<String, String> {
    serde_json::to_string_pretty(value).map_err(|e| format!("JSON serialization failed: {e}"))
}

fn style(template: &str) -> ProgressStyle {
    ProgressStyle::with_template(template).unwrap_or_else(|_| ProgressStyle::default_spinner())
}

pub fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        style("{spinner:.cyan} {msg}")
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
    );
    pb.set_message(msg.to_owned());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

pub fn spin_ok(pb: &ProgressBar, msg: &str) {
    pb.set_style(style("{msg}"));
    pb.finish_with_message(format!("✓ {msg}"));
}

pub fn spin_fail(pb: &ProgressBar, msg: &str) {
    pb.set_style(style("{msg}"));
    pb.finish_with_message(format!("✗ {msg}"));
}

pub fn colorize_state(state: &str) -> String {
    use console::Style;
    match state {
        "done" => Style::new().green().apply_to(state).to_string(),
        "failed" => Style::new().red().bold().apply_to(state).to_string(),
        other => other.to_owned(),
    }
}

/// Pipeline progress shown as the message of a terminal spinner.
pub struct SpinnerSink {
    pb: ProgressBar,
}

impl SpinnerSink {
    pub fn new(msg: &str) -> Self {
        Self { pb: spinner(msg) }
    }

    pub fn bar(&self) -> &ProgressBar {
        &self.pb
    }
}

impl ProgressSink for SpinnerSink {
    fn report(&self, message: &str) {
        tracing::debug!("{message}");
        self.pb.set_message(message.to_owned());
    }
}
