//! Output formatting and display system
//!
//! Renders progress events and final reports as plain or colored text.
//! JSON output bypasses the formatters and serializes the report directly.

mod colored;
mod formatter;

pub use colored::{tier_color, ColorScheme, ColoredFormatter};
pub use formatter::{star_rating, FormattingOptions, OutputFormatter, PlainFormatter};

use crate::{
    error::{AppError, Result},
    models::{RunEvent, TestReport},
};

/// Output formatting factory for creating appropriate formatters
pub struct OutputFormatterFactory;

impl OutputFormatterFactory {
    /// Create a formatter based on color support and preferences
    pub fn create_formatter(enable_color: bool, verbose: bool) -> Box<dyn OutputFormatter> {
        let options = FormattingOptions {
            enable_color,
            verbose_mode: verbose,
            ..FormattingOptions::default()
        };

        if enable_color {
            Box::new(ColoredFormatter::new(options))
        } else {
            Box::new(PlainFormatter::new(options))
        }
    }
}

/// Turns run events into the lines printed on stdout
pub struct OutputCoordinator {
    formatter: Box<dyn OutputFormatter>,
    json: bool,
}

impl OutputCoordinator {
    pub fn new(formatter: Box<dyn OutputFormatter>, json: bool) -> Self {
        Self { formatter, json }
    }

    /// Text for one event, `None` when nothing should be printed.
    ///
    /// In JSON mode progress is suppressed and the report is the only output.
    pub fn render_event(&self, event: &RunEvent) -> Result<Option<String>> {
        match event {
            RunEvent::Progress(_) if self.json => Ok(None),
            RunEvent::Progress(progress) => self.formatter.format_progress(progress).map(Some),
            RunEvent::Report(report) => self.render_report(report).map(Some),
        }
    }

    pub fn render_report(&self, report: &TestReport) -> Result<String> {
        if self.json {
            serde_json::to_string_pretty(report)
                .map_err(|e| AppError::internal(format!("Failed to serialize report: {}", e)))
        } else {
            self.formatter.format_report(report)
        }
    }
}
