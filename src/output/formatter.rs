//! Core formatting traits and the plain text implementation

use crate::{
    error::{AppError, Result},
    models::{format_mbps, ProgressEvent, ProgressKind, ServiceEntry, TestReport},
    types::{QualityTier, TestMode},
};
use std::fmt::Write as _;

/// Main trait for output formatting
pub trait OutputFormatter {
    /// Format a header section
    fn format_header(&self, title: &str) -> Result<String>;

    /// Format one progress notification
    fn format_progress(&self, event: &ProgressEvent) -> Result<String>;

    /// Format the final report
    fn format_report(&self, report: &TestReport) -> Result<String>;

    /// Format the content test service catalog
    fn format_service_list(&self, services: &[ServiceEntry]) -> Result<String>;
}

/// Configuration options for formatting
#[derive(Debug, Clone)]
pub struct FormattingOptions {
    /// Enable colored output
    pub enable_color: bool,
    /// Add run metadata and latency detail to reports
    pub verbose_mode: bool,
    /// Width of separator lines
    pub max_width: usize,
}

impl Default for FormattingOptions {
    fn default() -> Self {
        Self {
            enable_color: true,
            verbose_mode: false,
            max_width: 40,
        }
    }
}

/// Star rating for a tier, one to five
pub fn star_rating(tier: QualityTier) -> String {
    "⭐".repeat(tier.stars())
}

/// "General Mobile Data" or the service name
pub fn test_type_label(mode: &TestMode) -> String {
    mode.label()
}

/// Rows shown in the measurements block, `(label, value)`
pub(crate) fn measurement_rows(report: &TestReport) -> Vec<(&'static str, String)> {
    let mut rows = vec![("Ping", report.format_ping())];
    if report.mode.is_general() && report.jitter_available() {
        rows.push(("Jitter", report.format_jitter()));
    }
    rows.push(("Download", format_mbps(report.download_mbps)));
    rows.push(("Upload", format_mbps(report.upload_mbps)));
    rows
}

/// Plain text formatter implementation
pub struct PlainFormatter {
    options: FormattingOptions,
}

impl PlainFormatter {
    /// Create a new plain formatter with options
    pub fn new(options: FormattingOptions) -> Self {
        Self { options }
    }

    fn separator(&self) -> String {
        "-".repeat(self.options.max_width)
    }
}

impl OutputFormatter for PlainFormatter {
    fn format_header(&self, title: &str) -> Result<String> {
        Ok(format!("{}\n{}", title, "=".repeat(title.chars().count())))
    }

    fn format_progress(&self, event: &ProgressEvent) -> Result<String> {
        Ok(match event.kind {
            ProgressKind::Started => event.message.clone(),
            ProgressKind::Result => format!("  {}: {}", capitalize(event.stage.as_str()), event.message),
            ProgressKind::Failure => format!("ERROR: {}", event.message),
        })
    }

    fn format_report(&self, report: &TestReport) -> Result<String> {
        let mut output = String::new();

        if !report.network_available {
            writeln!(output, "No network connection available!").map_err(fmt_error)?;
            writeln!(output, "Test Type: {}", test_type_label(&report.mode)).map_err(fmt_error)?;
            write!(output, "Quality: {} {}", star_rating(report.quality), report.quality).map_err(fmt_error)?;
            return Ok(output);
        }

        writeln!(output, "Test Complete!").map_err(fmt_error)?;
        writeln!(output).map_err(fmt_error)?;
        writeln!(output, "Test Type: {}", test_type_label(&report.mode)).map_err(fmt_error)?;
        writeln!(output, "Network: Testing on {}", report.network.description()).map_err(fmt_error)?;
        writeln!(output, "{}", self.separator()).map_err(fmt_error)?;

        for (label, value) in measurement_rows(report) {
            writeln!(output, "{:<10}{}", format!("{}:", label), value).map_err(fmt_error)?;
        }
        write!(output, "{:<10}{} {}", "Quality:", star_rating(report.quality), report.quality).map_err(fmt_error)?;

        if self.options.verbose_mode {
            writeln!(output).map_err(fmt_error)?;
            writeln!(output, "{}", self.separator()).map_err(fmt_error)?;
            if report.latency.is_available() {
                writeln!(
                    output,
                    "Latency: min {} ms, max {} ms",
                    report.latency.min, report.latency.max
                )
                .map_err(fmt_error)?;
            }
            writeln!(
                output,
                "Downloaded {} bytes in {:.2}s, uploaded {} bytes in {:.2}s",
                report.download.bytes_transferred,
                report.download.duration_seconds,
                report.upload.bytes_transferred,
                report.upload.duration_seconds,
            )
            .map_err(fmt_error)?;
            write!(
                output,
                "Run {} took {:.1}s",
                report.run_id,
                report.total_duration().num_milliseconds() as f64 / 1000.0
            )
            .map_err(fmt_error)?;
        }

        Ok(output)
    }

    fn format_service_list(&self, services: &[ServiceEntry]) -> Result<String> {
        let width = services.iter().map(|s| s.name.len()).max().unwrap_or(0);
        let lines: Vec<String> = services
            .iter()
            .map(|s| format!("  {:<width$}  {}", s.name, s.domain, width = width))
            .collect();
        Ok(format!("Available services:\n{}", lines.join("\n")))
    }
}

pub(crate) fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

pub(crate) fn fmt_error(e: std::fmt::Error) -> AppError {
    AppError::internal(format!("Formatting error: {}", e))
}
