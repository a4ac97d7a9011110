//! Colored formatter implementation with terminal color support

use crate::{
    error::Result,
    models::{ProgressEvent, ProgressKind, ServiceEntry, TestReport},
    types::QualityTier,
};
use super::formatter::{
    capitalize, fmt_error, measurement_rows, star_rating, test_type_label, FormattingOptions, OutputFormatter,
};
use colored::*;
use std::fmt::Write as _;

/// Color of a quality tier
pub fn tier_color(tier: QualityTier) -> Color {
    match tier {
        QualityTier::Excellent => Color::Green,
        QualityTier::Good => Color::Cyan,
        QualityTier::Fair => Color::Yellow,
        QualityTier::Poor => Color::Magenta,
        QualityTier::VeryPoor => Color::Red,
    }
}

/// Color scheme configuration
#[derive(Debug, Clone)]
pub struct ColorScheme {
    pub header: Color,
    pub success: Color,
    pub error: Color,
    pub info: Color,
    pub highlight: Color,
    pub muted: Color,
}

impl Default for ColorScheme {
    fn default() -> Self {
        Self {
            header: Color::Blue,
            success: Color::Green,
            error: Color::Red,
            info: Color::Cyan,
            highlight: Color::Magenta,
            muted: Color::BrightBlack,
        }
    }
}

/// Colored formatter implementation
pub struct ColoredFormatter {
    options: FormattingOptions,
    color_scheme: ColorScheme,
}

impl ColoredFormatter {
    /// Create a new colored formatter with options
    pub fn new(options: FormattingOptions) -> Self {
        Self {
            options,
            color_scheme: ColorScheme::default(),
        }
    }

    fn colorize(&self, text: &str, color: Color) -> String {
        if self.options.enable_color {
            text.color(color).to_string()
        } else {
            text.to_string()
        }
    }

    fn bold(&self, text: &str) -> String {
        if self.options.enable_color {
            text.bold().to_string()
        } else {
            text.to_string()
        }
    }

    fn separator(&self) -> String {
        self.colorize(&"─".repeat(self.options.max_width), self.color_scheme.muted)
    }

    fn quality_line(&self, tier: QualityTier) -> String {
        format!(
            "{} {}",
            star_rating(tier),
            self.bold(&self.colorize(tier.description(), tier_color(tier)))
        )
    }
}

impl OutputFormatter for ColoredFormatter {
    fn format_header(&self, title: &str) -> Result<String> {
        Ok(self.bold(&self.colorize(title, self.color_scheme.header)))
    }

    fn format_progress(&self, event: &ProgressEvent) -> Result<String> {
        Ok(match event.kind {
            ProgressKind::Started => self.colorize(&event.message, self.color_scheme.info),
            ProgressKind::Result => format!(
                "  {} {}",
                self.colorize(&format!("{}:", capitalize(event.stage.as_str())), self.color_scheme.muted),
                self.bold(&event.message)
            ),
            ProgressKind::Failure => format!("❌ {}", self.colorize(&event.message, self.color_scheme.error)),
        })
    }

    fn format_report(&self, report: &TestReport) -> Result<String> {
        let mut output = String::new();

        if !report.network_available {
            writeln!(
                output,
                "❌ {}",
                self.bold(&self.colorize("No network connection available!", self.color_scheme.error))
            )
            .map_err(fmt_error)?;
            writeln!(output, "Test Type: {}", test_type_label(&report.mode)).map_err(fmt_error)?;
            write!(output, "Quality: {}", self.quality_line(report.quality)).map_err(fmt_error)?;
            return Ok(output);
        }

        writeln!(
            output,
            "✅ {}",
            self.bold(&self.colorize("Test Complete!", self.color_scheme.success))
        )
        .map_err(fmt_error)?;
        writeln!(output).map_err(fmt_error)?;
        writeln!(
            output,
            "Test Type: {}",
            self.colorize(&test_type_label(&report.mode), self.color_scheme.highlight)
        )
        .map_err(fmt_error)?;
        writeln!(
            output,
            "Network: Testing on {}",
            self.colorize(report.network.description(), self.color_scheme.info)
        )
        .map_err(fmt_error)?;
        writeln!(output, "{}", self.separator()).map_err(fmt_error)?;

        let tier = tier_color(report.quality);
        for (label, value) in measurement_rows(report) {
            let value = if value == "Failed" {
                self.colorize(&value, self.color_scheme.error)
            } else {
                self.colorize(&value, tier)
            };
            writeln!(output, "{:<10}{}", format!("{}:", label), value).map_err(fmt_error)?;
        }
        write!(output, "{:<10}{}", "Quality:", self.quality_line(report.quality)).map_err(fmt_error)?;

        if self.options.verbose_mode {
            writeln!(output).map_err(fmt_error)?;
            writeln!(output, "{}", self.separator()).map_err(fmt_error)?;
            if report.latency.is_available() {
                writeln!(
                    output,
                    "{}",
                    self.colorize(
                        &format!("Latency: min {} ms, max {} ms", report.latency.min, report.latency.max),
                        self.color_scheme.muted
                    )
                )
                .map_err(fmt_error)?;
            }
            write!(
                output,
                "{}",
                self.colorize(
                    &format!(
                        "Run {} took {:.1}s",
                        report.run_id,
                        report.total_duration().num_milliseconds() as f64 / 1000.0
                    ),
                    self.color_scheme.muted
                )
            )
            .map_err(fmt_error)?;
        }

        Ok(output)
    }

    fn format_service_list(&self, services: &[ServiceEntry]) -> Result<String> {
        let width = services.iter().map(|s| s.name.len()).max().unwrap_or(0);
        let mut output = self.format_header("Available services:")?;
        for service in services {
            let name = format!("{:<width$}", service.name, width = width);
            write!(
                output,
                "\n  {}  {}",
                self.bold(&name),
                self.colorize(&service.domain, self.color_scheme.muted)
            )
            .map_err(fmt_error)?;
        }
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Stage, TestMode, TransportClass};
    use chrono::Utc;

    fn formatter() -> ColoredFormatter {
        ColoredFormatter::new(FormattingOptions { enable_color: false, ..FormattingOptions::default() })
    }

    fn report() -> TestReport {
        let mut report =
            TestReport::unreachable("run-7".to_string(), TestMode::General, TransportClass::Cellular, Utc::now());
        report.network_available = true;
        report.ping_ms = 80;
        report.jitter_ms = 25;
        report.download_mbps = 8.0;
        report.upload_mbps = 2.5;
        report.quality = QualityTier::Fair;
        report
    }

    #[test]
    fn test_tier_colors() {
        assert_eq!(tier_color(QualityTier::Excellent), Color::Green);
        assert_eq!(tier_color(QualityTier::Good), Color::Cyan);
        assert_eq!(tier_color(QualityTier::Fair), Color::Yellow);
        assert_eq!(tier_color(QualityTier::Poor), Color::Magenta);
        assert_eq!(tier_color(QualityTier::VeryPoor), Color::Red);
    }

    #[test]
    fn test_colored_report_content() {
        let output = formatter().format_report(&report()).unwrap();

        assert!(output.starts_with("✅ Test Complete!"));
        assert!(output.contains("Test Type: General Mobile Data"));
        assert!(output.contains("Network: Testing on Mobile Data"));
        assert!(output.contains("Ping:     80 ms"));
        assert!(output.contains("Jitter:   25 ms"));
        assert!(output.contains("Download: 8.00 Mbps"));
        assert!(output.contains("Upload:   2.50 Mbps"));
        assert!(output.contains("⭐⭐⭐ Fair"));
    }

    #[test]
    fn test_colored_unreachable_report() {
        let offline = TestReport::unreachable(
            "x".to_string(),
            TestMode::content("X", "x.com"),
            TransportClass::Unknown,
            Utc::now(),
        );
        let output = formatter().format_report(&offline).unwrap();
        assert!(output.contains("No network connection available!"));
        assert!(output.contains("Test Type: X"));
        assert!(!output.contains("Download"));
    }

    #[test]
    fn test_colored_progress_and_catalog() {
        let f = formatter();
        let failure = ProgressEvent::failure("No network connection available!");
        assert_eq!(f.format_progress(&failure).unwrap(), "❌ No network connection available!");

        let event = ProgressEvent::result(Stage::Upload, "2.50 Mbps", Some(2.5));
        assert_eq!(f.format_progress(&event).unwrap(), "  Upload: 2.50 Mbps");

        let list = f.format_service_list(&[ServiceEntry::new("Netflix", "nflxvideo.net")]).unwrap();
        assert!(list.contains("Netflix  nflxvideo.net"));
    }
}
