//! Structured logging system for the network speed tester
//!
//! This module provides:
//! - Leveled, structured log entries built with a fluent builder
//! - Console, JSON and compact output formats
//! - Per-run correlation through a session ID
//!
//! All output goes to stderr so that reports written to stdout stay parseable.

use crate::error::{AppError, Result};
use crate::models::{Config, LatencySample, ThroughputResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::{self, Write};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Log level enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LogLevel {
    Trace = 0,
    Debug = 1,
    Info = 2,
    Warn = 3,
    Error = 4,
    Fatal = 5,
}

impl LogLevel {
    /// Get log level name as string
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "TRACE",
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
            LogLevel::Fatal => "FATAL",
        }
    }

    /// Get ANSI color code for console output
    pub fn color_code(&self) -> &'static str {
        match self {
            LogLevel::Trace => "\x1b[37m",
            LogLevel::Debug => "\x1b[36m",
            LogLevel::Info => "\x1b[32m",
            LogLevel::Warn => "\x1b[33m",
            LogLevel::Error => "\x1b[31m",
            LogLevel::Fatal => "\x1b[35m",
        }
    }

    pub fn reset_code() -> &'static str {
        "\x1b[0m"
    }
}

impl std::str::FromStr for LogLevel {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_uppercase().as_str() {
            "TRACE" => Ok(LogLevel::Trace),
            "DEBUG" => Ok(LogLevel::Debug),
            "INFO" => Ok(LogLevel::Info),
            "WARN" | "WARNING" => Ok(LogLevel::Warn),
            "ERROR" => Ok(LogLevel::Error),
            "FATAL" => Ok(LogLevel::Fatal),
            _ => Err(AppError::parse(format!("Invalid log level: {}", s))),
        }
    }
}

/// Log entry structure for structured logging
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
    /// Logger name/component
    pub logger: String,
    /// Run correlation ID
    pub correlation_id: Option<String>,
    pub fields: HashMap<String, serde_json::Value>,
}

/// Log output format options
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LogFormat {
    /// Human-readable console format
    Console,
    /// JSON format for structured logging
    Json,
    /// Compact single-line format
    Compact,
}

#[derive(Debug, Default)]
struct LogContext {
    session_id: Option<String>,
    context_fields: HashMap<String, serde_json::Value>,
}

/// Logger implementation with multiple output formats
#[derive(Clone)]
pub struct Logger {
    min_level: LogLevel,
    use_color: bool,
    format: LogFormat,
    name: String,
    context: Arc<RwLock<LogContext>>,
}

impl Logger {
    /// Create a new logger
    pub fn new(name: &str) -> Self {
        Self {
            min_level: LogLevel::Info,
            use_color: true,
            format: LogFormat::Console,
            name: name.to_string(),
            context: Arc::new(RwLock::new(LogContext::default())),
        }
    }

    /// Create a logger with specific configuration
    pub fn with_config(name: &str, config: &Config) -> Self {
        let min_level = if config.debug {
            LogLevel::Debug
        } else if config.verbose {
            LogLevel::Info
        } else {
            LogLevel::Warn
        };

        Self {
            min_level,
            use_color: config.enable_color,
            format: if config.debug { LogFormat::Json } else { LogFormat::Console },
            name: name.to_string(),
            context: Arc::new(RwLock::new(LogContext::default())),
        }
    }

    /// A logger for a sub-component sharing this logger's context
    pub fn child(&self, name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..self.clone()
        }
    }

    /// A logger with a fresh context tagged with `run_id`.
    ///
    /// Children of the returned logger share the run context; this logger and
    /// any other run keep their own.
    pub fn for_run(&self, run_id: &str) -> Self {
        let context = LogContext {
            session_id: Some(run_id.to_string()),
            context_fields: HashMap::new(),
        };
        Self {
            context: Arc::new(RwLock::new(context)),
            ..self.clone()
        }
    }

    pub fn set_level(&mut self, level: LogLevel) {
        self.min_level = level;
    }

    pub fn set_format(&mut self, format: LogFormat) {
        self.format = format;
    }

    pub fn set_color(&mut self, use_color: bool) {
        self.use_color = use_color;
    }

    pub fn level(&self) -> LogLevel {
        self.min_level
    }

    /// Add context field for all subsequent log entries
    pub async fn add_context_field<T: Serialize>(&self, key: &str, value: T) {
        if let Ok(json_value) = serde_json::to_value(value) {
            let mut context = self.context.write().await;
            context.context_fields.insert(key.to_string(), json_value);
        }
    }

    /// Create a log entry builder
    pub fn log(&self, level: LogLevel, message: &str) -> LogEntryBuilder<'_> {
        LogEntryBuilder::new(self, level, message.to_string())
    }

    pub fn trace(&self, message: &str) -> LogEntryBuilder<'_> {
        self.log(LogLevel::Trace, message)
    }

    pub fn debug(&self, message: &str) -> LogEntryBuilder<'_> {
        self.log(LogLevel::Debug, message)
    }

    pub fn info(&self, message: &str) -> LogEntryBuilder<'_> {
        self.log(LogLevel::Info, message)
    }

    pub fn warn(&self, message: &str) -> LogEntryBuilder<'_> {
        self.log(LogLevel::Warn, message)
    }

    pub fn error(&self, message: &str) -> LogEntryBuilder<'_> {
        self.log(LogLevel::Error, message)
    }

    /// Check if a log level would be output
    pub fn would_log(&self, level: LogLevel) -> bool {
        level >= self.min_level
    }

    async fn write_entry(&self, mut entry: LogEntry) {
        if !self.would_log(entry.level) {
            return;
        }

        let context = self.context.read().await;
        if entry.correlation_id.is_none() {
            entry.correlation_id = context.session_id.clone();
        }
        for (key, value) in &context.context_fields {
            entry.fields.entry(key.clone()).or_insert_with(|| value.clone());
        }
        drop(context);

        let output = self.render(&entry);
        let _ = writeln!(io::stderr(), "{}", output);
    }

    /// Render an entry in the configured format
    pub fn render(&self, entry: &LogEntry) -> String {
        match self.format {
            LogFormat::Console => self.format_console(entry),
            LogFormat::Json => self.format_json(entry),
            LogFormat::Compact => self.format_compact(entry),
        }
    }

    fn format_console(&self, entry: &LogEntry) -> String {
        let timestamp = entry.timestamp.format("%Y-%m-%d %H:%M:%S%.3f");
        let level_str = entry.level.as_str();

        let formatted_level = if self.use_color {
            format!("{}{:>5}{}", entry.level.color_code(), level_str, LogLevel::reset_code())
        } else {
            format!("{:>5}", level_str)
        };

        let mut output = format!("{} {} [{}] {}", timestamp, formatted_level, entry.logger, entry.message);

        if let Some(correlation_id) = &entry.correlation_id {
            let short: String = correlation_id.chars().take(8).collect();
            output.push_str(&format!(" [{}]", short));
        }

        if !entry.fields.is_empty() {
            let mut fields: Vec<String> = entry.fields.iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect();
            fields.sort();
            output.push_str(&format!(" {{{}}}", fields.join(", ")));
        }

        output
    }

    fn format_json(&self, entry: &LogEntry) -> String {
        match serde_json::to_string(entry) {
            Ok(json) => json,
            Err(_) => format!("{{\"error\": \"Failed to serialize log entry\", \"message\": \"{}\"}}", entry.message),
        }
    }

    fn format_compact(&self, entry: &LogEntry) -> String {
        let timestamp = entry.timestamp.format("%H:%M:%S");
        format!("{} {} {}: {}",
            timestamp,
            entry.level.as_str().chars().next().unwrap_or('?'),
            entry.logger,
            entry.message
        )
    }
}

/// Builder pattern for creating log entries
pub struct LogEntryBuilder<'a> {
    logger: &'a Logger,
    entry: LogEntry,
}

impl<'a> LogEntryBuilder<'a> {
    fn new(logger: &'a Logger, level: LogLevel, message: String) -> Self {
        Self {
            logger,
            entry: LogEntry {
                timestamp: Utc::now(),
                level,
                message,
                logger: logger.name.clone(),
                correlation_id: None,
                fields: HashMap::new(),
            },
        }
    }

    pub fn correlation_id(mut self, id: &str) -> Self {
        self.entry.correlation_id = Some(id.to_string());
        self
    }

    /// Add a structured field
    pub fn field<T: Serialize>(mut self, key: &str, value: T) -> Self {
        if let Ok(json_value) = serde_json::to_value(value) {
            self.entry.fields.insert(key.to_string(), json_value);
        }
        self
    }

    /// Add the outcome of a reachability attempt
    pub fn sample(self, sample: &LatencySample) -> Self {
        let builder = self.field("attempt", sample.attempt).field("success", sample.success);
        if sample.success {
            builder.field("rtt_ms", sample.duration_ms)
        } else {
            builder.field("error", sample.error_message.as_deref().unwrap_or("unknown"))
        }
    }

    /// Add transfer figures
    pub fn throughput(self, result: &ThroughputResult) -> Self {
        self.field("bytes", result.bytes_transferred)
            .field("seconds", result.duration_seconds)
            .field("mbps", result.megabits_per_second)
    }

    /// Add error information
    pub fn error_info(self, error: &AppError) -> Self {
        self.field("error", error.to_string())
            .field("error_category", error.category())
            .field("error_recoverable", error.is_recoverable())
    }

    /// Finalize and write the log entry
    pub async fn log(self) {
        self.logger.write_entry(self.entry).await;
    }

    #[cfg(test)]
    fn into_entry(self) -> LogEntry {
        self.entry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_log_level_parsing_and_order() {
        assert_eq!("warning".parse::<LogLevel>().unwrap(), LogLevel::Warn);
        assert_eq!("DEBUG".parse::<LogLevel>().unwrap(), LogLevel::Debug);
        assert!("loud".parse::<LogLevel>().is_err());
        assert!(LogLevel::Error > LogLevel::Info);
    }

    #[test]
    fn test_level_from_config() {
        let mut config = Config::default();
        assert_eq!(Logger::with_config("t", &config).level(), LogLevel::Warn);

        config.verbose = true;
        assert_eq!(Logger::with_config("t", &config).level(), LogLevel::Info);

        config.debug = true;
        let logger = Logger::with_config("t", &config);
        assert_eq!(logger.level(), LogLevel::Debug);
        assert!(logger.would_log(LogLevel::Debug));
        assert!(!logger.would_log(LogLevel::Trace));
    }

    #[test]
    fn test_builder_fields() {
        let logger = Logger::new("sampler");
        let sample = LatencySample::success(2, Duration::from_millis(31));
        let entry = logger.debug("attempt finished").sample(&sample).into_entry();

        assert_eq!(entry.logger, "sampler");
        assert_eq!(entry.fields["attempt"], serde_json::json!(2));
        assert_eq!(entry.fields["rtt_ms"], serde_json::json!(31));
        assert_eq!(entry.fields["success"], serde_json::json!(true));
    }

    #[test]
    fn test_json_and_console_rendering() {
        let mut logger = Logger::new("probe");
        logger.set_color(false);
        let entry = logger.info("done")
            .throughput(&ThroughputResult::from_transfer(1_000_000, Duration::from_secs(1)))
            .correlation_id("0123456789abcdef")
            .into_entry();

        let console = logger.render(&entry);
        assert!(console.contains("INFO [probe] done [01234567]"));
        assert!(console.contains("mbps=8.0"));

        logger.set_format(LogFormat::Json);
        let json: serde_json::Value = serde_json::from_str(&logger.render(&entry)).unwrap();
        assert_eq!(json["message"], "done");
        assert_eq!(json["fields"]["bytes"], 1_000_000);

        logger.set_format(LogFormat::Compact);
        assert!(logger.render(&entry).ends_with("I probe: done"));
    }

    #[tokio::test]
    async fn test_child_shares_session() {
        let run = Logger::new("root").for_run("run-1");
        let child = run.child("child");
        child.add_context_field("mode", "General").await;

        let context = run.context.read().await;
        assert_eq!(context.session_id.as_deref(), Some("run-1"));
        assert!(context.context_fields.contains_key("mode"));
    }

    #[tokio::test]
    async fn test_runs_get_separate_contexts() {
        let root = Logger::new("root");
        let first = root.for_run("run-1");
        let second = root.for_run("run-2");
        first.add_context_field("mode", "General").await;

        assert_eq!(first.context.read().await.session_id.as_deref(), Some("run-1"));
        assert_eq!(second.context.read().await.session_id.as_deref(), Some("run-2"));
        assert!(second.context.read().await.context_fields.is_empty());

        let parent = root.context.read().await;
        assert!(parent.session_id.is_none());
        assert!(parent.context_fields.is_empty());
    }
}
