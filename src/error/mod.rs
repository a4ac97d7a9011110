//! Error handling for the network speed tester
//!
//! Probe-level variants (`ProbeTimeout`, `TransportFailure`, `HttpStatus`,
//! `ZeroResult`) never escape a measurement stage: the orchestrator reduces
//! them to sentinel values. Only setup errors reach the binary.

use thiserror::Error;

/// Custom error types for the network speed tester
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Parsing errors (URLs, JSON, etc.)
    #[error("Parsing error: {0}")]
    Parse(String),

    /// I/O errors (file operations, etc.)
    #[error("I/O error: {0}")]
    Io(String),

    /// No network path; fatal to a run
    #[error("Network unreachable: {0}")]
    Unreachable(String),

    /// A single probe attempt exceeded its bound
    #[error("Probe timed out: {0}")]
    ProbeTimeout(String),

    /// DNS, connect, TLS or stream error
    #[error("Transport failure: {0}")]
    TransportFailure(String),

    /// Server answered with a non-2xx status
    #[error("Unexpected HTTP status {0}")]
    HttpStatus(u16),

    /// Transfer completed but measured nothing usable
    #[error("Transfer measured zero throughput: {0}")]
    ZeroResult(String),

    /// Run was superseded or its consumer went away
    #[error("Run cancelled: {0}")]
    Cancelled(String),

    /// Generic internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config(message.into())
    }

    /// Create a new validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation(message.into())
    }

    /// Create a new parsing error
    pub fn parse<S: Into<String>>(message: S) -> Self {
        Self::Parse(message.into())
    }

    /// Create a new I/O error
    pub fn io<S: Into<String>>(message: S) -> Self {
        Self::Io(message.into())
    }

    pub fn unreachable<S: Into<String>>(message: S) -> Self {
        Self::Unreachable(message.into())
    }

    pub fn probe_timeout<S: Into<String>>(message: S) -> Self {
        Self::ProbeTimeout(message.into())
    }

    pub fn transport_failure<S: Into<String>>(message: S) -> Self {
        Self::TransportFailure(message.into())
    }

    pub fn zero_result<S: Into<String>>(message: S) -> Self {
        Self::ZeroResult(message.into())
    }

    pub fn cancelled<S: Into<String>>(message: S) -> Self {
        Self::Cancelled(message.into())
    }

    /// Create a new internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal(message.into())
    }

    /// Get error category for logging and reporting
    pub fn category(&self) -> &'static str {
        match self {
            Self::Config(_) => "CONFIG",
            Self::Validation(_) => "VALIDATION",
            Self::Parse(_) => "PARSE",
            Self::Io(_) => "IO",
            Self::Unreachable(_) => "UNREACHABLE",
            Self::ProbeTimeout(_) => "TIMEOUT",
            Self::TransportFailure(_) => "TRANSPORT",
            Self::HttpStatus(_) => "HTTP",
            Self::ZeroResult(_) => "ZERO",
            Self::Cancelled(_) => "CANCELLED",
            Self::Internal(_) => "INTERNAL",
        }
    }

    /// Whether a stage may try again (next attempt or fallback transport)
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::ProbeTimeout(_) | Self::TransportFailure(_) | Self::HttpStatus(_) | Self::ZeroResult(_) => true,
            Self::Config(_) | Self::Validation(_) | Self::Parse(_) | Self::Io(_) => false,
            Self::Unreachable(_) | Self::Cancelled(_) | Self::Internal(_) => false,
        }
    }

    /// Get exit code for this error type
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) | Self::Validation(_) | Self::Parse(_) => 1,
            Self::Unreachable(_) | Self::TransportFailure(_) | Self::HttpStatus(_) => 2,
            Self::ProbeTimeout(_) => 3,
            Self::Io(_) => 5,
            Self::ZeroResult(_) | Self::Cancelled(_) => 6,
            Self::Internal(_) => 99,
        }
    }

    /// One console line: `[CATEGORY] message`.
    ///
    /// Measurement failures are yellow, setup failures red.
    pub fn format_for_console(&self, use_color: bool) -> String {
        let tag = format!("[{}]", self.category());
        if !use_color {
            return format!("{} {}", tag, self);
        }

        use colored::Colorize;
        let message = self.to_string();
        match self {
            Self::Cancelled(_) => format!("{} {}", tag.dimmed(), message.dimmed()),
            _ if self.is_recoverable() => format!("{} {}", tag.yellow().bold(), message.yellow()),
            Self::Unreachable(_) => format!("{} {}", tag.magenta().bold(), message),
            _ => format!("{} {}", tag.red().bold(), message.red()),
        }
    }
}

// Standard library error conversions
impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        match error.kind() {
            std::io::ErrorKind::TimedOut => Self::probe_timeout(error.to_string()),
            std::io::ErrorKind::ConnectionRefused
            | std::io::ErrorKind::ConnectionReset
            | std::io::ErrorKind::ConnectionAborted
            | std::io::ErrorKind::NotConnected
            | std::io::ErrorKind::AddrNotAvailable
            | std::io::ErrorKind::BrokenPipe
            | std::io::ErrorKind::UnexpectedEof => Self::transport_failure(error.to_string()),
            _ => Self::io(error.to_string()),
        }
    }
}

impl From<url::ParseError> for AppError {
    fn from(error: url::ParseError) -> Self {
        Self::parse(format!("URL parse error: {}", error))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(error: serde_json::Error) -> Self {
        Self::parse(format!("JSON parse error: {}", error))
    }
}

impl From<reqwest::Error> for AppError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::probe_timeout(error.to_string())
        } else if let Some(status) = error.status() {
            Self::HttpStatus(status.as_u16())
        } else {
            Self::transport_failure(error.to_string())
        }
    }
}

impl From<hyper::Error> for AppError {
    fn from(error: hyper::Error) -> Self {
        if error.is_timeout() {
            Self::probe_timeout(error.to_string())
        } else {
            Self::transport_failure(error.to_string())
        }
    }
}

impl From<trust_dns_resolver::error::ResolveError> for AppError {
    fn from(error: trust_dns_resolver::error::ResolveError) -> Self {
        Self::transport_failure(format!("DNS lookup failed: {}", error))
    }
}

impl From<dotenv::Error> for AppError {
    fn from(error: dotenv::Error) -> Self {
        Self::config(format!("Environment file error: {}", error))
    }
}

impl From<std::num::ParseIntError> for AppError {
    fn from(error: std::num::ParseIntError) -> Self {
        Self::parse(format!("Integer parse error: {}", error))
    }
}

impl From<std::str::ParseBoolError> for AppError {
    fn from(error: std::str::ParseBoolError) -> Self {
        Self::parse(format!("Boolean parse error: {}", error))
    }
}

/// Custom Result type for the application
pub type Result<T> = std::result::Result<T, AppError>;
