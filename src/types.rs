//! Type definitions and aliases

use serde::{Deserialize, Serialize};
use std::fmt;

// Re-export commonly used types
pub use crate::error::{AppError, Result};

/// Which kind of test a run performs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TestMode {
    /// Test against a specific service's domain
    Content { service: String, domain: String },
    /// Test against the fixed reference host
    General,
}

impl TestMode {
    /// Content test for an arbitrary domain
    pub fn content<S: Into<String>, D: Into<String>>(service: S, domain: D) -> Self {
        Self::Content { service: service.into(), domain: domain.into() }
    }

    /// Content test for a known service, matched case-insensitively
    pub fn for_service(name: &str, services: &[crate::models::ServiceEntry]) -> Result<Self> {
        services
            .iter()
            .find(|entry| entry.name.eq_ignore_ascii_case(name.trim()))
            .map(|entry| Self::content(entry.name.clone(), entry.domain.clone()))
            .ok_or_else(|| {
                let known: Vec<&str> = services.iter().map(|s| s.name.as_str()).collect();
                AppError::validation(format!("Unknown service '{}' (known: {})", name, known.join(", ")))
            })
    }

    pub fn is_general(&self) -> bool {
        matches!(self, Self::General)
    }

    /// Label shown on the report
    pub fn label(&self) -> String {
        match self {
            Self::Content { service, .. } => service.clone(),
            Self::General => "General Mobile Data".to_string(),
        }
    }
}

impl fmt::Display for TestMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Content { service, domain } => write!(f, "content ({} @ {})", service, domain),
            Self::General => write!(f, "general"),
        }
    }
}

/// A measurement target: bare host for reachability, full URL for transfers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeTarget {
    pub hostname: String,
    pub url: Option<String>,
}

impl ProbeTarget {
    /// Build a target from an endpoint that may carry a scheme, port or path.
    ///
    /// `https://example.com:8443/file?x=1` yields hostname `example.com`.
    pub fn from_endpoint(endpoint: &str) -> Result<Self> {
        let trimmed = endpoint.trim();
        if trimmed.is_empty() {
            return Err(AppError::validation("Endpoint cannot be empty"));
        }

        if trimmed.contains("://") {
            let parsed = url::Url::parse(trimmed)?;
            let host = parsed
                .host_str()
                .ok_or_else(|| AppError::validation(format!("Endpoint has no host: {}", trimmed)))?;
            return Ok(Self {
                hostname: host.trim_matches(|c| c == '[' || c == ']').to_string(),
                url: Some(parsed.to_string()),
            });
        }

        let host = trimmed
            .split(['/', '?', '#'])
            .next()
            .unwrap_or_default();
        let host = strip_port(host);
        if host.is_empty() {
            return Err(AppError::validation(format!("Endpoint has no host: {}", trimmed)));
        }

        Ok(Self { hostname: host.to_string(), url: None })
    }

    /// Attach the transfer URL used by throughput probes
    pub fn with_url<S: Into<String>>(mut self, url: S) -> Self {
        self.url = Some(url.into());
        self
    }
}

fn strip_port(host: &str) -> &str {
    if let Some(rest) = host.strip_prefix('[') {
        // [v6]:port
        return rest.split(']').next().unwrap_or(rest);
    }
    match host.rsplit_once(':') {
        Some((name, port)) if !name.contains(':') && port.chars().all(|c| c.is_ascii_digit()) => name,
        _ => host,
    }
}

/// Overall connection quality, declared worst to best so `Ord` follows rank
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum QualityTier {
    VeryPoor,
    Poor,
    Fair,
    Good,
    Excellent,
}

impl QualityTier {
    pub fn description(&self) -> &'static str {
        match self {
            Self::Excellent => "Excellent",
            Self::Good => "Good",
            Self::Fair => "Fair",
            Self::Poor => "Poor",
            Self::VeryPoor => "Very Poor",
        }
    }

    /// 1 (Very Poor) to 5 (Excellent)
    pub fn stars(&self) -> usize {
        *self as usize + 1
    }
}

impl fmt::Display for QualityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// Measurement stage a progress event belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stage {
    /// Connectivity precondition check
    Preflight,
    Latency,
    Download,
    Upload,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Preflight => "preflight",
            Self::Latency => "ping",
            Self::Download => "download",
            Self::Upload => "upload",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Orchestrator state machine. Every run ends in `Complete`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunState {
    Idle,
    MeasuringLatency,
    MeasuringDownload,
    MeasuringUpload,
    Complete,
}

impl RunState {
    /// Next state; stage failures never change the sequence
    pub fn advance(self) -> Self {
        match self {
            Self::Idle => Self::MeasuringLatency,
            Self::MeasuringLatency => Self::MeasuringDownload,
            Self::MeasuringDownload => Self::MeasuringUpload,
            Self::MeasuringUpload | Self::Complete => Self::Complete,
        }
    }
}

/// How a reachability attempt is performed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProbeMethod {
    /// Resolve the host and open a TCP connection
    TcpConnect,
    /// Issue an HTTP HEAD request
    HttpHead,
}

impl std::str::FromStr for ProbeMethod {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "tcp" | "connect" | "tcp-connect" => Ok(Self::TcpConnect),
            "http" | "head" | "http-head" => Ok(Self::HttpHead),
            other => Err(AppError::parse(format!("Invalid probe method: {}", other))),
        }
    }
}

/// Physical transport reported by the connectivity inspector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransportClass {
    Wifi,
    Cellular,
    Ethernet,
    Unknown,
}

impl TransportClass {
    pub fn description(&self) -> &'static str {
        match self {
            Self::Wifi => "WiFi",
            Self::Cellular => "Mobile Data",
            Self::Ethernet => "Ethernet",
            Self::Unknown => "Unknown Network",
        }
    }
}

/// Connectivity precondition supplied by the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkStatus {
    pub reachable: bool,
    pub transport: TransportClass,
}

impl NetworkStatus {
    pub fn online(transport: TransportClass) -> Self {
        Self { reachable: true, transport }
    }

    pub fn offline() -> Self {
        Self { reachable: false, transport: TransportClass::Unknown }
    }
}
