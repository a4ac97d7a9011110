//! Configuration data model and validation

use crate::defaults;
use crate::types::{AppError, ProbeMethod, ProbeTarget, Result, TestMode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A service selectable for content tests
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceEntry {
    pub name: String,
    pub domain: String,
}

impl ServiceEntry {
    pub fn new<N: Into<String>, D: Into<String>>(name: N, domain: D) -> Self {
        Self { name: name.into(), domain: domain.into() }
    }
}

/// Main application configuration.
///
/// Every endpoint, duration and payload size the measurement engine uses
/// lives here so the engine can be pointed at mock servers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Host probed for latency in general tests
    #[serde(default = "default_reference_host")]
    pub reference_host: String,

    #[serde(default = "default_content_download_url")]
    pub content_download_url: String,

    #[serde(default = "default_general_download_url")]
    pub general_download_url: String,

    #[serde(default = "default_upload_url")]
    pub upload_url: String,

    /// Download from `https://<service domain>/` instead of the shared reference file
    #[serde(default)]
    pub content_download_from_service: bool,

    #[serde(default = "default_content_download_cap_ms")]
    pub content_download_cap_ms: u64,

    #[serde(default = "default_general_download_cap_ms")]
    pub general_download_cap_ms: u64,

    #[serde(default = "default_content_upload_bytes")]
    pub content_upload_bytes: usize,

    #[serde(default = "default_general_upload_bytes")]
    pub general_upload_bytes: usize,

    #[serde(default = "default_content_connect_timeout_ms")]
    pub content_connect_timeout_ms: u64,

    #[serde(default = "default_content_read_timeout_ms")]
    pub content_read_timeout_ms: u64,

    #[serde(default = "default_general_connect_timeout_ms")]
    pub general_connect_timeout_ms: u64,

    #[serde(default = "default_general_read_timeout_ms")]
    pub general_read_timeout_ms: u64,

    /// Bound of a single reachability attempt
    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,

    /// Port used by the TCP reachability probe
    #[serde(default = "default_probe_port")]
    pub probe_port: u16,

    #[serde(default = "default_probe_method")]
    pub probe_method: ProbeMethod,

    /// Pause after each "starting stage" notification
    #[serde(default = "default_stage_pause_ms")]
    pub stage_pause_ms: u64,

    #[serde(default = "default_services")]
    pub services: Vec<ServiceEntry>,

    /// Enable colored terminal output
    #[serde(default = "default_enable_color")]
    pub enable_color: bool,

    /// Print the report as JSON
    #[serde(default)]
    pub json_output: bool,

    /// Enable verbose output
    #[serde(default)]
    pub verbose: bool,

    /// Enable debug output
    #[serde(default)]
    pub debug: bool,
}

/// Reachability sampling parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplerProfile {
    pub attempts: u32,
    pub spacing: Duration,
    pub attempt_timeout: Duration,
}

impl SamplerProfile {
    /// 3 attempts, 200 ms apart; content tests
    pub fn quick(attempt_timeout: Duration) -> Self {
        Self {
            attempts: defaults::QUICK_ATTEMPTS,
            spacing: defaults::QUICK_SPACING,
            attempt_timeout,
        }
    }

    /// 10 attempts, 100 ms apart; general tests (jitter)
    pub fn thorough(attempt_timeout: Duration) -> Self {
        Self {
            attempts: defaults::THOROUGH_ATTEMPTS,
            spacing: defaults::THOROUGH_SPACING,
            attempt_timeout,
        }
    }
}

/// Throughput parameters for one mode
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferProfile {
    pub download_url: String,
    pub download_cap: Duration,
    pub upload_url: String,
    pub upload_bytes: usize,
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            reference_host: default_reference_host(),
            content_download_url: default_content_download_url(),
            general_download_url: default_general_download_url(),
            upload_url: default_upload_url(),
            content_download_from_service: false,
            content_download_cap_ms: default_content_download_cap_ms(),
            general_download_cap_ms: default_general_download_cap_ms(),
            content_upload_bytes: default_content_upload_bytes(),
            general_upload_bytes: default_general_upload_bytes(),
            content_connect_timeout_ms: default_content_connect_timeout_ms(),
            content_read_timeout_ms: default_content_read_timeout_ms(),
            general_connect_timeout_ms: default_general_connect_timeout_ms(),
            general_read_timeout_ms: default_general_read_timeout_ms(),
            probe_timeout_ms: default_probe_timeout_ms(),
            probe_port: default_probe_port(),
            probe_method: default_probe_method(),
            stage_pause_ms: default_stage_pause_ms(),
            services: default_services(),
            enable_color: default_enable_color(),
            json_output: false,
            verbose: false,
            debug: false,
        }
    }
}

impl Config {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    pub fn stage_pause(&self) -> Duration {
        Duration::from_millis(self.stage_pause_ms)
    }

    /// Quick sampling for content tests, thorough sampling for general tests
    pub fn sampler_profile(&self, mode: &TestMode) -> SamplerProfile {
        match mode {
            TestMode::General => SamplerProfile::thorough(self.probe_timeout()),
            TestMode::Content { .. } => SamplerProfile::quick(self.probe_timeout()),
        }
    }

    /// Host probed by the latency stage
    pub fn latency_target(&self, mode: &TestMode) -> Result<ProbeTarget> {
        match mode {
            TestMode::General => ProbeTarget::from_endpoint(&self.reference_host),
            TestMode::Content { domain, .. } => ProbeTarget::from_endpoint(domain),
        }
    }

    /// Download/upload parameters for a mode
    pub fn transfer_profile(&self, mode: &TestMode) -> TransferProfile {
        match mode {
            TestMode::General => TransferProfile {
                download_url: self.general_download_url.clone(),
                download_cap: Duration::from_millis(self.general_download_cap_ms),
                upload_url: self.upload_url.clone(),
                upload_bytes: self.general_upload_bytes,
                connect_timeout: Duration::from_millis(self.general_connect_timeout_ms),
                read_timeout: Duration::from_millis(self.general_read_timeout_ms),
            },
            TestMode::Content { domain, .. } => TransferProfile {
                download_url: if self.content_download_from_service {
                    format!("https://{}/", domain)
                } else {
                    self.content_download_url.clone()
                },
                download_cap: Duration::from_millis(self.content_download_cap_ms),
                upload_url: self.upload_url.clone(),
                upload_bytes: self.content_upload_bytes,
                connect_timeout: Duration::from_millis(self.content_connect_timeout_ms),
                read_timeout: Duration::from_millis(self.content_read_timeout_ms),
            },
        }
    }

    /// Validate the configuration and return any errors
    pub fn validate(&self) -> Result<()> {
        if self.reference_host.trim().is_empty() {
            return Err(AppError::config("Reference host cannot be empty"));
        }

        for (name, url) in [
            ("content download URL", &self.content_download_url),
            ("general download URL", &self.general_download_url),
            ("upload URL", &self.upload_url),
        ] {
            validate_http_url(name, url)?;
        }

        for (name, value) in [
            ("Content download cap", self.content_download_cap_ms),
            ("General download cap", self.general_download_cap_ms),
        ] {
            if value == 0 {
                return Err(AppError::config(format!("{} must be greater than 0", name)));
            }
            if value > 120_000 {
                return Err(AppError::config(format!("{} cannot exceed 120000 ms", name)));
            }
        }

        if self.content_upload_bytes == 0 || self.general_upload_bytes == 0 {
            return Err(AppError::config("Upload payload size must be greater than 0"));
        }

        for (name, value) in [
            ("Content connect timeout", self.content_connect_timeout_ms),
            ("Content read timeout", self.content_read_timeout_ms),
            ("General connect timeout", self.general_connect_timeout_ms),
            ("General read timeout", self.general_read_timeout_ms),
        ] {
            if value == 0 {
                return Err(AppError::config(format!("{} must be greater than 0", name)));
            }
        }

        if self.probe_timeout_ms == 0 {
            return Err(AppError::config("Probe timeout must be greater than 0"));
        }

        if self.probe_timeout_ms > 60_000 {
            return Err(AppError::config("Probe timeout cannot exceed 60000 ms"));
        }

        if self.probe_port == 0 {
            return Err(AppError::config("Probe port must be greater than 0"));
        }

        for service in &self.services {
            if service.name.trim().is_empty() || service.domain.trim().is_empty() {
                return Err(AppError::config("Service entries need both a name and a domain"));
            }
        }

        Ok(())
    }

    /// Merge environment variables into this configuration
    pub fn merge_from_env(&mut self) -> Result<()> {
        self.merge_from_lookup(|key| std::env::var(key).ok())
    }

    /// Merge values from an arbitrary key lookup (environment, tests)
    pub fn merge_from_lookup<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("REFERENCE_HOST") {
            self.reference_host = host.trim().to_string();
        }

        if let Some(url) = lookup("CONTENT_DOWNLOAD_URL") {
            self.content_download_url = url.trim().to_string();
        }

        if let Some(url) = lookup("GENERAL_DOWNLOAD_URL") {
            self.general_download_url = url.trim().to_string();
        }

        if let Some(url) = lookup("UPLOAD_URL") {
            self.upload_url = url.trim().to_string();
        }

        if let Some(value) = lookup("CONTENT_DOWNLOAD_CAP_MS") {
            self.content_download_cap_ms = parse_env("CONTENT_DOWNLOAD_CAP_MS", &value)?;
        }

        if let Some(value) = lookup("GENERAL_DOWNLOAD_CAP_MS") {
            self.general_download_cap_ms = parse_env("GENERAL_DOWNLOAD_CAP_MS", &value)?;
        }

        if let Some(value) = lookup("PROBE_TIMEOUT_MS") {
            self.probe_timeout_ms = parse_env("PROBE_TIMEOUT_MS", &value)?;
        }

        if let Some(value) = lookup("PROBE_PORT") {
            self.probe_port = parse_env("PROBE_PORT", &value)?;
        }

        if let Some(value) = lookup("PROBE_METHOD") {
            self.probe_method = value.parse()
                .map_err(|e| AppError::config(format!("Invalid PROBE_METHOD value '{}': {}", value, e)))?;
        }

        if let Some(value) = lookup("STAGE_PAUSE_MS") {
            self.stage_pause_ms = parse_env("STAGE_PAUSE_MS", &value)?;
        }

        if let Some(value) = lookup("ENABLE_COLOR") {
            self.enable_color = parse_env("ENABLE_COLOR", &value)?;
        }

        Ok(())
    }
}

fn parse_env<T>(key: &str, value: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse::<T>()
        .map_err(|e| AppError::config(format!("Invalid {} value '{}': {}", key, value, e)))
}

fn validate_http_url(name: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(AppError::config(format!("The {} cannot be empty", name)));
    }

    match url::Url::parse(value) {
        Ok(parsed) if parsed.scheme() == "http" || parsed.scheme() == "https" => Ok(()),
        Ok(parsed) => Err(AppError::config(format!(
            "The {} must use http or https, got '{}'", name, parsed.scheme()
        ))),
        Err(e) => Err(AppError::config(format!("Invalid {} '{}': {}", name, value, e))),
    }
}

// Default value functions for serde
fn default_reference_host() -> String {
    defaults::REFERENCE_HOST.to_string()
}

fn default_content_download_url() -> String {
    defaults::CONTENT_DOWNLOAD_URL.to_string()
}

fn default_general_download_url() -> String {
    defaults::GENERAL_DOWNLOAD_URL.to_string()
}

fn default_upload_url() -> String {
    defaults::UPLOAD_URL.to_string()
}

fn default_content_download_cap_ms() -> u64 {
    defaults::CONTENT_DOWNLOAD_CAP.as_millis() as u64
}

fn default_general_download_cap_ms() -> u64 {
    defaults::GENERAL_DOWNLOAD_CAP.as_millis() as u64
}

fn default_content_upload_bytes() -> usize {
    defaults::CONTENT_UPLOAD_BYTES
}

fn default_general_upload_bytes() -> usize {
    defaults::GENERAL_UPLOAD_BYTES
}

fn default_content_connect_timeout_ms() -> u64 {
    defaults::CONTENT_CONNECT_TIMEOUT.as_millis() as u64
}

fn default_content_read_timeout_ms() -> u64 {
    defaults::CONTENT_READ_TIMEOUT.as_millis() as u64
}

fn default_general_connect_timeout_ms() -> u64 {
    defaults::GENERAL_CONNECT_TIMEOUT.as_millis() as u64
}

fn default_general_read_timeout_ms() -> u64 {
    defaults::GENERAL_READ_TIMEOUT.as_millis() as u64
}

fn default_probe_timeout_ms() -> u64 {
    defaults::PROBE_TIMEOUT.as_millis() as u64
}

fn default_probe_port() -> u16 {
    defaults::PROBE_PORT
}

fn default_probe_method() -> ProbeMethod {
    ProbeMethod::TcpConnect
}

fn default_stage_pause_ms() -> u64 {
    defaults::STAGE_PAUSE.as_millis() as u64
}

fn default_services() -> Vec<ServiceEntry> {
    defaults::SERVICE_DOMAINS
        .iter()
        .map(|&(name, domain)| ServiceEntry::new(name, domain))
        .collect()
}

fn default_enable_color() -> bool {
    defaults::DEFAULT_ENABLE_COLOR
}
