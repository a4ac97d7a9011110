//! Network Speed Tester
//!
//! Measures round-trip latency, jitter, download and upload throughput
//! against either a fixed reference endpoint ("general" test) or a
//! service-specific endpoint ("content" test), and derives a quality tier
//! from the results.

pub mod cli;
pub mod client;
pub mod config;
pub mod dns;
pub mod error;
pub mod executor;
pub mod logging;
pub mod models;
pub mod output;
pub mod quality;
pub mod sampler;
pub mod stats;
pub mod types;

// Re-export commonly used types
pub use error::{AppError, Result};
pub use models::{Config, LatencySample, LatencyStats, ThroughputResult, ProgressEvent, TestReport, RunEvent};
pub use types::{TestMode, ProbeTarget, QualityTier, Stage, NetworkStatus};
pub use executor::{TestOrchestrator, SpeedTestRunner, RunHandle};
pub use quality::QualityClassifier;
pub use stats::LatencyAggregator;
pub use sampler::Sampler;
pub use client::{ThroughputStrategy, PrimaryClient, SecondaryClient, FallbackChain};

/// Application version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const PKG_NAME: &str = env!("CARGO_PKG_NAME");
pub const BUILD_TIME: &str = env!("BUILD_TIME");
pub const GIT_COMMIT: &str = env!("GIT_COMMIT");

/// Default configuration values
pub mod defaults {
    use std::time::Duration;

    /// Host probed for latency during a general test
    pub const REFERENCE_HOST: &str = "speed.cloudflare.com";
    /// 10 MB reference file used by content tests
    pub const CONTENT_DOWNLOAD_URL: &str = "https://speed.cloudflare.com/__down?bytes=10000000";
    /// 25 MB reference file used by general tests
    pub const GENERAL_DOWNLOAD_URL: &str = "https://speed.cloudflare.com/__down?bytes=25000000";
    pub const UPLOAD_URL: &str = "https://httpbin.org/post";

    pub const CONTENT_DOWNLOAD_CAP: Duration = Duration::from_millis(8000);
    pub const GENERAL_DOWNLOAD_CAP: Duration = Duration::from_millis(12000);

    pub const CONTENT_UPLOAD_BYTES: usize = 512 * 1024;
    pub const GENERAL_UPLOAD_BYTES: usize = 1024 * 1024;

    pub const CONTENT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
    pub const CONTENT_READ_TIMEOUT: Duration = Duration::from_secs(15);
    pub const GENERAL_CONNECT_TIMEOUT: Duration = Duration::from_secs(15);
    pub const GENERAL_READ_TIMEOUT: Duration = Duration::from_secs(20);

    pub const PROBE_TIMEOUT: Duration = Duration::from_millis(3000);
    pub const PROBE_PORT: u16 = 443;

    pub const QUICK_ATTEMPTS: u32 = 3;
    pub const QUICK_SPACING: Duration = Duration::from_millis(200);
    pub const THOROUGH_ATTEMPTS: u32 = 10;
    pub const THOROUGH_SPACING: Duration = Duration::from_millis(100);

    pub const STAGE_PAUSE: Duration = Duration::from_millis(500);

    pub const DEFAULT_ENABLE_COLOR: bool = true;

    pub const USER_AGENT: &str = concat!("network-speed-tester/", env!("CARGO_PKG_VERSION"));

    /// Service name to CDN domain used for content tests
    pub const SERVICE_DOMAINS: &[(&str, &str)] = &[
        ("WhatsApp", "web.whatsapp.com"),
        ("Facebook", "scontent.xx.fbcdn.net"),
        ("TikTok", "v16m.tiktokcdn.com"),
        ("YouTube", "googlevideo.com"),
        ("Instagram", "scontent.cdninstagram.com"),
        ("Twitter", "pbs.twimg.com"),
    ];
}
