//! Data models and structures for the network speed tester

pub mod config;
pub mod metrics;
pub mod report;

// Re-export main model types
pub use config::{Config, SamplerProfile, TransferProfile, ServiceEntry};
pub use metrics::{LatencySample, LatencyStats, ThroughputResult, LATENCY_UNAVAILABLE};
pub use report::{ProgressEvent, ProgressKind, TestReport, RunEvent, format_latency, format_mbps};
