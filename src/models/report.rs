//! Progress notifications and the final report of a test run

use crate::{
    models::metrics::{LatencyStats, ThroughputResult, LATENCY_UNAVAILABLE},
    types::{QualityTier, Stage, TestMode, TransportClass},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What a progress event announces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProgressKind {
    /// A stage is about to start
    Started,
    /// A stage finished; `value` carries the measurement if there was one
    Result,
    /// The run could not start
    Failure,
}

/// Transient notification emitted while a run is in flight
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub stage: Stage,
    pub kind: ProgressKind,
    pub message: String,
    /// Measured value in the stage's unit (ms or Mbps); `None` if unavailable
    pub value: Option<f64>,
    pub timestamp: DateTime<Utc>,
}

impl ProgressEvent {
    pub fn started<S: Into<String>>(stage: Stage, message: S) -> Self {
        Self::new(stage, ProgressKind::Started, message.into(), None)
    }

    pub fn result<S: Into<String>>(stage: Stage, message: S, value: Option<f64>) -> Self {
        Self::new(stage, ProgressKind::Result, message.into(), value)
    }

    pub fn failure<S: Into<String>>(message: S) -> Self {
        Self::new(Stage::Preflight, ProgressKind::Failure, message.into(), None)
    }

    fn new(stage: Stage, kind: ProgressKind, message: String, value: Option<f64>) -> Self {
        Self {
            stage,
            kind,
            message,
            value,
            timestamp: Utc::now(),
        }
    }
}

/// Terminal output of a run. Never mutated after it is handed out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestReport {
    pub run_id: String,
    pub mode: TestMode,
    pub network: TransportClass,
    /// Average round-trip in ms, `-1` if unavailable
    pub ping_ms: i64,
    /// Latency spread in ms, `-1` if unavailable or not measured for this mode
    pub jitter_ms: i64,
    /// `0` if unavailable
    pub download_mbps: f64,
    /// `0` if unavailable
    pub upload_mbps: f64,
    pub quality: QualityTier,
    pub latency: LatencyStats,
    pub download: ThroughputResult,
    pub upload: ThroughputResult,
    /// False when the connectivity precondition failed and nothing was measured
    pub network_available: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl TestReport {
    /// All-sentinel report for a run refused by the connectivity precondition
    pub fn unreachable(
        run_id: String,
        mode: TestMode,
        network: TransportClass,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            run_id,
            mode,
            network,
            ping_ms: LATENCY_UNAVAILABLE,
            jitter_ms: LATENCY_UNAVAILABLE,
            download_mbps: 0.0,
            upload_mbps: 0.0,
            quality: QualityTier::VeryPoor,
            latency: LatencyStats::unavailable(),
            download: ThroughputResult::zero(),
            upload: ThroughputResult::zero(),
            network_available: false,
            started_at,
            finished_at: Utc::now(),
        }
    }

    pub fn ping_available(&self) -> bool {
        self.ping_ms >= 0
    }

    pub fn jitter_available(&self) -> bool {
        self.jitter_ms >= 0
    }

    pub fn format_ping(&self) -> String {
        format_latency(self.ping_ms)
    }

    pub fn format_jitter(&self) -> String {
        format_latency(self.jitter_ms)
    }

    pub fn total_duration(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }
}

/// Item of the lazy sequence produced by a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RunEvent {
    Progress(ProgressEvent),
    // Boxed so the enum stays small
    Report(Box<TestReport>),
}

/// `"42 ms"`, or `"Failed"` for the sentinel
pub fn format_latency(ms: i64) -> String {
    if ms >= 0 {
        format!("{} ms", ms)
    } else {
        "Failed".to_string()
    }
}

/// Two decimals, e.g. `"12.35 Mbps"`
pub fn format_mbps(mbps: f64) -> String {
    format!("{:.2} Mbps", mbps)
}
