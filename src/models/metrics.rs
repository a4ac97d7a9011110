//! Latency and throughput measurement data models

use serde::{Deserialize, Serialize};
use std::time::Duration;
use chrono::{DateTime, Utc};

/// Sentinel for latency values that could not be measured
pub const LATENCY_UNAVAILABLE: i64 = -1;

/// One reachability attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatencySample {
    /// 1-based attempt number within the sampling window
    pub attempt: u32,
    /// Round-trip time in whole milliseconds; meaningless when `success` is false
    pub duration_ms: u64,
    pub success: bool,
    /// Why the attempt failed, if it did
    pub error_message: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl LatencySample {
    /// Create a successful sample
    pub fn success(attempt: u32, duration: Duration) -> Self {
        Self {
            attempt,
            duration_ms: duration.as_millis() as u64,
            success: true,
            error_message: None,
            timestamp: Utc::now(),
        }
    }

    /// Create a failed sample (timeout, refused, unresolvable host)
    pub fn failed<S: Into<String>>(attempt: u32, error_message: S) -> Self {
        Self {
            attempt,
            duration_ms: 0,
            success: false,
            error_message: Some(error_message.into()),
            timestamp: Utc::now(),
        }
    }

    pub fn is_successful(&self) -> bool {
        self.success
    }
}

/// Aggregated latency over successful samples, in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LatencyStats {
    pub average: i64,
    pub min: i64,
    pub max: i64,
    /// max - min
    pub jitter: i64,
}

impl LatencyStats {
    /// All fields set to the unavailable sentinel
    pub fn unavailable() -> Self {
        Self {
            average: LATENCY_UNAVAILABLE,
            min: LATENCY_UNAVAILABLE,
            max: LATENCY_UNAVAILABLE,
            jitter: LATENCY_UNAVAILABLE,
        }
    }

    pub fn is_available(&self) -> bool {
        self.average != LATENCY_UNAVAILABLE
    }
}

impl Default for LatencyStats {
    fn default() -> Self {
        Self::unavailable()
    }
}

/// Outcome of one bounded transfer
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThroughputResult {
    pub bytes_transferred: u64,
    pub duration_seconds: f64,
    /// `bytes * 8 / (seconds * 1e6)`, or 0 when unmeasurable
    pub megabits_per_second: f64,
}

impl ThroughputResult {
    /// The "could not measure" sentinel
    pub fn zero() -> Self {
        Self {
            bytes_transferred: 0,
            duration_seconds: 0.0,
            megabits_per_second: 0.0,
        }
    }

    /// Compute the rate of a finished transfer.
    ///
    /// The rate is only computed when both the byte count and the elapsed
    /// time are positive; otherwise the sentinel rate `0` is recorded.
    pub fn from_transfer(bytes_transferred: u64, elapsed: Duration) -> Self {
        let duration_seconds = elapsed.as_secs_f64();
        let megabits_per_second = if duration_seconds > 0.0 && bytes_transferred > 0 {
            (bytes_transferred as f64 * 8.0) / (duration_seconds * 1_000_000.0)
        } else {
            0.0
        };

        Self {
            bytes_transferred,
            duration_seconds,
            megabits_per_second,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.megabits_per_second <= 0.0 || !self.megabits_per_second.is_finite()
    }
}

impl Default for ThroughputResult {
    fn default() -> Self {
        Self::zero()
    }
}
