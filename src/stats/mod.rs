//! Latency aggregation for reachability samples

use crate::models::metrics::{LatencySample, LatencyStats};

/// Reduces raw reachability samples to average/min/max/jitter.
///
/// Only successful samples count. With no successful sample the result is
/// [`LatencyStats::unavailable`]. The average is integer-truncated, matching
/// the whole-millisecond unit of the samples.
pub struct LatencyAggregator;

impl LatencyAggregator {
    pub fn aggregate(samples: &[LatencySample]) -> LatencyStats {
        let durations: Vec<i64> = samples
            .iter()
            .filter(|s| s.is_successful())
            .map(|s| s.duration_ms as i64)
            .collect();

        Self::aggregate_durations(&durations)
    }

    /// Aggregate plain millisecond values, all assumed successful
    pub fn aggregate_durations(durations: &[i64]) -> LatencyStats {
        if durations.is_empty() {
            return LatencyStats::unavailable();
        }

        let sum: i64 = durations.iter().sum();
        let min = durations.iter().copied().min().unwrap_or_default();
        let max = durations.iter().copied().max().unwrap_or_default();

        LatencyStats {
            average: sum / durations.len() as i64,
            min,
            max,
            jitter: max - min,
        }
    }

    /// Fraction of attempts that succeeded, 0.0..=1.0
    pub fn success_ratio(samples: &[LatencySample]) -> f64 {
        if samples.is_empty() {
            return 0.0;
        }
        samples.iter().filter(|s| s.is_successful()).count() as f64 / samples.len() as f64
    }
}

#[cfg(test)]
mod comprehensive_tests;
