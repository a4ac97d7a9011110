//! Property-based tests for latency aggregation
//!
//! Covers the ordering and jitter invariants over arbitrary mixes of
//! successful and failed samples.

use super::LatencyAggregator;
use crate::models::metrics::{LatencySample, LatencyStats};
use proptest::prelude::*;
use proptest::collection::vec;
use std::time::Duration;

/// Property-based test generators
mod generators {
    use super::*;

    /// A sample that succeeded with a plausible round-trip time
    pub fn successful_sample() -> impl Strategy<Value = LatencySample> {
        (1u32..20, 0u64..5000)
            .prop_map(|(attempt, ms)| LatencySample::success(attempt, Duration::from_millis(ms)))
    }

    /// Either outcome, roughly one in four failing
    pub fn any_sample() -> impl Strategy<Value = LatencySample> {
        prop_oneof![
            3 => successful_sample(),
            1 => (1u32..20).prop_map(|attempt| LatencySample::failed(attempt, "timed out")),
        ]
    }
}

mod property_tests {
    use super::*;

    proptest! {
        /// Average always lies between min and max
        #[test]
        fn average_between_min_max(samples in vec(generators::any_sample(), 1..50)) {
            let stats = LatencyAggregator::aggregate(&samples);
            if samples.iter().any(|s| s.is_successful()) {
                prop_assert!(stats.min <= stats.average);
                prop_assert!(stats.average <= stats.max);
            } else {
                prop_assert_eq!(stats, LatencyStats::unavailable());
            }
        }

        /// Jitter is exactly the spread
        #[test]
        fn jitter_is_spread(samples in vec(generators::successful_sample(), 1..50)) {
            let stats = LatencyAggregator::aggregate(&samples);
            prop_assert_eq!(stats.jitter, stats.max - stats.min);
            prop_assert!(stats.jitter >= 0);
        }

        /// Failed samples never influence the result
        #[test]
        fn failures_are_ignored(
            ok in vec(generators::successful_sample(), 1..20),
            failures in 0usize..10,
        ) {
            let mut mixed = ok.clone();
            for i in 0..failures {
                mixed.push(LatencySample::failed(100 + i as u32, "refused"));
            }
            prop_assert_eq!(LatencyAggregator::aggregate(&ok), LatencyAggregator::aggregate(&mixed));
        }

        /// All-failed windows always produce the sentinel
        #[test]
        fn all_failed_is_sentinel(count in 0usize..20) {
            let samples: Vec<LatencySample> = (0..count)
                .map(|i| LatencySample::failed(i as u32 + 1, "timed out"))
                .collect();
            prop_assert_eq!(LatencyAggregator::aggregate(&samples), LatencyStats::unavailable());
        }
    }
}

mod edge_cases {
    use super::*;

    #[test]
    fn large_values_do_not_overflow() {
        let samples: Vec<LatencySample> = (0..10)
            .map(|i| LatencySample::success(i + 1, Duration::from_millis(3_000 + i as u64)))
            .collect();
        let stats = LatencyAggregator::aggregate(&samples);
        assert_eq!(stats.min, 3_000);
        assert_eq!(stats.max, 3_009);
        assert_eq!(stats.average, 3_004);
    }

    #[test]
    fn order_of_samples_does_not_matter() {
        let forward: Vec<i64> = vec![10, 80, 35, 22];
        let mut backward = forward.clone();
        backward.reverse();
        assert_eq!(
            LatencyAggregator::aggregate_durations(&forward),
            LatencyAggregator::aggregate_durations(&backward)
        );
    }
}
