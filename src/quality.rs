//! Quality tier classification from download throughput and ping

use crate::types::QualityTier;

/// Maps `(download Mbps, ping ms)` to a [`QualityTier`].
///
/// Thresholds are evaluated first-match, best tier first. A ping of `-1`
/// (unavailable) fails every ping bound, so the result falls through to the
/// throughput-only tiers. Excellent also needs a strictly positive ping.
pub struct QualityClassifier;

struct Threshold {
    tier: QualityTier,
    min_download_mbps: f64,
    /// Inclusive lower bound on ping, checked only with an upper bound
    min_ping_ms: i64,
    /// Exclusive upper bound on ping; `None` means ping is not considered
    max_ping_ms: Option<i64>,
}

const THRESHOLDS: &[Threshold] = &[
    Threshold { tier: QualityTier::Excellent, min_download_mbps: 25.0, min_ping_ms: 1, max_ping_ms: Some(50) },
    Threshold { tier: QualityTier::Good, min_download_mbps: 10.0, min_ping_ms: 0, max_ping_ms: Some(100) },
    Threshold { tier: QualityTier::Fair, min_download_mbps: 5.0, min_ping_ms: 0, max_ping_ms: Some(150) },
    Threshold { tier: QualityTier::Poor, min_download_mbps: 2.0, min_ping_ms: 0, max_ping_ms: None },
];

impl QualityClassifier {
    pub fn classify(download_mbps: f64, ping_ms: i64) -> QualityTier {
        THRESHOLDS
            .iter()
            .find(|t| download_mbps >= t.min_download_mbps && t.ping_within(ping_ms))
            .map(|t| t.tier)
            .unwrap_or(QualityTier::VeryPoor)
    }
}

impl Threshold {
    fn ping_within(&self, ping_ms: i64) -> bool {
        match self.max_ping_ms {
            // Every lower bound is >= 0, so the -1 sentinel never passes
            Some(max) => ping_ms >= self.min_ping_ms && ping_ms < max,
            None => true,
        }
    }
}
