//! Repeated reachability sampling

pub mod probe;

pub use probe::{HttpHeadProbe, ReachabilityProbe, TcpConnectProbe};

use crate::{
    error::Result,
    logging::Logger,
    models::{Config, LatencySample, SamplerProfile},
    types::{ProbeMethod, ProbeTarget},
};
use std::sync::Arc;
use tokio::time::{sleep, timeout};

/// Issues a fixed number of sequential reachability probes against one host.
///
/// Attempts never overlap. Each one is bounded by the profile's attempt
/// timeout and followed by the profile's spacing delay, except the last.
pub struct Sampler {
    probe: Arc<dyn ReachabilityProbe>,
    logger: Logger,
}

impl Sampler {
    pub fn new(probe: Arc<dyn ReachabilityProbe>, logger: Logger) -> Self {
        Self { probe, logger }
    }

    /// Build the probe selected by `config.probe_method`
    pub fn from_config(config: &Config, logger: Logger) -> Result<Self> {
        let probe: Arc<dyn ReachabilityProbe> = match config.probe_method {
            ProbeMethod::TcpConnect => Arc::new(TcpConnectProbe::new(config.probe_port)),
            ProbeMethod::HttpHead => Arc::new(HttpHeadProbe::new(config.probe_timeout())?),
        };
        Ok(Self::new(probe, logger))
    }

    pub fn probe_name(&self) -> &'static str {
        self.probe.name()
    }

    /// Run `profile.attempts` probes and return one sample per attempt, in order
    pub async fn measure(&self, target: &ProbeTarget, profile: &SamplerProfile) -> Vec<LatencySample> {
        let mut samples = Vec::with_capacity(profile.attempts as usize);

        for attempt in 1..=profile.attempts {
            let sample = match timeout(profile.attempt_timeout, self.probe.probe(target)).await {
                Ok(Ok(elapsed)) => LatencySample::success(attempt, elapsed),
                Ok(Err(e)) => LatencySample::failed(attempt, e.to_string()),
                Err(_) => LatencySample::failed(
                    attempt,
                    format!("timed out after {} ms", profile.attempt_timeout.as_millis()),
                ),
            };

            self.logger
                .debug("Reachability attempt finished")
                .field("host", &target.hostname)
                .field("probe", self.probe.name())
                .sample(&sample)
                .log()
                .await;

            samples.push(sample);

            if attempt < profile.attempts && !profile.spacing.is_zero() {
                sleep(profile.spacing).await;
            }
        }

        samples
    }
}
