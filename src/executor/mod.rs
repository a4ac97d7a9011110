//! Test execution engine
//!
//! This module contains the run sequencing components:
//! - `TestOrchestrator` drives latency, download and upload strictly in order
//! - `RunHandle` exposes a run as a lazy sequence of [`RunEvent`]s
//! - `SpeedTestRunner` stops the previous run before starting a new one

use crate::{
    client::{synthetic_payload, FallbackChain, TransferTimeouts},
    error::{AppError, Result},
    logging::Logger,
    models::{
        format_latency, format_mbps, Config, LatencyStats, ProgressEvent, RunEvent, TestReport,
        ThroughputResult, LATENCY_UNAVAILABLE,
    },
    quality::QualityClassifier,
    sampler::Sampler,
    stats::LatencyAggregator,
    types::{NetworkStatus, RunState, Stage, TestMode},
};
use chrono::Utc;
use std::sync::Arc;
use tokio::{
    sync::mpsc,
    task::{AbortHandle, JoinHandle},
};
use uuid::Uuid;

/// Buffered events between the run task and its consumer
const EVENT_BUFFER: usize = 16;

pub const MSG_NO_NETWORK: &str = "No network connection available!";
pub const MSG_LATENCY: &str = "Testing connection latency...";
pub const MSG_DOWNLOAD: &str = "Testing download speed...";
pub const MSG_UPLOAD: &str = "Testing upload speed...";

/// Builds the latency sampler for one run from that run's logger
pub type SamplerFactory = Arc<dyn Fn(Logger) -> Result<Sampler> + Send + Sync>;

/// Sequences one speed test run.
///
/// Cheap to clone. Each run builds its own sampler (probe and resolver
/// cache included) and logs under its own context; runs share only the
/// immutable configuration and the stateless transport chain.
#[derive(Clone)]
pub struct TestOrchestrator {
    config: Arc<Config>,
    sampler_factory: SamplerFactory,
    chain: Arc<FallbackChain>,
    logger: Logger,
}

impl TestOrchestrator {
    pub fn new<F>(config: Config, sampler_factory: F, chain: FallbackChain, logger: Logger) -> Self
    where
        F: Fn(Logger) -> Result<Sampler> + Send + Sync + 'static,
    {
        Self {
            config: Arc::new(config),
            sampler_factory: Arc::new(sampler_factory),
            chain: Arc::new(chain),
            logger,
        }
    }

    /// Validate `config` and wire up the configured probe and both transports
    pub fn from_config(config: Config, logger: Logger) -> Result<Self> {
        config.validate()?;
        let probe_config = config.clone();
        let chain = FallbackChain::standard(logger.child("throughput"));
        Ok(Self::new(
            config,
            move |logger| Sampler::from_config(&probe_config, logger),
            chain,
            logger,
        ))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Start a run on a background task
    pub fn run(&self, mode: TestMode, network: NetworkStatus) -> RunHandle {
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let orchestrator = self.clone();

        let task = tokio::spawn(async move {
            if let Err(e) = orchestrator.drive(mode, network, &tx).await {
                orchestrator
                    .logger
                    .debug("Run stopped early")
                    .error_info(&e)
                    .log()
                    .await;
            }
        });

        RunHandle { events: rx, task }
    }

    /// Run to the end and collect everything it emitted
    pub async fn run_to_completion(&self, mode: TestMode, network: NetworkStatus) -> Result<RunOutcome> {
        let mut handle = self.run(mode, network);
        let mut progress = Vec::new();

        while let Some(event) = handle.next_event().await {
            match event {
                RunEvent::Progress(event) => progress.push(event),
                RunEvent::Report(report) => return Ok(RunOutcome { progress, report: *report }),
            }
        }

        Err(AppError::cancelled("Run ended without a report"))
    }

    /// Execute the stage sequence, writing events to `tx`.
    ///
    /// Stage failures never abort the run; the only error is the consumer
    /// going away, which stops the run at its next event.
    pub async fn drive(
        &self,
        mode: TestMode,
        network: NetworkStatus,
        tx: &mpsc::Sender<RunEvent>,
    ) -> Result<TestReport> {
        let run_id = Uuid::new_v4().to_string();
        let started_at = Utc::now();
        let logger = self.logger.for_run(&run_id);
        logger.add_context_field("mode", mode.label()).await;

        if !network.reachable {
            logger
                .warn("Connectivity precondition failed, not starting")
                .log()
                .await;
            emit(tx, RunEvent::Progress(ProgressEvent::failure(MSG_NO_NETWORK))).await?;

            let report = TestReport::unreachable(run_id, mode, network.transport, started_at);
            emit(tx, RunEvent::Report(Box::new(report.clone()))).await?;
            return Ok(report);
        }

        logger
            .info("Starting speed test")
            .field("network", network.transport.description())
            .log()
            .await;

        let mut state = transition(&logger, RunState::Idle).await;

        emit(tx, RunEvent::Progress(ProgressEvent::started(Stage::Latency, MSG_LATENCY))).await?;
        self.pause().await;
        let latency = self.measure_latency(&mode, &logger).await;
        let ping_ms = latency.average;
        let jitter_ms = if mode.is_general() { latency.jitter } else { LATENCY_UNAVAILABLE };
        emit(tx, RunEvent::Progress(ProgressEvent::result(
            Stage::Latency,
            format_latency(ping_ms),
            (ping_ms >= 0).then_some(ping_ms as f64),
        ))).await?;

        state = transition(&logger, state).await;

        emit(tx, RunEvent::Progress(ProgressEvent::started(Stage::Download, MSG_DOWNLOAD))).await?;
        self.pause().await;
        let download = self.measure_download(&mode).await;
        emit(tx, RunEvent::Progress(ProgressEvent::result(
            Stage::Download,
            format_mbps(download.megabits_per_second),
            (!download.is_zero()).then_some(download.megabits_per_second),
        ))).await?;

        state = transition(&logger, state).await;

        emit(tx, RunEvent::Progress(ProgressEvent::started(Stage::Upload, MSG_UPLOAD))).await?;
        self.pause().await;
        let upload = self.measure_upload(&mode).await;
        emit(tx, RunEvent::Progress(ProgressEvent::result(
            Stage::Upload,
            format_mbps(upload.megabits_per_second),
            (!upload.is_zero()).then_some(upload.megabits_per_second),
        ))).await?;

        transition(&logger, state).await;

        let quality = QualityClassifier::classify(download.megabits_per_second, ping_ms);
        let report = TestReport {
            run_id,
            mode,
            network: network.transport,
            ping_ms,
            jitter_ms,
            download_mbps: download.megabits_per_second,
            upload_mbps: upload.megabits_per_second,
            quality,
            latency,
            download,
            upload,
            network_available: true,
            started_at,
            finished_at: Utc::now(),
        };

        logger
            .info("Speed test complete")
            .field("ping_ms", report.ping_ms)
            .field("jitter_ms", report.jitter_ms)
            .field("download_mbps", report.download_mbps)
            .field("upload_mbps", report.upload_mbps)
            .field("quality", quality.description())
            .log()
            .await;

        emit(tx, RunEvent::Report(Box::new(report.clone()))).await?;
        Ok(report)
    }

    async fn pause(&self) {
        let pause = self.config.stage_pause();
        if !pause.is_zero() {
            tokio::time::sleep(pause).await;
        }
    }

    async fn measure_latency(&self, mode: &TestMode, logger: &Logger) -> LatencyStats {
        let target = match self.config.latency_target(mode) {
            Ok(target) => target,
            Err(e) => {
                logger.warn("No usable latency target").error_info(&e).log().await;
                return LatencyStats::unavailable();
            }
        };

        let sampler = match (self.sampler_factory)(logger.child("sampler")) {
            Ok(sampler) => sampler,
            Err(e) => {
                logger.warn("Could not build latency sampler").error_info(&e).log().await;
                return LatencyStats::unavailable();
            }
        };

        let profile = self.config.sampler_profile(mode);
        let samples = sampler.measure(&target, &profile).await;
        let stats = LatencyAggregator::aggregate(&samples);

        logger
            .debug("Latency aggregated")
            .field("host", &target.hostname)
            .field("attempts", samples.len())
            .field("success_ratio", LatencyAggregator::success_ratio(&samples))
            .field("stats", stats)
            .log()
            .await;

        stats
    }

    async fn measure_download(&self, mode: &TestMode) -> ThroughputResult {
        let profile = self.config.transfer_profile(mode);
        self.chain
            .download(&profile.download_url, profile.download_cap, TransferTimeouts::from(&profile))
            .await
    }

    async fn measure_upload(&self, mode: &TestMode) -> ThroughputResult {
        let profile = self.config.transfer_profile(mode);
        let payload = synthetic_payload(profile.upload_bytes);
        self.chain
            .upload(&profile.upload_url, &payload, TransferTimeouts::from(&profile))
            .await
    }
}

async fn transition(logger: &Logger, from: RunState) -> RunState {
    let to = from.advance();
    logger
        .debug("State transition")
        .field("from", from)
        .field("to", to)
        .log()
        .await;
    to
}

async fn emit(tx: &mpsc::Sender<RunEvent>, event: RunEvent) -> Result<()> {
    tx.send(event)
        .await
        .map_err(|_| AppError::cancelled("Run consumer went away"))
}

/// Everything a finished run emitted
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub progress: Vec<ProgressEvent>,
    pub report: TestReport,
}

/// Consumer side of one run
pub struct RunHandle {
    events: mpsc::Receiver<RunEvent>,
    task: JoinHandle<()>,
}

impl RunHandle {
    /// Next event, or `None` once the run has finished or was stopped
    pub async fn next_event(&mut self) -> Option<RunEvent> {
        self.events.recv().await
    }

    /// Stop the run, abandoning any in-flight connection
    pub fn cancel(&self) {
        self.task.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    pub fn abort_handle(&self) -> AbortHandle {
        self.task.abort_handle()
    }
}

/// Starts runs one at a time.
///
/// Starting a run stops the previous one first, so events of two runs never
/// interleave.
pub struct SpeedTestRunner {
    orchestrator: TestOrchestrator,
    active: Option<AbortHandle>,
}

impl SpeedTestRunner {
    pub fn new(orchestrator: TestOrchestrator) -> Self {
        Self { orchestrator, active: None }
    }

    pub fn start(&mut self, mode: TestMode, network: NetworkStatus) -> RunHandle {
        self.cancel();
        let handle = self.orchestrator.run(mode, network);
        self.active = Some(handle.abort_handle());
        handle
    }

    /// Stop the active run; returns whether one was still in flight
    pub fn cancel(&mut self) -> bool {
        match self.active.take() {
            Some(previous) if !previous.is_finished() => {
                previous.abort();
                true
            }
            _ => false,
        }
    }
}
