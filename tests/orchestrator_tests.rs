//! End-to-end runs of the orchestrator through the public API

use async_trait::async_trait;
use network_speed_tester::{
    client::{FallbackChain, ThroughputStrategy, TransferTimeouts},
    error::{AppError, Result},
    executor::{SpeedTestRunner, TestOrchestrator},
    logging::Logger,
    models::{Config, ProgressKind, RunEvent, ThroughputResult},
    sampler::{ReachabilityProbe, Sampler},
    types::{NetworkStatus, ProbeTarget, Stage, TestMode, TransportClass},
};
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};
use std::time::Duration;
use tokio::net::TcpListener;
use wiremock::{
    matchers::{method, path},
    Mock, MockServer, ResponseTemplate,
};

fn quiet_config() -> Config {
    let mut config = Config::default();
    config.stage_pause_ms = 0;
    config.content_upload_bytes = 2048;
    config.general_upload_bytes = 4096;
    config
}

/// Probe answering after a fixed delay, counting its calls
struct CountingProbe {
    delay: Duration,
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl ReachabilityProbe for CountingProbe {
    async fn probe(&self, _target: &ProbeTarget) -> Result<Duration> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        Ok(self.delay)
    }

    fn name(&self) -> &'static str {
        "counting"
    }
}

/// Strategy with a canned upload outcome, counting upload calls
struct ScriptedStrategy {
    name: &'static str,
    upload_mbps: Option<f64>,
    uploads: Arc<AtomicUsize>,
}

#[async_trait]
impl ThroughputStrategy for ScriptedStrategy {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn download(&self, _url: &str, _cap: Duration, _t: TransferTimeouts) -> Result<ThroughputResult> {
        Ok(ThroughputResult::from_transfer(2_500_000, Duration::from_secs(1)))
    }

    async fn upload(&self, _url: &str, payload: &[u8], _t: TransferTimeouts) -> Result<ThroughputResult> {
        self.uploads.fetch_add(1, Ordering::SeqCst);
        match self.upload_mbps {
            Some(mbps) if mbps <= 0.0 => Ok(ThroughputResult::zero()),
            Some(_) => Ok(ThroughputResult::from_transfer(payload.len() as u64, Duration::from_millis(500))),
            None => Err(AppError::transport_failure("scripted failure")),
        }
    }
}

fn scripted_orchestrator(
    probe_delay: Duration,
    strategies: Vec<Arc<dyn ThroughputStrategy>>,
) -> (TestOrchestrator, Arc<AtomicUsize>) {
    let logger = Logger::new("orchestrator-it");
    let calls = Arc::new(AtomicUsize::new(0));
    let probe = Arc::new(CountingProbe { delay: probe_delay, calls: calls.clone() });
    let chain = FallbackChain::new(strategies, logger.clone());
    let orchestrator = TestOrchestrator::new(
        quiet_config(),
        move |logger| Ok(Sampler::new(probe.clone(), logger)),
        chain,
        logger,
    );
    (orchestrator, calls)
}

fn scripted(name: &'static str, upload_mbps: Option<f64>) -> (Arc<dyn ThroughputStrategy>, Arc<AtomicUsize>) {
    let uploads = Arc::new(AtomicUsize::new(0));
    let strategy = ScriptedStrategy { name, upload_mbps, uploads: uploads.clone() };
    (Arc::new(strategy), uploads)
}

#[tokio::test]
async fn test_unreachable_network_emits_single_failure() {
    let (primary, uploads) = scripted("primary", Some(5.0));
    let (orchestrator, probes) = scripted_orchestrator(Duration::from_millis(1), vec![primary]);

    let outcome = orchestrator
        .run_to_completion(TestMode::General, NetworkStatus::offline())
        .await
        .unwrap();

    assert_eq!(outcome.progress.len(), 1);
    assert_eq!(outcome.progress[0].kind, ProgressKind::Failure);
    assert_eq!(outcome.progress[0].message, "No network connection available!");

    let report = outcome.report;
    assert!(!report.network_available);
    assert_eq!(report.ping_ms, -1);
    assert_eq!(report.jitter_ms, -1);
    assert_eq!(report.download_mbps, 0.0);
    assert_eq!(report.upload_mbps, 0.0);

    assert_eq!(probes.load(Ordering::SeqCst), 0);
    assert_eq!(uploads.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_zero_upload_falls_back_to_secondary() {
    let (primary, primary_uploads) = scripted("primary", Some(0.0));
    let (secondary, secondary_uploads) = scripted("secondary", Some(1.0));
    let (orchestrator, _) = scripted_orchestrator(Duration::from_millis(1), vec![primary, secondary]);

    let report = orchestrator
        .run_to_completion(TestMode::General, NetworkStatus::online(TransportClass::Cellular))
        .await
        .unwrap()
        .report;

    assert_eq!(primary_uploads.load(Ordering::SeqCst), 1);
    assert_eq!(secondary_uploads.load(Ordering::SeqCst), 1);
    assert_eq!(report.upload.bytes_transferred, 4096);
    assert!(report.upload_mbps > 0.0);
    assert_eq!(report.network, TransportClass::Cellular);
}

#[tokio::test]
async fn test_all_strategies_failing_reports_zero() {
    let (primary, _) = scripted("primary", None);
    let (secondary, _) = scripted("secondary", None);
    let (orchestrator, _) = scripted_orchestrator(Duration::from_millis(1), vec![primary, secondary]);

    let outcome = orchestrator
        .run_to_completion(TestMode::content("TikTok", "v16m.tiktokcdn.com"), NetworkStatus::online(TransportClass::Wifi))
        .await
        .unwrap();

    assert_eq!(outcome.report.upload_mbps, 0.0);
    let upload_result = outcome
        .progress
        .iter()
        .find(|e| e.stage == Stage::Upload && e.kind == ProgressKind::Result)
        .unwrap();
    assert_eq!(upload_result.message, "0.00 Mbps");
    assert!(upload_result.value.is_none());
}

#[tokio::test]
async fn test_content_and_general_sampling_depth() {
    let (strategy, _) = scripted("primary", Some(1.0));
    let (orchestrator, probes) = scripted_orchestrator(Duration::from_millis(1), vec![strategy]);

    let content = orchestrator
        .run_to_completion(TestMode::content("YouTube", "googlevideo.com"), NetworkStatus::online(TransportClass::Wifi))
        .await
        .unwrap()
        .report;
    assert_eq!(probes.load(Ordering::SeqCst), 3);
    assert_eq!(content.jitter_ms, -1);
    assert!(content.ping_ms >= 1);

    let general = orchestrator
        .run_to_completion(TestMode::General, NetworkStatus::online(TransportClass::Wifi))
        .await
        .unwrap()
        .report;
    assert_eq!(probes.load(Ordering::SeqCst), 13);
    assert!(general.jitter_ms >= 0);
    assert_ne!(content.run_id, general.run_id);
}

#[tokio::test]
async fn test_full_general_run_against_local_endpoints() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/file"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![7u8; 256 * 1024]))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/upload"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            drop(socket);
        }
    });

    let mut config = quiet_config();
    config.reference_host = "127.0.0.1".to_string();
    config.probe_port = port;
    config.general_download_url = format!("{}/file", server.uri());
    config.general_download_cap_ms = 5000;
    config.upload_url = format!("{}/upload", server.uri());

    let orchestrator = TestOrchestrator::from_config(config, Logger::new("full-run")).unwrap();
    let outcome = orchestrator
        .run_to_completion(TestMode::General, NetworkStatus::online(TransportClass::Ethernet))
        .await
        .unwrap();

    assert_eq!(outcome.progress.len(), 6);
    let report = outcome.report;
    assert!(report.network_available);
    assert!(report.ping_ms >= 0);
    assert!(report.jitter_ms >= 0);
    assert_eq!(report.download.bytes_transferred, 256 * 1024);
    assert!(report.download_mbps > 0.0);
    assert_eq!(report.upload.bytes_transferred, 4096);
    assert!(report.upload_mbps > 0.0);
    assert!(report.finished_at >= report.started_at);
}

#[tokio::test]
async fn test_starting_a_new_run_stops_the_previous_one() {
    let (strategy, _) = scripted("primary", Some(1.0));
    let (orchestrator, _) = scripted_orchestrator(Duration::from_millis(50), vec![strategy]);
    let mut runner = SpeedTestRunner::new(orchestrator);

    let mut first = runner.start(TestMode::General, NetworkStatus::online(TransportClass::Wifi));
    match first.next_event().await {
        Some(RunEvent::Progress(event)) => assert_eq!(event.stage, Stage::Latency),
        other => panic!("unexpected first event: {:?}", other),
    }

    let mut second = runner.start(
        TestMode::content("TikTok", "v16m.tiktokcdn.com"),
        NetworkStatus::online(TransportClass::Wifi),
    );

    let drained = tokio::time::timeout(Duration::from_secs(5), async {
        let mut events = Vec::new();
        while let Some(event) = first.next_event().await {
            events.push(event);
        }
        events
    })
    .await
    .expect("first run should stop promptly");
    assert!(drained.iter().all(|e| !matches!(e, RunEvent::Report(_))));

    let mut got_report = false;
    while let Some(event) = second.next_event().await {
        if let RunEvent::Report(report) = event {
            assert_eq!(report.mode, TestMode::content("TikTok", "v16m.tiktokcdn.com"));
            got_report = true;
        }
    }
    assert!(got_report);

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!runner.cancel());
}

#[tokio::test]
async fn test_runner_cancel_in_flight() {
    let (strategy, _) = scripted("primary", Some(1.0));
    let (orchestrator, _) = scripted_orchestrator(Duration::from_millis(100), vec![strategy]);
    let mut runner = SpeedTestRunner::new(orchestrator);

    let mut handle = runner.start(TestMode::General, NetworkStatus::online(TransportClass::Wifi));
    assert!(handle.next_event().await.is_some());
    assert!(runner.cancel());

    let rest = tokio::time::timeout(Duration::from_secs(5), async {
        let mut count = 0;
        while handle.next_event().await.is_some() {
            count += 1;
        }
        count
    })
    .await
    .unwrap();
    assert!(rest <= 1);
    assert!(!runner.cancel());
}
