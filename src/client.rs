//! Throughput probes and transport fallback
//!
//! Two independently implemented transports measure the same logical
//! transfer: [`PrimaryClient`] on reqwest and [`SecondaryClient`] on a bare
//! hyper client. [`FallbackChain`] tries them in order until one produces a
//! non-zero rate.


use crate::{
    defaults,
    error::{AppError, Result},
    logging::Logger,
    models::{ThroughputResult, TransferProfile},
};
use async_trait::async_trait;
use futures::{Stream, StreamExt};
use hyper::{
    client::HttpConnector,
    header::{CACHE_CONTROL, CONTENT_LENGTH, CONTENT_TYPE, USER_AGENT},
    Body, Method, Request, Uri,
};
use hyper_tls::HttpsConnector;
use reqwest::Client;
use std::{
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::time::timeout;

/// Download progress is logged every 5 MiB
const PROGRESS_STEP_BYTES: u64 = 5 * 1024 * 1024;

pub type HttpsClient = hyper::Client<HttpsConnector<HttpConnector>>;

/// Connection and per-read bounds for one transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferTimeouts {
    pub connect: Duration,
    /// Longest silence tolerated between two reads, and the upper bound
    /// on waiting for response headers after connecting
    pub read: Duration,
}

impl TransferTimeouts {
    pub fn new(connect: Duration, read: Duration) -> Self {
        Self { connect, read }
    }

    /// Upper bound on a whole request/response exchange without a body cap
    pub fn exchange(&self) -> Duration {
        self.connect + self.read
    }
}

impl From<&TransferProfile> for TransferTimeouts {
    fn from(profile: &TransferProfile) -> Self {
        Self::new(profile.connect_timeout, profile.read_timeout)
    }
}

/// One way of performing a timed transfer
#[async_trait]
pub trait ThroughputStrategy: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// Stream `url` until it ends or `cap` elapses; timing starts once
    /// response headers arrive
    async fn download(&self, url: &str, cap: Duration, timeouts: TransferTimeouts) -> Result<ThroughputResult>;

    /// POST `payload` to `url`; timing covers the send through the
    /// arrival of the response status
    async fn upload(&self, url: &str, payload: &[u8], timeouts: TransferTimeouts) -> Result<ThroughputResult>;
}

/// Deterministic filler for upload payloads
pub fn synthetic_payload(size: usize) -> Vec<u8> {
    (0..size).map(|i| (i % 256) as u8).collect()
}

/// Read a body stream until it ends or `cap` elapses.
///
/// Each read is bounded by the smaller of the read timeout and the time left
/// before the cap, so a stalled peer can never hold the loop past the cap.
/// Dropping the stream on return closes the connection.
async fn read_capped<S, B, E>(
    mut body: S,
    cap: Duration,
    read_timeout: Duration,
    logger: &Logger,
    transport: &'static str,
) -> Result<ThroughputResult>
where
    S: Stream<Item = std::result::Result<B, E>> + Unpin,
    B: AsRef<[u8]>,
    AppError: From<E>,
{
    let start = Instant::now();
    let mut total_bytes: u64 = 0;
    let mut next_progress = PROGRESS_STEP_BYTES;

    loop {
        let elapsed = start.elapsed();
        if elapsed >= cap {
            break;
        }

        let wait = read_timeout.min(cap - elapsed);
        match timeout(wait, body.next()).await {
            Ok(Some(Ok(chunk))) => {
                total_bytes += chunk.as_ref().len() as u64;

                if total_bytes >= next_progress {
                    let current = ThroughputResult::from_transfer(total_bytes, start.elapsed());
                    logger
                        .debug("Download progress")
                        .field("transport", transport)
                        .field("megabytes", total_bytes / (1024 * 1024))
                        .field("mbps", format!("{:.2}", current.megabits_per_second))
                        .log()
                        .await;
                    next_progress += PROGRESS_STEP_BYTES;
                }
            }
            Ok(Some(Err(e))) => return Err(AppError::from(e)),
            Ok(None) => break,
            Err(_) if start.elapsed() >= cap => break,
            Err(_) => {
                return Err(AppError::probe_timeout(format!(
                    "No data received for {} ms",
                    read_timeout.as_millis()
                )))
            }
        }
    }

    Ok(ThroughputResult::from_transfer(total_bytes, start.elapsed()))
}

/// reqwest-based transport
#[derive(Clone)]
pub struct PrimaryClient {
    logger: Logger,
}

impl PrimaryClient {
    pub fn new(logger: Logger) -> Self {
        Self { logger }
    }

    fn build_client(&self, timeouts: TransferTimeouts, overall: Option<Duration>) -> Result<Client> {
        let mut builder = Client::builder()
            .connect_timeout(timeouts.connect)
            .user_agent(defaults::USER_AGENT);

        if let Some(overall) = overall {
            builder = builder.timeout(overall);
        }

        builder
            .build()
            .map_err(|e| AppError::config(format!("Failed to create HTTP client: {}", e)))
    }
}

#[async_trait]
impl ThroughputStrategy for PrimaryClient {
    fn name(&self) -> &'static str {
        "primary"
    }

    async fn download(&self, url: &str, cap: Duration, timeouts: TransferTimeouts) -> Result<ThroughputResult> {
        let client = self.build_client(timeouts, None)?;

        let response = timeout(
            timeouts.exchange(),
            client.get(url).header(reqwest::header::CACHE_CONTROL, "no-cache").send(),
        )
        .await
        .map_err(|_| AppError::probe_timeout(format!("No response from {}", url)))??;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::HttpStatus(status.as_u16()));
        }

        read_capped(Box::pin(response.bytes_stream()), cap, timeouts.read, &self.logger, self.name()).await
    }

    async fn upload(&self, url: &str, payload: &[u8], timeouts: TransferTimeouts) -> Result<ThroughputResult> {
        let client = self.build_client(timeouts, Some(timeouts.exchange()))?;

        let start = Instant::now();
        let response = client
            .post(url)
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(payload.to_vec())
            .send()
            .await?;
        let elapsed = start.elapsed();

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::HttpStatus(status.as_u16()));
        }

        Ok(ThroughputResult::from_transfer(payload.len() as u64, elapsed))
    }
}

/// hyper-based transport with its own connector and TLS stack
#[derive(Clone)]
pub struct SecondaryClient {
    logger: Logger,
}

impl SecondaryClient {
    pub fn new(logger: Logger) -> Self {
        Self { logger }
    }

    fn build_client(&self, timeouts: TransferTimeouts) -> HttpsClient {
        let mut http = HttpConnector::new();
        http.enforce_http(false);
        http.set_connect_timeout(Some(timeouts.connect));
        let https = HttpsConnector::new_with_connector(http);
        hyper::Client::builder().build::<_, Body>(https)
    }

    fn parse_uri(url: &str) -> Result<Uri> {
        url.parse::<Uri>()
            .map_err(|e| AppError::parse(format!("Invalid URL '{}': {}", url, e)))
    }
}

#[async_trait]
impl ThroughputStrategy for SecondaryClient {
    fn name(&self) -> &'static str {
        "secondary"
    }

    async fn download(&self, url: &str, cap: Duration, timeouts: TransferTimeouts) -> Result<ThroughputResult> {
        let client = self.build_client(timeouts);

        let request = Request::builder()
            .method(Method::GET)
            .uri(Self::parse_uri(url)?)
            .header(CACHE_CONTROL, "no-cache")
            .header(USER_AGENT, defaults::USER_AGENT)
            .body(Body::empty())
            .map_err(|e| AppError::internal(format!("Failed to build request: {}", e)))?;

        let response = timeout(timeouts.exchange(), client.request(request))
            .await
            .map_err(|_| AppError::probe_timeout(format!("No response from {}", url)))??;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::HttpStatus(status.as_u16()));
        }

        read_capped(response.into_body(), cap, timeouts.read, &self.logger, self.name()).await
    }

    async fn upload(&self, url: &str, payload: &[u8], timeouts: TransferTimeouts) -> Result<ThroughputResult> {
        let client = self.build_client(timeouts);

        let request = Request::builder()
            .method(Method::POST)
            .uri(Self::parse_uri(url)?)
            .header(CONTENT_TYPE, "application/octet-stream")
            .header(CONTENT_LENGTH, payload.len())
            .header(USER_AGENT, defaults::USER_AGENT)
            .body(Body::from(payload.to_vec()))
            .map_err(|e| AppError::internal(format!("Failed to build request: {}", e)))?;

        let start = Instant::now();
        let response = timeout(timeouts.exchange(), client.request(request))
            .await
            .map_err(|_| AppError::probe_timeout(format!("No response from {}", url)))??;
        let elapsed = start.elapsed();

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::HttpStatus(status.as_u16()));
        }

        Ok(ThroughputResult::from_transfer(payload.len() as u64, elapsed))
    }
}

/// Ordered list of transports tried until one measures a non-zero rate.
///
/// Never fails: when every strategy errors or measures zero the result is
/// the zero sentinel.
pub struct FallbackChain {
    strategies: Vec<Arc<dyn ThroughputStrategy>>,
    logger: Logger,
}

impl FallbackChain {
    pub fn new(strategies: Vec<Arc<dyn ThroughputStrategy>>, logger: Logger) -> Self {
        Self { strategies, logger }
    }

    /// Primary then secondary transport
    pub fn standard(logger: Logger) -> Self {
        let strategies: Vec<Arc<dyn ThroughputStrategy>> = vec![
            Arc::new(PrimaryClient::new(logger.child("primary"))),
            Arc::new(SecondaryClient::new(logger.child("secondary"))),
        ];
        Self::new(strategies, logger)
    }

    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    pub async fn download(&self, url: &str, cap: Duration, timeouts: TransferTimeouts) -> ThroughputResult {
        for strategy in &self.strategies {
            let outcome = strategy.download(url, cap, timeouts).await;
            if let Some(result) = self.settle("download", strategy.name(), outcome).await {
                return result;
            }
        }
        ThroughputResult::zero()
    }

    pub async fn upload(&self, url: &str, payload: &[u8], timeouts: TransferTimeouts) -> ThroughputResult {
        for strategy in &self.strategies {
            let outcome = strategy.upload(url, payload, timeouts).await;
            if let Some(result) = self.settle("upload", strategy.name(), outcome).await {
                return result;
            }
        }
        ThroughputResult::zero()
    }

    /// Log one attempt; `Some` when the result ends the chain
    async fn settle(
        &self,
        direction: &str,
        transport: &'static str,
        outcome: Result<ThroughputResult>,
    ) -> Option<ThroughputResult> {
        match outcome {
            Ok(result) if !result.is_zero() => {
                self.logger
                    .info("Transfer measured")
                    .field("direction", direction)
                    .field("transport", transport)
                    .throughput(&result)
                    .log()
                    .await;
                Some(result)
            }
            Ok(result) => {
                let error = AppError::zero_result(format!("{} measured no throughput", transport));
                self.logger
                    .warn("Transfer measured zero, trying next transport")
                    .field("direction", direction)
                    .field("transport", transport)
                    .throughput(&result)
                    .error_info(&error)
                    .log()
                    .await;
                None
            }
            Err(error) => {
                self.logger
                    .warn("Transfer failed, trying next transport")
                    .field("direction", direction)
                    .field("transport", transport)
                    .error_info(&error)
                    .log()
                    .await;
                None
            }
        }
    }
}
