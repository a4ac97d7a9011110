//! Reachability probe implementations

use crate::{
    defaults,
    dns::HostResolver,
    error::{AppError, Result},
    types::ProbeTarget,
};
use async_trait::async_trait;
use reqwest::Client;
use std::time::{Duration, Instant};
use tokio::net::TcpStream;

/// A single "is this host answering" check
#[async_trait]
pub trait ReachabilityProbe: Send + Sync {
    /// Perform one check and return the elapsed time until the host answered.
    ///
    /// The caller bounds the call with its own timeout; implementations only
    /// report failure when the host definitively did not answer.
    async fn probe(&self, target: &ProbeTarget) -> Result<Duration>;

    /// Short name used in logs
    fn name(&self) -> &'static str;
}

/// Resolves the host and opens a TCP connection to it.
///
/// The measured time includes name resolution, like a resolver-backed ping.
#[derive(Clone)]
pub struct TcpConnectProbe {
    resolver: HostResolver,
    port: u16,
}

impl TcpConnectProbe {
    pub fn new(port: u16) -> Self {
        Self {
            resolver: HostResolver::new(),
            port,
        }
    }

    pub fn port(&self) -> u16 {
        self.port
    }
}

#[async_trait]
impl ReachabilityProbe for TcpConnectProbe {
    async fn probe(&self, target: &ProbeTarget) -> Result<Duration> {
        let start = Instant::now();
        let addrs = self.resolver.resolve_socket_addrs(&target.hostname, self.port).await?;

        let mut last_error = None;
        for addr in addrs {
            match TcpStream::connect(addr).await {
                Ok(_stream) => return Ok(start.elapsed()),
                Err(e) => last_error = Some(e),
            }
        }

        Err(match last_error {
            Some(e) => AppError::from(e),
            None => AppError::transport_failure(format!("No addresses to connect to for {}", target.hostname)),
        })
    }

    fn name(&self) -> &'static str {
        "tcp-connect"
    }
}

/// Issues an HTTP HEAD request; any status code counts as an answer
#[derive(Clone)]
pub struct HttpHeadProbe {
    client: Client,
}

impl HttpHeadProbe {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .user_agent(defaults::USER_AGENT)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| AppError::config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client })
    }

    fn url_for(target: &ProbeTarget) -> String {
        match &target.url {
            Some(url) => url.clone(),
            None => format!("https://{}/", target.hostname),
        }
    }
}

#[async_trait]
impl ReachabilityProbe for HttpHeadProbe {
    async fn probe(&self, target: &ProbeTarget) -> Result<Duration> {
        let start = Instant::now();
        self.client.head(Self::url_for(target)).send().await?;
        Ok(start.elapsed())
    }

    fn name(&self) -> &'static str {
        "http-head"
    }
}
