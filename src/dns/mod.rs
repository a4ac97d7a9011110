//! Host name resolution for reachability probes and the connectivity precondition

use crate::error::{AppError, Result};
use std::{
    net::{IpAddr, SocketAddr},
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::RwLock;
use trust_dns_resolver::{system_conf, TokioAsyncResolver};

/// Resolves host names through the system DNS configuration.
///
/// IP literals bypass DNS entirely. When the system configuration cannot be
/// read (containers, sandboxes) resolution falls back to the OS resolver.
#[derive(Clone, Default)]
pub struct HostResolver {
    system_resolver: Arc<RwLock<Option<TokioAsyncResolver>>>,
}

/// Outcome of a timed lookup
#[derive(Debug, Clone)]
pub struct LookupOutcome {
    pub host: String,
    pub addresses: Vec<IpAddr>,
    pub duration: Duration,
}

impl HostResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Initialize the system DNS resolver
    pub async fn initialize_system_resolver(&self) -> Result<()> {
        let (config, opts) = system_conf::read_system_conf()
            .map_err(|e| AppError::config(format!("Failed to read system DNS config: {}", e)))?;

        let resolver = TokioAsyncResolver::tokio(config, opts);

        let mut system_resolver = self.system_resolver.write().await;
        *system_resolver = Some(resolver);

        Ok(())
    }

    /// Resolve a host to its addresses
    pub async fn resolve(&self, host: &str) -> Result<Vec<IpAddr>> {
        let host = host.trim().trim_matches(|c| c == '[' || c == ']');
        if host.is_empty() {
            return Err(AppError::validation("Cannot resolve an empty host"));
        }

        if let Ok(ip) = host.parse::<IpAddr>() {
            return Ok(vec![ip]);
        }

        if self.system_resolver.read().await.is_none() {
            // Best effort; the OS fallback below still works without it
            let _ = self.initialize_system_resolver().await;
        }

        let system_resolver = self.system_resolver.read().await;
        if let Some(resolver) = system_resolver.as_ref() {
            if let Ok(response) = resolver.lookup_ip(host).await {
                let ips: Vec<IpAddr> = response.iter().collect();
                if !ips.is_empty() {
                    return Ok(ips);
                }
            }
        }
        drop(system_resolver);

        self.resolve_with_os(host).await
    }

    /// Resolve a host and pair every address with `port`
    pub async fn resolve_socket_addrs(&self, host: &str, port: u16) -> Result<Vec<SocketAddr>> {
        let ips = self.resolve(host).await?;
        Ok(ips.into_iter().map(|ip| SocketAddr::new(ip, port)).collect())
    }

    /// Resolve with an upper bound on the total lookup time
    pub async fn lookup_with_timeout(&self, host: &str, timeout: Duration) -> Result<LookupOutcome> {
        let start = Instant::now();
        let addresses = tokio::time::timeout(timeout, self.resolve(host))
            .await
            .map_err(|_| AppError::probe_timeout(format!("DNS lookup for {} timed out after {:?}", host, timeout)))??;

        Ok(LookupOutcome {
            host: host.to_string(),
            addresses,
            duration: start.elapsed(),
        })
    }

    async fn resolve_with_os(&self, host: &str) -> Result<Vec<IpAddr>> {
        let addrs = tokio::net::lookup_host((host, 0))
            .await
            .map_err(|e| AppError::transport_failure(format!("DNS lookup failed for {}: {}", host, e)))?;

        let mut ips: Vec<IpAddr> = Vec::new();
        for addr in addrs {
            if !ips.contains(&addr.ip()) {
                ips.push(addr.ip());
            }
        }

        if ips.is_empty() {
            return Err(AppError::transport_failure(format!("No addresses found for {}", host)));
        }

        Ok(ips)
    }
}
