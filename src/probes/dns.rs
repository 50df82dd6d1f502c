//! DNS accessibility probe.
//!
//! Contacts a few well-known public resolvers over HTTPS. A network that
//! forces its own resolver tends to block some or all of them.

use crate::capabilities::ArcReachability;
use crate::core::{Probe, ProbeError, ProbeKind, ProbeResult, Status};

use async_trait::async_trait;
use futures::future::join_all;
use serde::Serialize;

/// DNS probe configuration.
#[derive(Debug, Clone)]
pub struct DnsProbeConfig {
    /// Resolver addresses, contacted as `https://<address>`.
    pub servers: Vec<String>,
}

impl Default for DnsProbeConfig {
    fn default() -> Self {
        Self {
            servers: vec![
                "1.1.1.1".to_string(), // Cloudflare
                "8.8.8.8".to_string(), // Google
                "9.9.9.9".to_string(), // Quad9
            ],
        }
    }
}

impl DnsProbeConfig {
    /// Creates a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the resolver list.
    pub fn with_servers<I, S>(mut self, servers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.servers = servers.into_iter().map(Into::into).collect();
        self
    }
}

/// Reachability of one resolver.
#[derive(Debug, Clone, Serialize)]
pub struct ResolverCheck {
    /// Resolver address.
    pub server: String,
    /// Latency in milliseconds, `None` when unreachable.
    pub time: Option<f64>,
    /// Whether the resolver answered.
    pub accessible: bool,
}

/// Maps the number of unreachable resolvers to a verdict.
pub fn classify(unreachable: usize, total: usize) -> Status {
    if unreachable == 0 {
        Status::Safe
    } else if unreachable < total {
        // mixed reachability suggests selective filtering
        Status::Warning
    } else {
        Status::Danger
    }
}

/// Public resolver reachability probe.
#[derive(Debug)]
pub struct DnsProbe {
    config: DnsProbeConfig,
    reachability: ArcReachability,
}

impl DnsProbe {
    /// Creates the probe with default resolvers.
    pub fn new(reachability: ArcReachability) -> Self {
        Self::with_config(reachability, DnsProbeConfig::default())
    }

    /// Creates the probe with the given configuration.
    pub fn with_config(reachability: ArcReachability, config: DnsProbeConfig) -> Self {
        Self {
            config,
            reachability,
        }
    }

    async fn run(&self) -> Result<ProbeResult, ProbeError> {
        let attempts = self.config.servers.iter().map(|server| async move {
            let url = format!("https://{}", server);
            (server, self.reachability.reach(&url).await)
        });

        let mut checks = Vec::with_capacity(self.config.servers.len());
        for (server, outcome) in join_all(attempts).await {
            let check = match outcome {
                Ok(latency) => ResolverCheck {
                    server: server.clone(),
                    time: Some(latency.as_micros() as f64 / 1000.0),
                    accessible: true,
                },
                // no fetch primitive at all: the whole probe is inconclusive
                Err(e) if e.is_capability_failure() => return Err(e),
                Err(e) => {
                    tracing::debug!(server = %server, error = %e, "Resolver unreachable");
                    ResolverCheck {
                        server: server.clone(),
                        time: None,
                        accessible: false,
                    }
                }
            };
            checks.push(check);
        }

        let unreachable = checks.iter().filter(|c| !c.accessible).count();
        let status = classify(unreachable, checks.len());

        tracing::info!(
            probe = "dns",
            status = %status,
            unreachable,
            total = checks.len(),
            "DNS probe finished"
        );

        let details = serde_json::to_value(&checks)
            .map_err(|e| ProbeError::internal(e.to_string()))?;
        Ok(ProbeResult::verdict(ProbeKind::Dns, status, details))
    }
}

#[async_trait]
impl Probe for DnsProbe {
    fn kind(&self) -> ProbeKind {
        ProbeKind::Dns
    }

    async fn check(&self) -> Result<ProbeResult, ProbeError> {
        Ok(self.run().await.unwrap_or_else(|e| {
            tracing::warn!(probe = "dns", error = %e, "DNS probe failed");
            ProbeResult::failed(ProbeKind::Dns.failure_message(), &e)
        }))
    }
}
