//! Network reachability probe.
//!
//! Visits a list of popular sites one after another. A single blocked site
//! is enough for a `danger` verdict; otherwise a slow mean latency hints at
//! throttling or an inspecting middlebox.

use crate::capabilities::ArcReachability;
use crate::core::{Probe, ProbeError, ProbeKind, ProbeResult, Status};

use async_trait::async_trait;
use serde::Serialize;
use serde_json::json;
use std::time::Duration;

/// Network probe configuration.
#[derive(Debug, Clone)]
pub struct NetworkProbeConfig {
    /// Sites to contact, in order.
    pub sites: Vec<String>,

    /// Mean latency above which the network counts as slow.
    pub slow_threshold: Duration,
}

impl Default for NetworkProbeConfig {
    fn default() -> Self {
        Self {
            sites: vec![
                "https://www.google.com".to_string(),
                "https://www.facebook.com".to_string(),
                "https://www.youtube.com".to_string(),
                "https://www.twitter.com".to_string(),
            ],
            slow_threshold: Duration::from_millis(3000),
        }
    }
}

impl NetworkProbeConfig {
    /// Creates a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the site list.
    pub fn with_sites<I, S>(mut self, sites: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sites = sites.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the slow-network threshold.
    pub fn with_slow_threshold(mut self, threshold: Duration) -> Self {
        self.slow_threshold = threshold;
        self
    }
}

/// Outcome of contacting one site.
#[derive(Debug, Clone, Serialize)]
pub struct SiteCheck {
    /// Site URL.
    pub site: String,
    /// Latency in milliseconds, `None` when blocked.
    pub time: Option<f64>,
    /// Whether the site answered.
    pub accessible: bool,
    /// Whether the site is considered blocked.
    pub blocked: bool,
    /// Failure text for blocked sites.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

fn millis(duration: Duration) -> f64 {
    duration.as_micros() as f64 / 1000.0
}

/// Mean latency in milliseconds over the reachable sites.
///
/// Returns `None` when no site was reachable.
pub fn mean_latency(checks: &[SiteCheck]) -> Option<f64> {
    let times: Vec<f64> = checks.iter().filter_map(|c| c.time).collect();
    if times.is_empty() {
        return None;
    }
    Some(times.iter().sum::<f64>() / times.len() as f64)
}

/// Site reachability probe.
#[derive(Debug)]
pub struct NetworkProbe {
    config: NetworkProbeConfig,
    reachability: ArcReachability,
}

impl NetworkProbe {
    /// Creates the probe with default sites.
    pub fn new(reachability: ArcReachability) -> Self {
        Self::with_config(reachability, NetworkProbeConfig::default())
    }

    /// Creates the probe with the given configuration.
    pub fn with_config(reachability: ArcReachability, config: NetworkProbeConfig) -> Self {
        Self {
            config,
            reachability,
        }
    }

    async fn run(&self) -> Result<ProbeResult, ProbeError> {
        let mut checks = Vec::with_capacity(self.config.sites.len());

        for site in &self.config.sites {
            let check = match self.reachability.reach(site).await {
                Ok(latency) => {
                    tracing::debug!(site = %site, latency_ms = millis(latency), "Site reachable");
                    SiteCheck {
                        site: site.clone(),
                        time: Some(millis(latency)),
                        accessible: true,
                        blocked: false,
                        error: None,
                    }
                }
                Err(e) if e.is_capability_failure() => return Err(e),
                Err(e) => {
                    tracing::debug!(site = %site, error = %e, "Site blocked");
                    SiteCheck {
                        site: site.clone(),
                        time: None,
                        accessible: false,
                        blocked: true,
                        error: Some(e.to_string()),
                    }
                }
            };
            checks.push(check);
        }

        let blocked_sites = checks.iter().filter(|c| c.blocked).count();
        let threshold = millis(self.config.slow_threshold);

        let (status, details) = if blocked_sites > 0 {
            // avgTime stays null when every site is blocked
            let avg_time = mean_latency(&checks);
            (
                Status::Danger,
                json!({ "blockedSites": blocked_sites, "avgTime": avg_time, "results": checks }),
            )
        } else {
            // an empty site list has no mean and counts as fast
            let avg_time = mean_latency(&checks).unwrap_or(0.0);
            let status = if avg_time > threshold {
                Status::Warning
            } else {
                Status::Safe
            };
            (status, json!({ "avgTime": avg_time, "results": checks }))
        };

        tracing::info!(
            probe = "network",
            status = %status,
            blocked_sites,
            total = checks.len(),
            "Network probe finished"
        );

        Ok(ProbeResult::verdict(ProbeKind::Network, status, details))
    }
}

#[async_trait]
impl Probe for NetworkProbe {
    fn kind(&self) -> ProbeKind {
        ProbeKind::Network
    }

    async fn check(&self) -> Result<ProbeResult, ProbeError> {
        Ok(self.run().await.unwrap_or_else(|e| {
            tracing::warn!(probe = "network", error = %e, "Network probe failed");
            ProbeResult::failed(ProbeKind::Network.failure_message(), &e)
        }))
    }
}
