//! Proxy and WebRTC-leak probe.
//!
//! Two independent signals: transport headers that only a proxy adds, and
//! a peer-connection handshake that reveals no address at all.

use crate::capabilities::{ArcHeaderEcho, ArcPeerConnector};
use crate::core::{Probe, ProbeError, ProbeKind, ProbeResult, Status};
use crate::probes::handshake::{discover_addresses, HandshakeResult};

use async_trait::async_trait;
use serde_json::json;
use std::collections::HashMap;
use std::time::Duration;

/// Proxy probe configuration.
#[derive(Debug, Clone)]
pub struct ProxyProbeConfig {
    /// JSON endpoint that echoes request headers.
    pub header_echo_url: String,

    /// Header names that indicate an intermediary.
    pub proxy_headers: Vec<String>,

    /// How long candidate gathering may run.
    pub handshake_window: Duration,
}

impl Default for ProxyProbeConfig {
    fn default() -> Self {
        Self {
            header_echo_url: "https://httpbin.org/headers".to_string(),
            proxy_headers: [
                "X-Forwarded-For",
                "X-Real-IP",
                "X-Proxy-Authorization",
                "Via",
                "Forwarded",
            ]
            .iter()
            .map(|h| h.to_string())
            .collect(),
            handshake_window: Duration::from_secs(3),
        }
    }
}

impl ProxyProbeConfig {
    /// Creates a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the header echo endpoint.
    pub fn with_header_echo_url(mut self, url: impl Into<String>) -> Self {
        self.header_echo_url = url.into();
        self
    }

    /// Adds a header name to look for.
    pub fn with_proxy_header(mut self, name: impl Into<String>) -> Self {
        self.proxy_headers.push(name.into());
        self
    }

    /// Sets the candidate gathering window.
    pub fn with_handshake_window(mut self, window: Duration) -> Self {
        self.handshake_window = window;
        self
    }
}

/// Returns the configured proxy headers present in `headers`.
///
/// Names compare case-insensitively; an empty value does not count.
pub fn find_proxy_headers(proxy_headers: &[String], headers: &HashMap<String, String>) -> Vec<String> {
    proxy_headers
        .iter()
        .filter(|wanted| {
            headers
                .iter()
                .any(|(name, value)| name.eq_ignore_ascii_case(wanted) && !value.is_empty())
        })
        .cloned()
        .collect()
}

/// Forced-proxy probe.
#[derive(Debug)]
pub struct ProxyProbe {
    config: ProxyProbeConfig,
    echo: ArcHeaderEcho,
    connector: ArcPeerConnector,
}

impl ProxyProbe {
    /// Creates the probe with default configuration.
    pub fn new(echo: ArcHeaderEcho, connector: ArcPeerConnector) -> Self {
        Self::with_config(echo, connector, ProxyProbeConfig::default())
    }

    /// Creates the probe with the given configuration.
    pub fn with_config(
        echo: ArcHeaderEcho,
        connector: ArcPeerConnector,
        config: ProxyProbeConfig,
    ) -> Self {
        Self {
            config,
            echo,
            connector,
        }
    }

    async fn run(&self) -> Result<ProbeResult, ProbeError> {
        let webrtc: HandshakeResult =
            discover_addresses(self.connector.as_ref(), self.config.handshake_window).await;
        tracing::debug!(
            has_proxy = webrtc.has_proxy,
            addresses = webrtc.ips.len(),
            "Handshake finished"
        );

        let headers = self.echo.echo_headers(&self.config.header_echo_url).await?;
        let found = find_proxy_headers(&self.config.proxy_headers, &headers);

        let (status, details) = if !found.is_empty() || webrtc.has_proxy {
            (
                Status::Danger,
                json!({ "proxyHeaders": found, "webrtc": webrtc }),
            )
        } else {
            (Status::Safe, json!({ "headers": headers, "webrtc": webrtc }))
        };

        tracing::info!(
            probe = "proxy",
            status = %status,
            proxy_headers = found.len(),
            "Proxy probe finished"
        );

        Ok(ProbeResult::verdict(ProbeKind::Proxy, status, details))
    }
}

#[async_trait]
impl Probe for ProxyProbe {
    fn kind(&self) -> ProbeKind {
        ProbeKind::Proxy
    }

    async fn check(&self) -> Result<ProbeResult, ProbeError> {
        Ok(self.run().await.unwrap_or_else(|e| {
            tracing::warn!(probe = "proxy", error = %e, "Proxy probe failed");
            ProbeResult::failed(ProbeKind::Proxy.failure_message(), &e)
        }))
    }
}
