//! The heuristic probes.
//!
//! Each probe is a leaf: it performs its own I/O through the injected
//! capabilities and reduces the signals it sees to a single verdict.
//!
//! ## Available Probes
//!
//! - [`dns`] - public resolver reachability
//! - [`proxy`] - proxy headers and WebRTC address discovery
//! - [`browser`] - plugins and automation flags
//! - [`network`] - popular site reachability and latency
//! - [`security`] - transport and storage checklist
//! - [`monitoring`] - suspicious globals and replaced built-ins
//! - [`mock`] - a configurable probe for tests
//!
//! [`standard_set`] builds all six in execution order.

pub mod browser;
pub mod dns;
pub mod handshake;
pub mod mock;
pub mod monitoring;
pub mod network;
pub mod proxy;
pub mod security;

pub use browser::BrowserProbe;
pub use dns::{DnsProbe, DnsProbeConfig};
pub use handshake::{discover_addresses, HandshakeResult};
pub use mock::MockProbe;
pub use monitoring::{MonitoringProbe, MonitoringProbeConfig};
pub use network::{NetworkProbe, NetworkProbeConfig};
pub use proxy::{ProxyProbe, ProxyProbeConfig};
pub use security::SecurityProbe;

use crate::capabilities::Capabilities;
use crate::core::ArcProbe;
use std::sync::Arc;

/// Configuration of the standard probe set.
#[derive(Debug, Clone, Default)]
pub struct ProbeSettings {
    /// DNS probe configuration.
    pub dns: DnsProbeConfig,
    /// Proxy probe configuration.
    pub proxy: ProxyProbeConfig,
    /// Network probe configuration.
    pub network: NetworkProbeConfig,
    /// Monitoring probe configuration.
    pub monitoring: MonitoringProbeConfig,
}

impl ProbeSettings {
    /// Creates settings with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the DNS probe configuration.
    pub fn with_dns(mut self, config: DnsProbeConfig) -> Self {
        self.dns = config;
        self
    }

    /// Sets the proxy probe configuration.
    pub fn with_proxy(mut self, config: ProxyProbeConfig) -> Self {
        self.proxy = config;
        self
    }

    /// Sets the network probe configuration.
    pub fn with_network(mut self, config: NetworkProbeConfig) -> Self {
        self.network = config;
        self
    }

    /// Sets the monitoring probe configuration.
    pub fn with_monitoring(mut self, config: MonitoringProbeConfig) -> Self {
        self.monitoring = config;
        self
    }
}

/// Builds the six standard probes in execution order.
pub fn standard_set(caps: &Capabilities, settings: &ProbeSettings) -> Vec<ArcProbe> {
    vec![
        Arc::new(DnsProbe::with_config(
            Arc::clone(&caps.reachability),
            settings.dns.clone(),
        )),
        Arc::new(ProxyProbe::with_config(
            Arc::clone(&caps.header_echo),
            Arc::clone(&caps.peer_connector),
            settings.proxy.clone(),
        )),
        Arc::new(BrowserProbe::new(Arc::clone(&caps.host))),
        Arc::new(NetworkProbe::with_config(
            Arc::clone(&caps.reachability),
            settings.network.clone(),
        )),
        Arc::new(SecurityProbe::new(Arc::clone(&caps.host))),
        Arc::new(MonitoringProbe::with_config(
            Arc::clone(&caps.host),
            settings.monitoring.clone(),
        )),
    ]
}
