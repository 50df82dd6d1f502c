//! Monitoring-indicator probe.
//!
//! Counts two kinds of indicators: names that monitoring and parental
//! control software tend to define in the global registry, and built-in
//! bindings that were replaced after startup (the usual way such software
//! intercepts logging and network calls).

use crate::capabilities::{ArcHost, Builtin};
use crate::core::{Probe, ProbeError, ProbeKind, ProbeResult, Status};

use async_trait::async_trait;
use serde::Serialize;

/// Monitoring probe configuration.
#[derive(Debug, Clone)]
pub struct MonitoringProbeConfig {
    /// Global names to look up, case-sensitive.
    pub suspicious_globals: Vec<String>,

    /// Built-ins whose bindings are checked for replacement.
    pub builtins: Vec<Builtin>,
}

impl Default for MonitoringProbeConfig {
    fn default() -> Self {
        Self {
            suspicious_globals: [
                "parentalControl",
                "monitoring",
                "filter",
                "blocker",
                "guardian",
                "supervisor",
                "watcher",
                "tracker",
            ]
            .iter()
            .map(|name| name.to_string())
            .collect(),
            builtins: Builtin::ALL.to_vec(),
        }
    }
}

impl MonitoringProbeConfig {
    /// Creates a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a global name to look up.
    pub fn with_suspicious_global(mut self, name: impl Into<String>) -> Self {
        self.suspicious_globals.push(name.into());
        self
    }

    /// Replaces the list of checked built-ins.
    pub fn with_builtins(mut self, builtins: impl IntoIterator<Item = Builtin>) -> Self {
        self.builtins = builtins.into_iter().collect();
        self
    }
}

/// Indicators found by the probe.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitoringIndicators {
    /// Suspicious globals that are defined.
    pub suspicious_globals: Vec<String>,
    /// Always empty; listener enumeration is not possible from outside the host.
    pub event_listeners: Vec<String>,
    /// Built-ins whose binding changed since startup.
    pub modified_objects: Vec<String>,
}

impl MonitoringIndicators {
    /// Combined indicator count.
    pub fn total(&self) -> usize {
        self.suspicious_globals.len() + self.modified_objects.len()
    }
}

/// Maps the combined indicator count to a verdict.
pub fn classify(indicators: usize) -> Status {
    match indicators {
        0 => Status::Safe,
        1 | 2 => Status::Warning,
        _ => Status::Danger,
    }
}

/// Monitoring software probe.
#[derive(Debug)]
pub struct MonitoringProbe {
    config: MonitoringProbeConfig,
    host: ArcHost,
}

impl MonitoringProbe {
    /// Creates the probe with default configuration.
    pub fn new(host: ArcHost) -> Self {
        Self::with_config(host, MonitoringProbeConfig::default())
    }

    /// Creates the probe with the given configuration.
    pub fn with_config(host: ArcHost, config: MonitoringProbeConfig) -> Self {
        Self { config, host }
    }

    fn collect(&self) -> Result<MonitoringIndicators, ProbeError> {
        let mut indicators = MonitoringIndicators::default();

        for name in &self.config.suspicious_globals {
            if self.host.is_global_defined(name)? {
                indicators.suspicious_globals.push(name.clone());
            }
        }

        for builtin in &self.config.builtins {
            if self.host.builtin_binding(*builtin)?.is_modified() {
                tracing::debug!(builtin = %builtin, "Built-in binding replaced");
                indicators.modified_objects.push(builtin.name().to_string());
            }
        }

        Ok(indicators)
    }

    fn run(&self) -> Result<ProbeResult, ProbeError> {
        let indicators = self.collect()?;
        let status = classify(indicators.total());

        tracing::info!(
            probe = "monitoring",
            status = %status,
            suspicious_globals = indicators.suspicious_globals.len(),
            modified_objects = indicators.modified_objects.len(),
            "Monitoring probe finished"
        );

        let details = serde_json::to_value(&indicators)
            .map_err(|e| ProbeError::internal(e.to_string()))?;
        Ok(ProbeResult::verdict(ProbeKind::Monitoring, status, details))
    }
}

#[async_trait]
impl Probe for MonitoringProbe {
    fn kind(&self) -> ProbeKind {
        ProbeKind::Monitoring
    }

    async fn check(&self) -> Result<ProbeResult, ProbeError> {
        Ok(self.run().unwrap_or_else(|e| {
            tracing::warn!(probe = "monitoring", error = %e, "Monitoring probe failed");
            ProbeResult::failed(ProbeKind::Monitoring.failure_message(), &e)
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::HostSnapshot;
    use std::sync::Arc;

    async fn check(host: HostSnapshot) -> ProbeResult {
        MonitoringProbe::new(Arc::new(host)).check().await.unwrap()
    }

    #[test]
    fn test_classify() {
        assert_eq!(classify(0), Status::Safe);
        assert_eq!(classify(1), Status::Warning);
        assert_eq!(classify(2), Status::Warning);
        assert_eq!(classify(3), Status::Danger);
        assert_eq!(classify(11), Status::Danger);
    }

    #[tokio::test]
    async fn test_clean_host_is_safe() {
        let result = check(HostSnapshot::new()).await;

        assert_eq!(result.status, Status::Safe);
        assert!(result.details["suspiciousGlobals"].as_array().unwrap().is_empty());
        assert!(result.details["modifiedObjects"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_single_indicator_is_warning() {
        let result = check(HostSnapshot::new().with_global("guardian")).await;

        assert_eq!(result.status, Status::Warning);
        assert_eq!(result.details["suspiciousGlobals"][0], "guardian");
    }

    #[tokio::test]
    async fn test_globals_are_case_sensitive() {
        let result = check(HostSnapshot::new().with_global("Guardian")).await;
        assert_eq!(result.status, Status::Safe);
    }

    #[tokio::test]
    async fn test_three_combined_indicators_is_danger() {
        let host = HostSnapshot::new()
            .with_global("tracker")
            .with_patched_builtin(Builtin::Console)
            .with_patched_builtin(Builtin::Fetch);
        let result = check(host).await;

        assert_eq!(result.status, Status::Danger);
        assert_eq!(result.details["modifiedObjects"][0], "console");
        assert_eq!(result.details["modifiedObjects"][1], "fetch");
    }

    #[tokio::test]
    async fn test_patched_request_primitive_is_reported_by_name() {
        let result = check(HostSnapshot::new().with_patched_builtin(Builtin::HttpRequest)).await;

        assert_eq!(result.status, Status::Warning);
        assert_eq!(result.details["modifiedObjects"][0], "XMLHttpRequest");
    }

    #[tokio::test]
    async fn test_unreadable_registry_is_warning() {
        let result = check(HostSnapshot::new().without_global_registry()).await;

        assert_eq!(result.status, Status::Warning);
        assert_eq!(result.message, "Unable to check for monitoring software");
        assert!(!result.error().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_builtin_is_warning() {
        let result = check(HostSnapshot::new().without_builtin(Builtin::Fetch)).await;
        assert_eq!(result.status, Status::Warning);
    }
}
