//! Browser fingerprint probe.

use crate::capabilities::{ArcHost, NavigatorInfo};
use crate::core::{Probe, ProbeError, ProbeKind, ProbeResult, Status};

use async_trait::async_trait;
use serde_json::json;

/// Substrings that mark a plugin as a filtering or monitoring add-on.
const SUSPICIOUS_PLUGIN_KEYWORDS: [&str; 4] = ["parental", "filter", "monitor", "control"];

/// Globals left behind by headless automation frameworks.
const AUTOMATION_GLOBALS: [&str; 2] = ["callPhantom", "_phantom"];

/// More plugins than this is unusual enough to warn about.
const PLUGIN_COUNT_THRESHOLD: usize = 10;

/// Returns plugins whose names contain a suspicious keyword, ignoring case.
pub fn suspicious_plugins(plugins: &[String]) -> Vec<String> {
    plugins
        .iter()
        .filter(|name| {
            let lowered = name.to_lowercase();
            SUSPICIOUS_PLUGIN_KEYWORDS
                .iter()
                .any(|keyword| lowered.contains(keyword))
        })
        .cloned()
        .collect()
}

/// Browser fingerprint and automation probe.
#[derive(Debug)]
pub struct BrowserProbe {
    host: ArcHost,
}

impl BrowserProbe {
    /// Creates the probe.
    pub fn new(host: ArcHost) -> Self {
        Self { host }
    }

    fn is_automated(&self, navigator: &NavigatorInfo) -> Result<bool, ProbeError> {
        if navigator.webdriver {
            return Ok(true);
        }
        for name in AUTOMATION_GLOBALS {
            if self.host.is_global_defined(name)? {
                tracing::debug!(global = name, "Automation marker found");
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn run(&self) -> Result<ProbeResult, ProbeError> {
        let navigator = self.host.navigator()?;
        let suspicious = suspicious_plugins(&navigator.plugins);
        let is_automated = self.is_automated(&navigator)?;
        let plugin_count = navigator.plugins.len();

        let (status, details) = if !suspicious.is_empty() || is_automated {
            (
                Status::Danger,
                json!({
                    "suspiciousPlugins": suspicious,
                    "isAutomated": is_automated,
                    "browserInfo": navigator,
                }),
            )
        } else if plugin_count > PLUGIN_COUNT_THRESHOLD {
            (
                Status::Warning,
                json!({ "pluginCount": plugin_count, "browserInfo": navigator }),
            )
        } else {
            let info = serde_json::to_value(&navigator)
                .map_err(|e| ProbeError::internal(e.to_string()))?;
            (Status::Safe, info)
        };

        tracing::info!(
            probe = "browser",
            status = %status,
            plugin_count,
            suspicious = suspicious.len(),
            is_automated,
            "Browser probe finished"
        );

        Ok(ProbeResult::verdict(ProbeKind::Browser, status, details))
    }
}

#[async_trait]
impl Probe for BrowserProbe {
    fn kind(&self) -> ProbeKind {
        ProbeKind::Browser
    }

    async fn check(&self) -> Result<ProbeResult, ProbeError> {
        Ok(self.run().unwrap_or_else(|e| {
            tracing::warn!(probe = "browser", error = %e, "Browser probe failed");
            ProbeResult::failed(ProbeKind::Browser.failure_message(), &e)
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::HostSnapshot;
    use std::sync::Arc;

    fn navigator() -> NavigatorInfo {
        NavigatorInfo::new("Mozilla/5.0 (X11; Linux x86_64)")
            .with_language("en-US")
            .with_plugin("PDF Viewer")
    }

    async fn check(host: HostSnapshot) -> ProbeResult {
        BrowserProbe::new(Arc::new(host)).check().await.unwrap()
    }

    #[test]
    fn test_suspicious_plugins() {
        let plugins = vec![
            "PDF Viewer".to_string(),
            "Family PARENTAL Guard".to_string(),
            "Web Filter Pro".to_string(),
            "Remote Control Helper".to_string(),
        ];
        assert_eq!(suspicious_plugins(&plugins).len(), 3);
    }

    #[tokio::test]
    async fn test_plain_browser_is_safe() {
        let result = check(HostSnapshot::new().with_navigator(navigator())).await;

        assert_eq!(result.status, Status::Safe);
        assert_eq!(result.details["userAgent"], "Mozilla/5.0 (X11; Linux x86_64)");
        assert_eq!(result.details["plugins"][0], "PDF Viewer");
    }

    #[tokio::test]
    async fn test_monitoring_plugin_is_danger() {
        let host = HostSnapshot::new().with_navigator(navigator().with_plugin("NetMonitor"));
        let result = check(host).await;

        assert_eq!(result.status, Status::Danger);
        assert_eq!(result.details["suspiciousPlugins"][0], "NetMonitor");
        assert_eq!(result.details["isAutomated"], false);
    }

    #[tokio::test]
    async fn test_webdriver_is_danger() {
        let host = HostSnapshot::new().with_navigator(navigator().with_webdriver(true));
        let result = check(host).await;

        assert_eq!(result.status, Status::Danger);
        assert_eq!(result.details["isAutomated"], true);
    }

    #[tokio::test]
    async fn test_phantom_global_is_danger() {
        let host = HostSnapshot::new()
            .with_navigator(navigator())
            .with_global("_phantom");
        assert_eq!(check(host).await.status, Status::Danger);
    }

    #[tokio::test]
    async fn test_plugin_count_boundary() {
        let mut nav = NavigatorInfo::new("agent");
        for i in 0..10 {
            nav = nav.with_plugin(format!("Plugin {}", i));
        }
        let result = check(HostSnapshot::new().with_navigator(nav.clone())).await;
        assert_eq!(result.status, Status::Safe);

        let result = check(HostSnapshot::new().with_navigator(nav.with_plugin("Plugin 10"))).await;
        assert_eq!(result.status, Status::Warning);
        assert_eq!(result.details["pluginCount"], 11);
    }

    #[tokio::test]
    async fn test_missing_navigator_is_warning() {
        let result = check(HostSnapshot::new()).await;

        assert_eq!(result.status, Status::Warning);
        assert_eq!(result.message, "Unable to check browser settings");
        assert!(!result.error().unwrap().is_empty());
    }
}
