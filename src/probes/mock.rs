//! Mock probe for testing.
//!
//! A configurable probe that can stand in for any [`ProbeKind`] and
//! simulate each way a probe can end: a verdict, an error that escaped the
//! probe's own recovery, or a panic.

use crate::core::{Probe, ProbeError, ProbeKind, ProbeResult, Status};

use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

#[derive(Debug, Clone)]
enum Behavior {
    Verdict(Status),
    Fail(String),
    Panic(String),
}

/// A mock probe for testing purposes.
///
/// # Examples
///
/// ```rust
/// use privacyscan::probes::MockProbe;
/// use privacyscan::core::{ProbeKind, Status};
/// use std::time::Duration;
///
/// let probe = MockProbe::new(ProbeKind::Dns)
///     .with_status(Status::Danger)
///     .with_latency(Duration::from_millis(50));
///
/// let broken = MockProbe::failing(ProbeKind::Proxy, "socket closed");
/// ```
#[derive(Debug)]
pub struct MockProbe {
    kind: ProbeKind,
    name: Option<String>,
    behavior: Behavior,
    latency: Option<Duration>,
    check_count: AtomicU64,
}

impl MockProbe {
    /// Creates a mock that reports `safe`.
    pub fn new(kind: ProbeKind) -> Self {
        Self {
            kind,
            name: None,
            behavior: Behavior::Verdict(Status::Safe),
            latency: None,
            check_count: AtomicU64::new(0),
        }
    }

    /// Creates a mock whose check returns an error.
    pub fn failing(kind: ProbeKind, message: impl Into<String>) -> Self {
        Self {
            behavior: Behavior::Fail(message.into()),
            ..Self::new(kind)
        }
    }

    /// Creates a mock whose check panics.
    pub fn panicking(kind: ProbeKind, message: impl Into<String>) -> Self {
        Self {
            behavior: Behavior::Panic(message.into()),
            ..Self::new(kind)
        }
    }

    /// Sets the reported verdict.
    pub fn with_status(mut self, status: Status) -> Self {
        self.behavior = Behavior::Verdict(status);
        self
    }

    /// Overrides the display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the simulated check duration.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Returns the number of checks performed.
    pub fn check_count(&self) -> u64 {
        self.check_count.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl Probe for MockProbe {
    fn kind(&self) -> ProbeKind {
        self.kind
    }

    fn name(&self) -> &str {
        self.name
            .as_deref()
            .unwrap_or_else(|| self.kind.display_name())
    }

    async fn check(&self) -> Result<ProbeResult, ProbeError> {
        self.check_count.fetch_add(1, Ordering::Relaxed);

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        match &self.behavior {
            Behavior::Verdict(status) => Ok(ProbeResult::verdict(
                self.kind,
                *status,
                serde_json::json!({ "mock": true }),
            )),
            Behavior::Fail(message) => Err(ProbeError::internal(message.clone())),
            Behavior::Panic(message) => panic!("{}", message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_verdict() {
        let probe = MockProbe::new(ProbeKind::Network).with_status(Status::Warning);
        let result = probe.check().await.unwrap();

        assert_eq!(result.status, Status::Warning);
        assert_eq!(result.message, ProbeKind::Network.message_for(Status::Warning));
        assert_eq!(probe.check_count(), 1);
    }

    #[tokio::test]
    async fn test_mock_failure() {
        let probe = MockProbe::failing(ProbeKind::Dns, "boom");
        assert!(probe.check().await.is_err());
    }

    #[test]
    fn test_mock_name() {
        assert_eq!(MockProbe::new(ProbeKind::Dns).name(), "DNS settings check");
        assert_eq!(
            MockProbe::new(ProbeKind::Dns).with_name("custom").name(),
            "custom"
        );
    }
}
