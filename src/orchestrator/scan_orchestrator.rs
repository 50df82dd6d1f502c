//! The scan orchestrator implementation.

use crate::audit::{self, ProbeAuditEvent};
use crate::capabilities::Capabilities;
use crate::core::{
    ArcProbe, OrchestratorError, Probe, ProbeError, ProbeKind, ProbeResult, ProgressEvent,
    ScanReport,
};
use crate::orchestrator::handle::ScanHandle;
use crate::probes::{self, ProbeSettings};

use futures::FutureExt;
use std::any::Any;
use std::collections::BTreeSet;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Callback receiving progress events, invoked synchronously.
pub type ProgressSink = Arc<dyn Fn(&ProgressEvent) + Send + Sync>;

/// Configuration for the orchestrator.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Pause inserted after each probe.
    pub inter_probe_delay: Duration,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            inter_probe_delay: Duration::from_millis(500),
        }
    }
}

impl ScanConfig {
    /// Creates a new configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the pause inserted after each probe.
    pub fn with_inter_probe_delay(mut self, delay: Duration) -> Self {
        self.inter_probe_delay = delay;
        self
    }
}

/// Builder for creating an `Orchestrator`.
pub struct OrchestratorBuilder {
    probes: Vec<ArcProbe>,
    config: ScanConfig,
}

impl OrchestratorBuilder {
    /// Creates a new builder.
    pub fn new() -> Self {
        Self {
            probes: Vec::new(),
            config: ScanConfig::default(),
        }
    }

    /// Appends a probe; probes run in the order they were added.
    pub fn add_probe<P: Probe + 'static>(mut self, probe: P) -> Self {
        self.probes.push(Arc::new(probe));
        self
    }

    /// Appends a probe wrapped in an Arc.
    pub fn add_arc_probe(mut self, probe: ArcProbe) -> Self {
        self.probes.push(probe);
        self
    }

    /// Appends the six standard probes.
    pub fn with_standard_probes(mut self, caps: &Capabilities, settings: &ProbeSettings) -> Self {
        self.probes.extend(probes::standard_set(caps, settings));
        self
    }

    /// Sets the configuration.
    pub fn with_config(mut self, config: ScanConfig) -> Self {
        self.config = config;
        self
    }

    /// Builds the orchestrator.
    pub fn build(self) -> Result<Orchestrator, OrchestratorError> {
        validate(&self.probes)?;
        Ok(Orchestrator {
            probes: self.probes,
            config: self.config,
        })
    }
}

impl Default for OrchestratorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn validate(probes: &[ArcProbe]) -> Result<(), OrchestratorError> {
    if probes.is_empty() {
        return Err(OrchestratorError::EmptyProbeSet);
    }
    let mut seen = BTreeSet::new();
    for probe in probes {
        if !seen.insert(probe.kind()) {
            return Err(OrchestratorError::DuplicateProbe {
                key: probe.kind().key().to_string(),
            });
        }
    }
    Ok(())
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "probe panicked".to_string()
    }
}

/// Runs an ordered list of probes one after another.
///
/// # Example
///
/// ```rust,ignore
/// use privacyscan::{Orchestrator, ScanConfig};
/// use privacyscan::probes::ProbeSettings;
///
/// let orchestrator = Orchestrator::builder()
///     .with_standard_probes(&caps, &ProbeSettings::default())
///     .build()?;
///
/// let report = orchestrator.run_or_fallback(None).await;
/// ```
pub struct Orchestrator {
    probes: Vec<ArcProbe>,
    config: ScanConfig,
}

impl Orchestrator {
    /// Creates a new builder.
    pub fn builder() -> OrchestratorBuilder {
        OrchestratorBuilder::new()
    }

    /// Creates an orchestrator without validating the probe list.
    ///
    /// An invalid list is reported by [`Orchestrator::run_all`] instead.
    pub fn from_probes(probes: Vec<ArcProbe>, config: ScanConfig) -> Self {
        Self { probes, config }
    }

    /// Runs every probe in order and collects their verdicts.
    ///
    /// A probe that errors or panics yields a `warning` result; only an
    /// invalid probe list fails the scan.
    pub async fn run_all(
        &self,
        on_progress: Option<ProgressSink>,
    ) -> Result<ScanReport, OrchestratorError> {
        validate(&self.probes)?;

        let total = self.probes.len();
        let mut report = ScanReport::begin();

        let names: Vec<&str> = self.probes.iter().map(|p| p.name()).collect();
        audit::emit_scan_started(&report.id, &names);

        for (index, probe) in self.probes.iter().enumerate() {
            if let Some(sink) = &on_progress {
                sink(&ProgressEvent::before(probe.name(), index, total));
            }

            let started = Instant::now();
            let result = self.check_probe(probe).await;

            let event = ProbeAuditEvent::new(&report.id, probe.kind(), &result, started.elapsed());
            audit::emit_probe_completed(&event);
            report.results.insert(probe.kind(), result);

            if !self.config.inter_probe_delay.is_zero() {
                tokio::time::sleep(self.config.inter_probe_delay).await;
            }
        }

        if let Some(sink) = &on_progress {
            sink(&ProgressEvent::finished(total));
        }

        let report = report.finish();

        tracing::info!(
            scan_id = %report.id,
            overall = ?report.overall_status(),
            duration_ms = report.total_duration.as_millis() as u64,
            "Scan completed"
        );
        audit::emit_scan_report(&report);

        Ok(report)
    }

    /// Runs the scan, substituting a synthetic report if the scan itself fails.
    ///
    /// The substitute is labeled [`crate::Provenance::Synthetic`].
    pub async fn run_or_fallback(&self, on_progress: Option<ProgressSink>) -> ScanReport {
        let failure = match AssertUnwindSafe(self.run_all(on_progress))
            .catch_unwind()
            .await
        {
            Ok(Ok(report)) => return report,
            Ok(Err(e)) => e.to_string(),
            Err(payload) => panic_message(payload.as_ref()),
        };

        tracing::error!(error = %failure, "Scan failed, returning synthetic report");

        let report = ScanReport::synthetic();
        audit::emit_scan_report(&report);
        report
    }

    /// Runs the scan on a background task.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(self: &Arc<Self>, on_progress: Option<ProgressSink>) -> ScanHandle {
        let handle = ScanHandle::new();
        let orchestrator = Arc::clone(self);
        let scan_handle = handle.clone();

        let task = tokio::spawn(async move {
            scan_handle.set_in_progress();
            tracing::debug!(handle_id = %scan_handle.id, "Background scan starting");

            let report = orchestrator.run_or_fallback(on_progress).await;
            scan_handle.set_complete(report);
        });
        handle.attach(task);

        handle
    }

    /// Returns the keys of the registered probes, in execution order.
    pub fn probe_kinds(&self) -> Vec<ProbeKind> {
        self.probes.iter().map(|p| p.kind()).collect()
    }

    /// Returns the number of registered probes.
    pub fn probe_count(&self) -> usize {
        self.probes.len()
    }

    /// Returns a reference to the configuration.
    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    async fn check_probe(&self, probe: &ArcProbe) -> ProbeResult {
        match AssertUnwindSafe(probe.check()).catch_unwind().await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => {
                tracing::warn!(probe = probe.kind().key(), error = %e, "Probe failed");
                ProbeResult::failed(format!("Error in {}", probe.name()), &e)
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                tracing::warn!(probe = probe.kind().key(), panic = %message, "Probe panicked");
                ProbeResult::failed(
                    format!("Error in {}", probe.name()),
                    &ProbeError::internal(message),
                )
            }
        }
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("probes", &self.probe_kinds())
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::mock::{MockHeaderEcho, MockPeerConnector, MockReachability};
    use crate::capabilities::{HostSnapshot, NavigatorInfo, SecurityContext};
    use crate::core::{Provenance, Status};
    use crate::probes::MockProbe;
    use std::sync::Mutex;

    fn no_delay() -> ScanConfig {
        ScanConfig::new().with_inter_probe_delay(Duration::ZERO)
    }

    fn mock_set() -> OrchestratorBuilder {
        ProbeKind::ALL
            .iter()
            .fold(Orchestrator::builder(), |b, kind| b.add_probe(MockProbe::new(*kind)))
            .with_config(no_delay())
    }

    fn recorder() -> (ProgressSink, Arc<Mutex<Vec<ProgressEvent>>>) {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink_events = Arc::clone(&events);
        let sink: ProgressSink = Arc::new(move |event: &ProgressEvent| {
            sink_events.lock().unwrap().push(event.clone());
        });
        (sink, events)
    }

    #[tokio::test]
    async fn test_report_has_every_key() {
        let report = mock_set().build().unwrap().run_all(None).await.unwrap();

        assert_eq!(report.provenance, Provenance::Genuine);
        let keys: Vec<ProbeKind> = report.results.keys().copied().collect();
        assert_eq!(keys, ProbeKind::ALL.to_vec());
    }

    #[tokio::test]
    async fn test_progress_is_monotonic() {
        let (sink, events) = recorder();
        mock_set().build().unwrap().run_all(Some(sink)).await.unwrap();

        let events = events.lock().unwrap();
        assert_eq!(events.len(), 7);
        assert_eq!(events[0].progress, 0.0);
        assert_eq!(events[0].current, "DNS settings check");
        assert!(events.windows(2).all(|w| w[0].progress <= w[1].progress));
        assert!(events[..6].iter().all(|e| e.progress < 100.0));
        assert_eq!(events[3].completed, 3);

        let last = events.last().unwrap();
        assert!(last.is_finished());
        assert_eq!(last.progress, 100.0);
        assert_eq!(last.completed, last.total);
    }

    #[tokio::test]
    async fn test_failing_probe_becomes_warning() {
        let orchestrator = Orchestrator::builder()
            .add_probe(MockProbe::new(ProbeKind::Dns).with_status(Status::Danger))
            .add_probe(MockProbe::failing(ProbeKind::Proxy, "socket closed"))
            .add_probe(MockProbe::new(ProbeKind::Browser))
            .with_config(no_delay())
            .build()
            .unwrap();

        let report = orchestrator.run_all(None).await.unwrap();

        assert_eq!(report.len(), 3);
        assert_eq!(report.get(ProbeKind::Dns).unwrap().status, Status::Danger);
        let proxy = report.get(ProbeKind::Proxy).unwrap();
        assert_eq!(proxy.status, Status::Warning);
        assert_eq!(proxy.message, "Error in Proxy check");
        assert!(proxy.error().unwrap().contains("socket closed"));
        assert_eq!(report.get(ProbeKind::Browser).unwrap().status, Status::Safe);
    }

    #[tokio::test]
    async fn test_panicking_probe_becomes_warning() {
        let orchestrator = Orchestrator::builder()
            .add_probe(MockProbe::panicking(ProbeKind::Security, "host went away"))
            .add_probe(MockProbe::new(ProbeKind::Monitoring))
            .with_config(no_delay())
            .build()
            .unwrap();

        let report = orchestrator.run_all(None).await.unwrap();

        let security = report.get(ProbeKind::Security).unwrap();
        assert_eq!(security.status, Status::Warning);
        assert!(security.error().unwrap().contains("host went away"));
        assert!(report.get(ProbeKind::Monitoring).is_some());
    }

    #[test]
    fn test_builder_validation() {
        assert!(matches!(
            Orchestrator::builder().build(),
            Err(OrchestratorError::EmptyProbeSet)
        ));

        let result = Orchestrator::builder()
            .add_probe(MockProbe::new(ProbeKind::Dns))
            .add_probe(MockProbe::new(ProbeKind::Dns))
            .build();
        assert!(matches!(result, Err(OrchestratorError::DuplicateProbe { key }) if key == "dns"));
    }

    #[tokio::test]
    async fn test_invalid_list_falls_back_to_synthetic() {
        let orchestrator = Orchestrator::from_probes(Vec::new(), no_delay());
        assert!(orchestrator.run_all(None).await.is_err());

        let report = orchestrator.run_or_fallback(None).await;
        assert!(report.is_synthetic());
        assert_eq!(report.len(), 6);
        assert_eq!(report.summary().total(), 6);
    }

    #[tokio::test]
    async fn test_panicking_sink_falls_back_to_synthetic() {
        let sink: ProgressSink = Arc::new(|_: &ProgressEvent| panic!("renderer crashed"));
        let report = mock_set().build().unwrap().run_or_fallback(Some(sink)).await;

        assert!(report.is_synthetic());
        assert_eq!(report.len(), 6);
    }

    #[tokio::test(start_paused = true)]
    async fn test_inter_probe_delay() {
        let orchestrator = Orchestrator::builder()
            .add_probe(MockProbe::new(ProbeKind::Dns))
            .add_probe(MockProbe::new(ProbeKind::Proxy))
            .build()
            .unwrap();
        assert_eq!(
            orchestrator.config().inter_probe_delay,
            Duration::from_millis(500)
        );

        let start = tokio::time::Instant::now();
        orchestrator.run_all(None).await.unwrap();
        assert!(start.elapsed() >= Duration::from_millis(1000));
    }

    #[tokio::test]
    async fn test_probes_run_sequentially_in_order() {
        let (sink, events) = recorder();
        let orchestrator = Orchestrator::builder()
            .add_probe(MockProbe::new(ProbeKind::Monitoring).with_name("first"))
            .add_probe(MockProbe::new(ProbeKind::Dns).with_name("second"))
            .with_config(no_delay())
            .build()
            .unwrap();

        orchestrator.run_all(Some(sink)).await.unwrap();

        let names: Vec<String> = events.lock().unwrap().iter().map(|e| e.current.clone()).collect();
        assert_eq!(names, vec!["first", "second", "Scan complete"]);
    }

    #[tokio::test]
    async fn test_spawn_and_wait() {
        let orchestrator = Arc::new(mock_set().build().unwrap());
        let handle = orchestrator.spawn(None);

        let report = handle.wait().await.unwrap();
        assert_eq!(report.len(), 6);
    }

    #[tokio::test(start_paused = true)]
    async fn test_spawn_abort() {
        let orchestrator = Arc::new(
            Orchestrator::builder()
                .add_probe(MockProbe::new(ProbeKind::Dns).with_latency(Duration::from_secs(60)))
                .build()
                .unwrap(),
        );
        let handle = orchestrator.spawn(None);
        tokio::task::yield_now().await;

        handle.abort();
        assert!(handle.clone().wait().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_standard_probes_end_to_end() {
        let host = HostSnapshot::new()
            .with_navigator(NavigatorInfo::new("agent").with_language("en-US"))
            .with_security_context(SecurityContext::new("https:", "example.com").fully_capable());
        let caps = Capabilities::new(
            Arc::new(MockReachability::new()),
            Arc::new(MockHeaderEcho::new()),
            Arc::new(MockPeerConnector::with_local_addresses()),
            Arc::new(host),
        );

        let orchestrator = Orchestrator::builder()
            .with_standard_probes(&caps, &ProbeSettings::default())
            .build()
            .unwrap();
        let report = orchestrator.run_or_fallback(None).await;

        assert!(!report.is_synthetic());
        assert_eq!(report.len(), 6);
        assert_eq!(report.overall_status(), Some(Status::Safe));
    }
}
