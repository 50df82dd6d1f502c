//! Audit event types and emission functions.

use crate::core::{ProbeKind, ProbeResult, Provenance, ScanReport, Status, StatusSummary};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Base trait for audit events.
pub trait AuditEvent: Serialize {
    /// Returns the event type name.
    fn event_type(&self) -> &'static str;

    /// Returns the timestamp of the event.
    fn timestamp(&self) -> DateTime<Utc>;
}

/// Audit event for a settled probe.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeAuditEvent {
    /// Timestamp of the event.
    pub timestamp: DateTime<Utc>,

    /// Scan the probe belongs to.
    pub scan_id: String,

    /// Probe key.
    pub probe: ProbeKind,

    /// Verdict.
    pub status: Status,

    /// Verdict message.
    pub message: String,

    /// Probe duration in milliseconds.
    pub duration_ms: u64,

    /// Failure text, if the probe could not complete.
    pub error: Option<String>,
}

impl ProbeAuditEvent {
    /// Builds the event for `result`.
    pub fn new(scan_id: &str, probe: ProbeKind, result: &ProbeResult, duration: Duration) -> Self {
        Self {
            timestamp: Utc::now(),
            scan_id: scan_id.to_string(),
            probe,
            status: result.status,
            message: result.message.clone(),
            duration_ms: duration.as_millis() as u64,
            error: result.error().map(str::to_string),
        }
    }
}

impl AuditEvent for ProbeAuditEvent {
    fn event_type(&self) -> &'static str {
        "probe_completed"
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

/// Audit event for a finished scan report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportAuditEvent {
    /// Timestamp of the event.
    pub timestamp: DateTime<Utc>,

    /// Report ID.
    pub report_id: String,

    /// Genuine or synthetic.
    pub provenance: Provenance,

    /// Worst verdict of the report.
    pub overall_status: Option<Status>,

    /// Verdict counts.
    pub summary: StatusSummary,

    /// Scan duration in milliseconds.
    pub total_duration_ms: u64,
}

impl From<&ScanReport> for ReportAuditEvent {
    fn from(report: &ScanReport) -> Self {
        Self {
            timestamp: Utc::now(),
            report_id: report.id.clone(),
            provenance: report.provenance,
            overall_status: report.overall_status(),
            summary: report.summary(),
            total_duration_ms: report.total_duration.as_millis() as u64,
        }
    }
}

impl AuditEvent for ReportAuditEvent {
    fn event_type(&self) -> &'static str {
        "scan_report"
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

/// Emits an audit event for a scan starting.
pub fn emit_scan_started(scan_id: &str, probes: &[&str]) {
    tracing::info!(
        target: "privacyscan::audit",
        event_type = "scan_started",
        scan_id = %scan_id,
        probes = ?probes,
        probe_count = probes.len(),
        "Scan started"
    );
}

/// Emits an audit event for a settled probe.
pub fn emit_probe_completed(event: &ProbeAuditEvent) {
    tracing::info!(
        target: "privacyscan::audit",
        event_type = event.event_type(),
        scan_id = %event.scan_id,
        probe = %event.probe,
        status = %event.status,
        duration_ms = event.duration_ms,
        error = ?event.error,
        "Probe completed"
    );
}

/// Emits an audit event for a scan report.
pub fn emit_scan_report(report: &ScanReport) {
    let event = ReportAuditEvent::from(report);

    tracing::info!(
        target: "privacyscan::audit",
        event_type = event.event_type(),
        report_id = %event.report_id,
        provenance = ?event.provenance,
        overall_status = ?event.overall_status,
        safe = event.summary.safe,
        warning = event.summary.warning,
        danger = event.summary.danger,
        total_duration_ms = event.total_duration_ms,
        "Scan report generated"
    );
}
