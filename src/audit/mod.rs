//! Structured audit logging of scans.
//!
//! Events are emitted through `tracing` under the `privacyscan::audit`
//! target, so a subscriber can route them separately from diagnostics.

mod events;

pub use events::{
    emit_probe_completed, emit_scan_report, emit_scan_started, AuditEvent, ProbeAuditEvent,
    ReportAuditEvent,
};
