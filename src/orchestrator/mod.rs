//! Probe orchestration.
//!
//! The `Orchestrator` runs the probes strictly one after another, reports
//! progress before each of them, and turns every probe failure into a
//! `warning` verdict so a scan always yields a complete report.

mod handle;
mod scan_orchestrator;

pub use handle::{ScanHandle, ScanStatus};
pub use scan_orchestrator::{
    Orchestrator, OrchestratorBuilder, ProgressSink, ScanConfig,
};
