//! Core types and traits for the privacyscan library.
//!
//! - [`types`] - Verdicts, probe keys and progress events
//! - [`traits`] - The `Probe` trait
//! - [`error`] - Structured error types
//! - [`result`] - Probe results and the scan report

pub mod error;
pub mod result;
pub mod traits;
pub mod types;

pub use error::{OrchestratorError, ProbeError, ProbeOutcome};
pub use result::{ProbeResult, Provenance, ScanReport, StatusSummary};
pub use traits::{ArcProbe, BoxedProbe, Probe};
pub use types::{ProbeKind, ProgressEvent, Status, SCAN_COMPLETE};
