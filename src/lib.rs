//! # privacyscan
//!
//! A heuristic scanner that looks for signs of filtering, interception and
//! parental-control monitoring on the current device, browser and network.
//!
//! ## Overview
//!
//! A scan runs six independent probes one after another:
//!
//! - **DNS**: are well-known public resolvers reachable?
//! - **Proxy**: does the connection carry proxy headers, and does a WebRTC
//!   style handshake reveal any address at all?
//! - **Browser**: suspicious plugins and automation flags
//! - **Network**: are popular sites reachable, and how fast?
//! - **Security**: transport and storage checklist of the host context
//! - **Monitoring**: suspicious globals and replaced built-ins
//!
//! Each probe reduces its signals to `safe`, `warning` or `danger`. All
//! verdicts are best-effort heuristics, not proof.
//!
//! A scan never fails visibly: probe failures become `warning` results,
//! and if the scan itself cannot run, [`Orchestrator::run_or_fallback`]
//! returns a report explicitly labeled as synthetic.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use privacyscan::capabilities::{Capabilities, HostSnapshot, HttpClient, StunConnector};
//! use privacyscan::probes::ProbeSettings;
//! use privacyscan::Orchestrator;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let http = Arc::new(HttpClient::with_defaults()?);
//!     let caps = Capabilities::new(
//!         http.clone(),
//!         http,
//!         Arc::new(StunConnector::default()),
//!         Arc::new(HostSnapshot::new()),
//!     );
//!
//!     let orchestrator = Orchestrator::builder()
//!         .with_standard_probes(&caps, &ProbeSettings::default())
//!         .build()?;
//!
//!     let report = orchestrator.run_or_fallback(None).await;
//!     println!("{:?}", report.summary());
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `default` - `http` and `stun`
//! - `http` - reqwest-backed reachability and header echo
//! - `stun` - UDP STUN-backed address discovery
//!
//! ## Architecture
//!
//! - **Core**: verdicts, results, reports, errors and the `Probe` trait
//! - **Capabilities**: injectable outbound dependencies and their fakes
//! - **Probes**: the six heuristic checks
//! - **Orchestrator**: sequential execution, progress, fallback
//! - **Audit**: structured audit events via `tracing`

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod audit;
pub mod capabilities;
pub mod core;
pub mod orchestrator;
pub mod probes;

// Re-export commonly used types at the crate root
pub use crate::core::{
    OrchestratorError, Probe, ProbeError, ProbeKind, ProbeResult, ProgressEvent, Provenance,
    ScanReport, Status, StatusSummary,
};

pub use crate::capabilities::Capabilities;
pub use crate::orchestrator::{Orchestrator, ProgressSink, ScanConfig, ScanHandle};

/// Prelude module for convenient imports.
///
/// ```rust
/// use privacyscan::prelude::*;
/// ```
pub mod prelude {
    pub use crate::capabilities::{
        Capabilities, HeaderEcho, HostEnvironment, HostSnapshot, PeerConnector, Reachability,
    };
    pub use crate::core::{
        OrchestratorError, Probe, ProbeError, ProbeKind, ProbeResult, ProgressEvent, Provenance,
        ScanReport, Status, StatusSummary,
    };
    pub use crate::orchestrator::{Orchestrator, ProgressSink, ScanConfig, ScanHandle};
    pub use crate::probes::ProbeSettings;
}
