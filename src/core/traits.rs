//! Core traits for the privacyscan library.
//!
//! This module defines the `Probe` trait that every heuristic check
//! implements. The orchestrator only ever talks to probes through it.

use crate::core::error::ProbeError;
use crate::core::result::ProbeResult;
use crate::core::types::ProbeKind;

use async_trait::async_trait;
use std::fmt::Debug;

/// One independent heuristic check producing a tri-state verdict.
///
/// # Implementation Notes
///
/// - Implementations must be `Send + Sync` for use in async contexts.
/// - A probe is single-attempt; it must not retry failed requests.
/// - Failures inside the probe should be folded into a `warning` result.
///   Returning `Err` is allowed; the orchestrator converts it the same way.
///
/// # Example Implementation
///
/// ```rust,ignore
/// use privacyscan::core::{Probe, ProbeKind, ProbeResult, ProbeError, Status};
/// use async_trait::async_trait;
///
/// #[derive(Debug)]
/// struct AlwaysSafe;
///
/// #[async_trait]
/// impl Probe for AlwaysSafe {
///     fn kind(&self) -> ProbeKind {
///         ProbeKind::Dns
///     }
///
///     async fn check(&self) -> Result<ProbeResult, ProbeError> {
///         Ok(ProbeResult::verdict(ProbeKind::Dns, Status::Safe, serde_json::json!({})))
///     }
/// }
/// ```
#[async_trait]
pub trait Probe: Send + Sync + Debug {
    /// Returns the report key this probe fills.
    fn kind(&self) -> ProbeKind;

    /// Returns the name reported in progress events.
    fn name(&self) -> &str {
        self.kind().display_name()
    }

    /// Runs the check once and reduces its signals to a verdict.
    async fn check(&self) -> Result<ProbeResult, ProbeError>;
}

/// A boxed probe for type-erased storage.
pub type BoxedProbe = Box<dyn Probe>;

/// An arc-wrapped probe for shared ownership.
pub type ArcProbe = std::sync::Arc<dyn Probe>;
