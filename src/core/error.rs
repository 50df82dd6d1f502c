//! Error types for the privacyscan library.
//!
//! Probe failures are never surfaced to the caller of a scan; they are
//! folded into `warning` results. These types exist so probes and
//! capabilities can propagate failures with `?` up to that point.

use std::time::Duration;
use thiserror::Error;

/// The error type for probe and capability operations.
#[derive(Debug, Error)]
pub enum ProbeError {
    /// A host capability (fetch primitive, peer connection, navigator...) is missing.
    #[error("capability '{capability}' is unavailable: {reason}")]
    CapabilityUnavailable {
        /// Name of the capability.
        capability: String,
        /// Human-readable reason.
        reason: String,
    },

    /// An outbound request failed.
    #[error("request to '{target}' failed: {message}")]
    Request {
        /// URL or address that was contacted.
        target: String,
        /// Error message describing the failure.
        message: String,
    },

    /// The remote side answered with something we could not interpret.
    #[error("malformed response from '{target}': {details}")]
    MalformedResponse {
        /// URL or address that answered.
        target: String,
        /// Details about what was wrong.
        details: String,
    },

    /// An operation did not finish in time.
    #[error("request to '{target}' timed out after {elapsed:?}")]
    Timeout {
        /// URL or address that was contacted.
        target: String,
        /// How long the operation ran.
        elapsed: Duration,
    },

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {message}")]
    Configuration {
        /// Description of the configuration error.
        message: String,
    },

    /// An internal error occurred.
    #[error("internal error: {message}")]
    Internal {
        /// Description of the internal error.
        message: String,
    },
}

impl ProbeError {
    /// Returns `true` if the failure means a capability is missing rather
    /// than a network condition.
    pub fn is_capability_failure(&self) -> bool {
        matches!(self, Self::CapabilityUnavailable { .. })
    }

    /// Returns the capability name if this error is associated with one.
    pub fn capability(&self) -> Option<&str> {
        match self {
            Self::CapabilityUnavailable { capability, .. } => Some(capability),
            _ => None,
        }
    }

    /// Returns the request target if this error is associated with one.
    pub fn target(&self) -> Option<&str> {
        match self {
            Self::Request { target, .. }
            | Self::MalformedResponse { target, .. }
            | Self::Timeout { target, .. } => Some(target),
            _ => None,
        }
    }

    /// Creates a `CapabilityUnavailable` error.
    pub fn unavailable(capability: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::CapabilityUnavailable {
            capability: capability.into(),
            reason: reason.into(),
        }
    }

    /// Creates a `Request` error.
    pub fn request(target: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Request {
            target: target.into(),
            message: message.into(),
        }
    }

    /// Creates a `MalformedResponse` error.
    pub fn malformed(target: impl Into<String>, details: impl Into<String>) -> Self {
        Self::MalformedResponse {
            target: target.into(),
            details: details.into(),
        }
    }

    /// Creates a `Timeout` error.
    pub fn timeout(target: impl Into<String>, elapsed: Duration) -> Self {
        Self::Timeout {
            target: target.into(),
            elapsed,
        }
    }

    /// Creates an `Internal` error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Creates a `Configuration` error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }
}

/// Failures of the probe list itself.
///
/// These are the only errors that escape [`crate::Orchestrator::run_all`];
/// callers are expected to fall back to a synthetic report.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// No probes were registered.
    #[error("no probes registered")]
    EmptyProbeSet,

    /// Two probes share one report key.
    #[error("duplicate probe key '{key}'")]
    DuplicateProbe {
        /// The key that appears twice.
        key: String,
    },
}

/// A specialized `Result` type for probe operations.
pub type ProbeOutcome<T> = Result<T, ProbeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capability_failure() {
        let err = ProbeError::unavailable("peer-connection", "not supported");
        assert!(err.is_capability_failure());
        assert_eq!(err.capability(), Some("peer-connection"));
        assert_eq!(err.target(), None);
    }

    #[test]
    fn test_request_error_target() {
        let err = ProbeError::request("https://1.1.1.1", "connection refused");
        assert!(!err.is_capability_failure());
        assert_eq!(err.target(), Some("https://1.1.1.1"));
        assert!(err.to_string().contains("connection refused"));
    }

    #[test]
    fn test_timeout_display() {
        let err = ProbeError::timeout("stun.l.google.com:19302", Duration::from_secs(3));
        assert!(err.to_string().contains("3s"));
    }

    #[test]
    fn test_orchestrator_error_display() {
        let err = OrchestratorError::DuplicateProbe { key: "dns".into() };
        assert_eq!(err.to_string(), "duplicate probe key 'dns'");
    }
}
