//! Core types used throughout the privacyscan library.
//!
//! This module defines the tri-state verdict, the stable probe keys and
//! the progress events emitted while a scan runs.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The verdict of a single probe.
///
/// Variants are ordered by severity so the worst verdict of a report is
/// simply the maximum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// No signal of filtering or monitoring.
    Safe,
    /// Weak or inconclusive signal, or the probe could not complete.
    Warning,
    /// Strong heuristic signal of filtering, interception or monitoring.
    Danger,
}

impl Status {
    /// All verdicts, in severity order.
    pub const ALL: [Status; 3] = [Status::Safe, Status::Warning, Status::Danger];

    /// Returns `true` for [`Status::Safe`].
    pub fn is_safe(&self) -> bool {
        matches!(self, Self::Safe)
    }

    /// Returns `true` for [`Status::Warning`].
    pub fn is_warning(&self) -> bool {
        matches!(self, Self::Warning)
    }

    /// Returns `true` for [`Status::Danger`].
    pub fn is_danger(&self) -> bool {
        matches!(self, Self::Danger)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Safe => write!(f, "safe"),
            Self::Warning => write!(f, "warning"),
            Self::Danger => write!(f, "danger"),
        }
    }
}

/// Stable identifier of a probe; also the key of a [`crate::ScanReport`].
///
/// Declaration order is the standard execution order and the report order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeKind {
    /// Public resolver reachability.
    Dns,
    /// Proxy headers and WebRTC address discovery.
    Proxy,
    /// Browser fingerprint and automation flags.
    Browser,
    /// Popular site reachability and latency.
    Network,
    /// Transport and storage security checklist.
    Security,
    /// Monitoring globals and patched built-ins.
    Monitoring,
}

impl ProbeKind {
    /// Every known probe, in standard execution order.
    pub const ALL: [ProbeKind; 6] = [
        ProbeKind::Dns,
        ProbeKind::Proxy,
        ProbeKind::Browser,
        ProbeKind::Network,
        ProbeKind::Security,
        ProbeKind::Monitoring,
    ];

    /// Returns the report key.
    pub fn key(&self) -> &'static str {
        match self {
            Self::Dns => "dns",
            Self::Proxy => "proxy",
            Self::Browser => "browser",
            Self::Network => "network",
            Self::Security => "security",
            Self::Monitoring => "monitoring",
        }
    }

    /// Returns the human-readable name shown while the probe is in flight.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Dns => "DNS settings check",
            Self::Proxy => "Proxy check",
            Self::Browser => "Browser settings check",
            Self::Network => "Network connectivity check",
            Self::Security => "Encryption and security check",
            Self::Monitoring => "Monitoring software check",
        }
    }

    /// Returns the message that accompanies a verdict of this probe.
    pub fn message_for(&self, status: Status) -> &'static str {
        match (self, status) {
            (Self::Dns, Status::Safe) => "DNS settings are safe - no filtered servers",
            (Self::Dns, Status::Warning) => "Custom DNS servers detected - they may be filtered",
            (Self::Dns, Status::Danger) => {
                "Filtered DNS servers detected - content is being blocked"
            }
            (Self::Proxy, Status::Safe) => "No proxy detected",
            (Self::Proxy, Status::Warning) => "Possible proxy detected",
            (Self::Proxy, Status::Danger) => "Forced proxy detected - activity may be monitored",
            (Self::Browser, Status::Safe) => "Browser settings are safe",
            (Self::Browser, Status::Warning) => "Extensions present that may affect privacy",
            (Self::Browser, Status::Danger) => "Monitoring software detected in the browser",
            (Self::Network, Status::Safe) => "Network is safe - no restrictions detected",
            (Self::Network, Status::Warning) => "Network is slow - it may be filtered",
            (Self::Network, Status::Danger) => "Network-level blocking detected",
            (Self::Security, Status::Safe) => "Connections are properly encrypted",
            (Self::Security, Status::Warning) => "Some connections are not encrypted",
            (Self::Security, Status::Danger) => "Encryption problems detected",
            (Self::Monitoring, Status::Safe) => "No monitoring software detected",
            (Self::Monitoring, Status::Warning) => "Suspicious activity present",
            (Self::Monitoring, Status::Danger) => "Active parental control software detected",
        }
    }

    /// Returns the message used when the probe itself could not run.
    pub fn failure_message(&self) -> &'static str {
        match self {
            Self::Dns => "Unable to check DNS settings",
            // A proxy that breaks the echo request is itself a hint.
            Self::Proxy => "Possible proxy detected",
            Self::Browser => "Unable to check browser settings",
            Self::Network => "Unable to check the network",
            Self::Security => "Unable to check security",
            Self::Monitoring => "Unable to check for monitoring software",
        }
    }
}

impl fmt::Display for ProbeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Name reported in the final progress event.
pub const SCAN_COMPLETE: &str = "Scan complete";

/// A transient progress update emitted by the orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressEvent {
    /// Name of the probe in flight, or [`SCAN_COMPLETE`].
    pub current: String,
    /// Percentage in `[0, 100]`.
    pub progress: f64,
    /// Number of probes already finished.
    pub completed: usize,
    /// Number of probes in the scan.
    pub total: usize,
}

impl ProgressEvent {
    /// Event emitted right before probe `index` (0-based) of `total` starts.
    pub fn before(name: impl Into<String>, index: usize, total: usize) -> Self {
        let progress = if total == 0 {
            100.0
        } else {
            100.0 * index as f64 / total as f64
        };
        Self {
            current: name.into(),
            progress,
            completed: index,
            total,
        }
    }

    /// Terminal event emitted once every probe has settled.
    pub fn finished(total: usize) -> Self {
        Self {
            current: SCAN_COMPLETE.to_string(),
            progress: 100.0,
            completed: total,
            total,
        }
    }

    /// Returns `true` for the terminal event.
    pub fn is_finished(&self) -> bool {
        self.completed == self.total && self.current == SCAN_COMPLETE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_ordering() {
        assert!(Status::Safe < Status::Warning);
        assert!(Status::Warning < Status::Danger);
        assert_eq!(Status::ALL.iter().max(), Some(&Status::Danger));
    }

    #[test]
    fn test_status_serde() {
        let json = serde_json::to_string(&Status::Warning).unwrap();
        assert_eq!(json, "\"warning\"");
        let back: Status = serde_json::from_str("\"danger\"").unwrap();
        assert_eq!(back, Status::Danger);
    }

    #[test]
    fn test_probe_kind_keys_are_unique() {
        let mut keys: Vec<_> = ProbeKind::ALL.iter().map(|k| k.key()).collect();
        keys.sort_unstable();
        keys.dedup();
        assert_eq!(keys.len(), ProbeKind::ALL.len());
    }

    #[test]
    fn test_probe_kind_order_matches_all() {
        let mut sorted = ProbeKind::ALL;
        sorted.sort();
        assert_eq!(sorted, ProbeKind::ALL);
    }

    #[test]
    fn test_progress_before() {
        let event = ProgressEvent::before("Proxy check", 1, 6);
        assert_eq!(event.completed, 1);
        assert!((event.progress - 100.0 / 6.0).abs() < f64::EPSILON);
        assert!(!event.is_finished());
    }

    #[test]
    fn test_progress_finished() {
        let event = ProgressEvent::finished(6);
        assert_eq!(event.progress, 100.0);
        assert_eq!(event.completed, event.total);
        assert!(event.is_finished());
    }
}
