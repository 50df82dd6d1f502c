//! Probe result and scan report structures.
//!
//! A [`ProbeResult`] is the verdict of one probe; a [`ScanReport`] holds one
//! result per probe key for a single scan invocation.

use crate::core::error::ProbeError;
use crate::core::types::{ProbeKind, Status};
use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;
use std::time::Duration;

/// The verdict of a single probe.
///
/// `details` is an opaque diagnostic payload whose shape differs per probe;
/// the orchestrator never looks inside it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeResult {
    /// Tri-state verdict.
    pub status: Status,
    /// Human-readable explanation.
    pub message: String,
    /// Per-probe diagnostics.
    #[serde(default)]
    pub details: serde_json::Value,
}

impl ProbeResult {
    /// Creates a new result.
    pub fn new(status: Status, message: impl Into<String>, details: serde_json::Value) -> Self {
        Self {
            status,
            message: message.into(),
            details,
        }
    }

    /// Creates a result using the standard message of `kind` for `status`.
    pub fn verdict(kind: ProbeKind, status: Status, details: serde_json::Value) -> Self {
        Self::new(status, kind.message_for(status), details)
    }

    /// Creates the `warning` result of a probe that failed to run.
    ///
    /// The error text is stored under `details.error`.
    pub fn failed(message: impl Into<String>, error: &ProbeError) -> Self {
        Self::new(
            Status::Warning,
            message,
            json!({ "error": error.to_string() }),
        )
    }

    /// Returns the `details.error` text, if this result records a failure.
    pub fn error(&self) -> Option<&str> {
        self.details.get("error").and_then(|e| e.as_str())
    }

    /// Returns `true` if the verdict is safe.
    pub fn is_safe(&self) -> bool {
        self.status.is_safe()
    }
}

/// Where the results of a report came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    /// Results produced by running the probes.
    Genuine,
    /// Placeholder results drawn at random after the scan itself failed.
    Synthetic,
}

/// Count of results per verdict.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusSummary {
    /// Number of safe results.
    pub safe: usize,
    /// Number of warning results.
    pub warning: usize,
    /// Number of danger results.
    pub danger: usize,
}

impl StatusSummary {
    /// Total number of results counted.
    pub fn total(&self) -> usize {
        self.safe + self.warning + self.danger
    }
}

/// The full set of probe results for one scan invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanReport {
    /// Unique identifier for this report.
    pub id: String,

    /// Whether the results are genuine or synthetic placeholders.
    pub provenance: Provenance,

    /// When the scan started.
    pub started_at: DateTime<Utc>,

    /// When the scan completed.
    pub completed_at: DateTime<Utc>,

    /// Wall-clock duration of the scan.
    #[serde(with = "duration_serde")]
    pub total_duration: Duration,

    /// Results keyed by probe, iterated in `ProbeKind` order.
    pub results: BTreeMap<ProbeKind, ProbeResult>,
}

impl ScanReport {
    /// Starts an empty genuine report.
    pub(crate) fn begin() -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            provenance: Provenance::Genuine,
            started_at: now,
            completed_at: now,
            total_duration: Duration::ZERO,
            results: BTreeMap::new(),
        }
    }

    /// Stamps the completion time.
    pub(crate) fn finish(mut self) -> Self {
        self.completed_at = Utc::now();
        self.total_duration = (self.completed_at - self.started_at)
            .to_std()
            .unwrap_or_default();
        self
    }

    /// Builds a synthetic report with one randomly drawn verdict per known probe.
    pub fn synthetic() -> Self {
        Self::synthetic_with_rng(&mut rand::thread_rng())
    }

    /// Builds a synthetic report drawing verdicts from `rng`.
    ///
    /// Each verdict is safe with probability 0.7, otherwise warning or
    /// danger with equal probability.
    pub fn synthetic_with_rng<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let mut report = Self::begin();
        report.provenance = Provenance::Synthetic;
        for kind in ProbeKind::ALL {
            let status = if rng.gen::<f64>() > 0.3 {
                Status::Safe
            } else if rng.gen::<f64>() > 0.5 {
                Status::Warning
            } else {
                Status::Danger
            };
            report.results.insert(
                kind,
                ProbeResult::verdict(kind, status, json!({ "synthetic": true })),
            );
        }
        report.finish()
    }

    /// Returns the result for `kind`.
    pub fn get(&self, kind: ProbeKind) -> Option<&ProbeResult> {
        self.results.get(&kind)
    }

    /// Returns `true` if the report holds placeholder results.
    pub fn is_synthetic(&self) -> bool {
        self.provenance == Provenance::Synthetic
    }

    /// Returns the worst verdict in the report, `None` when empty.
    pub fn overall_status(&self) -> Option<Status> {
        self.results.values().map(|r| r.status).max()
    }

    /// Counts results per verdict.
    pub fn summary(&self) -> StatusSummary {
        self.results
            .values()
            .fold(StatusSummary::default(), |mut acc, r| {
                match r.status {
                    Status::Safe => acc.safe += 1,
                    Status::Warning => acc.warning += 1,
                    Status::Danger => acc.danger += 1,
                }
                acc
            })
    }

    /// Returns the number of probe results.
    pub fn len(&self) -> usize {
        self.results.len()
    }

    /// Returns `true` if no probe result has been recorded.
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

/// Serde helper for Duration serialization.
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        (duration.as_millis() as u64).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
