//! Handles to scans running in the background.

use crate::core::ScanReport;

use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;
use tokio::task::JoinHandle;
use uuid::Uuid;

/// A handle to a background scan.
///
/// Cloning the handle is cheap; all clones observe the same scan.
#[derive(Debug, Clone)]
pub struct ScanHandle {
    /// Unique identifier for this handle.
    pub id: String,
    status: Arc<RwLock<ScanStatus>>,
    task: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl ScanHandle {
    pub(crate) fn new() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            status: Arc::new(RwLock::new(ScanStatus::Pending)),
            task: Arc::new(Mutex::new(None)),
        }
    }

    pub(crate) fn attach(&self, task: JoinHandle<()>) {
        *self
            .task
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(task);
    }

    /// Returns the current status of the scan.
    pub fn status(&self) -> ScanStatus {
        self.status
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Returns true once the scan finished or was aborted.
    pub fn is_finished(&self) -> bool {
        matches!(
            self.status(),
            ScanStatus::Complete { .. } | ScanStatus::Aborted
        )
    }

    /// Returns true if the scan has not started yet.
    pub fn is_pending(&self) -> bool {
        matches!(self.status(), ScanStatus::Pending)
    }

    /// Returns true if the scan is running.
    pub fn is_in_progress(&self) -> bool {
        matches!(self.status(), ScanStatus::InProgress)
    }

    pub(crate) fn set_in_progress(&self) {
        let mut status = self
            .status
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if matches!(*status, ScanStatus::Pending) {
            *status = ScanStatus::InProgress;
        }
    }

    pub(crate) fn set_complete(&self, report: ScanReport) {
        let mut status = self
            .status
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if !matches!(*status, ScanStatus::Aborted) {
            *status = ScanStatus::Complete {
                report: Box::new(report),
            };
        }
    }

    /// Stops the scan and discards whatever it would have produced.
    ///
    /// Has no effect on a scan that already completed.
    pub fn abort(&self) {
        {
            let mut status = self
                .status
                .write()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            if matches!(*status, ScanStatus::Complete { .. }) {
                return;
            }
            *status = ScanStatus::Aborted;
        }

        if let Some(task) = self
            .task
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take()
        {
            task.abort();
        }

        tracing::debug!(handle_id = %self.id, "Background scan aborted");
    }

    /// Waits for the scan to finish.
    ///
    /// Returns `None` if the scan was aborted.
    pub async fn wait(self) -> Option<ScanReport> {
        loop {
            match self.status() {
                ScanStatus::Complete { report } => return Some(*report),
                ScanStatus::Aborted => return None,
                _ => tokio::time::sleep(Duration::from_millis(10)).await,
            }
        }
    }
}

/// Status of a background scan.
#[derive(Debug, Clone)]
pub enum ScanStatus {
    /// Scan has not started yet.
    Pending,
    /// Probes are running.
    InProgress,
    /// Scan finished.
    Complete {
        /// The finished report.
        report: Box<ScanReport>,
    },
    /// Scan was aborted before it finished.
    Aborted,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_transitions() {
        let handle = ScanHandle::new();
        assert!(handle.is_pending());

        handle.set_in_progress();
        assert!(handle.is_in_progress());

        handle.set_complete(ScanReport::synthetic());
        assert!(handle.is_finished());

        // abort after completion keeps the report
        handle.abort();
        assert!(matches!(handle.status(), ScanStatus::Complete { .. }));
    }

    #[test]
    fn test_abort_wins_over_late_completion() {
        let handle = ScanHandle::new();
        handle.abort();
        handle.set_complete(ScanReport::synthetic());

        assert!(matches!(handle.status(), ScanStatus::Aborted));
    }

    #[tokio::test]
    async fn test_wait_after_abort() {
        let handle = ScanHandle::new();
        handle.clone().abort();
        assert!(handle.wait().await.is_none());
    }
}
