use std::thread::JoinHandle;

use super::worker::{CancelToken, Outcome, WorkerFailure};
use crate::partition::Section;
use crate::results::{WorkerStatus, WorkerSummary};

/// Coordinator-side reference to a launched worker
#[derive(Debug)]
pub struct WorkerHandle {
    worker: usize,
    section: Section,
    cancel: CancelToken,
    join: Option<JoinHandle<()>>,
    status: WorkerStatus,
    cancel_requests: usize,
    scanned: Option<usize>,
}

impl WorkerHandle {
    pub(crate) fn new(
        worker: usize,
        section: Section,
        cancel: CancelToken,
        join: JoinHandle<()>,
    ) -> Self {
        Self {
            worker,
            section,
            cancel,
            join: Some(join),
            status: WorkerStatus::Running,
            cancel_requests: 0,
            scanned: None,
        }
    }

    pub fn worker(&self) -> usize {
        self.worker
    }

    pub fn section(&self) -> Section {
        self.section
    }

    pub fn status(&self) -> &WorkerStatus {
        &self.status
    }

    /// Still outstanding from the coordinator's point of view
    pub fn is_running(&self) -> bool {
        self.status == WorkerStatus::Running
    }

    pub(crate) fn record(&mut self, result: &Result<Outcome, WorkerFailure>, scanned: usize) {
        self.scanned = Some(scanned);
        self.status = match result {
            Ok(outcome) => WorkerStatus::Completed(*outcome),
            Err(failure) => WorkerStatus::Failed(failure.message.clone()),
        };
    }

    /// Sends a cancellation request if the worker is still outstanding.
    ///
    /// Returns `true` when a request was issued. Workers that already reported, or
    /// were already cancelled, are left alone.
    pub fn cancel(&mut self) -> bool {
        if !self.is_running() {
            return false;
        }
        self.cancel_requests += 1;
        self.status = WorkerStatus::Cancelled;
        // Delivery to a thread that already exited is a no-op
        self.cancel.cancel();
        true
    }

    /// Blocks until the worker thread exits.
    ///
    /// Returns the panic message if the thread unwound outside the worker's own
    /// catch. Reaping twice is a no-op.
    pub(crate) fn reap(&mut self) -> Option<String> {
        let join = self.join.take()?;
        join.join().err().map(|payload| {
            payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "non-string panic payload".to_string())
        })
    }

    pub fn summary(&self) -> WorkerSummary {
        WorkerSummary {
            worker: self.worker,
            section: self.section,
            status: self.status.clone(),
            cancel_requests: self.cancel_requests,
            scanned: self.scanned,
        }
    }
}

impl Drop for WorkerHandle {
    fn drop(&mut self) {
        if self.join.is_some() {
            self.cancel.cancel();
            let _ = self.reap();
        }
    }
}
