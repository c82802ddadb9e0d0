use crossbeam_channel::Sender;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tracing::trace;

use crate::dataset::Dataset;
use crate::partition::Section;

/// How many items a worker compares between cancellation checks
pub const CANCEL_CHECK_INTERVAL: usize = 256;

/// One-shot cancellation signal owned by a single worker.
///
/// Each worker gets its own token; there is no flag shared across workers.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation. Returns `true` only for the call that delivered it.
    pub fn cancel(&self) -> bool {
        !self.flag.swap(true, Ordering::AcqRel)
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}

/// Clean terminal result of a worker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Found { position: usize },
    NotFound,
}

/// Abnormal worker termination, kept distinct from [`Outcome::NotFound`]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct WorkerFailure {
    pub message: String,
}

impl WorkerFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            format!("panicked: {s}")
        } else if let Some(s) = payload.downcast_ref::<String>() {
            format!("panicked: {s}")
        } else {
            "panicked with a non-string payload".to_string()
        };
        Self::new(message)
    }
}

/// The single completion event a worker sends to the coordinator
#[derive(Debug)]
pub struct Completion {
    pub worker: usize,
    pub result: Result<Outcome, WorkerFailure>,
    /// Items compared before the worker stopped
    pub scanned: usize,
}

/// Result of scanning one section
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scan {
    /// `None` when the scan stopped because it was cancelled
    pub outcome: Option<Outcome>,
    pub scanned: usize,
}

/// Linearly scans `section` of `dataset` for `key`.
///
/// Stops at the first match in the section. Cancellation is checked before the
/// first item and then every [`CANCEL_CHECK_INTERVAL`] items.
pub fn search_section(
    dataset: &[String],
    key: &str,
    section: Section,
    cancel: &CancelToken,
) -> Result<Scan, WorkerFailure> {
    let items = dataset.get(section.range()).ok_or_else(|| {
        WorkerFailure::new(format!(
            "section {} lies outside a dataset of {} items",
            section,
            dataset.len()
        ))
    })?;

    for (offset, item) in items.iter().enumerate() {
        if offset % CANCEL_CHECK_INTERVAL == 0 && cancel.is_cancelled() {
            return Ok(Scan {
                outcome: None,
                scanned: offset,
            });
        }
        if item.as_str() == key {
            return Ok(Scan {
                outcome: Some(Outcome::Found {
                    position: section.start + offset,
                }),
                scanned: offset + 1,
            });
        }
    }

    Ok(Scan {
        outcome: Some(Outcome::NotFound),
        scanned: items.len(),
    })
}

/// Sends exactly one completion per worker.
///
/// If the worker goes away without reporting (its job was dropped unrun, or it
/// unwound past the catch), dropping the reporter sends a failure instead.
struct CompletionReporter {
    worker: usize,
    completions: Option<Sender<Completion>>,
}

impl CompletionReporter {
    fn report(mut self, result: Result<Outcome, WorkerFailure>, scanned: usize) {
        if let Some(tx) = self.completions.take() {
            // The coordinator stops listening once the race is decided
            let _ = tx.send(Completion {
                worker: self.worker,
                result,
                scanned,
            });
        }
    }

    fn withdraw(mut self) {
        self.completions = None;
    }
}

impl Drop for CompletionReporter {
    fn drop(&mut self) {
        if let Some(tx) = self.completions.take() {
            let _ = tx.send(Completion {
                worker: self.worker,
                result: Err(WorkerFailure::new("worker exited without reporting")),
                scanned: 0,
            });
        }
    }
}

/// Everything one worker needs, moved into its thread
pub(crate) struct WorkerTask {
    worker: usize,
    section: Section,
    dataset: Dataset,
    key: Arc<str>,
    cancel: CancelToken,
    reporter: CompletionReporter,
}

impl WorkerTask {
    pub(crate) fn new(
        worker: usize,
        section: Section,
        dataset: Dataset,
        key: Arc<str>,
        cancel: CancelToken,
        completions: Sender<Completion>,
    ) -> Self {
        Self {
            worker,
            section,
            dataset,
            key,
            cancel,
            reporter: CompletionReporter {
                worker,
                completions: Some(completions),
            },
        }
    }

    pub(crate) fn run(self) {
        let WorkerTask {
            worker,
            section,
            dataset,
            key,
            cancel,
            reporter,
        } = self;

        let scan = panic::catch_unwind(AssertUnwindSafe(|| {
            search_section(&dataset, &key, section, &cancel)
        }));

        match scan {
            Ok(Ok(Scan {
                outcome: Some(outcome),
                scanned,
            })) => {
                trace!("Worker {} finished {} with {:?}", worker, section, outcome);
                reporter.report(Ok(outcome), scanned);
            }
            Ok(Ok(Scan {
                outcome: None,
                scanned,
            })) => {
                trace!("Worker {} cancelled after {} items", worker, scanned);
                reporter.withdraw();
            }
            Ok(Err(failure)) => reporter.report(Err(failure), 0),
            Err(payload) => reporter.report(Err(WorkerFailure::from_panic(payload)), 0),
        }
    }
}
