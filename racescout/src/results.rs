//! Result types produced by a race.
//!
//! A [`SearchReport`] is what the coordinator hands back once every worker has
//! been reaped. The binding part is the [`Verdict`]; the per-worker summaries are
//! diagnostics (which section matched, who got cancelled, how much was scanned).
//!
//! Positions are 0-based dataset indices. Display code adds one when it talks
//! about "lines".
use std::time::Duration;

use crate::errors::RaceError;
use crate::partition::Section;
use crate::search::worker::Outcome;

/// Final externally visible result of one search
#[derive(Debug)]
pub enum Verdict {
    /// Some worker found the key; `position` is the first Found the coordinator observed
    Success { position: usize },
    /// Every worker scanned its section and none matched
    Failure,
    /// The race was aborted and its result cannot be trusted
    InfrastructureError(RaceError),
}

impl Verdict {
    pub fn is_success(&self) -> bool {
        matches!(self, Verdict::Success { .. })
    }

    pub fn position(&self) -> Option<usize> {
        match self {
            Verdict::Success { position } => Some(*position),
            _ => None,
        }
    }

    /// Terminal coordinator state that produces this verdict
    pub fn state(&self) -> RaceState {
        match self {
            Verdict::Success { .. } => RaceState::Succeeded,
            Verdict::Failure => RaceState::Exhausted,
            Verdict::InfrastructureError(_) => RaceState::Aborted,
        }
    }
}

/// Coordinator state machine: `Running -> (Succeeded | Exhausted | Aborted)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RaceState {
    Running,
    Succeeded,
    Exhausted,
    Aborted,
}

impl RaceState {
    pub fn is_terminal(self) -> bool {
        self != RaceState::Running
    }
}

/// Last known status of a worker from the coordinator's point of view
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerStatus {
    Running,
    Completed(Outcome),
    Failed(String),
    Cancelled,
}

/// Per-worker diagnostics
#[derive(Debug, Clone)]
pub struct WorkerSummary {
    pub worker: usize,
    pub section: Section,
    pub status: WorkerStatus,
    /// Cancellation requests issued by the coordinator (0 or 1)
    pub cancel_requests: usize,
    /// Items scanned, known only for workers whose completion was observed
    pub scanned: Option<usize>,
}

/// Everything the coordinator knows once a race is over
#[derive(Debug)]
pub struct SearchReport {
    pub verdict: Verdict,
    /// Workers in launch order. On a launch failure only the launched ones appear.
    pub workers: Vec<WorkerSummary>,
    /// Completion events consumed before the verdict was decided
    pub completions_observed: usize,
    pub elapsed: Duration,
}

impl SearchReport {
    pub fn state(&self) -> RaceState {
        self.verdict.state()
    }

    /// The worker whose Found decided the race
    pub fn winner(&self) -> Option<&WorkerSummary> {
        let position = self.verdict.position()?;
        self.workers.iter().find(|w| {
            matches!(w.status, WorkerStatus::Completed(Outcome::Found { position: p }) if p == position)
        })
    }

    pub fn cancelled_workers(&self) -> impl Iterator<Item = &WorkerSummary> {
        self.workers
            .iter()
            .filter(|w| w.status == WorkerStatus::Cancelled)
    }

    pub fn total_scanned(&self) -> usize {
        self.workers.iter().filter_map(|w| w.scanned).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(worker: usize, status: WorkerStatus) -> WorkerSummary {
        WorkerSummary {
            worker,
            section: Section::new(worker * 2, worker * 2 + 2),
            status,
            cancel_requests: 0,
            scanned: Some(2),
        }
    }

    #[test]
    fn test_verdict_states() {
        assert_eq!(
            Verdict::Success { position: 4 }.state(),
            RaceState::Succeeded
        );
        assert_eq!(Verdict::Failure.state(), RaceState::Exhausted);
        assert_eq!(
            Verdict::InfrastructureError(RaceError::Aborted).state(),
            RaceState::Aborted
        );
        assert!(!RaceState::Running.is_terminal());
        assert!(RaceState::Aborted.is_terminal());
    }

    #[test]
    fn test_verdict_position() {
        assert_eq!(Verdict::Success { position: 7 }.position(), Some(7));
        assert_eq!(Verdict::Failure.position(), None);
        assert!(!Verdict::Failure.is_success());
    }

    #[test]
    fn test_report_winner_and_cancelled() {
        let mut cancelled = summary(2, WorkerStatus::Cancelled);
        cancelled.cancel_requests = 1;
        cancelled.scanned = None;

        let report = SearchReport {
            verdict: Verdict::Success { position: 3 },
            workers: vec![
                summary(0, WorkerStatus::Completed(Outcome::NotFound)),
                summary(1, WorkerStatus::Completed(Outcome::Found { position: 3 })),
                cancelled,
            ],
            completions_observed: 2,
            elapsed: Duration::from_millis(1),
        };

        assert_eq!(report.state(), RaceState::Succeeded);
        assert_eq!(report.winner().map(|w| w.worker), Some(1));
        let cancelled: Vec<usize> = report.cancelled_workers().map(|w| w.worker).collect();
        assert_eq!(cancelled, vec![2]);
        assert_eq!(report.total_scanned(), 4);
    }

    #[test]
    fn test_no_winner_on_failure() {
        let report = SearchReport {
            verdict: Verdict::Failure,
            workers: vec![summary(0, WorkerStatus::Completed(Outcome::NotFound))],
            completions_observed: 1,
            elapsed: Duration::ZERO,
        };
        assert!(report.winner().is_none());
    }
}
