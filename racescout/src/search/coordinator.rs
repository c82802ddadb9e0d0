use crossbeam_channel::{at, bounded, never, select, unbounded, Receiver, Sender};
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use super::handle::WorkerHandle;
use super::spawner::{Spawner, ThreadSpawner};
use super::worker::{CancelToken, Completion, Outcome, WorkerFailure, WorkerTask};
use crate::dataset::Dataset;
use crate::errors::RaceError;
use crate::metrics::RaceMetrics;
use crate::partition::{partition, Section};
use crate::results::{RaceState, SearchReport, Verdict};

/// Lets another thread force a running race onto the abort path
#[derive(Debug, Clone)]
pub struct AbortHandle {
    tx: Sender<()>,
}

impl AbortHandle {
    /// Requests an abort. Repeated calls, or calls after the race ended, do nothing.
    pub fn abort(&self) {
        let _ = self.tx.try_send(());
    }
}

/// Runs one partition-and-race search.
///
/// The coordinator splits the dataset into one section per worker, launches the
/// workers, and consumes their completion events in the order they arrive:
///
/// - the first `Found` wins; every worker still outstanding is cancelled
/// - `NotFound` just retires that worker; when none remain the verdict is `Failure`
/// - a worker failure, a launch failure, the deadline or an abort request cancels
///   everything outstanding and yields `InfrastructureError`
///
/// Cancellation never delays the verdict, but [`Coordinator::run`] joins every
/// launched worker before it returns.
pub struct Coordinator<S = ThreadSpawner> {
    dataset: Dataset,
    key: Arc<str>,
    worker_count: NonZeroUsize,
    spawner: S,
    deadline: Option<Duration>,
    abort_tx: Sender<()>,
    abort_rx: Receiver<()>,
    metrics: RaceMetrics,
}

impl Coordinator<ThreadSpawner> {
    pub fn new(
        dataset: impl Into<Dataset>,
        key: impl Into<Arc<str>>,
        worker_count: NonZeroUsize,
    ) -> Self {
        let (abort_tx, abort_rx) = bounded(1);
        Self {
            dataset: dataset.into(),
            key: key.into(),
            worker_count,
            spawner: ThreadSpawner::new(),
            deadline: None,
            abort_tx,
            abort_rx,
            metrics: RaceMetrics::new(),
        }
    }
}

impl<S: Spawner> Coordinator<S> {
    /// Replaces the spawner used to launch workers
    pub fn with_spawner<T: Spawner>(self, spawner: T) -> Coordinator<T> {
        Coordinator {
            dataset: self.dataset,
            key: self.key,
            worker_count: self.worker_count,
            spawner,
            deadline: self.deadline,
            abort_tx: self.abort_tx,
            abort_rx: self.abort_rx,
            metrics: self.metrics,
        }
    }

    /// Aborts the race if no verdict is reached within `deadline` of starting
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_metrics(mut self, metrics: RaceMetrics) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn metrics(&self) -> &RaceMetrics {
        &self.metrics
    }

    pub fn abort_handle(&self) -> AbortHandle {
        AbortHandle {
            tx: self.abort_tx.clone(),
        }
    }

    /// Sections the workers will be given, in launch order
    pub fn sections(&self) -> Vec<Section> {
        partition(self.dataset.len(), self.worker_count)
    }

    /// Runs the race to a verdict and reaps every launched worker
    pub fn run(self) -> SearchReport {
        let started = Instant::now();
        let sections = self.sections();
        info!(
            "Racing {} workers over {} items for key {:?}",
            sections.len(),
            self.dataset.len(),
            self.key
        );

        let (completion_tx, completion_rx) = unbounded();
        let mut handles = Vec::with_capacity(sections.len());

        for (worker, section) in sections.into_iter().enumerate() {
            let cancel = CancelToken::new();
            let task = WorkerTask::new(
                worker,
                section,
                Arc::clone(&self.dataset),
                Arc::clone(&self.key),
                cancel.clone(),
                completion_tx.clone(),
            );

            match self.spawner.spawn(worker, Box::new(move || task.run())) {
                Ok(join) => {
                    self.metrics.record_launch();
                    debug!("Launched worker {} on {}", worker, section);
                    handles.push(WorkerHandle::new(worker, section, cancel, join));
                }
                Err(source) => {
                    self.metrics.record_launch_failure();
                    error!("Failed to launch worker {}: {}", worker, source);
                    let verdict = Verdict::InfrastructureError(RaceError::Spawn { worker, source });
                    return self.finish(verdict, handles, 0, started);
                }
            }
        }
        // Only workers hold senders now, so a vanished worker shows up as a disconnect
        drop(completion_tx);

        let (verdict, observed) = self.drain(&mut handles, &completion_rx, started);
        self.finish(verdict, handles, observed, started)
    }

    /// Consumes completion events until the race leaves `Running`
    fn drain(
        &self,
        handles: &mut [WorkerHandle],
        completions: &Receiver<Completion>,
        started: Instant,
    ) -> (Verdict, usize) {
        let mut outstanding = handles.len();
        let mut observed = 0;
        // A deadline too far out to represent never fires
        let timeout = self
            .deadline
            .and_then(|deadline| started.checked_add(deadline))
            .map_or_else(never, at);

        let mut state = if outstanding == 0 {
            RaceState::Exhausted
        } else {
            RaceState::Running
        };
        let mut verdict = Verdict::Failure;

        while !state.is_terminal() {
            let decided = select! {
                recv(completions) -> msg => match msg {
                    Ok(Completion { worker, result, scanned }) => {
                        observed += 1;
                        handles[worker].record(&result, scanned);
                        self.on_completion(worker, result, scanned, &mut outstanding)
                    }
                    Err(_) => {
                        error!("Completion channel closed with {} worker(s) outstanding", outstanding);
                        Some(Verdict::InfrastructureError(RaceError::Disconnected { outstanding }))
                    }
                },
                recv(self.abort_rx) -> _ => {
                    warn!("Search aborted with {} worker(s) outstanding", outstanding);
                    Some(Verdict::InfrastructureError(RaceError::Aborted))
                },
                recv(timeout) -> _ => {
                    let deadline = self.deadline.unwrap_or_default();
                    warn!(
                        "Deadline of {} exceeded with {} worker(s) outstanding",
                        humantime::format_duration(deadline),
                        outstanding
                    );
                    Some(Verdict::InfrastructureError(RaceError::DeadlineExceeded { deadline }))
                },
            };

            if let Some(next) = decided {
                state = next.state();
                verdict = next;
            }
        }

        debug!("Race ended {:?} after {} completion(s)", state, observed);
        (verdict, observed)
    }

    /// Applies one completion event; returns the verdict if it decides the race
    fn on_completion(
        &self,
        worker: usize,
        result: Result<Outcome, WorkerFailure>,
        scanned: usize,
        outstanding: &mut usize,
    ) -> Option<Verdict> {
        match result {
            Ok(Outcome::Found { position }) => {
                self.metrics.record_completion(scanned, false);
                info!("Worker {} found the key at position {}", worker, position);
                Some(Verdict::Success { position })
            }
            Ok(Outcome::NotFound) => {
                self.metrics.record_completion(scanned, true);
                *outstanding -= 1;
                debug!(
                    "Worker {} reported no match, {} outstanding",
                    worker, outstanding
                );
                if *outstanding == 0 {
                    info!("All workers reported no match");
                    return Some(Verdict::Failure);
                }
                None
            }
            Err(failure) => {
                self.metrics.record_worker_failure();
                error!("Worker {} failed: {}", worker, failure);
                Some(Verdict::InfrastructureError(RaceError::WorkerFailed {
                    worker,
                    message: failure.message,
                }))
            }
        }
    }

    /// Cancels whatever is still outstanding, then reaps every worker
    fn finish(
        &self,
        verdict: Verdict,
        mut handles: Vec<WorkerHandle>,
        observed: usize,
        started: Instant,
    ) -> SearchReport {
        for handle in handles.iter_mut() {
            if handle.cancel() {
                self.metrics.record_cancellation();
                debug!("Cancelled worker {}", handle.worker());
            }
        }

        for handle in handles.iter_mut() {
            if let Some(message) = handle.reap() {
                warn!("Worker {} panicked while being reaped: {}", handle.worker(), message);
            }
        }

        self.metrics.log_stats();
        SearchReport {
            verdict,
            workers: handles.iter().map(WorkerHandle::summary).collect(),
            completions_observed: observed,
            elapsed: started.elapsed(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::results::WorkerStatus;
    use crate::search::spawner::WorkerJob;
    use std::io;
    use std::thread::{self, JoinHandle};

    fn letters() -> Vec<String> {
        ["a", "b", "c", "d", "e"].iter().map(|s| s.to_string()).collect()
    }

    fn nz(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).unwrap()
    }

    /// Holds every worker except `fast` back for a while before it starts scanning
    struct StaggeredSpawner {
        fast: usize,
        delay: Duration,
    }

    impl Spawner for StaggeredSpawner {
        fn spawn(&self, worker: usize, job: WorkerJob) -> io::Result<JoinHandle<()>> {
            let delay = if worker == self.fast {
                Duration::ZERO
            } else {
                self.delay
            };
            Ok(thread::spawn(move || {
                thread::sleep(delay);
                job();
            }))
        }
    }

    /// Fails to launch worker `fail_at`; earlier workers idle until cancelled
    struct FailingSpawner {
        fail_at: usize,
    }

    impl Spawner for FailingSpawner {
        fn spawn(&self, worker: usize, job: WorkerJob) -> io::Result<JoinHandle<()>> {
            if worker == self.fail_at {
                return Err(io::Error::new(io::ErrorKind::WouldBlock, "out of threads"));
            }
            Ok(thread::spawn(move || {
                thread::sleep(Duration::from_millis(50));
                job();
            }))
        }
    }

    #[test]
    fn test_sections_for_example() {
        let coordinator = Coordinator::new(letters(), "c", nz(2));
        assert_eq!(
            coordinator.sections(),
            vec![Section::new(0, 3), Section::new(3, 5)]
        );
    }

    #[test]
    fn test_found_in_first_section() {
        let report = Coordinator::new(letters(), "c", nz(2)).run();
        assert!(matches!(report.verdict, Verdict::Success { position: 2 }));
        assert_eq!(report.state(), RaceState::Succeeded);
        assert_eq!(report.winner().map(|w| w.worker), Some(0));
    }

    #[test]
    fn test_missing_key_exhausts() {
        let report = Coordinator::new(letters(), "z", nz(5)).run();
        assert!(matches!(report.verdict, Verdict::Failure));
        assert_eq!(report.completions_observed, 5);
        assert!(report
            .workers
            .iter()
            .all(|w| w.status == WorkerStatus::Completed(Outcome::NotFound)));
        assert_eq!(report.total_scanned(), 5);
    }

    #[test]
    fn test_more_workers_than_items() {
        let coordinator = Coordinator::new(letters(), "e", nz(10));
        let sections = coordinator.sections();
        assert_eq!(sections.iter().filter(|s| s.is_empty()).count(), 5);

        let report = coordinator.run();
        assert!(matches!(report.verdict, Verdict::Success { position: 4 }));
        assert_eq!(report.workers.len(), 10);
    }

    #[test]
    fn test_outstanding_workers_cancelled_once() {
        let data: Vec<String> = (0..4000).map(|i| format!("item-{i}")).collect();
        let metrics = RaceMetrics::new();
        let report = Coordinator::new(data, "item-5", nz(4))
            .with_spawner(StaggeredSpawner {
                fast: 0,
                delay: Duration::from_millis(200),
            })
            .with_metrics(metrics.clone())
            .run();

        assert!(matches!(report.verdict, Verdict::Success { position: 5 }));
        assert_eq!(report.completions_observed, 1);
        for summary in &report.workers[1..] {
            assert_eq!(summary.status, WorkerStatus::Cancelled);
            assert_eq!(summary.cancel_requests, 1);
        }
        assert_eq!(report.workers[0].cancel_requests, 0);
        assert_eq!(metrics.get_stats().cancellations, 3);
    }

    #[test]
    fn test_launch_failure_aborts() {
        let data: Vec<String> = (0..50).map(|i| i.to_string()).collect();
        let metrics = RaceMetrics::new();
        let report = Coordinator::new(data, "10", nz(5))
            .with_spawner(FailingSpawner { fail_at: 2 })
            .with_metrics(metrics.clone())
            .run();

        match &report.verdict {
            Verdict::InfrastructureError(RaceError::Spawn { worker, .. }) => assert_eq!(*worker, 2),
            other => panic!("unexpected verdict {:?}", other),
        }
        assert_eq!(report.workers.len(), 2);
        assert!(report.workers.iter().all(|w| w.cancel_requests == 1));
        let stats = metrics.get_stats();
        assert_eq!(stats.workers_launched, 2);
        assert_eq!(stats.launch_failures, 1);
    }

    #[test]
    fn test_abort_handle() {
        let data: Vec<String> = (0..100).map(|i| i.to_string()).collect();
        let coordinator = Coordinator::new(data, "nope", nz(3)).with_spawner(StaggeredSpawner {
            fast: usize::MAX,
            delay: Duration::from_millis(300),
        });
        coordinator.abort_handle().abort();

        let report = coordinator.run();
        assert!(matches!(
            report.verdict,
            Verdict::InfrastructureError(RaceError::Aborted)
        ));
        assert_eq!(report.cancelled_workers().count(), 3);
    }

    #[test]
    fn test_deadline_exceeded() {
        let data: Vec<String> = (0..100).map(|i| i.to_string()).collect();
        let report = Coordinator::new(data, "nope", nz(2))
            .with_spawner(StaggeredSpawner {
                fast: usize::MAX,
                delay: Duration::from_millis(500),
            })
            .with_deadline(Duration::from_millis(20))
            .run();

        assert!(matches!(
            report.verdict,
            Verdict::InfrastructureError(RaceError::DeadlineExceeded { .. })
        ));
        assert_eq!(report.state(), RaceState::Aborted);
    }

    #[test]
    fn test_unrepresentable_deadline_never_fires() {
        let found = Coordinator::new(letters(), "d", nz(2))
            .with_deadline(Duration::MAX)
            .run();
        assert!(matches!(found.verdict, Verdict::Success { position: 3 }));

        let missing = Coordinator::new(letters(), "z", nz(3))
            .with_deadline(Duration::MAX)
            .run();
        assert!(matches!(missing.verdict, Verdict::Failure));
        assert_eq!(missing.completions_observed, 3);
    }
}
