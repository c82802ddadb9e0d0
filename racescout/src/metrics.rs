use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// Counters describing one or more races.
///
/// Cloning shares the counters, so a caller can keep a clone and read it after the
/// coordinator has been consumed. Only the coordinator thread records into it.
#[derive(Debug, Clone)]
pub struct RaceMetrics {
    workers_launched: Arc<AtomicU64>,
    launch_failures: Arc<AtomicU64>,
    completions: Arc<AtomicU64>,
    not_found_reports: Arc<AtomicU64>,
    worker_failures: Arc<AtomicU64>,
    cancellations: Arc<AtomicU64>,
    items_scanned: Arc<AtomicU64>,
}

impl RaceMetrics {
    pub fn new() -> Self {
        Self {
            workers_launched: Arc::new(AtomicU64::new(0)),
            launch_failures: Arc::new(AtomicU64::new(0)),
            completions: Arc::new(AtomicU64::new(0)),
            not_found_reports: Arc::new(AtomicU64::new(0)),
            worker_failures: Arc::new(AtomicU64::new(0)),
            cancellations: Arc::new(AtomicU64::new(0)),
            items_scanned: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn record_launch(&self) {
        self.workers_launched.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_launch_failure(&self) {
        self.launch_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a completion event; `scanned` is the number of items the worker compared
    pub fn record_completion(&self, scanned: usize, not_found: bool) {
        self.completions.fetch_add(1, Ordering::Relaxed);
        let total = self
            .items_scanned
            .fetch_add(scanned as u64, Ordering::Relaxed)
            + scanned as u64;
        if not_found {
            self.not_found_reports.fetch_add(1, Ordering::Relaxed);
        }
        debug!("Completion recorded: {} items, {} scanned in total", scanned, total);
    }

    pub fn record_worker_failure(&self) {
        self.completions.fetch_add(1, Ordering::Relaxed);
        self.worker_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cancellation(&self) {
        self.cancellations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get_stats(&self) -> RaceStats {
        RaceStats {
            workers_launched: self.workers_launched.load(Ordering::Relaxed),
            launch_failures: self.launch_failures.load(Ordering::Relaxed),
            completions: self.completions.load(Ordering::Relaxed),
            not_found_reports: self.not_found_reports.load(Ordering::Relaxed),
            worker_failures: self.worker_failures.load(Ordering::Relaxed),
            cancellations: self.cancellations.load(Ordering::Relaxed),
            items_scanned: self.items_scanned.load(Ordering::Relaxed),
        }
    }

    pub fn log_stats(&self) {
        let stats = self.get_stats();
        info!(
            "Race stats:\n\
             Workers launched/failed to launch: {}/{}\n\
             Completions (not found/failed): {} ({}/{})\n\
             Cancellations delivered: {}\n\
             Items scanned: {}",
            stats.workers_launched,
            stats.launch_failures,
            stats.completions,
            stats.not_found_reports,
            stats.worker_failures,
            stats.cancellations,
            stats.items_scanned
        );
    }
}

impl Default for RaceMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of [`RaceMetrics`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RaceStats {
    pub workers_launched: u64,
    pub launch_failures: u64,
    pub completions: u64,
    pub not_found_reports: u64,
    pub worker_failures: u64,
    pub cancellations: u64,
    pub items_scanned: u64,
}
