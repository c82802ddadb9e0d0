use std::num::NonZeroUsize;
use std::sync::Arc;
use tracing::{debug, info};

use super::coordinator::Coordinator;
use crate::config::RaceConfig;
use crate::dataset::{load_dataset, Dataset};
use crate::errors::{SearchError, SearchResult};
use crate::metrics::RaceMetrics;
use crate::results::SearchReport;

/// What a configured search produced
#[derive(Debug)]
pub enum SearchOutcome {
    /// The dataset had no lines, so no race was run
    EmptyDataset,
    /// A race ran to a verdict
    Raced(SearchReport),
}

impl SearchOutcome {
    pub fn report(&self) -> Option<&SearchReport> {
        match self {
            SearchOutcome::EmptyDataset => None,
            SearchOutcome::Raced(report) => Some(report),
        }
    }
}

/// Validates a raw worker count
pub fn worker_count(raw: usize) -> SearchResult<NonZeroUsize> {
    NonZeroUsize::new(raw)
        .ok_or_else(|| SearchError::usage("NUMBER OF WORKERS must be a positive integer"))
}

/// Races `workers` threads over an in-memory dataset
pub fn race_search(
    dataset: impl Into<Dataset>,
    key: &str,
    workers: usize,
) -> SearchResult<SearchReport> {
    let workers = worker_count(workers)?;
    Ok(Coordinator::new(dataset, key, workers).run())
}

/// Loads the configured dataset and races over it.
///
/// Loading and configuration problems are returned as errors before any worker
/// is launched. An empty dataset short-circuits without building a coordinator.
pub fn search(config: &RaceConfig) -> SearchResult<SearchOutcome> {
    search_with_metrics(config, RaceMetrics::new())
}

/// Like [`search`], recording into caller-supplied metrics
pub fn search_with_metrics(
    config: &RaceConfig,
    metrics: RaceMetrics,
) -> SearchResult<SearchOutcome> {
    let deadline = config.deadline()?;
    info!(
        "Searching {} for {:?} with {} workers",
        config.dataset_path.display(),
        config.key,
        config.worker_count
    );

    let lines = load_dataset(&config.dataset_path, config.encoding_mode)?;
    if lines.is_empty() {
        debug!("Dataset is empty, skipping the race");
        return Ok(SearchOutcome::EmptyDataset);
    }

    let dataset: Dataset = Arc::from(lines);
    let mut coordinator = Coordinator::new(dataset, config.key.as_str(), config.worker_count)
        .with_metrics(metrics);
    if let Some(deadline) = deadline {
        coordinator = coordinator.with_deadline(deadline);
    }

    Ok(SearchOutcome::Raced(coordinator.run()))
}
