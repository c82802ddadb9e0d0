pub mod config;
pub mod dataset;
pub mod errors;
pub mod metrics;
pub mod partition;
pub mod results;
pub mod search;

pub use config::{EncodingMode, RaceConfig};
pub use dataset::{load_dataset, Dataset};
pub use errors::{RaceError, SearchError, SearchResult};
pub use metrics::{RaceMetrics, RaceStats};
pub use partition::{partition, Section};
pub use results::{RaceState, SearchReport, Verdict, WorkerStatus, WorkerSummary};
pub use search::{
    race_search, search, search_with_metrics, Coordinator, Outcome, SearchOutcome,
};
