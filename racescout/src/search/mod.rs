//! Partition-and-race search.
//!
//! The pieces, leaf first:
//!
//! 1. **Worker** ([`worker`]): scans one section of the shared dataset and sends a
//!    single completion event, `Found`, `NotFound`, or a failure. Each worker owns
//!    its own [`CancelToken`].
//! 2. **Spawner** ([`spawner`]): launches a worker as an independent thread. Launch
//!    errors are reported, not panicked on.
//! 3. **Handle** ([`handle`]): the coordinator's record of a launched worker, used
//!    to cancel it and to join it.
//! 4. **Coordinator** ([`coordinator`]): partitions, launches, drains completion
//!    events in arrival order, and decides the verdict.
//!
//! ```rust,ignore
//! let report = Coordinator::new(lines, "needle", NonZeroUsize::new(8).unwrap())
//!     .with_deadline(Duration::from_secs(2))
//!     .run();
//!
//! match report.verdict {
//!     Verdict::Success { position } => println!("line {}", position + 1),
//!     Verdict::Failure => println!("No string found"),
//!     Verdict::InfrastructureError(e) => eprintln!("{e}"),
//! }
//! ```
//!
//! # Ordering
//!
//! Nothing is promised about the order in which workers finish. When the key
//! occurs in several sections, whichever `Found` reaches the coordinator first
//! decides the verdict, and that can change from run to run.
pub mod coordinator;
pub mod engine;
pub mod handle;
pub mod spawner;
pub mod worker;

pub use coordinator::{AbortHandle, Coordinator};
pub use engine::{race_search, search, search_with_metrics, SearchOutcome};
pub use handle::WorkerHandle;
pub use spawner::{Spawner, ThreadSpawner, WorkerJob};
pub use worker::{search_section, CancelToken, Completion, Outcome, Scan, WorkerFailure};
