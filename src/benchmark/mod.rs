//! Benchmark Core
//!
//! Model catalog, the execution orchestrator, result snapshots and the
//! service that ties runs to the snapshot cache.

pub mod catalog;
pub mod gate;
pub mod progress;
pub mod runner;
pub mod service;
pub mod snapshot;

pub use catalog::ModelCatalog;
pub use gate::{AccessGate, secrets_match};
pub use progress::{ProgressEvent, ProgressTracker, RunProgress, progress_label};
pub use runner::{BenchmarkRunner, RunRequest};
pub use service::{BenchmarkService, PlannedRun, RefreshPlan, RefreshReport, RunReport};
pub use snapshot::{ERROR_PREFIX, ResultEntry, RunOutcome, Snapshot, run_timestamp};
