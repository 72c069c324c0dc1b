//! ModelArena - Side-by-Side AI Model Benchmarks
//!
//! Sends one prompt to many AI models, collects each model's output (text,
//! code, or a generated image) and keeps the latest result per model in a
//! single snapshot that a viewer can render side by side.
//!
//! ## Core Features
//!
//! - **Provider Adapters**: OpenRouter / OpenAI chat and Replicate image
//!   predictions behind one trait
//! - **Throttle Retry**: one retry after an upstream rate-limit response
//! - **Orchestration**: parallel text categories, sequential image category,
//!   per-model failure isolation, live "N/M done" progress
//! - **Snapshot Cache**: SQLite or Redis-over-REST, degrading to no-cache
//! - **HTTP API**: run, cached snapshot, scheduled refresh
//!
//! ## Quick Start
//!
//! ```ignore
//! use modelarena::{BenchmarkService, ConfigLoader, RunRequest, Category};
//!
//! let config = ConfigLoader::load()?;
//! let service = BenchmarkService::from_config(&config)?;
//! let report = service
//!     .run_benchmark(&RunRequest {
//!         category: Category::Ascii,
//!         prompt: "Draw a cat".to_string(),
//!         model_ids: vec!["openai/gpt-4.1".to_string()],
//!         password: None,
//!     })
//!     .await?;
//! ```
//!
//! ## Modules
//!
//! - [`ai`]: provider adapters, throttle policy, output normalization
//! - [`benchmark`]: catalog, access gate, runner, progress, snapshots
//! - [`storage`]: snapshot stores (SQLite pool, Redis-over-REST)
//! - [`server`]: axum HTTP API
//! - [`config`]: layered configuration

pub mod ai;
pub mod benchmark;
pub mod cli;
pub mod config;
pub mod constants;
pub mod server;
pub mod storage;
pub mod types;

// =============================================================================
// Core Re-exports
// =============================================================================

// Configuration
pub use config::{BenchmarkTask, Config, ConfigLoader, Model};

// Error Types
pub use types::error::{ArenaError, ErrorCategory, ProviderError, Result, ResultExt};

// Domain Types
pub use types::{Category, OutputKind, Provider, result_key};

// Providers
pub use ai::{AdapterRegistry, ProviderAdapter, ProviderOutput, ThrottlePolicy};

// Orchestration
pub use benchmark::{
    AccessGate, BenchmarkRunner, BenchmarkService, ProgressEvent, ProgressTracker, ResultEntry,
    RunOutcome, RunRequest, Snapshot,
};

// Storage
pub use storage::{CacheWrite, SnapshotCache, SnapshotStore};
