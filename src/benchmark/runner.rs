//! Execution Orchestrator
//!
//! Runs every requested model for one category under that category's
//! concurrency policy and turns each settled call into a result entry.
//!
//! ## Guarantees
//!
//! - Image models run one at a time in configuration order; each call
//!   (including its throttle retry) settles before the next starts.
//! - Text categories invoke all models at once.
//! - A failing or panicking model becomes an `Error: <message>` entry;
//!   siblings are unaffected and the run itself never fails on their
//!   account.
//! - Every entry of a run shares the run's start timestamp.

use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;
use std::time::Instant;

use chrono::{DateTime, Utc};
use futures::FutureExt;
use futures::future::join_all;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::catalog::ModelCatalog;
use super::gate::AccessGate;
use super::progress::{ProgressTracker, RunProgress};
use super::snapshot::{ResultEntry, RunOutcome, Snapshot, run_timestamp};
use crate::ai::provider::{AdapterRegistry, ProviderOutput, ThrottlePolicy};
use crate::config::{Config, Model};
use crate::types::{ArenaError, Category, Concurrency, ProviderResult, Result};

/// One caller request to benchmark a category
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub category: Category,
    pub prompt: String,
    pub model_ids: Vec<String>,
    pub password: Option<String>,
}

/// A model's settled call
struct Settled {
    key: String,
    entry: ResultEntry,
    success: bool,
}

pub struct BenchmarkRunner {
    registry: AdapterRegistry,
    throttle: ThrottlePolicy,
    gate: AccessGate,
    catalog: ModelCatalog,
    progress: ProgressTracker,
}

impl BenchmarkRunner {
    pub fn new(
        registry: AdapterRegistry,
        throttle: ThrottlePolicy,
        gate: AccessGate,
        catalog: ModelCatalog,
    ) -> Self {
        Self {
            registry,
            throttle,
            gate,
            catalog,
            progress: ProgressTracker::new(),
        }
    }

    /// Runner wired to the built-in adapters
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(
            AdapterRegistry::from_config(&config.providers, &config.retry)?,
            ThrottlePolicy::from_config(&config.retry),
            AccessGate::new(config.auth.image_password.as_deref()),
            ModelCatalog::new(config.models.clone()),
        ))
    }

    pub fn catalog(&self) -> &ModelCatalog {
        &self.catalog
    }

    pub fn progress(&self) -> &ProgressTracker {
        &self.progress
    }

    /// Gate, validate, run and merge into `previous`.
    ///
    /// Returns this run's entries and the merged snapshot. Fails only for
    /// an unauthorized or malformed request, before any model is invoked.
    /// The gate is checked first, so a locked category answers
    /// `Unauthorized` whatever else is wrong with the request.
    #[instrument(skip_all, fields(category = %request.category, models = request.model_ids.len()))]
    pub async fn run(
        &self,
        request: &RunRequest,
        previous: Option<Snapshot>,
    ) -> Result<(RunOutcome, Snapshot)> {
        self.gate
            .check(request.category, request.password.as_deref())?;

        if request.prompt.trim().is_empty() {
            return Err(ArenaError::invalid_request("prompt must not be empty"));
        }

        let models = self.catalog.resolve(request.category, &request.model_ids)?;
        let outcome = self
            .run_models(request.category, &request.prompt, &models, run_timestamp())
            .await;

        let snapshot = Snapshot::merge(previous, &outcome);
        Ok((outcome, snapshot))
    }

    /// Run already-resolved models with no gate check.
    ///
    /// `timestamp` is stamped on every entry.
    pub async fn run_models(
        &self,
        category: Category,
        prompt: &str,
        models: &[Model],
        timestamp: DateTime<Utc>,
    ) -> RunOutcome {
        let run_id = Uuid::new_v4();
        let policy = category.concurrency();
        info!(
            "Run {} started: {} model(s) for {} ({:?})",
            run_id,
            models.len(),
            category,
            policy
        );

        let progress = self.progress.begin_run(run_id, category, models.len());

        let settled = match policy {
            Concurrency::Sequential => {
                let mut settled = Vec::with_capacity(models.len());
                for model in models {
                    settled.push(self.settle(model, prompt, timestamp, &progress).await);
                }
                settled
            }
            Concurrency::Parallel => {
                join_all(
                    models
                        .iter()
                        .map(|model| self.settle(model, prompt, timestamp, &progress)),
                )
                .await
            }
        };

        let mut entries = BTreeMap::new();
        let mut failed = Vec::new();
        for s in settled {
            if !s.success {
                failed.push(s.key.clone());
            }
            entries.insert(s.key, s.entry);
        }

        let outcome = RunOutcome {
            run_id,
            category,
            timestamp,
            entries,
            failed,
        };

        info!(
            "Run {} finished: {} succeeded, {} failed",
            run_id,
            outcome.succeeded(),
            outcome.failed.len()
        );
        progress.finish(outcome.succeeded(), outcome.failed.len());

        outcome
    }

    /// Invoke one model (with throttle retry) and record it as settled
    async fn settle(
        &self,
        model: &Model,
        prompt: &str,
        timestamp: DateTime<Utc>,
        progress: &RunProgress,
    ) -> Settled {
        let key = model.result_key();
        let started = Instant::now();

        let result = AssertUnwindSafe(self.invoke(model, prompt))
            .catch_unwind()
            .await;
        let duration_ms = Some(started.elapsed().as_millis() as u64);

        let (entry, success) = match result {
            Ok(Ok(output)) => (
                ResultEntry::success(output.payload, output.kind, timestamp, duration_ms),
                true,
            ),
            Ok(Err(err)) => {
                warn!("{} failed: {}", key, err.diagnostic());
                (ResultEntry::failure(&err.message, timestamp, duration_ms), false)
            }
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                warn!("{} panicked: {}", key, message);
                (ResultEntry::failure(&message, timestamp, duration_ms), false)
            }
        };

        let completed = progress.model_settled(&key, success);
        info!(
            "{} settled in {}ms ({}/{})",
            key,
            duration_ms.unwrap_or_default(),
            completed,
            progress.total()
        );

        Settled {
            key,
            entry,
            success,
        }
    }

    async fn invoke(&self, model: &Model, prompt: &str) -> ProviderResult<ProviderOutput> {
        let adapter = self.registry.adapter_for(model.provider)?;
        self.throttle
            .run(&model.id, || adapter.invoke(model, prompt))
            .await
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "provider call panicked".to_string())
}
