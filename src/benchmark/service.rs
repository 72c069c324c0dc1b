//! Benchmark Service
//!
//! Composes the orchestrator with the snapshot cache. Cache reads and
//! writes are best-effort: a run's result never depends on them.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, instrument, warn};

use super::runner::{BenchmarkRunner, RunRequest};
use super::snapshot::{RunOutcome, Snapshot, run_timestamp};
use crate::config::{BenchmarkTask, Config, Model};
use crate::storage::{CacheWrite, SnapshotCache};
use crate::types::{Category, Result};

/// Result of one interactive run
#[derive(Debug, Clone)]
pub struct RunReport {
    pub outcome: RunOutcome,
    /// Previous snapshot with this run merged in
    pub snapshot: Snapshot,
    pub persisted: CacheWrite,
}

/// Result of a full scheduled refresh
#[derive(Debug, Clone)]
pub struct RefreshReport {
    pub timestamp: DateTime<Utc>,
    pub results_count: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Categories left out because their prompt could not be resolved
    pub skipped: Vec<Category>,
    pub persisted: CacheWrite,
}

/// One category ready to run during a refresh
#[derive(Debug, Clone)]
pub struct PlannedRun {
    pub category: Category,
    pub prompt: String,
    pub models: Vec<Model>,
}

/// Categories a refresh will run, resolved up front
#[derive(Debug, Clone, Default)]
pub struct RefreshPlan {
    pub runs: Vec<PlannedRun>,
    pub skipped: Vec<Category>,
}

pub struct BenchmarkService {
    runner: Arc<BenchmarkRunner>,
    cache: SnapshotCache,
    tasks: Vec<BenchmarkTask>,
}

impl BenchmarkService {
    pub fn new(runner: Arc<BenchmarkRunner>, cache: SnapshotCache, tasks: Vec<BenchmarkTask>) -> Self {
        Self {
            runner,
            cache,
            tasks,
        }
    }

    /// Service wired from configuration (adapters, gate, catalog, cache)
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(
            Arc::new(BenchmarkRunner::from_config(config)?),
            SnapshotCache::open(&config.cache),
            config.tasks.clone(),
        ))
    }

    pub fn runner(&self) -> &BenchmarkRunner {
        &self.runner
    }

    pub fn cache(&self) -> &SnapshotCache {
        &self.cache
    }

    /// Run one category and merge it into the cached snapshot
    pub async fn run_benchmark(&self, request: &RunRequest) -> Result<RunReport> {
        let previous = self.cache.get().await;
        let (outcome, snapshot) = self.runner.run(request, previous).await?;
        let persisted = self.cache.set(&snapshot).await;

        Ok(RunReport {
            outcome,
            snapshot,
            persisted,
        })
    }

    /// Re-run every category over every configured model.
    ///
    /// Categories run one after another and share one timestamp. The result
    /// is merged over the cached snapshot, so models removed from the
    /// catalog keep their last entry.
    pub async fn refresh_all(&self) -> Result<RefreshReport> {
        let plan = self.plan_refresh().await;
        self.refresh(plan).await
    }

    /// Resolve every category's models and prompt before anything runs.
    ///
    /// A category without models is left out silently; one without a task
    /// or with an unreadable prompt is recorded in `skipped`.
    pub async fn plan_refresh(&self) -> RefreshPlan {
        let mut plan = RefreshPlan::default();

        for category in Category::ALL {
            let models = self.runner.catalog().for_category(category);
            if models.is_empty() {
                continue;
            }

            let Some(task) = self.task(category) else {
                warn!("No task configured for {}; skipping", category);
                plan.skipped.push(category);
                continue;
            };

            match task.load_prompt().await {
                Ok(prompt) => plan.runs.push(PlannedRun {
                    category,
                    prompt,
                    models,
                }),
                Err(e) => {
                    warn!("Skipping {}: {}", category, e);
                    plan.skipped.push(category);
                }
            }
        }

        plan
    }

    /// Execute a resolved plan and persist the merged snapshot
    #[instrument(skip_all, fields(categories = plan.runs.len()))]
    pub async fn refresh(&self, plan: RefreshPlan) -> Result<RefreshReport> {
        let timestamp = run_timestamp();
        let mut snapshot = self.cache.get().await;
        let mut succeeded = 0;
        let mut failed = 0;

        for run in &plan.runs {
            let outcome = self
                .runner
                .run_models(run.category, &run.prompt, &run.models, timestamp)
                .await;
            succeeded += outcome.succeeded();
            failed += outcome.failed.len();
            snapshot = Some(Snapshot::merge(snapshot, &outcome));
        }

        let snapshot = snapshot.unwrap_or_else(|| Snapshot::empty(timestamp));
        let persisted = self.cache.set(&snapshot).await;

        info!(
            "Refresh complete: {} entries ({} succeeded, {} failed, {} skipped, persisted: {})",
            snapshot.len(),
            succeeded,
            failed,
            plan.skipped.len(),
            persisted.is_persisted()
        );

        Ok(RefreshReport {
            timestamp: snapshot.timestamp,
            results_count: snapshot.len(),
            succeeded,
            failed,
            skipped: plan.skipped,
            persisted,
        })
    }

    pub async fn cached(&self) -> Option<Snapshot> {
        self.cache.get().await
    }

    /// Replace the cached snapshot wholesale
    pub async fn store(&self, snapshot: &Snapshot) -> CacheWrite {
        self.cache.set(snapshot).await
    }

    fn task(&self, category: Category) -> Option<&BenchmarkTask> {
        self.tasks.iter().find(|t| t.category == category)
    }
}
