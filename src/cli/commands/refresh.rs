//! Refresh Command
//!
//! Runs every configured category with its task prompt, the same work the
//! scheduled refresh endpoint does, and stores the merged snapshot.

use std::path::Path;

use crate::cli::progress::ConsoleRenderer;
use crate::cli::ui::Output;
use crate::cli::util::CommandContext;
use crate::types::Result;

pub async fn run(config_path: Option<&Path>) -> Result<()> {
    let ctx = CommandContext::load(config_path)?;
    let out = Output::new();

    let plan = ctx.service.plan_refresh().await;
    for category in &plan.skipped {
        out.warning(&format!("Skipping {}: no usable task prompt", category));
    }
    if plan.runs.is_empty() {
        out.warning("No category has both models and a task configured");
        return Ok(());
    }

    let renderer = ConsoleRenderer::new(ctx.service.runner().progress(), plan.runs.len()).spawn();

    let report = match ctx.service.refresh(plan).await {
        Ok(report) => report,
        Err(e) => {
            renderer.abort();
            return Err(e);
        }
    };
    let _ = renderer.await;

    out.success(&format!(
        "Refreshed {} entries ({} succeeded, {} failed) at {}",
        report.results_count,
        report.succeeded,
        report.failed,
        report.timestamp.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    if !report.persisted.is_persisted() {
        out.warning("Snapshot was not saved to the cache");
    }

    Ok(())
}
