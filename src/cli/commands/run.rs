//! Run Command
//!
//! Benchmark one category from the terminal.
//!
//! Usage:
//!   modelarena run code [--model <id>]... [--prompt <text> | --prompt-file <path>]
//!   modelarena run image --password <secret>
//!   modelarena run ascii --json

use std::path::{Path, PathBuf};

use crate::benchmark::RunRequest;
use crate::cli::progress::ConsoleRenderer;
use crate::cli::ui::Output;
use crate::cli::util::CommandContext;
use crate::types::{ArenaError, Category, Result};

pub struct RunOptions {
    pub category: Category,
    /// Empty selects every catalog model of the category
    pub models: Vec<String>,
    pub prompt: Option<String>,
    pub prompt_file: Option<PathBuf>,
    pub password: Option<String>,
    pub json: bool,
}

pub async fn run(config_path: Option<&Path>, options: RunOptions) -> Result<()> {
    let ctx = CommandContext::load(config_path)?;
    let prompt = resolve_prompt(&ctx, &options).await?;

    let model_ids = if options.models.is_empty() {
        ctx.service
            .runner()
            .catalog()
            .for_category(options.category)
            .into_iter()
            .map(|m| m.id)
            .collect()
    } else {
        options.models
    };

    let request = RunRequest {
        category: options.category,
        prompt,
        model_ids,
        password: options.password,
    };

    let renderer = (!options.json)
        .then(|| ConsoleRenderer::new(ctx.service.runner().progress(), 1).spawn());

    let result = ctx.service.run_benchmark(&request).await;
    let report = match result {
        Ok(report) => report,
        Err(e) => {
            if let Some(handle) = renderer {
                handle.abort();
            }
            return Err(e);
        }
    };
    if let Some(handle) = renderer {
        let _ = handle.await;
    }

    let fragment = report.outcome.fragment();
    if options.json {
        println!("{}", serde_json::to_string_pretty(&fragment)?);
        return Ok(());
    }

    let out = Output::new();
    out.section(&format!("{} results", options.category));
    out.entries(&fragment);

    if report.persisted.is_persisted() {
        out.success(&format!(
            "Snapshot saved ({} entries)",
            report.snapshot.len()
        ));
    } else if ctx.service.cache().is_enabled() {
        out.warning("Snapshot could not be saved");
    } else {
        out.info("Cache disabled; snapshot not saved");
    }

    Ok(())
}

/// Explicit prompt, then prompt file, then the category's configured task
async fn resolve_prompt(ctx: &CommandContext, options: &RunOptions) -> Result<String> {
    if let Some(text) = &options.prompt {
        return Ok(text.clone());
    }

    if let Some(path) = &options.prompt_file {
        return tokio::fs::read_to_string(path).await.map_err(|e| {
            ArenaError::invalid_request(format!(
                "Failed to read prompt file {}: {}",
                path.display(),
                e
            ))
        });
    }

    match ctx.config.task(options.category) {
        Some(task) => task.load_prompt().await,
        None => Err(ArenaError::invalid_request(format!(
            "No prompt given and no task configured for {}",
            options.category
        ))),
    }
}
