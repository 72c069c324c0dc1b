//! Cache Command
//!
//! Inspect or clear the stored snapshot.

use std::path::Path;

use crate::cli::ui::Output;
use crate::cli::util::CommandContext;
use crate::types::Result;

pub async fn show(config_path: Option<&Path>, as_json: bool) -> Result<()> {
    let ctx = CommandContext::load(config_path)?;
    let cache = ctx.service.cache();
    let out = Output::new();

    let snapshot = ctx.service.cached().await;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
        return Ok(());
    }

    if !cache.is_enabled() {
        out.info("Cache disabled");
        return Ok(());
    }

    match snapshot {
        Some(snapshot) => {
            out.section(&format!(
                "Snapshot ({}) {}",
                cache.backend_name(),
                snapshot.timestamp.format("%Y-%m-%d %H:%M:%S UTC")
            ));
            out.entries(&snapshot);
            println!();
            println!("  Total: {} entries", snapshot.len());
        }
        None => out.info("No cached results available"),
    }

    Ok(())
}

pub async fn clear(config_path: Option<&Path>) -> Result<()> {
    let ctx = CommandContext::load(config_path)?;
    ctx.service.cache().clear().await?;
    Output::new().success("Cleared cached snapshot");
    Ok(())
}
