//! Serve Command
//!
//! Starts the HTTP API.

use std::path::Path;

use crate::cli::util::CommandContext;
use crate::server::{self, AppState};
use crate::types::Result;

pub async fn run(config_path: Option<&Path>, bind: Option<String>) -> Result<()> {
    let ctx = CommandContext::load(config_path)?;
    let bind = bind.unwrap_or_else(|| ctx.config.server.bind.clone());

    tracing::info!("Cache backend: {}", ctx.service.cache().backend_name());

    let state = AppState::new(ctx.service, ctx.config.auth.cron_secret.as_deref());
    server::serve(state, &bind).await
}
