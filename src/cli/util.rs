//! CLI Common Utilities
//!
//! Shared configuration loading and service construction for CLI commands.

use std::path::Path;

use crate::benchmark::BenchmarkService;
use crate::config::{Config, ConfigLoader};
use crate::types::Result;

/// Load config from an explicit file, or through the full resolution chain
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => ConfigLoader::load_from_file(path),
        None => ConfigLoader::load(),
    }
}

/// Command execution context
///
/// Configuration plus a service wired from it (adapters, gate, catalog,
/// snapshot cache).
pub struct CommandContext {
    pub config: Config,
    pub service: BenchmarkService,
}

impl CommandContext {
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let config = load_config(config_path)?;
        let service = BenchmarkService::from_config(&config)?;
        Ok(Self { config, service })
    }
}
