//! Config Command
//!
//! Manage modelarena configuration.
//!
//! Usage:
//!   modelarena config show [-f json]
//!   modelarena config path
//!   modelarena config init [-g] [--force]

use std::path::Path;

use crate::cli::util::load_config;
use crate::config::ConfigLoader;
use crate::types::Result;

/// Show the merged effective configuration
pub fn show(config_path: Option<&Path>, format: &str) -> Result<()> {
    let config = load_config(config_path)?;
    ConfigLoader::show_config(&config, format == "json")
}

/// Show configuration paths
pub fn path() -> Result<()> {
    ConfigLoader::show_path();
    Ok(())
}

/// Write a starter configuration file
pub fn init(global: bool, force: bool) -> Result<()> {
    let path = ConfigLoader::init(global, force)?;
    println!("✓ Initialized configuration");
    println!("  Config: {}", path.display());
    Ok(())
}
