//! Configuration Management
//!
//! Unified configuration system with hierarchical resolution:
//! 1. Built-in defaults (including the model catalog)
//! 2. Global config (~/.config/modelarena/config.toml)
//! 3. Project config (.modelarena/config.toml)
//! 4. Environment variables (platform names, then MODELARENA_*)
//! 5. CLI arguments (highest priority)

mod loader;
mod types;

pub use loader::ConfigLoader;
pub use types::*;
