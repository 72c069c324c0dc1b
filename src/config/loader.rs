//! Configuration Loader (Figment-based)
//!
//! Loads and merges configuration from multiple sources using Figment:
//! 1. Built-in defaults (Serialized)
//! 2. Global config (~/.config/modelarena/config.toml)
//! 3. Project config (.modelarena/config.toml)
//! 4. Conventional deployment env vars (CRON_SECRET, KV_REST_API_URL, ...)
//! 5. Environment variables (MODELARENA_* prefix, `__` separates sections)

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
    value::Uncased,
};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::types::Config;
use crate::types::{ArenaError, Result};

/// Env vars a hosting platform typically injects, and where they land
const PLATFORM_ENV: &[(&str, &str)] = &[
    ("CRON_SECRET", "auth.cron_secret"),
    ("IMAGE_PASSWORD", "auth.image_password"),
    ("KV_REST_API_URL", "cache.kv_url"),
    ("KV_REST_API_TOKEN", "cache.kv_token"),
];

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with full resolution chain using Figment:
    /// defaults → global → project → platform env → prefixed env
    pub fn load() -> Result<Config> {
        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));

        if let Some(global_path) = Self::global_config_path()
            && global_path.exists()
        {
            debug!("Loading global config from: {}", global_path.display());
            figment = figment.merge(Toml::file(&global_path));
        }

        let project_path = Self::project_config_path();
        if project_path.exists() {
            debug!("Loading project config from: {}", project_path.display());
            figment = figment.merge(Toml::file(&project_path));
        }

        Self::extract(Self::with_env(figment))
    }

    /// Load configuration from a specific file only (plus env overrides)
    pub fn load_from_file(path: &Path) -> Result<Config> {
        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(path));
        Self::extract(Self::with_env(figment))
    }

    fn with_env(figment: Figment) -> Figment {
        let names: Vec<&str> = PLATFORM_ENV.iter().map(|(name, _)| *name).collect();

        figment
            .merge(Env::raw().only(&names).map(|key| {
                PLATFORM_ENV
                    .iter()
                    .find(|(name, _)| key == *name)
                    .map(|(_, path)| Uncased::from(*path))
                    .unwrap_or_else(|| Uncased::from(key.as_str().to_string()))
            }))
            // e.g. MODELARENA_AUTH__CRON_SECRET -> auth.cron_secret
            .merge(Env::prefixed("MODELARENA_").split("__").lowercase(true))
    }

    fn extract(figment: Figment) -> Result<Config> {
        let config: Config = figment
            .extract()
            .map_err(|e| ArenaError::Config(format!("Configuration error: {}", e)))?;

        config.validate()?;

        Ok(config)
    }

    // =========================================================================
    // Path Management
    // =========================================================================

    /// Get path to global config directory (~/.config/modelarena/)
    pub fn global_dir() -> Option<PathBuf> {
        env::var("XDG_CONFIG_HOME")
            .ok()
            .map(PathBuf::from)
            .or_else(|| {
                env::var("HOME")
                    .ok()
                    .map(|home| PathBuf::from(home).join(".config"))
            })
            .map(|p| p.join("modelarena"))
    }

    /// Get path to global config file
    pub fn global_config_path() -> Option<PathBuf> {
        Self::global_dir().map(|dir| dir.join("config.toml"))
    }

    /// Get path to project config file
    pub fn project_config_path() -> PathBuf {
        Self::project_dir().join("config.toml")
    }

    /// Get project data directory
    pub fn project_dir() -> PathBuf {
        PathBuf::from(".modelarena")
    }

    // =========================================================================
    // Config Commands
    // =========================================================================

    /// Show config file paths
    pub fn show_path() {
        println!("Configuration paths:");
        println!();

        if let Some(global) = Self::global_config_path() {
            let exists = if global.exists() { "✓" } else { "✗" };
            println!("  Global:  {} {}", exists, global.display());
        } else {
            println!("  Global:  (not available)");
        }

        let project = Self::project_config_path();
        let exists = if project.exists() { "✓" } else { "✗" };
        println!("  Project: {} {}", exists, project.display());
    }

    /// Show current effective configuration (secrets omitted)
    pub fn show_config(config: &Config, as_json: bool) -> Result<()> {
        if as_json {
            println!("{}", serde_json::to_string_pretty(config)?);
        } else {
            println!(
                "{}",
                toml::to_string_pretty(config).map_err(|e| ArenaError::Config(e.to_string()))?
            );
        }

        Ok(())
    }

    // =========================================================================
    // Initialization
    // =========================================================================

    /// Write a starter config file; returns its path
    pub fn init(global: bool, force: bool) -> Result<PathBuf> {
        let dir = if global {
            Self::global_dir().ok_or_else(|| {
                ArenaError::Config("Cannot determine global config directory".to_string())
            })?
        } else {
            Self::project_dir()
        };

        fs::create_dir_all(&dir)?;

        let config_path = dir.join("config.toml");
        if !config_path.exists() || force {
            fs::write(&config_path, Self::starter_config())?;
            info!("Created config: {}", config_path.display());
        } else {
            info!("Config exists: {}", config_path.display());
        }

        Ok(config_path)
    }

    /// Starter config content (TOML)
    fn starter_config() -> String {
        r#"# modelarena configuration
# Secrets are better supplied via env vars:
#   OPENROUTER_API_KEY, OPENAI_API_KEY, REPLICATE_API_TOKEN,
#   CRON_SECRET, IMAGE_PASSWORD, KV_REST_API_URL, KV_REST_API_TOKEN

version = "1.0"

[server]
bind = "127.0.0.1:3000"

[providers]
timeout_secs = 300

[retry]
default_wait_secs = 10
padding_secs = 1

[cache]
# auto | disabled | sqlite | kv-rest
backend = "auto"
sqlite_path = ".modelarena/cache.db"

# Override the built-in catalog by listing models here:
# [[models]]
# id = "anthropic/claude-sonnet-4"
# display_name = "Claude Sonnet 4"
# provider = "openrouter"
# category = "code"

# [[tasks]]
# category = "code"
# prompt_file = "prompts/code.txt"
"#
        .to_string()
    }
}
