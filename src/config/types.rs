//! Configuration Types
//!
//! All configuration structures with sensible defaults.
//! Supports global (~/.config/modelarena/) and project (.modelarena/) level configuration.

use std::collections::HashSet;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::benchmark::catalog;
use crate::constants::{cache as cache_constants, network, throttle};
use crate::types::{ArenaError, Category, Provider, Result};

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Configuration version
    pub version: String,

    /// HTTP API settings
    pub server: ServerConfig,

    /// Shared secrets
    pub auth: AuthConfig,

    /// Provider endpoints and credentials
    pub providers: ProvidersConfig,

    /// Throttle retry and image polling
    pub retry: RetryConfig,

    /// Snapshot cache backend
    pub cache: CacheConfig,

    /// Model catalog, in configuration order
    pub models: Vec<Model>,

    /// One benchmark task per category
    pub tasks: Vec<BenchmarkTask>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            server: ServerConfig::default(),
            auth: AuthConfig::default(),
            providers: ProvidersConfig::default(),
            retry: RetryConfig::default(),
            cache: CacheConfig::default(),
            models: catalog::default_models(),
            tasks: catalog::default_tasks(),
        }
    }
}

impl Config {
    /// Validate configuration values are within acceptable ranges.
    /// Returns `ArenaError::Config` on validation failure.
    pub fn validate(&self) -> Result<()> {
        if self.providers.timeout_secs == 0 {
            return Err(ArenaError::Config(
                "providers.timeout_secs must be greater than 0".to_string(),
            ));
        }

        if self.retry.max_polls == 0 {
            return Err(ArenaError::Config(
                "retry.max_polls must be greater than 0".to_string(),
            ));
        }

        for provider in [Provider::OpenRouter, Provider::OpenAi, Provider::Replicate] {
            if let Some(base) = &self.providers.endpoint(provider).api_base {
                validate_url(&format!("providers.{}.api_base", provider), base)?;
            }
        }
        if let Some(kv_url) = &self.cache.kv_url {
            validate_url("cache.kv_url", kv_url)?;
        }

        let mut seen = HashSet::new();
        for model in &self.models {
            if model.id.trim().is_empty() {
                return Err(ArenaError::Config("Model id must not be empty".to_string()));
            }
            if !model.provider.supports(model.category) {
                return Err(ArenaError::Config(format!(
                    "Model '{}': provider {} cannot serve category {}",
                    model.id, model.provider, model.category
                )));
            }
            if !seen.insert((model.category, model.id.as_str())) {
                return Err(ArenaError::Config(format!(
                    "Duplicate model '{}' in category {}",
                    model.id, model.category
                )));
            }
        }

        let mut task_categories = HashSet::new();
        for task in &self.tasks {
            task.prompt_source()?;
            if !task_categories.insert(task.category) {
                return Err(ArenaError::Config(format!(
                    "Duplicate task for category {}",
                    task.category
                )));
            }
        }

        Ok(())
    }

    /// Task definition for a category, if configured
    pub fn task(&self, category: Category) -> Option<&BenchmarkTask> {
        self.tasks.iter().find(|t| t.category == category)
    }
}

/// Absolute http(s) URL check for endpoint overrides
fn validate_url(field: &str, value: &str) -> Result<()> {
    let parsed = url::Url::parse(value)
        .map_err(|e| ArenaError::Config(format!("{} is not a valid URL: {}", field, e)))?;

    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(ArenaError::Config(format!(
            "{} must use http or https, got '{}'",
            field, other
        ))),
    }
}

// =============================================================================
// Server Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Socket address the API listens on
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: network::DEFAULT_BIND.to_string(),
        }
    }
}

// =============================================================================
// Auth Configuration
// =============================================================================

/// Shared secrets. Never serialized to output.
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Password required to run the image category (unset = open)
    #[serde(skip_serializing)]
    pub image_password: Option<String>,

    /// Bearer token required by the scheduled refresh endpoint
    #[serde(skip_serializing)]
    pub cron_secret: Option<String>,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field(
                "image_password",
                &self.image_password.as_ref().map(|_| "[REDACTED]"),
            )
            .field("cron_secret", &self.cron_secret.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

// =============================================================================
// Provider Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvidersConfig {
    /// Request timeout in seconds (applies to every provider call)
    pub timeout_secs: u64,
    pub openrouter: EndpointConfig,
    pub openai: EndpointConfig,
    pub replicate: EndpointConfig,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            timeout_secs: network::DEFAULT_TIMEOUT_SECS,
            openrouter: EndpointConfig::default(),
            openai: EndpointConfig::default(),
            replicate: EndpointConfig::default(),
        }
    }
}

impl ProvidersConfig {
    pub fn endpoint(&self, provider: Provider) -> &EndpointConfig {
        match provider {
            Provider::OpenRouter => &self.openrouter,
            Provider::OpenAi => &self.openai,
            Provider::Replicate => &self.replicate,
        }
    }
}

/// Endpoint override and credential for one provider
///
/// Note: API keys are never serialized to output and are redacted in debug
/// output. Adapters convert the key to SecretString internally.
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointConfig {
    /// API base URL (for custom endpoints)
    pub api_base: Option<String>,
    /// API key; falls back to the provider's standard env var
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
}

impl std::fmt::Debug for EndpointConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EndpointConfig")
            .field("api_base", &self.api_base)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

// =============================================================================
// Retry Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Wait when upstream throttles without a retry hint (seconds)
    pub default_wait_secs: u64,
    /// Added to an upstream retry hint (seconds)
    pub padding_secs: u64,
    /// Interval between image prediction polls (milliseconds)
    pub poll_interval_ms: u64,
    /// Maximum image prediction polls before giving up
    pub max_polls: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            default_wait_secs: throttle::DEFAULT_WAIT_SECS,
            padding_secs: throttle::RETRY_AFTER_PADDING_SECS,
            poll_interval_ms: crate::constants::image::POLL_INTERVAL_MS,
            max_polls: crate::constants::image::MAX_POLLS,
        }
    }
}

// =============================================================================
// Cache Configuration
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum CacheBackend {
    /// kv-rest when URL and token are set, else sqlite when a path is set,
    /// else disabled
    #[default]
    Auto,
    Disabled,
    Sqlite,
    KvRest,
}

impl std::fmt::Display for CacheBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheBackend::Auto => write!(f, "auto"),
            CacheBackend::Disabled => write!(f, "disabled"),
            CacheBackend::Sqlite => write!(f, "sqlite"),
            CacheBackend::KvRest => write!(f, "kv-rest"),
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub backend: CacheBackend,
    /// SQLite database file
    pub sqlite_path: Option<PathBuf>,
    /// Redis-over-REST endpoint
    pub kv_url: Option<String>,
    #[serde(skip_serializing)]
    pub kv_token: Option<String>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: CacheBackend::Auto,
            sqlite_path: None,
            kv_url: None,
            kv_token: None,
        }
    }
}

impl std::fmt::Debug for CacheConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheConfig")
            .field("backend", &self.backend)
            .field("sqlite_path", &self.sqlite_path)
            .field("kv_url", &self.kv_url)
            .field("kv_token", &self.kv_token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl CacheConfig {
    /// Backend after resolving `auto`
    pub fn resolved_backend(&self) -> CacheBackend {
        match self.backend {
            CacheBackend::Auto => {
                if self.kv_url.is_some() && self.kv_token.is_some() {
                    CacheBackend::KvRest
                } else if self.sqlite_path.is_some() {
                    CacheBackend::Sqlite
                } else {
                    CacheBackend::Disabled
                }
            }
            explicit => explicit,
        }
    }

    pub fn sqlite_path_or_default(&self) -> PathBuf {
        self.sqlite_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(cache_constants::DEFAULT_SQLITE_PATH))
    }
}

// =============================================================================
// Model Catalog & Tasks
// =============================================================================

/// One addressable backend configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Model {
    /// Provider-specific model identifier
    pub id: String,
    pub display_name: String,
    pub provider: Provider,
    pub category: Category,
}

impl Model {
    pub fn new(
        id: impl Into<String>,
        display_name: impl Into<String>,
        provider: Provider,
        category: Category,
    ) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            provider,
            category,
        }
    }

    /// Snapshot key for this model's result
    pub fn result_key(&self) -> String {
        crate::types::result_key(self.category, &self.id)
    }
}

/// Where a category's prompt comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptSource {
    Inline(String),
    File(PathBuf),
}

/// Benchmark task definition for one category
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkTask {
    pub category: Category,
    /// Inline prompt text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    /// Prompt file path (relative to the working directory)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_file: Option<PathBuf>,
}

impl BenchmarkTask {
    pub fn inline(category: Category, prompt: impl Into<String>) -> Self {
        Self {
            category,
            prompt: Some(prompt.into()),
            prompt_file: None,
        }
    }

    /// Exactly one of `prompt` / `prompt_file` must be set
    pub fn prompt_source(&self) -> Result<PromptSource> {
        match (&self.prompt, &self.prompt_file) {
            (Some(text), None) => Ok(PromptSource::Inline(text.clone())),
            (None, Some(path)) => Ok(PromptSource::File(path.clone())),
            (Some(_), Some(_)) => Err(ArenaError::Config(format!(
                "Task {}: set either prompt or prompt_file, not both",
                self.category
            ))),
            (None, None) => Err(ArenaError::Config(format!(
                "Task {}: prompt or prompt_file is required",
                self.category
            ))),
        }
    }

    /// Read the prompt text
    pub async fn load_prompt(&self) -> Result<String> {
        match self.prompt_source()? {
            PromptSource::Inline(text) => Ok(text),
            PromptSource::File(path) => {
                let text = tokio::fs::read_to_string(&path).await.map_err(|e| {
                    ArenaError::Config(format!(
                        "Failed to read prompt file {}: {}",
                        path.display(),
                        e
                    ))
                })?;
                Ok(text.trim().to_string())
            }
        }
    }
}
