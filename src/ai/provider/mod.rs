//! Provider Adapter Abstraction
//!
//! Defines the ProviderAdapter trait: one implementation per backend,
//! each translating a generic `{model, prompt}` call into its own wire
//! format and returning a normalized payload.
//!
//! ## Modules
//!
//! - `chat`: chat-completion backends (OpenRouter, OpenAI-compatible)
//! - `image`: Replicate image predictions
//! - `throttle`: single-retry policy for throttled calls

mod chat;
mod image;
pub mod throttle;

pub use chat::ChatAdapter;
pub use image::ReplicateAdapter;
pub use throttle::ThrottlePolicy;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use secrecy::SecretString;

use crate::config::{Model, ProvidersConfig, RetryConfig};
use crate::constants::network as net_constants;
use crate::types::{
    ArenaError, ErrorCategory, OutputKind, Provider, ProviderError, ProviderResult, Result,
};

/// Normalized output of one provider call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderOutput {
    /// Text, or a data URI for images
    pub payload: String,
    pub kind: OutputKind,
}

impl ProviderOutput {
    pub fn text(payload: impl Into<String>) -> Self {
        Self {
            payload: payload.into(),
            kind: OutputKind::Text,
        }
    }

    pub fn image(payload: impl Into<String>) -> Self {
        Self {
            payload: payload.into(),
            kind: OutputKind::Image,
        }
    }
}

// =============================================================================
// Provider Adapter Trait
// =============================================================================

/// One backend's translation of a benchmark call
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// Run `prompt` against `model`. Any non-recoverable upstream failure
    /// comes back as a `ProviderError` carrying the upstream message.
    async fn invoke(&self, model: &Model, prompt: &str) -> ProviderResult<ProviderOutput>;

    /// Provider name for logging
    fn name(&self) -> &str;
}

/// Shared adapter type for concurrent use across model invocations
pub type SharedAdapter = Arc<dyn ProviderAdapter>;

/// Dispatch table from provider tag to adapter
#[derive(Clone, Default)]
pub struct AdapterRegistry {
    adapters: HashMap<Provider, SharedAdapter>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the adapter for a provider
    pub fn register(mut self, provider: Provider, adapter: SharedAdapter) -> Self {
        self.adapters.insert(provider, adapter);
        self
    }

    pub fn get(&self, provider: Provider) -> Option<&SharedAdapter> {
        self.adapters.get(&provider)
    }

    /// Adapter for `provider`, or a ProviderError naming the gap
    pub fn adapter_for(&self, provider: Provider) -> ProviderResult<&SharedAdapter> {
        self.get(provider).ok_or_else(|| {
            ProviderError::with_provider(
                ErrorCategory::Unavailable,
                format!("no adapter registered for provider {}", provider),
                provider.as_str(),
            )
        })
    }

    /// Build every built-in adapter from configuration
    pub fn from_config(providers: &ProvidersConfig, retry: &RetryConfig) -> Result<Self> {
        let mut registry = Self::new();
        for provider in [Provider::OpenRouter, Provider::OpenAi, Provider::Replicate] {
            registry = registry.register(provider, create_adapter(provider, providers, retry)?);
        }
        Ok(registry)
    }
}

/// Create the adapter for one provider
pub fn create_adapter(
    provider: Provider,
    providers: &ProvidersConfig,
    retry: &RetryConfig,
) -> Result<SharedAdapter> {
    let client = http_client(providers.timeout_secs)?;
    let endpoint = providers.endpoint(provider);

    Ok(match provider {
        Provider::OpenRouter | Provider::OpenAi => {
            Arc::new(ChatAdapter::new(provider, endpoint, client))
        }
        Provider::Replicate => Arc::new(ReplicateAdapter::new(endpoint, client, retry)),
    })
}

/// HTTP client with the per-request timeout every provider call uses
pub fn http_client(timeout_secs: u64) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .connect_timeout(Duration::from_secs(net_constants::CONNECTION_TIMEOUT_SECS))
        .build()
        .map_err(|e| ArenaError::Config(format!("Failed to create HTTP client: {}", e)))
}

/// Configured key, else the provider's conventional env var
fn resolve_api_key(configured: Option<&String>, env_var: &str) -> Option<SecretString> {
    configured
        .cloned()
        .or_else(|| std::env::var(env_var).ok())
        .filter(|key| !key.trim().is_empty())
        .map(SecretString::from)
}

/// `Retry-After` header in whole seconds
fn retry_after_header(headers: &reqwest::header::HeaderMap) -> Option<Duration> {
    headers
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<f64>().ok())
        .filter(|secs| *secs >= 0.0)
        .map(|secs| Duration::from_secs(secs.ceil() as u64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Category;

    struct Echo;

    #[async_trait]
    impl ProviderAdapter for Echo {
        async fn invoke(&self, model: &Model, prompt: &str) -> ProviderResult<ProviderOutput> {
            Ok(ProviderOutput::text(format!("{}:{}", model.id, prompt)))
        }

        fn name(&self) -> &str {
            "echo"
        }
    }

    #[tokio::test]
    async fn test_registry_dispatch() {
        let registry = AdapterRegistry::new().register(Provider::OpenAi, Arc::new(Echo));
        let model = Model::new("gpt", "GPT", Provider::OpenAi, Category::Code);

        let adapter = registry.adapter_for(Provider::OpenAi).unwrap();
        let output = adapter.invoke(&model, "hi").await.unwrap();
        assert_eq!(output, ProviderOutput::text("gpt:hi"));

        let missing = registry.adapter_for(Provider::Replicate).err().unwrap();
        assert_eq!(missing.category, ErrorCategory::Unavailable);
    }

    #[test]
    fn test_registry_from_default_config() {
        let registry =
            AdapterRegistry::from_config(&ProvidersConfig::default(), &RetryConfig::default())
                .unwrap();
        assert_eq!(registry.get(Provider::OpenRouter).unwrap().name(), "openrouter");
        assert_eq!(registry.get(Provider::OpenAi).unwrap().name(), "openai");
        assert_eq!(registry.get(Provider::Replicate).unwrap().name(), "replicate");
    }

    #[test]
    fn test_resolve_api_key_prefers_config() {
        let configured = "sk-configured".to_string();
        assert!(resolve_api_key(Some(&configured), "MODELARENA_TEST_UNSET_KEY").is_some());
        assert!(resolve_api_key(None, "MODELARENA_TEST_UNSET_KEY").is_none());

        let blank = "   ".to_string();
        assert!(resolve_api_key(Some(&blank), "MODELARENA_TEST_UNSET_KEY").is_none());
    }

    #[test]
    fn test_retry_after_header() {
        let mut headers = reqwest::header::HeaderMap::new();
        assert_eq!(retry_after_header(&headers), None);

        headers.insert(reqwest::header::RETRY_AFTER, "5".parse().unwrap());
        assert_eq!(retry_after_header(&headers), Some(Duration::from_secs(5)));

        headers.insert(reqwest::header::RETRY_AFTER, "2.5".parse().unwrap());
        assert_eq!(retry_after_header(&headers), Some(Duration::from_secs(3)));
    }
}
