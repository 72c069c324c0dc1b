//! Chat Completions Provider
//!
//! Adapter for OpenRouter and OpenAI-compatible Chat Completions APIs.
//! Sends the prompt as a single user message and returns the first
//! choice's content as text.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{ProviderAdapter, ProviderOutput, resolve_api_key, retry_after_header};
use crate::ai::normalize::unwrap_code_fence;
use crate::config::{EndpointConfig, Model};
use crate::types::{
    Category, ErrorCategory, ErrorClassifier, Provider, ProviderError, ProviderResult,
};

const OPENROUTER_API_BASE: &str = "https://openrouter.ai/api/v1";
const OPENAI_API_BASE: &str = "https://api.openai.com/v1";

/// Chat completion adapter with secure API key handling
pub struct ChatAdapter {
    provider: Provider,
    /// API key stored securely - never exposed in logs or debug output
    api_key: Option<SecretString>,
    api_base: String,
    client: reqwest::Client,
}

impl std::fmt::Debug for ChatAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatAdapter")
            .field("provider", &self.provider)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("api_base", &self.api_base)
            .finish()
    }
}

impl ChatAdapter {
    pub fn new(provider: Provider, endpoint: &EndpointConfig, client: reqwest::Client) -> Self {
        let (default_base, env_var) = match provider {
            Provider::OpenAi => (OPENAI_API_BASE, "OPENAI_API_KEY"),
            _ => (OPENROUTER_API_BASE, "OPENROUTER_API_KEY"),
        };

        let api_base = endpoint
            .api_base
            .clone()
            .unwrap_or_else(|| default_base.to_string())
            .trim_end_matches('/')
            .to_string();

        Self {
            provider,
            api_key: resolve_api_key(endpoint.api_key.as_ref(), env_var),
            api_base,
            client,
        }
    }

    fn api_key(&self) -> ProviderResult<&SecretString> {
        self.api_key.as_ref().ok_or_else(|| {
            let env_var = match self.provider {
                Provider::OpenAi => "OPENAI_API_KEY",
                _ => "OPENROUTER_API_KEY",
            };
            ProviderError::with_provider(
                ErrorCategory::Auth,
                format!("{} API key not configured (set {})", self.provider, env_var),
                self.provider.as_str(),
            )
        })
    }

    fn build_request(model: &Model, prompt: &str) -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: model.id.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
        }
    }
}

#[async_trait]
impl ProviderAdapter for ChatAdapter {
    async fn invoke(&self, model: &Model, prompt: &str) -> ProviderResult<ProviderOutput> {
        let provider = self.provider.as_str();
        let api_key = self.api_key()?;
        let url = format!("{}/chat/completions", self.api_base);

        info!("Invoking {} (model: {})", provider, model.id);

        let mut request = self
            .client
            .post(&url)
            .header(
                "Authorization",
                format!("Bearer {}", api_key.expose_secret()),
            )
            .json(&Self::build_request(model, prompt));

        if self.provider == Provider::OpenRouter {
            request = request.header("X-Title", "modelarena");
        }

        let response = request
            .send()
            .await
            .map_err(|e| ErrorClassifier::classify_transport(&e, provider))?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = retry_after_header(response.headers());
            let body = response.text().await.unwrap_or_default();
            let message = error_message(&body).unwrap_or_else(|| format!("HTTP {}", status));

            let mut err = ErrorClassifier::classify_http_status(status.as_u16(), &message, provider);
            if let Some(wait) = retry_after {
                err = err.retry_after(wait);
            }
            return Err(err);
        }

        let body: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| ErrorClassifier::classify_transport(&e, provider))?;

        // OpenRouter reports some upstream failures inside a 200 body
        if let Some(error) = body.error {
            let message = error.message.unwrap_or_else(|| "upstream error".to_string());
            return Err(match error.code.and_then(|c| u16::try_from(c).ok()) {
                Some(code) => ErrorClassifier::classify_http_status(code, &message, provider),
                None => ErrorClassifier::classify(&message, provider),
            });
        }

        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();

        debug!(
            "Received {} chars from {} ({})",
            content.len(),
            provider,
            model.id
        );

        let payload = if model.category == Category::Code {
            unwrap_code_fence(&content)
        } else {
            content
        };

        Ok(ProviderOutput::text(payload))
    }

    fn name(&self) -> &str {
        self.provider.as_str()
    }
}

/// Upstream error message from a JSON error body, if there is one
fn error_message(body: &str) -> Option<String> {
    let parsed: ErrorEnvelope = serde_json::from_str(body).ok()?;
    parsed
        .error
        .and_then(|e| e.message)
        .filter(|m| !m.trim().is_empty())
        .or_else(|| {
            let trimmed = body.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        })
}

// Request/Response types

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    error: Option<ApiErrorBody>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    #[serde(default)]
    error: Option<ApiErrorBody>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    code: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_is_single_user_message() {
        let model = Model::new("openai/gpt-4.1", "GPT", Provider::OpenRouter, Category::Ascii);
        let json = serde_json::to_value(ChatAdapter::build_request(&model, "Draw a cat")).unwrap();
        assert_eq!(json["model"], "openai/gpt-4.1");
        assert_eq!(json["messages"].as_array().unwrap().len(), 1);
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["messages"][0]["content"], "Draw a cat");
    }

    #[test]
    fn test_error_message_extraction() {
        assert_eq!(
            error_message(r#"{"error":{"message":"Rate limit exceeded","code":429}}"#).as_deref(),
            Some("Rate limit exceeded")
        );
        assert_eq!(
            error_message(r#"{"detail":"nope"}"#).as_deref(),
            Some(r#"{"detail":"nope"}"#)
        );
        assert_eq!(error_message("not json"), None);
    }

    #[test]
    fn test_debug_redacts_key() {
        let endpoint = EndpointConfig {
            api_base: Some("http://localhost:1/v1/".to_string()),
            api_key: Some("sk-secret".to_string()),
        };
        let adapter = ChatAdapter::new(Provider::OpenAi, &endpoint, reqwest::Client::new());
        let debug = format!("{:?}", adapter);
        assert!(!debug.contains("sk-secret"));
        assert!(debug.contains("http://localhost:1/v1\""));
    }

    #[tokio::test]
    async fn test_missing_key_fails_invocation() {
        let adapter = ChatAdapter {
            provider: Provider::OpenRouter,
            api_key: None,
            api_base: "http://127.0.0.1:9".to_string(),
            client: reqwest::Client::new(),
        };
        let model = Model::new("x/y", "XY", Provider::OpenRouter, Category::Code);
        let err = adapter.invoke(&model, "hi").await.unwrap_err();
        assert_eq!(err.category, ErrorCategory::Auth);
        assert!(err.message.contains("OPENROUTER_API_KEY"));
    }
}
