//! Replicate Image Provider
//!
//! Creates a prediction with `Prefer: wait` so most models answer in the
//! same request, polls `urls.get` when the prediction is still running,
//! and re-encodes the produced image as a data URI.

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use super::{ProviderAdapter, ProviderOutput, resolve_api_key, retry_after_header};
use crate::ai::normalize::{first_output_url, image_mime, is_data_uri, to_data_uri};
use crate::config::{EndpointConfig, Model, RetryConfig};
use crate::constants::image as image_constants;
use crate::types::{ErrorCategory, ErrorClassifier, ProviderError, ProviderResult};

const DEFAULT_API_BASE: &str = "https://api.replicate.com/v1";
const PROVIDER: &str = "replicate";

/// Replicate predictions adapter
pub struct ReplicateAdapter {
    /// API token stored securely - never exposed in logs or debug output
    api_token: Option<SecretString>,
    api_base: String,
    client: reqwest::Client,
    poll_interval: Duration,
    max_polls: u32,
}

impl std::fmt::Debug for ReplicateAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReplicateAdapter")
            .field("api_token", &self.api_token.as_ref().map(|_| "[REDACTED]"))
            .field("api_base", &self.api_base)
            .field("poll_interval", &self.poll_interval)
            .field("max_polls", &self.max_polls)
            .finish()
    }
}

/// Where a prediction stands after one response
#[derive(Debug)]
enum PredictionState {
    /// Produced a URL or data URI
    Ready(String),
    /// Still running; poll this URL
    Pending(String),
    Failed(ProviderError),
}

impl ReplicateAdapter {
    pub fn new(endpoint: &EndpointConfig, client: reqwest::Client, retry: &RetryConfig) -> Self {
        let api_base = endpoint
            .api_base
            .clone()
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string())
            .trim_end_matches('/')
            .to_string();

        Self {
            api_token: resolve_api_key(endpoint.api_key.as_ref(), "REPLICATE_API_TOKEN"),
            api_base,
            client,
            poll_interval: Duration::from_millis(retry.poll_interval_ms),
            max_polls: retry.max_polls,
        }
    }

    fn api_token(&self) -> ProviderResult<&SecretString> {
        self.api_token.as_ref().ok_or_else(|| {
            ProviderError::with_provider(
                ErrorCategory::Auth,
                "replicate API token not configured (set REPLICATE_API_TOKEN)",
                PROVIDER,
            )
        })
    }

    /// `owner/name` uses the model endpoint; `owner/name:version` pins a version
    fn prediction_request(&self, model_id: &str, prompt: &str) -> (String, Value) {
        let input = json!({
            "prompt": prompt,
            "aspect_ratio": image_constants::ASPECT_RATIO,
            "output_format": image_constants::OUTPUT_FORMAT,
        });

        match model_id.split_once(':') {
            Some((_, version)) => (
                format!("{}/predictions", self.api_base),
                json!({ "version": version, "input": input }),
            ),
            None => (
                format!("{}/models/{}/predictions", self.api_base, model_id),
                json!({ "input": input }),
            ),
        }
    }

    async fn create_prediction(&self, model: &Model, prompt: &str) -> ProviderResult<Prediction> {
        let token = self.api_token()?;
        let (url, body) = self.prediction_request(&model.id, prompt);

        debug!("Creating prediction at {}", url);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", token.expose_secret()))
            .header("Prefer", "wait")
            .json(&body)
            .send()
            .await
            .map_err(|e| ErrorClassifier::classify_transport(&e, PROVIDER))?;

        Self::read_prediction(response).await
    }

    async fn get_prediction(&self, url: &str) -> ProviderResult<Prediction> {
        let token = self.api_token()?;
        let response = self
            .client
            .get(url)
            .header("Authorization", format!("Bearer {}", token.expose_secret()))
            .send()
            .await
            .map_err(|e| ErrorClassifier::classify_transport(&e, PROVIDER))?;

        Self::read_prediction(response).await
    }

    async fn read_prediction(response: reqwest::Response) -> ProviderResult<Prediction> {
        let status = response.status();
        if !status.is_success() {
            let header_wait = retry_after_header(response.headers());
            let body = response.text().await.unwrap_or_default();
            return Err(api_error(status.as_u16(), &body, header_wait));
        }

        response
            .json()
            .await
            .map_err(|e| ErrorClassifier::classify_transport(&e, PROVIDER))
    }

    /// Poll until the prediction settles or the poll budget runs out.
    ///
    /// A throttled poll uses up one attempt and waits out its hint. Polling
    /// never fails as a throttle, so the prediction is created only once.
    async fn wait_for_output(&self, mut poll_url: String) -> ProviderResult<String> {
        for attempt in 1..=self.max_polls {
            tokio::time::sleep(self.poll_interval).await;
            debug!("Polling prediction ({}/{})", attempt, self.max_polls);

            let prediction = match self.get_prediction(&poll_url).await {
                Ok(prediction) => prediction,
                Err(err) if err.is_throttled() => {
                    debug!("Poll throttled ({})", err.diagnostic());
                    if let Some(wait) = err.retry_after {
                        tokio::time::sleep(wait).await;
                    }
                    continue;
                }
                Err(err) => return Err(err),
            };

            match prediction_state(&prediction) {
                PredictionState::Ready(output) => return Ok(output),
                PredictionState::Failed(err) => return Err(err),
                PredictionState::Pending(next) => poll_url = next,
            }
        }

        Err(ProviderError::with_provider(
            ErrorCategory::Unavailable,
            format!("prediction still running after {} polls", self.max_polls),
            PROVIDER,
        ))
    }

    /// Pass data URIs through; download anything else and encode it
    async fn to_payload(&self, output: String) -> ProviderResult<String> {
        if is_data_uri(&output) {
            return Ok(output);
        }

        let response = self
            .client
            .get(&output)
            .send()
            .await
            .map_err(|e| ErrorClassifier::classify_transport(&e, PROVIDER))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::with_provider(
                ErrorCategory::Unavailable,
                format!("failed to fetch image output (HTTP {})", status),
                PROVIDER,
            ));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ErrorClassifier::classify_transport(&e, PROVIDER))?;

        if bytes.is_empty() {
            return Err(ProviderError::no_output().provider(PROVIDER));
        }

        let mime = image_mime(content_type.as_deref(), &output);
        debug!("Fetched {} bytes of {}", bytes.len(), mime);
        Ok(to_data_uri(&bytes, &mime))
    }
}

#[async_trait]
impl ProviderAdapter for ReplicateAdapter {
    async fn invoke(&self, model: &Model, prompt: &str) -> ProviderResult<ProviderOutput> {
        info!("Invoking replicate (model: {})", model.id);

        let prediction = self.create_prediction(model, prompt).await?;

        let output = match prediction_state(&prediction) {
            PredictionState::Ready(output) => output,
            PredictionState::Failed(err) => return Err(err),
            PredictionState::Pending(poll_url) => {
                warn!(
                    "Prediction for {} still {}; polling",
                    model.id,
                    prediction.status.as_deref().unwrap_or("running")
                );
                self.wait_for_output(poll_url).await?
            }
        };

        Ok(ProviderOutput::image(self.to_payload(output).await?))
    }

    fn name(&self) -> &str {
        PROVIDER
    }
}

fn prediction_state(prediction: &Prediction) -> PredictionState {
    if let Some(message) = prediction.error_message() {
        return PredictionState::Failed(ErrorClassifier::classify(&message, PROVIDER));
    }

    if let Some(url) = prediction.output.as_ref().and_then(first_output_url) {
        return PredictionState::Ready(url);
    }

    let running = matches!(
        prediction.status.as_deref(),
        Some("starting") | Some("processing")
    );
    match prediction.urls.as_ref().and_then(|u| u.get.clone()) {
        Some(poll_url) if running => PredictionState::Pending(poll_url),
        _ => PredictionState::Failed(ProviderError::no_output().provider(PROVIDER)),
    }
}

/// Non-success response: `detail` text, `retry_after` body field or header
fn api_error(status: u16, body: &str, header_wait: Option<Duration>) -> ProviderError {
    let parsed: Option<ApiErrorBody> = serde_json::from_str(body).ok();

    let message = parsed
        .as_ref()
        .and_then(|b| b.detail.clone().or_else(|| b.title.clone()))
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| {
            let trimmed = body.trim();
            if trimmed.is_empty() {
                format!("HTTP {}", status)
            } else {
                trimmed.to_string()
            }
        });

    let body_wait = parsed
        .and_then(|b| b.retry_after)
        .filter(|secs| *secs >= 0.0)
        .map(|secs| Duration::from_secs(secs.ceil() as u64));

    let mut err = ErrorClassifier::classify_http_status(status, &message, PROVIDER);
    if message.to_lowercase().contains("throttled") {
        err.category = ErrorCategory::RateLimit;
    }
    match body_wait.or(header_wait) {
        Some(wait) => err.retry_after(wait),
        None => err,
    }
}

// Response types

#[derive(Debug, Deserialize)]
struct Prediction {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    output: Option<Value>,
    #[serde(default)]
    error: Option<Value>,
    #[serde(default)]
    urls: Option<PredictionUrls>,
}

impl Prediction {
    fn error_message(&self) -> Option<String> {
        match self.error.as_ref()? {
            Value::Null => None,
            Value::String(s) if s.trim().is_empty() => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct PredictionUrls {
    #[serde(default)]
    get: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    detail: Option<String>,
    #[serde(default)]
    retry_after: Option<f64>,
}
