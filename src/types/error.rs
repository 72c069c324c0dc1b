//! Unified Error Type System
//!
//! Centralized error types for the entire application.
//! Provider failures are classified so the throttle policy can decide
//! whether a single retry is warranted.
//!
//! ## Error Categories
//!
//! - **RateLimit**: upstream throttling (wait, retry once)
//! - **Auth**: bad or missing credentials (fail fast)
//! - **Network**: connectivity issues and request timeouts
//! - **Unavailable**: upstream 5xx / unknown model
//! - **BadRequest**: upstream rejected the request
//! - **NoOutput**: upstream answered but produced nothing usable
//!
//! ## Propagation
//!
//! - `ProviderError` never escapes the orchestrator; it becomes a result entry
//! - `Unauthorized` and `InvalidRequest` are surfaced to callers
//! - Cache failures are absorbed by the cache layer and only logged

use std::time::Duration;
use thiserror::Error;

// =============================================================================
// Error Categories
// =============================================================================

/// Provider error categories for retry decisions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Throttled by upstream - wait then retry once
    RateLimit,
    /// Authentication failed - fail fast, don't retry
    Auth,
    /// Network/connectivity issues, including timeouts
    Network,
    /// Provider unavailable or model unknown upstream
    Unavailable,
    /// Invalid request - don't retry, fix request
    BadRequest,
    /// Upstream response could not be decoded
    ParseError,
    /// Upstream succeeded but produced no usable output
    NoOutput,
    /// Unknown error
    Unknown,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RateLimit => write!(f, "RATE_LIMIT"),
            Self::Auth => write!(f, "AUTH"),
            Self::Network => write!(f, "NETWORK"),
            Self::Unavailable => write!(f, "UNAVAILABLE"),
            Self::BadRequest => write!(f, "BAD_REQUEST"),
            Self::ParseError => write!(f, "PARSE_ERROR"),
            Self::NoOutput => write!(f, "NO_OUTPUT"),
            Self::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

impl ErrorCategory {
    /// Only throttling earns a retry; everything else is final.
    pub fn is_throttled(&self) -> bool {
        matches!(self, Self::RateLimit)
    }
}

// =============================================================================
// Provider Error
// =============================================================================

/// Failure of one upstream provider call, with category and retry hint
#[derive(Debug, Clone)]
pub struct ProviderError {
    /// Error category for retry decisions
    pub category: ErrorCategory,
    /// Upstream message (shown to users as `Error: <message>`)
    pub message: String,
    /// Provider that produced the error
    pub provider: Option<String>,
    /// Upstream-indicated wait before retrying (if any)
    pub retry_after: Option<Duration>,
}

impl std::fmt::Display for ProviderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ProviderError {}

impl ProviderError {
    /// Create a new provider error
    pub fn new(category: ErrorCategory, message: impl Into<String>) -> Self {
        Self {
            category,
            message: message.into(),
            provider: None,
            retry_after: None,
        }
    }

    /// Create error with provider context
    pub fn with_provider(
        category: ErrorCategory,
        message: impl Into<String>,
        provider: impl Into<String>,
    ) -> Self {
        Self {
            category,
            message: message.into(),
            provider: Some(provider.into()),
            retry_after: None,
        }
    }

    /// Add provider context to existing error
    pub fn provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    /// Add upstream retry hint
    pub fn retry_after(mut self, duration: Duration) -> Self {
        self.retry_after = Some(duration);
        self
    }

    /// Upstream answered without output and without an error field
    pub fn no_output() -> Self {
        Self::new(ErrorCategory::NoOutput, "no output received")
    }

    pub fn is_throttled(&self) -> bool {
        self.category.is_throttled()
    }

    /// Tag with provider context for log output: `[replicate:RATE_LIMIT] ...`
    pub fn diagnostic(&self) -> String {
        match &self.provider {
            Some(provider) => format!("[{}:{}] {}", provider, self.category, self.message),
            None => format!("[{}] {}", self.category, self.message),
        }
    }
}

// =============================================================================
// Error Classifier
// =============================================================================

/// Maps upstream statuses and messages onto error categories
pub struct ErrorClassifier;

impl ErrorClassifier {
    /// Classify an error message from any provider
    pub fn classify(message: &str, provider: &str) -> ProviderError {
        let lower = message.to_lowercase();

        if lower.contains("throttled")
            || lower.contains("rate limit")
            || lower.contains("too many requests")
        {
            return ProviderError::with_provider(ErrorCategory::RateLimit, message, provider);
        }

        if lower.contains("unauthorized")
            || lower.contains("invalid api key")
            || lower.contains("api key")
            || lower.contains("authentication")
        {
            return ProviderError::with_provider(ErrorCategory::Auth, message, provider);
        }

        if lower.contains("timed out")
            || lower.contains("timeout")
            || lower.contains("connection")
            || lower.contains("dns")
        {
            return ProviderError::with_provider(ErrorCategory::Network, message, provider);
        }

        ProviderError::with_provider(ErrorCategory::Unknown, message, provider)
    }

    /// Classify HTTP status code directly (more accurate than string matching)
    pub fn classify_http_status(status: u16, message: &str, provider: &str) -> ProviderError {
        match status {
            429 => ProviderError::with_provider(ErrorCategory::RateLimit, message, provider),
            401 | 403 => ProviderError::with_provider(ErrorCategory::Auth, message, provider),
            400 | 422 => ProviderError::with_provider(ErrorCategory::BadRequest, message, provider),
            404 | 500 | 502 | 503 | 504 => {
                ProviderError::with_provider(ErrorCategory::Unavailable, message, provider)
            }
            _ => Self::classify(message, provider),
        }
    }

    /// Classify a transport error from reqwest
    pub fn classify_transport(err: &reqwest::Error, provider: &str) -> ProviderError {
        let message = if err.is_timeout() {
            format!("request timed out: {}", err)
        } else {
            format!("request failed: {}", err)
        };

        if err.is_timeout() || err.is_connect() {
            return ProviderError::with_provider(ErrorCategory::Network, message, provider);
        }
        if err.is_decode() {
            return ProviderError::with_provider(ErrorCategory::ParseError, message, provider);
        }
        Self::classify(&message, provider)
    }
}

// =============================================================================
// Application Error
// =============================================================================

#[derive(Debug, Error)]
pub enum ArenaError {
    // -------------------------------------------------------------------------
    // System Errors (auto From impl)
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // -------------------------------------------------------------------------
    // Provider Errors
    // -------------------------------------------------------------------------
    #[error("Provider error: {0}")]
    Provider(ProviderError),

    // -------------------------------------------------------------------------
    // Request Errors (surfaced to callers)
    // -------------------------------------------------------------------------
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    // -------------------------------------------------------------------------
    // Domain Errors
    // -------------------------------------------------------------------------
    #[error("Config error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Cache unavailable: {0}")]
    CacheUnavailable(String),
}

impl From<ProviderError> for ArenaError {
    fn from(err: ProviderError) -> Self {
        ArenaError::Provider(err)
    }
}

pub type Result<T> = std::result::Result<T, ArenaError>;

/// Result type for a single provider call
pub type ProviderResult<T> = std::result::Result<T, ProviderError>;

impl ArenaError {
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }
}

/// Context extension trait for adding context to errors
pub trait ResultExt<T> {
    /// Add context to an error
    fn with_context<C: Into<String>>(self, context: C) -> Result<T>;

    /// Add context using a closure (lazy evaluation)
    fn with_context_fn<F, C>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> C,
        C: Into<String>;
}

impl<T, E: std::error::Error + Send + Sync + 'static> ResultExt<T> for std::result::Result<T, E> {
    fn with_context<C: Into<String>>(self, context: C) -> Result<T> {
        self.map_err(|e| ArenaError::Storage(format!("{}: {}", context.into(), e)))
    }

    fn with_context_fn<F, C>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> C,
        C: Into<String>,
    {
        self.map_err(|e| ArenaError::Storage(format!("{}: {}", f().into(), e)))
    }
}

// =============================================================================
// Tests
// =============================================================================
