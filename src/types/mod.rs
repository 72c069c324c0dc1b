pub mod error;

pub use error::{
    ArenaError, ErrorCategory, ErrorClassifier, ProviderError, ProviderResult, Result, ResultExt,
};

// =============================================================================
// Domain Enums
// =============================================================================

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Benchmark task category
///
/// Each category has its own prompt, output kind and concurrency policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Code,
    Ascii,
    Image,
}

impl Category {
    /// All categories in display order
    pub const ALL: [Category; 3] = [Category::Code, Category::Ascii, Category::Image];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Code => "code",
            Category::Ascii => "ascii",
            Category::Image => "image",
        }
    }

    /// Kind of payload a successful call in this category produces
    pub fn output_kind(&self) -> OutputKind {
        match self {
            Category::Image => OutputKind::Image,
            Category::Code | Category::Ascii => OutputKind::Text,
        }
    }

    /// Image backends enforce strict per-account rate limits, so image
    /// models run one at a time.
    pub fn concurrency(&self) -> Concurrency {
        match self {
            Category::Image => Concurrency::Sequential,
            Category::Code | Category::Ascii => Concurrency::Parallel,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "code" => Ok(Category::Code),
            "ascii" => Ok(Category::Ascii),
            "image" => Ok(Category::Image),
            _ => Err(format!(
                "Unknown category '{}'. Valid values: code, ascii, image",
                s
            )),
        }
    }
}

/// How the orchestrator schedules the models of one run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Concurrency {
    /// All models invoked at once, no ordering guarantee
    Parallel,
    /// One model at a time, in configuration order
    Sequential,
}

/// Kind of payload stored in a result entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputKind {
    Text,
    Image,
}

impl fmt::Display for OutputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputKind::Text => write!(f, "text"),
            OutputKind::Image => write!(f, "image"),
        }
    }
}

/// Supported provider backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// OpenRouter chat completions
    OpenRouter,
    /// OpenAI (or compatible) chat completions
    OpenAi,
    /// Replicate image predictions
    Replicate,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::OpenRouter => "openrouter",
            Provider::OpenAi => "openai",
            Provider::Replicate => "replicate",
        }
    }

    /// Whether this backend can serve models of the given category
    pub fn supports(&self, category: Category) -> bool {
        match self {
            Provider::OpenRouter | Provider::OpenAi => category.output_kind() == OutputKind::Text,
            Provider::Replicate => category == Category::Image,
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot map key for one model's result: `<category>-<modelId>`
pub fn result_key(category: Category, model_id: &str) -> String {
    format!("{}-{}", category, model_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_policies() {
        assert_eq!(Category::Image.concurrency(), Concurrency::Sequential);
        assert_eq!(Category::Code.concurrency(), Concurrency::Parallel);
        assert_eq!(Category::Ascii.concurrency(), Concurrency::Parallel);
        assert_eq!(Category::Image.output_kind(), OutputKind::Image);
        assert_eq!(Category::Ascii.output_kind(), OutputKind::Text);
    }

    #[test]
    fn test_category_parse() {
        assert_eq!("IMAGE".parse::<Category>().unwrap(), Category::Image);
        assert!("video".parse::<Category>().is_err());
    }

    #[test]
    fn test_category_serde_lowercase() {
        let json = serde_json::to_string(&Category::Ascii).unwrap();
        assert_eq!(json, "\"ascii\"");
        let provider: Provider = serde_json::from_str("\"openrouter\"").unwrap();
        assert_eq!(provider, Provider::OpenRouter);
    }

    #[test]
    fn test_provider_support() {
        assert!(Provider::OpenRouter.supports(Category::Code));
        assert!(!Provider::OpenRouter.supports(Category::Image));
        assert!(Provider::Replicate.supports(Category::Image));
        assert!(!Provider::Replicate.supports(Category::Ascii));
    }

    #[test]
    fn test_result_key() {
        assert_eq!(
            result_key(Category::Code, "openai/gpt-4o"),
            "code-openai/gpt-4o"
        );
    }
}
