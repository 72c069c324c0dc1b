//! Model Catalog
//!
//! Built-in model set and per-category tasks, plus lookup helpers that
//! resolve caller-supplied model ids against the configured catalog.

use std::collections::HashSet;

use crate::config::{BenchmarkTask, Model};
use crate::types::{ArenaError, Category, Provider, Result};

/// Built-in models, in configuration order
pub fn default_models() -> Vec<Model> {
    use Category::{Ascii, Code, Image};
    use Provider::{OpenRouter, Replicate};

    let chat = [
        ("anthropic/claude-sonnet-4", "Claude Sonnet 4"),
        ("openai/gpt-4.1", "GPT-4.1"),
        ("google/gemini-2.5-pro", "Gemini 2.5 Pro"),
        ("deepseek/deepseek-chat-v3-0324", "DeepSeek V3"),
        ("x-ai/grok-3", "Grok 3"),
    ];

    let mut models = Vec::new();
    for category in [Code, Ascii] {
        for (id, name) in chat {
            models.push(Model::new(id, name, OpenRouter, category));
        }
    }

    models.extend([
        Model::new(
            "black-forest-labs/flux-1.1-pro",
            "FLUX 1.1 Pro",
            Replicate,
            Image,
        ),
        Model::new(
            "google/imagen-4",
            "Imagen 4",
            Replicate,
            Image,
        ),
        Model::new(
            "ideogram-ai/ideogram-v3-turbo",
            "Ideogram v3 Turbo",
            Replicate,
            Image,
        ),
        Model::new(
            "recraft-ai/recraft-v3",
            "Recraft V3",
            Replicate,
            Image,
        ),
    ]);

    models
}

/// Built-in prompts, one per category
pub fn default_tasks() -> Vec<BenchmarkTask> {
    vec![
        BenchmarkTask::inline(
            Category::Code,
            "Create a single self-contained HTML page with inline CSS and JavaScript \
             that renders an animated solar system. Respond with only the HTML.",
        ),
        BenchmarkTask::inline(
            Category::Ascii,
            "Draw a detailed ASCII art picture of a lighthouse on a cliff at night. \
             Respond with only the ASCII art.",
        ),
        BenchmarkTask::inline(
            Category::Image,
            "A cozy reading nook inside a treehouse during a thunderstorm, warm lamp light, \
             rain on the windows, highly detailed.",
        ),
    ]
}

/// Read-only view over the configured models
#[derive(Debug, Clone)]
pub struct ModelCatalog {
    models: Vec<Model>,
}

impl ModelCatalog {
    pub fn new(models: Vec<Model>) -> Self {
        Self { models }
    }

    pub fn all(&self) -> &[Model] {
        &self.models
    }

    /// Models of one category, in configuration order
    pub fn for_category(&self, category: Category) -> Vec<Model> {
        self.models
            .iter()
            .filter(|m| m.category == category)
            .cloned()
            .collect()
    }

    pub fn find(&self, category: Category, id: &str) -> Option<&Model> {
        self.models
            .iter()
            .find(|m| m.category == category && m.id == id)
    }

    /// Resolve requested ids into models.
    ///
    /// The result follows configuration order (which is what the sequential
    /// policy runs in), not request order. Duplicates collapse; unknown ids
    /// and an empty request are rejected.
    pub fn resolve(&self, category: Category, ids: &[String]) -> Result<Vec<Model>> {
        if ids.is_empty() {
            return Err(ArenaError::invalid_request("models must not be empty"));
        }

        let requested: HashSet<&str> = ids.iter().map(String::as_str).collect();

        let unknown: Vec<&str> = ids
            .iter()
            .map(String::as_str)
            .filter(|id| self.find(category, id).is_none())
            .collect();
        if !unknown.is_empty() {
            return Err(ArenaError::invalid_request(format!(
                "unknown {} model(s): {}",
                category,
                unknown.join(", ")
            )));
        }

        Ok(self
            .models
            .iter()
            .filter(|m| m.category == category && requested.contains(m.id.as_str()))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_default_catalog_covers_every_category() {
        let catalog = ModelCatalog::new(default_models());
        for category in Category::ALL {
            assert!(!catalog.for_category(category).is_empty());
        }
        for model in catalog.all() {
            assert!(model.provider.supports(model.category));
        }
    }

    #[test]
    fn test_resolve_uses_configuration_order() {
        let catalog = ModelCatalog::new(default_models());
        let image = catalog.for_category(Category::Image);

        let reversed: Vec<String> = image.iter().rev().map(|m| m.id.clone()).collect();
        let resolved = catalog.resolve(Category::Image, &reversed).unwrap();

        let resolved_ids: Vec<&str> = resolved.iter().map(|m| m.id.as_str()).collect();
        let config_ids: Vec<&str> = image.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(resolved_ids, config_ids);
    }

    #[test]
    fn test_resolve_collapses_duplicates() {
        let catalog = ModelCatalog::new(default_models());
        let resolved = catalog
            .resolve(
                Category::Code,
                &ids(&["openai/gpt-4.1", "openai/gpt-4.1"]),
            )
            .unwrap();
        assert_eq!(resolved.len(), 1);
    }

    #[test]
    fn test_resolve_rejects_unknown_and_wrong_category() {
        let catalog = ModelCatalog::new(default_models());

        let err = catalog
            .resolve(Category::Code, &ids(&["nope/model"]))
            .unwrap_err();
        assert!(err.to_string().contains("nope/model"));

        // Image model requested under the code category
        assert!(
            catalog
                .resolve(Category::Code, &ids(&["black-forest-labs/flux-1.1-pro"]))
                .is_err()
        );
    }

    #[test]
    fn test_resolve_rejects_empty() {
        let catalog = ModelCatalog::new(default_models());
        assert!(matches!(
            catalog.resolve(Category::Ascii, &[]),
            Err(ArenaError::InvalidRequest(_))
        ));
    }
}
