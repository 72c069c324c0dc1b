//! Models Command
//!
//! Lists the configured model catalog.

use std::path::Path;

use console::style;

use crate::cli::ui::Output;
use crate::cli::util::load_config;
use crate::types::{Category, Result};

pub fn run(config_path: Option<&Path>, category: Option<Category>) -> Result<()> {
    let config = load_config(config_path)?;
    let out = Output::new();

    let categories: Vec<Category> = match category {
        Some(c) => vec![c],
        None => Category::ALL.to_vec(),
    };

    for category in categories {
        let models: Vec<_> = config
            .models
            .iter()
            .filter(|m| m.category == category)
            .collect();

        out.section(&format!("{} ({})", category, models.len()));
        for model in models {
            println!(
                "  {:<45} {:<28} {}",
                model.id,
                model.display_name,
                style(model.provider).dim()
            );
        }
    }

    Ok(())
}
