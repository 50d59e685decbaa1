//! Model catalog listing

use crate::core::catalog::{ModelCatalog, ModelDescriptor};
use std::error::Error;

fn score_bar(score: u8) -> String {
    let filled = usize::from(score.min(5));
    format!("{}{}", "●".repeat(filled), "○".repeat(5 - filled))
}

fn render_model(model: &ModelDescriptor, selected: bool) -> String {
    let marker = if selected { "*" } else { " " };
    let tier = if model.is_premium() { " [premium]" } else { "" };
    let mut line = format!(
        "  {} {} ({}){}\n      {}\n      speed {}  reasoning {}  creativity {}",
        marker,
        model.id,
        model.display_name,
        tier,
        model.description,
        score_bar(model.scores.speed),
        score_bar(model.scores.reasoning),
        score_bar(model.scores.creativity),
    );
    if !model.strengths.is_empty() {
        line.push_str(&format!("\n      strengths: {}", model.strengths.join(", ")));
    }
    line
}

/// Catalog grouped by provider; `selected` is marked with `*`
pub fn render_model_list(catalog: &ModelCatalog, selected: Option<&str>) -> String {
    let mut sections = Vec::new();
    for provider in catalog.providers() {
        let models: Vec<String> = catalog
            .models_for_provider(provider)
            .map(|model| render_model(model, selected == Some(model.id.as_str())))
            .collect();
        sections.push(format!("{}:\n{}", provider, models.join("\n")));
    }
    sections.join("\n\n")
}

pub fn list_models(catalog: &ModelCatalog, selected: &str) -> Result<(), Box<dyn Error>> {
    println!("Available models:\n");
    println!("{}", render_model_list(catalog, Some(selected)));
    println!("\n💡 Use a model with:");
    println!("   aihub -m <model_id>");
    Ok(())
}
