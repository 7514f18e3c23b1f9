//! Transcript heuristics used by the presentation layer
//!
//! Decides when a reply looks like a recipe (so visualize/read actions are
//! offered) and derives the dish name used as the visualization prompt.

/// Prompt used when no usable line exists
pub const FALLBACK_DISH: &str = "Delicious food";

/// Whether an assistant reply mentions both ingredients and instructions
pub fn looks_like_recipe(text: &str) -> bool {
    let lower = text.to_lowercase();
    lower.contains("ingredients") && lower.contains("instructions")
}

/// First non-blank line that is not a markdown heading, markup stripped
pub fn visualization_prompt(text: &str) -> String {
    let line = text
        .lines()
        .find(|l| !l.trim().is_empty() && !l.starts_with('#'))
        .unwrap_or(FALLBACK_DISH);
    line.replace(['*', '#'], "").trim().to_string()
}
