//! Prompt template management module.
//!
//! # Usage
//!
//! ```ignore
//! use crate::shared::prompts::render_tag_suggestion_prompt;
//!
//! let prompt = render_tag_suggestion_prompt("Bracket_Mount.stl", "stl")?;
//! ```

pub mod engine;

pub use engine::{render_template, TemplateError};

use minijinja::Value;
use std::collections::HashMap;

/// Render the instruction sent to the external tag-suggestion service.
///
/// Asks for 5-8 lowercase one-or-two-word tags for the named model file,
/// answered as a bare JSON array.
pub fn render_tag_suggestion_prompt(
    original_name: &str,
    extension: &str,
) -> Result<String, TemplateError> {
    let mut ctx: HashMap<&str, Value> = HashMap::new();
    ctx.insert("original_name", Value::from(original_name));
    ctx.insert("extension", Value::from(extension));

    render_template("tag_suggestion.jinja", &ctx)
}
