//! Generation fallback: external model first, substring search second
//!
//! Every failure on the generator side is absorbed here. The caller always
//! gets text back, at worst [`NO_ANSWER`].

use super::client::Generator;
use crate::knowledge::{prompt_lines, KnowledgeBase};
use std::sync::Arc;

/// Returned when neither the model nor the substring search produced anything
pub const NO_ANSWER: &str = "Sorry, I could not find an answer in the knowledge base.";

/// Where a fallback answer came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationOutcome {
    /// Text produced by the generative endpoint
    Generated(String),
    /// Substring match (or [`NO_ANSWER`]) after the endpoint failed
    Fallback(String),
}

impl GenerationOutcome {
    pub fn text(&self) -> &str {
        match self {
            Self::Generated(text) | Self::Fallback(text) => text,
        }
    }
}

/// Build the one-shot prompt sent to the model
pub fn build_prompt(lines: &[String], query: &str) -> String {
    format!("{}\n\nUser Query: {}", lines.join("\n"), query)
}

/// First line containing `query`, case-insensitively
pub fn substring_search<'a>(lines: &'a [String], query: &str) -> Option<&'a str> {
    let needle = query.to_lowercase();
    lines
        .iter()
        .find(|line| line.to_lowercase().contains(&needle))
        .map(String::as_str)
}

/// Model call with substring fallback
pub struct GenerationFallback {
    generator: Arc<dyn Generator>,
}

impl GenerationFallback {
    pub fn new(generator: Arc<dyn Generator>) -> Self {
        Self { generator }
    }

    pub fn generator_name(&self) -> &str {
        self.generator.name()
    }

    /// Answer `query` from `kb` via the model, degrading to substring search
    pub async fn generate(&self, query: &str, kb: &KnowledgeBase) -> GenerationOutcome {
        let lines = prompt_lines(kb.root());
        let prompt = build_prompt(&lines, query);

        match self.generator.generate(&prompt).await {
            Ok(candidates) => {
                let first = candidates
                    .into_iter()
                    .next()
                    .and_then(|c| c.content)
                    .filter(|text| !text.trim().is_empty());
                match first {
                    Some(text) => {
                        tracing::debug!(generator = self.generator.name(), "Generated answer");
                        return GenerationOutcome::Generated(text);
                    }
                    None => tracing::warn!(
                        generator = self.generator.name(),
                        "Generator returned no usable candidate, using substring search"
                    ),
                }
            }
            Err(e) => tracing::warn!(
                generator = self.generator.name(),
                "Generator failed ({}), using substring search",
                e
            ),
        }

        let text = substring_search(&lines, query).unwrap_or(NO_ANSWER);
        GenerationOutcome::Fallback(text.to_string())
    }
}
