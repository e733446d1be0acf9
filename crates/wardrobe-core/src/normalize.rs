//! Normalization of raw model output into a canonical tag.
//!
//! Vision models pad their answers with punctuation, casing, and stray
//! whitespace even under a strict instruction. Normalization is the last
//! line of defense: it produces either a short lowercase tag or the
//! no-clothing outcome, deterministically.

use crate::config::PromptConfig;
use crate::types::TagOutcome;

/// Policy knobs for normalization.
///
/// Derived from the prompt template so the sentinel and word cap always
/// match what the model was instructed to produce.
#[derive(Debug, Clone)]
pub struct TagPolicy {
    /// Reserved literal meaning "no clothing detected"
    pub sentinel: String,
    /// Maximum words kept in the tag
    pub max_words: usize,
}

impl From<&PromptConfig> for TagPolicy {
    fn from(prompt: &PromptConfig) -> Self {
        Self {
            sentinel: prompt.sentinel.clone(),
            max_words: prompt.max_words,
        }
    }
}

/// Clean raw model text into a canonical tag.
///
/// Lowercases and trims, strips everything outside letters/digits/whitespace,
/// then splits into words. The configured sentinel (or an empty result) maps
/// to [`TagOutcome::NoClothing`]; anything else is truncated to the word cap
/// and joined with single spaces.
pub fn normalize_tag(raw: &str, policy: &TagPolicy) -> TagOutcome {
    let cleaned: String = raw
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect();
    let cleaned = cleaned.trim();

    let words: Vec<&str> = cleaned.split_whitespace().collect();

    if words.is_empty() || cleaned.eq_ignore_ascii_case(&policy.sentinel) {
        return TagOutcome::NoClothing;
    }

    let tag = words
        .into_iter()
        .take(policy.max_words)
        .collect::<Vec<_>>()
        .join(" ");

    TagOutcome::Tag { tag }
}
