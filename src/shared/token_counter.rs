//! Character-based token estimation for prompt budgeting.
//!
//! Approximation: ~4 characters per token, which holds well enough for the
//! providers we route to without pulling in provider-specific tokenizers.

const CHARS_PER_TOKEN: usize = 4;
const TRUNCATION_MARKER: &str = "\n[... truncated ...]";

pub struct TokenCounter;

impl TokenCounter {
    pub fn estimate_tokens(text: &str) -> usize {
        if text.is_empty() {
            return 0;
        }
        (text.chars().count() + CHARS_PER_TOKEN - 1) / CHARS_PER_TOKEN
    }

    pub fn fits(text: &str, budget: usize) -> bool {
        Self::estimate_tokens(text) <= budget
    }

    /// Cuts `text` so it fits `budget`, preferring a line boundary, and marks the cut.
    pub fn truncate_to_budget(text: &str, budget: usize) -> String {
        if Self::fits(text, budget) {
            return text.to_string();
        }

        let max_chars = (budget * CHARS_PER_TOKEN).saturating_sub(TRUNCATION_MARKER.len());
        let head: String = text.chars().take(max_chars).collect();
        let cut = match head.rfind('\n') {
            Some(pos) if pos > head.len() / 2 => &head[..pos],
            _ => head.as_str(),
        };

        format!("{}{}", cut.trim_end(), TRUNCATION_MARKER)
    }
}
