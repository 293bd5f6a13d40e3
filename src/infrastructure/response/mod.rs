use once_cell::sync::Lazy;
use regex::Regex;
use serde::de::DeserializeOwned;

/// Blocks some models emit around the answer proper.
static HIDDEN_BLOCK_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r"<think>[\s\S]*?</think>|<think\s*/>").unwrap(),
        Regex::new(r"<reasoning>[\s\S]*?</reasoning>").unwrap(),
        Regex::new(r"<internal>[\s\S]*?</internal>").unwrap(),
    ]
});

static MULTIPLE_NEWLINES_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

/// Strips reasoning artifacts and collapses blank-line runs to a single blank line.
pub fn clean_llm_response(response: &str) -> String {
    let normalized = response.replace("\r\n", "\n");
    let mut cleaned = normalized;
    for pattern in HIDDEN_BLOCK_PATTERNS.iter() {
        cleaned = pattern.replace_all(&cleaned, "").into_owned();
    }

    MULTIPLE_NEWLINES_PATTERN
        .replace_all(cleaned.trim(), "\n\n")
        .into_owned()
}

/// Pulls the JSON document out of a model answer: unwraps chat-completion
/// envelopes and markdown code fences.
pub fn extract_json_payload(output: &str) -> String {
    let trimmed = output.trim();
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(trimmed) {
        if let Some(content) = value
            .get("choices")
            .and_then(|choices| choices.get(0))
            .and_then(|choice| choice.get("message"))
            .and_then(|message| message.get("content"))
            .and_then(|content| content.as_str())
        {
            return strip_code_fence(content);
        }
        return trimmed.to_string();
    }
    strip_code_fence(trimmed)
}

fn strip_code_fence(value: &str) -> String {
    let trimmed = value.trim();
    for prefix in ["```json", "```JSON", "```"] {
        if let Some(stripped) = trimmed.strip_prefix(prefix) {
            return stripped.trim().trim_end_matches("```").trim().to_string();
        }
    }
    trimmed.to_string()
}

/// Best-effort structured decode: anything that is not the expected shape
/// becomes `T::default()`.
pub fn decode_or_default<T>(raw: &str) -> T
where
    T: DeserializeOwned + Default,
{
    let payload = extract_json_payload(&clean_llm_response(raw));
    match serde_json::from_str::<T>(&payload) {
        Ok(value) => value,
        Err(err) => {
            tracing::warn!(
                error = %err,
                payload_chars = payload.chars().count(),
                "Model output did not match the expected JSON shape; using empty default"
            );
            T::default()
        }
    }
}
