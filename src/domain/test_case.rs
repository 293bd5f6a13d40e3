use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static LEADING_NUMBER_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*\d+\.\s+").unwrap());

const FALLBACK_TITLE: &str = "Test Case";
const MAX_TITLE_CHARS: usize = 120;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCase {
    pub id: String,
    pub content: String,
}

impl TestCase {
    pub fn new(position: usize, content: impl Into<String>) -> Self {
        Self {
            id: format!("TC-{}", position),
            content: content.into(),
        }
    }

    /// First line of the content with its numbering and emphasis stripped.
    pub fn title(&self) -> String {
        let first_line = self.content.lines().next().unwrap_or_default();
        let without_number = LEADING_NUMBER_PATTERN.replace(first_line, "");
        let cleaned = without_number
            .trim()
            .trim_matches(|c| c == '*' || c == '#' || c == '_')
            .trim();

        if cleaned.is_empty() {
            return FALLBACK_TITLE.to_string();
        }
        if cleaned.chars().count() > MAX_TITLE_CHARS {
            let truncated: String = cleaned.chars().take(MAX_TITLE_CHARS).collect();
            return format!("{}...", truncated.trim_end());
        }
        cleaned.to_string()
    }

    pub fn to_export_record(&self) -> ExportRecord {
        ExportRecord {
            id: self.id.clone(),
            title: self.title(),
            content: self.content.clone(),
        }
    }
}

/// Joins cases back into the text block the refinement prompt expects.
pub fn join_test_cases(test_cases: &[TestCase]) -> String {
    test_cases
        .iter()
        .map(|test_case| test_case.content.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportRecord {
    pub id: String,
    pub title: String,
    pub content: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_title_strips_number_and_bold_markers() {
        let case = TestCase::new(1, "1. **Verify login with valid credentials**\nSteps: ...");
        assert_eq!(case.title(), "Verify login with valid credentials");
    }

    #[test]
    fn test_title_falls_back_when_first_line_is_only_a_number() {
        let case = TestCase::new(2, "2. \nbody");
        assert_eq!(case.title(), "Test Case");
    }

    #[test]
    fn test_long_titles_are_truncated() {
        let case = TestCase::new(1, format!("1. {}", "x".repeat(200)));
        let title = case.title();
        assert!(title.ends_with("..."));
        assert_eq!(title.chars().count(), MAX_TITLE_CHARS + 3);
    }

    #[test]
    fn test_join_separates_cases_with_blank_line() {
        let cases = vec![TestCase::new(1, "1. A"), TestCase::new(2, "2. B")];
        assert_eq!(join_test_cases(&cases), "1. A\n\n2. B");
    }

    #[test]
    fn test_export_record_carries_id_and_content() {
        let record = TestCase::new(3, "3. Check audit log").to_export_record();
        assert_eq!(record.id, "TC-3");
        assert_eq!(record.title, "Check audit log");
        assert_eq!(record.content, "3. Check audit log");
    }
}
