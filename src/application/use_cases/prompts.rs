use crate::domain::compliance::ComplianceStandard;

pub(crate) fn build_parse_system_prompt() -> String {
    "You are an AI document parser specializing in healthcare requirements documents. Parse the provided document and restate its content in a structured, human-readable format: keep every requirement, its identifier, and any constraints on safety, security, or patient data. Take into account any user feedback provided to correct previous parsing errors. Return only the parsed content as plain text.".to_string()
}

pub(crate) fn build_parse_user_prompt(
    file_name: Option<&str>,
    document_text: &str,
    feedback: Option<&str>,
) -> String {
    let mut body = String::new();
    if let Some(name) = file_name {
        body.push_str(&format!("Document name: {}\n", name));
    }

    if document_text.trim().is_empty() {
        body.push_str("\nThe document has no text layer. Read the attached file instead.\n");
    } else {
        body.push_str("\nDocument text:\n");
        body.push_str(document_text.trim());
        body.push('\n');
    }

    if let Some(feedback) = feedback.map(str::trim).filter(|f| !f.is_empty()) {
        body.push_str(&format!("\nUser feedback: {}\n", feedback));
        body.push_str(
            "Consider the feedback above when parsing the document. Focus on addressing the specific issues mentioned.\n",
        );
    }

    body
}

pub(crate) fn build_generate_system_prompt() -> String {
    r#"You are a QA engineer specializing in regulated healthcare software.

Generate detailed, numbered test cases from the parsed requirements. Start every test case on its own line with its number followed by a dot and a space (for example "1. "). Each test case must include:
- Test Case ID
- Requirement Reference
- Description
- Preconditions
- Test Steps
- Expected Result
- Related Compliance / Standard reference
- Traceability note

Make them clear, verifiable, and regulation-compliant. Do not add text before the first test case or after the last one."#
        .to_string()
}

pub(crate) fn build_generate_user_prompt(parsed_requirements: &str) -> String {
    let mut body = String::new();
    body.push_str("Parsed requirements:\n");
    body.push_str(parsed_requirements.trim());
    body.push('\n');
    body
}

pub(crate) fn build_refine_system_prompt() -> String {
    "You are an expert QA engineer refining test cases based on user feedback. Using the feedback and the parsed requirements, refine the test cases to better cover the requirements and compliance standards. Return the complete revised set, well-structured and numbered, with every test case starting on its own line as \"<number>. \". Do not add commentary before or after the list.".to_string()
}

pub(crate) fn build_refine_user_prompt(
    test_cases: &str,
    feedback: &str,
    parsed_requirements: &str,
) -> String {
    let mut body = String::new();
    body.push_str("Current test cases:\n");
    body.push_str(test_cases.trim());
    body.push_str("\n\nUser feedback on the test cases:\n");
    body.push_str(feedback.trim());
    body.push_str("\n\nParsed requirements for context:\n");
    body.push_str(parsed_requirements.trim());
    body.push('\n');
    body
}

pub(crate) fn build_compliance_system_prompt() -> String {
    let standards = ComplianceStandard::ALL
        .iter()
        .map(|standard| format!("- {} (standardId \"{}\")", standard.name(), standard.id()))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"You are a compliance expert for medical device software.

Identify every test case that is NOT compliant with one of these standards:
{}

For each non-compliant test case and standard, report the test case id (for example "TC-1"), the standardId, and a brief reason.

Return JSON only, with this exact shape:
{{"issues": [{{"testCaseId": "TC-1", "standardId": "fda", "reason": "..."}}]}}

If all test cases are compliant, return {{"issues": []}}."#,
        standards
    )
}

pub(crate) fn build_compliance_user_prompt(test_cases: &str, parsed_requirements: &str) -> String {
    let mut body = String::new();
    body.push_str("Parsed requirements:\n");
    body.push_str(parsed_requirements.trim());
    body.push_str("\n\nTest cases to analyze:\n");
    body.push_str(test_cases.trim());
    body.push('\n');
    body
}

/// Retrieval query for grounding, built from the non-blank prompt inputs and
/// capped in length.
pub(crate) fn grounding_query(parts: &[&str]) -> String {
    const MAX_QUERY_CHARS: usize = 2000;
    let joined = parts
        .iter()
        .map(|part| part.trim())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("\n");
    joined.chars().take(MAX_QUERY_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_prompt_mentions_feedback_only_when_present() {
        let without = build_parse_user_prompt(Some("srs.pdf"), "Req 1", None);
        assert!(without.contains("Document name: srs.pdf"));
        assert!(!without.contains("User feedback"));

        let blank = build_parse_user_prompt(None, "Req 1", Some("   "));
        assert!(!blank.contains("User feedback"));

        let with = build_parse_user_prompt(None, "Req 1", Some("Keep section 3"));
        assert!(with.contains("User feedback: Keep section 3"));
    }

    #[test]
    fn test_parse_prompt_points_to_attachment_without_text() {
        let prompt = build_parse_user_prompt(Some("scan.pdf"), "  ", None);
        assert!(prompt.contains("no text layer"));
        assert!(!prompt.contains("Document text:"));
    }

    #[test]
    fn test_compliance_prompt_lists_all_standards() {
        let prompt = build_compliance_system_prompt();
        for standard in ComplianceStandard::ALL {
            assert!(prompt.contains(standard.name()));
            assert!(prompt.contains(&format!("\"{}\"", standard.id())));
        }
        assert!(prompt.contains(r#"{"issues": []}"#));
    }

    #[test]
    fn test_refine_prompt_carries_all_inputs() {
        let prompt = build_refine_user_prompt("1. A", "add negative cases", "Req: login");
        let cases = prompt.find("1. A").unwrap();
        let feedback = prompt.find("add negative cases").unwrap();
        let requirements = prompt.find("Req: login").unwrap();
        assert!(cases < feedback && feedback < requirements);
    }

    #[test]
    fn test_grounding_query_skips_blank_parts_and_is_bounded() {
        assert_eq!(grounding_query(&["  ", "login", "", "audit"]), "login\naudit");
        let long = "x".repeat(5000);
        assert_eq!(grounding_query(&[&long]).chars().count(), 2000);
    }
}
