use crate::domain::test_case::TestCase;
use once_cell::sync::Lazy;
use regex::Regex;

/// A line that opens a numbered item: optional indentation, digits, a dot, a space.
static ITEM_START_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^[ \t]*\d+\.[ \t]").unwrap());

/// Splits a numbered block of model output into test cases.
///
/// Every line opening a numbered item starts a new case; text before the
/// first item is kept as its own case. Blank segments are dropped and ids
/// follow position (`TC-1`, `TC-2`, ...).
pub fn split_test_cases(text: &str) -> Vec<TestCase> {
    let mut boundaries: Vec<usize> = ITEM_START_PATTERN
        .find_iter(text)
        .map(|m| m.start())
        .collect();
    if boundaries.first() != Some(&0) {
        boundaries.insert(0, 0);
    }
    boundaries.push(text.len());

    boundaries
        .windows(2)
        .map(|window| text[window[0]..window[1]].trim())
        .filter(|segment| !segment.is_empty())
        .enumerate()
        .map(|(index, segment)| TestCase::new(index + 1, segment))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::test_case::join_test_cases;

    fn contents(cases: &[TestCase]) -> Vec<&str> {
        cases.iter().map(|case| case.content.as_str()).collect()
    }

    #[test]
    fn test_splits_simple_numbered_list() {
        let cases = split_test_cases("1. A\n2. B\n3. C");
        assert_eq!(
            cases,
            vec![
                TestCase::new(1, "1. A"),
                TestCase::new(2, "2. B"),
                TestCase::new(3, "3. C"),
            ]
        );
        assert_eq!(cases[2].id, "TC-3");
    }

    #[test]
    fn test_empty_input_yields_nothing() {
        assert!(split_test_cases("").is_empty());
        assert!(split_test_cases("  \n\t\n").is_empty());
    }

    #[test]
    fn test_text_without_markers_is_one_case() {
        let cases = split_test_cases("\n  Verify the login screen.\nSteps: open app.  \n");
        assert_eq!(cases.len(), 1);
        assert_eq!(cases[0].id, "TC-1");
        assert_eq!(cases[0].content, "Verify the login screen.\nSteps: open app.");
    }

    #[test]
    fn test_preamble_becomes_its_own_case() {
        let cases = split_test_cases("Here are your test cases:\n\n1. Login\n2. Logout");
        assert_eq!(
            contents(&cases),
            vec!["Here are your test cases:", "1. Login", "2. Logout"]
        );
    }

    #[test]
    fn test_multiline_cases_keep_their_body() {
        let text = "1. Verify login\n   Steps: enter credentials\n   Expected: dashboard\n\n2. Verify logout\n   Expected: login screen";
        let cases = split_test_cases(text);
        assert_eq!(cases.len(), 2);
        assert!(cases[0].content.ends_with("Expected: dashboard"));
        assert!(cases[1].content.starts_with("2. Verify logout"));
    }

    #[test]
    fn test_indented_and_multi_digit_markers() {
        let text = (1..=11)
            .map(|n| format!("  {}. case {}", n, n))
            .collect::<Vec<_>>()
            .join("\n");
        let cases = split_test_cases(&text);
        assert_eq!(cases.len(), 11);
        assert_eq!(cases[10].id, "TC-11");
        assert_eq!(cases[10].content, "11. case 11");
    }

    #[test]
    fn test_numbers_inside_a_line_do_not_split() {
        let cases = split_test_cases("1. Check version 2. and 3. in the footer\n2. Next");
        assert_eq!(
            contents(&cases),
            vec!["1. Check version 2. and 3. in the footer", "2. Next"]
        );
    }

    #[test]
    fn test_decimal_numbers_at_line_start_do_not_split() {
        let cases = split_test_cases("1. Dose limits\n2.5 mg is the maximum\n2. Next");
        assert_eq!(cases.len(), 2);
        assert!(cases[0].content.contains("2.5 mg"));
    }

    #[test]
    fn test_rejoin_preserves_segmentation() {
        let text = "Intro text\n1. First\nline two\n\n\n2. Second\n  3. Third";
        let cases = split_test_cases(text);
        let resplit = split_test_cases(&join_test_cases(&cases));
        assert_eq!(cases, resplit);
    }
}
