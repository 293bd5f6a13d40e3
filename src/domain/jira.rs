use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JiraIssue {
    pub test_case_id: String,
    pub jira_issue_key: String,
    pub jira_issue_url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportResult {
    pub created_issues: Vec<JiraIssue>,
}

/// One create-issue request sent to the tracker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueDraft {
    pub test_case_id: String,
    pub title: String,
    pub description: String,
}

/// What the tracker hands back for a created issue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackerIssue {
    pub key: String,
    pub url: String,
}
