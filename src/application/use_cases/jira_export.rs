use crate::domain::error::{AppError, Result};
use crate::domain::jira::{ExportResult, IssueDraft, JiraIssue};
use crate::domain::test_case::ExportRecord;
use crate::infrastructure::tracker::IssueTracker;
use std::sync::Arc;

pub struct JiraExportUseCase {
    tracker: Arc<dyn IssueTracker + Send + Sync>,
}

impl JiraExportUseCase {
    pub fn new(tracker: Arc<dyn IssueTracker + Send + Sync>) -> Self {
        Self { tracker }
    }

    /// Creates one issue per record, in order. Stops at the first failure;
    /// the error names the keys already created so they can be cleaned up.
    pub async fn execute(&self, records: &[ExportRecord]) -> Result<ExportResult> {
        let mut created_issues = Vec::with_capacity(records.len());

        for record in records {
            let draft = IssueDraft {
                test_case_id: record.id.clone(),
                title: record.title.clone(),
                description: record.content.clone(),
            };

            match self.tracker.create_issue(&draft).await {
                Ok(issue) => created_issues.push(JiraIssue {
                    test_case_id: record.id.clone(),
                    jira_issue_key: issue.key,
                    jira_issue_url: issue.url,
                }),
                Err(e) => {
                    let created: Vec<&str> = created_issues
                        .iter()
                        .map(|issue: &JiraIssue| issue.jira_issue_key.as_str())
                        .collect();
                    tracing::warn!(
                        test_case_id = %record.id,
                        created = created.len(),
                        error = %e,
                        "Export aborted"
                    );
                    let mut message = format!(
                        "Failed to create issue for {}: {}",
                        record.id,
                        e.message()
                    );
                    if !created.is_empty() {
                        message.push_str(&format!(" (already created: {})", created.join(", ")));
                    }
                    return Err(AppError::ExportError(message));
                }
            }
        }

        tracing::info!(created = created_issues.len(), "Exported test cases");
        Ok(ExportResult { created_issues })
    }
}
