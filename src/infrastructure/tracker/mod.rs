//! Issue tracker seam. Only a simulated Jira ships; it fabricates keys and
//! browse URLs without any network traffic.

use crate::domain::error::{AppError, Result};
use crate::domain::jira::{IssueDraft, TrackerIssue};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use url::Url;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackerConfig {
    pub base_url: String,
    pub project_key: String,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            base_url: "https://jira.example.com".to_string(),
            project_key: "JIRA".to_string(),
        }
    }
}

#[async_trait]
pub trait IssueTracker {
    async fn create_issue(&self, draft: &IssueDraft) -> Result<TrackerIssue>;
}

pub struct SimulatedJiraTracker {
    base_url: Url,
    project_key: String,
    next_number: AtomicU64,
}

impl SimulatedJiraTracker {
    pub fn new(config: &TrackerConfig) -> Result<Self> {
        let base_url = Url::parse(config.base_url.trim()).map_err(|e| {
            AppError::ConfigError(format!("Invalid tracker base_url {}: {}", config.base_url, e))
        })?;
        let project_key = config.project_key.trim().to_ascii_uppercase();
        if project_key.is_empty() {
            return Err(AppError::ConfigError(
                "Tracker project_key must not be empty".to_string(),
            ));
        }

        Ok(Self {
            base_url,
            project_key,
            next_number: AtomicU64::new(1),
        })
    }

    fn browse_url(&self, key: &str) -> Result<String> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| AppError::ConfigError("Tracker base_url cannot hold a path".to_string()))?
            .pop_if_empty()
            .extend(["browse", key]);
        Ok(url.to_string())
    }
}

#[async_trait]
impl IssueTracker for SimulatedJiraTracker {
    async fn create_issue(&self, draft: &IssueDraft) -> Result<TrackerIssue> {
        let number = self.next_number.fetch_add(1, Ordering::SeqCst);
        let key = format!("{}-{}", self.project_key, number);
        let url = self.browse_url(&key)?;

        tracing::info!(
            test_case_id = %draft.test_case_id,
            key = %key,
            title = %draft.title,
            "Created simulated Jira issue"
        );
        Ok(TrackerIssue { key, url })
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    fn draft(id: &str) -> IssueDraft {
        IssueDraft {
            test_case_id: id.to_string(),
            title: "Verify login".to_string(),
            description: "1. Verify login".to_string(),
        }
    }

    #[tokio::test]
    async fn test_keys_are_sequential_with_browse_urls() {
        let tracker = SimulatedJiraTracker::new(&TrackerConfig::default()).unwrap();

        let first = tracker.create_issue(&draft("TC-1")).await.unwrap();
        let second = tracker.create_issue(&draft("TC-2")).await.unwrap();

        assert_eq!(first.key, "JIRA-1");
        assert_eq!(first.url, "https://jira.example.com/browse/JIRA-1");
        assert_eq!(second.key, "JIRA-2");
    }

    #[tokio::test]
    async fn test_base_url_with_path_keeps_prefix() {
        let tracker = SimulatedJiraTracker::new(&TrackerConfig {
            base_url: "https://tracker.example.org/jira/".to_string(),
            project_key: "qa".to_string(),
        })
        .unwrap();

        let issue = tracker.create_issue(&draft("TC-1")).await.unwrap();
        assert_eq!(issue.key, "QA-1");
        assert_eq!(issue.url, "https://tracker.example.org/jira/browse/QA-1");
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let bad_url = SimulatedJiraTracker::new(&TrackerConfig {
            base_url: "not a url".to_string(),
            project_key: "JIRA".to_string(),
        });
        assert!(matches!(bad_url, Err(AppError::ConfigError(_))));

        let empty_key = SimulatedJiraTracker::new(&TrackerConfig {
            base_url: "https://jira.example.com".to_string(),
            project_key: "  ".to_string(),
        });
        assert!(matches!(empty_key, Err(AppError::ConfigError(_))));
    }
}
