use crate::application::use_cases::grounding::{CorpusRegistry, COMPLIANCE_CORPUS_ID};
use crate::application::use_cases::prompts::{
    build_compliance_system_prompt, build_compliance_user_prompt, grounding_query,
};
use crate::domain::compliance::{ComplianceIssue, ComplianceReport, ComplianceStandard};
use crate::domain::document::ParsedRequirements;
use crate::domain::llm_config::{LLMConfig, PromptContext};
use crate::infrastructure::llm_clients::LLMClient;
use crate::infrastructure::response::decode_or_default;
use serde::Deserialize;
use std::sync::Arc;

/// Issue as the model writes it; every field is optional so one sloppy
/// record does not void the whole report.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawIssue {
    #[serde(default, alias = "test_case_id")]
    test_case_id: String,
    #[serde(default, alias = "standard_id", alias = "standard")]
    standard_id: String,
    #[serde(default)]
    reason: String,
}

#[derive(Debug, Default, Deserialize)]
struct RawReport {
    #[serde(default)]
    issues: Vec<RawIssue>,
}

pub struct ComplianceCheckUseCase {
    llm_client: Arc<dyn LLMClient + Send + Sync>,
    corpora: Arc<CorpusRegistry>,
}

impl ComplianceCheckUseCase {
    pub fn new(llm_client: Arc<dyn LLMClient + Send + Sync>, corpora: Arc<CorpusRegistry>) -> Self {
        Self {
            llm_client,
            corpora,
        }
    }

    /// Never fails: a failed call or an unreadable answer yields an empty report.
    pub async fn execute(
        &self,
        config: &LLMConfig,
        test_cases: &str,
        requirements: &ParsedRequirements,
    ) -> ComplianceReport {
        let query = grounding_query(&[test_cases]);
        let grounding = self.corpora.retrieve(
            &[requirements.corpus_reference.as_str(), COMPLIANCE_CORPUS_ID],
            &query,
        );
        let context = PromptContext::new(
            build_compliance_system_prompt(),
            build_compliance_user_prompt(test_cases, &requirements.parsed_content),
        )
        .with_grounding(grounding);

        let raw = match self.llm_client.generate_with(config, &context).await {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(error = %e, "Compliance check call failed; reporting no issues");
                return ComplianceReport::default();
            }
        };

        let report = normalize(decode_or_default::<RawReport>(&raw));
        tracing::info!(issues = report.issues.len(), "Compliance check finished");
        report
    }
}

fn normalize(raw: RawReport) -> ComplianceReport {
    let mut issues = Vec::with_capacity(raw.issues.len());
    for issue in raw.issues {
        let test_case_id = issue.test_case_id.trim();
        if test_case_id.is_empty() {
            continue;
        }
        let Some(standard) = ComplianceStandard::parse(&issue.standard_id) else {
            tracing::debug!(standard_id = %issue.standard_id, "Dropping issue for unrecognized standard");
            continue;
        };
        issues.push(ComplianceIssue {
            test_case_id: test_case_id.to_string(),
            standard_id: standard.id().to_string(),
            reason: issue.reason.trim().to_string(),
        });
    }
    ComplianceReport { issues }
}
