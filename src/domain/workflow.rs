use crate::domain::compliance::{ComplianceReport, ComplianceResult};
use crate::domain::document::{Document, ParsedRequirements, StoredDocument};
use crate::domain::error::{AppError, Result};
use crate::domain::jira::JiraIssue;
use crate::domain::test_case::TestCase;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkflowStage {
    Upload,
    Parse,
    Generate,
    Dashboard,
}

impl WorkflowStage {
    /// 1-based position shown by the step indicator.
    pub fn step(&self) -> u8 {
        match self {
            WorkflowStage::Upload => 1,
            WorkflowStage::Parse => 2,
            WorkflowStage::Generate => 3,
            WorkflowStage::Dashboard => 4,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowStage::Upload => "upload",
            WorkflowStage::Parse => "parse",
            WorkflowStage::Generate => "generate",
            WorkflowStage::Dashboard => "dashboard",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WorkflowAction {
    SubmitDocument,
    SubmitParseFeedback,
    ProceedToGenerate,
    SubmitRefinement,
    Approve,
    CheckCompliance,
    Export,
    Restart,
}

impl WorkflowAction {
    pub const ALL: [WorkflowAction; 8] = [
        WorkflowAction::SubmitDocument,
        WorkflowAction::SubmitParseFeedback,
        WorkflowAction::ProceedToGenerate,
        WorkflowAction::SubmitRefinement,
        WorkflowAction::Approve,
        WorkflowAction::CheckCompliance,
        WorkflowAction::Export,
        WorkflowAction::Restart,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowAction::SubmitDocument => "submit-document",
            WorkflowAction::SubmitParseFeedback => "submit-parse-feedback",
            WorkflowAction::ProceedToGenerate => "proceed-to-generate",
            WorkflowAction::SubmitRefinement => "submit-refinement",
            WorkflowAction::Approve => "approve",
            WorkflowAction::CheckCompliance => "check-compliance",
            WorkflowAction::Export => "export",
            WorkflowAction::Restart => "restart",
        }
    }

    pub fn allowed_in(&self, stage: WorkflowStage) -> bool {
        use WorkflowStage::*;
        match self {
            WorkflowAction::SubmitDocument => stage == Upload,
            WorkflowAction::SubmitParseFeedback | WorkflowAction::ProceedToGenerate => {
                stage == Parse
            }
            WorkflowAction::SubmitRefinement | WorkflowAction::Approve => stage == Generate,
            WorkflowAction::CheckCompliance => matches!(stage, Generate | Dashboard),
            WorkflowAction::Export => stage == Dashboard,
            WorkflowAction::Restart => true,
        }
    }
}

/// Server-side state of one guided run. Fields change only through the
/// `apply_*` methods, each of which is a complete, successful transition.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowSession {
    pub id: Uuid,
    pub stage: WorkflowStage,
    pub busy: bool,
    pub document: Option<Document>,
    pub stored_document: Option<StoredDocument>,
    pub parsed: Option<ParsedRequirements>,
    pub generated_test_cases: Vec<TestCase>,
    pub refined_test_cases: Option<Vec<TestCase>>,
    pub compliance: Option<ComplianceReport>,
    pub exported_issues: Vec<JiraIssue>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl WorkflowSession {
    pub fn new(id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id,
            stage: WorkflowStage::Upload,
            busy: false,
            document: None,
            stored_document: None,
            parsed: None,
            generated_test_cases: Vec::new(),
            refined_test_cases: None,
            compliance: None,
            exported_issues: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn ensure_allowed(&self, action: WorkflowAction) -> Result<()> {
        if action.allowed_in(self.stage) {
            Ok(())
        } else {
            Err(AppError::InvalidTransition(format!(
                "{} is not available in the {} stage",
                action.as_str(),
                self.stage.as_str()
            )))
        }
    }

    /// The most recent refinement, or else the generation output.
    pub fn current_test_cases(&self) -> &[TestCase] {
        self.refined_test_cases
            .as_deref()
            .unwrap_or(&self.generated_test_cases)
    }

    pub fn apply_document(
        &mut self,
        document: Document,
        stored: StoredDocument,
        parsed: ParsedRequirements,
    ) {
        self.clear_downstream_of_parse();
        self.document = Some(document);
        self.stored_document = Some(stored);
        self.parsed = Some(parsed);
        self.stage = WorkflowStage::Parse;
        self.touch();
    }

    pub fn apply_reparse(&mut self, stored: StoredDocument, parsed: ParsedRequirements) {
        self.stored_document = Some(stored);
        self.parsed = Some(parsed);
        self.touch();
    }

    pub fn apply_generated(&mut self, test_cases: Vec<TestCase>) {
        self.clear_downstream_of_parse();
        self.generated_test_cases = test_cases;
        self.stage = WorkflowStage::Generate;
        self.touch();
    }

    pub fn apply_refined(&mut self, test_cases: Vec<TestCase>) {
        self.refined_test_cases = Some(test_cases);
        self.compliance = None;
        self.touch();
    }

    pub fn apply_approved(&mut self) {
        self.stage = WorkflowStage::Dashboard;
        self.touch();
    }

    pub fn apply_compliance(&mut self, report: ComplianceReport) {
        self.compliance = Some(report);
        self.touch();
    }

    pub fn apply_export(&mut self, issues: Vec<JiraIssue>) {
        self.exported_issues = issues;
        self.touch();
    }

    /// Back to an empty upload step; identity and creation time survive.
    pub fn reset(&mut self) {
        let busy = self.busy;
        *self = Self {
            created_at: self.created_at,
            busy,
            ..Self::new(self.id)
        };
    }

    pub fn view(&self) -> WorkflowView {
        let test_cases = self.current_test_cases().to_vec();
        let compliance = self.compliance.as_ref().map(|report| {
            let ids: Vec<String> = test_cases.iter().map(|case| case.id.clone()).collect();
            ComplianceView {
                issues: report.issues.clone(),
                results: report.matrix(&ids),
            }
        });

        WorkflowView {
            id: self.id,
            stage: self.stage,
            step: self.stage.step(),
            busy: self.busy,
            document: self.document.as_ref().map(|document| DocumentSummary {
                mime_type: document.mime_type.clone(),
                file_name: document.file_name.clone(),
                size_bytes: document.len(),
                digest: self
                    .stored_document
                    .as_ref()
                    .map(|stored| stored.digest.clone()),
            }),
            parsed_requirements: self.parsed.clone(),
            test_cases,
            refined: self.refined_test_cases.is_some(),
            compliance,
            exported_issues: self.exported_issues.clone(),
            allowed_actions: WorkflowAction::ALL
                .into_iter()
                .filter(|action| !self.busy && action.allowed_in(self.stage))
                .collect(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    fn clear_downstream_of_parse(&mut self) {
        self.generated_test_cases.clear();
        self.refined_test_cases = None;
        self.compliance = None;
        self.exported_issues.clear();
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentSummary {
    pub mime_type: String,
    pub file_name: Option<String>,
    pub size_bytes: usize,
    pub digest: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplianceView {
    pub issues: Vec<crate::domain::compliance::ComplianceIssue>,
    pub results: Vec<ComplianceResult>,
}

/// Read model returned by every workflow call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowView {
    pub id: Uuid,
    pub stage: WorkflowStage,
    pub step: u8,
    pub busy: bool,
    pub document: Option<DocumentSummary>,
    pub parsed_requirements: Option<ParsedRequirements>,
    pub test_cases: Vec<TestCase>,
    pub refined: bool,
    pub compliance: Option<ComplianceView>,
    pub exported_issues: Vec<JiraIssue>,
    pub allowed_actions: Vec<WorkflowAction>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
