//! The four-stage requirements-to-test-case journey.
//!
//! Every action runs as: begin (busy + stage check), call the adapter under a
//! timeout, then commit. Any failure drops the guard, which clears the busy
//! flag and leaves the session exactly as it was.

pub mod registry;

use crate::application::use_cases::compliance_check::ComplianceCheckUseCase;
use crate::application::use_cases::document_ingestion::DocumentIngestionUseCase;
use crate::application::use_cases::jira_export::JiraExportUseCase;
use crate::application::use_cases::test_case_splitter::split_test_cases;
use crate::application::use_cases::test_generation::TestCaseAuthoringUseCase;
use crate::domain::compliance::ComplianceReport;
use crate::domain::document::Document;
use crate::domain::error::{AppError, Result};
use crate::domain::llm_config::LLMConfig;
use crate::domain::test_case::{join_test_cases, ExportRecord};
use crate::domain::workflow::{WorkflowAction, WorkflowSession, WorkflowView};
use crate::interfaces::http::{add_log, LogEntry};
use registry::{BusyGuard, SessionRegistry};
use serde::{Deserialize, Serialize};
use std::future::Future;
use chrono::Utc;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowConfig {
    pub adapter_timeout_secs: u64,
    pub max_document_bytes: usize,
    pub max_feedback_chars: usize,
    /// Idle sessions are dropped after this many seconds; 0 keeps them.
    pub session_ttl_secs: u64,
    pub session_sweep_secs: u64,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            adapter_timeout_secs: 120,
            max_document_bytes: 20 * 1024 * 1024,
            max_feedback_chars: 4000,
            session_ttl_secs: 3600,
            session_sweep_secs: 60,
        }
    }
}

impl WorkflowConfig {
    pub fn session_idle_ttl(&self) -> Option<Duration> {
        (self.session_ttl_secs > 0).then(|| Duration::from_secs(self.session_ttl_secs))
    }

    pub fn session_sweep_interval(&self) -> Duration {
        Duration::from_secs(self.session_sweep_secs.max(1))
    }
}

pub struct WorkflowEngine {
    ingestion: DocumentIngestionUseCase,
    authoring: TestCaseAuthoringUseCase,
    compliance: ComplianceCheckUseCase,
    export: JiraExportUseCase,
    sessions: SessionRegistry,
    llm_config: LLMConfig,
    config: WorkflowConfig,
    logs: Arc<Mutex<Vec<LogEntry>>>,
}

impl WorkflowEngine {
    pub fn new(
        ingestion: DocumentIngestionUseCase,
        authoring: TestCaseAuthoringUseCase,
        compliance: ComplianceCheckUseCase,
        export: JiraExportUseCase,
        llm_config: LLMConfig,
        config: WorkflowConfig,
        logs: Arc<Mutex<Vec<LogEntry>>>,
    ) -> Self {
        Self {
            ingestion,
            authoring,
            compliance,
            export,
            sessions: SessionRegistry::new(config.session_idle_ttl()),
            llm_config,
            config,
            logs,
        }
    }

    pub fn create_session(&self) -> WorkflowView {
        self.evict_idle_sessions();
        let handle = self.sessions.create();
        let view = handle.view();
        tracing::info!(session_id = %view.id, "Session created");
        view
    }

    /// Always available, including while an action is running.
    pub fn view(&self, session_id: Uuid) -> Result<WorkflowView> {
        Ok(self.sessions.get(session_id)?.view())
    }

    pub fn delete_session(&self, session_id: Uuid) -> Result<()> {
        self.sessions.remove(session_id)?;
        tracing::info!(session_id = %session_id, "Session deleted");
        self.release_unused_corpora();
        Ok(())
    }

    /// Drops sessions idle past the configured TTL, then the document
    /// corpora nothing refers to any more.
    pub fn evict_idle_sessions(&self) -> usize {
        let evicted = self.sessions.evict_idle(Utc::now());
        if !evicted.is_empty() {
            tracing::info!(sessions = evicted.len(), "Evicted idle sessions");
            add_log(
                &self.logs,
                "INFO",
                "WORKFLOW",
                &format!("Evicted {} idle session(s)", evicted.len()),
            );
        }
        self.release_unused_corpora();
        evicted.len()
    }

    fn release_unused_corpora(&self) {
        let cutoff = Instant::now();
        let Some(live) = self.sessions.live_corpora() else {
            return;
        };
        let released = self.ingestion.retain_corpora(&live, cutoff);
        if released > 0 {
            tracing::debug!(corpora = released, "Released unused grounding corpora");
        }
    }

    pub async fn submit_document(&self, session_id: Uuid, document: Document) -> Result<WorkflowView> {
        self.validate_document(&document)?;
        let guard = self.begin(session_id, WorkflowAction::SubmitDocument)?;

        let output = self
            .finish(
                &guard,
                self.ingestion
                    .execute(&self.llm_config, &document, None, None),
            )
            .await?;

        Ok(self.commit(guard, |session| {
            session.apply_document(document, output.stored, output.parsed)
        }))
    }

    pub async fn submit_parse_feedback(&self, session_id: Uuid, feedback: &str) -> Result<WorkflowView> {
        let feedback = self.validate_feedback(feedback)?;
        let guard = self.begin(session_id, WorkflowAction::SubmitParseFeedback)?;
        let document = guard
            .session()
            .document
            .clone()
            .ok_or_else(|| AppError::Internal("Parse stage without a document".to_string()))?;
        let cached = guard.session().stored_document.clone();

        let output = self
            .finish(
                &guard,
                self.ingestion.execute(
                    &self.llm_config,
                    &document,
                    cached.as_ref(),
                    Some(feedback),
                ),
            )
            .await?;

        Ok(self.commit(guard, |session| {
            session.apply_reparse(output.stored, output.parsed)
        }))
    }

    pub async fn generate(&self, session_id: Uuid) -> Result<WorkflowView> {
        let guard = self.begin(session_id, WorkflowAction::ProceedToGenerate)?;
        let parsed = guard
            .session()
            .parsed
            .clone()
            .ok_or_else(|| AppError::Internal("Parse stage without parsed requirements".to_string()))?;

        let generated = self
            .finish(&guard, self.authoring.generate(&self.llm_config, &parsed))
            .await?;

        let test_cases = split_test_cases(&generated.test_cases);
        if test_cases.is_empty() {
            return Err(self.fail(
                &guard,
                AppError::GenerationError("No test cases were produced.".to_string()),
            ));
        }

        Ok(self.commit(guard, |session| session.apply_generated(test_cases)))
    }

    pub async fn refine(&self, session_id: Uuid, feedback: &str) -> Result<WorkflowView> {
        let feedback = self.validate_feedback(feedback)?;
        let guard = self.begin(session_id, WorkflowAction::SubmitRefinement)?;
        let parsed = guard
            .session()
            .parsed
            .clone()
            .ok_or_else(|| AppError::Internal("Generate stage without parsed requirements".to_string()))?;
        let current = join_test_cases(guard.session().current_test_cases());

        let refined = self
            .finish(
                &guard,
                self.authoring
                    .refine(&self.llm_config, &current, feedback, &parsed),
            )
            .await?;

        let test_cases = split_test_cases(&refined.refined_test_cases);
        if test_cases.is_empty() {
            return Err(self.fail(
                &guard,
                AppError::RefinementError(
                    "Refinement produced no test cases; the current list was kept.".to_string(),
                ),
            ));
        }

        Ok(self.commit(guard, |session| session.apply_refined(test_cases)))
    }

    pub fn approve(&self, session_id: Uuid) -> Result<WorkflowView> {
        let guard = self.begin(session_id, WorkflowAction::Approve)?;
        Ok(self.commit(guard, |session| session.apply_approved()))
    }

    /// Never reports a model failure: timeouts and unusable answers become an
    /// empty report.
    pub async fn check_compliance(&self, session_id: Uuid) -> Result<WorkflowView> {
        let guard = self.begin(session_id, WorkflowAction::CheckCompliance)?;
        let parsed = guard
            .session()
            .parsed
            .clone()
            .ok_or_else(|| AppError::Internal("Compliance check without parsed requirements".to_string()))?;
        let test_cases = join_test_cases(guard.session().current_test_cases());

        let check = self
            .compliance
            .execute(&self.llm_config, &test_cases, &parsed);
        let report = match tokio::time::timeout(self.timeout(), check).await {
            Ok(report) => report,
            Err(_) => {
                tracing::warn!(
                    session_id = %guard.session().id,
                    timeout_secs = self.config.adapter_timeout_secs,
                    "Compliance check timed out; reporting no issues"
                );
                ComplianceReport::default()
            }
        };

        Ok(self.commit(guard, |session| session.apply_compliance(report)))
    }

    pub async fn export(&self, session_id: Uuid) -> Result<WorkflowView> {
        let guard = self.begin(session_id, WorkflowAction::Export)?;
        let records: Vec<ExportRecord> = guard
            .session()
            .current_test_cases()
            .iter()
            .map(|test_case| test_case.to_export_record())
            .collect();

        let result = self.finish(&guard, self.export.execute(&records)).await?;

        Ok(self.commit(guard, |session| {
            session.apply_export(result.created_issues)
        }))
    }

    pub fn restart(&self, session_id: Uuid) -> Result<WorkflowView> {
        let guard = self.begin(session_id, WorkflowAction::Restart)?;
        let view = self.commit(guard, |session| session.reset());
        self.release_unused_corpora();
        Ok(view)
    }

    fn begin(&self, session_id: Uuid, action: WorkflowAction) -> Result<BusyGuard> {
        let handle = self.sessions.get(session_id)?;
        let guard = handle.begin(action).map_err(|e| {
            tracing::info!(session_id = %session_id, action = action.as_str(), error = %e, "Action rejected");
            e
        })?;
        tracing::info!(
            session_id = %session_id,
            action = action.as_str(),
            stage = guard.session().stage.as_str(),
            "Action started"
        );
        Ok(guard)
    }

    /// Awaits an adapter call under the configured timeout and records failures.
    async fn finish<T, F>(&self, guard: &BusyGuard, call: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        let result = match tokio::time::timeout(self.timeout(), call).await {
            Ok(result) => result,
            Err(_) => Err(AppError::Timeout(format!(
                "{} did not finish within {} seconds",
                guard.action().as_str(),
                self.config.adapter_timeout_secs
            ))),
        };
        result.map_err(|e| self.fail(guard, e))
    }

    fn fail(&self, guard: &BusyGuard, error: AppError) -> AppError {
        let session = guard.session();
        tracing::warn!(
            session_id = %session.id,
            action = guard.action().as_str(),
            stage = session.stage.as_str(),
            error = %error,
            "Action failed"
        );
        add_log(
            &self.logs,
            "ERROR",
            "WORKFLOW",
            &format!("{} failed: {}", guard.action().as_str(), error),
        );
        error
    }

    fn commit<F>(&self, guard: BusyGuard, apply: F) -> WorkflowView
    where
        F: FnOnce(&mut WorkflowSession),
    {
        let action = guard.action();
        let view = guard.commit(apply);
        tracing::info!(
            session_id = %view.id,
            action = action.as_str(),
            stage = view.stage.as_str(),
            test_cases = view.test_cases.len(),
            "Action completed"
        );
        add_log(
            &self.logs,
            "INFO",
            "WORKFLOW",
            &format!("{} completed; stage is now {}", action.as_str(), view.stage.as_str()),
        );
        view
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(self.config.adapter_timeout_secs.max(1))
    }

    fn validate_document(&self, document: &Document) -> Result<()> {
        if document.is_empty() {
            return Err(AppError::ValidationError("Document is empty.".to_string()));
        }
        if document.len() > self.config.max_document_bytes {
            return Err(AppError::ValidationError(format!(
                "Document is {} bytes; the limit is {} bytes.",
                document.len(),
                self.config.max_document_bytes
            )));
        }
        Ok(())
    }

    fn validate_feedback<'a>(&self, feedback: &'a str) -> Result<&'a str> {
        let feedback = feedback.trim();
        if feedback.is_empty() {
            return Err(AppError::ValidationError("Feedback must not be empty.".to_string()));
        }
        if feedback.chars().count() > self.config.max_feedback_chars {
            return Err(AppError::ValidationError(format!(
                "Feedback is limited to {} characters.",
                self.config.max_feedback_chars
            )));
        }
        Ok(feedback)
    }
}
