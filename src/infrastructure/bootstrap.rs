use std::sync::{Arc, Mutex};
use std::time::Duration;

use tracing::{error, info};

use crate::application::use_cases::compliance_check::ComplianceCheckUseCase;
use crate::application::use_cases::document_ingestion::DocumentIngestionUseCase;
use crate::application::use_cases::grounding::CorpusRegistry;
use crate::application::use_cases::jira_export::JiraExportUseCase;
use crate::application::use_cases::test_generation::TestCaseAuthoringUseCase;
use crate::application::use_cases::workflow::WorkflowEngine;
use crate::domain::error::Result;
use crate::infrastructure::config::AppConfig;
use crate::infrastructure::llm_clients::{LLMClient, RouterClient};
use crate::infrastructure::storage::DocumentStore;
use crate::infrastructure::tracker::{IssueTracker, SimulatedJiraTracker};
use crate::interfaces::http::{add_log, LogEntry};
use crate::interfaces::AppState;

/// Wires the production adapters: the provider router, the simulated Jira
/// tracker and the on-disk document store.
pub fn build_state(config: &AppConfig, logs: Arc<Mutex<Vec<LogEntry>>>) -> Result<AppState> {
    let tracker = SimulatedJiraTracker::new(&config.tracker).map_err(|err| {
        error!(error = %err, base_url = %config.tracker.base_url, "Invalid tracker configuration");
        err
    })?;

    build_state_with(config, Arc::new(RouterClient::new()), Arc::new(tracker), logs)
}

pub fn build_state_with(
    config: &AppConfig,
    llm_client: Arc<dyn LLMClient + Send + Sync>,
    tracker: Arc<dyn IssueTracker + Send + Sync>,
    logs: Arc<Mutex<Vec<LogEntry>>>,
) -> Result<AppState> {
    let store = DocumentStore::new(&config.storage.data_dir).map_err(|err| {
        error!(
            error = %err,
            data_dir = %config.storage.data_dir.display(),
            "Failed to prepare document store"
        );
        err
    })?;
    let corpora = CorpusRegistry::with_guidelines(config.grounding.clone()).map_err(|err| {
        error!(error = %err, "Failed to load compliance guidelines");
        err
    })?;

    let store = Arc::new(store);
    let corpora = Arc::new(corpora);

    let workflow = WorkflowEngine::new(
        DocumentIngestionUseCase::new(llm_client.clone(), store.clone(), corpora.clone()),
        TestCaseAuthoringUseCase::new(llm_client.clone(), corpora.clone()),
        ComplianceCheckUseCase::new(llm_client.clone(), corpora),
        JiraExportUseCase::new(tracker),
        config.llm.clone(),
        config.workflow.clone(),
        logs.clone(),
    );

    add_log(
        &logs,
        "INFO",
        "BOOT",
        &format!(
            "Workflow ready (provider={:?} model={} data_dir={})",
            config.llm.provider,
            config.llm.model,
            store.root().display()
        ),
    );

    Ok(AppState {
        workflow: Arc::new(workflow),
        llm_client,
        llm_config: config.llm.clone(),
    })
}

/// Periodically drops idle sessions and the corpora only they referenced.
pub fn spawn_session_sweeper(
    workflow: Arc<WorkflowEngine>,
    every: Duration,
    logs: Arc<Mutex<Vec<LogEntry>>>,
) -> tokio::task::JoinHandle<()> {
    add_log(
        &logs,
        "INFO",
        "BOOT",
        &format!("Session sweeper running every {}s", every.as_secs()),
    );
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let evicted = workflow.evict_idle_sessions();
            if evicted > 0 {
                info!(sessions = evicted, "Session sweep finished");
            }
        }
    })
}
