use crate::application::use_cases::workflow::WorkflowEngine;
use crate::domain::llm_config::LLMConfig;
use crate::infrastructure::llm_clients::LLMClient;
use std::sync::Arc;

pub struct AppState {
    pub workflow: Arc<WorkflowEngine>,
    pub llm_client: Arc<dyn LLMClient + Send + Sync>,
    pub llm_config: LLMConfig,
}
