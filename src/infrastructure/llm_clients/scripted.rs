//! Canned-response client used by the use-case and HTTP tests.

use super::LLMClient;
use crate::domain::error::{AppError, Result};
use crate::domain::llm_config::{LLMConfig, PromptContext};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub system: String,
    pub user: String,
    pub has_attachment: bool,
    pub grounding_corpora: Vec<String>,
}

pub struct ScriptedClient {
    responses: Mutex<VecDeque<Result<String>>>,
    calls: Mutex<Vec<RecordedCall>>,
    delay: Option<Duration>,
}

impl ScriptedClient {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
            delay: None,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn reply(self, text: &str) -> Self {
        self.responses.lock().unwrap().push_back(Ok(text.to_string()));
        self
    }

    pub fn fail(self, message: &str) -> Self {
        self.responses
            .lock()
            .unwrap()
            .push_back(Err(AppError::LLMError(message.to_string())));
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    async fn next(&self, call: RecordedCall) -> Result<String> {
        self.calls.lock().unwrap().push(call);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(AppError::LLMError("No scripted response left".to_string())))
    }
}

#[async_trait]
impl LLMClient for ScriptedClient {
    async fn generate(&self, _config: &LLMConfig, system: &str, user: &str) -> Result<String> {
        self.next(RecordedCall {
            system: system.to_string(),
            user: user.to_string(),
            has_attachment: false,
            grounding_corpora: Vec::new(),
        })
        .await
    }

    async fn generate_with(&self, _config: &LLMConfig, context: &PromptContext) -> Result<String> {
        let mut corpora: Vec<String> = Vec::new();
        for excerpt in &context.grounding {
            if !corpora.contains(&excerpt.corpus_id) {
                corpora.push(excerpt.corpus_id.clone());
            }
        }
        self.next(RecordedCall {
            system: context.grounded_system(),
            user: context.user.clone(),
            has_attachment: context.attachment.is_some(),
            grounding_corpora: corpora,
        })
        .await
    }

    async fn list_models(&self, _config: &LLMConfig) -> Result<Vec<String>> {
        Ok(vec!["scripted".to_string()])
    }
}
