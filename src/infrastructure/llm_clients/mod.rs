pub mod gemini;
pub mod openai;
#[cfg(test)]
pub mod scripted;

use crate::domain::error::Result;
use crate::domain::llm_config::{LLMConfig, LLMProvider, PromptContext};
use async_trait::async_trait;
use gemini::GeminiClient;
use openai::OpenAIClient;

#[async_trait]
pub trait LLMClient {
    async fn generate(&self, config: &LLMConfig, system: &str, user: &str) -> Result<String>;

    /// Grounded variant: excerpts are folded into the system instructions.
    /// Clients that can read raw documents override this to send the attachment.
    async fn generate_with(&self, config: &LLMConfig, context: &PromptContext) -> Result<String> {
        self.generate(config, &context.grounded_system(), &context.user)
            .await
    }

    async fn list_models(&self, config: &LLMConfig) -> Result<Vec<String>>;
}

pub struct RouterClient {
    openai: OpenAIClient,
    gemini: GeminiClient,
}

impl RouterClient {
    pub fn new() -> Self {
        Self {
            openai: OpenAIClient::new(),
            gemini: GeminiClient::new(),
        }
    }
}

#[async_trait]
impl LLMClient for RouterClient {
    async fn generate(&self, config: &LLMConfig, system: &str, user: &str) -> Result<String> {
        match config.provider {
            LLMProvider::Google => self.gemini.generate(config, system, user).await,
            _ => self.openai.generate(config, system, user).await,
        }
    }

    async fn generate_with(&self, config: &LLMConfig, context: &PromptContext) -> Result<String> {
        match config.provider {
            LLMProvider::Google => self.gemini.generate_with(config, context).await,
            _ => self.openai.generate_with(config, context).await,
        }
    }

    async fn list_models(&self, config: &LLMConfig) -> Result<Vec<String>> {
        match config.provider {
            LLMProvider::Google => self.gemini.list_models(config).await,
            _ => self.openai.list_models(config).await,
        }
    }
}
