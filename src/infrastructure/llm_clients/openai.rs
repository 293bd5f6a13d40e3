use super::LLMClient;
use crate::domain::error::{AppError, Result};
use crate::domain::llm_config::LLMConfig;
use async_trait::async_trait;
use serde_json::json;

/// Chat-completions client for OpenAI, OpenRouter and local OpenAI-compatible servers.
pub struct OpenAIClient {
    client: reqwest::Client,
}

impl OpenAIClient {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(120))
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
        }
    }

    fn endpoint(config: &LLMConfig, path: &str) -> String {
        if config.base_url.ends_with('/') {
            format!("{}{}", config.base_url, path)
        } else {
            format!("{}/{}", config.base_url, path)
        }
    }

    fn authorize(
        config: &LLMConfig,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::RequestBuilder> {
        match &config.api_key {
            Some(api_key) => Ok(request.bearer_auth(api_key)),
            None if config.provider.requires_api_key() => Err(AppError::LLMError(format!(
                "Missing API key for {:?} provider",
                config.provider
            ))),
            None => Ok(request),
        }
    }

    fn request_body(config: &LLMConfig, system: &str, user: &str) -> serde_json::Value {
        json!({
            "model": config.model,
            "messages": [
                {
                    "role": "system",
                    "content": system
                },
                {
                    "role": "user",
                    "content": user
                }
            ],
            "max_tokens": config.max_tokens,
            "temperature": config.temperature,
        })
    }
}

#[async_trait]
impl LLMClient for OpenAIClient {
    async fn generate(&self, config: &LLMConfig, system: &str, user: &str) -> Result<String> {
        let url = Self::endpoint(config, "chat/completions");
        let request = Self::authorize(config, self.client.post(&url))?;

        let response = request
            .json(&Self::request_body(config, system, user))
            .send()
            .await
            .map_err(|e| AppError::LLMError(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(AppError::LLMError(format!(
                "API error ({}): {}",
                status, text
            )));
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| AppError::LLMError(format!("Failed to parse JSON: {}", e)))?;

        if json["choices"].as_array().map_or(true, |choices| choices.is_empty()) {
            return Err(AppError::LLMError("Invalid response format".to_string()));
        }

        // A null content means the model produced nothing; callers decide what empty means.
        Ok(json["choices"][0]["message"]["content"]
            .as_str()
            .unwrap_or_default()
            .to_string())
    }

    async fn list_models(&self, config: &LLMConfig) -> Result<Vec<String>> {
        let url = Self::endpoint(config, "models");
        let request = Self::authorize(config, self.client.get(&url))?;

        let response = request
            .send()
            .await
            .map_err(|e| AppError::LLMError(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(AppError::LLMError(format!(
                "API error ({}): {}",
                status, text
            )));
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| AppError::LLMError(format!("Failed to parse JSON: {}", e)))?;

        let mut models: Vec<String> = json["data"]
            .as_array()
            .ok_or_else(|| {
                AppError::LLMError("Invalid response format: missing data array".to_string())
            })?
            .iter()
            .filter_map(|m| m["id"].as_str())
            .map(|id| id.to_string())
            .collect();
        models.sort();
        models.dedup();

        Ok(models)
    }
}
