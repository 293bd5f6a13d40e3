use crate::domain::error::{AppError, Result};
use crate::domain::llm_config::LLMProvider;
use keyring::Entry;

/// Provider API keys kept in the OS credential store, one entry per provider.
pub struct ApiKeyStore {
    service: String,
}

impl ApiKeyStore {
    pub fn new(service: &str) -> Self {
        Self {
            service: service.to_string(),
        }
    }

    fn entry(&self, provider: LLMProvider) -> Result<Entry> {
        Entry::new(&self.service, provider.key_name())
            .map_err(|e| AppError::SecurityError(format!("Failed to create entry: {}", e)))
    }

    /// `Ok(None)` when nothing usable is stored for the provider.
    pub fn api_key(&self, provider: LLMProvider) -> Result<Option<String>> {
        match self.entry(provider)?.get_password() {
            Ok(key) if !key.trim().is_empty() => Ok(Some(key.trim().to_string())),
            Ok(_) | Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(AppError::SecurityError(format!(
                "Failed to read {} key: {}",
                provider.key_name(),
                e
            ))),
        }
    }
}
