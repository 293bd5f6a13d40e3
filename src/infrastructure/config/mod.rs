use crate::application::use_cases::grounding::GroundingConfig;
use crate::application::use_cases::workflow::WorkflowConfig;
use crate::domain::error::{AppError, Result};
use crate::domain::llm_config::{LLMConfig, LLMProvider};
use crate::infrastructure::security::keyring::ApiKeyStore;
use crate::infrastructure::tracker::TrackerConfig;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

const DEFAULT_CONFIG_FILE: &str = "casewise.toml";
const CONFIG_PATH_ENV: &str = "CASEWISE_CONFIG";
const ENV_PREFIX: &str = "CASEWISE_";
const KEYRING_SERVICE: &str = "Casewise";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3001,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub llm: LLMConfig,
    pub storage: StorageConfig,
    pub grounding: GroundingConfig,
    pub workflow: WorkflowConfig,
    pub tracker: TrackerConfig,
}

impl AppConfig {
    /// Defaults, then the TOML file, then `CASEWISE_*` variables
    /// (`CASEWISE_LLM__MODEL=...` sets `llm.model`).
    pub fn figment() -> Figment {
        let path = std::env::var(CONFIG_PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_FILE));

        Figment::from(Serialized::defaults(AppConfig::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    pub fn load() -> Result<Self> {
        Self::from_figment(Self::figment())
    }

    pub fn from_figment(figment: Figment) -> Result<Self> {
        let config: AppConfig = figment
            .extract()
            .map_err(|e| AppError::ConfigError(format!("Failed to load configuration: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.llm.base_url.trim().is_empty() {
            return Err(AppError::ConfigError("llm.base_url must be set".to_string()));
        }
        if self.llm.model.trim().is_empty() {
            return Err(AppError::ConfigError("llm.model must be set".to_string()));
        }
        if self.grounding.max_chunk_size == 0 || self.grounding.top_k == 0 {
            return Err(AppError::ConfigError(
                "grounding.max_chunk_size and grounding.top_k must be positive".to_string(),
            ));
        }
        if self.workflow.adapter_timeout_secs == 0 {
            return Err(AppError::ConfigError(
                "workflow.adapter_timeout_secs must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

pub struct ConfigService {
    keys: ApiKeyStore,
}

impl ConfigService {
    pub fn new() -> Self {
        Self {
            keys: ApiKeyStore::new(KEYRING_SERVICE),
        }
    }

    pub fn get_api_key(&self, provider: LLMProvider) -> Result<Option<String>> {
        self.keys.api_key(provider)
    }

    /// Fills a missing API key from the OS keyring. A missing keyring entry is
    /// not fatal here; the first model call reports it instead.
    pub fn resolve_api_key(&self, config: &mut LLMConfig) {
        let has_key = config
            .api_key
            .as_deref()
            .map(|key| !key.trim().is_empty())
            .unwrap_or(false);
        if has_key || !config.provider.requires_api_key() {
            return;
        }

        let provider = config.provider.key_name();
        match self.get_api_key(config.provider) {
            Ok(Some(key)) => {
                tracing::info!(provider, "Using API key from keyring");
                config.api_key = Some(key);
            }
            Ok(None) => {
                tracing::warn!(provider, "No API key configured and none found in keyring");
            }
            Err(e) => {
                tracing::warn!(provider, error = %e, "Keyring lookup failed");
            }
        }
    }
}
