use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AppError {
    Internal(String),
    NotFound(String),
    ValidationError(String),
    ParseError(String),
    LLMError(String),
    SecurityError(String),
    ConfigError(String),
    IoError(String),
    StorageError(String),
    IngestionError(String),
    GenerationError(String),
    RefinementError(String),
    ExportError(String),
    Busy(String),
    InvalidTransition(String),
    Timeout(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
            AppError::NotFound(msg) => write!(f, "Not found: {}", msg),
            AppError::ValidationError(msg) => write!(f, "Validation error: {}", msg),
            AppError::ParseError(msg) => write!(f, "Parse error: {}", msg),
            AppError::LLMError(msg) => write!(f, "LLM error: {}", msg),
            AppError::SecurityError(msg) => write!(f, "Security error: {}", msg),
            AppError::ConfigError(msg) => write!(f, "Config error: {}", msg),
            AppError::IoError(msg) => write!(f, "IO error: {}", msg),
            AppError::StorageError(msg) => write!(f, "Storage error: {}", msg),
            AppError::IngestionError(msg) => write!(f, "Ingestion error: {}", msg),
            AppError::GenerationError(msg) => write!(f, "Generation error: {}", msg),
            AppError::RefinementError(msg) => write!(f, "Refinement error: {}", msg),
            AppError::ExportError(msg) => write!(f, "Export error: {}", msg),
            AppError::Busy(msg) => write!(f, "Busy: {}", msg),
            AppError::InvalidTransition(msg) => write!(f, "Invalid transition: {}", msg),
            AppError::Timeout(msg) => write!(f, "Timed out: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::IoError(err.to_string())
    }
}

impl AppError {
    /// Message without the kind prefix, suitable for `{ "error": ... }` bodies.
    pub fn message(&self) -> &str {
        match self {
            AppError::Internal(msg)
            | AppError::NotFound(msg)
            | AppError::ValidationError(msg)
            | AppError::ParseError(msg)
            | AppError::LLMError(msg)
            | AppError::SecurityError(msg)
            | AppError::ConfigError(msg)
            | AppError::IoError(msg)
            | AppError::StorageError(msg)
            | AppError::IngestionError(msg)
            | AppError::GenerationError(msg)
            | AppError::RefinementError(msg)
            | AppError::ExportError(msg)
            | AppError::Busy(msg)
            | AppError::InvalidTransition(msg)
            | AppError::Timeout(msg) => msg,
        }
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
