use crate::pod::PodKey;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Pod cannot be translated into a task definition: {0}")]
    Translation(String),

    #[error("Pod already exists: {0}")]
    AlreadyExists(PodKey),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Transient back-end failure: {0}")]
    Transient(String),

    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    #[error("Back-end error: {0}")]
    Backend(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ProviderError {
    /// Whether the caller may retry the same call unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ProviderError::Transient(_))
    }
}

/// Errors reported by `TaskService` and `LogStore` implementations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    #[error("resource not found: {0}")]
    NotFound(String),

    #[error("request throttled: {0}")]
    Throttled(String),

    #[error("service unavailable: {0}")]
    Unavailable(String),

    #[error("request rejected: {0}")]
    Rejected(String),

    #[error("malformed response: {0}")]
    Malformed(String),
}

impl BackendError {
    pub fn is_transient(&self) -> bool {
        matches!(self, BackendError::Throttled(_) | BackendError::Unavailable(_))
    }
}

impl From<BackendError> for ProviderError {
    fn from(err: BackendError) -> Self {
        if err.is_transient() {
            ProviderError::Transient(err.to_string())
        } else {
            ProviderError::Backend(err.to_string())
        }
    }
}
