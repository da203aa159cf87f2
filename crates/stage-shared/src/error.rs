//! Error types for stage navigation.

use thiserror::Error;

/// Failure reported by a generative classification backend.
///
/// Connection and timeout failures are transient and may be retried by the
/// adapter. A response failure means a reply arrived but could not be used,
/// and retrying would only repeat it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    #[error("Backend connection failed: {0}")]
    Connection(String),

    #[error("Backend timed out: {0}")]
    Timeout(String),

    #[error("Backend response invalid: {0}")]
    Response(String),
}

impl BackendError {
    /// Whether another attempt may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, BackendError::Connection(_) | BackendError::Timeout(_))
    }

    /// Short label for log lines
    pub fn kind(&self) -> &'static str {
        match self {
            BackendError::Connection(_) => "connection",
            BackendError::Timeout(_) => "timeout",
            BackendError::Response(_) => "response",
        }
    }
}

#[derive(Error, Debug)]
pub enum StageError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid task context: {0}")]
    InvalidContext(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
