//! Errors produced while compiling snapshots and evaluating flags

use thiserror::Error;

/// Evaluation errors
///
/// These never cross the C ABI as a separate channel. The engine renders
/// them into the `error_message` member of the response payload.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum EvaluationError {
    #[error("error parsing json: {0}")]
    InvalidJson(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("invalid document: {0}")]
    InvalidDocument(String),

    #[error("source error: {0}")]
    Source(String),

    #[error("unknown error: {0}")]
    Unknown(String),
}

impl From<serde_json::Error> for EvaluationError {
    fn from(err: serde_json::Error) -> Self {
        EvaluationError::InvalidJson(err.to_string())
    }
}

/// Result type for evaluation operations
pub type EvaluationResult<T> = Result<T, EvaluationError>;
