//! Engine errors

use pennant_evaluation::EvaluationError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid engine options: {0}")]
    InvalidOptions(String),

    #[error("failed to read snapshot {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Evaluation(#[from] EvaluationError),

    #[error("failed to start snapshot refresh: {0}")]
    Spawn(String),
}

impl EngineError {
    /// Form stored as the evaluator's sticky error
    pub fn into_evaluation(self) -> EvaluationError {
        match self {
            EngineError::Evaluation(err) => err,
            other => EvaluationError::Source(other.to_string()),
        }
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
