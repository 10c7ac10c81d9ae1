//! Adapter errors

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum AdapterError {
    #[error("{0} must not be null")]
    NullArgument(&'static str),

    /// Carries the message reported by `engine_last_error`
    #[error("{0}")]
    Construction(String),

    #[error("engine returned no response")]
    NullResponse,

    #[error("foreign runtime error: {0}")]
    Runtime(String),

    #[error("native binding panicked")]
    Panic,
}

pub type AdapterResult<T> = Result<T, AdapterError>;
