//! Pennant Evaluation
//!
//! Flag document model, compiled snapshots and the rules that turn an
//! entity and its context into a boolean or variant result.

pub mod bucket;
pub mod error;
pub mod evaluator;
pub mod matcher;
pub mod models;
pub mod response;
pub mod store;

pub use error::{EvaluationError, EvaluationResult};
pub use evaluator::Evaluator;
pub use models::{Document, EvaluationReason, FlagInfo, FlagType};
pub use response::{
    BatchEvaluationResponse, BooleanEvaluationResponse, ErrorEvaluationResponse,
    EvaluationRequest, EvaluationResponse, VariantEvaluationResponse,
};
pub use store::Snapshot;
