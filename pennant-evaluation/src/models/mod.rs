//! Data model: source documents, shared enums and compiled flags

pub mod common;
pub mod flag;
pub mod source;

pub use common::{
    ConstraintType, ErrorEvaluationReason, EvaluationReason, FlagType, ResponseType,
    SegmentMatchType, SegmentOperator,
};
pub use flag::{
    CompiledFlag, EvaluationDistribution, EvaluationRollout, EvaluationRule, EvaluationSegment,
    FlagInfo, RolloutKind,
};
pub use source::Document;
