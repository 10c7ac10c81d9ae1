//! Compiled, evaluation-ready forms of document entities

use serde::Serialize;

use super::common::{FlagType, SegmentMatchType, SegmentOperator};
use super::source::{Constraint, Variant};

/// Public view of a flag, as returned by `list_flags`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlagInfo {
    pub key: String,
    pub name: String,
    pub enabled: bool,
    pub r#type: FlagType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_variant: Option<Variant>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationSegment {
    pub key: String,
    pub match_type: SegmentMatchType,
    pub constraints: Vec<Constraint>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationDistribution {
    pub variant_key: String,
    pub rollout: f32,
    pub attachment: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationRule {
    /// 1-based position in the flag's rule list
    pub rank: usize,
    pub segment_operator: SegmentOperator,
    pub segments: Vec<EvaluationSegment>,
    pub distributions: Vec<EvaluationDistribution>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RolloutKind {
    Threshold {
        percentage: f32,
        value: bool,
    },
    Segment {
        segment_operator: SegmentOperator,
        segments: Vec<EvaluationSegment>,
        value: bool,
    },
    /// Neither a threshold nor a segment was given; never matches
    Unknown,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationRollout {
    pub rank: usize,
    pub kind: RolloutKind,
}

/// A flag with its rules and rollouts, ready to evaluate
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledFlag {
    pub info: FlagInfo,
    pub rules: Vec<EvaluationRule>,
    pub rollouts: Vec<EvaluationRollout>,
}
