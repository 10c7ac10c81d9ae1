//! Evaluation requests and responses

use std::collections::HashMap;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use serde::Serialize;

use crate::models::common::{ErrorEvaluationReason, EvaluationReason, ResponseType};

/// A single flag evaluation request
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EvaluationRequest {
    pub flag_key: String,
    pub entity_id: String,
    pub context: HashMap<String, String>,
}

impl EvaluationRequest {
    pub fn new(flag_key: impl Into<String>, entity_id: impl Into<String>) -> Self {
        Self {
            flag_key: flag_key.into(),
            entity_id: entity_id.into(),
            context: HashMap::new(),
        }
    }

    /// Add a context property
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VariantEvaluationResponse {
    pub r#match: bool,
    pub segment_keys: Vec<String>,
    pub reason: EvaluationReason,
    pub flag_key: String,
    pub variant_key: String,
    pub variant_attachment: String,
    pub request_duration_millis: f64,
    /// Unix epoch milliseconds
    pub timestamp: u64,
}

impl VariantEvaluationResponse {
    pub(crate) fn new(flag_key: &str) -> Self {
        Self {
            r#match: false,
            segment_keys: Vec::new(),
            reason: EvaluationReason::Unknown,
            flag_key: flag_key.to_string(),
            variant_key: String::new(),
            variant_attachment: String::new(),
            request_duration_millis: 0.0,
            timestamp: now_millis(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BooleanEvaluationResponse {
    pub enabled: bool,
    pub flag_key: String,
    pub reason: EvaluationReason,
    pub request_duration_millis: f64,
    /// Unix epoch milliseconds
    pub timestamp: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorEvaluationResponse {
    pub flag_key: String,
    pub namespace_key: String,
    pub reason: ErrorEvaluationReason,
}

/// One entry of a batch response
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationResponse {
    pub r#type: ResponseType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub boolean_evaluation_response: Option<BooleanEvaluationResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variant_evaluation_response: Option<VariantEvaluationResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_evaluation_response: Option<ErrorEvaluationResponse>,
}

impl From<BooleanEvaluationResponse> for EvaluationResponse {
    fn from(response: BooleanEvaluationResponse) -> Self {
        Self {
            r#type: ResponseType::Boolean,
            boolean_evaluation_response: Some(response),
            variant_evaluation_response: None,
            error_evaluation_response: None,
        }
    }
}

impl From<VariantEvaluationResponse> for EvaluationResponse {
    fn from(response: VariantEvaluationResponse) -> Self {
        Self {
            r#type: ResponseType::Variant,
            boolean_evaluation_response: None,
            variant_evaluation_response: Some(response),
            error_evaluation_response: None,
        }
    }
}

impl From<ErrorEvaluationResponse> for EvaluationResponse {
    fn from(response: ErrorEvaluationResponse) -> Self {
        Self {
            r#type: ResponseType::Error,
            boolean_evaluation_response: None,
            variant_evaluation_response: None,
            error_evaluation_response: Some(response),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchEvaluationResponse {
    pub responses: Vec<EvaluationResponse>,
    pub request_duration_millis: f64,
}

pub(crate) fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

pub(crate) fn elapsed_millis(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}
