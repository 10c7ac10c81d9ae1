//! JSON payload codec
//!
//! Requests arrive as `{flag_key, entity_id, context?}` (a JSON array of
//! those for batches). Every operation answers with the same envelope:
//!
//! ```json
//! {"status": "success", "result": {...}, "error_message": null}
//! {"status": "failure", "result": null, "error_message": "..."}
//! ```

use std::collections::HashMap;
use std::fmt::Display;

use pennant_evaluation::{EvaluationError, EvaluationRequest, EvaluationResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::error;

/// Returned when an envelope cannot be encoded
pub const ENCODE_FAILURE: &str =
    r#"{"status":"failure","result":null,"error_message":"failed to encode response"}"#;

#[derive(Deserialize)]
struct RequestPayload {
    flag_key: String,
    entity_id: String,
    #[serde(default)]
    context: Option<Map<String, Value>>,
}

impl From<RequestPayload> for EvaluationRequest {
    fn from(payload: RequestPayload) -> Self {
        EvaluationRequest {
            flag_key: payload.flag_key,
            entity_id: payload.entity_id,
            context: payload.context.map(flatten_context).unwrap_or_default(),
        }
    }
}

/// Strings are kept, numbers and booleans stringified, everything else dropped
fn flatten_context(context: Map<String, Value>) -> HashMap<String, String> {
    context
        .into_iter()
        .filter_map(|(key, value)| match value {
            Value::String(s) => Some((key, s)),
            Value::Number(n) => Some((key, n.to_string())),
            Value::Bool(b) => Some((key, b.to_string())),
            _ => None,
        })
        .collect()
}

pub fn decode_request(json: &str) -> EvaluationResult<EvaluationRequest> {
    let payload: RequestPayload = serde_json::from_str(json)?;
    Ok(payload.into())
}

pub fn decode_batch(json: &str) -> EvaluationResult<Vec<EvaluationRequest>> {
    let payloads: Vec<RequestPayload> = serde_json::from_str(json)?;
    Ok(payloads.into_iter().map(Into::into).collect())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    Failure,
}

/// Response envelope shared by every operation
#[derive(Debug, Serialize)]
pub struct Response<T: Serialize> {
    pub status: Status,
    pub result: Option<T>,
    pub error_message: Option<String>,
}

impl<T: Serialize> Response<T> {
    pub fn success(result: T) -> Self {
        Self {
            status: Status::Success,
            result: Some(result),
            error_message: None,
        }
    }

    pub fn failure(message: impl Display) -> Self {
        Self {
            status: Status::Failure,
            result: None,
            error_message: Some(message.to_string()),
        }
    }

    /// Encode the envelope; never fails
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| {
            error!(error = %e, "Failed to encode response");
            ENCODE_FAILURE.to_string()
        })
    }
}

impl<T: Serialize, E: Display> From<Result<T, E>> for Response<T> {
    fn from(result: Result<T, E>) -> Self {
        match result {
            Ok(value) => Self::success(value),
            Err(err) => Self::failure(err),
        }
    }
}

/// Failure envelope with no result type
pub fn failure(message: impl Display) -> String {
    Response::<()>::failure(message).to_json()
}

/// Encode an evaluation result as an envelope
pub fn encode<T: Serialize>(result: Result<T, EvaluationError>) -> String {
    Response::from(result).to_json()
}
