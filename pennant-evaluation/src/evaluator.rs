//! Flag evaluator
//!
//! Holds the current snapshot for one namespace plus an optional sticky
//! error. While the error is set, every operation reports it instead of
//! evaluating stale or missing state.

use std::time::Instant;

use tracing::trace;

use crate::bucket;
use crate::error::{EvaluationError, EvaluationResult};
use crate::matcher::match_segments;
use crate::models::common::{ErrorEvaluationReason, EvaluationReason, FlagType};
use crate::models::flag::{CompiledFlag, FlagInfo, RolloutKind};
use crate::models::source::Document;
use crate::response::{
    elapsed_millis, now_millis, BatchEvaluationResponse, BooleanEvaluationResponse,
    ErrorEvaluationResponse, EvaluationRequest, EvaluationResponse, VariantEvaluationResponse,
};
use crate::store::Snapshot;

/// Evaluates requests against a snapshot for a fixed namespace
#[derive(Debug)]
pub struct Evaluator {
    namespace: String,
    snapshot: Snapshot,
    error: Option<EvaluationError>,
}

impl Evaluator {
    pub fn new(namespace: &str, snapshot: Snapshot) -> Self {
        Self {
            namespace: namespace.to_string(),
            snapshot,
            error: None,
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    /// Install a new snapshot and clear any sticky error
    pub fn replace_snapshot(&mut self, snapshot: Snapshot) {
        self.snapshot = snapshot;
        self.error = None;
    }

    /// Report `error` from every operation until the next snapshot arrives
    pub fn set_error(&mut self, error: EvaluationError) {
        self.error = Some(error);
    }

    pub fn error(&self) -> Option<&EvaluationError> {
        self.error.as_ref()
    }

    fn check(&self) -> EvaluationResult<()> {
        match &self.error {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    pub fn list_flags(&self) -> EvaluationResult<Vec<FlagInfo>> {
        self.check()?;
        self.snapshot.list_flags(&self.namespace).ok_or_else(|| {
            EvaluationError::Unknown(format!("failed to get flags for {}", self.namespace))
        })
    }

    /// Source document of the current snapshot
    pub fn document(&self) -> EvaluationResult<&Document> {
        self.check()?;
        Ok(self.snapshot.document())
    }

    pub fn variant(&self, request: &EvaluationRequest) -> EvaluationResult<VariantEvaluationResponse> {
        self.check()?;
        let flag = self.lookup(&request.flag_key)?;
        if flag.info.r#type != FlagType::Variant {
            return Err(EvaluationError::InvalidRequest(format!(
                "{} is not a variant flag",
                request.flag_key
            )));
        }
        self.variant_evaluation(flag, request)
    }

    pub fn boolean(&self, request: &EvaluationRequest) -> EvaluationResult<BooleanEvaluationResponse> {
        self.check()?;
        let flag = self.lookup(&request.flag_key)?;
        if flag.info.r#type != FlagType::Boolean {
            return Err(EvaluationError::InvalidRequest(format!(
                "{} is not a boolean flag",
                request.flag_key
            )));
        }
        self.boolean_evaluation(flag, request)
    }

    /// Evaluate several flags; unknown flags become error entries
    pub fn batch(&self, requests: &[EvaluationRequest]) -> EvaluationResult<BatchEvaluationResponse> {
        self.check()?;
        let start = Instant::now();
        let mut responses = Vec::with_capacity(requests.len());

        for request in requests {
            let Some(flag) = self.snapshot.get_flag(&self.namespace, &request.flag_key) else {
                responses.push(
                    ErrorEvaluationResponse {
                        flag_key: request.flag_key.clone(),
                        namespace_key: self.namespace.clone(),
                        reason: ErrorEvaluationReason::NotFound,
                    }
                    .into(),
                );
                continue;
            };

            let response: EvaluationResponse = match flag.info.r#type {
                FlagType::Boolean => self.boolean_evaluation(flag, request)?.into(),
                FlagType::Variant => self.variant_evaluation(flag, request)?.into(),
            };
            responses.push(response);
        }

        Ok(BatchEvaluationResponse {
            responses,
            request_duration_millis: elapsed_millis(start),
        })
    }

    fn lookup(&self, flag_key: &str) -> EvaluationResult<&CompiledFlag> {
        self.snapshot
            .get_flag(&self.namespace, flag_key)
            .ok_or_else(|| {
                EvaluationError::InvalidRequest(format!(
                    "failed to get flag information {}/{}",
                    self.namespace, flag_key
                ))
            })
    }

    fn variant_evaluation(
        &self,
        flag: &CompiledFlag,
        request: &EvaluationRequest,
    ) -> EvaluationResult<VariantEvaluationResponse> {
        let start = Instant::now();
        let mut response = VariantEvaluationResponse::new(&flag.info.key);

        if !flag.info.enabled {
            response.reason = EvaluationReason::FlagDisabled;
            response.request_duration_millis = elapsed_millis(start);
            return Ok(response);
        }

        for rule in &flag.rules {
            let Some(segment_keys) = match_segments(
                &rule.segments,
                rule.segment_operator,
                &request.context,
                &request.entity_id,
            )?
            else {
                continue;
            };

            trace!(flag = %flag.info.key, rank = rule.rank, "Rule matched");
            response.segment_keys = segment_keys;

            let valid: Vec<_> = rule
                .distributions
                .iter()
                .filter(|d| d.rollout > 0.0)
                .collect();

            if valid.is_empty() {
                response.r#match = true;
                response.reason = EvaluationReason::Match;
                response.request_duration_millis = elapsed_millis(start);
                return Ok(response);
            }

            let bounds = bucket::cumulative_bounds(valid.iter().map(|d| d.rollout));
            let entity_bucket = bucket::variant_bucket(&request.flag_key, &request.entity_id);

            if let Some(idx) = bucket::select(&bounds, entity_bucket) {
                let distribution = valid[idx];
                response.r#match = true;
                response.reason = EvaluationReason::Match;
                response.variant_key = distribution.variant_key.clone();
                response.variant_attachment =
                    distribution.attachment.clone().unwrap_or_default();
                response.request_duration_millis = elapsed_millis(start);
                return Ok(response);
            }

            // Bucket falls past the rolled-out share: no variant, and no default either
            response.request_duration_millis = elapsed_millis(start);
            return Ok(response);
        }

        response.reason = EvaluationReason::Default;
        if let Some(default) = &flag.info.default_variant {
            response.variant_key = default.key.clone();
            response.variant_attachment = default.attachment.clone().unwrap_or_default();
        }
        response.request_duration_millis = elapsed_millis(start);
        Ok(response)
    }

    fn boolean_evaluation(
        &self,
        flag: &CompiledFlag,
        request: &EvaluationRequest,
    ) -> EvaluationResult<BooleanEvaluationResponse> {
        let start = Instant::now();

        let matched = |enabled: bool| BooleanEvaluationResponse {
            enabled,
            flag_key: flag.info.key.clone(),
            reason: EvaluationReason::Match,
            request_duration_millis: elapsed_millis(start),
            timestamp: now_millis(),
        };

        for rollout in &flag.rollouts {
            match &rollout.kind {
                RolloutKind::Threshold { percentage, value } => {
                    let normalized = bucket::threshold_value(&request.entity_id, &request.flag_key);
                    if normalized < *percentage {
                        return Ok(matched(*value));
                    }
                }
                RolloutKind::Segment {
                    segment_operator,
                    segments,
                    value,
                } => {
                    let hit = match_segments(
                        segments,
                        *segment_operator,
                        &request.context,
                        &request.entity_id,
                    )?;
                    if hit.is_some() {
                        return Ok(matched(*value));
                    }
                }
                RolloutKind::Unknown => {}
            }
        }

        Ok(BooleanEvaluationResponse {
            enabled: flag.info.enabled,
            flag_key: flag.info.key.clone(),
            reason: EvaluationReason::Default,
            request_duration_millis: elapsed_millis(start),
            timestamp: now_millis(),
        })
    }
}
