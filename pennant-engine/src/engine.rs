//! Engine: evaluator state plus its snapshot source

use std::sync::Arc;

use parking_lot::RwLock;
use pennant_evaluation::{
    BatchEvaluationResponse, BooleanEvaluationResponse, Document, EvaluationRequest,
    EvaluationResult, Evaluator, FlagInfo, Snapshot, VariantEvaluationResponse,
};
use tracing::{info, warn};

use crate::config::{EngineOpts, SourceKind};
use crate::error::{EngineError, EngineResult};
use crate::logging;
use crate::payload;
use crate::poller::Poller;
use crate::source::{FileFetcher, Fetcher, LocalFetcher};
use crate::PayloadEngine;

/// Namespace used when the host does not name one
pub const DEFAULT_NAMESPACE: &str = "default";

/// Flag evaluation engine bound to a single namespace
pub struct Engine {
    namespace: String,
    evaluator: Arc<RwLock<Evaluator>>,
    _poller: Option<Poller>,
}

impl Engine {
    pub fn new(namespace: Option<&str>, opts: EngineOpts) -> EngineResult<Self> {
        logging::init(opts.log_level.as_deref());
        opts.validate()?;

        let namespace = namespace
            .filter(|ns| !ns.is_empty())
            .unwrap_or(DEFAULT_NAMESPACE)
            .to_string();

        let mut fetcher: Box<dyn Fetcher> = match (opts.source, &opts.path) {
            (SourceKind::Local, _) => Box::new(LocalFetcher::new(opts.snapshot.clone())),
            (SourceKind::File, Some(path)) => Box::new(FileFetcher::new(path)),
            (SourceKind::File, None) => {
                return Err(EngineError::InvalidOptions(
                    "file source requires a path".to_string(),
                ))
            }
        };

        let document = fetcher
            .fetch()?
            .unwrap_or_else(|| Document::empty(&namespace));
        let snapshot = Snapshot::build(&namespace, document)?;
        let flags = snapshot.flag_count();

        let evaluator = Arc::new(RwLock::new(Evaluator::new(&namespace, snapshot)));

        let poller = match opts.refresh_interval() {
            Some(interval) => Some(Poller::spawn(
                fetcher,
                Arc::clone(&evaluator),
                interval,
                opts.error_strategy,
            )?),
            None => None,
        };

        info!(
            namespace = %namespace,
            source = ?opts.source,
            flags,
            refresh = poller.is_some(),
            "Engine initialized"
        );

        Ok(Self {
            namespace,
            evaluator,
            _poller: poller,
        })
    }

    /// Build from a JSON options payload
    pub fn from_json(namespace: Option<&str>, options: &str) -> EngineResult<Self> {
        let opts = EngineOpts::from_json(options).inspect_err(|e| {
            warn!(error = %e, "Rejected engine options");
        })?;
        Self::new(namespace, opts)
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn variant(&self, request: &EvaluationRequest) -> EvaluationResult<VariantEvaluationResponse> {
        self.evaluator.read().variant(request)
    }

    pub fn boolean(&self, request: &EvaluationRequest) -> EvaluationResult<BooleanEvaluationResponse> {
        self.evaluator.read().boolean(request)
    }

    pub fn batch(&self, requests: &[EvaluationRequest]) -> EvaluationResult<BatchEvaluationResponse> {
        self.evaluator.read().batch(requests)
    }

    pub fn list_flags(&self) -> EvaluationResult<Vec<FlagInfo>> {
        self.evaluator.read().list_flags()
    }

    /// Copy of the current flag document
    pub fn document(&self) -> EvaluationResult<Document> {
        self.evaluator.read().document().cloned()
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        info!(namespace = %self.namespace, "Engine destroyed");
    }
}

impl PayloadEngine for Engine {
    fn evaluate_boolean(&self, request: &str) -> String {
        payload::encode(payload::decode_request(request).and_then(|r| self.boolean(&r)))
    }

    fn evaluate_variant(&self, request: &str) -> String {
        payload::encode(payload::decode_request(request).and_then(|r| self.variant(&r)))
    }

    fn evaluate_batch(&self, request: &str) -> String {
        payload::encode(payload::decode_batch(request).and_then(|r| self.batch(&r)))
    }

    fn list_flags(&self) -> String {
        payload::encode(Engine::list_flags(self))
    }

    fn snapshot(&self) -> String {
        payload::encode(self.document())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    const OPTIONS: &str = r#"{
        "snapshot": {
            "flags": [
                {"key": "banner", "type": "BOOLEAN_FLAG_TYPE", "enabled": true},
                {"key": "theme", "enabled": true, "defaultVariant": {"key": "light"}}
            ]
        }
    }"#;

    fn parse(json: &str) -> Value {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_default_namespace() {
        let engine = Engine::from_json(None, OPTIONS).unwrap();
        assert_eq!(engine.namespace(), DEFAULT_NAMESPACE);
        let engine = Engine::from_json(Some(""), OPTIONS).unwrap();
        assert_eq!(engine.namespace(), DEFAULT_NAMESPACE);
        let engine = Engine::from_json(Some("mobile"), OPTIONS).unwrap();
        assert_eq!(engine.namespace(), "mobile");
        assert_eq!(engine.list_flags().unwrap().len(), 2);
    }

    #[test]
    fn test_empty_options_give_empty_engine() {
        let engine = Engine::from_json(None, "{}").unwrap();
        let v = parse(&PayloadEngine::list_flags(&engine));
        assert_eq!(v["status"], "success");
        assert_eq!(v["result"], serde_json::json!([]));
    }

    #[test]
    fn test_construction_failures() {
        assert!(Engine::from_json(None, "{").is_err());
        assert!(Engine::from_json(None, r#"{"source": "file"}"#).is_err());
        assert!(Engine::from_json(
            None,
            r#"{"source": "file", "path": "/definitely/not/here.json"}"#
        )
        .is_err());
        assert!(Engine::from_json(
            None,
            r#"{"snapshot": {"flags": [{"key": "a"}, {"key": "a"}]}}"#
        )
        .is_err());
    }

    #[test]
    fn test_payload_operations() {
        let engine = Engine::from_json(None, OPTIONS).unwrap();

        let v = parse(&engine.evaluate_boolean(r#"{"flag_key": "banner", "entity_id": "u1"}"#));
        assert_eq!(v["status"], "success");
        assert_eq!(v["result"]["enabled"], true);
        assert_eq!(v["result"]["reason"], "DEFAULT_EVALUATION_REASON");

        let v = parse(&engine.evaluate_variant(r#"{"flag_key": "theme", "entity_id": "u1"}"#));
        assert_eq!(v["result"]["variant_key"], "light");

        let v = parse(&engine.evaluate_batch(
            r#"[{"flag_key": "banner", "entity_id": "u1"}, {"flag_key": "nope", "entity_id": "u1"}]"#,
        ));
        assert_eq!(v["result"]["responses"].as_array().unwrap().len(), 2);

        let v = parse(&engine.snapshot());
        assert_eq!(v["result"]["namespace"]["key"], "default");
        assert_eq!(v["result"]["flags"][1]["key"], "theme");
    }

    #[test]
    fn test_payload_failures() {
        let engine = Engine::from_json(None, OPTIONS).unwrap();

        let v = parse(&engine.evaluate_variant("not json"));
        assert_eq!(v["status"], "failure");
        assert!(v["error_message"]
            .as_str()
            .unwrap()
            .starts_with("error parsing json"));

        let v = parse(&engine.evaluate_variant(r#"{"flag_key": "banner", "entity_id": "u1"}"#));
        assert_eq!(v["error_message"], "invalid request: banner is not a variant flag");

        let v = parse(&engine.evaluate_boolean(r#"{"flag_key": "missing", "entity_id": "u1"}"#));
        assert_eq!(
            v["error_message"],
            "invalid request: failed to get flag information default/missing"
        );
    }
}
