//! Snapshot store
//!
//! A `Snapshot` is the immutable, compiled form of one flag document. The
//! engine swaps whole snapshots on refresh; nothing mutates a snapshot after
//! it has been built.

use ahash::AHashMap;
use tracing::debug;

use crate::error::{EvaluationError, EvaluationResult};
use crate::models::flag::{
    CompiledFlag, EvaluationDistribution, EvaluationRollout, EvaluationRule, EvaluationSegment,
    FlagInfo, RolloutKind,
};
use crate::models::source::{self, Document};

/// Compiled flag state for a single namespace
#[derive(Debug, Clone)]
pub struct Snapshot {
    namespace: String,
    document: Document,
    order: Vec<String>,
    flags: AHashMap<String, CompiledFlag>,
}

impl Snapshot {
    /// Snapshot with no flags
    pub fn empty(namespace: &str) -> Self {
        Self {
            namespace: namespace.to_string(),
            document: Document::empty(namespace),
            order: Vec::new(),
            flags: AHashMap::new(),
        }
    }

    /// Compile a document
    ///
    /// A document without a namespace key adopts `namespace`. A document
    /// naming another namespace is kept as-is; lookups against it fail.
    pub fn build(namespace: &str, mut document: Document) -> EvaluationResult<Self> {
        if document.namespace.key.is_empty() {
            document.namespace.key = namespace.to_string();
        }

        let mut order = Vec::with_capacity(document.flags.len());
        let mut flags = AHashMap::with_capacity(document.flags.len());

        for flag in &document.flags {
            if flags.contains_key(&flag.key) {
                return Err(EvaluationError::InvalidDocument(format!(
                    "duplicate flag key {}",
                    flag.key
                )));
            }

            let compiled = compile_flag(flag)?;
            order.push(flag.key.clone());
            flags.insert(flag.key.clone(), compiled);
        }

        debug!(
            namespace = %document.namespace.key,
            flags = order.len(),
            "Snapshot compiled"
        );

        Ok(Self {
            namespace: document.namespace.key.clone(),
            document,
            order,
            flags,
        })
    }

    /// Namespace the snapshot belongs to
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Source document the snapshot was compiled from
    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn flag_count(&self) -> usize {
        self.order.len()
    }

    /// Flags in document order, or `None` for a foreign namespace
    pub fn list_flags(&self, namespace: &str) -> Option<Vec<FlagInfo>> {
        if self.namespace != namespace {
            return None;
        }

        Some(
            self.order
                .iter()
                .filter_map(|key| self.flags.get(key))
                .map(|flag| flag.info.clone())
                .collect(),
        )
    }

    pub fn get_flag(&self, namespace: &str, flag_key: &str) -> Option<&CompiledFlag> {
        if self.namespace != namespace {
            return None;
        }
        self.flags.get(flag_key)
    }
}

fn compile_flag(flag: &source::Flag) -> EvaluationResult<CompiledFlag> {
    let rules = flag
        .rules
        .iter()
        .enumerate()
        .map(|(idx, rule)| compile_rule(&flag.key, idx + 1, rule))
        .collect::<EvaluationResult<Vec<_>>>()?;

    let rollouts = flag
        .rollouts
        .iter()
        .enumerate()
        .map(|(idx, rollout)| compile_rollout(&flag.key, idx + 1, rollout))
        .collect::<EvaluationResult<Vec<_>>>()?;

    Ok(CompiledFlag {
        info: FlagInfo {
            key: flag.key.clone(),
            name: flag.name.clone(),
            enabled: flag.enabled,
            r#type: flag.r#type,
            description: flag.description.clone(),
            default_variant: flag.default_variant.clone(),
        },
        rules,
        rollouts,
    })
}

fn compile_rule(flag_key: &str, rank: usize, rule: &source::Rule) -> EvaluationResult<EvaluationRule> {
    let mut total = 0.0f32;
    let mut distributions = Vec::with_capacity(rule.distributions.len());

    for distribution in &rule.distributions {
        check_percentage(flag_key, distribution.rollout)?;
        total += distribution.rollout;
        distributions.push(EvaluationDistribution {
            variant_key: distribution.variant_key.clone(),
            rollout: distribution.rollout,
            attachment: distribution.variant_attachment.clone(),
        });
    }

    // Splits like 33.3/33.3/33.4 accumulate float error
    if total > 100.01 {
        return Err(EvaluationError::InvalidDocument(format!(
            "flag {} rule {} distributes {}% (more than 100%)",
            flag_key, rank, total
        )));
    }

    Ok(EvaluationRule {
        rank,
        segment_operator: rule.segment_operator,
        segments: compile_segments(&rule.segments),
        distributions,
    })
}

fn compile_rollout(
    flag_key: &str,
    rank: usize,
    rollout: &source::Rollout,
) -> EvaluationResult<EvaluationRollout> {
    let kind = if let Some(threshold) = &rollout.threshold {
        check_percentage(flag_key, threshold.percentage)?;
        RolloutKind::Threshold {
            percentage: threshold.percentage,
            value: threshold.value,
        }
    } else if let Some(segment) = &rollout.segment {
        RolloutKind::Segment {
            segment_operator: segment.segment_operator,
            segments: compile_segments(&segment.segments),
            value: segment.value,
        }
    } else {
        RolloutKind::Unknown
    };

    Ok(EvaluationRollout { rank, kind })
}

fn compile_segments(segments: &[source::Segment]) -> Vec<EvaluationSegment> {
    segments
        .iter()
        .map(|segment| EvaluationSegment {
            key: segment.key.clone(),
            match_type: segment.match_type,
            constraints: segment.constraints.clone(),
        })
        .collect()
}

fn check_percentage(flag_key: &str, value: f32) -> EvaluationResult<()> {
    if !(0.0..=100.0).contains(&value) {
        return Err(EvaluationError::InvalidDocument(format!(
            "flag {} has percentage {} outside 0..=100",
            flag_key, value
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn document(json: &str) -> Document {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_empty_snapshot() {
        let snap = Snapshot::empty("default");
        assert_eq!(snap.namespace(), "default");
        assert_eq!(snap.list_flags("default").unwrap().len(), 0);
        assert!(snap.list_flags("other").is_none());
    }

    #[test]
    fn test_build_adopts_namespace() {
        let doc = document(r#"{"flags": [{"key": "a", "enabled": true}]}"#);
        let snap = Snapshot::build("production", doc).unwrap();
        assert_eq!(snap.namespace(), "production");
        assert_eq!(snap.document().namespace.key, "production");
        assert!(snap.get_flag("production", "a").is_some());
    }

    #[test]
    fn test_build_keeps_document_order() {
        let doc = document(
            r#"{"flags": [{"key": "zeta"}, {"key": "alpha"}, {"key": "mid"}]}"#,
        );
        let snap = Snapshot::build("default", doc).unwrap();
        let keys: Vec<_> = snap
            .list_flags("default")
            .unwrap()
            .into_iter()
            .map(|f| f.key)
            .collect();
        assert_eq!(keys, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_duplicate_flag_rejected() {
        let doc = document(r#"{"flags": [{"key": "a"}, {"key": "a"}]}"#);
        let err = Snapshot::build("default", doc).unwrap_err();
        assert!(matches!(err, EvaluationError::InvalidDocument(_)));
    }

    #[test]
    fn test_overallocated_rule_rejected() {
        let doc = document(
            r#"{"flags": [{"key": "a", "rules": [{"distributions": [
                {"variantKey": "x", "rollout": 70.0},
                {"variantKey": "y", "rollout": 40.0}
            ]}]}]}"#,
        );
        assert!(Snapshot::build("default", doc).is_err());
    }

    #[test]
    fn test_rollout_kinds_and_ranks() {
        let doc = document(
            r#"{"flags": [{"key": "b", "type": "BOOLEAN_FLAG_TYPE", "rollouts": [
                {"threshold": {"percentage": 50.0, "value": true}},
                {"segment": {"value": false, "segments": [{"key": "s", "constraints": []}]}},
                {"description": "nothing"}
            ]}]}"#,
        );
        let snap = Snapshot::build("default", doc).unwrap();
        let flag = snap.get_flag("default", "b").unwrap();
        assert_eq!(flag.rollouts.len(), 3);
        assert_eq!(flag.rollouts[1].rank, 2);
        assert!(matches!(flag.rollouts[0].kind, RolloutKind::Threshold { .. }));
        assert!(matches!(flag.rollouts[1].kind, RolloutKind::Segment { .. }));
        assert_eq!(flag.rollouts[2].kind, RolloutKind::Unknown);
    }

    #[test]
    fn test_foreign_namespace_lookup_fails() {
        let doc = document(r#"{"namespace": {"key": "staging"}, "flags": [{"key": "a"}]}"#);
        let snap = Snapshot::build("production", doc).unwrap();
        assert!(snap.get_flag("production", "a").is_none());
        assert!(snap.list_flags("production").is_none());
    }
}
