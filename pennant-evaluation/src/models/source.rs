//! Flag document as delivered by a snapshot source

use serde::{Deserialize, Deserializer, Serialize};

use super::common::{ConstraintType, FlagType, SegmentMatchType, SegmentOperator};

/// Treat an explicit `null` the same as a missing member
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// A complete flag document for one namespace
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    #[serde(default, deserialize_with = "null_as_default")]
    pub namespace: Namespace,

    #[serde(default, deserialize_with = "null_as_default")]
    pub flags: Vec<Flag>,
}

impl Document {
    /// Empty document bound to a namespace
    pub fn empty(namespace: &str) -> Self {
        Self {
            namespace: Namespace {
                key: namespace.to_string(),
                name: None,
            },
            flags: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Namespace {
    #[serde(default)]
    pub key: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Flag {
    pub key: String,

    #[serde(default)]
    pub name: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub r#type: FlagType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default)]
    pub enabled: bool,

    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub rules: Vec<Rule>,

    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub rollouts: Vec<Rollout>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_variant: Option<Variant>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variant {
    pub key: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachment: Option<String>,
}

/// Variant rule: segments gate a weighted distribution over variants
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    #[serde(default, deserialize_with = "null_as_default")]
    pub segments: Vec<Segment>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub segment_operator: SegmentOperator,

    #[serde(default, deserialize_with = "null_as_default")]
    pub distributions: Vec<Distribution>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Distribution {
    pub variant_key: String,

    /// Percentage in `0.0..=100.0`
    pub rollout: f32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant_attachment: Option<String>,
}

/// Boolean rollout: either a percentage threshold or a segment match
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rollout {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub segment: Option<SegmentRollout>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold: Option<Threshold>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentRollout {
    #[serde(default, deserialize_with = "null_as_default")]
    pub segment_operator: SegmentOperator,

    pub value: bool,

    #[serde(default, deserialize_with = "null_as_default")]
    pub segments: Vec<Segment>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Threshold {
    pub percentage: f32,
    pub value: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Segment {
    pub key: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub match_type: SegmentMatchType,

    #[serde(default, deserialize_with = "null_as_default")]
    pub constraints: Vec<Constraint>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Constraint {
    #[serde(default, deserialize_with = "null_as_default")]
    pub r#type: ConstraintType,

    pub property: String,

    pub operator: String,

    #[serde(default)]
    pub value: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_defaults() {
        let doc: Document = serde_json::from_str("{}").unwrap();
        assert_eq!(doc.namespace.key, "");
        assert!(doc.flags.is_empty());
    }

    #[test]
    fn test_null_members_are_empty() {
        let json = r#"{
            "namespace": {"key": "production"},
            "flags": [{"key": "f1", "name": "F1", "enabled": true, "rules": null, "rollouts": null}]
        }"#;
        let doc: Document = serde_json::from_str(json).unwrap();
        assert_eq!(doc.flags.len(), 1);
        assert!(doc.flags[0].rules.is_empty());
        assert!(doc.flags[0].rollouts.is_empty());
        assert_eq!(doc.flags[0].r#type, FlagType::Variant);
    }

    #[test]
    fn test_constraint_unknown_type() {
        let json = r#"{"type":"OTHER_CONSTRAINT_COMPARISON_TYPE","property":"this","operator":"eq","value":"something"}"#;
        let constraint: Constraint = serde_json::from_str(json).unwrap();
        assert_eq!(constraint.r#type, ConstraintType::Unknown);
    }

    #[test]
    fn test_camel_case_members() {
        let json = r#"{
            "key": "theme",
            "type": "VARIANT_FLAG_TYPE",
            "enabled": true,
            "defaultVariant": {"key": "light"},
            "rules": [{
                "segmentOperator": "AND_SEGMENT_OPERATOR",
                "distributions": [{"variantKey": "dark", "rollout": 50.0}]
            }]
        }"#;
        let flag: Flag = serde_json::from_str(json).unwrap();
        assert_eq!(flag.default_variant.unwrap().key, "light");
        assert_eq!(flag.rules[0].segment_operator, SegmentOperator::And);
        assert_eq!(flag.rules[0].distributions[0].variant_key, "dark");
    }
}
