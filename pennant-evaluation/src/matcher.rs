//! Segment and constraint matching against an evaluation context

use std::collections::HashMap;

use chrono::DateTime;
use tracing::trace;

use crate::error::{EvaluationError, EvaluationResult};
use crate::models::common::{ConstraintType, SegmentMatchType, SegmentOperator};
use crate::models::flag::EvaluationSegment;
use crate::models::source::Constraint;

/// Match a set of segments combined with `operator`
///
/// Returns the keys of the segments that matched when the combination holds.
pub fn match_segments(
    segments: &[EvaluationSegment],
    operator: SegmentOperator,
    context: &HashMap<String, String>,
    entity_id: &str,
) -> EvaluationResult<Option<Vec<String>>> {
    let mut matched = Vec::new();

    for segment in segments {
        if matches_constraints(&segment.constraints, segment.match_type, context, entity_id)? {
            matched.push(segment.key.clone());
        }
    }

    let holds = match operator {
        SegmentOperator::Or => !matched.is_empty(),
        SegmentOperator::And => matched.len() == segments.len(),
    };

    Ok(holds.then_some(matched))
}

/// Match the constraints of one segment
pub fn matches_constraints(
    constraints: &[Constraint],
    match_type: SegmentMatchType,
    context: &HashMap<String, String>,
    entity_id: &str,
) -> EvaluationResult<bool> {
    if constraints.is_empty() {
        return Ok(true);
    }

    let mut matches = 0usize;

    for constraint in constraints {
        let value = context
            .get(&constraint.property)
            .map(String::as_str)
            .unwrap_or("");

        let matched = match constraint.r#type {
            ConstraintType::String => matches_string(constraint, value),
            ConstraintType::Number => matches_number(constraint, value)?,
            ConstraintType::Boolean => matches_boolean(constraint, value)?,
            ConstraintType::DateTime => matches_datetime(constraint, value)?,
            ConstraintType::EntityId => matches_string(constraint, entity_id),
            // An unrecognised constraint fails its segment whatever the match type
            ConstraintType::Unknown => {
                trace!(property = %constraint.property, "Unsupported constraint type");
                return Ok(false);
            }
        };

        match (matched, match_type) {
            (true, SegmentMatchType::Any) => return Ok(true),
            (false, SegmentMatchType::All) => return Ok(false),
            (true, SegmentMatchType::All) => matches += 1,
            (false, SegmentMatchType::Any) => {}
        }
    }

    Ok(match match_type {
        SegmentMatchType::All => matches == constraints.len(),
        SegmentMatchType::Any => false,
    })
}

fn contains_string(v: &str, values: &str) -> bool {
    serde_json::from_str::<Vec<&str>>(values)
        .map(|values| values.contains(&v))
        .unwrap_or(false)
}

fn matches_string(constraint: &Constraint, v: &str) -> bool {
    match constraint.operator.as_str() {
        "empty" => return v.is_empty(),
        "notempty" => return !v.is_empty(),
        _ => {}
    }

    if v.is_empty() {
        return false;
    }

    let value = constraint.value.as_str();
    match constraint.operator.as_str() {
        "eq" => v == value,
        "neq" => v != value,
        "prefix" => v.starts_with(value),
        "suffix" => v.ends_with(value),
        "isoneof" => contains_string(v, value),
        "isnotoneof" => !contains_string(v, value),
        _ => false,
    }
}

fn parse_number(v: &str) -> EvaluationResult<f64> {
    v.trim()
        .parse::<f64>()
        .map_err(|e| EvaluationError::InvalidRequest(format!("error parsing number {}: {}", v, e)))
}

fn contains_number(v: f64, values: &str) -> EvaluationResult<bool> {
    let values: Vec<f64> = serde_json::from_str(values).map_err(|e| {
        EvaluationError::InvalidRequest(format!("error parsing numbers {}: {}", values, e))
    })?;
    Ok(values.iter().any(|candidate| *candidate == v))
}

fn matches_number(constraint: &Constraint, v: &str) -> EvaluationResult<bool> {
    match constraint.operator.as_str() {
        "notpresent" => return Ok(v.is_empty()),
        "present" => return Ok(!v.is_empty()),
        _ => {}
    }

    if v.is_empty() {
        return Ok(false);
    }

    let number = parse_number(v)?;

    match constraint.operator.as_str() {
        "isoneof" => return contains_number(number, &constraint.value),
        "isnotoneof" => return contains_number(number, &constraint.value).map(|found| !found),
        _ => {}
    }

    let expected = parse_number(&constraint.value)?;

    Ok(match constraint.operator.as_str() {
        "eq" => number == expected,
        "neq" => number != expected,
        "lt" => number < expected,
        "lte" => number <= expected,
        "gt" => number > expected,
        "gte" => number >= expected,
        _ => false,
    })
}

fn matches_boolean(constraint: &Constraint, v: &str) -> EvaluationResult<bool> {
    match constraint.operator.as_str() {
        "notpresent" => return Ok(v.is_empty()),
        "present" => return Ok(!v.is_empty()),
        _ => {}
    }

    if v.is_empty() {
        return Ok(false);
    }

    let value = v.parse::<bool>().map_err(|e| {
        EvaluationError::InvalidRequest(format!("error parsing boolean {}: {}", v, e))
    })?;

    Ok(match constraint.operator.as_str() {
        "true" => value,
        "false" => !value,
        _ => false,
    })
}

/// Seconds since the epoch of an RFC 3339 timestamp
fn parse_time(v: &str) -> EvaluationResult<i64> {
    DateTime::parse_from_rfc3339(v)
        .map(|t| t.timestamp())
        .map_err(|e| EvaluationError::InvalidRequest(format!("error parsing time {}: {}", v, e)))
}

fn matches_datetime(constraint: &Constraint, v: &str) -> EvaluationResult<bool> {
    match constraint.operator.as_str() {
        "notpresent" => return Ok(v.is_empty()),
        "present" => return Ok(!v.is_empty()),
        _ => {}
    }

    if v.is_empty() {
        return Ok(false);
    }

    let time = parse_time(v)?;
    let expected = parse_time(&constraint.value)?;

    Ok(match constraint.operator.as_str() {
        "eq" => time == expected,
        "neq" => time != expected,
        "lt" => time < expected,
        "lte" => time <= expected,
        "gt" => time > expected,
        "gte" => time >= expected,
        _ => false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn constraint(r#type: ConstraintType, property: &str, operator: &str, value: &str) -> Constraint {
        Constraint {
            r#type,
            property: property.to_string(),
            operator: operator.to_string(),
            value: value.to_string(),
        }
    }

    fn context(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_string_operators() {
        let cases = [
            ("eq", "blue", "blue", true),
            ("eq", "blue", "red", false),
            ("neq", "blue", "red", true),
            ("prefix", "pre", "prefix", true),
            ("suffix", "fix", "prefix", true),
            ("isoneof", r#"["a","b"]"#, "b", true),
            ("isoneof", r#"["a","b"]"#, "c", false),
            ("isnotoneof", r#"["a","b"]"#, "c", true),
            ("empty", "", "", true),
            ("notempty", "", "x", true),
            ("eq", "", "", false),
        ];

        for (operator, value, input, expected) in cases {
            let c = constraint(ConstraintType::String, "p", operator, value);
            assert_eq!(matches_string(&c, input), expected, "{operator} {value} {input}");
        }
    }

    #[test]
    fn test_number_operators() {
        let c = constraint(ConstraintType::Number, "age", "gte", "18");
        assert!(matches_number(&c, "18").unwrap());
        assert!(matches_number(&c, "42.5").unwrap());
        assert!(!matches_number(&c, "17").unwrap());
        assert!(!matches_number(&c, "").unwrap());

        let c = constraint(ConstraintType::Number, "age", "isoneof", "[1, 2, 3]");
        assert!(matches_number(&c, "2").unwrap());
        assert!(!matches_number(&c, "4").unwrap());

        let c = constraint(ConstraintType::Number, "age", "present", "");
        assert!(matches_number(&c, "1").unwrap());
    }

    #[test]
    fn test_number_parse_error() {
        let c = constraint(ConstraintType::Number, "age", "eq", "18");
        let err = matches_number(&c, "eighteen").unwrap_err();
        assert!(err.to_string().contains("error parsing number eighteen"));
    }

    #[test]
    fn test_boolean_operators() {
        let c = constraint(ConstraintType::Boolean, "beta", "true", "");
        assert!(matches_boolean(&c, "true").unwrap());
        assert!(!matches_boolean(&c, "false").unwrap());
        assert!(matches_boolean(&c, "maybe").is_err());

        let c = constraint(ConstraintType::Boolean, "beta", "notpresent", "");
        assert!(matches_boolean(&c, "").unwrap());
    }

    #[test]
    fn test_match_type_all_and_any() {
        let constraints = vec![
            constraint(ConstraintType::String, "plan", "eq", "pro"),
            constraint(ConstraintType::String, "region", "eq", "eu"),
        ];
        let ctx = context(&[("plan", "pro"), ("region", "us")]);

        assert!(!matches_constraints(&constraints, SegmentMatchType::All, &ctx, "e").unwrap());
        assert!(matches_constraints(&constraints, SegmentMatchType::Any, &ctx, "e").unwrap());
    }

    #[test]
    fn test_entity_id_constraint() {
        let constraints = vec![constraint(ConstraintType::EntityId, "", "prefix", "admin-")];
        let ctx = HashMap::new();
        assert!(matches_constraints(&constraints, SegmentMatchType::All, &ctx, "admin-7").unwrap());
        assert!(!matches_constraints(&constraints, SegmentMatchType::All, &ctx, "user-7").unwrap());
    }

    #[test]
    fn test_datetime_operators() {
        let cases = [
            ("eq", "2006-01-02T15:04:05Z", "2006-01-02T15:04:05Z", true),
            ("eq", "2006-01-02T15:04:05Z", "2006-01-02T17:04:05+02:00", true),
            ("neq", "2006-01-02T15:04:05Z", "2006-01-02T15:04:06Z", true),
            ("lt", "2024-01-01T00:00:00Z", "2020-01-01T00:00:00Z", true),
            ("lt", "2024-01-01T00:00:00Z", "2024-01-01T00:00:00Z", false),
            ("lte", "2024-01-01T00:00:00Z", "2024-01-01T00:00:00Z", true),
            ("gt", "2024-01-01T00:00:00Z", "2025-06-01T12:00:00Z", true),
            ("gte", "2024-01-01T00:00:00Z", "2023-12-31T23:59:59Z", false),
            ("present", "", "2024-01-01T00:00:00Z", true),
            ("notpresent", "", "", true),
            ("gt", "2024-01-01T00:00:00Z", "", false),
        ];

        for (operator, value, input, expected) in cases {
            let c = constraint(ConstraintType::DateTime, "created", operator, value);
            assert_eq!(
                matches_datetime(&c, input).unwrap(),
                expected,
                "{operator} {value} {input}"
            );
        }
    }

    #[test]
    fn test_datetime_parse_errors() {
        let c = constraint(ConstraintType::DateTime, "created", "lt", "2024-01-01T00:00:00Z");
        let err = matches_datetime(&c, "yesterday").unwrap_err();
        assert!(matches!(err, EvaluationError::InvalidRequest(_)));
        assert!(err.to_string().contains("error parsing time yesterday"));

        let c = constraint(ConstraintType::DateTime, "created", "lt", "soon");
        let err = matches_datetime(&c, "2020-01-01T00:00:00Z").unwrap_err();
        assert!(err.to_string().contains("error parsing time soon"));
    }

    #[test]
    fn test_datetime_constraint_in_segment() {
        let constraints = vec![constraint(
            ConstraintType::DateTime,
            "created",
            "lt",
            "2024-01-01T00:00:00Z",
        )];
        let ctx = context(&[("created", "2020-01-01T00:00:00Z")]);
        assert!(matches_constraints(&constraints, SegmentMatchType::All, &ctx, "e").unwrap());

        let ctx = context(&[("created", "2025-01-01T00:00:00Z")]);
        assert!(!matches_constraints(&constraints, SegmentMatchType::All, &ctx, "e").unwrap());
    }

    #[test]
    fn test_unknown_constraint_fails_segment() {
        let constraints = vec![
            constraint(ConstraintType::Unknown, "plan", "eq", "pro"),
            constraint(ConstraintType::String, "plan", "eq", "pro"),
        ];
        let ctx = context(&[("plan", "pro")]);
        assert!(!matches_constraints(&constraints, SegmentMatchType::Any, &ctx, "e").unwrap());
        assert!(!matches_constraints(&constraints, SegmentMatchType::All, &ctx, "e").unwrap());
    }

    #[test]
    fn test_segment_operators() {
        let segments = vec![
            EvaluationSegment {
                key: "pro".into(),
                match_type: SegmentMatchType::All,
                constraints: vec![constraint(ConstraintType::String, "plan", "eq", "pro")],
            },
            EvaluationSegment {
                key: "eu".into(),
                match_type: SegmentMatchType::All,
                constraints: vec![constraint(ConstraintType::String, "region", "eq", "eu")],
            },
        ];
        let ctx = context(&[("plan", "pro")]);

        let or = match_segments(&segments, SegmentOperator::Or, &ctx, "e").unwrap();
        assert_eq!(or, Some(vec!["pro".to_string()]));

        let and = match_segments(&segments, SegmentOperator::And, &ctx, "e").unwrap();
        assert_eq!(and, None);
    }
}
