//! Normalization of analysis responses.
//!
//! The analysis endpoint has returned two shapes over time: the result
//! nested under an `analysis` object, or flat at the top level. Each field
//! of `WasteAnalysisResult` is resolved independently through an ordered
//! list of candidate paths, nested first, then a fixed default. Resolution
//! never fails.

use chrono::{SecondsFormat, Utc};
use serde_json::Value;

use crate::types::WasteAnalysisResult;

/// One output field of the analysis record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisField {
    WasteType,
    Urgency,
    Severity,
    Reasoning,
    Segregation,
    SegregationReason,
    Id,
    CreatedAt,
}

impl AnalysisField {
    pub const ALL: [AnalysisField; 8] = [
        AnalysisField::WasteType,
        AnalysisField::Urgency,
        AnalysisField::Severity,
        AnalysisField::Reasoning,
        AnalysisField::Segregation,
        AnalysisField::SegregationReason,
        AnalysisField::Id,
        AnalysisField::CreatedAt,
    ];

    /// Candidate JSON paths in priority order.
    pub fn candidates(self) -> &'static [&'static [&'static str]] {
        match self {
            AnalysisField::WasteType => &[&["analysis", "wasteType"], &["wasteType"]],
            AnalysisField::Urgency => &[&["analysis", "urgency"], &["urgency"]],
            AnalysisField::Severity => &[&["analysis", "severity"], &["severity"]],
            AnalysisField::Reasoning => &[&["analysis", "reasoning"], &["reasoning"]],
            AnalysisField::Segregation => &[&["analysis", "segregation"], &["segregation"]],
            AnalysisField::SegregationReason => {
                &[&["analysis", "segregationReason"], &["segregationReason"]]
            }
            AnalysisField::Id => &[
                &["analysis", "_id"],
                &["analysis", "id"],
                &["_id"],
                &["id"],
            ],
            AnalysisField::CreatedAt => &[&["analysis", "createdAt"], &["createdAt"]],
        }
    }

    /// Value used when no candidate resolves.
    pub fn default_value(self) -> String {
        match self {
            AnalysisField::WasteType => "Unknown".to_string(),
            AnalysisField::Urgency => "Medium".to_string(),
            AnalysisField::Severity => "Minor".to_string(),
            AnalysisField::Reasoning => "No reasoning provided".to_string(),
            AnalysisField::Segregation => "Unknown".to_string(),
            AnalysisField::SegregationReason | AnalysisField::Id => String::new(),
            AnalysisField::CreatedAt => Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }
}

/// First candidate path that holds a usable scalar. Null, empty strings,
/// arrays and objects are skipped; numbers and booleans are stringified.
pub fn lookup(body: &Value, candidates: &[&[&str]]) -> Option<String> {
    candidates.iter().find_map(|path| {
        let value = path.iter().try_fold(body, |node, key| node.get(*key))?;
        scalar_text(value)
    })
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

pub fn resolve(body: &Value, field: AnalysisField) -> String {
    lookup(body, field.candidates()).unwrap_or_else(|| field.default_value())
}

impl WasteAnalysisResult {
    /// Flatten an analysis response of either shape.
    pub fn from_response(body: &Value) -> Self {
        Self {
            waste_type: resolve(body, AnalysisField::WasteType),
            urgency: resolve(body, AnalysisField::Urgency),
            severity: resolve(body, AnalysisField::Severity),
            reasoning: resolve(body, AnalysisField::Reasoning),
            segregation: resolve(body, AnalysisField::Segregation),
            segregation_reason: resolve(body, AnalysisField::SegregationReason),
            id: resolve(body, AnalysisField::Id),
            created_at: resolve(body, AnalysisField::CreatedAt),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn nested_field_with_defaults_for_the_rest() {
        let result = WasteAnalysisResult::from_response(&json!({"analysis": {"wasteType": "Plastic"}}));
        assert_eq!(result.waste_type, "Plastic");
        assert_eq!(result.urgency, "Medium");
        assert_eq!(result.severity, "Minor");
        assert_eq!(result.reasoning, "No reasoning provided");
        assert_eq!(result.segregation, "Unknown");
        assert_eq!(result.segregation_reason, "");
        assert_eq!(result.id, "");
        assert!(!result.created_at.is_empty());
    }

    #[test]
    fn flat_shape_is_accepted() {
        let result = WasteAnalysisResult::from_response(&json!({
            "wasteType": "Organic",
            "urgency": "High",
            "severity": "Major",
            "reasoning": "Food waste near a drain",
            "segregation": "Not segregated",
            "segregationReason": "Mixed with plastic",
            "_id": "abc123",
            "createdAt": "2026-03-01T10:00:00.000Z"
        }));
        assert_eq!(
            result,
            WasteAnalysisResult {
                waste_type: "Organic".to_string(),
                urgency: "High".to_string(),
                severity: "Major".to_string(),
                reasoning: "Food waste near a drain".to_string(),
                segregation: "Not segregated".to_string(),
                segregation_reason: "Mixed with plastic".to_string(),
                id: "abc123".to_string(),
                created_at: "2026-03-01T10:00:00.000Z".to_string(),
            }
        );
    }

    #[test]
    fn nested_wins_over_flat_per_field() {
        let body = json!({
            "analysis": {"urgency": "Low"},
            "urgency": "High",
            "severity": "Critical"
        });
        assert_eq!(resolve(&body, AnalysisField::Urgency), "Low");
        assert_eq!(resolve(&body, AnalysisField::Severity), "Critical");
    }

    #[test]
    fn empty_and_null_values_fall_through() {
        let body = json!({"analysis": {"wasteType": "", "severity": null}, "wasteType": "Glass"});
        assert_eq!(resolve(&body, AnalysisField::WasteType), "Glass");
        assert_eq!(resolve(&body, AnalysisField::Severity), "Minor");
    }

    #[test]
    fn scalars_are_stringified() {
        let body = json!({"analysis": {"segregation": false, "urgency": 3}});
        assert_eq!(resolve(&body, AnalysisField::Segregation), "false");
        assert_eq!(resolve(&body, AnalysisField::Urgency), "3");
    }

    #[test]
    fn id_prefers_nested_then_record_id() {
        assert_eq!(resolve(&json!({"_id": "rec", "id": "alt"}), AnalysisField::Id), "rec");
        assert_eq!(resolve(&json!({"analysis": {"id": "inner"}, "_id": "rec"}), AnalysisField::Id), "inner");
    }

    #[test]
    fn non_object_bodies_normalize_to_defaults() {
        for body in [json!([]), json!(null), json!({"analysis": "Plastic"})] {
            let result = WasteAnalysisResult::from_response(&body);
            assert_eq!(result.waste_type, "Unknown");
            assert_eq!(result.urgency, "Medium");
        }
    }

    #[test]
    fn every_field_has_candidates() {
        for field in AnalysisField::ALL {
            assert!(!field.candidates().is_empty(), "{field:?}");
        }
    }
}
