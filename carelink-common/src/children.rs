//! Child record model and normalization
//!
//! Stored child documents come in two generations:
//! - legacy: free text under `specialNeeds`
//! - current: `specialDetails`, either free text or a structured object with
//!   five note sections, plus the five sections at the top level as written
//!   by the notes editor
//!
//! A child is a free-form JSON object. [`normalize`] and [`upgrade`] only
//! touch `specialNeeds`, `specialDetails` and `parentNotes`; every other key
//! passes through untouched whatever its type. `upgrade` always normalizes
//! first.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const SPECIAL_NEEDS: &str = "specialNeeds";
pub const SPECIAL_DETAILS: &str = "specialDetails";
pub const PARENT_NOTES: &str = "parentNotes";

/// Top-level note sections written by the editor
pub const SECTION_KEYS: [&str; 5] = [
    "healthSafety",
    "behaviorEmotions",
    "routineFood",
    "learningActivities",
    PARENT_NOTES,
];

/// JavaScript-style truthiness of a stored value
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::String(s) => !s.is_empty(),
        Value::Number(n) => n.as_f64().map_or(true, |n| n != 0.0 && !n.is_nan()),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Typed view of a `specialDetails` value
#[derive(Debug, Clone, PartialEq)]
pub enum SpecialDetails {
    /// Free text, also the shape produced by migrating `specialNeeds`
    Text(String),
    /// Exactly the five named note sections, all text
    Notes(StructuredNotes),
    /// Anything else found in stored data
    Other(Value),
}

impl SpecialDetails {
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::String(text) => SpecialDetails::Text(text.clone()),
            Value::Object(_) => serde_json::from_value(value.clone())
                .map(SpecialDetails::Notes)
                .unwrap_or_else(|_| SpecialDetails::Other(value.clone())),
            other => SpecialDetails::Other(other.clone()),
        }
    }
}

/// The five note sections of the child notes editor
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct StructuredNotes {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health_safety: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub behavior_emotions: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub routine_food: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub learning_activities: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_notes: Option<String>,
}

impl StructuredNotes {
    /// True when no section has content
    pub fn is_empty(&self) -> bool {
        [
            &self.health_safety,
            &self.behavior_emotions,
            &self.routine_food,
            &self.learning_activities,
            &self.parent_notes,
        ]
        .iter()
        .all(|section| section.as_deref().map_or(true, str::is_empty))
    }
}

/// One child as stored by a parent account
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChildRecord {
    fields: Map<String, Value>,
}

impl ChildRecord {
    /// Wrap a JSON object. Non-object values become an empty record.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(fields) => Self { fields },
            _ => Self::default(),
        }
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.fields.clone())
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.fields)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn special_needs(&self) -> Option<&Value> {
        self.fields.get(SPECIAL_NEEDS)
    }

    pub fn special_details(&self) -> Option<SpecialDetails> {
        self.fields.get(SPECIAL_DETAILS).map(SpecialDetails::from_value)
    }

    /// Whether any top-level note section has content
    pub fn has_section_content(&self) -> bool {
        SECTION_KEYS
            .iter()
            .any(|key| self.fields.get(*key).is_some_and(is_truthy))
    }
}

/// Migrate `specialNeeds` into `specialDetails` and drop `specialNeeds`
///
/// The legacy value only moves when it is truthy and `specialDetails` is
/// not. `specialNeeds` is removed in every case, so the function is
/// idempotent.
pub fn normalize(mut child: ChildRecord) -> ChildRecord {
    if let Some(legacy) = child.fields.remove(SPECIAL_NEEDS) {
        let has_details = child.fields.get(SPECIAL_DETAILS).is_some_and(is_truthy);
        if is_truthy(&legacy) && !has_details {
            child.fields.insert(SPECIAL_DETAILS.to_string(), legacy);
        }
    }
    child
}

/// Normalize, then fold free-text `specialDetails` into `parentNotes`
///
/// The fold happens only when `specialDetails` is non-empty text and none of
/// the five top-level sections has content.
pub fn upgrade(child: ChildRecord) -> ChildRecord {
    let mut child = normalize(child);

    let text = match child.fields.get(SPECIAL_DETAILS) {
        Some(Value::String(text)) if !text.is_empty() => text.clone(),
        _ => return child,
    };
    if !child.has_section_content() {
        child
            .fields
            .insert(PARENT_NOTES.to_string(), Value::String(text));
    }
    child
}

/// [`normalize`] for a raw stored value; non-objects pass through unchanged
pub fn normalize_value(value: Value) -> Value {
    match value {
        Value::Object(_) => normalize(ChildRecord::from_value(value)).into_value(),
        other => other,
    }
}

/// [`upgrade`] for a raw stored value; non-objects pass through unchanged
pub fn upgrade_value(value: Value) -> Value {
    match value {
        Value::Object(_) => upgrade(ChildRecord::from_value(value)).into_value(),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn child(value: Value) -> ChildRecord {
        ChildRecord::from_value(value)
    }

    #[test]
    fn test_normalize_migrates_special_needs() {
        let out = normalize(child(json!({"specialNeeds": "peanut allergy"})));
        assert_eq!(out.to_value(), json!({"specialDetails": "peanut allergy"}));
    }

    #[test]
    fn test_normalize_keeps_existing_details() {
        let out = normalize(child(json!({
            "name": "Ava",
            "specialNeeds": "old text",
            "specialDetails": "new text"
        })));
        assert_eq!(
            out.to_value(),
            json!({"name": "Ava", "specialDetails": "new text"})
        );
    }

    #[test]
    fn test_normalize_replaces_empty_details() {
        let out = normalize(child(json!({
            "specialNeeds": "asthma",
            "specialDetails": ""
        })));
        assert_eq!(
            out.special_details(),
            Some(SpecialDetails::Text("asthma".to_string()))
        );
    }

    #[test]
    fn test_normalize_drops_empty_special_needs() {
        let out = normalize(child(json!({"name": "Leo", "specialNeeds": ""})));
        assert_eq!(out.to_value(), json!({"name": "Leo"}));
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let inputs = vec![
            json!({}),
            json!({"specialNeeds": "peanut allergy"}),
            json!({"specialNeeds": "a", "specialDetails": "b", "dob": "2021-04-01"}),
            json!({"specialDetails": {"healthSafety": "inhaler"}, "specialNeeds": "x"}),
            json!({"parentNotes": "naps at noon", "gender": "F"}),
            json!({"specialNeeds": 5, "name": "Leo"}),
        ];

        for input in inputs {
            let once = normalize(child(input));
            let twice = normalize(once.clone());
            assert_eq!(once, twice);
            assert!(once.special_needs().is_none());
        }
    }

    #[test]
    fn test_odd_field_types_survive_normalize() {
        let input = json!({
            "name": "Ava",
            "dob": "2021-04-01",
            "healthSafety": ["epipen"],
            "siblings": 2,
            "pickup": {"mon": "Dad"}
        });
        assert_eq!(normalize(child(input.clone())).to_value(), input);
    }

    #[test]
    fn test_non_text_special_needs_moves_verbatim() {
        let out = normalize(child(json!({"name": "Leo", "specialNeeds": 5})));
        assert_eq!(out.to_value(), json!({"name": "Leo", "specialDetails": 5}));
        assert_eq!(out.special_details(), Some(SpecialDetails::Other(json!(5))));
    }

    #[test]
    fn test_structured_details_are_typed() {
        let value = json!({
            "specialDetails": {"healthSafety": "inhaler", "parentNotes": "shy"}
        });
        let record = child(value.clone());
        assert!(matches!(
            record.special_details(),
            Some(SpecialDetails::Notes(_))
        ));
        assert_eq!(record.to_value(), value);
    }

    #[test]
    fn test_unknown_detail_keys_are_other_and_kept() {
        let value = json!({"name": "Mia", "specialDetails": {"allergy": "nuts"}});
        let out = upgrade(child(value.clone()));
        assert!(matches!(
            out.special_details(),
            Some(SpecialDetails::Other(_))
        ));
        assert_eq!(out.to_value(), value);
    }

    #[test]
    fn test_upgrade_folds_text_into_parent_notes() {
        let out = upgrade(child(json!({"specialNeeds": "loves trucks"})));
        assert_eq!(
            out.to_value(),
            json!({"specialDetails": "loves trucks", "parentNotes": "loves trucks"})
        );
    }

    #[test]
    fn test_upgrade_leaves_populated_sections_alone() {
        let out = upgrade(child(json!({
            "specialDetails": "free text",
            "routineFood": "no spicy food"
        })));
        assert!(out.get(PARENT_NOTES).is_none());
        assert_eq!(out.get("routineFood"), Some(&json!("no spicy food")));
    }

    #[test]
    fn test_upgrade_ignores_structured_details() {
        let out = upgrade(child(json!({
            "specialDetails": {"behaviorEmotions": "calm"}
        })));
        assert!(!out.has_section_content());
    }

    #[test]
    fn test_upgrade_keeps_unrelated_fields() {
        let out = upgrade(child(json!({
            "name": "Ava",
            "specialDetails": "naps",
            "healthSafety": ""
        })));
        assert_eq!(
            out.to_value(),
            json!({"name": "Ava", "specialDetails": "naps", "healthSafety": "", "parentNotes": "naps"})
        );
    }

    #[test]
    fn test_non_objects() {
        assert_eq!(ChildRecord::from_value(json!("nope")), ChildRecord::default());
        assert_eq!(normalize_value(json!("nope")), json!("nope"));
        assert_eq!(upgrade_value(json!(null)), json!(null));
    }

    #[test]
    fn test_truthiness() {
        assert!(!is_truthy(&Value::Null));
        assert!(!is_truthy(&json!(false)));
        assert!(!is_truthy(&json!("")));
        assert!(!is_truthy(&json!(0)));
        assert!(is_truthy(&json!({})));
        assert!(is_truthy(&json!([])));
        assert!(is_truthy(&json!("x")));
    }
}
