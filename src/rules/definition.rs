//! Rule definitions as stored and as written.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// A named, persisted rule definition.
///
/// `rule_text` holds a YAML rule document; see [`RuleDocument`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleDefinition {
    /// Unique name; becomes the rule base name.
    pub name: String,
    /// YAML rule document.
    pub rule_text: String,
    /// Last modification time.
    pub last_updated: DateTime<Utc>,
}

impl RuleDefinition {
    /// Creates a definition stamped with the current time.
    pub fn new(name: impl Into<String>, rule_text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rule_text: rule_text.into(),
            last_updated: Utc::now(),
        }
    }
}

/// Top-level structure of a rule document.
///
/// ```yaml
/// rules:
///   - name: meets-minimum-age
///     salience: 10
///     when:
///       - field: age
///         op: gte
///         to_field: minimum_age
///     then:
///       - set: eligible
///         value: true
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleDocument {
    /// Rules of this document.
    pub rules: Vec<RuleSpec>,
}

/// One rule as written.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleSpec {
    /// Rule name, unique within its document.
    pub name: String,
    /// Higher runs first.
    #[serde(default)]
    pub salience: i32,
    /// Conditions that must all hold.
    #[serde(default)]
    pub when: Vec<ConditionSpec>,
    /// Actions applied when the rule fires.
    pub then: Vec<ActionSpec>,
}

/// A condition as written.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConditionSpec {
    /// Field tested.
    pub field: String,
    /// Operator name.
    pub op: String,
    /// Literal operand.
    #[serde(default, deserialize_with = "present")]
    pub value: Option<serde_yaml::Value>,
    /// Field operand.
    #[serde(default)]
    pub to_field: Option<String>,
}

/// An action as written.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ActionSpec {
    /// Field written.
    pub set: String,
    /// Literal source.
    #[serde(default, deserialize_with = "present")]
    pub value: Option<serde_yaml::Value>,
    /// Field source.
    #[serde(default)]
    pub from: Option<String>,
    /// Expression source.
    #[serde(default)]
    pub expr: Option<String>,
}

// Distinguishes `value: ~` (a null literal) from an absent key.
fn present<'de, D>(deserializer: D) -> Result<Option<serde_yaml::Value>, D::Error>
where
    D: Deserializer<'de>,
{
    serde_yaml::Value::deserialize(deserializer).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_literal_is_distinct_from_absent() {
        let doc: RuleDocument = serde_yaml::from_str(
            r#"
rules:
  - name: clear-date
    then:
      - set: eligibility_date
        value: ~
      - set: eligibility_reason
        from: employment_status
"#,
        )
        .unwrap();
        let actions = &doc.rules[0].then;
        assert_eq!(actions[0].value, Some(serde_yaml::Value::Null));
        assert_eq!(actions[1].value, None);
    }

    #[test]
    fn test_salience_and_when_default() {
        let doc: RuleDocument =
            serde_yaml::from_str("rules:\n  - name: always\n    then: []\n").unwrap();
        assert_eq!(doc.rules[0].salience, 0);
        assert!(doc.rules[0].when.is_empty());
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        let result: Result<RuleDocument, _> = serde_yaml::from_str(
            "rules:\n  - name: typo\n    whenn: []\n    then: []\n",
        );
        assert!(result.is_err());
    }
}
