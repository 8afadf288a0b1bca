//! Rule and ruleset types shared by the orchestrator and the remote client.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ProvisionError;

/// Phase tag of the one ruleset per zone that holds custom firewall rules.
pub const CUSTOM_FIREWALL_PHASE: &str = "http_request_firewall_custom";

/// A rule the operator wants created. Has no id until the remote side assigns one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSpec {
    #[serde(default)]
    pub action: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub expression: String,
}

impl RuleSpec {
    pub fn new(
        action: impl Into<String>,
        description: impl Into<String>,
        expression: impl Into<String>,
    ) -> Self {
        Self {
            action: action.into(),
            description: description.into(),
            expression: expression.into(),
        }
    }

    /// First required field that is empty, if any.
    pub fn missing_field(&self) -> Option<&'static str> {
        [
            ("action", &self.action),
            ("description", &self.description),
            ("expression", &self.expression),
        ]
        .into_iter()
        .find(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
    }
}

/// Entry of `GET /zones/{zone}/rulesets`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RulesetSummary {
    pub id: String,
    #[serde(default)]
    pub phase: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub kind: String,
}

/// Result of `GET /zones/{zone}/rulesets/{id}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RulesetDetail {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub phase: String,
    #[serde(default)]
    pub rules: Vec<Rule>,
}

/// A rule as stored remotely. Fields this service does not read are kept
/// verbatim so listings round-trip to the UI untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub id: String,
    #[serde(default)]
    pub action: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub expression: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

pub fn require_non_empty(field: &str, value: &str) -> Result<(), ProvisionError> {
    if value.trim().is_empty() {
        return Err(ProvisionError::Validation(format!("{field} is required")));
    }
    Ok(())
}

/// Checks a rule batch: at least one rule, every rule fully specified.
pub fn validate_rule_specs(rules: &[RuleSpec]) -> Result<(), ProvisionError> {
    if rules.is_empty() {
        return Err(ProvisionError::Validation(
            "rules array is required and must not be empty".into(),
        ));
    }
    for (index, rule) in rules.iter().enumerate() {
        if let Some(field) = rule.missing_field() {
            return Err(ProvisionError::Validation(format!(
                "rule {} is missing required field '{field}'",
                index + 1
            )));
        }
    }
    Ok(())
}

/// Checks a delete selection: at least one id, no blank ids.
pub fn validate_rule_ids(rule_ids: &[String]) -> Result<(), ProvisionError> {
    if rule_ids.is_empty() {
        return Err(ProvisionError::Validation(
            "ruleIds array is required and must not be empty".into(),
        ));
    }
    if let Some(position) = rule_ids.iter().position(|id| id.trim().is_empty()) {
        return Err(ProvisionError::Validation(format!(
            "ruleIds[{position}] is empty"
        )));
    }
    Ok(())
}
