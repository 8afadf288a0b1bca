//! Best-effort post-apply snapshot of a ruleset.

use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use crate::cloudflare::RulesetApi;
use crate::credential::ApiToken;
use crate::error::{ProvisionError, TransportError};
use crate::model::Rule;

/// What the UI shows after an add. A degraded snapshot never changes the
/// batch's own classification.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Verification {
    Snapshot {
        #[serde(rename = "totalRules")]
        total_rules: usize,
        rules: Vec<Rule>,
    },
    Degraded {
        error: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        details: Option<Vec<Value>>,
    },
}

impl Verification {
    pub fn is_degraded(&self) -> bool {
        matches!(self, Verification::Degraded { .. })
    }

    pub fn total_rules(&self) -> Option<usize> {
        match self {
            Verification::Snapshot { total_rules, .. } => Some(*total_rules),
            Verification::Degraded { .. } => None,
        }
    }
}

pub async fn snapshot(
    api: &dyn RulesetApi,
    zone: &str,
    ruleset_id: &str,
    token: &ApiToken,
) -> Verification {
    match api.get_ruleset(zone, ruleset_id, token).await {
        Ok(detail) => Verification::Snapshot {
            total_rules: detail.rules.len(),
            rules: detail.rules,
        },
        Err(e) => {
            warn!("Zone {zone}: verification of {ruleset_id} degraded: {e}");
            degrade(e)
        }
    }
}

fn degrade(err: ProvisionError) -> Verification {
    match err {
        ProvisionError::Transport(TransportError::Status { status, .. }) => {
            Verification::Degraded {
                error: format!("Failed to verify: {status}"),
                details: None,
            }
        }
        ProvisionError::Transport(TransportError::Rejected { errors }) => {
            Verification::Degraded {
                error: "Verification failed".into(),
                details: Some(errors),
            }
        }
        other => Verification::Degraded {
            error: other.to_string(),
            details: None,
        },
    }
}
