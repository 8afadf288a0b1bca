//! One remote create or delete per call.
//!
//! Specs are never grouped into a single remote request: per-item isolation
//! in the batch loops depends on one call per item.

use tracing::debug;

use crate::cloudflare::RulesetApi;
use crate::credential::ApiToken;
use crate::error::ProvisionError;
use crate::model::RuleSpec;

/// Result of one mutation as seen by the batch loops.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationOutcome {
    Applied,
    /// `reason` is the operator-facing failure line for the item.
    Failed { reason: String },
}

impl OperationOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, OperationOutcome::Applied)
    }
}

/// Create one rule. The id the remote side assigns is not returned.
pub async fn create(
    api: &dyn RulesetApi,
    zone: &str,
    ruleset_id: &str,
    rule: &RuleSpec,
    token: &ApiToken,
) -> Result<(), ProvisionError> {
    debug!("Zone {zone}: creating rule '{}' in {ruleset_id}", rule.description);
    api.create_rule(zone, ruleset_id, rule, token).await
}

/// Delete one rule by its remote id.
pub async fn delete(
    api: &dyn RulesetApi,
    zone: &str,
    ruleset_id: &str,
    rule_id: &str,
    token: &ApiToken,
) -> Result<(), ProvisionError> {
    debug!("Zone {zone}: deleting rule {rule_id} from {ruleset_id}");
    api.delete_rule(zone, ruleset_id, rule_id, token).await
}
