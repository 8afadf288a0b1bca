//! Batch Applier and Batch Remover
//!
//! Both walk their input in order, one remote mutation per item, and record a
//! failure string for every item that fails instead of stopping. The batch
//! always runs to the end before it reports.

use serde::Serialize;
use tracing::{info, warn};

use super::mutator::{self, OperationOutcome};
use super::verifier::{self, Verification};
use crate::cloudflare::RulesetApi;
use crate::credential::ApiToken;
use crate::model::RuleSpec;

/// Overall classification of a batch, derived from its counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchStatus {
    Success,
    Partial,
    Failed,
}

/// Aggregate of one batch. `succeeded + failures.len() == attempted` always holds.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchResult {
    pub attempted: usize,
    pub succeeded: usize,
    pub failures: Vec<String>,
    pub verification: Option<Verification>,
}

impl BatchResult {
    pub fn from_outcomes(outcomes: Vec<OperationOutcome>) -> Self {
        let attempted = outcomes.len();
        let mut succeeded = 0;
        let mut failures = Vec::new();
        for outcome in outcomes {
            match outcome {
                OperationOutcome::Applied => succeeded += 1,
                OperationOutcome::Failed { reason } => failures.push(reason),
            }
        }
        Self {
            attempted,
            succeeded,
            failures,
            verification: None,
        }
    }

    /// An empty batch counts as a full success.
    pub fn status(&self) -> BatchStatus {
        if self.succeeded == self.attempted {
            BatchStatus::Success
        } else if self.succeeded == 0 {
            BatchStatus::Failed
        } else {
            BatchStatus::Partial
        }
    }

    pub fn failed(&self) -> usize {
        self.failures.len()
    }
}

/// Create every spec in `rules` on one zone's ruleset, then snapshot it.
pub async fn apply(
    api: &dyn RulesetApi,
    zone: &str,
    ruleset_id: &str,
    rules: &[RuleSpec],
    token: &ApiToken,
) -> BatchResult {
    let mut outcomes = Vec::with_capacity(rules.len());

    for (index, rule) in rules.iter().enumerate() {
        let outcome = match mutator::create(api, zone, ruleset_id, rule, token).await {
            Ok(()) => OperationOutcome::Applied,
            Err(e) => {
                warn!("Zone {zone}: rule {} failed: {e}", index + 1);
                OperationOutcome::Failed {
                    reason: format!("Rule {} ({}): {e}", index + 1, rule.description),
                }
            }
        };
        outcomes.push(outcome);
    }

    let mut result = BatchResult::from_outcomes(outcomes);
    result.verification = Some(verifier::snapshot(api, zone, ruleset_id, token).await);

    info!(
        "Zone {zone}: added {} of {} rule(s) to {ruleset_id}",
        result.succeeded, result.attempted
    );
    result
}

/// Delete every id in `rule_ids` from one zone's ruleset. No snapshot is
/// taken; callers re-list when they want fresh state.
pub async fn remove(
    api: &dyn RulesetApi,
    zone: &str,
    ruleset_id: &str,
    rule_ids: &[String],
    token: &ApiToken,
) -> BatchResult {
    let mut outcomes = Vec::with_capacity(rule_ids.len());

    for rule_id in rule_ids {
        let outcome = match mutator::delete(api, zone, ruleset_id, rule_id, token).await {
            Ok(()) => OperationOutcome::Applied,
            Err(e) => {
                warn!("Zone {zone}: delete of rule {rule_id} failed: {e}");
                OperationOutcome::Failed {
                    reason: format!("Rule {rule_id}: {e}"),
                }
            }
        };
        outcomes.push(outcome);
    }

    let result = BatchResult::from_outcomes(outcomes);
    info!(
        "Zone {zone}: deleted {} of {} rule(s) from {ruleset_id}",
        result.succeeded, result.attempted
    );
    result
}
