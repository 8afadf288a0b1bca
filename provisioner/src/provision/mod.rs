//! Provisioning orchestrator
//!
//! [`Provisioner`] ties the credential resolver to a [`RulesetApi`] and
//! exposes the add, list, delete and multi-zone flows. Everything runs
//! sequentially: each remote call completes before the next one starts, and
//! each request builds its own accumulators, so concurrent requests share
//! nothing mutable.

pub mod batch;
pub mod coordinator;
pub mod locator;
pub mod mutator;
pub mod verifier;

#[cfg(test)]
pub(crate) mod testing;

use std::sync::Arc;

pub use batch::{BatchResult, BatchStatus};
pub use coordinator::{MultiZoneResult, ZoneOutcome, ZoneReport};
pub use mutator::OperationOutcome;
pub use verifier::Verification;

use crate::cloudflare::RulesetApi;
use crate::credential::{ApiToken, CredentialResolver};
use crate::error::ProvisionError;
use crate::model::{Rule, RuleSpec};

/// Current contents of a zone's custom ruleset.
#[derive(Debug, Clone)]
pub struct RuleListing {
    pub ruleset_id: String,
    pub rules: Vec<Rule>,
}

pub struct Provisioner {
    api: Arc<dyn RulesetApi>,
    credentials: CredentialResolver,
}

impl Provisioner {
    pub fn new(api: Arc<dyn RulesetApi>, credentials: CredentialResolver) -> Self {
        Self { api, credentials }
    }

    pub fn credentials(&self) -> &CredentialResolver {
        &self.credentials
    }

    pub fn resolve_token(&self, explicit: Option<&str>) -> Result<ApiToken, ProvisionError> {
        self.credentials.resolve(explicit)
    }

    pub async fn locate(&self, zone: &str, token: &ApiToken) -> Result<String, ProvisionError> {
        locator::locate(self.api.as_ref(), zone, token).await
    }

    /// Single-zone add: locate the ruleset, then apply the batch.
    pub async fn add_rules(
        &self,
        zone: &str,
        rules: &[RuleSpec],
        token: &ApiToken,
    ) -> Result<(String, BatchResult), ProvisionError> {
        let ruleset_id = self.locate(zone, token).await?;
        let result = self.apply(zone, &ruleset_id, rules, token).await;
        Ok((ruleset_id, result))
    }

    pub async fn apply(
        &self,
        zone: &str,
        ruleset_id: &str,
        rules: &[RuleSpec],
        token: &ApiToken,
    ) -> BatchResult {
        batch::apply(self.api.as_ref(), zone, ruleset_id, rules, token).await
    }

    pub async fn remove(
        &self,
        zone: &str,
        ruleset_id: &str,
        rule_ids: &[String],
        token: &ApiToken,
    ) -> BatchResult {
        batch::remove(self.api.as_ref(), zone, ruleset_id, rule_ids, token).await
    }

    pub async fn run(
        &self,
        zones: &[String],
        rules: &[RuleSpec],
        token: &ApiToken,
    ) -> MultiZoneResult {
        coordinator::run(self.api.as_ref(), zones, rules, token).await
    }

    pub async fn snapshot(&self, zone: &str, ruleset_id: &str, token: &ApiToken) -> Verification {
        verifier::snapshot(self.api.as_ref(), zone, ruleset_id, token).await
    }

    /// Inventory for the delete flow. Unlike [`Self::snapshot`] a failure here
    /// is an error, since the listing is the whole point of the call.
    pub async fn list_rules(
        &self,
        zone: &str,
        token: &ApiToken,
    ) -> Result<RuleListing, ProvisionError> {
        let ruleset_id = self.locate(zone, token).await?;
        let detail = self.api.get_ruleset(zone, &ruleset_id, token).await?;
        Ok(RuleListing {
            ruleset_id,
            rules: detail.rules,
        })
    }
}
