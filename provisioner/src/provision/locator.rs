//! Ruleset lookup: finds the zone's custom firewall ruleset.

use tracing::{debug, warn};

use crate::cloudflare::RulesetApi;
use crate::credential::ApiToken;
use crate::error::ProvisionError;
use crate::model::{RulesetSummary, CUSTOM_FIREWALL_PHASE};

/// Resolve the id of the ruleset carrying the custom firewall phase.
///
/// The container is never created here: a zone without one is misconfigured.
pub async fn locate(
    api: &dyn RulesetApi,
    zone: &str,
    token: &ApiToken,
) -> Result<String, ProvisionError> {
    let rulesets = api.list_rulesets(zone, token).await?;
    debug!("Zone {zone}: {} rulesets configured", rulesets.len());
    select_custom_ruleset(zone, &rulesets)
}

/// First ruleset in returned order whose phase matches wins.
pub fn select_custom_ruleset(
    zone: &str,
    rulesets: &[RulesetSummary],
) -> Result<String, ProvisionError> {
    let mut matches = rulesets
        .iter()
        .filter(|ruleset| ruleset.phase == CUSTOM_FIREWALL_PHASE);

    let first = matches.next().ok_or_else(|| ProvisionError::RulesetNotFound {
        zone: zone.to_string(),
    })?;

    let extra = matches.count();
    if extra > 0 {
        warn!(
            "Zone {zone}: {} rulesets carry phase {CUSTOM_FIREWALL_PHASE}, using {}",
            extra + 1,
            first.id
        );
    }

    Ok(first.id.clone())
}
