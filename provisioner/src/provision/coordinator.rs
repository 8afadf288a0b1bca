//! Multi-Zone Coordinator
//!
//! Runs the add flow over several zones in input order. A zone that cannot
//! be processed at all gets an error entry and the run moves on; it never
//! stops the remaining zones.

use chrono::{DateTime, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use super::batch::{self, BatchResult, BatchStatus};
use super::locator;
use crate::cloudflare::RulesetApi;
use crate::credential::ApiToken;
use crate::model::RuleSpec;

#[derive(Debug, Clone, PartialEq)]
pub enum ZoneOutcome {
    /// Ruleset found and the batch ran (it may still have failed items).
    Completed {
        ruleset_id: String,
        batch: BatchResult,
    },
    /// The zone could not be processed; no mutation was attempted on it.
    Failed { kind: &'static str, error: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ZoneReport {
    pub zone_id: String,
    pub outcome: ZoneOutcome,
}

impl ZoneReport {
    /// A zone counts as succeeded only when every rule landed.
    pub fn succeeded(&self) -> bool {
        matches!(
            &self.outcome,
            ZoneOutcome::Completed { batch, .. } if batch.status() == BatchStatus::Success
        )
    }

    pub fn rules_added(&self) -> usize {
        match &self.outcome {
            ZoneOutcome::Completed { batch, .. } => batch.succeeded,
            ZoneOutcome::Failed { .. } => 0,
        }
    }
}

/// Final artifact of a multi-zone run, built once after every zone was tried.
#[derive(Debug, Clone)]
pub struct MultiZoneResult {
    pub request_id: Uuid,
    pub zones: Vec<ZoneReport>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl MultiZoneResult {
    pub fn succeeded_zones(&self) -> usize {
        self.zones.iter().filter(|z| z.succeeded()).count()
    }

    pub fn failed_zones(&self) -> usize {
        self.zones.len() - self.succeeded_zones()
    }

    pub fn rules_added(&self) -> usize {
        self.zones.iter().map(ZoneReport::rules_added).sum()
    }

    /// Success when every zone fully succeeded, failure when not a single
    /// rule was added anywhere, partial otherwise.
    pub fn status(&self) -> BatchStatus {
        if self.failed_zones() == 0 {
            BatchStatus::Success
        } else if self.rules_added() == 0 {
            BatchStatus::Failed
        } else {
            BatchStatus::Partial
        }
    }
}

pub async fn run(
    api: &dyn RulesetApi,
    zones: &[String],
    rules: &[RuleSpec],
    token: &ApiToken,
) -> MultiZoneResult {
    let request_id = Uuid::new_v4();
    let started_at = Utc::now();
    let mut reports = Vec::with_capacity(zones.len());

    info!(
        "[{request_id}] Provisioning {} rule(s) across {} zone(s)",
        rules.len(),
        zones.len()
    );

    for (position, zone) in zones.iter().enumerate() {
        info!("[{request_id}] Zone {}/{}: {zone}", position + 1, zones.len());

        let outcome = match locator::locate(api, zone, token).await {
            Ok(ruleset_id) => {
                info!("[{request_id}] Zone {zone}: custom ruleset {ruleset_id}");
                let batch = batch::apply(api, zone, &ruleset_id, rules, token).await;
                ZoneOutcome::Completed { ruleset_id, batch }
            }
            Err(e) => {
                warn!("[{request_id}] Zone {zone} skipped: {e}");
                ZoneOutcome::Failed {
                    kind: e.kind(),
                    error: e.to_string(),
                }
            }
        };

        reports.push(ZoneReport {
            zone_id: zone.clone(),
            outcome,
        });
    }

    let result = MultiZoneResult {
        request_id,
        zones: reports,
        started_at,
        finished_at: Utc::now(),
    };

    info!(
        "[{request_id}] Completed: {} succeeded, {} failed, {} rule(s) added",
        result.succeeded_zones(),
        result.failed_zones(),
        result.rules_added()
    );
    result
}
