//! In-memory [`RulesetApi`] for unit tests.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{json, Map};

use crate::cloudflare::RulesetApi;
use crate::credential::ApiToken;
use crate::error::{ProvisionError, TransportError};
use crate::model::{Rule, RuleSpec, RulesetDetail, RulesetSummary, CUSTOM_FIREWALL_PHASE};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Call {
    ListRulesets(String),
    GetRuleset(String, String),
    /// (zone, rule description)
    Create(String, String),
    /// (zone, rule id)
    Delete(String, String),
}

#[derive(Default)]
pub(crate) struct FakeApi {
    rulesets: HashMap<String, Vec<RulesetSummary>>,
    failing_listings: HashSet<String>,
    failing_creates: HashSet<String>,
    failing_deletes: HashSet<String>,
    verify_fails: bool,
    rules: Mutex<HashMap<String, Vec<Rule>>>,
    calls: Mutex<Vec<Call>>,
    next_id: Mutex<u32>,
}

impl FakeApi {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_zone(mut self, zone: &str, ruleset_id: &str) -> Self {
        self.rulesets.insert(
            zone.to_string(),
            vec![
                summary("managed", "http_request_firewall_managed"),
                summary(ruleset_id, CUSTOM_FIREWALL_PHASE),
            ],
        );
        self
    }

    pub(crate) fn with_zone_without_custom_ruleset(mut self, zone: &str) -> Self {
        self.rulesets.insert(
            zone.to_string(),
            vec![summary("managed", "http_request_firewall_managed")],
        );
        self
    }

    pub(crate) fn fail_listing(mut self, zone: &str) -> Self {
        self.failing_listings.insert(zone.to_string());
        self
    }

    /// Fail creates whose description matches.
    pub(crate) fn fail_create(mut self, description: &str) -> Self {
        self.failing_creates.insert(description.to_string());
        self
    }

    pub(crate) fn fail_delete(mut self, rule_id: &str) -> Self {
        self.failing_deletes.insert(rule_id.to_string());
        self
    }

    pub(crate) fn fail_verify(mut self) -> Self {
        self.verify_fails = true;
        self
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    /// Seed a rule without recording a call.
    pub(crate) fn create_rule_direct(&self, ruleset_id: &str, spec: RuleSpec) {
        let rule = self.make_rule(spec);
        self.rules
            .lock()
            .unwrap()
            .entry(ruleset_id.to_string())
            .or_default()
            .push(rule);
    }

    fn make_rule(&self, spec: RuleSpec) -> Rule {
        let mut next = self.next_id.lock().unwrap();
        *next += 1;
        Rule {
            id: format!("rule-{next}"),
            action: spec.action,
            description: spec.description,
            expression: spec.expression,
            enabled: Some(true),
            extra: Map::new(),
        }
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

fn summary(id: &str, phase: &str) -> RulesetSummary {
    RulesetSummary {
        id: id.to_string(),
        phase: phase.to_string(),
        name: format!("{id} ruleset"),
        kind: "zone".to_string(),
    }
}

fn rejected(message: &str) -> ProvisionError {
    TransportError::Rejected {
        errors: vec![json!({"code": 10000, "message": message})],
    }
    .into()
}

#[async_trait]
impl RulesetApi for FakeApi {
    async fn list_rulesets(
        &self,
        zone: &str,
        _token: &ApiToken,
    ) -> Result<Vec<RulesetSummary>, ProvisionError> {
        self.record(Call::ListRulesets(zone.to_string()));
        if self.failing_listings.contains(zone) {
            return Err(rejected("listing failed"));
        }
        match self.rulesets.get(zone) {
            Some(rulesets) => Ok(rulesets.clone()),
            None => Err(TransportError::Status {
                context: "Failed to get rulesets",
                status: 404,
                body: "zone not found".into(),
            }
            .into()),
        }
    }

    async fn get_ruleset(
        &self,
        zone: &str,
        ruleset_id: &str,
        _token: &ApiToken,
    ) -> Result<RulesetDetail, ProvisionError> {
        self.record(Call::GetRuleset(zone.to_string(), ruleset_id.to_string()));
        if self.verify_fails {
            return Err(TransportError::Status {
                context: "Failed to get ruleset details",
                status: 503,
                body: "unavailable".into(),
            }
            .into());
        }
        let rules = self
            .rules
            .lock()
            .unwrap()
            .get(ruleset_id)
            .cloned()
            .unwrap_or_default();
        Ok(RulesetDetail {
            id: ruleset_id.to_string(),
            name: String::new(),
            phase: CUSTOM_FIREWALL_PHASE.to_string(),
            rules,
        })
    }

    async fn create_rule(
        &self,
        zone: &str,
        ruleset_id: &str,
        rule: &RuleSpec,
        _token: &ApiToken,
    ) -> Result<(), ProvisionError> {
        self.record(Call::Create(zone.to_string(), rule.description.clone()));
        if self.failing_creates.contains(&rule.description) {
            return Err(rejected("invalid expression"));
        }
        self.create_rule_direct(ruleset_id, rule.clone());
        Ok(())
    }

    async fn delete_rule(
        &self,
        zone: &str,
        ruleset_id: &str,
        rule_id: &str,
        _token: &ApiToken,
    ) -> Result<(), ProvisionError> {
        self.record(Call::Delete(zone.to_string(), rule_id.to_string()));
        if self.failing_deletes.contains(rule_id) {
            return Err(rejected("rule not found"));
        }
        if let Some(rules) = self.rules.lock().unwrap().get_mut(ruleset_id) {
            rules.retain(|r| r.id != rule_id);
        }
        Ok(())
    }
}
