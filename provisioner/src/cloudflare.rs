//! Cloudflare rulesets API client
//!
//! One method per remote endpoint the orchestrator consumes. Every response is
//! wrapped in the `{success, errors, messages, result}` envelope; a non-2xx
//! status and a 2xx with `success: false` are both reported as
//! [`TransportError`]s carrying whatever detail the API sent back.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Method, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::config::CloudflareConfig;
use crate::credential::ApiToken;
use crate::error::{ProvisionError, TransportError};
use crate::model::{RuleSpec, RulesetDetail, RulesetSummary};

/// Remote operations the orchestrator depends on.
///
/// Each call is exactly one HTTP request; implementations never batch or retry.
#[async_trait]
pub trait RulesetApi: Send + Sync {
    async fn list_rulesets(
        &self,
        zone: &str,
        token: &ApiToken,
    ) -> Result<Vec<RulesetSummary>, ProvisionError>;

    async fn get_ruleset(
        &self,
        zone: &str,
        ruleset_id: &str,
        token: &ApiToken,
    ) -> Result<RulesetDetail, ProvisionError>;

    async fn create_rule(
        &self,
        zone: &str,
        ruleset_id: &str,
        rule: &RuleSpec,
        token: &ApiToken,
    ) -> Result<(), ProvisionError>;

    async fn delete_rule(
        &self,
        zone: &str,
        ruleset_id: &str,
        rule_id: &str,
        token: &ApiToken,
    ) -> Result<(), ProvisionError>;
}

/// Response envelope shared by every Cloudflare v4 endpoint.
///
/// `errors` and `messages` are opaque; they are only ever echoed back.
#[derive(Debug, Deserialize, Serialize)]
pub struct ApiEnvelope<T> {
    pub success: bool,
    #[serde(default)]
    pub errors: Vec<Value>,
    #[serde(default)]
    pub messages: Vec<Value>,
    pub result: Option<T>,
}

/// reqwest-backed [`RulesetApi`].
pub struct CloudflareClient {
    client: reqwest::Client,
    base_url: String,
}

impl CloudflareClient {
    pub fn new(config: &CloudflareConfig) -> Result<Self, ProvisionError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|source| TransportError::Request {
                context: "Failed to build HTTP client",
                source,
            })?;
        Ok(Self::with_client(client, &config.api_base))
    }

    pub fn with_client(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Base URL plus `segments`, each percent-encoded as exactly one path
    /// segment. Ids are opaque, so `.` and `..` are refused outright.
    fn endpoint(&self, segments: &[&str], context: &'static str) -> Result<Url, TransportError> {
        let invalid = |reason: String| TransportError::InvalidUrl { context, reason };

        if let Some(segment) = segments
            .iter()
            .find(|s| s.is_empty() || **s == "." || **s == "..")
        {
            return Err(invalid(format!("path segment {segment:?} is not allowed")));
        }

        let mut url = Url::parse(&self.base_url).map_err(|e| invalid(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|()| invalid(format!("{} cannot be a base URL", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn send<T: DeserializeOwned>(
        &self,
        method: Method,
        segments: &[&str],
        body: Option<&RuleSpec>,
        token: &ApiToken,
        context: &'static str,
    ) -> Result<Option<T>, TransportError> {
        let url = self.endpoint(segments, context)?;
        debug!("{method} {url}");

        let mut request = self
            .client
            .request(method, url)
            .bearer_auth(token.expose())
            .header("Content-Type", "application/json");
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|source| TransportError::Request { context, source })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|source| TransportError::Request { context, source })?;

        if !status.is_success() {
            return Err(TransportError::Status {
                context,
                status: status.as_u16(),
                body: text,
            });
        }

        let envelope: ApiEnvelope<T> = serde_json::from_str(&text)
            .map_err(|source| TransportError::Decode { context, source })?;

        if !envelope.success {
            return Err(TransportError::Rejected {
                errors: envelope.errors,
            });
        }

        Ok(envelope.result)
    }
}

#[async_trait]
impl RulesetApi for CloudflareClient {
    async fn list_rulesets(
        &self,
        zone: &str,
        token: &ApiToken,
    ) -> Result<Vec<RulesetSummary>, ProvisionError> {
        let rulesets = self
            .send::<Vec<RulesetSummary>>(
                Method::GET,
                &["zones", zone, "rulesets"],
                None,
                token,
                "Failed to get rulesets",
            )
            .await?;
        Ok(rulesets.unwrap_or_default())
    }

    async fn get_ruleset(
        &self,
        zone: &str,
        ruleset_id: &str,
        token: &ApiToken,
    ) -> Result<RulesetDetail, ProvisionError> {
        let detail = self
            .send::<RulesetDetail>(
                Method::GET,
                &["zones", zone, "rulesets", ruleset_id],
                None,
                token,
                "Failed to get ruleset details",
            )
            .await?;
        Ok(detail.unwrap_or_default())
    }

    async fn create_rule(
        &self,
        zone: &str,
        ruleset_id: &str,
        rule: &RuleSpec,
        token: &ApiToken,
    ) -> Result<(), ProvisionError> {
        self.send::<Value>(
            Method::POST,
            &["zones", zone, "rulesets", ruleset_id, "rules"],
            Some(rule),
            token,
            "Failed to add rule",
        )
        .await?;
        Ok(())
    }

    async fn delete_rule(
        &self,
        zone: &str,
        ruleset_id: &str,
        rule_id: &str,
        token: &ApiToken,
    ) -> Result<(), ProvisionError> {
        self.send::<Value>(
            Method::DELETE,
            &["zones", zone, "rulesets", ruleset_id, "rules", rule_id],
            None,
            token,
            "Failed to delete rule",
        )
        .await?;
        Ok(())
    }
}
