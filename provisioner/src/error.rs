//! Error taxonomy.
//!
//! Credential and validation errors reject a whole request before any remote
//! call. Everything else is terminal only for the zone or rule it happened on;
//! the batch loops turn it into a recorded failure string.

use axum::http::StatusCode;
use serde_json::Value;

#[derive(Debug, thiserror::Error)]
pub enum ProvisionError {
    #[error(
        "API token is required. Either paste your token in the UI or configure CF_API_TOKEN"
    )]
    MissingCredential,
    #[error("Invalid request: {0}")]
    Validation(String),
    #[error("Custom firewall ruleset not found. Make sure the zone has WAF enabled.")]
    RulesetNotFound { zone: String },
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl ProvisionError {
    /// Status code the HTTP surface answers with when this error ends a request.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ProvisionError::MissingCredential | ProvisionError::Validation(_) => {
                StatusCode::BAD_REQUEST
            }
            ProvisionError::RulesetNotFound { .. } | ProvisionError::Transport(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ProvisionError::MissingCredential => "config",
            ProvisionError::Validation(_) => "validation",
            ProvisionError::RulesetNotFound { .. } => "not_found",
            ProvisionError::Transport(_) => "transport",
        }
    }
}

/// Failure of a single remote call. Never retried here.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Non-2xx response; `body` is the raw response text.
    #[error("{context}: {status} {body}")]
    Status {
        context: &'static str,
        status: u16,
        body: String,
    },
    /// 2xx response whose envelope says `success: false`.
    #[error("API returned success=false: {}", render_errors(.errors))]
    Rejected { errors: Vec<Value> },
    #[error("{context}: {source}")]
    Request {
        context: &'static str,
        #[source]
        source: reqwest::Error,
    },
    /// The request URL could not be built from the base URL and path ids.
    #[error("{context}: invalid request URL: {reason}")]
    InvalidUrl {
        context: &'static str,
        reason: String,
    },
    #[error("{context}: unexpected response body: {source}")]
    Decode {
        context: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

fn render_errors(errors: &[Value]) -> String {
    serde_json::to_string(errors).unwrap_or_else(|_| format!("{errors:?}"))
}
