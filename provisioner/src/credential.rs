//! Credential resolution. Picks the bearer token for a single call.
//!
//! A token supplied with the request always wins over the one configured for
//! the process. Absence of both is terminal for the call and is detected
//! before anything goes over the network.

use std::fmt;

use crate::error::ProvisionError;

/// Bearer token for the Cloudflare API. `Debug` never prints the secret.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiToken(String);

impl ApiToken {
    /// Wrap a raw token. Empty or whitespace-only input yields `None`.
    pub fn new(raw: impl Into<String>) -> Option<Self> {
        let raw = raw.into();
        if raw.trim().is_empty() {
            None
        } else {
            Some(Self(raw))
        }
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiToken(****)")
    }
}

/// Pure resolution of `(explicit, configured)`.
pub fn resolve_token(
    explicit: Option<&str>,
    configured: Option<&ApiToken>,
) -> Result<ApiToken, ProvisionError> {
    if let Some(token) = explicit.and_then(ApiToken::new) {
        return Ok(token);
    }
    configured.cloned().ok_or(ProvisionError::MissingCredential)
}

/// Holds the process-wide token handed over at startup.
#[derive(Debug, Clone, Default)]
pub struct CredentialResolver {
    configured: Option<ApiToken>,
}

impl CredentialResolver {
    pub fn new(configured: Option<ApiToken>) -> Self {
        Self { configured }
    }

    pub fn has_configured_token(&self) -> bool {
        self.configured.is_some()
    }

    pub fn resolve(&self, explicit: Option<&str>) -> Result<ApiToken, ProvisionError> {
        resolve_token(explicit, self.configured.as_ref())
    }
}
