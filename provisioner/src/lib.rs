//! WAF rule provisioner
//!
//! Adds and removes custom firewall rules on Cloudflare zones, one rule at a
//! time, and reports per-zone and per-rule outcomes including partial
//! failures.
//!
//! - [`provision`] holds the orchestration: ruleset lookup, batch apply and
//!   remove, multi-zone coordination and post-apply verification.
//! - [`cloudflare`] is the remote rulesets API boundary.
//! - [`server`] exposes the JSON endpoints the operator UI talks to.

pub mod cloudflare;
pub mod config;
pub mod credential;
pub mod error;
pub mod model;
pub mod provision;
pub mod server;
pub mod telemetry;

pub use credential::{ApiToken, CredentialResolver};
pub use error::{ProvisionError, TransportError};
pub use provision::Provisioner;
