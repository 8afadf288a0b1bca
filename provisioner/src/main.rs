//! WAF Provisioner: custom firewall rule provisioning service
//!
//! Serves the add/list/delete rule endpoints and forwards each rule, one at
//! a time, to the Cloudflare rulesets API.

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{info, warn};

use waf_provisioner::cloudflare::CloudflareClient;
use waf_provisioner::{config, server, telemetry, CredentialResolver, Provisioner};

#[tokio::main]
async fn main() -> Result<()> {
    let config = config::load_config()?;
    telemetry::init_logging(&config.logging)?;

    info!("WAF provisioner v{} starting...", env!("CARGO_PKG_VERSION"));
    info!("Cloudflare API base: {}", config.cloudflare.api_base);

    let credentials = CredentialResolver::new(config.configured_token());
    if credentials.has_configured_token() {
        info!("Using configured API token as fallback credential");
    } else {
        warn!("No CF_API_TOKEN configured; every request must supply apiToken");
    }

    let client =
        CloudflareClient::new(&config.cloudflare).context("Failed to build Cloudflare client")?;
    let provisioner = Arc::new(Provisioner::new(Arc::new(client), credentials));

    server::serve(&config.server.listen, provisioner).await
}
