//! Provisioner configuration loading and parsing

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::credential::ApiToken;

const DEFAULT_CONFIG_PATH: &str = "/etc/waf-provisioner/config.toml";
const CONFIG_PATH_ENV: &str = "WAF_PROVISIONER_CONFIG";
const TOKEN_ENV: &str = "CF_API_TOKEN";

/// Root configuration structure
#[derive(Debug, Default, Deserialize)]
pub struct ProvisionerConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub cloudflare: CloudflareConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_listen")]
    pub listen: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CloudflareConfig {
    #[serde(default = "default_api_base")]
    pub api_base: String,
    /// Fallback token used when a request does not carry its own.
    #[serde(default)]
    pub api_token: Option<String>,
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

impl Default for CloudflareConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            api_token: None,
            timeout_seconds: default_timeout(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Emit JSON lines instead of the compact human format
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

// Default value functions
fn default_listen() -> String { "0.0.0.0:8787".into() }
fn default_api_base() -> String { "https://api.cloudflare.com/client/v4".into() }
fn default_timeout() -> u64 { 30 }
fn default_log_level() -> String { "info".into() }

impl ProvisionerConfig {
    /// Process-wide fallback token, if one is configured.
    pub fn configured_token(&self) -> Option<ApiToken> {
        self.cloudflare.api_token.clone().and_then(ApiToken::new)
    }

    /// `CF_API_TOKEN` takes precedence over the file; empty values are ignored.
    pub fn apply_env_overrides(&mut self, token_from_env: Option<String>) {
        if let Some(token) = token_from_env.filter(|t| !t.trim().is_empty()) {
            self.cloudflare.api_token = Some(token);
        }
    }
}

/// Parse a config file from disk
pub fn load_from_path(path: &Path) -> Result<ProvisionerConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config from {}", path.display()))?;
    let config: ProvisionerConfig = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config from {}", path.display()))?;
    Ok(config)
}

/// Load configuration from `$WAF_PROVISIONER_CONFIG` or the default path,
/// then apply environment overrides.
pub fn load_config() -> Result<ProvisionerConfig> {
    let config_path =
        std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());

    let mut config = if Path::new(&config_path).exists() {
        load_from_path(Path::new(&config_path))?
    } else {
        tracing::warn!("Config file not found at {config_path}, using defaults");
        ProvisionerConfig::default()
    };

    config.apply_env_overrides(std::env::var(TOKEN_ENV).ok());
    Ok(config)
}
