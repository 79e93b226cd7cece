//! Gateway configuration.
//!
//! Loaded from a JSON file plus environment variable overrides, following
//! the file-defaults -> env-override -> validation layering the surrounding
//! tooling uses elsewhere in this codebase. CLI flag parsing and templated
//! config generation live outside this crate; this module owns the
//! struct/validate/env-override logic itself.

use crate::error::{GatewayError, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;

const PLACEHOLDER_MARKERS: &[&str] = &["your-tenant", "YOUR_AUTH_KEY", "YOUR_AUTH_SECRET", "YOUR_TENANT_ID"];

/// Top-level gateway configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayConfig {
    pub opsramp: OpsRampConfig,

    /// HTTP listen port. Defaults to 8080; overridden by `PORT`.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Debug mode: lax session acceptance + verbose logging.
    #[serde(default)]
    pub debug: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpsRampConfig {
    pub tenant_url: String,
    pub auth_url: String,
    pub auth_key: String,
    pub auth_secret: String,
    pub tenant_id: String,

    #[serde(default)]
    pub resources: ResourcesConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourcesConfig {
    #[serde(default = "default_page_size")]
    pub default_page_size: u32,
    #[serde(default = "default_max_page_size")]
    pub max_page_size: u32,
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl: u32,
    #[serde(default = "default_request_timeout")]
    pub request_timeout: u64,
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,
    #[serde(default = "default_retry_delay")]
    pub retry_delay: u64,
}

impl Default for ResourcesConfig {
    fn default() -> Self {
        Self {
            default_page_size: default_page_size(),
            max_page_size: default_max_page_size(),
            cache_ttl: default_cache_ttl(),
            request_timeout: default_request_timeout(),
            retry_attempts: default_retry_attempts(),
            retry_delay: default_retry_delay(),
        }
    }
}

fn default_port() -> u16 {
    8080
}
fn default_page_size() -> u32 {
    50
}
fn default_max_page_size() -> u32 {
    1000
}
fn default_cache_ttl() -> u32 {
    300
}
fn default_request_timeout() -> u64 {
    30
}
fn default_retry_attempts() -> u32 {
    3
}
fn default_retry_delay() -> u64 {
    1000
}

impl GatewayConfig {
    /// Load configuration from a JSON file, apply environment overrides,
    /// then validate. Mirrors the load -> inject-env -> validate pipeline
    /// used for registry configuration elsewhere in this codebase.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .map_err(|e| GatewayError::config(format!("failed to read config file {}: {e}", path.display())))?;
        let mut config: GatewayConfig = serde_json::from_str(&raw)
            .map_err(|e| GatewayError::config(format!("failed to parse config file {}: {e}", path.display())))?;
        config.inject_env_vars();
        config.validate()?;
        Ok(config)
    }

    /// Build configuration purely from environment variables, for
    /// deployments that don't ship a config file.
    pub fn from_env() -> Result<Self> {
        let mut config = GatewayConfig {
            opsramp: OpsRampConfig {
                tenant_url: String::new(),
                auth_url: String::new(),
                auth_key: String::new(),
                auth_secret: String::new(),
                tenant_id: String::new(),
                resources: ResourcesConfig::default(),
            },
            port: default_port(),
            debug: false,
        };
        config.inject_env_vars();
        config.validate()?;
        Ok(config)
    }

    fn inject_env_vars(&mut self) {
        if let Ok(v) = env::var("OPSRAMP_TENANT_URL") {
            self.opsramp.tenant_url = v;
        }
        if let Ok(v) = env::var("OPSRAMP_AUTH_URL") {
            self.opsramp.auth_url = v;
        }
        if let Ok(v) = env::var("OPSRAMP_AUTH_KEY") {
            self.opsramp.auth_key = v;
        }
        if let Ok(v) = env::var("OPSRAMP_AUTH_SECRET") {
            self.opsramp.auth_secret = v;
        }
        if let Ok(v) = env::var("OPSRAMP_TENANT_ID") {
            self.opsramp.tenant_id = v;
        }
        if let Ok(v) = env::var("PORT") {
            if let Ok(port) = v.parse() {
                self.port = port;
            }
        }
        if let Ok(v) = env::var("DEBUG") {
            self.debug = v.eq_ignore_ascii_case("true") || v == "1";
        }
    }

    /// Reject missing required fields and leftover placeholder values
    fn validate(&self) -> Result<()> {
        let required = [
            ("opsramp.tenant_url", &self.opsramp.tenant_url),
            ("opsramp.auth_url", &self.opsramp.auth_url),
            ("opsramp.auth_key", &self.opsramp.auth_key),
            ("opsramp.auth_secret", &self.opsramp.auth_secret),
            ("opsramp.tenant_id", &self.opsramp.tenant_id),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(GatewayError::config(format!("{field} is required")));
            }
            for marker in PLACEHOLDER_MARKERS {
                if value.contains(marker) {
                    return Err(GatewayError::config(format!(
                        "{field} still contains placeholder value '{marker}'; set a real value"
                    )));
                }
            }
        }
        Ok(())
    }
}
