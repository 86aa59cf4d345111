//! Provider configuration.
//!
//! [`ProviderConfig`] deserializes from whatever the orchestration layer hands over (every field
//! has a default) and can also be read from `WEBFLOW_*` environment variables.

use crate::framework::transport::{DEFAULT_BASE_URL, TOKEN_ENV_VAR};
use crate::framework::{ReconcileError, RetryPolicy, TransportConfig};
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

pub const BASE_URL_ENV_VAR: &str = "WEBFLOW_BASE_URL";
pub const TIMEOUT_ENV_VAR: &str = "WEBFLOW_TIMEOUT_SECS";
pub const MAX_ATTEMPTS_ENV_VAR: &str = "WEBFLOW_MAX_ATTEMPTS";

#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Explicit token; `WEBFLOW_API_TOKEN` is used when unset.
    pub api_token: Option<String>,
    pub base_url: String,
    pub timeout_secs: u64,
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub https_only: bool,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_token: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: 30,
            max_attempts: 4,
            base_delay_ms: 1_000,
            max_delay_ms: 30_000,
            https_only: true,
        }
    }
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_token", &self.api_token.as_ref().map(|_| "[REDACTED]"))
            .field("base_url", &self.base_url)
            .field("timeout_secs", &self.timeout_secs)
            .field("max_attempts", &self.max_attempts)
            .field("base_delay_ms", &self.base_delay_ms)
            .field("max_delay_ms", &self.max_delay_ms)
            .field("https_only", &self.https_only)
            .finish()
    }
}

fn parse_var<T: FromStr>(name: &'static str, raw: &str) -> Result<T, ReconcileError> {
    raw.trim().parse().map_err(|_| ReconcileError::Config {
        code: "WEBFLOW_CONFIG_003",
        detail: format!("{name}='{raw}' is not a valid number"),
        remedy: format!("set {name} to a positive integer or unset it to use the default"),
    })
}

impl ProviderConfig {
    /// Defaults overridden by `WEBFLOW_API_TOKEN`, `WEBFLOW_BASE_URL`, `WEBFLOW_TIMEOUT_SECS`
    /// and `WEBFLOW_MAX_ATTEMPTS`.
    pub fn from_env() -> Result<Self, ReconcileError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Like [`ProviderConfig::from_env`] with a caller-supplied variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ReconcileError> {
        let mut config = Self {
            api_token: lookup(TOKEN_ENV_VAR),
            ..Self::default()
        };
        if let Some(url) = lookup(BASE_URL_ENV_VAR) {
            config.base_url = url;
        }
        if let Some(raw) = lookup(TIMEOUT_ENV_VAR) {
            config.timeout_secs = parse_var(TIMEOUT_ENV_VAR, &raw)?;
        }
        if let Some(raw) = lookup(MAX_ATTEMPTS_ENV_VAR) {
            config.max_attempts = parse_var(MAX_ATTEMPTS_ENV_VAR, &raw)?;
        }
        Ok(config)
    }

    pub fn transport_config(&self) -> TransportConfig {
        TransportConfig {
            base_url: self.base_url.clone(),
            timeout: Duration::from_secs(self.timeout_secs),
            https_only: self.https_only,
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts.max(1),
            base_delay: Duration::from_millis(self.base_delay_ms),
            max_delay: Duration::from_millis(self.max_delay_ms),
        }
    }
}
