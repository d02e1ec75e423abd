//! Provider and HTTP client configuration

use serde_json::{Map, Value};
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_ENDPOINT: &str = "https://api.metanetworks.com";

pub const ENV_API_KEY: &str = "METANETWORKS_API_KEY";
pub const ENV_API_SECRET: &str = "METANETWORKS_API_SECRET";
pub const ENV_ORG: &str = "METANETWORKS_ORG";
pub const ENV_ENDPOINT: &str = "METANETWORKS_ENDPOINT";

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{attribute} is required (set in provider config or {env} env var)")]
    Missing {
        attribute: &'static str,
        env: &'static str,
    },

    #[error("endpoint is not a valid URL: {0}")]
    InvalidEndpoint(String),
}

/// Credentials for the OAuth client-credentials grant
#[derive(Clone)]
pub struct Credentials {
    pub api_key: String,
    pub api_secret: String,
    pub org: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &self.api_key)
            .field("api_secret", &"<redacted>")
            .field("org", &self.org)
            .finish()
    }
}

/// Transport tuning for [`crate::api::Client`]
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
    pub idle_timeout: Duration,
    pub max_idle_connections: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff_ms: 100,
            max_backoff_ms: 10_000,
            request_timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            idle_timeout: Duration::from_secs(90),
            max_idle_connections: 10,
        }
    }
}

impl ClientConfig {
    pub(crate) fn backoff(&self, attempt: u32) -> Duration {
        let exp = self
            .initial_backoff_ms
            .saturating_mul(2_u64.saturating_pow(attempt.saturating_sub(1)));
        Duration::from_millis(exp.min(self.max_backoff_ms))
    }

    pub(crate) fn build_http_client(&self) -> Result<reqwest::Client, reqwest::Error> {
        reqwest::Client::builder()
            .timeout(self.request_timeout)
            .connect_timeout(self.connect_timeout)
            .pool_idle_timeout(self.idle_timeout)
            .pool_max_idle_per_host(self.max_idle_connections)
            .build()
    }
}

/// Resolved provider configuration
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub endpoint: String,
    pub credentials: Credentials,
}

impl ProviderConfig {
    /// Resolve the provider block, falling back to environment variables for
    /// anything not set in config. Every problem is reported, not just the first.
    pub fn resolve(values: &Map<String, Value>) -> Result<Self, Vec<ConfigError>> {
        let mut errors = Vec::new();

        let api_key = lookup(values, "api_key", ENV_API_KEY);
        let api_secret = lookup(values, "api_secret", ENV_API_SECRET);
        let org = lookup(values, "org", ENV_ORG);
        let endpoint = lookup(values, "endpoint", ENV_ENDPOINT)
            .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());

        if let Err(e) = url::Url::parse(&endpoint) {
            errors.push(ConfigError::InvalidEndpoint(format!("{}: {}", endpoint, e)));
        }
        if api_key.is_none() {
            errors.push(ConfigError::Missing {
                attribute: "api_key",
                env: ENV_API_KEY,
            });
        }
        if api_secret.is_none() {
            errors.push(ConfigError::Missing {
                attribute: "api_secret",
                env: ENV_API_SECRET,
            });
        }
        if org.is_none() {
            errors.push(ConfigError::Missing {
                attribute: "org",
                env: ENV_ORG,
            });
        }

        match (api_key, api_secret, org) {
            (Some(api_key), Some(api_secret), Some(org)) if errors.is_empty() => Ok(Self {
                endpoint,
                credentials: Credentials {
                    api_key,
                    api_secret,
                    org,
                },
            }),
            _ => Err(errors),
        }
    }
}

fn lookup(values: &Map<String, Value>, attribute: &str, env: &str) -> Option<String> {
    values
        .get(attribute)
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .or_else(|| std::env::var(env).ok().filter(|s| !s.is_empty()))
}
