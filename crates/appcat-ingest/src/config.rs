//! Ingestion configuration
//!
//! Everything the clients and the driver need is carried in an explicit
//! [`IngestConfig`] value; nothing reads endpoints from globals.

use appcat_common::{CatalogError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

// ============================================================================
// Defaults
// ============================================================================

/// Catalog service base URL when `APPCAT_API_URL` is not set
pub const DEFAULT_API_URL: &str = "http://127.0.0.1:10003";

/// Resource segment of the lookup endpoint
pub const DEFAULT_LOOKUP_RESOURCE: &str = "apps";

/// Attribution used when a record names no contributor
pub const DEFAULT_USER: &str = "appcat-ingest";

pub const DEFAULT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_CONCURRENCY: usize = 1;
pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_RETRY_BASE_MS: u64 = 500;

/// Upper bound on in-flight requests, whatever the operator asks for
pub const MAX_CONCURRENCY: usize = 64;

/// Catalog client and driver settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Base URL of the catalog service
    pub api_url: String,
    /// Resource segment in `/api/{resource}/pkg_name/{id}`
    pub lookup_resource: String,
    /// Fallback `comment.user`
    pub default_user: String,
    /// Per-request timeout
    pub timeout_secs: u64,
    /// Maximum items in flight
    pub concurrency: usize,
    /// Minimum delay between two dispatches (0 = unthrottled)
    pub min_interval_ms: u64,
    /// Retries for transient lookup errors
    pub max_retries: u32,
    /// First backoff delay; doubles on every further attempt
    pub retry_base_ms: u64,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            lookup_resource: DEFAULT_LOOKUP_RESOURCE.to_string(),
            default_user: DEFAULT_USER.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            concurrency: DEFAULT_CONCURRENCY,
            min_interval_ms: 0,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_base_ms: DEFAULT_RETRY_BASE_MS,
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Result<Option<T>> {
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| CatalogError::config(format!("{key} has an invalid value: '{raw}'"))),
        Err(_) => Ok(None),
    }
}

impl IngestConfig {
    /// Load from `APPCAT_*` environment variables on top of the defaults
    ///
    /// - `APPCAT_API_URL`
    /// - `APPCAT_LOOKUP_RESOURCE`
    /// - `APPCAT_DEFAULT_USER`
    /// - `APPCAT_TIMEOUT_SECS`
    /// - `APPCAT_CONCURRENCY`
    /// - `APPCAT_MIN_INTERVAL_MS`
    /// - `APPCAT_MAX_RETRIES`
    /// - `APPCAT_RETRY_BASE_MS`
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(url) = std::env::var("APPCAT_API_URL") {
            config.api_url = url;
        }
        if let Ok(resource) = std::env::var("APPCAT_LOOKUP_RESOURCE") {
            config.lookup_resource = resource;
        }
        if let Ok(user) = std::env::var("APPCAT_DEFAULT_USER") {
            config.default_user = user;
        }
        if let Some(v) = env_parse("APPCAT_TIMEOUT_SECS")? {
            config.timeout_secs = v;
        }
        if let Some(v) = env_parse("APPCAT_CONCURRENCY")? {
            config.concurrency = v;
        }
        if let Some(v) = env_parse("APPCAT_MIN_INTERVAL_MS")? {
            config.min_interval_ms = v;
        }
        if let Some(v) = env_parse("APPCAT_MAX_RETRIES")? {
            config.max_retries = v;
        }
        if let Some(v) = env_parse("APPCAT_RETRY_BASE_MS")? {
            config.retry_base_ms = v;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.api_url.starts_with("http://") || self.api_url.starts_with("https://")) {
            return Err(CatalogError::config(format!(
                "API URL must start with http:// or https://, got '{}'",
                self.api_url
            )));
        }
        if self.lookup_resource.is_empty() || self.lookup_resource.contains('/') {
            return Err(CatalogError::config(format!(
                "lookup resource must be a single path segment, got '{}'",
                self.lookup_resource
            )));
        }
        if self.default_user.trim().is_empty() {
            return Err(CatalogError::config("default user cannot be empty"));
        }
        if self.timeout_secs == 0 {
            return Err(CatalogError::config("timeout must be greater than 0"));
        }
        if self.concurrency == 0 || self.concurrency > MAX_CONCURRENCY {
            return Err(CatalogError::config(format!(
                "concurrency must be between 1 and {MAX_CONCURRENCY}, got {}",
                self.concurrency
            )));
        }
        Ok(())
    }

    /// Base URL without a trailing slash
    pub fn base_url(&self) -> &str {
        self.api_url.trim_end_matches('/')
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn min_interval(&self) -> Option<Duration> {
        (self.min_interval_ms > 0).then(|| Duration::from_millis(self.min_interval_ms))
    }

    /// Delay before the first retry; later retries double it
    pub fn retry_base(&self) -> Duration {
        Duration::from_millis(self.retry_base_ms)
    }
}
