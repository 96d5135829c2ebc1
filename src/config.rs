// Client configuration.
// Read from STOREFRONT_* environment variables, with defaults for everything but the URL.

use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use crate::api::retry::DEFAULT_BASE_DELAY;
use crate::cache::{DEFAULT_TTL, FileStore, ResponseCache};
use crate::error::{ApiError, Result};

pub const ENV_API_URL: &str = "STOREFRONT_API_URL";
pub const ENV_API_TOKEN: &str = "STOREFRONT_API_TOKEN";
pub const ENV_CACHE_TTL_SECS: &str = "STOREFRONT_CACHE_TTL_SECS";
pub const ENV_RETRY_BASE_MS: &str = "STOREFRONT_RETRY_BASE_MS";
pub const ENV_TIMEOUT_SECS: &str = "STOREFRONT_TIMEOUT_SECS";
pub const ENV_CACHE_DIR: &str = "STOREFRONT_CACHE_DIR";

/// Settings needed to build an [`ApiClient`](crate::api::ApiClient).
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// Backend base URL, e.g. `https://shop.example.com/api`.
    pub base_url: String,
    /// Bearer token for admin calls.
    pub token: Option<String>,
    /// Default TTL of cached responses.
    pub cache_ttl: Duration,
    /// Delay before the first retry.
    pub retry_base_delay: Duration,
    /// Whole-request HTTP timeout.
    pub timeout: Option<Duration>,
    /// Directory of the durable cache; in-memory cache when unset.
    pub cache_dir: Option<PathBuf>,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            token: None,
            cache_ttl: DEFAULT_TTL,
            retry_base_delay: DEFAULT_BASE_DELAY,
            timeout: None,
            cache_dir: None,
        }
    }

    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let base_url = get(ENV_API_URL).ok_or(ApiError::MissingConfig(ENV_API_URL))?;
        let mut config = Self::new(base_url.trim());

        config.token = get(ENV_API_TOKEN);
        if let Some(secs) = get(ENV_CACHE_TTL_SECS) {
            config.cache_ttl = Duration::from_secs(parse_number(ENV_CACHE_TTL_SECS, &secs)?);
        }
        if let Some(ms) = get(ENV_RETRY_BASE_MS) {
            let ms: u64 = parse_number(ENV_RETRY_BASE_MS, &ms)?;
            if ms == 0 {
                return Err(ApiError::InvalidConfig(format!(
                    "{} must be greater than zero",
                    ENV_RETRY_BASE_MS
                )));
            }
            config.retry_base_delay = Duration::from_millis(ms);
        }
        if let Some(secs) = get(ENV_TIMEOUT_SECS) {
            config.timeout = Some(Duration::from_secs(parse_number(ENV_TIMEOUT_SECS, &secs)?));
        }
        config.cache_dir = get(ENV_CACHE_DIR).map(PathBuf::from);

        Ok(config)
    }

    /// Build the response cache this configuration describes.
    pub fn build_cache(&self) -> ResponseCache {
        let cache = match &self.cache_dir {
            Some(dir) => ResponseCache::new(Arc::new(FileStore::with_dir(dir))),
            None => ResponseCache::in_memory(),
        };
        cache.with_default_ttl(self.cache_ttl)
    }
}

fn parse_number<N: FromStr>(name: &str, value: &str) -> Result<N> {
    value
        .trim()
        .parse()
        .map_err(|_| ApiError::InvalidConfig(format!("{} is not a valid number: {:?}", name, value)))
}
