// Resilient API client.
// Cached, retried reads and retried, uncached writes over any Transport.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use crate::cache::{CacheKey, Origin, ResponseCache};
use crate::config::ClientConfig;
use crate::error::Result;

use super::cancel::CancelToken;
use super::params::Params;
use super::retry::{
    DEFAULT_BASE_DELAY, OnRetry, RetryPolicy, RetryPredicate, retry_with_backoff,
};
use super::transport::{ApiRequest, HttpTransport, Method, Transport};

/// Default retry budget for reads.
pub const GET_MAX_RETRIES: u32 = 2;

/// Default retry budget for writes. Kept low: a write retried after an
/// ambiguous failure may be applied twice.
pub const MUTATION_MAX_RETRIES: u32 = 1;

/// Per-call options for reads.
#[derive(Clone, Default)]
pub struct GetOptions {
    /// Skip the cache lookup; the fresh result still replaces the entry.
    pub force_refresh: bool,
    /// Retry budget, [`GET_MAX_RETRIES`] when unset.
    pub max_retries: Option<u32>,
    /// TTL for the stored entry, the cache default when unset.
    pub ttl: Option<Duration>,
    pub on_retry: Option<OnRetry>,
    pub cancel: Option<CancelToken>,
}

impl GetOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn force_refresh(mut self) -> Self {
        self.force_refresh = true;
        self
    }

    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = Some(max_retries);
        self
    }

    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    pub fn on_retry(mut self, on_retry: OnRetry) -> Self {
        self.on_retry = Some(on_retry);
        self
    }

    pub fn cancel(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }
}

impl fmt::Debug for GetOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GetOptions")
            .field("force_refresh", &self.force_refresh)
            .field("max_retries", &self.max_retries)
            .field("ttl", &self.ttl)
            .field("on_retry", &self.on_retry.is_some())
            .field("cancel", &self.cancel)
            .finish()
    }
}

/// Per-call options for writes.
#[derive(Clone, Default)]
pub struct MutationOptions {
    /// Retry budget, [`MUTATION_MAX_RETRIES`] when unset.
    pub max_retries: Option<u32>,
    pub on_retry: Option<OnRetry>,
    pub cancel: Option<CancelToken>,
}

impl MutationOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = Some(max_retries);
        self
    }

    pub fn on_retry(mut self, on_retry: OnRetry) -> Self {
        self.on_retry = Some(on_retry);
        self
    }

    pub fn cancel(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }
}

impl fmt::Debug for MutationOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MutationOptions")
            .field("max_retries", &self.max_retries)
            .field("on_retry", &self.on_retry.is_some())
            .field("cancel", &self.cancel)
            .finish()
    }
}

/// API client with response caching and retry.
///
/// Build one per process and share it; clones of the cache inside share storage.
pub struct ApiClient<T> {
    transport: T,
    cache: ResponseCache,
    base_delay: Duration,
    retry_if: Option<RetryPredicate>,
}

impl ApiClient<HttpTransport> {
    /// Client over HTTP, wired from configuration.
    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        let transport = HttpTransport::from_config(config)?;
        Ok(Self::new(transport, config.build_cache()).with_base_delay(config.retry_base_delay))
    }
}

impl<T: Transport> ApiClient<T> {
    pub fn new(transport: T, cache: ResponseCache) -> Self {
        Self {
            transport,
            cache,
            base_delay: DEFAULT_BASE_DELAY,
            retry_if: None,
        }
    }

    /// Delay before the first retry; each later retry doubles it.
    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    /// Replace the transient-error predicate used for every call.
    pub fn with_retry_predicate(mut self, retry_if: RetryPredicate) -> Self {
        self.retry_if = Some(retry_if);
        self
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    fn policy(&self, max_retries: u32) -> RetryPolicy {
        let policy = RetryPolicy::new(max_retries).with_base_delay(self.base_delay);
        match &self.retry_if {
            Some(retry_if) => policy.with_predicate(Arc::clone(retry_if)),
            None => policy,
        }
    }

    /// Fetch `endpoint`, serving a fresh cached copy when there is one.
    pub async fn get(&self, endpoint: &str, params: &Params, options: GetOptions) -> Result<Value> {
        let (payload, _) = self.get_with_origin(endpoint, params, &options).await?;
        Ok(payload)
    }

    async fn get_with_origin(
        &self,
        endpoint: &str,
        params: &Params,
        options: &GetOptions,
    ) -> Result<(Value, Origin)> {
        let key = CacheKey::new(endpoint, params);
        let policy = self.policy(options.max_retries.unwrap_or(GET_MAX_RETRIES));
        let request = ApiRequest::get(endpoint, params.clone());
        let transport = &self.transport;

        self.cache
            .get_or_fetch(&key, options.force_refresh, options.ttl, || async {
                let response = retry_with_backoff(
                    &policy,
                    options.on_retry.as_ref(),
                    options.cancel.as_ref(),
                    || transport.send(request.clone()),
                )
                .await?;
                Ok(response.data)
            })
            .await
    }

    /// Fetch and decode `endpoint`.
    ///
    /// A cached payload that no longer decodes is dropped and fetched again.
    /// A fresh payload that does not decode is reported and not kept.
    pub async fn get_json<D: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &Params,
        options: GetOptions,
    ) -> Result<D> {
        let (payload, origin) = self.get_with_origin(endpoint, params, &options).await?;

        match serde_json::from_value(payload) {
            Ok(decoded) => Ok(decoded),
            Err(err) if origin == Origin::Cache => {
                warn!(endpoint, error = %err, "cached payload no longer decodes, refetching");
                self.invalidate(endpoint, params);
                let refreshed = GetOptions {
                    force_refresh: true,
                    ..options
                };
                let (payload, _) = self.get_with_origin(endpoint, params, &refreshed).await?;
                Ok(serde_json::from_value(payload)?)
            }
            Err(err) => {
                self.invalidate(endpoint, params);
                Err(err.into())
            }
        }
    }

    /// POST `body` to `endpoint`. Never cached.
    pub async fn post<B: Serialize + ?Sized>(
        &self,
        endpoint: &str,
        body: &B,
        options: MutationOptions,
    ) -> Result<Value> {
        let body = serde_json::to_value(body)?;
        self.mutate(Method::Post, endpoint, Some(body), options).await
    }

    /// PUT `body` to `endpoint`. Never cached.
    pub async fn put<B: Serialize + ?Sized>(
        &self,
        endpoint: &str,
        body: &B,
        options: MutationOptions,
    ) -> Result<Value> {
        let body = serde_json::to_value(body)?;
        self.mutate(Method::Put, endpoint, Some(body), options).await
    }

    /// DELETE `endpoint`. Never cached.
    pub async fn delete(&self, endpoint: &str, options: MutationOptions) -> Result<Value> {
        self.mutate(Method::Delete, endpoint, None, options).await
    }

    /// POST and decode the response.
    pub async fn post_json<B, D>(&self, endpoint: &str, body: &B, options: MutationOptions) -> Result<D>
    where
        B: Serialize + ?Sized,
        D: DeserializeOwned,
    {
        let payload = self.post(endpoint, body, options).await?;
        Ok(serde_json::from_value(payload)?)
    }

    async fn mutate(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<Value>,
        options: MutationOptions,
    ) -> Result<Value> {
        let policy = self.policy(options.max_retries.unwrap_or(MUTATION_MAX_RETRIES));
        let request = ApiRequest::mutation(method, endpoint, body);
        let transport = &self.transport;

        debug!(?method, endpoint, "sending mutation");
        let response = retry_with_backoff(
            &policy,
            options.on_retry.as_ref(),
            options.cancel.as_ref(),
            || transport.send(request.clone()),
        )
        .await?;

        Ok(response.data)
    }

    /// Drop the cached response for exactly this endpoint and parameter set.
    pub fn invalidate(&self, endpoint: &str, params: &Params) {
        self.cache.remove(&CacheKey::new(endpoint, params));
    }

    /// Drop every cached response.
    pub fn clear(&self) {
        self.cache.clear();
    }
}

impl<T> fmt::Debug for ApiClient<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiClient")
            .field("cache", &self.cache)
            .field("base_delay", &self.base_delay)
            .field("custom_retry_predicate", &self.retry_if.is_some())
            .finish_non_exhaustive()
    }
}
