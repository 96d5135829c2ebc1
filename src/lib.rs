// Storefront API client library.
// Retry with backoff, a TTL response cache and per-call cancellation over the bakery REST API.

pub mod api;
pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod state;

pub use api::{ApiClient, CancelToken, GetOptions, MutationOptions, Params};
pub use cache::ResponseCache;
pub use config::ClientConfig;
pub use error::{ApiError, Result};
