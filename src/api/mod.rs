// Storefront API module.
// Resilient client, transport and types for the bakery REST backend.

pub mod cancel;
pub mod client;
pub mod endpoints;
pub mod params;
pub mod retry;
pub mod transport;
pub mod types;

pub use cancel::{CancelToken, LatestRequest};
pub use client::{ApiClient, GET_MAX_RETRIES, GetOptions, MUTATION_MAX_RETRIES, MutationOptions};
pub use endpoints::{PRICE_CEILING, ProductQuery, SEARCH_PAGE_SIZE};
pub use params::{ParamValue, Params};
pub use retry::{OnRetry, RetryEvent, RetryPolicy, RetryPredicate, retry_with_backoff};
pub use transport::{ApiRequest, ApiResponse, AuthToken, HttpTransport, Method, Transport};
pub use types::*;
