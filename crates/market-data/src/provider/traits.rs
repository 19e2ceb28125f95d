//! Producer trait definitions.
//!
//! A producer performs one attempt at an external fetch for a key. The
//! coordinator calls producers in chain order until one of them yields a
//! usable value.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use crate::errors::FetchError;
use crate::models::CacheKey;

/// A single-attempt data fetch for a cache key.
///
/// Implementations should not retry internally; retrying is the job of the
/// fallback chain (within one resolve) and of the caller's polling loop
/// (across resolves).
///
/// # Example
///
/// ```ignore
/// use async_trait::async_trait;
/// use tracker_market_data::{CacheKey, FetchError, MarketData, Producer};
///
/// struct StaticQuote;
///
/// #[async_trait]
/// impl Producer<MarketData> for StaticQuote {
///     fn name(&self) -> &str {
///         "STATIC"
///     }
///
///     async fn produce(&self, key: &CacheKey) -> Result<MarketData, FetchError> {
///         Err(FetchError::empty(self.name()))
///     }
/// }
/// ```
#[async_trait]
pub trait Producer<V>: Send + Sync {
    /// Identifier used in logs and attempt records (e.g. "YAHOO_CHART").
    fn name(&self) -> &str;

    /// Fetch the value for `key`.
    ///
    /// An `Ok` value that is not [usable](crate::models::Cacheable::is_usable)
    /// is treated by the coordinator exactly like an `EmptyResult` error.
    async fn produce(&self, key: &CacheKey) -> Result<V, FetchError>;
}

/// Adapts an async closure into a [`Producer`].
pub struct FnProducer<F> {
    name: String,
    f: F,
}

impl<F> FnProducer<F> {
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }
}

#[async_trait]
impl<V, F, Fut> Producer<V> for FnProducer<F>
where
    V: Send + 'static,
    F: Fn(CacheKey) -> Fut + Send + Sync,
    Fut: Future<Output = Result<V, FetchError>> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn produce(&self, key: &CacheKey) -> Result<V, FetchError> {
        (self.f)(key.clone()).await
    }
}

/// Build a shared producer from an async closure.
pub fn producer_fn<V, F, Fut>(name: impl Into<String>, f: F) -> Arc<dyn Producer<V>>
where
    V: Send + 'static,
    F: Fn(CacheKey) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<V, FetchError>> + Send + 'static,
{
    Arc::new(FnProducer::new(name, f))
}
