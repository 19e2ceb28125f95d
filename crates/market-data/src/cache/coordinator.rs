//! Fetch coordinator: freshness check -> coalesced fallback chain -> store.
//!
//! The coordinator is the only component callers talk to. It owns the entry
//! store and the in-flight registry, and is meant to be constructed once at
//! startup and shared (`Arc`) by every caller that needs market data.

use std::iter;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};

use super::clock::{Clock, SystemClock};
use super::config::CacheConfig;
use super::inflight::{InflightRegistry, Joined};
use super::store::EntryStore;
use crate::errors::{FetchAttempt, FetchError};
use crate::models::{CacheKey, Cacheable};
use crate::provider::{Producer, ProducerChain};

/// Time-windowed, key-scoped cache with coalesced, fallback-aware fetches.
pub struct FetchCoordinator<V> {
    store: EntryStore<V>,
    inflight: InflightRegistry<V>,
    clock: Arc<dyn Clock>,
    config: CacheConfig,
}

impl<V: Cacheable> FetchCoordinator<V> {
    /// Create a coordinator on the system clock.
    pub fn new(config: CacheConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Create a coordinator on a custom clock.
    pub fn with_clock(config: CacheConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            store: EntryStore::new(),
            inflight: InflightRegistry::new(),
            clock,
            config,
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Resolve `key` to a value.
    ///
    /// 1. A fresh entry is returned as-is, without calling any producer.
    /// 2. Otherwise, if a fetch for `key` is already running, wait for its
    ///    outcome instead of starting another one.
    /// 3. Otherwise try `producer`, then each of `fallbacks` in order,
    ///    stopping at the first usable value. Failures, timeouts and
    ///    unusable (empty) values move on to the next producer.
    /// 4. The first usable value is stored with the current time and returned.
    /// 5. If every producer fails, nothing is stored (a stale entry, if any,
    ///    is left untouched) and `AllProducersExhausted` is returned.
    ///
    /// Callers waiting on another caller's fetch get the same outcome, error
    /// included; their own producers are not invoked.
    pub async fn resolve(
        &self,
        key: &CacheKey,
        producer: &Arc<dyn Producer<V>>,
        fallbacks: &[Arc<dyn Producer<V>>],
    ) -> Result<V, FetchError> {
        loop {
            if let Some(value) = self.fresh_value(key) {
                debug!("Cache hit for {}", key);
                return Ok(value);
            }

            match self.inflight.join_or_lead(key, || self.fresh_value(key)) {
                Joined::Ready(value) => {
                    debug!("Cache hit for {} after concurrent refresh", key);
                    return Ok(value);
                }
                Joined::Leader(guard) => {
                    debug!("Cache miss for {}, fetching", key);
                    let outcome = self.fetch_chain(key, producer, fallbacks).await;

                    if let Ok(value) = &outcome {
                        self.store.put(key.clone(), value.clone(), self.clock.now());
                    }

                    let outcome = Arc::new(outcome);
                    guard.publish(Arc::clone(&outcome));
                    return (*outcome).clone();
                }
                Joined::Follower(rx) => {
                    debug!("Fetch for {} already in flight, waiting", key);
                    if let Some(outcome) = InflightRegistry::wait(rx).await {
                        return (*outcome).clone();
                    }
                    debug!("In-flight fetch for {} was abandoned, retrying", key);
                }
            }
        }
    }

    /// [`resolve`](Self::resolve) with the producers of a [`ProducerChain`].
    pub async fn resolve_with(
        &self,
        key: &CacheKey,
        chain: &ProducerChain<V>,
    ) -> Result<V, FetchError> {
        self.resolve(key, chain.primary(), chain.fallbacks()).await
    }

    /// Read the cached value for `key` and its age, fresh or not.
    ///
    /// Never triggers a fetch. Lets a caller show "data is N seconds old" or
    /// decide to display a stale value after a failed resolve.
    pub fn peek(&self, key: &CacheKey) -> Option<(V, Duration)> {
        let entry = self.store.get(key)?;
        let age = entry.age(self.clock.now());
        Some((entry.value().clone(), age))
    }

    /// Whether `key` currently has an entry inside its freshness window.
    pub fn is_fresh(&self, key: &CacheKey) -> bool {
        self.fresh_value(key).is_some()
    }

    /// Drop the entry for `key`, forcing the next resolve to fetch.
    pub fn invalidate(&self, key: &CacheKey) {
        if self.store.remove(key).is_some() {
            debug!("Invalidated cache entry for {}", key);
        }
    }

    /// Drop every entry.
    pub fn clear(&self) {
        self.store.clear();
        info!("Market data cache cleared");
    }

    /// Number of stored entries, fresh or stale.
    pub fn entry_count(&self) -> usize {
        self.store.len()
    }

    /// Keys with a stored entry, fresh or stale.
    pub fn keys(&self) -> Vec<CacheKey> {
        self.store.keys()
    }

    /// Number of fetches currently running.
    pub fn inflight_count(&self) -> usize {
        self.inflight.len()
    }

    fn fresh_value(&self, key: &CacheKey) -> Option<V> {
        let entry = self.store.get(key)?;
        let age = entry.age(self.clock.now());
        if self.config.windows.is_fresh(key.kind(), age) {
            Some(entry.value().clone())
        } else {
            None
        }
    }

    async fn fetch_chain(
        &self,
        key: &CacheKey,
        producer: &Arc<dyn Producer<V>>,
        fallbacks: &[Arc<dyn Producer<V>>],
    ) -> Result<V, FetchError> {
        let mut attempts: Vec<FetchAttempt> = Vec::new();

        for producer in iter::once(producer).chain(fallbacks.iter()) {
            match self.attempt(producer.as_ref(), key).await {
                Ok(value) => {
                    if !attempts.is_empty() {
                        info!(
                            "Resolved {} via fallback '{}' after {} failed attempt(s)",
                            key,
                            producer.name(),
                            attempts.len()
                        );
                    }
                    return Ok(value);
                }
                Err(e) => {
                    debug!(
                        "Producer '{}' failed for {}: {}, trying next",
                        producer.name(),
                        key,
                        e
                    );
                    attempts.push(FetchAttempt {
                        producer: producer.name().to_string(),
                        error: e,
                    });
                }
            }
        }

        warn!(
            "All {} producer(s) failed for {}, nothing cached",
            attempts.len(),
            key
        );
        Err(FetchError::AllProducersExhausted {
            key: key.to_string(),
            attempts,
        })
    }

    /// One bounded producer call. Unusable values become `EmptyResult`.
    async fn attempt(&self, producer: &dyn Producer<V>, key: &CacheKey) -> Result<V, FetchError> {
        let result = match self.config.producer_timeout {
            Some(budget) => match tokio::time::timeout(budget, producer.produce(key)).await {
                Ok(result) => result,
                Err(_) => Err(FetchError::Timeout {
                    producer: producer.name().to_string(),
                    budget,
                }),
            },
            None => producer.produce(key).await,
        };

        let value = result?;
        if value.is_usable() {
            Ok(value)
        } else {
            Err(FetchError::empty(producer.name()))
        }
    }
}

impl<V: Cacheable> Default for FetchCoordinator<V> {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ManualClock;
    use crate::models::HistoryRange;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Clone, Debug, PartialEq)]
    struct Price(u32);

    impl Cacheable for Price {}

    struct MockProducer {
        name: &'static str,
        call_count: AtomicUsize,
        response: Option<u32>,
    }

    impl MockProducer {
        fn ok(name: &'static str, price: u32) -> Arc<Self> {
            Arc::new(Self {
                name,
                call_count: AtomicUsize::new(0),
                response: Some(price),
            })
        }

        fn failing(name: &'static str) -> Arc<Self> {
            Arc::new(Self {
                name,
                call_count: AtomicUsize::new(0),
                response: None,
            })
        }

        fn calls(&self) -> usize {
            self.call_count.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Producer<Price> for MockProducer {
        fn name(&self) -> &str {
            self.name
        }

        async fn produce(&self, _key: &CacheKey) -> Result<Price, FetchError> {
            self.call_count.fetch_add(1, Ordering::SeqCst);
            match self.response {
                Some(price) => Ok(Price(price)),
                None => Err(FetchError::producer(self.name, "Mock failure")),
            }
        }
    }

    fn coordinator() -> (FetchCoordinator<Price>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new());
        let coordinator = FetchCoordinator::with_clock(
            CacheConfig::default(),
            Arc::clone(&clock) as Arc<dyn Clock>,
        );
        (coordinator, clock)
    }

    fn dyn_producer(p: &Arc<MockProducer>) -> Arc<dyn Producer<Price>> {
        Arc::clone(p) as Arc<dyn Producer<Price>>
    }

    #[tokio::test]
    async fn test_miss_fetches_and_stores() {
        let (coordinator, _clock) = coordinator();
        let primary = MockProducer::ok("PRIMARY", 150);
        let key = CacheKey::current("AAPL");

        let value = coordinator
            .resolve(&key, &dyn_producer(&primary), &[])
            .await
            .unwrap();

        assert_eq!(value, Price(150));
        assert_eq!(primary.calls(), 1);
        assert_eq!(coordinator.entry_count(), 1);
        assert_eq!(coordinator.inflight_count(), 0);
    }

    #[tokio::test]
    async fn test_hit_within_window_skips_producer() {
        let (coordinator, clock) = coordinator();
        let primary = MockProducer::ok("PRIMARY", 150);
        let key = CacheKey::current("AAPL");

        coordinator
            .resolve(&key, &dyn_producer(&primary), &[])
            .await
            .unwrap();
        clock.advance(Duration::from_secs(59));
        coordinator
            .resolve(&key, &dyn_producer(&primary), &[])
            .await
            .unwrap();

        assert_eq!(primary.calls(), 1);
    }

    #[tokio::test]
    async fn test_exact_window_age_is_stale() {
        let (coordinator, clock) = coordinator();
        let primary = MockProducer::ok("PRIMARY", 150);
        let key = CacheKey::current("AAPL");

        coordinator
            .resolve(&key, &dyn_producer(&primary), &[])
            .await
            .unwrap();
        clock.advance(Duration::from_secs(60));
        coordinator
            .resolve(&key, &dyn_producer(&primary), &[])
            .await
            .unwrap();

        assert_eq!(primary.calls(), 2);
    }

    #[tokio::test]
    async fn test_historical_uses_its_own_window() {
        let (coordinator, clock) = coordinator();
        let primary = MockProducer::ok("PRIMARY", 1);
        let key = CacheKey::historical("AAPL", HistoryRange::OneMonth);

        coordinator
            .resolve(&key, &dyn_producer(&primary), &[])
            .await
            .unwrap();
        clock.advance(Duration::from_secs(299));
        coordinator
            .resolve(&key, &dyn_producer(&primary), &[])
            .await
            .unwrap();
        assert_eq!(primary.calls(), 1);

        clock.advance(Duration::from_secs(1));
        coordinator
            .resolve(&key, &dyn_producer(&primary), &[])
            .await
            .unwrap();
        assert_eq!(primary.calls(), 2);
    }

    #[tokio::test]
    async fn test_fallback_order_and_no_primary_retry() {
        let (coordinator, _clock) = coordinator();
        let primary = MockProducer::failing("PRIMARY");
        let first = MockProducer::ok("FIRST", 10);
        let second = MockProducer::ok("SECOND", 20);
        let key = CacheKey::current("AAPL");

        let value = coordinator
            .resolve(
                &key,
                &dyn_producer(&primary),
                &[dyn_producer(&first), dyn_producer(&second)],
            )
            .await
            .unwrap();

        assert_eq!(value, Price(10));
        assert_eq!(primary.calls(), 1);
        assert_eq!(first.calls(), 1);
        assert_eq!(second.calls(), 0);
        assert_eq!(coordinator.peek(&key).map(|(v, _)| v), Some(Price(10)));
    }

    #[tokio::test]
    async fn test_exhausted_chain_reports_attempts() {
        let (coordinator, _clock) = coordinator();
        let primary = MockProducer::failing("PRIMARY");
        let fallback = MockProducer::failing("FALLBACK");
        let key = CacheKey::current("AAPL");

        let error = coordinator
            .resolve(&key, &dyn_producer(&primary), &[dyn_producer(&fallback)])
            .await
            .unwrap_err();

        match error {
            FetchError::AllProducersExhausted { key: k, attempts } => {
                assert_eq!(k, "current/AAPL");
                let names: Vec<_> = attempts.iter().map(|a| a.producer.as_str()).collect();
                assert_eq!(names, vec!["PRIMARY", "FALLBACK"]);
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(coordinator.entry_count(), 0);
    }

    #[tokio::test]
    async fn test_peek_reports_age_without_fetching() {
        let (coordinator, clock) = coordinator();
        let primary = MockProducer::ok("PRIMARY", 150);
        let key = CacheKey::current("AAPL");

        assert!(coordinator.peek(&key).is_none());

        coordinator
            .resolve(&key, &dyn_producer(&primary), &[])
            .await
            .unwrap();
        clock.advance(Duration::from_secs(90));

        let (value, age) = coordinator.peek(&key).unwrap();
        assert_eq!(value, Price(150));
        assert_eq!(age, Duration::from_secs(90));
        assert!(!coordinator.is_fresh(&key));
        assert_eq!(primary.calls(), 1);
    }

    #[tokio::test]
    async fn test_invalidate_forces_refetch() {
        let (coordinator, _clock) = coordinator();
        let primary = MockProducer::ok("PRIMARY", 150);
        let key = CacheKey::current("AAPL");

        coordinator
            .resolve(&key, &dyn_producer(&primary), &[])
            .await
            .unwrap();
        coordinator.invalidate(&key);
        coordinator
            .resolve(&key, &dyn_producer(&primary), &[])
            .await
            .unwrap();

        assert_eq!(primary.calls(), 2);
    }

    #[tokio::test]
    async fn test_clear_drops_everything() {
        let (coordinator, _clock) = coordinator();
        let primary = MockProducer::ok("PRIMARY", 150);

        for symbol in ["AAPL", "MSFT", "^GSPC"] {
            coordinator
                .resolve(&CacheKey::current(symbol), &dyn_producer(&primary), &[])
                .await
                .unwrap();
        }
        assert_eq!(coordinator.entry_count(), 3);

        coordinator.clear();
        assert_eq!(coordinator.entry_count(), 0);
        assert!(coordinator.keys().is_empty());
    }
}
