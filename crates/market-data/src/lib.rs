//! Tracker Market Data Crate
//!
//! This crate provides a time-windowed, key-scoped cache in front of slow,
//! rate-limited market data sources.
//!
//! # Overview
//!
//! The market data crate supports:
//! - Per-kind freshness windows (current quotes vs historical series)
//! - Single-flight fetches: concurrent callers for one key share one fetch
//! - Ordered fallback producers, with empty results treated as failures
//! - Stale entries kept for inspection when a refresh fails
//!
//! # Architecture
//!
//! ```text
//! +------------------+
//! |     Service      |  (current price, history, summary, lookup)
//! +------------------+
//!          |
//!          v
//! +------------------+     +------------------+
//! | FetchCoordinator | --> |   EntryStore     |  (last good value per key)
//! +------------------+     +------------------+
//!          |
//!          v
//! +------------------+
//! |  ProducerChain   |  (primary, then fallbacks)
//! +------------------+
//!          |
//!          v
//! +------------------+
//! |    Producer      |  (Yahoo chart, Yahoo history, closures)
//! +------------------+
//! ```
//!
//! # Core Types
//!
//! - [`CacheKey`] - Symbol, data kind and optional history range
//! - [`FetchCoordinator`] - Freshness check, coalescing and fallback chain
//! - [`Producer`] - One way of fetching a value for a key
//! - [`FetchError`] - Producer failures and the terminal exhaustion error
//! - [`MarketData`] - Current quote or historical bars
//!
//! # Example
//!
//! ```no_run
//! use tracker_market_data::{
//!     CacheConfig, MarketDataService, MarketDataServiceTrait, YahooProvider,
//! };
//!
//! # async fn run() -> Result<(), tracker_market_data::FetchError> {
//! let chain = YahooProvider::new()?.into_chain();
//! let service = MarketDataService::with_config(CacheConfig::default(), chain);
//!
//! let quote = service.current_price("AAPL").await?;
//! println!("AAPL {} ({}%)", quote.price, quote.change_percent.round_dp(2));
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod errors;
pub mod models;
pub mod provider;
pub mod service;

// Re-export cache types
pub use cache::{
    CacheConfig, CacheEntry, Clock, EntryStore, FetchCoordinator, FreshnessWindows, ManualClock,
    SystemClock,
};

// Re-export error types
pub use errors::{FetchAttempt, FetchError};

// Re-export all public types from models
pub use models::{
    normalize_symbol, Bar, CacheKey, Cacheable, Currency, CurrentQuote, DataKind, HistoryRange,
    MarketData, PerformanceMetrics, Symbol,
};

// Re-export provider types
pub use provider::yahoo::{ChartProducer, HistoryProducer, YahooProvider};
pub use provider::{
    producer_fn, FnProducer, Producer, ProducerChain, RateLimitConfig, RateLimiter,
};

// Re-export service types
pub use service::{MarketDataService, MarketDataServiceTrait, SummaryRow, SymbolLookup};
