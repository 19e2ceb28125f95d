//! Market data models
//!
//! This module contains the core data types for the cache:
//! - `types` - Type aliases for common identifiers (Symbol, Currency)
//! - `key` - Cache key identity (CacheKey) and the DataKind tag
//! - `range` - Historical range labels and their upstream mapping (HistoryRange)
//! - `quote` - Cached values (CurrentQuote, Bar, MarketData) and the Cacheable trait
//! - `metrics` - Performance summary of a bar series (PerformanceMetrics)

mod key;
mod metrics;
mod quote;
mod range;
mod types;

pub use key::{normalize_symbol, CacheKey, DataKind};
pub use metrics::PerformanceMetrics;
pub use quote::{Bar, Cacheable, CurrentQuote, MarketData};
pub use range::HistoryRange;
pub use types::{Currency, Symbol};
