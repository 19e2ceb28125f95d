//! Time-windowed fetch cache.
//!
//! This module provides:
//! - Clock abstraction for freshness checks
//! - Entry store holding the last good value per key
//! - Per-kind freshness windows and producer timeout configuration
//! - The fetch coordinator with single-flight coalescing and fallback chains

mod clock;
mod config;
mod coordinator;
mod inflight;
mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{
    CacheConfig, FreshnessWindows, ENV_CURRENT_TTL_SECS, ENV_HISTORICAL_TTL_SECS,
    ENV_PRODUCER_TIMEOUT_MS,
};
pub use coordinator::FetchCoordinator;
pub use store::{CacheEntry, EntryStore};
