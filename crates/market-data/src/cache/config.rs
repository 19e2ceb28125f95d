//! Cache configuration.
//!
//! Freshness windows are set once per data kind at startup and stay constant
//! for the lifetime of the coordinator.

use std::time::Duration;

use log::warn;

use crate::models::DataKind;

/// Default freshness window for latest prices.
const DEFAULT_CURRENT_WINDOW: Duration = Duration::from_secs(60);

/// Default freshness window for historical series.
const DEFAULT_HISTORICAL_WINDOW: Duration = Duration::from_secs(300);

/// Default time budget for a single producer attempt.
const DEFAULT_PRODUCER_TIMEOUT: Duration = Duration::from_secs(10);

pub const ENV_CURRENT_TTL_SECS: &str = "TRACKER_CURRENT_TTL_SECS";
pub const ENV_HISTORICAL_TTL_SECS: &str = "TRACKER_HISTORICAL_TTL_SECS";
pub const ENV_PRODUCER_TIMEOUT_MS: &str = "TRACKER_PRODUCER_TIMEOUT_MS";

/// Maximum age at which an entry is served without refetching, per data kind.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FreshnessWindows {
    pub current: Duration,
    pub historical: Duration,
}

impl FreshnessWindows {
    pub fn window_for(&self, kind: DataKind) -> Duration {
        match kind {
            DataKind::Current => self.current,
            DataKind::Historical => self.historical,
        }
    }

    /// Strict comparison: an entry exactly `window` old is stale.
    pub fn is_fresh(&self, kind: DataKind, age: Duration) -> bool {
        age < self.window_for(kind)
    }
}

impl Default for FreshnessWindows {
    fn default() -> Self {
        Self {
            current: DEFAULT_CURRENT_WINDOW,
            historical: DEFAULT_HISTORICAL_WINDOW,
        }
    }
}

/// Fetch coordinator configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CacheConfig {
    pub windows: FreshnessWindows,
    /// Budget for each producer attempt. `None` leaves timing to the producer.
    pub producer_timeout: Option<Duration>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            windows: FreshnessWindows::default(),
            producer_timeout: Some(DEFAULT_PRODUCER_TIMEOUT),
        }
    }
}

impl CacheConfig {
    /// Read the configuration from `TRACKER_*` environment variables.
    ///
    /// Missing or unparsable values keep their defaults. A producer timeout
    /// of `0` disables the coordinator-side timeout.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let current = read_u64(&lookup, ENV_CURRENT_TTL_SECS)
            .map(Duration::from_secs)
            .unwrap_or(defaults.windows.current);
        let historical = read_u64(&lookup, ENV_HISTORICAL_TTL_SECS)
            .map(Duration::from_secs)
            .unwrap_or(defaults.windows.historical);
        let producer_timeout = match read_u64(&lookup, ENV_PRODUCER_TIMEOUT_MS) {
            Some(0) => None,
            Some(ms) => Some(Duration::from_millis(ms)),
            None => defaults.producer_timeout,
        };

        Self {
            windows: FreshnessWindows {
                current,
                historical,
            },
            producer_timeout,
        }
    }

    pub fn with_windows(mut self, current: Duration, historical: Duration) -> Self {
        self.windows = FreshnessWindows {
            current,
            historical,
        };
        self
    }

    pub fn with_producer_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.producer_timeout = timeout;
        self
    }
}

fn read_u64(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Option<u64> {
    let raw = lookup(name)?;
    match raw.trim().parse::<u64>() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!("Ignoring invalid {}={:?}, using default", name, raw);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = CacheConfig::default();
        assert_eq!(config.windows.current, Duration::from_secs(60));
        assert_eq!(config.windows.historical, Duration::from_secs(300));
        assert_eq!(config.producer_timeout, Some(Duration::from_secs(10)));
    }

    #[test]
    fn test_window_boundary_is_stale() {
        let windows = FreshnessWindows::default();
        assert!(windows.is_fresh(DataKind::Current, Duration::from_secs(59)));
        assert!(!windows.is_fresh(DataKind::Current, Duration::from_secs(60)));
        assert!(windows.is_fresh(DataKind::Historical, Duration::from_secs(299)));
        assert!(!windows.is_fresh(DataKind::Historical, Duration::from_secs(300)));
    }

    #[test]
    fn test_from_lookup_overrides() {
        let config = CacheConfig::from_lookup(lookup_from(&[
            (ENV_CURRENT_TTL_SECS, "30"),
            (ENV_HISTORICAL_TTL_SECS, "600"),
            (ENV_PRODUCER_TIMEOUT_MS, "2500"),
        ]));
        assert_eq!(config.windows.current, Duration::from_secs(30));
        assert_eq!(config.windows.historical, Duration::from_secs(600));
        assert_eq!(config.producer_timeout, Some(Duration::from_millis(2500)));
    }

    #[test]
    fn test_from_lookup_invalid_falls_back() {
        let config = CacheConfig::from_lookup(lookup_from(&[(ENV_CURRENT_TTL_SECS, "soon")]));
        assert_eq!(config.windows.current, Duration::from_secs(60));
    }

    #[test]
    fn test_zero_timeout_disables() {
        let config = CacheConfig::from_lookup(lookup_from(&[(ENV_PRODUCER_TIMEOUT_MS, "0")]));
        assert_eq!(config.producer_timeout, None);
    }
}
