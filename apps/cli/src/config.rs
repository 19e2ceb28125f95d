use std::time::Duration;

use tracker_market_data::HistoryRange;

pub const DEFAULT_SYMBOLS: &str = "AAPL,MSFT,GOOGL,^GSPC";
const DEFAULT_REFRESH_SECS: u64 = 30;

pub struct Config {
    pub symbols: Vec<String>,
    pub refresh_interval: Duration,
    pub history_range: Option<HistoryRange>,
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let symbols = parse_symbols(
            &lookup("TRACKER_SYMBOLS").unwrap_or_else(|| DEFAULT_SYMBOLS.to_string()),
        );
        let refresh_secs: u64 = lookup("TRACKER_REFRESH_SECS")
            .and_then(|v| v.trim().parse().ok())
            .filter(|secs| *secs > 0)
            .unwrap_or(DEFAULT_REFRESH_SECS);
        let history_range = lookup("TRACKER_HISTORY_RANGE").and_then(|v| v.parse().ok());

        Self {
            symbols,
            refresh_interval: Duration::from_secs(refresh_secs),
            history_range,
        }
    }
}

fn parse_symbols(raw: &str) -> Vec<String> {
    let mut symbols: Vec<String> = Vec::new();
    for symbol in raw
        .split(',')
        .map(|s| s.trim().to_uppercase())
        .filter(|s| !s.is_empty())
    {
        if !symbols.contains(&symbol) {
            symbols.push(symbol);
        }
    }
    symbols
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]);
        assert_eq!(config.symbols, vec!["AAPL", "MSFT", "GOOGL", "^GSPC"]);
        assert_eq!(config.refresh_interval, Duration::from_secs(30));
        assert!(config.history_range.is_none());
    }

    #[test]
    fn test_symbols_are_normalised_and_deduplicated() {
        let config = config_from(&[("TRACKER_SYMBOLS", " aapl, ,MSFT,AAPL ")]);
        assert_eq!(config.symbols, vec!["AAPL", "MSFT"]);
    }

    #[test]
    fn test_invalid_refresh_falls_back() {
        assert_eq!(
            config_from(&[("TRACKER_REFRESH_SECS", "soon")]).refresh_interval,
            Duration::from_secs(30)
        );
        assert_eq!(
            config_from(&[("TRACKER_REFRESH_SECS", "0")]).refresh_interval,
            Duration::from_secs(30)
        );
        assert_eq!(
            config_from(&[("TRACKER_REFRESH_SECS", "5")]).refresh_interval,
            Duration::from_secs(5)
        );
    }

    #[test]
    fn test_history_range() {
        let config = config_from(&[("TRACKER_HISTORY_RANGE", "1y")]);
        assert_eq!(config.history_range, Some(HistoryRange::OneYear));
    }
}
