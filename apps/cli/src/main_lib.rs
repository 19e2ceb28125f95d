use std::sync::Arc;

use rust_decimal::Decimal;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use tracker_market_data::{
    Bar, CacheConfig, FetchCoordinator, HistoryRange, MarketDataService, MarketDataServiceTrait,
    PerformanceMetrics, SummaryRow, YahooProvider,
};

use crate::config::Config;

/// Log output selected by `TRACKER_LOG_FORMAT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LogFormat {
    Compact,
    Json,
}

impl LogFormat {
    fn from_env_value(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some(v) if v.eq_ignore_ascii_case("json") => Self::Json,
            _ => Self::Compact,
        }
    }
}

/// Logs go to stderr so the summary table on stdout stays clean.
pub fn init_tracing() {
    let format = LogFormat::from_env_value(std::env::var("TRACKER_LOG_FORMAT").ok().as_deref());
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,reqwest=warn,hyper_util=warn"));
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Json => registry
            .with(fmt::layer().json().flatten_event(true).with_writer(std::io::stderr))
            .init(),
        LogFormat::Compact => registry
            .with(fmt::layer().compact().with_target(false).with_writer(std::io::stderr))
            .init(),
    }
}

pub fn build_service() -> anyhow::Result<Arc<dyn MarketDataServiceTrait>> {
    let cache_config = CacheConfig::from_env();
    tracing::info!(
        "Freshness windows: current {:?}, historical {:?}",
        cache_config.windows.current,
        cache_config.windows.historical
    );

    let coordinator = Arc::new(FetchCoordinator::new(cache_config));
    let chain = YahooProvider::new()?.into_chain();
    Ok(Arc::new(MarketDataService::new(coordinator, chain)))
}

/// Refresh every configured symbol once and print the results.
pub async fn refresh(service: &dyn MarketDataServiceTrait, config: &Config) {
    let rows = service.market_summary(&config.symbols).await;
    println!("{}", render_summary(&rows));

    for symbol in &config.symbols {
        if let Some(age) = service.data_age(symbol) {
            tracing::debug!("{} data is {}s old", symbol, age.as_secs());
        }
    }

    if let Some(range) = &config.history_range {
        for symbol in &config.symbols {
            print_history(service, symbol, range).await;
        }
    }
}

async fn print_history(service: &dyn MarketDataServiceTrait, symbol: &str, range: &HistoryRange) {
    match service.historical(symbol, range.clone()).await {
        Ok(bars) => println!("{}", render_history(symbol, range, &bars)),
        Err(e) => tracing::warn!("No {} history for {}: {}", range, symbol, e),
    }
}

/// One-line performance summary of a symbol's history.
pub fn render_history(symbol: &str, range: &HistoryRange, bars: &[Bar]) -> String {
    match PerformanceMetrics::from_bars(bars) {
        Some(m) => format!(
            "{} {}: {} bars, return {}%, volatility {}%, high {}, low {}, avg volume {}",
            symbol,
            range,
            bars.len(),
            signed(m.total_return.round_dp(2).normalize()),
            m.volatility.round_dp(2).normalize(),
            m.period_high.round_dp(2).normalize(),
            m.period_low.round_dp(2).normalize(),
            m.average_volume.round_dp(0).normalize()
        ),
        None => format!("{} {}: {} bars, not enough data", symbol, range, bars.len()),
    }
}

/// Plain-text table of summary rows.
pub fn render_summary(rows: &[SummaryRow]) -> String {
    if rows.is_empty() {
        return "No market data available".to_string();
    }

    let mut out = format!(
        "{:<10} {:>12} {:>10} {:>9} {:>14}",
        "Symbol", "Price", "Change", "Change %", "Volume"
    );
    for row in rows {
        out.push('\n');
        out.push_str(&format!(
            "{:<10} {:>12} {:>10} {:>8}% {:>14}",
            row.symbol,
            row.price.round_dp(2),
            signed(row.change.round_dp(2)),
            signed(row.change_percent.round_dp(2)),
            row.volume
                .map(|v| v.round_dp(0).to_string())
                .unwrap_or_else(|| "N/A".to_string())
        ));
    }
    out
}

fn signed(value: Decimal) -> String {
    if value.is_sign_positive() && !value.is_zero() {
        format!("+{}", value)
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_empty_summary() {
        assert_eq!(render_summary(&[]), "No market data available");
    }

    #[test]
    fn test_render_summary_rows() {
        let rows = vec![
            SummaryRow {
                symbol: "AAPL".to_string(),
                price: Decimal::new(15000, 2),
                change: Decimal::new(150, 2),
                change_percent: Decimal::new(101, 2),
                volume: None,
            },
            SummaryRow {
                symbol: "MSFT".to_string(),
                price: Decimal::new(300, 0),
                change: Decimal::new(-25, 1),
                change_percent: Decimal::new(-83, 2),
                volume: Some(Decimal::new(1000, 0)),
            },
        ];

        let rendered = render_summary(&rows);
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[1].starts_with("AAPL"));
        assert!(lines[1].contains("+1.50"));
        assert!(lines[1].contains("+1.01%"));
        assert!(lines[1].ends_with("N/A"));
        assert!(lines[2].contains("-2.5"));
        assert!(lines[2].ends_with("1000"));
    }

    fn bar(close: i64, volume: i64) -> Bar {
        let close = Decimal::from(close);
        Bar {
            timestamp: chrono::Utc::now(),
            open: close,
            high: close + Decimal::ONE,
            low: close - Decimal::ONE,
            close,
            volume: Decimal::from(volume),
        }
    }

    #[test]
    fn test_render_history_metrics() {
        let bars = vec![bar(100, 100), bar(110, 200), bar(99, 300)];
        let line = render_history("AAPL", &HistoryRange::OneMonth, &bars);

        assert_eq!(
            line,
            "AAPL 1M: 3 bars, return -1%, volatility 14.14%, high 111, low 98, avg volume 200"
        );
    }

    #[test]
    fn test_render_history_single_bar() {
        let line = render_history("AAPL", &HistoryRange::OneDay, &[bar(100, 1)]);
        assert_eq!(line, "AAPL 1D: 1 bars, not enough data");
    }

    #[test]
    fn test_log_format_from_env_value() {
        assert_eq!(LogFormat::from_env_value(None), LogFormat::Compact);
        assert_eq!(LogFormat::from_env_value(Some(" JSON ")), LogFormat::Json);
        assert_eq!(LogFormat::from_env_value(Some("text")), LogFormat::Compact);
    }

    #[test]
    fn test_signed() {
        assert_eq!(signed(Decimal::new(5, 1)), "+0.5");
        assert_eq!(signed(Decimal::ZERO), "0");
        assert_eq!(signed(Decimal::new(-5, 1)), "-0.5");
    }
}
