//! Yahoo Finance market data producers.
//!
//! Two producers share one [`YahooProvider`]:
//! - [`ChartProducer`]: live quote from the chart endpoint metadata, and
//!   historical series at the range's natural interval.
//! - [`HistoryProducer`]: current quote reconstructed from a short daily
//!   history, and historical series at daily interval.
//!
//! Wire them as primary and fallback of a [`ProducerChain`].

mod models;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use num_traits::FromPrimitive;
use reqwest::header;
use rust_decimal::Decimal;
use tracing::{debug, warn};
use urlencoding::encode;
use yahoo_finance_api as yahoo;

use crate::errors::FetchError;
use crate::models::{Bar, CacheKey, CurrentQuote, DataKind, HistoryRange, MarketData};
use crate::provider::{Producer, ProducerChain, RateLimitConfig, RateLimiter};

pub use models::{YahooChartMeta, YahooChartResponse};

/// Producer name of the chart endpoint source.
pub const CHART_PRODUCER: &str = "YAHOO_CHART";

/// Producer name of the history reconstruction source.
pub const HISTORY_PRODUCER: &str = "YAHOO_HISTORY";

const CHART_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";
const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";
const DEFAULT_CURRENCY: &str = "USD";

/// Daily history window used to rebuild a current quote.
const RECONSTRUCT_RANGE: &str = "5d";
const DAILY_INTERVAL: &str = "1d";

// ============================================================================
// Yahoo Provider
// ============================================================================

/// Shared Yahoo Finance client.
///
/// Holds the library connector for history requests, a plain HTTP client for
/// the chart endpoint, and one rate limiter that throttles both.
pub struct YahooProvider {
    connector: yahoo::YahooConnector,
    client: reqwest::Client,
    rate_limiter: RateLimiter,
}

impl YahooProvider {
    /// Create a provider with the default rate limit.
    pub fn new() -> Result<Self, FetchError> {
        Self::with_rate_limit(RateLimitConfig::default())
    }

    pub fn with_rate_limit(config: RateLimitConfig) -> Result<Self, FetchError> {
        let connector = yahoo::YahooConnector::new().map_err(|e| {
            FetchError::producer(
                HISTORY_PRODUCER,
                format!("Failed to initialize Yahoo connector: {}", e),
            )
        })?;
        let client = reqwest::Client::builder()
            .user_agent(BROWSER_USER_AGENT)
            .build()
            .map_err(|e| {
                FetchError::producer(CHART_PRODUCER, format!("Failed to build HTTP client: {}", e))
            })?;

        Ok(Self {
            connector,
            client,
            rate_limiter: RateLimiter::with_config(config),
        })
    }

    /// Primary chart producer with the history producer as its fallback.
    pub fn into_chain(self) -> ProducerChain<MarketData> {
        let provider = Arc::new(self);
        ProducerChain::new(Arc::new(ChartProducer::new(Arc::clone(&provider))))
            .with_fallback(Arc::new(HistoryProducer::new(provider)))
    }

    /// Live quote from the chart endpoint metadata.
    pub async fn fetch_chart_quote(&self, symbol: &str) -> Result<CurrentQuote, FetchError> {
        self.rate_limiter.acquire().await;

        let url = format!(
            "{}/{}?interval={}&range={}",
            CHART_URL,
            encode(symbol),
            DAILY_INTERVAL,
            DAILY_INTERVAL
        );
        debug!("Fetching chart quote for {} from Yahoo", symbol);

        let response = self
            .client
            .get(&url)
            .header(header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| {
                FetchError::producer(CHART_PRODUCER, format!("Chart request failed: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::producer(
                CHART_PRODUCER,
                format!("Chart request for {} returned HTTP {}", symbol, status),
            ));
        }

        let data: YahooChartResponse = response.json().await.map_err(|e| {
            FetchError::producer(
                CHART_PRODUCER,
                format!("Failed to parse chart response: {}", e),
            )
        })?;

        if let Some(error) = &data.chart.error {
            return Err(FetchError::producer(
                CHART_PRODUCER,
                error
                    .description
                    .clone()
                    .or_else(|| error.code.clone())
                    .unwrap_or_else(|| "Unknown chart error".to_string()),
            ));
        }

        let meta = data.into_meta().ok_or_else(|| {
            warn!("Chart response for {} carried no result", symbol);
            FetchError::empty(CHART_PRODUCER)
        })?;

        quote_from_chart_meta(meta, CHART_PRODUCER)
    }

    /// Current quote rebuilt from the last two daily closes.
    pub async fn reconstruct_from_history(&self, symbol: &str) -> Result<CurrentQuote, FetchError> {
        debug!("Reconstructing quote for {} from daily history", symbol);
        let bars = self
            .fetch_bars(HISTORY_PRODUCER, symbol, DAILY_INTERVAL, RECONSTRUCT_RANGE)
            .await?;

        quote_from_bars(&bars, DEFAULT_CURRENCY, HISTORY_PRODUCER)
    }

    /// Historical series for `range` at `interval`.
    ///
    /// Rows with values that cannot be represented are dropped. A series with
    /// no remaining rows is an empty result.
    pub async fn fetch_series(
        &self,
        producer: &str,
        symbol: &str,
        range: &HistoryRange,
        interval: &str,
    ) -> Result<Vec<Bar>, FetchError> {
        debug!(
            "Fetching {} history for {} at {} interval from Yahoo",
            range, symbol, interval
        );
        let bars = self
            .fetch_bars(producer, symbol, interval, &range.upstream_range())
            .await?;

        if bars.is_empty() {
            warn!("No usable rows in {} history for {}", range, symbol);
            return Err(FetchError::empty(producer));
        }

        Ok(bars)
    }

    async fn fetch_bars(
        &self,
        producer: &str,
        symbol: &str,
        interval: &str,
        range: &str,
    ) -> Result<Vec<Bar>, FetchError> {
        self.rate_limiter.acquire().await;

        let response = self
            .connector
            .get_quote_range(symbol, interval, range)
            .await
            .map_err(|e| map_yahoo_error(producer, e))?;

        let quotes = response
            .quotes()
            .map_err(|e| map_yahoo_error(producer, e))?;

        let total = quotes.len();
        let bars: Vec<Bar> = quotes
            .iter()
            .filter_map(|q| {
                bar_from_values(
                    q.timestamp as i64,
                    q.open,
                    q.high,
                    q.low,
                    q.close,
                    q.volume,
                )
            })
            .collect();

        if bars.len() < total {
            debug!(
                "Dropped {} unusable rows from {} history",
                total - bars.len(),
                symbol
            );
        }

        Ok(bars)
    }
}

// ============================================================================
// Producers
// ============================================================================

/// Chart endpoint producer: live quote or native-interval series.
pub struct ChartProducer {
    provider: Arc<YahooProvider>,
}

impl ChartProducer {
    pub fn new(provider: Arc<YahooProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl Producer<MarketData> for ChartProducer {
    fn name(&self) -> &str {
        CHART_PRODUCER
    }

    async fn produce(&self, key: &CacheKey) -> Result<MarketData, FetchError> {
        match key.kind() {
            DataKind::Current => self
                .provider
                .fetch_chart_quote(key.symbol())
                .await
                .map(MarketData::Current),
            DataKind::Historical => {
                let range = require_range(CHART_PRODUCER, key)?;
                self.provider
                    .fetch_series(CHART_PRODUCER, key.symbol(), range, range.interval())
                    .await
                    .map(MarketData::Historical)
            }
        }
    }
}

/// History producer: reconstructed quote or daily series.
pub struct HistoryProducer {
    provider: Arc<YahooProvider>,
}

impl HistoryProducer {
    pub fn new(provider: Arc<YahooProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl Producer<MarketData> for HistoryProducer {
    fn name(&self) -> &str {
        HISTORY_PRODUCER
    }

    async fn produce(&self, key: &CacheKey) -> Result<MarketData, FetchError> {
        match key.kind() {
            DataKind::Current => self
                .provider
                .reconstruct_from_history(key.symbol())
                .await
                .map(MarketData::Current),
            DataKind::Historical => {
                let range = require_range(HISTORY_PRODUCER, key)?;
                self.provider
                    .fetch_series(HISTORY_PRODUCER, key.symbol(), range, DAILY_INTERVAL)
                    .await
                    .map(MarketData::Historical)
            }
        }
    }
}

// ============================================================================
// Conversions
// ============================================================================

fn require_range<'a>(producer: &str, key: &'a CacheKey) -> Result<&'a HistoryRange, FetchError> {
    key.range()
        .ok_or_else(|| FetchError::producer(producer, format!("{} has no history range", key)))
}

/// No-data errors become empty results; everything else is a producer failure.
fn map_yahoo_error(producer: &str, error: yahoo::YahooError) -> FetchError {
    if matches!(
        error,
        yahoo::YahooError::NoQuotes | yahoo::YahooError::NoResult
    ) {
        FetchError::empty(producer)
    } else {
        FetchError::producer(producer, error)
    }
}

/// Build a quote from chart metadata.
///
/// The price is required. The previous close falls back to the chart's own
/// previous close, then to the price itself (zero change).
pub fn quote_from_chart_meta(
    meta: YahooChartMeta,
    producer: &str,
) -> Result<CurrentQuote, FetchError> {
    let price = meta
        .regular_market_price
        .and_then(Decimal::from_f64_retain)
        .ok_or_else(|| FetchError::empty(producer))?;

    let previous_close = meta
        .previous_close
        .or(meta.chart_previous_close)
        .and_then(Decimal::from_f64_retain)
        .unwrap_or(price);

    let currency = meta
        .currency
        .unwrap_or_else(|| DEFAULT_CURRENCY.to_string());

    Ok(
        CurrentQuote::from_prices(price, previous_close, currency, producer)
            .with_volume(meta.regular_market_volume.and_then(Decimal::from_u64))
            .with_market_state(meta.market_state),
    )
}

/// Build a quote from the last two bars of a daily series.
pub fn quote_from_bars(
    bars: &[Bar],
    currency: &str,
    producer: &str,
) -> Result<CurrentQuote, FetchError> {
    match bars {
        [.., previous, last] => Ok(CurrentQuote::from_prices(
            last.close,
            previous.close,
            currency,
            producer,
        )
        .with_volume(Some(last.volume))),
        _ => Err(FetchError::empty(producer)),
    }
}

/// Convert one upstream row, or `None` if any value is not representable.
fn bar_from_values(
    timestamp: i64,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: u64,
) -> Option<Bar> {
    Some(Bar {
        timestamp: Utc.timestamp_opt(timestamp, 0).single()?,
        open: Decimal::from_f64_retain(open)?,
        high: Decimal::from_f64_retain(high)?,
        low: Decimal::from_f64_retain(low)?,
        close: Decimal::from_f64_retain(close)?,
        volume: Decimal::from_u64(volume)?,
    })
}
