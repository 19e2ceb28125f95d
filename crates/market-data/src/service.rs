//! Market data service.
//!
//! Owns the shared [`FetchCoordinator`] and the producer chain, and exposes
//! the operations dashboards need: single and batched current prices,
//! historical series, a summary table, symbol lookup and data age.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;
use log::{debug, warn};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::cache::{CacheConfig, FetchCoordinator};
use crate::errors::FetchError;
use crate::models::{normalize_symbol, Bar, CacheKey, CurrentQuote, HistoryRange, MarketData};
use crate::provider::ProducerChain;

/// One row of a market summary table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryRow {
    pub symbol: String,
    pub price: Decimal,
    pub change: Decimal,
    pub change_percent: Decimal,
    pub volume: Option<Decimal>,
}

impl From<(&str, &CurrentQuote)> for SummaryRow {
    fn from((symbol, quote): (&str, &CurrentQuote)) -> Self {
        Self {
            symbol: symbol.to_string(),
            price: quote.price,
            change: quote.change,
            change_percent: quote.change_percent,
            volume: quote.volume,
        }
    }
}

/// Result of a symbol lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SymbolLookup {
    /// Normalised symbol that was looked up
    pub symbol: String,
    pub found: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<CurrentQuote>,
    /// Failure description when the symbol could not be resolved
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Market data operations used by callers.
#[async_trait]
pub trait MarketDataServiceTrait: Send + Sync {
    /// Current quote for a symbol.
    async fn current_price(&self, symbol: &str) -> Result<CurrentQuote, FetchError>;

    /// Historical bars for a symbol over `range`.
    async fn historical(&self, symbol: &str, range: HistoryRange) -> Result<Vec<Bar>, FetchError>;

    /// Current quotes for several symbols, resolved concurrently.
    ///
    /// Symbols that fail to resolve are omitted and logged.
    async fn multiple_current_prices(&self, symbols: &[String]) -> HashMap<String, CurrentQuote>;

    /// Summary rows for the symbols that resolved, in input order.
    async fn market_summary(&self, symbols: &[String]) -> Vec<SummaryRow>;

    /// Normalise `query` and try to resolve it as a symbol.
    async fn search_symbol(&self, query: &str) -> SymbolLookup;

    /// Age of the cached current quote for `symbol`, if any.
    fn data_age(&self, symbol: &str) -> Option<Duration>;
}

/// Service backed by one coordinator and one producer chain.
pub struct MarketDataService {
    coordinator: Arc<FetchCoordinator<MarketData>>,
    chain: ProducerChain<MarketData>,
}

impl MarketDataService {
    pub fn new(
        coordinator: Arc<FetchCoordinator<MarketData>>,
        chain: ProducerChain<MarketData>,
    ) -> Self {
        debug!("Market data service using producers {:?}", chain.names());
        Self { coordinator, chain }
    }

    /// Build a service with its own coordinator.
    pub fn with_config(config: CacheConfig, chain: ProducerChain<MarketData>) -> Self {
        Self::new(Arc::new(FetchCoordinator::new(config)), chain)
    }

    pub fn coordinator(&self) -> &Arc<FetchCoordinator<MarketData>> {
        &self.coordinator
    }

    /// A producer answered a key with the other kind of data.
    fn mismatch(&self, key: &CacheKey, got: &str) -> FetchError {
        FetchError::producer(
            self.chain.names().join(","),
            format!("{} resolved to {}", key, got),
        )
    }
}

#[async_trait]
impl MarketDataServiceTrait for MarketDataService {
    async fn current_price(&self, symbol: &str) -> Result<CurrentQuote, FetchError> {
        let key = CacheKey::current(symbol);
        let data = self.coordinator.resolve_with(&key, &self.chain).await?;
        data.into_current().ok_or_else(|| self.mismatch(&key, "a series"))
    }

    async fn historical(&self, symbol: &str, range: HistoryRange) -> Result<Vec<Bar>, FetchError> {
        let key = CacheKey::historical(symbol, range);
        let data = self.coordinator.resolve_with(&key, &self.chain).await?;
        data.into_historical().ok_or_else(|| self.mismatch(&key, "a quote"))
    }

    async fn multiple_current_prices(&self, symbols: &[String]) -> HashMap<String, CurrentQuote> {
        let results = join_all(symbols.iter().map(|s| self.current_price(s))).await;

        symbols
            .iter()
            .zip(results)
            .filter_map(|(symbol, result)| match result {
                Ok(quote) => Some((normalize_symbol(symbol).to_string(), quote)),
                Err(e) => {
                    warn!("Failed to fetch current price for {}: {}", symbol, e);
                    None
                }
            })
            .collect()
    }

    async fn market_summary(&self, symbols: &[String]) -> Vec<SummaryRow> {
        let quotes = self.multiple_current_prices(symbols).await;

        symbols
            .iter()
            .filter_map(|symbol| {
                let symbol = normalize_symbol(symbol);
                quotes
                    .get(&*symbol)
                    .map(|quote| SummaryRow::from((&*symbol, quote)))
            })
            .collect()
    }

    async fn search_symbol(&self, query: &str) -> SymbolLookup {
        let symbol = normalize_symbol(query).to_string();

        match self.current_price(&symbol).await {
            Ok(quote) => SymbolLookup {
                symbol,
                found: true,
                data: Some(quote),
                error: None,
            },
            Err(e) => {
                debug!("Symbol lookup for {} failed: {}", symbol, e);
                SymbolLookup {
                    symbol,
                    found: false,
                    data: None,
                    error: Some(e.to_string()),
                }
            }
        }
    }

    fn data_age(&self, symbol: &str) -> Option<Duration> {
        self.coordinator
            .peek(&CacheKey::current(symbol))
            .map(|(_, age)| age)
    }
}
