use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::types::Currency;

/// Values the cache can hold.
///
/// The cache never looks inside a value; it only asks whether a freshly
/// produced value is usable. Unusable values are treated as a failed fetch
/// and are never stored.
pub trait Cacheable: Clone + Send + Sync + 'static {
    fn is_usable(&self) -> bool {
        true
    }
}

impl<T: Clone + Send + Sync + 'static> Cacheable for Vec<T> {
    fn is_usable(&self) -> bool {
        !self.is_empty()
    }
}

/// Latest price snapshot for a symbol
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CurrentQuote {
    /// Current/last traded price
    pub price: Decimal,

    /// Absolute change against the previous close
    pub change: Decimal,

    /// Percentage change against the previous close
    pub change_percent: Decimal,

    /// Session volume (not every source reports it)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume: Option<Decimal>,

    /// Previous session close used to derive the change
    pub previous_close: Decimal,

    /// Quote currency
    pub currency: Currency,

    /// Exchange session state (REGULAR, CLOSED, PRE, ...)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub market_state: Option<String>,

    /// Producer that fetched the quote
    pub source: String,
}

impl CurrentQuote {
    /// Build a quote from a price and the previous close, deriving the change fields.
    pub fn from_prices(
        price: Decimal,
        previous_close: Decimal,
        currency: impl Into<Currency>,
        source: impl Into<String>,
    ) -> Self {
        let change = price - previous_close;
        let change_percent = if previous_close.is_zero() {
            Decimal::ZERO
        } else {
            change / previous_close * Decimal::ONE_HUNDRED
        };

        Self {
            price,
            change,
            change_percent,
            volume: None,
            previous_close,
            currency: currency.into(),
            market_state: None,
            source: source.into(),
        }
    }

    pub fn with_volume(mut self, volume: Option<Decimal>) -> Self {
        self.volume = volume;
        self
    }

    pub fn with_market_state(mut self, market_state: Option<String>) -> Self {
        self.market_state = market_state;
        self
    }
}

/// One OHLCV bar of a historical series
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: DateTime<Utc>,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
}

/// Market data held by the cache
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "lowercase")]
pub enum MarketData {
    Current(CurrentQuote),
    Historical(Vec<Bar>),
}

impl MarketData {
    pub fn as_current(&self) -> Option<&CurrentQuote> {
        match self {
            Self::Current(quote) => Some(quote),
            Self::Historical(_) => None,
        }
    }

    pub fn as_historical(&self) -> Option<&[Bar]> {
        match self {
            Self::Historical(bars) => Some(bars),
            Self::Current(_) => None,
        }
    }

    pub fn into_current(self) -> Option<CurrentQuote> {
        match self {
            Self::Current(quote) => Some(quote),
            Self::Historical(_) => None,
        }
    }

    pub fn into_historical(self) -> Option<Vec<Bar>> {
        match self {
            Self::Historical(bars) => Some(bars),
            Self::Current(_) => None,
        }
    }
}

impl Cacheable for MarketData {
    fn is_usable(&self) -> bool {
        match self {
            Self::Current(_) => true,
            Self::Historical(bars) => !bars.is_empty(),
        }
    }
}
