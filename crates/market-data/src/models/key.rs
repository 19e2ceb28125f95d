use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::range::HistoryRange;
use super::types::Symbol;

/// Kind of data stored under a key.
///
/// Freshness windows are configured per kind, not per entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataKind {
    /// Latest price snapshot
    Current,
    /// Ordered OHLCV series
    Historical,
}

impl DataKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataKind::Current => "current",
            DataKind::Historical => "historical",
        }
    }
}

impl fmt::Display for DataKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cache key: subject symbol + data kind + optional range parameter.
///
/// Keys are immutable and compared structurally, so `historical/AAPL/1M`
/// and `historical/AAPL/1Y` are distinct entries.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CacheKey {
    symbol: Symbol,
    kind: DataKind,
    range: Option<HistoryRange>,
}

impl CacheKey {
    /// Key for the latest price of `symbol`.
    pub fn current(symbol: &str) -> Self {
        Self {
            symbol: normalize_symbol(symbol),
            kind: DataKind::Current,
            range: None,
        }
    }

    /// Key for the historical series of `symbol` over `range`.
    pub fn historical(symbol: &str, range: HistoryRange) -> Self {
        Self {
            symbol: normalize_symbol(symbol),
            kind: DataKind::Historical,
            range: Some(range),
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn kind(&self) -> DataKind {
        self.kind
    }

    pub fn range(&self) -> Option<&HistoryRange> {
        self.range.as_ref()
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.range {
            Some(range) => write!(f, "{}/{}/{}", self.kind, self.symbol, range),
            None => write!(f, "{}/{}", self.kind, self.symbol),
        }
    }
}

/// Symbols are looked up upper-cased and without surrounding whitespace.
pub fn normalize_symbol(symbol: &str) -> Symbol {
    Arc::from(symbol.trim().to_uppercase())
}
