use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Requested span of a historical series.
///
/// The labelled variants are the ranges offered by the dashboards; anything
/// else is passed upstream lower-cased.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HistoryRange {
    OneDay,
    FiveDays,
    OneMonth,
    ThreeMonths,
    SixMonths,
    OneYear,
    TwoYears,
    FiveYears,
    Other(String),
}

impl HistoryRange {
    /// Display label, e.g. `1M`.
    pub fn label(&self) -> &str {
        match self {
            Self::OneDay => "1D",
            Self::FiveDays => "5D",
            Self::OneMonth => "1M",
            Self::ThreeMonths => "3M",
            Self::SixMonths => "6M",
            Self::OneYear => "1Y",
            Self::TwoYears => "2Y",
            Self::FiveYears => "5Y",
            Self::Other(raw) => raw,
        }
    }

    /// Range string understood by the chart API, e.g. `1mo`.
    pub fn upstream_range(&self) -> String {
        match self {
            Self::OneDay => "1d".to_string(),
            Self::FiveDays => "5d".to_string(),
            Self::OneMonth => "1mo".to_string(),
            Self::ThreeMonths => "3mo".to_string(),
            Self::SixMonths => "6mo".to_string(),
            Self::OneYear => "1y".to_string(),
            Self::TwoYears => "2y".to_string(),
            Self::FiveYears => "5y".to_string(),
            Self::Other(raw) => raw.to_lowercase(),
        }
    }

    /// Bar interval for the range. Intraday ranges get finer bars.
    pub fn interval(&self) -> &'static str {
        match self.upstream_range().as_str() {
            "1d" => "5m",
            "5d" => "15m",
            _ => "1d",
        }
    }
}

impl FromStr for HistoryRange {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err("Empty history range".to_string());
        }
        Ok(match trimmed.to_uppercase().as_str() {
            "1D" => Self::OneDay,
            "5D" => Self::FiveDays,
            "1M" | "1MO" => Self::OneMonth,
            "3M" | "3MO" => Self::ThreeMonths,
            "6M" | "6MO" => Self::SixMonths,
            "1Y" => Self::OneYear,
            "2Y" => Self::TwoYears,
            "5Y" => Self::FiveYears,
            _ => Self::Other(trimmed.to_lowercase()),
        })
    }
}

impl fmt::Display for HistoryRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
