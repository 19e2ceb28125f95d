//! Yahoo Finance API response models.
//!
//! These models are used for parsing the v8 chart endpoint, whose `meta`
//! block carries the live price fields without requiring an auth crumb.

use serde::Deserialize;

/// Top-level response wrapper for the chart API
#[derive(Debug, Deserialize)]
pub struct YahooChartResponse {
    pub chart: YahooChart,
}

/// Chart container: either results or an error
#[derive(Debug, Deserialize)]
pub struct YahooChart {
    pub result: Option<Vec<YahooChartResult>>,
    pub error: Option<YahooChartError>,
}

#[derive(Debug, Deserialize)]
pub struct YahooChartResult {
    pub meta: YahooChartMeta,
}

/// Live market fields for one symbol
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YahooChartMeta {
    pub currency: Option<String>,
    pub symbol: Option<String>,
    pub regular_market_price: Option<f64>,
    pub previous_close: Option<f64>,
    pub chart_previous_close: Option<f64>,
    pub regular_market_volume: Option<u64>,
    pub market_state: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct YahooChartError {
    pub code: Option<String>,
    pub description: Option<String>,
}

impl YahooChartResponse {
    /// Metadata of the first result, if any.
    pub fn into_meta(self) -> Option<YahooChartMeta> {
        self.chart
            .result
            .and_then(|results| results.into_iter().next())
            .map(|r| r.meta)
    }
}
