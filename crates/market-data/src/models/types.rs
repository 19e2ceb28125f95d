use std::sync::Arc;

/// Ticker symbol, normalised upper-case (e.g. "AAPL", "^GSPC", "000001.SS")
pub type Symbol = Arc<str>;

/// Currency code (ISO 4217)
pub type Currency = String;
