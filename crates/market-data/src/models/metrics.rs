use rust_decimal::{Decimal, MathematicalOps};
use serde::{Deserialize, Serialize};

use super::quote::Bar;

/// Performance summary of a historical series
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    /// Percentage change from the first close to the last close
    pub total_return: Decimal,

    /// Sample standard deviation of bar-to-bar returns, in percent
    pub volatility: Decimal,

    pub period_high: Decimal,
    pub period_low: Decimal,
    pub average_volume: Decimal,
    pub current_price: Decimal,
    pub start_price: Decimal,
}

impl PerformanceMetrics {
    /// Compute metrics for a series ordered oldest first.
    ///
    /// Returns `None` for fewer than two bars or a zero start price.
    pub fn from_bars(bars: &[Bar]) -> Option<Self> {
        let [first, .., last] = bars else {
            return None;
        };
        if first.close.is_zero() {
            return None;
        }

        let total_return = (last.close - first.close) / first.close * Decimal::ONE_HUNDRED;
        let volatility = sample_std_dev(&bar_returns(bars)) * Decimal::ONE_HUNDRED;

        let period_high = bars.iter().map(|b| b.high).max()?;
        let period_low = bars.iter().map(|b| b.low).min()?;
        let total_volume: Decimal = bars.iter().map(|b| b.volume).sum();
        let average_volume = total_volume / Decimal::from(bars.len());

        Some(Self {
            total_return,
            volatility,
            period_high,
            period_low,
            average_volume,
            current_price: last.close,
            start_price: first.close,
        })
    }
}

/// Fractional close-to-close returns. Pairs starting at a zero close are skipped.
fn bar_returns(bars: &[Bar]) -> Vec<Decimal> {
    bars.windows(2)
        .filter_map(|pair| {
            let (prev, next) = (pair[0].close, pair[1].close);
            (!prev.is_zero()).then(|| (next - prev) / prev)
        })
        .collect()
}

/// Sample (n - 1) standard deviation; zero with fewer than two values.
fn sample_std_dev(values: &[Decimal]) -> Decimal {
    if values.len() < 2 {
        return Decimal::ZERO;
    }

    let n = Decimal::from(values.len());
    let mean = values.iter().copied().sum::<Decimal>() / n;
    let variance = values
        .iter()
        .map(|v| (*v - mean) * (*v - mean))
        .sum::<Decimal>()
        / (n - Decimal::ONE);

    variance.sqrt().unwrap_or(Decimal::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;

    fn bar(day: i64, close: Decimal, volume: Decimal) -> Bar {
        Bar {
            timestamp: Utc.timestamp_opt(1_700_000_000 + day * 86_400, 0).unwrap(),
            open: close,
            high: close + dec!(1),
            low: close - dec!(1),
            close,
            volume,
        }
    }

    #[test]
    fn test_metrics_from_series() {
        let bars = vec![
            bar(0, dec!(100), dec!(100)),
            bar(1, dec!(110), dec!(200)),
            bar(2, dec!(99), dec!(300)),
        ];

        let metrics = PerformanceMetrics::from_bars(&bars).unwrap();
        assert_eq!(metrics.total_return, dec!(-1));
        assert_eq!(metrics.start_price, dec!(100));
        assert_eq!(metrics.current_price, dec!(99));
        assert_eq!(metrics.period_high, dec!(111));
        assert_eq!(metrics.period_low, dec!(98));
        assert_eq!(metrics.average_volume, dec!(200));
        // Returns are +10% and -10%: sample std dev is sqrt(0.02)
        assert_eq!(metrics.volatility.round_dp(2), dec!(14.14));
    }

    #[test]
    fn test_flat_series_has_zero_volatility() {
        let bars = vec![
            bar(0, dec!(50), dec!(10)),
            bar(1, dec!(50), dec!(10)),
            bar(2, dec!(50), dec!(10)),
        ];

        let metrics = PerformanceMetrics::from_bars(&bars).unwrap();
        assert_eq!(metrics.total_return, Decimal::ZERO);
        assert_eq!(metrics.volatility, Decimal::ZERO);
    }

    #[test]
    fn test_two_bars_have_zero_volatility() {
        let bars = vec![bar(0, dec!(100), dec!(1)), bar(1, dec!(105), dec!(1))];

        let metrics = PerformanceMetrics::from_bars(&bars).unwrap();
        assert_eq!(metrics.total_return, dec!(5));
        assert_eq!(metrics.volatility, Decimal::ZERO);
    }

    #[test]
    fn test_short_series_has_no_metrics() {
        assert!(PerformanceMetrics::from_bars(&[]).is_none());
        assert!(PerformanceMetrics::from_bars(&[bar(0, dec!(100), dec!(1))]).is_none());
    }

    #[test]
    fn test_zero_start_price_has_no_metrics() {
        let bars = vec![bar(0, Decimal::ZERO, dec!(1)), bar(1, dec!(10), dec!(1))];
        assert!(PerformanceMetrics::from_bars(&bars).is_none());
    }
}
