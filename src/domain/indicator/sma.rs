//! Simple Moving Average indicator.
//!
//! O(n) sliding window over closes.
//! SMA(n) = (P[i-n+1] + ... + P[i]) / n
//! Warmup: first (n-1) bars are invalid.

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType};
use crate::domain::ohlcv::OhlcvBar;

pub fn calculate_sma(bars: &[OhlcvBar], period: usize) -> IndicatorSeries {
    if period == 0 || bars.is_empty() {
        return IndicatorSeries {
            indicator_type: IndicatorType::Sma(period),
            values: Vec::new(),
        };
    }

    let mut values = Vec::with_capacity(bars.len());
    let mut window_sum = 0.0_f64;

    for (i, bar) in bars.iter().enumerate() {
        window_sum += bar.close;
        if i >= period {
            window_sum -= bars[i - period].close;
        }

        let valid = i + 1 >= period;
        values.push(IndicatorPoint {
            date: bar.date,
            valid,
            value: if valid { window_sum / period as f64 } else { 0.0 },
        });
    }

    IndicatorSeries {
        indicator_type: IndicatorType::Sma(period),
        values,
    }
}
