//! RSI (Relative Strength Index) indicator implementation.
//!
//! Uses Wilder's smoothing for average gain/loss calculation:
//! - First average: simple mean of gains/losses over the first n price changes
//! - Subsequent: avg = (prev_avg * (n-1) + current) / n
//!
//! Formula: RSI = 100 - (100 / (1 + avg_gain / avg_loss))
//! If avg_loss == 0: RSI = 100
//!
//! Warmup: first n bars are invalid (need n price changes to seed the averages).

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType};
use crate::domain::ohlcv::OhlcvBar;

fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        100.0
    } else {
        100.0 - (100.0 / (1.0 + avg_gain / avg_loss))
    }
}

pub fn calculate_rsi(bars: &[OhlcvBar], period: usize) -> IndicatorSeries {
    let mut values: Vec<IndicatorPoint> = bars
        .iter()
        .map(|b| IndicatorPoint {
            date: b.date,
            valid: false,
            value: 0.0,
        })
        .collect();

    if period == 0 || bars.len() <= period {
        return IndicatorSeries {
            indicator_type: IndicatorType::Rsi(period),
            values,
        };
    }

    let mut gain_sum = 0.0_f64;
    let mut loss_sum = 0.0_f64;
    let mut avg_gain = 0.0_f64;
    let mut avg_loss = 0.0_f64;
    let n = period as f64;

    for i in 1..bars.len() {
        let change = bars[i].close - bars[i - 1].close;
        let gain = change.max(0.0);
        let loss = (-change).max(0.0);

        if i < period {
            gain_sum += gain;
            loss_sum += loss;
            continue;
        }

        if i == period {
            avg_gain = (gain_sum + gain) / n;
            avg_loss = (loss_sum + loss) / n;
        } else {
            avg_gain = (avg_gain * (n - 1.0) + gain) / n;
            avg_loss = (avg_loss * (n - 1.0) + loss) / n;
        }

        values[i].valid = true;
        values[i].value = rsi_from_averages(avg_gain, avg_loss);
    }

    IndicatorSeries {
        indicator_type: IndicatorType::Rsi(period),
        values,
    }
}
