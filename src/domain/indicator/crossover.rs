//! Short/long moving-average crossover detection.
//!
//! Bullish at bar i: short[i] > long[i] and short[i-1] <= long[i-1]
//! Bearish at bar i: short[i] < long[i] and short[i-1] >= long[i-1]
//! Bars where either average is undefined, at i or i-1, never cross.

use serde::Serialize;
use std::fmt;

use crate::domain::indicator::IndicatorSeries;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum Crossover {
    Bullish,
    Bearish,
    #[default]
    None,
}

impl Crossover {
    /// +1 / -1 / 0, the conventional numeric flag.
    pub fn as_flag(self) -> i8 {
        match self {
            Crossover::Bullish => 1,
            Crossover::Bearish => -1,
            Crossover::None => 0,
        }
    }
}

impl fmt::Display for Crossover {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Crossover::Bullish => write!(f, "bullish"),
            Crossover::Bearish => write!(f, "bearish"),
            Crossover::None => write!(f, "none"),
        }
    }
}

pub fn detect_crossovers(short: &IndicatorSeries, long: &IndicatorSeries) -> Vec<Crossover> {
    let len = short.values.len().min(long.values.len());
    let mut flags = vec![Crossover::None; len];

    for i in 1..len {
        let (Some(s), Some(l), Some(prev_s), Some(prev_l)) = (
            short.value_at(i),
            long.value_at(i),
            short.value_at(i - 1),
            long.value_at(i - 1),
        ) else {
            continue;
        };

        flags[i] = if s > l && prev_s <= prev_l {
            Crossover::Bullish
        } else if s < l && prev_s >= prev_l {
            Crossover::Bearish
        } else {
            Crossover::None
        };
    }

    flags
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::{IndicatorPoint, IndicatorType};
    use chrono::NaiveDate;

    fn series(values: &[Option<f64>]) -> IndicatorSeries {
        IndicatorSeries {
            indicator_type: IndicatorType::Sma(1),
            values: values
                .iter()
                .enumerate()
                .map(|(i, v)| IndicatorPoint {
                    date: NaiveDate::from_ymd_opt(2024, 1, (i + 1) as u32).unwrap(),
                    valid: v.is_some(),
                    value: v.unwrap_or(0.0),
                })
                .collect(),
        }
    }

    #[test]
    fn bullish_then_bearish() {
        let short = series(&[Some(9.0), Some(11.0), Some(12.0), Some(9.0)]);
        let long = series(&[Some(10.0), Some(10.0), Some(10.0), Some(10.0)]);

        let flags = detect_crossovers(&short, &long);
        assert_eq!(
            flags,
            vec![
                Crossover::None,
                Crossover::Bullish,
                Crossover::None,
                Crossover::Bearish
            ]
        );
    }

    #[test]
    fn touching_then_crossing_counts() {
        let short = series(&[Some(10.0), Some(10.5)]);
        let long = series(&[Some(10.0), Some(10.0)]);
        assert_eq!(detect_crossovers(&short, &long)[1], Crossover::Bullish);
    }

    #[test]
    fn undefined_previous_bar_never_crosses() {
        let short = series(&[None, Some(11.0), Some(12.0)]);
        let long = series(&[None, Some(10.0), Some(10.0)]);
        let flags = detect_crossovers(&short, &long);
        assert!(flags.iter().all(|f| *f == Crossover::None));
    }

    #[test]
    fn flags_as_numbers() {
        assert_eq!(Crossover::Bullish.as_flag(), 1);
        assert_eq!(Crossover::Bearish.as_flag(), -1);
        assert_eq!(Crossover::None.as_flag(), 0);
    }
}
