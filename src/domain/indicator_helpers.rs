//! Annotating price history with the indicators the signal rules read.

use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::domain::indicator::crossover::{Crossover, detect_crossovers};
use crate::domain::indicator::rsi::calculate_rsi;
use crate::domain::indicator::sma::calculate_sma;
use crate::domain::ohlcv::OhlcvBar;
use crate::domain::trading_config::IndicatorParams;

/// A bar with every indicator defined.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndicatorBar {
    pub bar: OhlcvBar,
    pub rsi: f64,
    pub sma_short: f64,
    pub sma_long: f64,
    pub crossover: Crossover,
}

impl IndicatorBar {
    pub fn date(&self) -> NaiveDate {
        self.bar.date
    }

    pub fn close(&self) -> f64 {
        self.bar.close
    }

    /// Short average strictly above the long one.
    pub fn is_bullish_regime(&self) -> bool {
        self.sma_short > self.sma_long
    }
}

/// Latest indicator snapshot for one symbol.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CurrentIndicators {
    pub symbol: String,
    pub date: NaiveDate,
    pub close: f64,
    pub rsi: f64,
    pub sma_short: f64,
    pub sma_long: f64,
    pub crossover: Crossover,
}

/// Computes RSI, both SMAs and the crossover flag, then drops every bar on
/// which any of them is still warming up. Input must be date-sorted.
pub fn annotate_bars(bars: &[OhlcvBar], params: &IndicatorParams) -> Vec<IndicatorBar> {
    let rsi = calculate_rsi(bars, params.rsi_period);
    let short = calculate_sma(bars, params.sma_short);
    let long = calculate_sma(bars, params.sma_long);
    let crossovers = detect_crossovers(&short, &long);

    bars.iter()
        .enumerate()
        .filter_map(|(i, bar)| {
            Some(IndicatorBar {
                bar: bar.clone(),
                rsi: rsi.value_at(i)?,
                sma_short: short.value_at(i)?,
                sma_long: long.value_at(i)?,
                crossover: crossovers.get(i).copied().unwrap_or_default(),
            })
        })
        .collect()
}

pub fn current_indicators(
    annotated: &BTreeMap<String, Vec<IndicatorBar>>,
) -> BTreeMap<String, CurrentIndicators> {
    annotated
        .iter()
        .filter_map(|(symbol, bars)| {
            let latest = bars.last()?;
            Some((
                symbol.clone(),
                CurrentIndicators {
                    symbol: symbol.clone(),
                    date: latest.date(),
                    close: latest.close(),
                    rsi: latest.rsi,
                    sma_short: latest.sma_short,
                    sma_long: latest.sma_long,
                    crossover: latest.crossover,
                },
            ))
        })
        .collect()
}
