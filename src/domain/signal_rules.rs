//! Threshold/crossover signal rules.
//!
//! BUY needs RSI below the oversold threshold together with a bullish
//! short/long move; SELL needs RSI above the overbought threshold together
//! with a bearish move. What counts as a "move" depends on [`SignalPolicy`].

use chrono::NaiveDate;
use std::collections::BTreeMap;
use tracing::debug;

use crate::domain::indicator::crossover::Crossover;
use crate::domain::indicator_helpers::{CurrentIndicators, IndicatorBar};
use crate::domain::signal::{IndicatorSnapshot, Signal, SignalType};
use crate::domain::trading_config::{SignalParams, SignalPolicy};

#[derive(Debug, Clone, PartialEq)]
pub struct SignalSummary {
    pub total_signals: usize,
    pub buy_signals: usize,
    pub sell_signals: usize,
    pub last_buy: Option<Signal>,
    pub last_sell: Option<Signal>,
    pub avg_buy_price: f64,
    pub avg_sell_price: f64,
}

pub struct SignalRules {
    params: SignalParams,
}

impl SignalRules {
    pub fn new(params: SignalParams) -> Self {
        Self { params }
    }

    fn oversold(&self, rsi: f64) -> bool {
        rsi < self.params.rsi_oversold
    }

    fn overbought(&self, rsi: f64) -> bool {
        rsi > self.params.rsi_overbought
    }

    fn classify(&self, previous: &IndicatorBar, current: &IndicatorBar) -> Option<SignalType> {
        let (bullish, bearish) = match self.params.policy {
            SignalPolicy::CrossoverBar => (
                current.crossover == Crossover::Bullish,
                current.crossover == Crossover::Bearish,
            ),
            SignalPolicy::RegimeChange => (
                !previous.is_bullish_regime() && current.is_bullish_regime(),
                previous.is_bullish_regime() && !current.is_bullish_regime(),
            ),
        };

        if self.oversold(current.rsi) && bullish {
            Some(SignalType::Buy)
        } else if self.overbought(current.rsi) && bearish {
            Some(SignalType::Sell)
        } else {
            None
        }
    }

    /// Historical signals over an annotated, date-sorted series. The first bar
    /// only serves as the "previous" reference.
    pub fn generate(&self, symbol: &str, bars: &[IndicatorBar]) -> Vec<Signal> {
        let signals: Vec<Signal> = bars
            .windows(2)
            .filter_map(|w| {
                let signal_type = self.classify(&w[0], &w[1])?;
                Some(signal_from_bar(symbol, signal_type, &w[1]))
            })
            .collect();

        debug!(symbol, count = signals.len(), "generated signals");
        signals
    }

    /// Every symbol in `annotated` gets an entry, possibly empty.
    pub fn generate_all(
        &self,
        annotated: &BTreeMap<String, Vec<IndicatorBar>>,
    ) -> BTreeMap<String, Vec<Signal>> {
        annotated
            .iter()
            .map(|(symbol, bars)| (symbol.clone(), self.generate(symbol, bars)))
            .collect()
    }

    /// Live check against each symbol's latest snapshot. Uses the regime
    /// (short vs long) rather than a crossover event.
    pub fn check_current(
        &self,
        current: &BTreeMap<String, CurrentIndicators>,
    ) -> BTreeMap<String, Signal> {
        current
            .iter()
            .filter_map(|(symbol, ind)| {
                let signal_type = if self.oversold(ind.rsi) && ind.sma_short > ind.sma_long {
                    SignalType::Buy
                } else if self.overbought(ind.rsi) && ind.sma_short < ind.sma_long {
                    SignalType::Sell
                } else {
                    return None;
                };

                let signal = Signal {
                    symbol: symbol.clone(),
                    signal_type,
                    date: ind.date,
                    price: ind.close,
                    snapshot: IndicatorSnapshot {
                        rsi: Some(ind.rsi),
                        sma_short: Some(ind.sma_short),
                        sma_long: Some(ind.sma_long),
                        volume: None,
                        reason: reason(signal_type, ind.rsi),
                    },
                };
                Some((symbol.clone(), signal))
            })
            .collect()
    }
}

fn reason(signal_type: SignalType, rsi: f64) -> String {
    match signal_type {
        SignalType::Buy => format!("RSI oversold ({rsi:.2}) and SMA crossover bullish"),
        SignalType::Sell => format!("RSI overbought ({rsi:.2}) and SMA crossover bearish"),
    }
}

fn signal_from_bar(symbol: &str, signal_type: SignalType, bar: &IndicatorBar) -> Signal {
    Signal {
        symbol: symbol.to_string(),
        signal_type,
        date: bar.date(),
        price: bar.close(),
        snapshot: IndicatorSnapshot {
            rsi: Some(bar.rsi),
            sma_short: Some(bar.sma_short),
            sma_long: Some(bar.sma_long),
            volume: Some(bar.bar.volume),
            reason: reason(signal_type, bar.rsi),
        },
    }
}

/// Signals dated on or after `as_of - days`. Symbols left with none are dropped.
pub fn recent_signals(
    all: &BTreeMap<String, Vec<Signal>>,
    as_of: NaiveDate,
    days: i64,
) -> BTreeMap<String, Vec<Signal>> {
    let cutoff = as_of - chrono::Duration::days(days);
    all.iter()
        .filter_map(|(symbol, signals)| {
            let recent: Vec<Signal> = signals
                .iter()
                .filter(|s| s.date >= cutoff)
                .cloned()
                .collect();
            (!recent.is_empty()).then(|| (symbol.clone(), recent))
        })
        .collect()
}

fn mean_price(group: &[&Signal]) -> f64 {
    if group.is_empty() {
        0.0
    } else {
        group.iter().map(|s| s.price).sum::<f64>() / group.len() as f64
    }
}

pub fn summarize(signals: &[Signal]) -> SignalSummary {
    let buys: Vec<&Signal> = signals.iter().filter(|s| s.is_buy()).collect();
    let sells: Vec<&Signal> = signals.iter().filter(|s| !s.is_buy()).collect();

    SignalSummary {
        total_signals: signals.len(),
        buy_signals: buys.len(),
        sell_signals: sells.len(),
        last_buy: buys.last().map(|s| (*s).clone()),
        last_sell: sells.last().map(|s| (*s).clone()),
        avg_buy_price: mean_price(&buys),
        avg_sell_price: mean_price(&sells),
    }
}
