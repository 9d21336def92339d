//! Stock universe: parsing the configured symbol list and checking that each
//! symbol has enough price history to warm up the indicators.

use chrono::NaiveDate;
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use tracing::{info, warn};

use crate::domain::error::SigtraderError;
use crate::domain::ohlcv::OhlcvBar;
use crate::domain::trading_config::IndicatorParams;
use crate::ports::data_port::DataPort;

#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum UniverseError {
    #[error("empty token in symbol list")]
    EmptyToken,

    #[error("duplicate symbol: {0}")]
    DuplicateSymbol(String),
}

/// Comma-separated tickers, trimmed and upper-cased. Exchange suffixes such
/// as `.NS` are kept.
pub fn parse_symbols(input: &str) -> Result<Vec<String>, UniverseError> {
    let mut symbols = Vec::new();
    let mut seen = HashSet::new();

    for token in input.split(',') {
        let trimmed = token.trim();
        if trimmed.is_empty() {
            return Err(UniverseError::EmptyToken);
        }
        let symbol = trimmed.to_uppercase();
        if !seen.insert(symbol.clone()) {
            return Err(UniverseError::DuplicateSymbol(symbol));
        }
        symbols.push(symbol);
    }

    Ok(symbols)
}

/// Bars needed before the first fully annotated bar, plus one so a crossover
/// can be observed.
pub fn minimum_bars(params: &IndicatorParams) -> usize {
    params
        .sma_long
        .max(params.sma_short)
        .max(params.rsi_period + 1)
        + 1
}

#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    FetchFailed(String),
    NoData,
    InsufficientBars { bars: usize, minimum: usize },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::FetchFailed(reason) => write!(f, "fetch failed: {reason}"),
            SkipReason::NoData => write!(f, "no data in range"),
            SkipReason::InsufficientBars { bars, minimum } => {
                write!(f, "{bars} bars, need at least {minimum}")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SkippedSymbol {
    pub symbol: String,
    pub reason: SkipReason,
}

#[derive(Debug, Default)]
pub struct LoadedUniverse {
    pub bars: BTreeMap<String, Vec<OhlcvBar>>,
    pub skipped: Vec<SkippedSymbol>,
}

/// Fetches every symbol, keeping those with at least `minimum` bars. Fails
/// only when no symbol survives.
pub fn load_universe(
    data_port: &dyn DataPort,
    symbols: &[String],
    start_date: NaiveDate,
    end_date: NaiveDate,
    minimum: usize,
) -> Result<LoadedUniverse, SigtraderError> {
    let mut loaded = LoadedUniverse::default();

    for symbol in symbols {
        let reason = match data_port.fetch_ohlcv(symbol, start_date, end_date) {
            Err(e) => SkipReason::FetchFailed(e.to_string()),
            Ok(bars) if bars.is_empty() => SkipReason::NoData,
            Ok(bars) if bars.len() < minimum => SkipReason::InsufficientBars {
                bars: bars.len(),
                minimum,
            },
            Ok(bars) => {
                info!(%symbol, bars = bars.len(), "loaded price history");
                loaded.bars.insert(symbol.clone(), bars);
                continue;
            }
        };

        warn!(%symbol, %reason, "skipping symbol");
        loaded.skipped.push(SkippedSymbol {
            symbol: symbol.clone(),
            reason,
        });
    }

    if loaded.bars.is_empty() {
        return Err(SigtraderError::NoData {
            symbol: symbols.join(","),
        });
    }

    if !loaded.skipped.is_empty() {
        info!(
            "analysing {} of {} symbols",
            loaded.bars.len(),
            symbols.len()
        );
    }

    Ok(loaded)
}
