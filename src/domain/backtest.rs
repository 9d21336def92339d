//! Batch backtest across symbols.
//!
//! Each symbol is simulated and aggregated independently; a symbol whose
//! signals fail validation is reported in `failures` and the rest of the
//! batch still runs.

use rayon::prelude::*;
use std::collections::BTreeMap;
use tracing::{info, warn};

use crate::domain::error::SignalError;
use crate::domain::metrics::{PortfolioResult, SymbolResult};
use crate::domain::signal::Signal;
use crate::domain::simulator::simulate_trades;

#[derive(Debug, Clone, PartialEq)]
pub struct SymbolFailure {
    pub symbol: String,
    pub error: SignalError,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct BacktestReport {
    /// Only symbols that closed at least one trade.
    pub results: BTreeMap<String, SymbolResult>,
    pub failures: Vec<SymbolFailure>,
    pub portfolio: Option<PortfolioResult>,
}

impl BacktestReport {
    pub fn symbols_without_trades<'a>(
        &'a self,
        signals: &'a BTreeMap<String, Vec<Signal>>,
    ) -> impl Iterator<Item = &'a str> + 'a {
        signals.keys().map(String::as_str).filter(move |symbol| {
            !self.results.contains_key(*symbol)
                && !self.failures.iter().any(|f| f.symbol == *symbol)
        })
    }
}

/// Simulation + aggregation for one symbol. `Ok(None)` means no closed trades.
pub fn backtest_symbol(
    symbol: &str,
    signals: &[Signal],
) -> Result<Option<SymbolResult>, SignalError> {
    let trades = simulate_trades(symbol, signals)?;
    Ok(SymbolResult::compute(symbol, trades))
}

pub fn run_backtest(signals: &BTreeMap<String, Vec<Signal>>, parallel: bool) -> BacktestReport {
    let outcomes: Vec<(String, Result<Option<SymbolResult>, SignalError>)> = if parallel {
        signals
            .par_iter()
            .map(|(symbol, sigs)| (symbol.clone(), backtest_symbol(symbol, sigs)))
            .collect()
    } else {
        signals
            .iter()
            .map(|(symbol, sigs)| (symbol.clone(), backtest_symbol(symbol, sigs)))
            .collect()
    };

    let mut report = BacktestReport::default();
    for (symbol, outcome) in outcomes {
        match outcome {
            Ok(Some(result)) => {
                report.results.insert(symbol, result);
            }
            Ok(None) => {}
            Err(error) => {
                warn!(%symbol, %error, "skipping symbol");
                report.failures.push(SymbolFailure { symbol, error });
            }
        }
    }

    report.portfolio = PortfolioResult::compute(&report.results);
    info!(
        symbols = report.results.len(),
        failed = report.failures.len(),
        "completed backtest"
    );
    report
}
