//! Chart rendering port.

use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::domain::error::SigtraderError;
use crate::domain::indicator_helpers::IndicatorBar;
use crate::domain::metrics::SymbolResult;
use crate::domain::signal::Signal;

/// Each method renders one chart and returns where it was written.
pub trait ChartPort {
    /// Total P&L per symbol.
    fn plot_portfolio_performance(
        &self,
        results: &BTreeMap<String, SymbolResult>,
        name: &str,
    ) -> Result<PathBuf, SigtraderError>;

    /// Equity curve (running P&L) per symbol.
    fn plot_cumulative_returns(
        &self,
        results: &BTreeMap<String, SymbolResult>,
        name: &str,
    ) -> Result<PathBuf, SigtraderError>;

    /// Histogram of per-trade percentage returns.
    fn plot_win_loss_distribution(
        &self,
        results: &BTreeMap<String, SymbolResult>,
        name: &str,
    ) -> Result<PathBuf, SigtraderError>;

    /// Close price with both SMAs and BUY/SELL markers.
    fn plot_stock_with_signals(
        &self,
        symbol: &str,
        bars: &[IndicatorBar],
        signals: &[Signal],
        name: &str,
    ) -> Result<PathBuf, SigtraderError>;
}
