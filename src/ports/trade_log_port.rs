//! Tabular trade log port.

use std::collections::BTreeMap;

use crate::domain::error::SigtraderError;
use crate::domain::metrics::{PortfolioResult, SymbolResult};
use crate::domain::signal::Signal;

/// Append-only sink for backtest output, one "worksheet" per method.
pub trait TradeLogPort {
    fn log_trades(&self, results: &BTreeMap<String, SymbolResult>) -> Result<(), SigtraderError>;

    fn log_pnl_summary(
        &self,
        results: &BTreeMap<String, SymbolResult>,
    ) -> Result<(), SigtraderError>;

    fn log_portfolio_summary(&self, portfolio: &PortfolioResult) -> Result<(), SigtraderError>;

    fn log_current_signals(
        &self,
        signals: &BTreeMap<String, Signal>,
    ) -> Result<(), SigtraderError>;
}
