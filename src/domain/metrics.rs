//! Per-symbol and portfolio performance statistics over closed trades.

use serde::Serialize;
use std::collections::BTreeMap;

use super::position::Trade;

/// Statistics shared by symbol-level and portfolio-level results.
///
/// Percentages are ratio x 100. A trade with `pnl <= 0` counts as losing, so
/// `winning_trades + losing_trades == total_trades`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TradeStats {
    pub total_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    pub win_rate: f64,
    pub total_pnl: f64,
    pub total_pnl_pct: f64,
    pub avg_pnl_per_trade: f64,
    pub avg_win: f64,
    pub avg_loss: f64,
    pub max_win: f64,
    pub max_loss: f64,
    pub avg_holding_days: f64,
    pub sharpe_ratio: f64,
    /// Running P&L after each trade, in trade order.
    pub cumulative_returns: Vec<f64>,
}

fn mean_or_zero(sum: f64, count: usize) -> f64 {
    if count > 0 { sum / count as f64 } else { 0.0 }
}

/// mean / population stddev of per-trade percentage returns.
/// 0 for fewer than two trades or when the dispersion is only rounding noise.
pub fn sharpe_ratio(pnl_pcts: &[f64]) -> f64 {
    if pnl_pcts.len() < 2 {
        return 0.0;
    }

    let n = pnl_pcts.len() as f64;
    let mean = pnl_pcts.iter().sum::<f64>() / n;
    let variance = pnl_pcts.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n;
    let stddev = variance.sqrt();

    if stddev.is_finite() && stddev > f64::EPSILON * mean.abs().max(1.0) {
        mean / stddev
    } else {
        0.0
    }
}

impl TradeStats {
    /// `None` for an empty trade list.
    pub fn compute(trades: &[Trade]) -> Option<Self> {
        if trades.is_empty() {
            return None;
        }

        let mut cumulative_returns = Vec::with_capacity(trades.len());
        let mut running = 0.0_f64;
        let mut winning_trades = 0usize;
        let mut total_wins = 0.0_f64;
        let mut total_losses = 0.0_f64;
        let mut total_pnl_pct = 0.0_f64;
        let mut max_win = f64::NEG_INFINITY;
        let mut max_loss = f64::INFINITY;
        let mut total_holding_days = 0i64;

        for trade in trades {
            running += trade.pnl;
            cumulative_returns.push(running);

            if trade.is_win {
                winning_trades += 1;
                total_wins += trade.pnl;
            } else {
                total_losses += trade.pnl;
            }

            total_pnl_pct += trade.pnl_pct;
            max_win = max_win.max(trade.pnl);
            max_loss = max_loss.min(trade.pnl);
            total_holding_days += trade.holding_days;
        }

        let total_trades = trades.len();
        let losing_trades = total_trades - winning_trades;
        let total_pnl = running;
        let pnl_pcts: Vec<f64> = trades.iter().map(|t| t.pnl_pct).collect();

        Some(TradeStats {
            total_trades,
            winning_trades,
            losing_trades,
            win_rate: mean_or_zero(winning_trades as f64, total_trades) * 100.0,
            total_pnl,
            total_pnl_pct,
            avg_pnl_per_trade: mean_or_zero(total_pnl, total_trades),
            avg_win: mean_or_zero(total_wins, winning_trades),
            avg_loss: mean_or_zero(total_losses, losing_trades),
            max_win,
            max_loss,
            avg_holding_days: mean_or_zero(total_holding_days as f64, total_trades),
            sharpe_ratio: sharpe_ratio(&pnl_pcts),
            cumulative_returns,
        })
    }
}

/// Outcome of one symbol's backtest.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SymbolResult {
    pub symbol: String,
    pub stats: TradeStats,
    pub trades: Vec<Trade>,
}

impl SymbolResult {
    /// `None` when the symbol closed no trades.
    pub fn compute(symbol: &str, trades: Vec<Trade>) -> Option<Self> {
        let stats = TradeStats::compute(&trades)?;
        Some(SymbolResult {
            symbol: symbol.to_string(),
            stats,
            trades,
        })
    }
}

/// Trade-weighted statistics over every symbol's trades pooled together.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PortfolioResult {
    pub stats: TradeStats,
    pub symbols_traded: Vec<String>,
}

impl PortfolioResult {
    /// Pools the trades of every result (ordered by exit date, ties keeping
    /// symbol order) and recomputes the statistics over the pooled set.
    pub fn compute(results: &BTreeMap<String, SymbolResult>) -> Option<Self> {
        let symbols_traded: Vec<String> = results
            .iter()
            .filter(|(_, r)| !r.trades.is_empty())
            .map(|(symbol, _)| symbol.clone())
            .collect();

        let mut pooled: Vec<Trade> = results
            .values()
            .flat_map(|r| r.trades.iter().cloned())
            .collect();
        pooled.sort_by_key(|t| t.exit_date);

        let stats = TradeStats::compute(&pooled)?;
        Some(PortfolioResult {
            stats,
            symbols_traded,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;

    fn make_trade(symbol: &str, entry: f64, exit: f64, days: i64) -> Trade {
        let entry_date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        Trade::close(
            symbol,
            entry_date,
            entry,
            entry_date + chrono::Duration::days(days),
            exit,
        )
    }

    #[test]
    fn empty_trades_have_no_stats() {
        assert!(TradeStats::compute(&[]).is_none());
        assert!(SymbolResult::compute("A", Vec::new()).is_none());
    }

    #[test]
    fn counts_and_win_rate() {
        let trades = vec![
            make_trade("A", 100.0, 110.0, 5),
            make_trade("A", 100.0, 95.0, 3),
            make_trade("A", 100.0, 120.0, 10),
            make_trade("A", 100.0, 100.0, 1),
        ];
        let stats = TradeStats::compute(&trades).unwrap();

        assert_eq!(stats.total_trades, 4);
        assert_eq!(stats.winning_trades, 2);
        assert_eq!(stats.losing_trades, 2);
        assert_relative_eq!(stats.win_rate, 50.0);
    }

    #[test]
    fn pnl_totals_and_averages() {
        let trades = vec![
            make_trade("A", 100.0, 110.0, 5),
            make_trade("A", 200.0, 180.0, 10),
            make_trade("A", 50.0, 80.0, 15),
        ];
        let stats = TradeStats::compute(&trades).unwrap();

        assert_relative_eq!(stats.total_pnl, 20.0);
        // 10% - 10% + 60%
        assert_relative_eq!(stats.total_pnl_pct, 60.0, epsilon = 1e-9);
        assert_relative_eq!(stats.avg_pnl_per_trade, 20.0 / 3.0, epsilon = 1e-9);
        assert_relative_eq!(stats.avg_win, 20.0);
        assert_relative_eq!(stats.avg_loss, -20.0);
        assert_relative_eq!(stats.max_win, 30.0);
        assert_relative_eq!(stats.max_loss, -20.0);
        assert_relative_eq!(stats.avg_holding_days, 10.0);
    }

    #[test]
    fn averages_of_missing_side_are_zero() {
        let trades = vec![make_trade("A", 100.0, 110.0, 5), make_trade("A", 100.0, 130.0, 5)];
        let stats = TradeStats::compute(&trades).unwrap();
        assert_eq!(stats.losing_trades, 0);
        assert_eq!(stats.avg_loss, 0.0);
        assert_relative_eq!(stats.avg_win, 20.0);
    }

    #[test]
    fn max_win_and_loss_are_extremes_of_all_trades() {
        let trades = vec![make_trade("A", 100.0, 90.0, 1), make_trade("A", 100.0, 70.0, 1)];
        let stats = TradeStats::compute(&trades).unwrap();
        assert_relative_eq!(stats.max_win, -10.0);
        assert_relative_eq!(stats.max_loss, -30.0);
    }

    #[test]
    fn cumulative_returns_are_prefix_sums() {
        let trades = vec![
            make_trade("A", 100.0, 110.0, 1),
            make_trade("A", 100.0, 95.0, 1),
            make_trade("A", 100.0, 120.0, 1),
        ];
        let stats = TradeStats::compute(&trades).unwrap();

        assert_eq!(stats.cumulative_returns, vec![10.0, 5.0, 25.0]);
        assert_eq!(*stats.cumulative_returns.last().unwrap(), stats.total_pnl);
    }

    #[test]
    fn sharpe_zero_for_single_trade_or_flat_returns() {
        assert_eq!(sharpe_ratio(&[]), 0.0);
        assert_eq!(sharpe_ratio(&[5.0]), 0.0);
        assert_eq!(sharpe_ratio(&[2.0, 2.0, 2.0]), 0.0);
    }

    #[test]
    fn sharpe_zero_for_identical_inexact_returns() {
        assert_eq!(sharpe_ratio(&[0.1, 0.1, 0.1]), 0.0);
        assert_eq!(sharpe_ratio(&[0.7, 0.7, 0.7]), 0.0);
    }

    #[test]
    fn sharpe_uses_population_stddev() {
        // mean 2, population stddev 1
        assert_relative_eq!(sharpe_ratio(&[1.0, 3.0]), 2.0);
        assert_relative_eq!(sharpe_ratio(&[-1.0, -3.0]), -2.0);
    }

    #[test]
    fn symbol_result_keeps_trades() {
        let trades = vec![make_trade("TCS.NS", 100.0, 110.0, 5)];
        let result = SymbolResult::compute("TCS.NS", trades.clone()).unwrap();
        assert_eq!(result.symbol, "TCS.NS");
        assert_eq!(result.trades, trades);
        assert_eq!(result.stats.total_trades, 1);
        assert_eq!(result.stats.sharpe_ratio, 0.0);
    }

    #[test]
    fn portfolio_pools_trades_not_symbol_averages() {
        let a = vec![make_trade("A", 100.0, 125.0, 2), make_trade("A", 100.0, 125.0, 4)];
        let b = vec![
            make_trade("B", 100.0, 95.0, 1),
            make_trade("B", 100.0, 97.0, 3),
            make_trade("B", 100.0, 98.0, 5),
        ];
        let mut results = BTreeMap::new();
        results.insert("A".to_string(), SymbolResult::compute("A", a).unwrap());
        results.insert("B".to_string(), SymbolResult::compute("B", b).unwrap());

        let portfolio = PortfolioResult::compute(&results).unwrap();
        assert_eq!(portfolio.stats.total_trades, 5);
        assert_relative_eq!(portfolio.stats.total_pnl, 40.0);
        assert_relative_eq!(portfolio.stats.win_rate, 40.0);
        assert_eq!(portfolio.symbols_traded, vec!["A", "B"]);
        assert_relative_eq!(
            *portfolio.stats.cumulative_returns.last().unwrap(),
            portfolio.stats.total_pnl
        );
    }

    #[test]
    fn portfolio_orders_pooled_trades_by_exit() {
        let mut results = BTreeMap::new();
        results.insert(
            "A".to_string(),
            SymbolResult::compute("A", vec![make_trade("A", 100.0, 110.0, 9)]).unwrap(),
        );
        results.insert(
            "B".to_string(),
            SymbolResult::compute("B", vec![make_trade("B", 100.0, 90.0, 2)]).unwrap(),
        );

        let portfolio = PortfolioResult::compute(&results).unwrap();
        assert_eq!(portfolio.stats.cumulative_returns, vec![-10.0, 0.0]);
    }

    #[test]
    fn empty_portfolio_is_none() {
        assert!(PortfolioResult::compute(&BTreeMap::new()).is_none());
    }
}
