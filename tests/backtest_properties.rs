//! Property tests for simulator and aggregator invariants.
//!
//! Uses proptest to verify:
//! 1. Trades alternate and never overlap; input order does not matter
//! 2. Replaying the same signals gives the same trades
//! 3. Win/loss counts, win rate and cumulative P&L agree with the trades
//! 4. Portfolio totals equal the sum of per-symbol results

use chrono::{Duration, NaiveDate};
use proptest::prelude::*;
use sigtrader::domain::backtest::run_backtest;
use sigtrader::domain::metrics::TradeStats;
use sigtrader::domain::signal::{Signal, SignalType};
use sigtrader::domain::simulator::simulate_trades;
use std::collections::BTreeMap;

// ── Strategies ───────────────────────────────────────────────────────

fn arb_price() -> impl Strategy<Value = f64> {
    (1.0..1000.0_f64).prop_map(|p| (p * 100.0).round() / 100.0)
}

/// Signals on distinct days, in date order.
fn arb_signals(symbol: &'static str) -> impl Strategy<Value = Vec<Signal>> {
    prop::collection::btree_map(0i64..730, (any::<bool>(), arb_price()), 0..40).prop_map(
        move |days| {
            let base = NaiveDate::from_ymd_opt(2022, 1, 3).unwrap();
            days.into_iter()
                .map(|(offset, (is_buy, price))| {
                    let kind = if is_buy {
                        SignalType::Buy
                    } else {
                        SignalType::Sell
                    };
                    Signal::new(symbol, kind, base + Duration::days(offset), price)
                })
                .collect()
        },
    )
}

fn arb_universe() -> impl Strategy<Value = BTreeMap<String, Vec<Signal>>> {
    (arb_signals("AAA"), arb_signals("BBB"), arb_signals("CCC")).prop_map(|(a, b, c)| {
        let mut universe = BTreeMap::new();
        universe.insert("AAA".to_string(), a);
        universe.insert("BBB".to_string(), b);
        universe.insert("CCC".to_string(), c);
        universe
    })
}

// ── 1. Trade sequencing ──────────────────────────────────────────────

proptest! {
    /// Each trade opens before it closes and the next one opens after it.
    #[test]
    fn trades_do_not_overlap(signals in arb_signals("AAA")) {
        let trades = simulate_trades("AAA", &signals).unwrap();
        let buys = signals.iter().filter(|s| s.is_buy()).count();
        prop_assert!(trades.len() <= buys);

        for trade in &trades {
            prop_assert!(trade.entry_date < trade.exit_date);
            prop_assert!(trade.holding_days > 0);
        }
        for pair in trades.windows(2) {
            prop_assert!(pair[0].exit_date < pair[1].entry_date);
        }
    }

    /// Reversing the input does not change the trades when dates are distinct.
    #[test]
    fn input_order_is_irrelevant(signals in arb_signals("AAA")) {
        let forward = simulate_trades("AAA", &signals).unwrap();
        let mut reversed = signals.clone();
        reversed.reverse();
        prop_assert_eq!(forward, simulate_trades("AAA", &reversed).unwrap());
    }
}

// ── 2. Idempotence ───────────────────────────────────────────────────

proptest! {
    #[test]
    fn replay_is_deterministic(universe in arb_universe()) {
        let first = run_backtest(&universe, false);
        let second = run_backtest(&universe, false);
        prop_assert_eq!(&first, &second);
        prop_assert_eq!(first, run_backtest(&universe, true));
    }
}

// ── 3. Statistics ────────────────────────────────────────────────────

proptest! {
    #[test]
    fn stats_agree_with_trades(signals in arb_signals("AAA")) {
        let trades = simulate_trades("AAA", &signals).unwrap();
        let Some(stats) = TradeStats::compute(&trades) else {
            prop_assert!(trades.is_empty());
            return Ok(());
        };

        prop_assert_eq!(stats.total_trades, trades.len());
        prop_assert_eq!(stats.winning_trades + stats.losing_trades, stats.total_trades);
        prop_assert_eq!(
            stats.winning_trades,
            trades.iter().filter(|t| t.pnl > 0.0).count()
        );

        let expected_rate = stats.winning_trades as f64 / stats.total_trades as f64 * 100.0;
        prop_assert!((stats.win_rate - expected_rate).abs() < 1e-9);
        prop_assert!((0.0..=100.0).contains(&stats.win_rate));

        prop_assert_eq!(stats.cumulative_returns.len(), stats.total_trades);
        let last = *stats.cumulative_returns.last().unwrap();
        prop_assert_eq!(last, stats.total_pnl);

        prop_assert!(stats.max_win >= stats.max_loss);
        prop_assert!(stats.sharpe_ratio.is_finite());
    }
}

// ── 4. Portfolio aggregation ─────────────────────────────────────────

proptest! {
    #[test]
    fn portfolio_sums_symbol_results(universe in arb_universe()) {
        let report = run_backtest(&universe, false);
        prop_assert!(report.failures.is_empty());

        let Some(portfolio) = report.portfolio else {
            prop_assert!(report.results.is_empty());
            return Ok(());
        };

        let trades: usize = report.results.values().map(|r| r.stats.total_trades).sum();
        let pnl: f64 = report.results.values().map(|r| r.stats.total_pnl).sum();
        let wins: usize = report.results.values().map(|r| r.stats.winning_trades).sum();

        prop_assert_eq!(portfolio.stats.total_trades, trades);
        prop_assert_eq!(portfolio.stats.winning_trades, wins);
        prop_assert!((portfolio.stats.total_pnl - pnl).abs() < 1e-6);
        prop_assert_eq!(
            portfolio.symbols_traded,
            report.results.keys().cloned().collect::<Vec<_>>()
        );
    }
}
