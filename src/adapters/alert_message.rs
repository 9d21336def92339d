//! Alert message bodies in the Telegram HTML subset.

use chrono::NaiveDateTime;
use std::collections::BTreeMap;

use crate::domain::metrics::{PortfolioResult, SymbolResult};
use crate::domain::signal::{Signal, SignalType};

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const TOP_PERFORMERS: usize = 3;

pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn fmt_opt(value: Option<f64>) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| format!("{v:.2}"))
}

pub fn signal_alert(signal: &Signal, now: NaiveDateTime) -> String {
    let marker = match signal.signal_type {
        SignalType::Buy => "[BUY]",
        SignalType::Sell => "[SELL]",
    };
    format!(
        "{marker} <b>TRADING SIGNAL ALERT</b>\n\n\
         <b>Symbol:</b> {}\n\
         <b>Signal:</b> {}\n\
         <b>Price:</b> {:.2}\n\
         <b>RSI:</b> {}\n\
         <b>Date:</b> {}\n\
         <b>Reason:</b> {}\n\n\
         <i>Alert Time:</i> {}",
        escape_html(&signal.symbol),
        signal.signal_type,
        signal.price,
        fmt_opt(signal.snapshot.rsi),
        signal.date,
        escape_html(&signal.snapshot.reason),
        now.format(TIME_FORMAT),
    )
}

pub fn portfolio_update(portfolio: &PortfolioResult, now: NaiveDateTime) -> String {
    let s = &portfolio.stats;
    format!(
        "<b>PORTFOLIO PERFORMANCE UPDATE</b>\n\n\
         <b>Total Trades:</b> {}\n\
         <b>Winning Trades:</b> {}\n\
         <b>Losing Trades:</b> {}\n\
         <b>Win Rate:</b> {:.2}%\n\n\
         <b>Total P&amp;L:</b> {:.2}\n\
         <b>Total P&amp;L %:</b> {:.2}%\n\
         <b>Avg P&amp;L per Trade:</b> {:.2}\n\
         <b>Sharpe Ratio:</b> {:.2}\n\n\
         <b>Symbols Traded:</b> {}\n\n\
         <i>Last Updated:</i> {}",
        s.total_trades,
        s.winning_trades,
        s.losing_trades,
        s.win_rate,
        s.total_pnl,
        s.total_pnl_pct,
        s.avg_pnl_per_trade,
        s.sharpe_ratio,
        escape_html(&portfolio.symbols_traded.join(", ")),
        now.format(TIME_FORMAT),
    )
}

/// Symbols ranked by total P&L, best first; ties keep symbol order.
pub fn top_performers(
    results: &BTreeMap<String, SymbolResult>,
    n: usize,
) -> Vec<(&str, &SymbolResult)> {
    let mut ranked: Vec<(&str, &SymbolResult)> =
        results.iter().map(|(k, v)| (k.as_str(), v)).collect();
    ranked.sort_by(|a, b| b.1.stats.total_pnl.total_cmp(&a.1.stats.total_pnl));
    ranked.truncate(n);
    ranked
}

pub fn daily_summary(
    results: &BTreeMap<String, SymbolResult>,
    current: &BTreeMap<String, Signal>,
    lookback_days: u32,
    now: NaiveDateTime,
) -> String {
    let buys = current.values().filter(|s| s.is_buy()).count();
    let sells = current.len() - buys;

    let mut message = format!(
        "<b>DAILY TRADING SUMMARY</b>\n\n\
         <b>Current Signals:</b>\n\
         Buy Signals: {buys}\n\
         Sell Signals: {sells}\n\n\
         <b>Top Performers (last {lookback_days} days):</b>\n"
    );

    let top = top_performers(results, TOP_PERFORMERS);
    if top.is_empty() {
        message.push_str("No completed trades in the period.\n");
    }
    for (rank, (symbol, result)) in top.iter().enumerate() {
        message.push_str(&format!(
            "{}. {}: {:.2} ({:.2}%)\n",
            rank + 1,
            escape_html(symbol),
            result.stats.total_pnl,
            result.stats.total_pnl_pct,
        ));
    }

    message.push_str(&format!(
        "\n<i>Report Time:</i> {}",
        now.format(TIME_FORMAT)
    ));
    message
}

pub fn error_alert(error: &str, now: NaiveDateTime) -> String {
    format!(
        "<b>SYSTEM ERROR ALERT</b>\n\n\
         <b>Error:</b> {}\n\n\
         <i>Time:</i> {}",
        escape_html(error),
        now.format(TIME_FORMAT),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::position::Trade;
    use chrono::NaiveDate;

    fn date(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, m, d).unwrap()
    }

    fn now() -> NaiveDateTime {
        date(6, 30).and_hms_opt(9, 15, 0).unwrap()
    }

    fn result(symbol: &str, exit: f64) -> SymbolResult {
        let trade = Trade::close(symbol, date(1, 1), 100.0, date(1, 11), exit);
        SymbolResult::compute(symbol, vec![trade]).unwrap()
    }

    #[test]
    fn signal_alert_contains_fields() {
        let mut signal = Signal::new("TCS.NS", SignalType::Buy, date(6, 28), 3512.456);
        signal.snapshot.rsi = Some(27.123);
        signal.snapshot.reason = "RSI oversold (27.12) & SMA crossover bullish".into();

        let text = signal_alert(&signal, now());

        assert!(text.starts_with("[BUY] <b>TRADING SIGNAL ALERT</b>"));
        assert!(text.contains("<b>Price:</b> 3512.46"));
        assert!(text.contains("<b>RSI:</b> 27.12"));
        assert!(text.contains("<b>Date:</b> 2024-06-28"));
        assert!(text.contains("&amp; SMA crossover bullish"));
        assert!(text.ends_with("2024-06-30 09:15:00"));
    }

    #[test]
    fn signal_alert_without_rsi() {
        let signal = Signal::new("TCS.NS", SignalType::Sell, date(6, 28), 10.0);
        assert!(signal_alert(&signal, now()).contains("<b>RSI:</b> n/a"));
    }

    #[test]
    fn portfolio_update_lists_symbols() {
        let mut results = BTreeMap::new();
        results.insert("A".to_string(), result("A", 150.0));
        results.insert("B".to_string(), result("B", 90.0));
        let portfolio = PortfolioResult::compute(&results).unwrap();

        let text = portfolio_update(&portfolio, now());

        assert!(text.contains("<b>Total Trades:</b> 2"));
        assert!(text.contains("<b>Win Rate:</b> 50.00%"));
        assert!(text.contains("<b>Total P&amp;L:</b> 40.00"));
        assert!(text.contains("<b>Symbols Traded:</b> A, B"));
    }

    #[test]
    fn daily_summary_ranks_top_three() {
        let mut results = BTreeMap::new();
        results.insert("A".to_string(), result("A", 105.0));
        results.insert("B".to_string(), result("B", 130.0));
        results.insert("C".to_string(), result("C", 95.0));
        results.insert("D".to_string(), result("D", 120.0));
        let current = BTreeMap::from([
            (
                "A".to_string(),
                Signal::new("A", SignalType::Buy, date(6, 30), 1.0),
            ),
            (
                "B".to_string(),
                Signal::new("B", SignalType::Sell, date(6, 30), 1.0),
            ),
            (
                "C".to_string(),
                Signal::new("C", SignalType::Buy, date(6, 30), 1.0),
            ),
        ]);

        let text = daily_summary(&results, &current, 180, now());

        assert!(text.contains("Buy Signals: 2\nSell Signals: 1"));
        assert!(text.contains("last 180 days"));
        assert!(text.contains("1. B: 30.00 (30.00%)\n2. D: 20.00 (20.00%)\n3. A: 5.00 (5.00%)\n"));
        assert!(!text.contains("C: -5.00"));
    }

    #[test]
    fn daily_summary_without_trades() {
        let text = daily_summary(&BTreeMap::new(), &BTreeMap::new(), 90, now());
        assert!(text.contains("No completed trades in the period."));
    }

    #[test]
    fn error_alert_escapes_markup() {
        let text = error_alert("bad <input>", now());
        assert!(text.contains("<b>Error:</b> bad &lt;input&gt;"));
    }
}
