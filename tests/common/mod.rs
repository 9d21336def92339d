#![allow(dead_code)]

use chrono::NaiveDate;
use sigtrader::domain::error::SigtraderError;
use sigtrader::domain::metrics::{PortfolioResult, SymbolResult};
pub use sigtrader::domain::ohlcv::OhlcvBar;
use sigtrader::domain::signal::{Signal, SignalType};
use sigtrader::domain::trading_config::{
    AlertSettings, IndicatorParams, SignalParams, SignalPolicy, TradingConfig,
};
use sigtrader::ports::alert_port::AlertPort;
use sigtrader::ports::data_port::DataPort;
use sigtrader::ports::trade_log_port::TradeLogPort;
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

/// Closes that, with RSI(3), SMA(2)/SMA(4) and 40/60 thresholds, give a BUY
/// on index 9 (close 96, 2024-01-10) and a SELL on index 13 (close 100,
/// 2024-01-14). The last bar of the full series carries no live signal.
pub const SIGNAL_CLOSES: [f64; 30] = [
    100.0, 101.0, 100.0, 99.0, 103.0, 101.0, 98.0, 95.0, 99.0, 96.0, 98.0, 100.0, 97.0, 100.0,
    103.0, 100.0, 103.0, 99.0, 101.0, 100.0, 101.0, 102.0, 105.0, 103.0, 106.0, 105.0, 109.0,
    107.0, 103.0, 105.0,
];

pub struct MockDataPort {
    pub data: HashMap<String, Vec<OhlcvBar>>,
    pub errors: HashMap<String, String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_bars(mut self, symbol: &str, bars: Vec<OhlcvBar>) -> Self {
        self.data.insert(symbol.to_string(), bars);
        self
    }

    pub fn with_error(mut self, symbol: &str, reason: &str) -> Self {
        self.errors.insert(symbol.to_string(), reason.to_string());
        self
    }
}

impl DataPort for MockDataPort {
    fn fetch_ohlcv(
        &self,
        symbol: &str,
        _start_date: NaiveDate,
        _end_date: NaiveDate,
    ) -> Result<Vec<OhlcvBar>, SigtraderError> {
        if let Some(reason) = self.errors.get(symbol) {
            return Err(SigtraderError::Data {
                reason: reason.clone(),
            });
        }
        Ok(self.data.get(symbol).cloned().unwrap_or_default())
    }

    fn list_symbols(&self) -> Result<Vec<String>, SigtraderError> {
        let mut symbols: Vec<String> = self.data.keys().cloned().collect();
        symbols.sort();
        Ok(symbols)
    }

    fn get_data_range(
        &self,
        symbol: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, SigtraderError> {
        Ok(self.data.get(symbol).and_then(|bars| {
            let first = bars.first()?.date;
            let last = bars.last()?.date;
            Some((first, last, bars.len()))
        }))
    }
}

pub fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

pub fn make_bar(symbol: &str, date: NaiveDate, close: f64) -> OhlcvBar {
    OhlcvBar {
        symbol: symbol.to_string(),
        date,
        open: close - 1.0,
        high: close + 1.0,
        low: close - 2.0,
        close,
        volume: 1000,
    }
}

/// One bar per calendar day starting 2024-01-01.
pub fn bars_from_closes(symbol: &str, closes: &[f64]) -> Vec<OhlcvBar> {
    let start = date("2024-01-01");
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| make_bar(symbol, start + chrono::Duration::days(i as i64), close))
        .collect()
}

pub fn signal(symbol: &str, signal_type: SignalType, on: &str, price: f64) -> Signal {
    Signal::new(symbol, signal_type, date(on), price)
}

pub fn buy(symbol: &str, on: &str, price: f64) -> Signal {
    signal(symbol, SignalType::Buy, on, price)
}

pub fn sell(symbol: &str, on: &str, price: f64) -> Signal {
    signal(symbol, SignalType::Sell, on, price)
}

/// Indicator windows matching [`SIGNAL_CLOSES`].
pub fn test_config(symbols: &[&str]) -> TradingConfig {
    TradingConfig {
        symbols: symbols.iter().map(|s| s.to_string()).collect(),
        lookback_days: 60,
        end_date: date("2024-01-30"),
        indicators: IndicatorParams {
            rsi_period: 3,
            sma_short: 2,
            sma_long: 4,
        },
        signals: SignalParams {
            rsi_oversold: 40.0,
            rsi_overbought: 60.0,
            policy: SignalPolicy::CrossoverBar,
        },
        data_dir: PathBuf::from("data"),
        output_dir: PathBuf::from("output"),
        charts: false,
        parallel: false,
        alerts: AlertSettings {
            enabled: false,
            bot_token: None,
            chat_id: None,
        },
    }
}

#[derive(Default)]
pub struct RecordingTradeLog {
    pub trades: RefCell<Vec<String>>,
    pub pnl_symbols: RefCell<Vec<String>>,
    pub portfolios: RefCell<Vec<PortfolioResult>>,
    pub current: RefCell<Vec<Signal>>,
}

impl TradeLogPort for RecordingTradeLog {
    fn log_trades(&self, results: &BTreeMap<String, SymbolResult>) -> Result<(), SigtraderError> {
        for result in results.values() {
            for trade in &result.trades {
                self.trades
                    .borrow_mut()
                    .push(format!("{} {} {}", trade.symbol, trade.entry_date, trade.exit_date));
            }
        }
        Ok(())
    }

    fn log_pnl_summary(
        &self,
        results: &BTreeMap<String, SymbolResult>,
    ) -> Result<(), SigtraderError> {
        self.pnl_symbols
            .borrow_mut()
            .extend(results.keys().cloned());
        Ok(())
    }

    fn log_portfolio_summary(&self, portfolio: &PortfolioResult) -> Result<(), SigtraderError> {
        self.portfolios.borrow_mut().push(portfolio.clone());
        Ok(())
    }

    fn log_current_signals(
        &self,
        signals: &BTreeMap<String, Signal>,
    ) -> Result<(), SigtraderError> {
        self.current.borrow_mut().extend(signals.values().cloned());
        Ok(())
    }
}

/// Every call fails, as an unreachable spreadsheet would.
pub struct FailingTradeLog;

impl TradeLogPort for FailingTradeLog {
    fn log_trades(&self, _: &BTreeMap<String, SymbolResult>) -> Result<(), SigtraderError> {
        Err(SigtraderError::Sink {
            sink: "trade log",
            reason: "offline".into(),
        })
    }

    fn log_pnl_summary(&self, _: &BTreeMap<String, SymbolResult>) -> Result<(), SigtraderError> {
        Err(SigtraderError::Sink {
            sink: "trade log",
            reason: "offline".into(),
        })
    }

    fn log_portfolio_summary(&self, _: &PortfolioResult) -> Result<(), SigtraderError> {
        Err(SigtraderError::Sink {
            sink: "trade log",
            reason: "offline".into(),
        })
    }

    fn log_current_signals(&self, _: &BTreeMap<String, Signal>) -> Result<(), SigtraderError> {
        Err(SigtraderError::Sink {
            sink: "trade log",
            reason: "offline".into(),
        })
    }
}

#[derive(Default)]
pub struct RecordingAlerts {
    pub messages: RefCell<Vec<String>>,
}

impl AlertPort for RecordingAlerts {
    fn send(&self, message: &str) -> Result<(), SigtraderError> {
        self.messages.borrow_mut().push(message.to_string());
        Ok(())
    }
}
