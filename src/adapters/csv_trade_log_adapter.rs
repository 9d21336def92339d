//! Append-only CSV trade log, one file per worksheet.

use chrono::{Local, NaiveDateTime};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::domain::error::SigtraderError;
use crate::domain::metrics::{PortfolioResult, SymbolResult};
use crate::domain::signal::{Signal, SignalType};
use crate::ports::trade_log_port::TradeLogPort;

pub const TRADES_FILE: &str = "trades.csv";
pub const PNL_SUMMARY_FILE: &str = "pnl_summary.csv";
pub const PORTFOLIO_SUMMARY_FILE: &str = "portfolio_summary.csv";
pub const CURRENT_SIGNALS_FILE: &str = "current_signals.csv";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Serialize)]
struct TradeRow<'a> {
    logged_at: &'a str,
    symbol: &'a str,
    entry_date: String,
    entry_price: f64,
    exit_date: String,
    exit_price: f64,
    pnl: f64,
    pnl_pct: f64,
    holding_days: i64,
    result: &'static str,
}

#[derive(Serialize)]
struct PnlRow<'a> {
    logged_at: &'a str,
    symbol: &'a str,
    total_trades: usize,
    winning_trades: usize,
    losing_trades: usize,
    win_rate: f64,
    total_pnl: f64,
    total_pnl_pct: f64,
    avg_pnl_per_trade: f64,
    max_win: f64,
    max_loss: f64,
    avg_holding_days: f64,
    sharpe_ratio: f64,
}

#[derive(Serialize)]
struct PortfolioRow<'a> {
    logged_at: &'a str,
    total_trades: usize,
    winning_trades: usize,
    losing_trades: usize,
    win_rate: f64,
    total_pnl: f64,
    total_pnl_pct: f64,
    avg_pnl_per_trade: f64,
    sharpe_ratio: f64,
    symbols_traded: String,
}

#[derive(Serialize)]
struct SignalRow<'a> {
    logged_at: &'a str,
    symbol: &'a str,
    #[serde(rename = "type")]
    signal_type: SignalType,
    date: String,
    price: f64,
    rsi: Option<f64>,
    reason: &'a str,
}

pub struct CsvTradeLogAdapter {
    dir: PathBuf,
    fixed_time: Option<NaiveDateTime>,
}

impl CsvTradeLogAdapter {
    pub fn new(dir: PathBuf) -> Self {
        Self {
            dir,
            fixed_time: None,
        }
    }

    /// Stamps every row with `time` instead of the wall clock.
    pub fn with_timestamp(dir: PathBuf, time: NaiveDateTime) -> Self {
        Self {
            dir,
            fixed_time: Some(time),
        }
    }

    pub fn path_for(&self, file: &str) -> PathBuf {
        self.dir.join(file)
    }

    fn timestamp(&self) -> String {
        self.fixed_time
            .unwrap_or_else(|| Local::now().naive_local())
            .format(TIMESTAMP_FORMAT)
            .to_string()
    }

    fn append<R: Serialize>(&self, file: &str, rows: &[R]) -> Result<(), SigtraderError> {
        if rows.is_empty() {
            return Ok(());
        }
        let path = self.path_for(file);
        append_rows(&path, rows).map_err(|e| SigtraderError::Sink {
            sink: "trade log",
            reason: format!("{}: {}", path.display(), e),
        })?;
        info!(file, rows = rows.len(), "appended to trade log");
        Ok(())
    }
}

fn append_rows<R: Serialize>(path: &Path, rows: &[R]) -> Result<(), csv::Error> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let is_new = fs::metadata(path).map(|m| m.len() == 0).unwrap_or(true);
    let file = OpenOptions::new().create(true).append(true).open(path)?;

    let mut writer = csv::WriterBuilder::new()
        .has_headers(is_new)
        .from_writer(file);
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

impl TradeLogPort for CsvTradeLogAdapter {
    fn log_trades(&self, results: &BTreeMap<String, SymbolResult>) -> Result<(), SigtraderError> {
        let logged_at = self.timestamp();
        let rows: Vec<TradeRow> = results
            .iter()
            .flat_map(|(symbol, result)| {
                let logged_at = logged_at.as_str();
                result.trades.iter().map(move |t| TradeRow {
                    logged_at,
                    symbol,
                    entry_date: t.entry_date.to_string(),
                    entry_price: t.entry_price,
                    exit_date: t.exit_date.to_string(),
                    exit_price: t.exit_price,
                    pnl: t.pnl,
                    pnl_pct: t.pnl_pct,
                    holding_days: t.holding_days,
                    result: t.outcome(),
                })
            })
            .collect();
        self.append(TRADES_FILE, &rows)
    }

    fn log_pnl_summary(
        &self,
        results: &BTreeMap<String, SymbolResult>,
    ) -> Result<(), SigtraderError> {
        let logged_at = self.timestamp();
        let rows: Vec<PnlRow> = results
            .iter()
            .map(|(symbol, result)| {
                let s = &result.stats;
                PnlRow {
                    logged_at: &logged_at,
                    symbol,
                    total_trades: s.total_trades,
                    winning_trades: s.winning_trades,
                    losing_trades: s.losing_trades,
                    win_rate: s.win_rate,
                    total_pnl: s.total_pnl,
                    total_pnl_pct: s.total_pnl_pct,
                    avg_pnl_per_trade: s.avg_pnl_per_trade,
                    max_win: s.max_win,
                    max_loss: s.max_loss,
                    avg_holding_days: s.avg_holding_days,
                    sharpe_ratio: s.sharpe_ratio,
                }
            })
            .collect();
        self.append(PNL_SUMMARY_FILE, &rows)
    }

    fn log_portfolio_summary(&self, portfolio: &PortfolioResult) -> Result<(), SigtraderError> {
        let logged_at = self.timestamp();
        let s = &portfolio.stats;
        let row = PortfolioRow {
            logged_at: &logged_at,
            total_trades: s.total_trades,
            winning_trades: s.winning_trades,
            losing_trades: s.losing_trades,
            win_rate: s.win_rate,
            total_pnl: s.total_pnl,
            total_pnl_pct: s.total_pnl_pct,
            avg_pnl_per_trade: s.avg_pnl_per_trade,
            sharpe_ratio: s.sharpe_ratio,
            symbols_traded: portfolio.symbols_traded.join(", "),
        };
        self.append(PORTFOLIO_SUMMARY_FILE, &[row])
    }

    fn log_current_signals(
        &self,
        signals: &BTreeMap<String, Signal>,
    ) -> Result<(), SigtraderError> {
        let logged_at = self.timestamp();
        let rows: Vec<SignalRow> = signals
            .iter()
            .map(|(symbol, signal)| SignalRow {
                logged_at: &logged_at,
                symbol,
                signal_type: signal.signal_type,
                date: signal.date.to_string(),
                price: signal.price,
                rsi: signal.snapshot.rsi,
                reason: &signal.snapshot.reason,
            })
            .collect();
        self.append(CURRENT_SIGNALS_FILE, &rows)
    }
}
