//! CLI definition, pipeline stages and dispatch.

use chrono::{Local, NaiveDateTime};
use clap::{Parser, Subcommand};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{info, warn};

use crate::adapters::alert_message;
use crate::adapters::chart_svg::SvgChartAdapter;
use crate::adapters::console_alert_adapter::ConsoleAlertAdapter;
use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::csv_trade_log_adapter::CsvTradeLogAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::signal_csv_adapter::{SignalFile, read_signal_file};
#[cfg(feature = "telegram")]
use crate::adapters::telegram_adapter::TelegramAdapter;
use crate::domain::backtest::{BacktestReport, SymbolFailure, run_backtest};
use crate::domain::config_validation::build_trading_config;
use crate::domain::error::SigtraderError;
use crate::domain::indicator_helpers::{IndicatorBar, annotate_bars, current_indicators};
use crate::domain::metrics::TradeStats;
use crate::domain::signal::Signal;
use crate::domain::signal_rules::{SignalRules, recent_signals, summarize};
use crate::domain::trading_config::{AlertSettings, TradingConfig};
use crate::domain::universe::{SkippedSymbol, load_universe, minimum_bars, parse_symbols};
use crate::ports::alert_port::AlertPort;
use crate::ports::chart_port::ChartPort;
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use crate::ports::trade_log_port::TradeLogPort;

/// Days of history shown as "recent" by the daily check.
pub const RECENT_SIGNAL_DAYS: i64 = 5;

const RULE: &str = "============================================================";

#[derive(Parser, Debug)]
#[command(
    name = "sigtrader",
    version,
    about = "Rule-based equity signal generator and backtester"
)]
pub struct Cli {
    /// INI configuration file
    #[arg(short, long, global = true, default_value = "config.ini")]
    pub config: PathBuf,

    /// Log filter such as `info` or `sigtrader=debug`; overrides RUST_LOG
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Indicators, historical signals, backtest, trade log, alerts and charts
    Analysis {
        /// Comma-separated symbols replacing [trading] stocks
        #[arg(long)]
        stocks: Option<String>,
        #[arg(long)]
        no_charts: bool,
    },
    /// Check the latest bar of each symbol and alert on live signals
    Daily {
        #[arg(long)]
        stocks: Option<String>,
    },
    /// Backtest signals read from a CSV file
    Backtest {
        #[arg(short, long)]
        signals: PathBuf,
    },
    /// Validate the configuration file
    Validate,
    /// Show stored price history per symbol
    Info {
        #[arg(long)]
        stocks: Option<String>,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    let result = match cli.command {
        Command::Analysis { stocks, no_charts } => {
            run_analysis(&cli.config, stocks.as_deref(), no_charts)
        }
        Command::Daily { stocks } => run_daily(&cli.config, stocks.as_deref()),
        Command::Backtest { signals } => run_signal_backtest(&cli.config, &signals),
        Command::Validate => run_validate(&cli.config),
        Command::Info { stocks } => run_info(&cli.config, stocks.as_deref()),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

/// Output ports for a pipeline run. `None` disables that sink.
#[derive(Default, Clone, Copy)]
pub struct Sinks<'a> {
    pub trade_log: Option<&'a dyn TradeLogPort>,
    pub alerts: Option<&'a dyn AlertPort>,
    pub charts: Option<&'a dyn ChartPort>,
}

#[derive(Debug)]
pub struct AnalysisOutcome {
    pub annotated: BTreeMap<String, Vec<IndicatorBar>>,
    pub signals: BTreeMap<String, Vec<Signal>>,
    pub current: BTreeMap<String, Signal>,
    pub report: BacktestReport,
    pub skipped: Vec<SkippedSymbol>,
}

#[derive(Debug)]
pub struct DailyOutcome {
    pub current: BTreeMap<String, Signal>,
    pub recent: BTreeMap<String, Vec<Signal>>,
    pub skipped: Vec<SkippedSymbol>,
}

pub fn load_trading_config(
    path: &Path,
    stocks_override: Option<&str>,
) -> Result<TradingConfig, SigtraderError> {
    info!("loading config from {}", path.display());
    let adapter = FileConfigAdapter::from_file(path)?;
    let mut config = build_trading_config(&adapter)?;
    if let Some(stocks) = stocks_override {
        config.symbols = parse_symbols(stocks).map_err(|e| SigtraderError::ConfigInvalid {
            section: "cli".to_string(),
            key: "stocks".to_string(),
            reason: e.to_string(),
        })?;
    }
    Ok(config)
}

/// Telegram when compiled in and configured, otherwise the console.
pub fn build_alerts(settings: &AlertSettings) -> Result<Option<Box<dyn AlertPort>>, SigtraderError> {
    if !settings.enabled {
        return Ok(None);
    }

    #[cfg(feature = "telegram")]
    {
        if let (Some(token), Some(chat_id)) = (&settings.bot_token, &settings.chat_id) {
            return Ok(Some(Box::new(TelegramAdapter::new(token, chat_id)?)));
        }
    }

    #[cfg(not(feature = "telegram"))]
    {
        warn!("built without the telegram feature; alerts go to stdout");
    }

    Ok(Some(Box::new(ConsoleAlertAdapter::stdout())))
}

fn report_sink_failure<T>(result: Result<T, SigtraderError>, what: &str) {
    if let Err(error) = result {
        warn!(%error, "{what} failed");
    }
}

fn annotate_all(
    bars: &BTreeMap<String, Vec<crate::domain::ohlcv::OhlcvBar>>,
    config: &TradingConfig,
) -> BTreeMap<String, Vec<IndicatorBar>> {
    bars.iter()
        .map(|(symbol, bars)| (symbol.clone(), annotate_bars(bars, &config.indicators)))
        .collect()
}

pub fn run_analysis_pipeline(
    data_port: &dyn DataPort,
    config: &TradingConfig,
    sinks: &Sinks,
    now: NaiveDateTime,
) -> Result<AnalysisOutcome, SigtraderError> {
    // Stage 1: Price history
    info!(symbols = config.symbols.len(), "fetching price history");
    let universe = load_universe(
        data_port,
        &config.symbols,
        config.start_date(),
        config.end_date,
        minimum_bars(&config.indicators),
    )?;

    // Stage 2: Indicators
    let annotated = annotate_all(&universe.bars, config);

    // Stage 3: Historical and current signals
    let rules = SignalRules::new(config.signals);
    let signals = rules.generate_all(&annotated);
    let current = rules.check_current(&current_indicators(&annotated));
    info!(
        historical = signals.values().map(Vec::len).sum::<usize>(),
        current = current.len(),
        "signals generated"
    );

    // Stage 4: Backtest
    let report = run_backtest(&signals, config.parallel);

    // Stage 5: Sinks
    if let Some(log) = sinks.trade_log {
        report_sink_failure(log.log_trades(&report.results), "trade logging");
        report_sink_failure(log.log_pnl_summary(&report.results), "P&L summary logging");
        if let Some(portfolio) = &report.portfolio {
            report_sink_failure(
                log.log_portfolio_summary(portfolio),
                "portfolio summary logging",
            );
        }
        report_sink_failure(log.log_current_signals(&current), "current signal logging");
    }

    if let Some(alerts) = sinks.alerts {
        for signal in current.values() {
            report_sink_failure(
                alerts.send(&alert_message::signal_alert(signal, now)),
                "signal alert",
            );
        }
        if let Some(portfolio) = &report.portfolio {
            report_sink_failure(
                alerts.send(&alert_message::portfolio_update(portfolio, now)),
                "portfolio alert",
            );
        }
        report_sink_failure(
            alerts.send(&alert_message::daily_summary(
                &report.results,
                &current,
                config.lookback_days,
                now,
            )),
            "daily summary alert",
        );
    }

    if let Some(charts) = sinks.charts {
        render_charts(charts, &report, &annotated, &signals, now);
    }

    Ok(AnalysisOutcome {
        annotated,
        signals,
        current,
        report,
        skipped: universe.skipped,
    })
}

fn render_charts(
    charts: &dyn ChartPort,
    report: &BacktestReport,
    annotated: &BTreeMap<String, Vec<IndicatorBar>>,
    signals: &BTreeMap<String, Vec<Signal>>,
    now: NaiveDateTime,
) {
    let stamp = now.format("%Y%m%d_%H%M%S");

    if !report.results.is_empty() {
        report_sink_failure(
            charts.plot_portfolio_performance(
                &report.results,
                &format!("portfolio_performance_{stamp}"),
            ),
            "portfolio chart",
        );
        report_sink_failure(
            charts.plot_cumulative_returns(&report.results, &format!("cumulative_returns_{stamp}")),
            "cumulative returns chart",
        );
        report_sink_failure(
            charts.plot_win_loss_distribution(
                &report.results,
                &format!("win_loss_distribution_{stamp}"),
            ),
            "distribution chart",
        );
    }

    for (symbol, bars) in annotated.iter().filter(|(_, bars)| !bars.is_empty()) {
        let symbol_signals = signals.get(symbol).map(Vec::as_slice).unwrap_or_default();
        report_sink_failure(
            charts.plot_stock_with_signals(
                symbol,
                bars,
                symbol_signals,
                &format!("{symbol}_signals_{stamp}"),
            ),
            "stock chart",
        );
    }
}

pub fn run_daily_pipeline(
    data_port: &dyn DataPort,
    config: &TradingConfig,
    alerts: Option<&dyn AlertPort>,
    now: NaiveDateTime,
) -> Result<DailyOutcome, SigtraderError> {
    let universe = load_universe(
        data_port,
        &config.symbols,
        config.start_date(),
        config.end_date,
        minimum_bars(&config.indicators),
    )?;
    let annotated = annotate_all(&universe.bars, config);

    let rules = SignalRules::new(config.signals);
    let current = rules.check_current(&current_indicators(&annotated));
    let recent = recent_signals(
        &rules.generate_all(&annotated),
        config.end_date,
        RECENT_SIGNAL_DAYS,
    );

    if let Some(alerts) = alerts {
        for signal in current.values() {
            report_sink_failure(
                alerts.send(&alert_message::signal_alert(signal, now)),
                "signal alert",
            );
        }
    }
    info!(signals = current.len(), "daily check completed");

    Ok(DailyOutcome {
        current,
        recent,
        skipped: universe.skipped,
    })
}

/// Backtests a parsed signal file; rows rejected while parsing become failures.
pub fn backtest_signal_file(file: SignalFile, parallel: bool) -> BacktestReport {
    let mut report = run_backtest(&file.signals, parallel);
    report.failures.extend(
        file.rejected
            .into_iter()
            .map(|(symbol, error)| SymbolFailure { symbol, error }),
    );
    report.failures.sort_by(|a, b| a.symbol.cmp(&b.symbol));
    report
}

fn run_analysis(config_path: &Path, stocks: Option<&str>, no_charts: bool) -> Result<(), SigtraderError> {
    let config = load_trading_config(config_path, stocks)?;
    let now = Local::now().naive_local();

    let data_port = CsvAdapter::new(config.data_dir.clone());
    let trade_log = CsvTradeLogAdapter::new(config.output_dir.clone());
    let charts = SvgChartAdapter::new(config.output_dir.join("charts"));
    let alerts = build_alerts(&config.alerts)?;
    let sinks = Sinks {
        trade_log: Some(&trade_log),
        alerts: alerts.as_deref(),
        charts: (config.charts && !no_charts).then_some(&charts as &dyn ChartPort),
    };

    match run_analysis_pipeline(&data_port, &config, &sinks, now) {
        Ok(outcome) => {
            print!("{}", format_analysis_summary(&outcome));
            Ok(())
        }
        Err(e) => {
            if let Some(alerts) = sinks.alerts {
                report_sink_failure(
                    alerts.send(&alert_message::error_alert(&e.to_string(), now)),
                    "error alert",
                );
            }
            Err(e)
        }
    }
}

fn run_daily(config_path: &Path, stocks: Option<&str>) -> Result<(), SigtraderError> {
    let config = load_trading_config(config_path, stocks)?;
    let data_port = CsvAdapter::new(config.data_dir.clone());
    let alerts = build_alerts(&config.alerts)?;

    let outcome = run_daily_pipeline(
        &data_port,
        &config,
        alerts.as_deref(),
        Local::now().naive_local(),
    )?;
    print!("{}", format_daily_summary(&outcome));
    Ok(())
}

/// Output directory and parallelism for `backtest`; defaults when the file is absent.
fn backtest_settings(config_path: &Path) -> Result<(PathBuf, bool), SigtraderError> {
    if !config_path.exists() {
        return Ok((PathBuf::from("output"), false));
    }
    let adapter = FileConfigAdapter::from_file(config_path)?;
    let dir = adapter
        .get_trimmed("output", "dir")
        .unwrap_or_else(|| "output".to_string());
    Ok((PathBuf::from(dir), adapter.get_bool("backtest", "parallel", false)))
}

fn run_signal_backtest(config_path: &Path, signals_path: &Path) -> Result<(), SigtraderError> {
    let (output_dir, parallel) = backtest_settings(config_path)?;
    info!("reading signals from {}", signals_path.display());
    let file = read_signal_file(signals_path)?;
    let report = backtest_signal_file(file, parallel);

    let trade_log = CsvTradeLogAdapter::new(output_dir);
    report_sink_failure(trade_log.log_trades(&report.results), "trade logging");
    report_sink_failure(trade_log.log_pnl_summary(&report.results), "P&L summary logging");
    if let Some(portfolio) = &report.portfolio {
        report_sink_failure(
            trade_log.log_portfolio_summary(portfolio),
            "portfolio summary logging",
        );
    }

    print!("{}", format_backtest_report(&report));

    match report.failures.first() {
        Some(failure) if report.results.is_empty() => Err(SigtraderError::Signal {
            symbol: failure.symbol.clone(),
            source: failure.error.clone(),
        }),
        _ => Ok(()),
    }
}

fn run_validate(config_path: &Path) -> Result<(), SigtraderError> {
    let config = load_trading_config(config_path, None)?;
    println!(
        "Configuration valid: {} symbols, lookback {} days ending {}, policy {}",
        config.symbols.len(),
        config.lookback_days,
        config.end_date,
        config.signals.policy
    );

    #[cfg(feature = "telegram")]
    {
        if let (true, Some(token), Some(chat_id)) = (
            config.alerts.enabled,
            &config.alerts.bot_token,
            &config.alerts.chat_id,
        ) {
            let bot = TelegramAdapter::new(token, chat_id)?.test_connection()?;
            println!("Telegram bot connected: {bot}");
        }
    }
    Ok(())
}

fn run_info(config_path: &Path, stocks: Option<&str>) -> Result<(), SigtraderError> {
    let adapter = FileConfigAdapter::from_file(config_path)?;
    let data_dir = adapter
        .get_trimmed("data", "dir")
        .unwrap_or_else(|| "data".to_string());
    let data_port = CsvAdapter::new(PathBuf::from(data_dir));

    let configured = stocks
        .map(str::to_string)
        .or_else(|| adapter.get_trimmed("trading", "stocks"));
    let symbols = match configured {
        Some(list) => parse_symbols(&list).map_err(|e| SigtraderError::ConfigInvalid {
            section: "trading".to_string(),
            key: "stocks".to_string(),
            reason: e.to_string(),
        })?,
        None => data_port.list_symbols()?,
    };

    print!("{}", format_data_ranges(&data_port, &symbols)?);
    Ok(())
}

pub fn format_data_ranges(
    data_port: &dyn DataPort,
    symbols: &[String],
) -> Result<String, SigtraderError> {
    let mut out = String::new();
    for symbol in symbols {
        let line = match data_port.get_data_range(symbol)? {
            Some((first, last, bars)) => format!("{symbol}: {first} to {last} ({bars} bars)\n"),
            None => format!("{symbol}: no data\n"),
        };
        out.push_str(&line);
    }
    Ok(out)
}

fn format_stats_block(out: &mut Vec<String>, stats: &TradeStats) {
    out.push(format!("  Total Trades: {}", stats.total_trades));
    out.push(format!(
        "  Winning / Losing: {} / {}",
        stats.winning_trades, stats.losing_trades
    ));
    out.push(format!("  Win Rate: {:.2}%", stats.win_rate));
    out.push(format!(
        "  Total P&L: {:.2} ({:.2}%)",
        stats.total_pnl, stats.total_pnl_pct
    ));
    out.push(format!("  Avg P&L per Trade: {:.2}", stats.avg_pnl_per_trade));
    out.push(format!("  Sharpe Ratio: {:.2}", stats.sharpe_ratio));
}

fn format_report_lines(out: &mut Vec<String>, report: &BacktestReport) {
    if report.results.is_empty() {
        out.push("BACKTEST RESULTS: no completed trades".to_string());
    } else {
        out.push(format!("BACKTEST RESULTS ({} symbols):", report.results.len()));
        for (symbol, result) in &report.results {
            out.push(format!(
                "  {symbol}: {} trades, Win Rate: {:.1}%, P&L: {:.2}",
                result.stats.total_trades, result.stats.win_rate, result.stats.total_pnl
            ));
        }
    }

    if !report.failures.is_empty() {
        out.push(String::new());
        out.push(format!("FAILED SYMBOLS ({}):", report.failures.len()));
        for failure in &report.failures {
            out.push(format!("  {}: {}", failure.symbol, failure.error));
        }
    }

    if let Some(portfolio) = &report.portfolio {
        out.push(String::new());
        out.push("PORTFOLIO SUMMARY:".to_string());
        format_stats_block(out, &portfolio.stats);
        out.push(format!(
            "  Symbols Traded: {}",
            portfolio.symbols_traded.join(", ")
        ));
    }
}

fn format_current_lines(out: &mut Vec<String>, current: &BTreeMap<String, Signal>) {
    if current.is_empty() {
        out.push("CURRENT SIGNALS: None".to_string());
        return;
    }
    out.push(format!("CURRENT SIGNALS ({}):", current.len()));
    for (symbol, signal) in current {
        out.push(format!(
            "  {symbol}: {} at {:.2} - {}",
            signal.signal_type, signal.price, signal.snapshot.reason
        ));
    }
}

fn format_skipped_lines(out: &mut Vec<String>, skipped: &[SkippedSymbol]) {
    if skipped.is_empty() {
        return;
    }
    out.push(String::new());
    out.push(format!("SKIPPED SYMBOLS ({}):", skipped.len()));
    for s in skipped {
        out.push(format!("  {}: {}", s.symbol, s.reason));
    }
}

fn framed(title: &str, body: Vec<String>) -> String {
    let mut out = vec![String::new(), RULE.to_string(), title.to_string(), RULE.to_string()];
    out.push(String::new());
    out.extend(body);
    out.push(String::new());
    out.push(RULE.to_string());
    out.join("\n") + "\n"
}

pub fn format_analysis_summary(outcome: &AnalysisOutcome) -> String {
    let mut body = Vec::new();
    format_current_lines(&mut body, &outcome.current);

    body.push(String::new());
    body.push("HISTORICAL SIGNALS:".to_string());
    for (symbol, signals) in &outcome.signals {
        let summary = summarize(signals);
        body.push(format!(
            "  {symbol}: {} signals ({} buy, {} sell)",
            summary.total_signals, summary.buy_signals, summary.sell_signals
        ));
    }

    body.push(String::new());
    format_report_lines(&mut body, &outcome.report);
    format_skipped_lines(&mut body, &outcome.skipped);
    framed("SIGTRADER ANALYSIS SUMMARY", body)
}

pub fn format_daily_summary(outcome: &DailyOutcome) -> String {
    let mut body = Vec::new();
    format_current_lines(&mut body, &outcome.current);

    body.push(String::new());
    if outcome.recent.is_empty() {
        body.push(format!(
            "RECENT SIGNALS (last {RECENT_SIGNAL_DAYS} days): None"
        ));
    } else {
        body.push(format!("RECENT SIGNALS (last {RECENT_SIGNAL_DAYS} days):"));
        for signal in outcome.recent.values().flatten() {
            body.push(format!(
                "  {} {} {} at {:.2}",
                signal.date, signal.symbol, signal.signal_type, signal.price
            ));
        }
    }
    format_skipped_lines(&mut body, &outcome.skipped);
    framed("SIGTRADER DAILY CHECK", body)
}

pub fn format_backtest_report(report: &BacktestReport) -> String {
    let mut body = Vec::new();
    format_report_lines(&mut body, report);
    framed("SIGTRADER BACKTEST", body)
}
