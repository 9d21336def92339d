//! Configuration validation and assembly of [`TradingConfig`].
//!
//! Every field is checked against the raw `ConfigPort` before a run starts so
//! a bad INI file fails fast with the offending section and key.

use crate::domain::error::SigtraderError;
use crate::domain::trading_config::{
    AlertSettings, IndicatorParams, SignalParams, SignalPolicy, TradingConfig,
};
use crate::domain::universe::parse_symbols;
use crate::ports::config_port::ConfigPort;
use chrono::NaiveDate;
use std::path::PathBuf;

pub fn validate_trading_config(config: &dyn ConfigPort) -> Result<(), SigtraderError> {
    validate_stocks(config)?;
    validate_periods(config)?;
    validate_thresholds(config)?;
    validate_lookback(config)?;
    validate_end_date(config)?;
    validate_policy(config)?;
    validate_alerts(config)?;
    Ok(())
}

/// Validates, then builds the run configuration. A missing `end_date` means today.
pub fn build_trading_config(config: &dyn ConfigPort) -> Result<TradingConfig, SigtraderError> {
    build_trading_config_as_of(config, chrono::Local::now().date_naive())
}

pub fn build_trading_config_as_of(
    config: &dyn ConfigPort,
    today: NaiveDate,
) -> Result<TradingConfig, SigtraderError> {
    validate_trading_config(config)?;

    let symbols = config
        .get_trimmed("trading", "stocks")
        .map(|s| parse_symbols(&s))
        .transpose()
        .map_err(|e| invalid("trading", "stocks", e.to_string()))?
        .unwrap_or_default();

    let end_date = match config.get_trimmed("trading", "end_date") {
        Some(s) => parse_date(&s, "end_date")?,
        None => today,
    };

    let defaults = IndicatorParams::default();
    let indicators = IndicatorParams {
        rsi_period: get_usize(config, "rsi_period", defaults.rsi_period),
        sma_short: get_usize(config, "sma_short", defaults.sma_short),
        sma_long: get_usize(config, "sma_long", defaults.sma_long),
    };

    let signal_defaults = SignalParams::default();
    let signals = SignalParams {
        rsi_oversold: config.get_double("trading", "rsi_oversold", signal_defaults.rsi_oversold),
        rsi_overbought: config.get_double(
            "trading",
            "rsi_overbought",
            signal_defaults.rsi_overbought,
        ),
        policy: read_policy(config)?,
    };

    Ok(TradingConfig {
        symbols,
        lookback_days: config.get_int("trading", "lookback_days", 180) as u32,
        end_date,
        indicators,
        signals,
        data_dir: PathBuf::from(
            config
                .get_trimmed("data", "dir")
                .unwrap_or_else(|| "data".to_string()),
        ),
        output_dir: PathBuf::from(
            config
                .get_trimmed("output", "dir")
                .unwrap_or_else(|| "output".to_string()),
        ),
        charts: config.get_bool("output", "charts", true),
        parallel: config.get_bool("backtest", "parallel", false),
        alerts: AlertSettings {
            enabled: config.get_bool("alerts", "enabled", false),
            bot_token: config.get_trimmed("alerts", "bot_token"),
            chat_id: config.get_trimmed("alerts", "chat_id"),
        },
    })
}

fn invalid(section: &str, key: &str, reason: impl Into<String>) -> SigtraderError {
    SigtraderError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.into(),
    }
}

fn get_usize(config: &dyn ConfigPort, key: &str, default: usize) -> usize {
    config.get_int("trading", key, default as i64).max(0) as usize
}

fn validate_stocks(config: &dyn ConfigPort) -> Result<(), SigtraderError> {
    match config.get_trimmed("trading", "stocks") {
        Some(value) => parse_symbols(&value)
            .map(|_| ())
            .map_err(|e| invalid("trading", "stocks", e.to_string())),
        None => Err(SigtraderError::ConfigMissing {
            section: "trading".to_string(),
            key: "stocks".to_string(),
        }),
    }
}

fn validate_periods(config: &dyn ConfigPort) -> Result<(), SigtraderError> {
    let defaults = IndicatorParams::default();
    for (key, default) in [
        ("rsi_period", defaults.rsi_period),
        ("sma_short", defaults.sma_short),
        ("sma_long", defaults.sma_long),
    ] {
        if config.get_int("trading", key, default as i64) < 1 {
            return Err(invalid("trading", key, format!("{key} must be at least 1")));
        }
    }

    let short = config.get_int("trading", "sma_short", defaults.sma_short as i64);
    let long = config.get_int("trading", "sma_long", defaults.sma_long as i64);
    if short >= long {
        return Err(invalid(
            "trading",
            "sma_short",
            "sma_short must be less than sma_long",
        ));
    }
    Ok(())
}

fn validate_thresholds(config: &dyn ConfigPort) -> Result<(), SigtraderError> {
    let defaults = SignalParams::default();
    let oversold = config.get_double("trading", "rsi_oversold", defaults.rsi_oversold);
    let overbought = config.get_double("trading", "rsi_overbought", defaults.rsi_overbought);

    for (key, value) in [("rsi_oversold", oversold), ("rsi_overbought", overbought)] {
        if !(0.0..=100.0).contains(&value) {
            return Err(invalid(
                "trading",
                key,
                format!("{key} must be between 0 and 100"),
            ));
        }
    }
    if oversold >= overbought {
        return Err(invalid(
            "trading",
            "rsi_oversold",
            "rsi_oversold must be less than rsi_overbought",
        ));
    }
    Ok(())
}

fn validate_lookback(config: &dyn ConfigPort) -> Result<(), SigtraderError> {
    let value = config.get_int("trading", "lookback_days", 180);
    if value < 1 || value > i64::from(u32::MAX) {
        return Err(invalid(
            "trading",
            "lookback_days",
            "lookback_days must be positive",
        ));
    }
    Ok(())
}

fn validate_end_date(config: &dyn ConfigPort) -> Result<(), SigtraderError> {
    if let Some(value) = config.get_trimmed("trading", "end_date") {
        parse_date(&value, "end_date")?;
    }
    Ok(())
}

fn parse_date(value: &str, field: &str) -> Result<NaiveDate, SigtraderError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| {
        invalid(
            "trading",
            field,
            format!("invalid date format '{value}', expected YYYY-MM-DD"),
        )
    })
}

fn read_policy(config: &dyn ConfigPort) -> Result<SignalPolicy, SigtraderError> {
    match config.get_trimmed("trading", "signal_policy") {
        Some(value) => value
            .parse::<SignalPolicy>()
            .map_err(|reason| invalid("trading", "signal_policy", reason)),
        None => Ok(SignalPolicy::default()),
    }
}

fn validate_policy(config: &dyn ConfigPort) -> Result<(), SigtraderError> {
    read_policy(config).map(|_| ())
}

fn validate_alerts(config: &dyn ConfigPort) -> Result<(), SigtraderError> {
    if !config.get_bool("alerts", "enabled", false) {
        return Ok(());
    }
    for key in ["bot_token", "chat_id"] {
        if config.get_trimmed("alerts", key).is_none() {
            return Err(SigtraderError::ConfigMissing {
                section: "alerts".to_string(),
                key: key.to_string(),
            });
        }
    }
    Ok(())
}
