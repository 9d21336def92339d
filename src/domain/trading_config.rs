//! Run configuration handed explicitly to each pipeline stage.

use chrono::NaiveDate;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Indicator windows used to annotate price history.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndicatorParams {
    pub rsi_period: usize,
    pub sma_short: usize,
    pub sma_long: usize,
}

impl Default for IndicatorParams {
    fn default() -> Self {
        IndicatorParams {
            rsi_period: 14,
            sma_short: 20,
            sma_long: 50,
        }
    }
}

/// How historical signals are derived from annotated bars.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SignalPolicy {
    /// Signal on the bar carrying a crossover flag while the RSI threshold holds.
    #[default]
    CrossoverBar,
    /// Signal when the short/long regime flips between consecutive bars while
    /// the RSI threshold holds.
    RegimeChange,
}

impl FromStr for SignalPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "crossover-bar" | "crossover_bar" => Ok(SignalPolicy::CrossoverBar),
            "regime-change" | "regime_change" => Ok(SignalPolicy::RegimeChange),
            other => Err(format!(
                "unknown signal policy '{other}' (expected crossover-bar or regime-change)"
            )),
        }
    }
}

impl fmt::Display for SignalPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignalPolicy::CrossoverBar => write!(f, "crossover-bar"),
            SignalPolicy::RegimeChange => write!(f, "regime-change"),
        }
    }
}

/// RSI thresholds plus the signal policy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SignalParams {
    pub rsi_oversold: f64,
    pub rsi_overbought: f64,
    pub policy: SignalPolicy,
}

impl Default for SignalParams {
    fn default() -> Self {
        SignalParams {
            rsi_oversold: 30.0,
            rsi_overbought: 70.0,
            policy: SignalPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AlertSettings {
    pub enabled: bool,
    pub bot_token: Option<String>,
    pub chat_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TradingConfig {
    pub symbols: Vec<String>,
    pub lookback_days: u32,
    pub end_date: NaiveDate,
    pub indicators: IndicatorParams,
    pub signals: SignalParams,
    pub data_dir: PathBuf,
    pub output_dir: PathBuf,
    pub charts: bool,
    pub parallel: bool,
    pub alerts: AlertSettings,
}

impl TradingConfig {
    pub fn start_date(&self) -> NaiveDate {
        self.end_date - chrono::Duration::days(i64::from(self.lookback_days))
    }
}
