//! Discrete BUY/SELL signal events.

use chrono::NaiveDate;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use crate::domain::error::SignalError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SignalType {
    Buy,
    Sell,
}

impl fmt::Display for SignalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignalType::Buy => write!(f, "BUY"),
            SignalType::Sell => write!(f, "SELL"),
        }
    }
}

impl FromStr for SignalType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "BUY" => Ok(SignalType::Buy),
            "SELL" => Ok(SignalType::Sell),
            other => Err(format!("unknown signal type '{other}'")),
        }
    }
}

/// Indicator readings at the signal bar. Carried through for reporting only.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct IndicatorSnapshot {
    pub rsi: Option<f64>,
    pub sma_short: Option<f64>,
    pub sma_long: Option<f64>,
    pub volume: Option<i64>,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Signal {
    pub symbol: String,
    pub signal_type: SignalType,
    pub date: NaiveDate,
    pub price: f64,
    pub snapshot: IndicatorSnapshot,
}

impl Signal {
    pub fn new(symbol: &str, signal_type: SignalType, date: NaiveDate, price: f64) -> Self {
        Signal {
            symbol: symbol.to_string(),
            signal_type,
            date,
            price,
            snapshot: IndicatorSnapshot::default(),
        }
    }

    pub fn is_buy(&self) -> bool {
        self.signal_type == SignalType::Buy
    }

    /// Rejects prices that cannot open or close a position.
    pub fn validate(&self) -> Result<(), SignalError> {
        if !self.price.is_finite() || self.price <= 0.0 {
            return Err(SignalError::InvalidPrice {
                date: self.date,
                price: self.price,
            });
        }
        Ok(())
    }
}
