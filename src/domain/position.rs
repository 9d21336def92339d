//! Position state and closed round-trip trades.

use chrono::NaiveDate;
use serde::Serialize;

/// Simulator position for one symbol. Long-only, one unit of exposure.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Position {
    #[default]
    Flat,
    Long {
        entry_price: f64,
        entry_date: NaiveDate,
    },
}

impl Position {
    pub fn is_long(&self) -> bool {
        matches!(self, Position::Long { .. })
    }

    pub fn is_flat(&self) -> bool {
        matches!(self, Position::Flat)
    }
}

/// A completed BUY -> SELL round trip.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trade {
    pub symbol: String,
    pub entry_date: NaiveDate,
    pub exit_date: NaiveDate,
    pub entry_price: f64,
    pub exit_price: f64,
    pub pnl: f64,
    pub pnl_pct: f64,
    pub holding_days: i64,
    pub is_win: bool,
}

impl Trade {
    /// Derives P&L, percentage return, holding period and outcome from the
    /// entry/exit legs.
    pub fn close(
        symbol: &str,
        entry_date: NaiveDate,
        entry_price: f64,
        exit_date: NaiveDate,
        exit_price: f64,
    ) -> Self {
        let pnl = exit_price - entry_price;
        let pnl_pct = if entry_price != 0.0 {
            pnl / entry_price * 100.0
        } else {
            0.0
        };
        Trade {
            symbol: symbol.to_string(),
            entry_date,
            exit_date,
            entry_price,
            exit_price,
            pnl,
            pnl_pct,
            holding_days: (exit_date - entry_date).num_days(),
            is_win: pnl > 0.0,
        }
    }

    pub fn outcome(&self) -> &'static str {
        if self.is_win { "WIN" } else { "LOSS" }
    }
}
