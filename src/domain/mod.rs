//! Core domain types and logic.

pub mod ohlcv;
pub mod indicator;
pub mod indicator_helpers;
pub mod trading_config;
pub mod config_validation;
pub mod universe;
pub mod signal;
pub mod signal_rules;
pub mod position;
pub mod simulator;
pub mod metrics;
pub mod backtest;
pub mod error;
