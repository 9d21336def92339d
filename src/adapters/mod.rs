//! Concrete adapter implementations for ports.

pub mod alert_message;
pub mod chart_svg;
pub mod console_alert_adapter;
pub mod csv_adapter;
pub mod csv_trade_log_adapter;
pub mod file_config_adapter;
pub mod signal_csv_adapter;
#[cfg(feature = "telegram")]
pub mod telegram_adapter;
