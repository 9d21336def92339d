//! Domain error types.

use chrono::NaiveDate;

/// Why a symbol's signal stream was rejected before simulation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SignalError {
    #[error("signal on {date}: invalid price {price}")]
    InvalidPrice { date: NaiveDate, price: f64 },

    #[error("signal for {found} in the stream of {expected}")]
    SymbolMismatch { expected: String, found: String },

    #[error("row {row}: missing {field}")]
    MissingField { row: usize, field: &'static str },

    #[error("row {row}: invalid {field} '{value}'")]
    InvalidField {
        row: usize,
        field: &'static str,
        value: String,
    },
}

/// Top-level error type for sigtrader.
#[derive(Debug, thiserror::Error)]
pub enum SigtraderError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("data error: {reason}")]
    Data { reason: String },

    #[error("no data for {symbol}")]
    NoData { symbol: String },

    #[error("invalid signals for {symbol}: {source}")]
    Signal {
        symbol: String,
        #[source]
        source: SignalError,
    },

    #[error("{sink} sink failed: {reason}")]
    Sink { sink: &'static str, reason: String },

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&SigtraderError> for std::process::ExitCode {
    fn from(err: &SigtraderError) -> Self {
        let code: u8 = match err {
            SigtraderError::Io(_) | SigtraderError::Csv(_) => 1,
            SigtraderError::ConfigParse { .. }
            | SigtraderError::ConfigMissing { .. }
            | SigtraderError::ConfigInvalid { .. } => 2,
            SigtraderError::Data { .. } | SigtraderError::NoData { .. } => 3,
            SigtraderError::Signal { .. } => 4,
            SigtraderError::Sink { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
