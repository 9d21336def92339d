//! Reads externally produced signal lists for `backtest --signals`.
//!
//! Header: `symbol,date,type,price[,rsi,sma_short,sma_long,volume,reason]`.
//! A malformed row rejects only the symbol it belongs to.

use crate::domain::error::{SignalError, SigtraderError};
use crate::domain::signal::{IndicatorSnapshot, Signal, SignalType};
use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::warn;

#[derive(Debug, Default)]
pub struct SignalFile {
    pub signals: BTreeMap<String, Vec<Signal>>,
    /// First bad row per symbol.
    pub rejected: BTreeMap<String, SignalError>,
}

struct Columns {
    symbol: usize,
    date: usize,
    signal_type: usize,
    price: usize,
    rsi: Option<usize>,
    sma_short: Option<usize>,
    sma_long: Option<usize>,
    volume: Option<usize>,
    reason: Option<usize>,
}

impl Columns {
    fn from_headers(headers: &csv::StringRecord) -> Result<Self, SigtraderError> {
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(name))
        };
        let require = |name: &str| {
            find(name).ok_or_else(|| SigtraderError::Data {
                reason: format!("signal file has no '{name}' column"),
            })
        };

        Ok(Columns {
            symbol: require("symbol")?,
            date: require("date")?,
            signal_type: require("type")?,
            price: require("price")?,
            rsi: find("rsi"),
            sma_short: find("sma_short"),
            sma_long: find("sma_long"),
            volume: find("volume"),
            reason: find("reason"),
        })
    }
}

/// Trimmed text of a column, or `None` when the row is too short.
fn text<'a>(
    record: &'a csv::ByteRecord,
    index: usize,
    row: usize,
    name: &'static str,
) -> Result<Option<&'a str>, SignalError> {
    let Some(bytes) = record.get(index) else {
        return Ok(None);
    };
    std::str::from_utf8(bytes)
        .map(|value| Some(value.trim()))
        .map_err(|_| SignalError::InvalidField {
            row,
            field: name,
            value: String::from_utf8_lossy(bytes).into_owned(),
        })
}

fn field<'a>(
    record: &'a csv::ByteRecord,
    index: usize,
    row: usize,
    name: &'static str,
) -> Result<&'a str, SignalError> {
    match text(record, index, row, name)? {
        Some(value) if !value.is_empty() => Ok(value),
        _ => Err(SignalError::MissingField { row, field: name }),
    }
}

fn optional<T: std::str::FromStr>(
    record: &csv::ByteRecord,
    index: Option<usize>,
    row: usize,
    name: &'static str,
) -> Result<Option<T>, SignalError> {
    let Some(index) = index else {
        return Ok(None);
    };
    let value = match text(record, index, row, name)? {
        Some(value) if !value.is_empty() => value,
        _ => return Ok(None),
    };
    value
        .parse()
        .map(Some)
        .map_err(|_| SignalError::InvalidField {
            row,
            field: name,
            value: value.to_string(),
        })
}

fn parse_row(
    record: &csv::ByteRecord,
    columns: &Columns,
    row: usize,
    symbol: &str,
) -> Result<Signal, SignalError> {
    let invalid = |name: &'static str, value: &str| SignalError::InvalidField {
        row,
        field: name,
        value: value.to_string(),
    };

    let date_str = field(record, columns.date, row, "date")?;
    let date = NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
        .map_err(|_| invalid("date", date_str))?;

    let type_str = field(record, columns.signal_type, row, "type")?;
    let signal_type: SignalType = type_str.parse().map_err(|_| invalid("type", type_str))?;

    let price_str = field(record, columns.price, row, "price")?;
    let price: f64 = price_str.parse().map_err(|_| invalid("price", price_str))?;

    let snapshot = IndicatorSnapshot {
        rsi: optional(record, columns.rsi, row, "rsi")?,
        sma_short: optional(record, columns.sma_short, row, "sma_short")?,
        sma_long: optional(record, columns.sma_long, row, "sma_long")?,
        volume: optional(record, columns.volume, row, "volume")?,
        reason: match columns.reason {
            Some(i) => text(record, i, row, "reason")?.unwrap_or_default().to_string(),
            None => String::new(),
        },
    };

    let signal = Signal {
        symbol: symbol.to_string(),
        signal_type,
        date,
        price,
        snapshot,
    };
    signal.validate()?;
    Ok(signal)
}

pub fn read_signal_file<P: AsRef<Path>>(path: P) -> Result<SignalFile, SigtraderError> {
    let path = path.as_ref();
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .map_err(|e| SigtraderError::Data {
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;

    let columns = Columns::from_headers(rdr.headers()?)?;
    let mut file = SignalFile::default();

    for (index, record) in rdr.byte_records().enumerate() {
        let record = record?;
        let row = index + 1;

        let symbol = match record.get(columns.symbol).map(std::str::from_utf8) {
            Some(Ok(s)) if !s.trim().is_empty() => s.trim().to_uppercase(),
            Some(Err(_)) => {
                warn!(row, "signal row with undecodable symbol ignored");
                continue;
            }
            _ => {
                warn!(row, "signal row without symbol ignored");
                continue;
            }
        };

        if file.rejected.contains_key(&symbol) {
            continue;
        }

        match parse_row(&record, &columns, row, &symbol) {
            Ok(signal) => file.signals.entry(symbol).or_default().push(signal),
            Err(error) => {
                warn!(%symbol, %error, "rejecting signals");
                file.signals.remove(&symbol);
                file.rejected.insert(symbol, error);
            }
        }
    }

    Ok(file)
}
