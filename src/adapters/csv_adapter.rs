//! CSV price history adapter: one `{SYMBOL}.csv` per ticker.

use crate::domain::error::SigtraderError;
use crate::domain::ohlcv::OhlcvBar;
use crate::ports::data_port::DataPort;
use chrono::NaiveDate;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize)]
struct PriceRow {
    date: NaiveDate,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: i64,
}

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, symbol: &str) -> PathBuf {
        self.base_path.join(format!("{}.csv", symbol))
    }

    fn read_rows(path: &Path) -> Result<Vec<PriceRow>, SigtraderError> {
        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(path)
            .map_err(|e| SigtraderError::Data {
                reason: format!("failed to read {}: {}", path.display(), e),
            })?;

        rdr.deserialize()
            .map(|row| {
                row.map_err(|e| SigtraderError::Data {
                    reason: format!("{}: {}", path.display(), e),
                })
            })
            .collect()
    }
}

impl DataPort for CsvAdapter {
    fn fetch_ohlcv(
        &self,
        symbol: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<OhlcvBar>, SigtraderError> {
        let path = self.csv_path(symbol);
        if !path.exists() {
            return Err(SigtraderError::NoData {
                symbol: symbol.to_string(),
            });
        }

        let mut bars: Vec<OhlcvBar> = Self::read_rows(&path)?
            .into_iter()
            .filter(|row| row.date >= start_date && row.date <= end_date)
            .map(|row| OhlcvBar {
                symbol: symbol.to_string(),
                date: row.date,
                open: row.open,
                high: row.high,
                low: row.low,
                close: row.close,
                volume: row.volume,
            })
            .collect();

        bars.sort_by_key(|b| b.date);
        Ok(bars)
    }

    fn list_symbols(&self) -> Result<Vec<String>, SigtraderError> {
        let entries = fs::read_dir(&self.base_path).map_err(|e| SigtraderError::Data {
            reason: format!(
                "failed to read directory {}: {}",
                self.base_path.display(),
                e
            ),
        })?;

        let mut symbols = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == "csv") {
                if let Some(stem) = path.file_stem() {
                    symbols.push(stem.to_string_lossy().into_owned());
                }
            }
        }

        symbols.sort();
        Ok(symbols)
    }

    fn get_data_range(
        &self,
        symbol: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, SigtraderError> {
        let path = self.csv_path(symbol);
        if !path.exists() {
            return Ok(None);
        }

        let rows = Self::read_rows(&path)?;
        let first = rows.iter().map(|r| r.date).min();
        let last = rows.iter().map(|r| r.date).max();
        Ok(first.zip(last).map(|(first, last)| (first, last, rows.len())))
    }
}
