//! Price history access port.

use crate::domain::error::SigtraderError;
use crate::domain::ohlcv::OhlcvBar;
use chrono::NaiveDate;

pub trait DataPort {
    /// Daily bars for `symbol` within `[start_date, end_date]`, sorted by date.
    fn fetch_ohlcv(
        &self,
        symbol: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<OhlcvBar>, SigtraderError>;

    fn list_symbols(&self) -> Result<Vec<String>, SigtraderError>;

    /// First date, last date and bar count, or `None` when nothing is stored.
    fn get_data_range(
        &self,
        symbol: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, SigtraderError>;
}
