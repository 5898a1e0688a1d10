//! Market data access port trait.

use crate::domain::error::NetreturnError;
use crate::domain::ohlcv::OhlcvBar;
use chrono::NaiveDate;

pub trait DataPort {
    /// Bars for `symbol` sorted by date, restricted to the optional bounds
    /// (inclusive).
    fn fetch_ohlcv(
        &self,
        symbol: &str,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<Vec<OhlcvBar>, NetreturnError>;

    fn list_symbols(&self) -> Result<Vec<String>, NetreturnError>;
}
