//! Market data access port.

use crate::domain::error::TurtleError;
use crate::domain::ohlcv::Bar;
use chrono::NaiveDate;

pub trait DataPort {
    /// Bars for `symbol` between `start` and `end` inclusive (either bound may be open),
    /// sorted by timestamp.
    fn fetch_bars(
        &self,
        symbol: &str,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<Vec<Bar>, TurtleError>;

    fn list_symbols(&self) -> Result<Vec<String>, TurtleError>;
}
