//! Price data and listing access port traits.

use crate::domain::error::StockfitError;
use crate::domain::ohlcv::OhlcvBar;
use crate::domain::universe::StockListing;
use chrono::NaiveDate;

pub trait DataPort {
    /// Whole daily history of `code`, sorted by date.
    fn fetch_ohlcv(&self, code: &str) -> Result<Vec<OhlcvBar>, StockfitError>;

    fn list_symbols(&self) -> Result<Vec<String>, StockfitError>;

    /// First date, last date and bar count, or `None` when there is no data.
    fn get_data_range(
        &self,
        code: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, StockfitError>;
}

pub trait ListingPort {
    /// All listed stocks, unfiltered.
    fn load_listings(&self) -> Result<Vec<StockListing>, StockfitError>;
}
