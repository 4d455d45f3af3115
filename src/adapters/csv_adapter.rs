//! CSV file adapters: one price file per code, and the listing file.

use crate::domain::error::StockfitError;
use crate::domain::ohlcv::OhlcvBar;
use crate::domain::universe::StockListing;
use crate::ports::data_port::{DataPort, ListingPort};
use chrono::NaiveDate;
use csv::StringRecord;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Reads `{base_path}/{code}.csv` with header `date,open,high,low,close,volume`.
pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    pub fn csv_path(&self, code: &str) -> PathBuf {
        self.base_path.join(format!("{code}.csv"))
    }
}

impl DataPort for CsvAdapter {
    fn fetch_ohlcv(&self, code: &str) -> Result<Vec<OhlcvBar>, StockfitError> {
        let path = self.csv_path(code);
        let content = fs::read_to_string(&path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => StockfitError::NoData {
                code: code.to_string(),
            },
            _ => StockfitError::Data {
                reason: format!("failed to read {}: {e}", path.display()),
            },
        })?;
        parse_bars(code, &content)
    }

    fn list_symbols(&self) -> Result<Vec<String>, StockfitError> {
        let entries = fs::read_dir(&self.base_path).map_err(|e| StockfitError::Data {
            reason: format!(
                "failed to read directory {}: {e}",
                self.base_path.display()
            ),
        })?;

        let mut symbols = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| StockfitError::Data {
                reason: format!("directory entry error: {e}"),
            })?;
            let name = entry.file_name();
            if let Some(code) = name.to_string_lossy().strip_suffix(".csv") {
                symbols.push(code.to_string());
            }
        }

        symbols.sort();
        Ok(symbols)
    }

    fn get_data_range(
        &self,
        code: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, StockfitError> {
        let bars = match self.fetch_ohlcv(code) {
            Ok(bars) => bars,
            Err(StockfitError::NoData { .. }) => return Ok(None),
            Err(e) => return Err(e),
        };
        Ok(match (bars.first(), bars.last()) {
            (Some(first), Some(last)) => Some((first.date, last.date, bars.len())),
            _ => None,
        })
    }
}

/// Parse price CSV content into bars sorted by date.
pub fn parse_bars(code: &str, content: &str) -> Result<Vec<OhlcvBar>, StockfitError> {
    let mut rdr = csv::Reader::from_reader(content.as_bytes());
    let mut bars = Vec::new();

    for result in rdr.records() {
        let record = result.map_err(|e| StockfitError::Data {
            reason: format!("CSV parse error in {code}: {e}"),
        })?;

        let date_str = column(&record, 0, "date")?;
        let date = NaiveDate::parse_from_str(date_str, "%Y-%m-%d").map_err(|e| {
            StockfitError::Data {
                reason: format!("invalid date format in {code}: {e}"),
            }
        })?;
        let volume: f64 = number(&record, 5, "volume")?;

        bars.push(OhlcvBar {
            code: code.to_string(),
            date,
            open: number(&record, 1, "open")?,
            high: number(&record, 2, "high")?,
            low: number(&record, 3, "low")?,
            close: number(&record, 4, "close")?,
            volume: volume as i64,
        });
    }

    bars.sort_by_key(|b| b.date);
    Ok(bars)
}

fn column<'r>(record: &'r StringRecord, idx: usize, name: &str) -> Result<&'r str, StockfitError> {
    record.get(idx).ok_or_else(|| StockfitError::Data {
        reason: format!("missing {name} column"),
    })
}

fn number<T>(record: &StringRecord, idx: usize, name: &str) -> Result<T, StockfitError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    column(record, idx, name)?
        .trim()
        .parse()
        .map_err(|e| StockfitError::Data {
            reason: format!("invalid {name} value: {e}"),
        })
}

/// Reads the listing file, a CSV with header `code,name,market`.
pub struct CsvListingAdapter {
    path: PathBuf,
}

impl CsvListingAdapter {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ListingPort for CsvListingAdapter {
    fn load_listings(&self) -> Result<Vec<StockListing>, StockfitError> {
        let mut rdr = csv::Reader::from_path(&self.path).map_err(|e| StockfitError::Data {
            reason: format!("failed to read listing file {}: {e}", self.path.display()),
        })?;

        let mut listings = Vec::new();
        for result in rdr.deserialize() {
            let mut listing: StockListing = result.map_err(|e| StockfitError::Data {
                reason: format!("listing parse error: {e}"),
            })?;
            listing.code = listing.code.trim().to_string();
            listings.push(listing);
        }
        Ok(listings)
    }
}
