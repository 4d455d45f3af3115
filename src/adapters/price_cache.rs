//! Local price cache in front of another data port.
//!
//! A cached copy of each history lives at `{cache_dir}/{code}.csv` and is
//! served while its modification time is younger than the TTL. Cache read
//! and write failures are logged and fall through to the inner port.

use crate::adapters::csv_adapter::parse_bars;
use crate::domain::error::StockfitError;
use crate::domain::ohlcv::OhlcvBar;
use crate::ports::data_port::DataPort;
use chrono::NaiveDate;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::{debug, warn};

pub struct CachedDataPort<D> {
    inner: D,
    cache_dir: PathBuf,
    ttl: Duration,
}

impl<D: DataPort> CachedDataPort<D> {
    pub fn new(inner: D, cache_dir: PathBuf, ttl_hours: u64) -> Self {
        Self {
            inner,
            cache_dir,
            ttl: Duration::from_secs(ttl_hours * 3600),
        }
    }

    pub fn cache_path(&self, code: &str) -> PathBuf {
        self.cache_dir.join(format!("{}.csv", cache_key(code)))
    }

    /// Remove the cached copy of `code`, or every cached copy when `None`.
    pub fn clear(&self, code: Option<&str>) -> Result<(), StockfitError> {
        match code {
            Some(code) => {
                let path = self.cache_path(code);
                if path.exists() {
                    fs::remove_file(path)?;
                }
            }
            None => {
                if !self.cache_dir.exists() {
                    return Ok(());
                }
                for entry in fs::read_dir(&self.cache_dir)? {
                    let path = entry?.path();
                    if path.extension().is_some_and(|e| e == "csv") {
                        fs::remove_file(path)?;
                    }
                }
            }
        }
        Ok(())
    }

    fn is_fresh(&self, path: &Path) -> bool {
        let Ok(modified) = fs::metadata(path).and_then(|m| m.modified()) else {
            return false;
        };
        SystemTime::now()
            .duration_since(modified)
            .map(|age| age < self.ttl)
            .unwrap_or(true)
    }

    fn read_cached(&self, code: &str) -> Option<Vec<OhlcvBar>> {
        let path = self.cache_path(code);
        if !self.is_fresh(&path) {
            debug!(%code, "price cache miss");
            return None;
        }
        let content = fs::read_to_string(&path)
            .inspect_err(|e| warn!(%code, error = %e, "failed to read price cache"))
            .ok()?;
        match parse_bars(code, &content) {
            Ok(bars) => {
                debug!(%code, bars = bars.len(), "price cache hit");
                Some(bars)
            }
            Err(e) => {
                warn!(%code, error = %e, "corrupt price cache entry");
                None
            }
        }
    }

    fn write_cached(&self, code: &str, bars: &[OhlcvBar]) -> Result<(), StockfitError> {
        fs::create_dir_all(&self.cache_dir)?;
        let mut wtr = csv::Writer::from_path(self.cache_path(code)).map_err(csv_error)?;
        wtr.write_record(["date", "open", "high", "low", "close", "volume"])
            .map_err(csv_error)?;
        for bar in bars {
            wtr.write_record([
                bar.date.format("%Y-%m-%d").to_string(),
                bar.open.to_string(),
                bar.high.to_string(),
                bar.low.to_string(),
                bar.close.to_string(),
                bar.volume.to_string(),
            ])
            .map_err(csv_error)?;
        }
        wtr.flush()?;
        Ok(())
    }
}

impl<D: DataPort> DataPort for CachedDataPort<D> {
    fn fetch_ohlcv(&self, code: &str) -> Result<Vec<OhlcvBar>, StockfitError> {
        if let Some(bars) = self.read_cached(code) {
            return Ok(bars);
        }
        let bars = self.inner.fetch_ohlcv(code)?;
        if let Err(e) = self.write_cached(code, &bars) {
            warn!(%code, error = %e, "failed to write price cache");
        }
        Ok(bars)
    }

    fn list_symbols(&self) -> Result<Vec<String>, StockfitError> {
        self.inner.list_symbols()
    }

    fn get_data_range(
        &self,
        code: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, StockfitError> {
        self.inner.get_data_range(code)
    }
}

/// File stem for `code`: a trailing `.JP` is dropped and dots become underscores.
pub fn cache_key(code: &str) -> String {
    code.trim()
        .strip_suffix(".JP")
        .unwrap_or(code.trim())
        .replace('.', "_")
}

fn csv_error(e: csv::Error) -> StockfitError {
    StockfitError::Data {
        reason: format!("price cache write error: {e}"),
    }
}
