#![allow(dead_code)]

use chrono::{Datelike, NaiveDate, Weekday};
use std::cell::RefCell;
use std::collections::HashMap;
use std::path::Path;
use stockfit::domain::error::StockfitError;
pub use stockfit::domain::ohlcv::OhlcvBar;
use stockfit::domain::universe::StockListing;
use stockfit::ports::data_port::{DataPort, ListingPort};
use stockfit::ports::vcs_port::VcsPort;

pub struct MockDataPort {
    pub data: HashMap<String, Vec<OhlcvBar>>,
    pub errors: HashMap<String, String>,
    pub fetches: RefCell<Vec<String>>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
            fetches: RefCell::new(Vec::new()),
        }
    }

    pub fn with_bars(mut self, code: &str, bars: Vec<OhlcvBar>) -> Self {
        self.data.insert(code.to_string(), bars);
        self
    }

    pub fn with_error(mut self, code: &str, reason: &str) -> Self {
        self.errors.insert(code.to_string(), reason.to_string());
        self
    }

    pub fn fetched(&self) -> Vec<String> {
        self.fetches.borrow().clone()
    }
}

impl DataPort for MockDataPort {
    fn fetch_ohlcv(&self, code: &str) -> Result<Vec<OhlcvBar>, StockfitError> {
        self.fetches.borrow_mut().push(code.to_string());
        if let Some(reason) = self.errors.get(code) {
            return Err(StockfitError::Data {
                reason: reason.clone(),
            });
        }
        self.data
            .get(code)
            .cloned()
            .ok_or_else(|| StockfitError::NoData {
                code: code.to_string(),
            })
    }

    fn list_symbols(&self) -> Result<Vec<String>, StockfitError> {
        let mut codes: Vec<String> = self.data.keys().cloned().collect();
        codes.sort();
        Ok(codes)
    }

    fn get_data_range(
        &self,
        code: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, StockfitError> {
        if let Some(reason) = self.errors.get(code) {
            return Err(StockfitError::Data {
                reason: reason.clone(),
            });
        }
        Ok(self.data.get(code).and_then(|bars| {
            let first = bars.first()?.date;
            let last = bars.last()?.date;
            Some((first, last, bars.len()))
        }))
    }
}

pub struct MockListing {
    pub listings: Vec<StockListing>,
}

impl MockListing {
    pub fn new(entries: &[(&str, &str, &str)]) -> Self {
        Self {
            listings: entries
                .iter()
                .map(|&(code, name, market)| listing(code, name, market))
                .collect(),
        }
    }
}

impl ListingPort for MockListing {
    fn load_listings(&self) -> Result<Vec<StockListing>, StockfitError> {
        Ok(self.listings.clone())
    }
}

/// Records every call; `dirty` decides what `has_changes` reports.
#[derive(Default)]
pub struct MockVcs {
    pub dirty: bool,
    pub fail_push: bool,
    pub calls: RefCell<Vec<String>>,
}

impl MockVcs {
    pub fn dirty() -> Self {
        Self {
            dirty: true,
            ..Default::default()
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    pub fn commits(&self) -> usize {
        self.calls().iter().filter(|c| c.starts_with("commit")).count()
    }
}

impl VcsPort for MockVcs {
    fn has_changes(&self, path: &Path) -> Result<bool, StockfitError> {
        self.calls
            .borrow_mut()
            .push(format!("status {}", path.display()));
        Ok(self.dirty)
    }

    fn commit(&self, path: &Path, message: &str) -> Result<(), StockfitError> {
        self.calls
            .borrow_mut()
            .push(format!("commit {} {message}", path.display()));
        Ok(())
    }

    fn push(&self) -> Result<(), StockfitError> {
        self.calls.borrow_mut().push("push".into());
        if self.fail_push {
            return Err(StockfitError::Publish {
                reason: "remote rejected".into(),
            });
        }
        Ok(())
    }
}

pub fn listing(code: &str, name: &str, market: &str) -> StockListing {
    StockListing {
        code: code.to_string(),
        name: name.to_string(),
        market: market.to_string(),
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn make_bar(code: &str, date: &str, close: f64) -> OhlcvBar {
    OhlcvBar {
        code: code.to_string(),
        date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
        open: close - 1.0,
        high: close + 1.0,
        low: close - 2.0,
        close,
        volume: 300_000,
    }
}

/// Bars on consecutive days from `closes`.
pub fn bars_from_closes(code: &str, start: NaiveDate, closes: &[f64]) -> Vec<OhlcvBar> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| OhlcvBar {
            code: code.to_string(),
            date: start + chrono::Duration::days(i as i64),
            open: close * 0.995,
            high: close * 1.01,
            low: close * 0.99,
            close,
            volume: 300_000 + (i as i64 % 7) * 20_000,
        })
        .collect()
}

/// A rising line with a 40-bar sine swing on top, so both long and short
/// setups occur.
pub fn generate_bars(code: &str, start_date: &str, count: usize, start_price: f64) -> Vec<OhlcvBar> {
    let start = NaiveDate::parse_from_str(start_date, "%Y-%m-%d").unwrap();
    let closes: Vec<f64> = (0..count)
        .map(|i| {
            let t = i as f64;
            start_price + t * 0.2 + (t * std::f64::consts::TAU / 40.0).sin() * start_price * 0.08
        })
        .collect();
    bars_from_closes(code, start, &closes)
}

/// (open, high, low, close, volume)
pub type Row = (f64, f64, f64, f64, i64);

/// Bars on consecutive days from candle rows.
pub fn bars_from_rows(code: &str, start: NaiveDate, rows: &[Row]) -> Vec<OhlcvBar> {
    rows.iter()
        .enumerate()
        .map(|(i, &(open, high, low, close, volume))| OhlcvBar {
            code: code.to_string(),
            date: start + chrono::Duration::days(i as i64),
            open,
            high,
            low,
            close,
            volume,
        })
        .collect()
}

/// `count` weekdays from `start` on, weekends skipped.
pub fn trading_days(start: NaiveDate, count: usize) -> Vec<NaiveDate> {
    start
        .iter_days()
        .filter(|d| !matches!(d.weekday(), Weekday::Sat | Weekday::Sun))
        .take(count)
        .collect()
}

/// How one bar's candle sits around its close.
#[derive(Debug, Clone, Copy)]
pub struct CandleShape {
    /// open relative to close; positive gives a bearish bar
    pub open_offset: f64,
    pub upper_wick: f64,
    pub lower_wick: f64,
    pub volume_factor: f64,
}

/// Bars on trading days with mixed candles and uneven volume.
pub fn bars_from_shapes(
    code: &str,
    start: NaiveDate,
    closes: &[f64],
    shapes: &[CandleShape],
) -> Vec<OhlcvBar> {
    trading_days(start, closes.len())
        .into_iter()
        .zip(closes.iter().zip(shapes))
        .map(|(date, (&close, shape))| {
            let open = close * (1.0 + shape.open_offset);
            OhlcvBar {
                code: code.to_string(),
                date,
                open,
                high: open.max(close) * (1.0 + shape.upper_wick),
                low: open.min(close) * (1.0 - shape.lower_wick),
                close,
                volume: (200_000.0 * shape.volume_factor) as i64,
            }
        })
        .collect()
}

/// A bar history in which `strategy` enters at `entry`, with a few bars after.
pub struct EntryScenario {
    pub strategy: &'static str,
    pub entry: usize,
    pub rows: Vec<Row>,
}

fn rising(count: usize, from: f64, volume: i64) -> Vec<Row> {
    (0..count)
        .map(|k| {
            let c = from + k as f64;
            (c - 0.5, c + 0.5, c - 1.0, c, volume)
        })
        .collect()
}

fn falling(count: usize, volume: i64) -> Vec<Row> {
    (0..count)
        .map(|k| {
            let c = 1000.0 - 2.0 * k as f64;
            (c + 1.0, c + 2.0, c - 1.0, c, volume)
        })
        .collect()
}

fn flat(closes: &[f64]) -> Vec<Row> {
    closes.iter().map(|&c| (c, c + 1.0, c - 1.0, c, 200_000)).collect()
}

/// One entry setup per built-in strategy.
pub fn entry_scenarios() -> Vec<EntryScenario> {
    let mut breakout = rising(240, 500.0, 100_000);
    breakout.extend((0..3).map(|k| {
        let c = 735.0 - 2.0 * k as f64;
        (c + 0.5, c + 1.0, c - 1.0, c, 80_000)
    }));
    breakout.push((730.0, 739.0, 729.0, 738.0, 200_000));
    breakout.extend([(738.0, 743.0, 737.0, 742.0, 150_000); 3]);

    let mut dip: Vec<f64> = (0..240).map(|i| 100.0 + i as f64).collect();
    dip.extend([330.0, 320.0, 310.0, 300.0, 290.0, 280.0, 285.0, 290.0, 295.0]);

    let mut retry = rising(240, 500.0, 100_000);
    retry.extend((0..3).map(|k| {
        let c = 735.0 - 2.0 * k as f64;
        (c + 0.5, c + 1.0, c - 1.0, c, 80_000)
    }));
    retry.push((731.0, 736.0, 730.5, 735.0, 200_000));
    retry.extend([(735.0, 738.0, 734.0, 737.0, 150_000); 3]);

    let mut momentum = falling(240, 100_000);
    momentum.extend([(562.0, 563.0, 559.0, 560.0, 100_000); 5]);
    momentum.push((460.0, 505.0, 438.0, 440.0, 150_000));
    momentum.extend([(441.0, 442.0, 434.0, 435.0, 120_000); 3]);

    let mut rally = falling(240, 200_000);
    rally.push((600.0, 640.0, 589.0, 590.0, 200_000));
    rally.extend([(600.0, 660.0, 595.0, 650.0, 200_000); 5]);

    let mut new_low = falling(240, 100_000);
    new_low.push((525.0, 526.0, 518.0, 522.0, 200_000));
    new_low.extend([(520.0, 521.0, 515.0, 516.0, 100_000); 3]);

    let mut breakdown = rising(240, 100.0, 100_000);
    breakdown.push((338.0, 339.0, 329.0, 330.0, 120_000));
    breakdown.push((331.0, 332.0, 319.0, 320.0, 130_000));
    breakdown.push((310.0, 335.0, 299.0, 300.0, 150_000));
    breakdown.extend([(299.0, 300.0, 294.0, 295.0, 120_000); 3]);

    let mut rebound = rising(240, 100.0, 100_000);
    rebound.extend([(319.0, 320.0, 317.0, 318.0, 100_000); 5]);
    rebound.push((386.0, 391.0, 370.0, 390.0, 150_000));
    rebound.extend([(390.0, 393.0, 389.0, 392.0, 120_000); 3]);

    vec![
        EntryScenario { strategy: "breakout_new_high_long", entry: 243, rows: breakout },
        EntryScenario { strategy: "pullback_buy_long", entry: 245, rows: flat(&dip) },
        EntryScenario { strategy: "retry_new_high_long", entry: 243, rows: retry },
        EntryScenario { strategy: "trend_reversal_up_long", entry: 245, rows: rebound },
        EntryScenario { strategy: "pullback_short", entry: 240, rows: rally },
        EntryScenario { strategy: "breakout_new_low_short", entry: 240, rows: new_low },
        EntryScenario { strategy: "trend_reversal_down_short", entry: 242, rows: breakdown },
        EntryScenario { strategy: "momentum_short", entry: 245, rows: momentum },
    ]
}
