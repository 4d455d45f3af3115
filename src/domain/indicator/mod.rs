//! Technical indicator implementations.
//!
//! This module provides types for representing indicator values and series:
//! - `IndicatorPoint`: A single point in an indicator time series
//! - `IndicatorValue`: Enum for different indicator output shapes
//! - `IndicatorType`: Enum for indicator identity + parameters (serves as HashMap key)
//! - `IndicatorSeries`: A time series of indicator values
//! - `IndicatorSet`: every series computed for one stock, keyed by type

pub mod bollinger;
pub mod ema;
pub mod macd;
pub mod rci;
pub mod rsi;
pub mod sma;

pub use bollinger::calculate_bollinger;
pub use ema::calculate_ema;
pub use macd::calculate_macd;
pub use rci::calculate_rci;
pub use rsi::calculate_rsi;
pub use sma::{calculate_sma, calculate_volume_ma};

use crate::domain::ohlcv::OhlcvBar;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::fmt;

/// Moving average periods used throughout the strategies.
pub const MA_PERIODS: [usize; 4] = [5, 25, 75, 200];
pub const RSI_PERIOD: usize = 14;
pub const RCI_SHORT: usize = 9;
pub const RCI_LONG: usize = 26;
pub const BOLLINGER_PERIOD: usize = 20;
pub const BOLLINGER_MULT_X100: u32 = 300;
pub const VOLUME_MA_PERIOD: usize = 25;

#[derive(Debug, Clone)]
pub struct IndicatorPoint {
    pub date: NaiveDate,
    pub valid: bool,
    pub value: IndicatorValue,
}

#[derive(Debug, Clone)]
pub enum IndicatorValue {
    Simple(f64),
    Macd {
        line: f64,
        signal: f64,
        histogram: f64,
    },
    Bollinger {
        upper: f64,
        middle: f64,
        lower: f64,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IndicatorType {
    Sma(usize),
    Ema(usize),
    Rsi(usize),
    Rci(usize),
    VolumeMa(usize),
    Macd {
        fast: usize,
        slow: usize,
        signal: usize,
    },
    Bollinger {
        period: usize,
        stddev_mult_x100: u32,
    },
}

#[derive(Debug, Clone)]
pub struct IndicatorSeries {
    pub indicator_type: IndicatorType,
    pub values: Vec<IndicatorPoint>,
}

impl IndicatorSeries {
    /// Scalar value at `index`, `None` during warmup or for multi-valued series.
    pub fn simple_at(&self, index: usize) -> Option<f64> {
        match self.values.get(index) {
            Some(IndicatorPoint {
                valid: true,
                value: IndicatorValue::Simple(v),
                ..
            }) => Some(*v),
            _ => None,
        }
    }
}

impl fmt::Display for IndicatorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndicatorType::Sma(period) => write!(f, "SMA({})", period),
            IndicatorType::Ema(period) => write!(f, "EMA({})", period),
            IndicatorType::Rsi(period) => write!(f, "RSI({})", period),
            IndicatorType::Rci(period) => write!(f, "RCI({})", period),
            IndicatorType::VolumeMa(period) => write!(f, "VOLUME_MA({})", period),
            IndicatorType::Macd { fast, slow, signal } => {
                write!(f, "MACD({},{},{})", fast, slow, signal)
            }
            IndicatorType::Bollinger {
                period,
                stddev_mult_x100,
            } => {
                let mult = *stddev_mult_x100 as f64 / 100.0;
                write!(f, "BOLLINGER({},{})", period, mult)
            }
        }
    }
}

/// MACD line, signal and histogram at one bar.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MacdPoint {
    pub line: f64,
    pub signal: f64,
    pub histogram: f64,
}

/// Bollinger upper/middle/lower at one bar.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BandPoint {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
}

/// Every indicator series for one price history, aligned to its bars.
#[derive(Debug, Clone, Default)]
pub struct IndicatorSet {
    series: HashMap<IndicatorType, IndicatorSeries>,
}

impl IndicatorSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, series: IndicatorSeries) {
        self.series
            .insert(series.indicator_type.clone(), series);
    }

    pub fn get(&self, kind: &IndicatorType) -> Option<&IndicatorSeries> {
        self.series.get(kind)
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    /// Indicator names in display form, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.series.keys().map(|k| k.to_string()).collect();
        names.sort();
        names
    }

    pub fn value(&self, kind: &IndicatorType, index: usize) -> Option<f64> {
        self.get(kind).and_then(|s| s.simple_at(index))
    }

    pub fn sma(&self, period: usize, index: usize) -> Option<f64> {
        self.value(&IndicatorType::Sma(period), index)
    }

    pub fn ema(&self, period: usize, index: usize) -> Option<f64> {
        self.value(&IndicatorType::Ema(period), index)
    }

    pub fn rsi(&self, index: usize) -> Option<f64> {
        self.value(&IndicatorType::Rsi(RSI_PERIOD), index)
    }

    pub fn rci(&self, period: usize, index: usize) -> Option<f64> {
        self.value(&IndicatorType::Rci(period), index)
    }

    pub fn volume_ma(&self, index: usize) -> Option<f64> {
        self.value(&IndicatorType::VolumeMa(VOLUME_MA_PERIOD), index)
    }

    pub fn macd(&self, index: usize) -> Option<MacdPoint> {
        let kind = IndicatorType::Macd {
            fast: macd::DEFAULT_FAST,
            slow: macd::DEFAULT_SLOW,
            signal: macd::DEFAULT_SIGNAL,
        };
        match self.get(&kind)?.values.get(index)? {
            IndicatorPoint {
                valid: true,
                value:
                    IndicatorValue::Macd {
                        line,
                        signal,
                        histogram,
                    },
                ..
            } => Some(MacdPoint {
                line: *line,
                signal: *signal,
                histogram: *histogram,
            }),
            _ => None,
        }
    }

    pub fn bollinger(&self, index: usize) -> Option<BandPoint> {
        let kind = IndicatorType::Bollinger {
            period: BOLLINGER_PERIOD,
            stddev_mult_x100: BOLLINGER_MULT_X100,
        };
        match self.get(&kind)?.values.get(index)? {
            IndicatorPoint {
                valid: true,
                value:
                    IndicatorValue::Bollinger {
                        upper,
                        middle,
                        lower,
                    },
                ..
            } => Some(BandPoint {
                upper: *upper,
                middle: *middle,
                lower: *lower,
            }),
            _ => None,
        }
    }
}

/// Compute the full indicator set the strategies and detectors read.
pub fn compute_all(bars: &[OhlcvBar]) -> IndicatorSet {
    let mut set = IndicatorSet::new();
    for period in MA_PERIODS {
        set.insert(calculate_sma(bars, period));
        set.insert(calculate_ema(bars, period));
    }
    set.insert(calculate_macd(
        bars,
        macd::DEFAULT_FAST,
        macd::DEFAULT_SLOW,
        macd::DEFAULT_SIGNAL,
    ));
    set.insert(calculate_rsi(bars, RSI_PERIOD));
    set.insert(calculate_rci(bars, RCI_SHORT));
    set.insert(calculate_rci(bars, RCI_LONG));
    set.insert(calculate_bollinger(
        bars,
        BOLLINGER_PERIOD,
        BOLLINGER_MULT_X100,
    ));
    set.insert(calculate_volume_ma(bars, VOLUME_MA_PERIOD));
    set
}

/// Invalid placeholder series of the same length as `bars`.
pub(crate) fn invalid_series(bars: &[OhlcvBar], indicator_type: IndicatorType) -> IndicatorSeries {
    IndicatorSeries {
        indicator_type,
        values: bars
            .iter()
            .map(|b| IndicatorPoint {
                date: b.date,
                valid: false,
                value: IndicatorValue::Simple(0.0),
            })
            .collect(),
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::make_bars;
    use super::*;

    #[test]
    fn indicator_type_display_sma() {
        assert_eq!(IndicatorType::Sma(25).to_string(), "SMA(25)");
    }

    #[test]
    fn indicator_type_display_macd() {
        let macd = IndicatorType::Macd {
            fast: 12,
            slow: 26,
            signal: 9,
        };
        assert_eq!(macd.to_string(), "MACD(12,26,9)");
    }

    #[test]
    fn indicator_type_display_bollinger() {
        let boll = IndicatorType::Bollinger {
            period: 20,
            stddev_mult_x100: 300,
        };
        assert_eq!(boll.to_string(), "BOLLINGER(20,3)");
    }

    #[test]
    fn compute_all_builds_every_series() {
        let prices: Vec<f64> = (0..250).map(|i| 100.0 + i as f64).collect();
        let bars = make_bars(&prices);
        let set = compute_all(&bars);

        // 4 SMA + 4 EMA + MACD + RSI + 2 RCI + Bollinger + volume MA
        assert_eq!(set.len(), 14);
        for series in set.series.values() {
            assert_eq!(series.values.len(), bars.len());
        }
        assert!(set.names().contains(&"RCI(9)".to_string()));
    }

    #[test]
    fn accessors_respect_warmup() {
        let prices: Vec<f64> = (0..30).map(|i| 100.0 + i as f64).collect();
        let bars = make_bars(&prices);
        let set = compute_all(&bars);

        assert!(set.sma(5, 3).is_none());
        assert!(set.sma(5, 4).is_some());
        assert!(set.sma(200, 29).is_none());
        assert!(set.ema(200, 0).is_some());
        assert!(set.rci(9, 8).is_some());
        assert!(set.rci(26, 24).is_none());
        assert!(set.bollinger(19).is_some());
        assert!(set.macd(0).is_some());
    }

    #[test]
    fn accessor_out_of_range_is_none() {
        let bars = make_bars(&[1.0, 2.0, 3.0]);
        let set = compute_all(&bars);
        assert!(set.ema(5, 10).is_none());
        assert!(set.macd(10).is_none());
    }
}
