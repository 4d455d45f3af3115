//! Signal proximity: how close each strategy is to firing on a stock.
//!
//! Each detector grades a handful of loosened entry conditions on the most
//! recent bars. Conditions already satisfied land in `conditions_met`, the
//! rest in `conditions_pending`; the share of met conditions is the score.
//! A detector returns nothing when the stock is clearly out of range for
//! its strategy.

mod long;
mod short;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::ohlcv::OhlcvBar;
use crate::domain::stock_data::StockData;
use crate::domain::strategy::{all_strategies, conditions};

/// Recent bars a detector needs to say anything.
pub const MIN_RECENT_BARS: usize = 20;
/// Estimates scoring below this are dropped by [`SignalDetector::detect_all`].
pub const MIN_SCORE: f64 = 40.0;
/// Half width of the centered window used to find swing highs and lows.
const SWING_WINDOW: usize = 10;
/// Bars back used when judging whether a moving average is rising.
const TREND_SPAN: usize = 19;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProximityEstimate {
    pub code: String,
    pub name: String,
    pub strategy_key: String,
    pub strategy_name: String,
    /// Trading days until the entry signal is expected.
    pub estimated_days: Option<u32>,
    pub conditions_met: Vec<String>,
    pub conditions_pending: Vec<String>,
    /// Share of conditions already met, 0 to 100.
    pub score: f64,
    pub current_price: f64,
    pub last_updated: NaiveDate,
}

#[derive(Debug, Clone, Copy)]
pub struct SignalDetector {
    pub lookback_days: usize,
}

impl Default for SignalDetector {
    fn default() -> Self {
        Self { lookback_days: 60 }
    }
}

impl SignalDetector {
    pub fn new(lookback_days: usize) -> Self {
        Self { lookback_days }
    }

    /// Estimates for every registered strategy scoring at least [`MIN_SCORE`],
    /// in registry order.
    pub fn detect_all(&self, data: &StockData) -> Vec<ProximityEstimate> {
        all_strategies()
            .iter()
            .filter_map(|s| self.detect(data, s.key()))
            .filter(|e| e.score >= MIN_SCORE)
            .collect()
    }

    /// Estimate for one strategy, without the score cut-off.
    pub fn detect(&self, data: &StockData, strategy_key: &str) -> Option<ProximityEstimate> {
        let recent = Recent::new(data, self.lookback_days)?;
        let detect = detector(strategy_key)?;
        let strategy_name = all_strategies()
            .into_iter()
            .find(|s| s.key() == strategy_key)
            .map(|s| s.name().to_string())?;
        let reading = detect(&recent)?;
        let last = recent.bar();

        Some(ProximityEstimate {
            code: data.code.clone(),
            name: data.name.clone(),
            strategy_key: strategy_key.to_string(),
            strategy_name,
            estimated_days: reading.estimated_days,
            score: reading.score,
            conditions_met: reading.met,
            conditions_pending: reading.pending,
            current_price: last.close,
            last_updated: last.date,
        })
    }
}

type Detect = fn(&Recent<'_>) -> Option<Reading>;

fn detector(strategy_key: &str) -> Option<Detect> {
    let detect: Detect = match strategy_key {
        "breakout_new_high_long" => long::breakout_new_high,
        "pullback_buy_long" => long::pullback_buy,
        "retry_new_high_long" => long::retry_new_high,
        "trend_reversal_up_long" => long::trend_reversal_up,
        "pullback_short" => short::pullback_short,
        "breakout_new_low_short" => short::breakout_new_low,
        "trend_reversal_down_short" => short::trend_reversal_down,
        "momentum_short" => short::momentum_short,
        _ => return None,
    };
    Some(detect)
}

/// Days until the signal, from the distance to the trigger level (percent)
/// and the current score.
pub fn estimate_days(distance_pct: f64, score: f64) -> u32 {
    if score >= 80.0 {
        1
    } else if score >= 60.0 {
        3
    } else if distance_pct <= 2.0 {
        2
    } else if distance_pct <= 5.0 {
        5
    } else {
        7
    }
}

pub(super) struct Reading {
    met: Vec<String>,
    pending: Vec<String>,
    score: f64,
    estimated_days: Option<u32>,
}

#[derive(Default)]
pub(super) struct Tally {
    met: Vec<String>,
    pending: Vec<String>,
}

impl Tally {
    fn met(&mut self, label: impl Into<String>) {
        self.met.push(label.into());
    }

    fn pending(&mut self, label: impl Into<String>) {
        self.pending.push(label.into());
    }

    fn score(&self) -> f64 {
        let total = self.met.len() + self.pending.len();
        if total == 0 {
            0.0
        } else {
            self.met.len() as f64 / total as f64 * 100.0
        }
    }

    fn finish(self, estimated_days: u32) -> Reading {
        let score = self.score();
        Reading {
            met: self.met,
            pending: self.pending,
            score,
            estimated_days: Some(estimated_days),
        }
    }
}

/// The last `lookback` bars of a stock, with indicators from the full history.
pub(super) struct Recent<'a> {
    data: &'a StockData,
    start: usize,
    last: usize,
}

impl<'a> Recent<'a> {
    fn new(data: &'a StockData, lookback: usize) -> Option<Self> {
        let n = data.bar_count();
        let start = n.saturating_sub(lookback);
        if n - start < MIN_RECENT_BARS {
            return None;
        }
        Some(Self {
            data,
            start,
            last: n - 1,
        })
    }

    fn bar(&self) -> &'a OhlcvBar {
        &self.data.bars[self.last]
    }

    fn close(&self) -> f64 {
        self.bar().close
    }

    fn sma(&self, period: usize) -> Option<f64> {
        self.data.indicators.sma(period, self.last)
    }

    /// SMA now minus the SMA [`TREND_SPAN`] bars ago.
    fn sma_delta(&self, period: usize) -> Option<f64> {
        let then = self.last.checked_sub(TREND_SPAN)?;
        Some(self.sma(period)? - self.data.indicators.sma(period, then)?)
    }

    /// Percent gap of SMA5 over SMA25.
    fn short_ma_gap(&self) -> Option<f64> {
        let sma5 = self.sma(5)?;
        let sma25 = self.sma(25)?;
        conditions::divergence_rate(sma5, sma25)
    }

    /// Up to `n` bars ending at the last bar, inside the recent window.
    fn tail(&self, n: usize) -> &'a [OhlcvBar] {
        let from = (self.last + 1).saturating_sub(n).max(self.start);
        &self.data.bars[from..=self.last]
    }

    /// Up to `n` bars ending at the last bar, over the full history.
    fn full_tail(&self, n: usize) -> &'a [OhlcvBar] {
        let from = (self.last + 1).saturating_sub(n);
        &self.data.bars[from..=self.last]
    }

    /// Valid RCI values among the last `n` recent bars.
    fn rci_tail(&self, period: usize, n: usize) -> Vec<f64> {
        let from = (self.last + 1).saturating_sub(n).max(self.start);
        (from..=self.last)
            .filter_map(|i| self.data.indicators.rci(period, i))
            .collect()
    }

    /// Highest swing high over the full history.
    fn highest_peak(&self) -> Option<f64> {
        (0..=self.last)
            .filter(|&i| conditions::is_peak(self.data, i, SWING_WINDOW))
            .map(|i| self.data.bars[i].high)
            .reduce(f64::max)
    }

    /// Lowest swing low over the full history.
    fn lowest_trough(&self) -> Option<f64> {
        (0..=self.last)
            .filter(|&i| conditions::is_trough(self.data, i, SWING_WINDOW))
            .map(|i| self.data.bars[i].low)
            .reduce(f64::min)
    }
}

fn mean_volume(bars: &[OhlcvBar]) -> f64 {
    if bars.is_empty() {
        return 0.0;
    }
    bars.iter().map(|b| b.volume as f64).sum::<f64>() / bars.len() as f64
}

/// Of the candles matching `pick`, how many traded more than the previous
/// matching candle, and how many matched.
fn volume_steps_up(bars: &[OhlcvBar], pick: impl Fn(&OhlcvBar) -> bool) -> (usize, usize) {
    let picked: Vec<&OhlcvBar> = bars.iter().filter(|b| pick(b)).collect();
    let ups = picked.windows(2).filter(|w| w[1].volume > w[0].volume).count();
    (ups, picked.len())
}
