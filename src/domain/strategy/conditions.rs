//! Candle and moving-average predicates shared by the strategies and detectors.
//!
//! Every helper takes the bar index it judges and returns `false` (or `None`)
//! when the history or an indicator needed is not available yet.

use crate::domain::ohlcv::OhlcvBar;
use crate::domain::stock_data::StockData;

/// Shadow must exceed this multiple of the body to count as "long".
pub const SHADOW_BODY_RATIO: f64 = 2.0;

/// (price - ma) / ma * 100, `None` when `ma` is zero.
pub fn divergence_rate(price: f64, ma: f64) -> Option<f64> {
    if ma == 0.0 {
        None
    } else {
        Some((price - ma) / ma * 100.0)
    }
}

pub fn is_golden_cross(prev_short: f64, prev_long: f64, short: f64, long: f64) -> bool {
    prev_short <= prev_long && short > long
}

pub fn is_dead_cross(prev_short: f64, prev_long: f64, short: f64, long: f64) -> bool {
    prev_short >= prev_long && short < long
}

/// `a > b` when both are available.
pub fn gt(a: Option<f64>, b: Option<f64>) -> bool {
    matches!((a, b), (Some(a), Some(b)) if a > b)
}

/// `a < b` when both are available.
pub fn lt(a: Option<f64>, b: Option<f64>) -> bool {
    matches!((a, b), (Some(a), Some(b)) if a < b)
}

fn body_for_shadow(bar: &OhlcvBar) -> f64 {
    let body = bar.body();
    if body == 0.0 { 0.01 } else { body }
}

pub fn has_long_upper_shadow(bar: &OhlcvBar) -> bool {
    bar.upper_shadow() > body_for_shadow(bar) * SHADOW_BODY_RATIO
}

pub fn has_long_lower_shadow(bar: &OhlcvBar) -> bool {
    bar.lower_shadow() > body_for_shadow(bar) * SHADOW_BODY_RATIO
}

/// Max high over the `lookback` bars before `index` (fewer near the start).
pub fn prior_high(data: &StockData, index: usize, lookback: usize) -> Option<f64> {
    if index == 0 || lookback == 0 {
        return None;
    }
    let start = index.saturating_sub(lookback);
    data.bars[start..index]
        .iter()
        .map(|b| b.high)
        .reduce(f64::max)
}

/// Min low over the `lookback` bars before `index` (fewer near the start).
pub fn prior_low(data: &StockData, index: usize, lookback: usize) -> Option<f64> {
    if index == 0 || lookback == 0 {
        return None;
    }
    let start = index.saturating_sub(lookback);
    data.bars[start..index]
        .iter()
        .map(|b| b.low)
        .reduce(f64::min)
}

/// Max high over the full `window` bars ending at `index` inclusive.
pub fn rolling_high(data: &StockData, index: usize, window: usize) -> Option<f64> {
    if window == 0 || index + 1 < window {
        return None;
    }
    data.bars[index + 1 - window..=index]
        .iter()
        .map(|b| b.high)
        .reduce(f64::max)
}

/// Close below the previous `lookback`-bar high but within `threshold_pct` of it.
pub fn is_near_high(data: &StockData, index: usize, lookback: usize, threshold_pct: f64) -> bool {
    let Some(recent) = prior_high(data, index, lookback) else {
        return false;
    };
    if recent == 0.0 {
        return false;
    }
    let close = data.bars[index].close;
    let diff = (recent - close) / recent * 100.0;
    close < recent && (0.0..=threshold_pct).contains(&diff)
}

/// Close above the previous `lookback`-bar low but within `threshold_pct` of it.
pub fn is_near_low(data: &StockData, index: usize, lookback: usize, threshold_pct: f64) -> bool {
    let Some(recent) = prior_low(data, index, lookback) else {
        return false;
    };
    if recent == 0.0 {
        return false;
    }
    let close = data.bars[index].close;
    let diff = (close - recent) / recent * 100.0;
    close > recent && (0.0..=threshold_pct).contains(&diff)
}

/// Volume at `index` is at least `ratio` times the previous bar's.
pub fn volume_ratio_at_least(data: &StockData, index: usize, ratio: f64) -> bool {
    index >= 1 && data.bars[index].volume as f64 >= data.bars[index - 1].volume as f64 * ratio
}

pub fn is_volume_increasing(data: &StockData, index: usize) -> bool {
    index >= 1 && data.bars[index].volume > data.bars[index - 1].volume
}

/// SMA values in `periods` order are strictly decreasing (missing values give `false`).
///
/// `[5, 25, 75, 200]` checks the bullish stack SMA5 > SMA25 > SMA75 > SMA200,
/// `[200, 75, 25, 5]` the bearish one.
pub fn sma_order(data: &StockData, index: usize, periods: &[usize]) -> bool {
    let values: Option<Vec<f64>> = periods
        .iter()
        .map(|&p| data.indicators.sma(p, index))
        .collect();
    match values {
        Some(v) => v.windows(2).all(|w| w[0] > w[1]),
        None => false,
    }
}

/// SMA(period) at `index` is at or above its value `lookback` bars earlier.
pub fn sma_trending_up(data: &StockData, index: usize, period: usize, lookback: usize) -> bool {
    if index < lookback {
        return false;
    }
    match (
        data.indicators.sma(period, index),
        data.indicators.sma(period, index - lookback),
    ) {
        (Some(now), Some(then)) => now >= then,
        _ => false,
    }
}

pub fn sma_golden_cross(data: &StockData, index: usize, short: usize, long: usize) -> bool {
    sma_cross(data, index, short, long, is_golden_cross)
}

pub fn sma_dead_cross(data: &StockData, index: usize, short: usize, long: usize) -> bool {
    sma_cross(data, index, short, long, is_dead_cross)
}

fn sma_cross(
    data: &StockData,
    index: usize,
    short: usize,
    long: usize,
    cross: fn(f64, f64, f64, f64) -> bool,
) -> bool {
    if index == 0 {
        return false;
    }
    let ind = &data.indicators;
    match (
        ind.sma(short, index - 1),
        ind.sma(long, index - 1),
        ind.sma(short, index),
        ind.sma(long, index),
    ) {
        (Some(ps), Some(pl), Some(s), Some(l)) => cross(ps, pl, s, l),
        _ => false,
    }
}

/// True if `pred` holds at `index` or any of the `bars - 1` bars before it.
pub fn within_bars(index: usize, bars: usize, pred: impl Fn(usize) -> bool) -> bool {
    (0..bars).filter(|&k| k <= index).any(|k| pred(index - k))
}

/// High at `index` equals the max high of the centered `2 * window + 1` bars
/// (clipped at both ends). Reads bars after `index`.
pub fn is_peak(data: &StockData, index: usize, window: usize) -> bool {
    let start = index.saturating_sub(window);
    let end = (index + window).min(data.bar_count() - 1);
    let max = data.bars[start..=end]
        .iter()
        .map(|b| b.high)
        .fold(f64::MIN, f64::max);
    data.bars[index].high == max
}

/// Low at `index` equals the min low of the centered `2 * window + 1` bars.
pub fn is_trough(data: &StockData, index: usize, window: usize) -> bool {
    let start = index.saturating_sub(window);
    let end = (index + window).min(data.bar_count() - 1);
    let min = data.bars[start..=end]
        .iter()
        .map(|b| b.low)
        .fold(f64::MAX, f64::min);
    data.bars[index].low == min
}

/// The `count` bars ending at `index` are all bearish.
pub fn consecutive_bearish(data: &StockData, index: usize, count: usize) -> bool {
    index + 1 >= count && data.bars[index + 1 - count..=index].iter().all(|b| b.is_bearish())
}

/// The `count` bars ending at `index` are all bullish.
pub fn consecutive_bullish(data: &StockData, index: usize, count: usize) -> bool {
    index + 1 >= count && data.bars[index + 1 - count..=index].iter().all(|b| b.is_bullish())
}

/// Bearish candles among the last `window` bars ending at `index` (fewer near the start).
pub fn bearish_count(data: &StockData, index: usize, window: usize) -> usize {
    let start = (index + 1).saturating_sub(window);
    data.bars[start..=index].iter().filter(|b| b.is_bearish()).count()
}

/// Bullish candles among the last `window` bars ending at `index` (fewer near the start).
pub fn bullish_count(data: &StockData, index: usize, window: usize) -> usize {
    let start = (index + 1).saturating_sub(window);
    data.bars[start..=index].iter().filter(|b| b.is_bullish()).count()
}

/// Percentage change of the close versus the previous close.
pub fn close_change_pct(data: &StockData, index: usize) -> Option<f64> {
    if index == 0 {
        return None;
    }
    let prev = data.bars[index - 1].close;
    if prev == 0.0 {
        None
    } else {
        Some((data.bars[index].close - prev) / prev * 100.0)
    }
}
