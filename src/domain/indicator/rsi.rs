//! RSI (Relative Strength Index) indicator implementation.
//!
//! Average gain/loss are simple rolling means over the last n price changes
//! (no Wilder smoothing).
//!
//! Formula: RSI = 100 - (100 / (1 + avg_gain / avg_loss))
//! If avg_loss == 0 and avg_gain > 0: RSI = 100.
//! If both averages are 0 the value is undefined and the point is invalid.
//!
//! Warmup: first n bars are invalid (need n price changes).

use crate::domain::indicator::{
    invalid_series, IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue,
};
use crate::domain::ohlcv::OhlcvBar;

pub fn calculate_rsi(bars: &[OhlcvBar], period: usize) -> IndicatorSeries {
    if period == 0 || bars.len() < 2 {
        return invalid_series(bars, IndicatorType::Rsi(period));
    }

    let mut gains = vec![0.0; bars.len()];
    let mut losses = vec![0.0; bars.len()];
    for i in 1..bars.len() {
        let change = bars[i].close - bars[i - 1].close;
        if change > 0.0 {
            gains[i] = change;
        } else {
            losses[i] = -change;
        }
    }

    let mut values = Vec::with_capacity(bars.len());
    let mut gain_sum = 0.0;
    let mut loss_sum = 0.0;

    for (i, bar) in bars.iter().enumerate() {
        if i >= 1 {
            gain_sum += gains[i];
            loss_sum += losses[i];
        }
        if i > period {
            gain_sum -= gains[i - period];
            loss_sum -= losses[i - period];
        }

        let rsi = if i >= period {
            let avg_gain = gain_sum / period as f64;
            let avg_loss = loss_sum / period as f64;
            if avg_loss <= 0.0 && avg_gain <= 0.0 {
                None
            } else if avg_loss <= 0.0 {
                Some(100.0)
            } else {
                Some(100.0 - (100.0 / (1.0 + avg_gain / avg_loss)))
            }
        } else {
            None
        };

        values.push(IndicatorPoint {
            date: bar.date,
            valid: rsi.is_some(),
            value: IndicatorValue::Simple(rsi.unwrap_or(0.0)),
        });
    }

    IndicatorSeries {
        indicator_type: IndicatorType::Rsi(period),
        values,
    }
}
