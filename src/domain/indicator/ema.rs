//! Exponential Moving Average indicator.
//!
//! k = 2/(n+1), seeded with the first close, then EMA[i] = C[i]*k + EMA[i-1]*(1-k).
//! Every bar is valid: the recursion starts at bar 0 rather than after an SMA warmup.

use crate::domain::indicator::{
    invalid_series, IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue,
};
use crate::domain::ohlcv::OhlcvBar;

pub fn calculate_ema(bars: &[OhlcvBar], period: usize) -> IndicatorSeries {
    if period == 0 {
        return invalid_series(bars, IndicatorType::Ema(period));
    }

    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let values = ema_raw_values(&closes, period)
        .into_iter()
        .zip(bars)
        .map(|(ema, bar)| IndicatorPoint {
            date: bar.date,
            valid: true,
            value: IndicatorValue::Simple(ema),
        })
        .collect();

    IndicatorSeries {
        indicator_type: IndicatorType::Ema(period),
        values,
    }
}

/// Recursive EMA over raw inputs, seeded with the first input.
pub(crate) fn ema_raw_values(inputs: &[f64], period: usize) -> Vec<f64> {
    let k = 2.0 / (period as f64 + 1.0);
    let mut out = Vec::with_capacity(inputs.len());
    let mut ema = 0.0;
    for (i, &x) in inputs.iter().enumerate() {
        ema = if i == 0 { x } else { x * k + ema * (1.0 - k) };
        out.push(ema);
    }
    out
}
