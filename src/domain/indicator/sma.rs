//! Simple Moving Average of close and of volume.
//!
//! SMA[i] = mean(x[i-n+1..=i]). Warmup: first (n-1) bars are invalid.

use crate::domain::indicator::{
    invalid_series, IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue,
};
use crate::domain::ohlcv::OhlcvBar;

pub fn calculate_sma(bars: &[OhlcvBar], period: usize) -> IndicatorSeries {
    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    rolling_mean_series(bars, &closes, period, IndicatorType::Sma(period))
}

pub fn calculate_volume_ma(bars: &[OhlcvBar], period: usize) -> IndicatorSeries {
    let volumes: Vec<f64> = bars.iter().map(|b| b.volume as f64).collect();
    rolling_mean_series(bars, &volumes, period, IndicatorType::VolumeMa(period))
}

fn rolling_mean_series(
    bars: &[OhlcvBar],
    inputs: &[f64],
    period: usize,
    indicator_type: IndicatorType,
) -> IndicatorSeries {
    if period == 0 {
        return invalid_series(bars, indicator_type);
    }

    let mut values = Vec::with_capacity(bars.len());
    let mut sum = 0.0;

    for (i, bar) in bars.iter().enumerate() {
        sum += inputs[i];
        if i >= period {
            sum -= inputs[i - period];
        }
        let valid = i + 1 >= period;
        values.push(IndicatorPoint {
            date: bar.date,
            valid,
            value: IndicatorValue::Simple(if valid { sum / period as f64 } else { 0.0 }),
        });
    }

    IndicatorSeries {
        indicator_type,
        values,
    }
}
