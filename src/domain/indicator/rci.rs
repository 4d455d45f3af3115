//! RCI (Rank Correlation Index).
//!
//! Spearman rank correlation between time and price over the last n closes,
//! scaled to -100..=100:
//!
//! RCI = (1 - 6 * Σd² / (n * (n² - 1))) * 100
//!
//! Date ranks run 1..=n from oldest to newest. Price ranks are ordinal in
//! ascending order, ties broken by position. Warmup: first (n-1) bars are invalid.

use crate::domain::indicator::{
    invalid_series, IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue,
};
use crate::domain::ohlcv::OhlcvBar;

pub fn calculate_rci(bars: &[OhlcvBar], period: usize) -> IndicatorSeries {
    if period < 2 {
        return invalid_series(bars, IndicatorType::Rci(period));
    }

    let n = period as f64;
    let denom = n * (n * n - 1.0);
    let mut values = Vec::with_capacity(bars.len());

    for (i, bar) in bars.iter().enumerate() {
        let valid = i + 1 >= period;
        let rci = if valid {
            let window = &bars[i + 1 - period..=i];
            let mut order: Vec<usize> = (0..period).collect();
            order.sort_by(|&a, &b| window[a].close.total_cmp(&window[b].close));

            let mut d2 = 0.0;
            for (price_rank, &pos) in order.iter().enumerate() {
                let d = (pos as f64) - (price_rank as f64);
                d2 += d * d;
            }
            (1.0 - 6.0 * d2 / denom) * 100.0
        } else {
            0.0
        };

        values.push(IndicatorPoint {
            date: bar.date,
            valid,
            value: IndicatorValue::Simple(rci),
        });
    }

    IndicatorSeries {
        indicator_type: IndicatorType::Rci(period),
        values,
    }
}
