//! A stock's price history paired with its computed indicators.

use crate::domain::indicator::{compute_all, IndicatorSet};
use crate::domain::ohlcv::OhlcvBar;
use chrono::{Duration, NaiveDate};
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct StockData {
    pub code: String,
    pub name: String,
    pub bars: Vec<OhlcvBar>,
    pub indicators: IndicatorSet,
    pub date_index: HashMap<NaiveDate, usize>,
    /// Mean close over the whole history.
    pub mean_close: f64,
}

impl StockData {
    /// Build from bars sorted by date and compute the full indicator set.
    pub fn new(code: String, name: String, bars: Vec<OhlcvBar>) -> Self {
        let indicators = compute_all(&bars);
        let date_index = bars
            .iter()
            .enumerate()
            .map(|(i, bar)| (bar.date, i))
            .collect();
        let mean_close = if bars.is_empty() {
            0.0
        } else {
            bars.iter().map(|b| b.close).sum::<f64>() / bars.len() as f64
        };
        Self {
            code,
            name,
            bars,
            indicators,
            date_index,
            mean_close,
        }
    }

    pub fn bar_count(&self) -> usize {
        self.bars.len()
    }

    pub fn get_bar(&self, date: NaiveDate) -> Option<&OhlcvBar> {
        self.date_index.get(&date).map(|&i| &self.bars[i])
    }

    pub fn get_bar_index(&self, date: NaiveDate) -> Option<usize> {
        self.date_index.get(&date).copied()
    }

    pub fn last_bar(&self) -> Option<&OhlcvBar> {
        self.bars.last()
    }

    /// Keep only bars within `years` of the last bar date and recompute indicators.
    pub fn limit_years(self, years: u32) -> Self {
        let Some(last) = self.bars.last().map(|b| b.date) else {
            return self;
        };
        let cutoff = last - Duration::days(365 * years as i64);
        if self.bars.first().is_some_and(|b| b.date >= cutoff) {
            return self;
        }
        let bars = self.bars.into_iter().filter(|b| b.date >= cutoff).collect();
        Self::new(self.code, self.name, bars)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_bar(date: &str, close: f64) -> OhlcvBar {
        OhlcvBar {
            code: "7203".to_string(),
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            open: close - 1.0,
            high: close + 1.0,
            low: close - 2.0,
            close,
            volume: 1000,
        }
    }

    #[test]
    fn new_builds_date_index_and_indicators() {
        let bars = vec![
            make_bar("2024-01-01", 100.0),
            make_bar("2024-01-02", 101.0),
            make_bar("2024-01-03", 102.0),
        ];
        let data = StockData::new("7203".into(), "トヨタ自動車".into(), bars);

        assert_eq!(data.bar_count(), 3);
        assert!((data.mean_close - 101.0).abs() < 1e-12);
        assert_eq!(
            data.get_bar_index(NaiveDate::from_ymd_opt(2024, 1, 2).unwrap()),
            Some(1)
        );
        assert!(!data.indicators.is_empty());
    }

    #[test]
    fn get_bar_by_date() {
        let bars = vec![make_bar("2024-01-01", 100.0), make_bar("2024-01-02", 101.0)];
        let data = StockData::new("7203".into(), String::new(), bars);

        let bar = data.get_bar(NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
        assert!((bar.unwrap().close - 101.0).abs() < f64::EPSILON);
        assert!(
            data.get_bar(NaiveDate::from_ymd_opt(2024, 1, 5).unwrap())
                .is_none()
        );
    }

    #[test]
    fn limit_years_counts_back_from_last_bar() {
        let bars = vec![
            make_bar("2020-01-01", 100.0),
            make_bar("2022-06-01", 101.0),
            make_bar("2024-01-01", 102.0),
        ];
        let data = StockData::new("7203".into(), String::new(), bars).limit_years(2);

        assert_eq!(data.bar_count(), 2);
        assert_eq!(
            data.bars[0].date,
            NaiveDate::from_ymd_opt(2022, 6, 1).unwrap()
        );
        assert_eq!(data.get_bar_index(data.bars[1].date), Some(1));
    }

    #[test]
    fn limit_years_empty_is_noop() {
        let data = StockData::new("X".into(), String::new(), vec![]).limit_years(1);
        assert_eq!(data.bar_count(), 0);
    }
}
