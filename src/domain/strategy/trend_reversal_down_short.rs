//! 上昇トレンド反転: short the first leg down after a dead cross.

use super::conditions::{
    consecutive_bearish, gt, has_long_upper_shadow, is_dead_cross, sma_dead_cross, within_bars,
};
use super::{ConditionReport, Strategy, StrategyKind};
use crate::domain::stock_data::StockData;

const RCI_FLOOR: f64 = -80.0;

#[derive(Debug, Clone)]
pub struct TrendReversalDownShort {
    pub min_volume: i64,
}

impl Default for TrendReversalDownShort {
    fn default() -> Self {
        Self {
            min_volume: 100_000,
        }
    }
}

/// RCI(9) falling at `i` and not yet oversold.
pub(crate) fn rci_turning_down(data: &StockData, i: usize) -> bool {
    if i < 2 {
        return false;
    }
    let ind = &data.indicators;
    match (ind.rci(9, i), ind.rci(9, i - 1), ind.rci(9, i - 2)) {
        (Some(r), Some(r1), Some(r2)) => ((r < r1) || (r < r2 && r1 <= r2)) && r >= RCI_FLOOR,
        _ => false,
    }
}

fn macd_dead_cross(data: &StockData, i: usize) -> bool {
    if i == 0 {
        return false;
    }
    let ind = &data.indicators;
    match (ind.macd(i - 1), ind.macd(i)) {
        (Some(p), Some(c)) => is_dead_cross(p.line, p.signal, c.line, c.signal),
        _ => false,
    }
}

impl Strategy for TrendReversalDownShort {
    fn key(&self) -> &'static str {
        "trend_reversal_down_short"
    }

    fn name(&self) -> &'static str {
        "上昇トレンド反転"
    }

    fn description(&self) -> &'static str {
        "デッドクロス、連続陰線、上ヒゲ、RCI反転"
    }

    fn kind(&self) -> StrategyKind {
        StrategyKind::Short
    }

    fn parameters(&self) -> Vec<(&'static str, String)> {
        vec![("min_volume", self.min_volume.to_string())]
    }

    fn conditions(&self, data: &StockData, i: usize) -> ConditionReport {
        let bar = &data.bars[i];
        let macd_below = data
            .indicators
            .macd(i)
            .is_some_and(|m| m.line < m.signal);

        ConditionReport::new()
            .require("出来高10万以上", bar.volume >= self.min_volume)
            .require("3日連続陰線", consecutive_bearish(data, i, 3))
            .require("上ヒゲ長い", has_long_upper_shadow(bar))
            .require(
                "移動平均デッドクロス",
                within_bars(i, 2, |k| sma_dead_cross(data, k, 5, 25)),
            )
            .require("RCI反転", rci_turning_down(data, i))
            .any(
                "MACDデッドクロス",
                within_bars(i, 5, |k| macd_dead_cross(data, k)),
            )
            .any("MACDがシグナル線を下回る", macd_below)
    }

    fn exit(&self, data: &StockData, i: usize) -> bool {
        let ind = &data.indicators;
        gt(ind.sma(5, i), ind.sma(25, i))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::strategy::test_support::{stock_from, stock_from_closes};

    fn rise_then_fall() -> Vec<f64> {
        let mut closes: Vec<f64> = (0..230).map(|i| 100.0 + i as f64).collect();
        closes.extend((1..=15).map(|k| 329.0 - 4.0 * k as f64));
        closes
    }

    /// Bullish climb to 339, then three bearish bars down to 300, the last
    /// with a long upper shadow.
    fn breakdown_setup() -> Vec<(f64, f64, f64, f64, i64)> {
        let mut rows: Vec<(f64, f64, f64, f64, i64)> = (0..240)
            .map(|k| {
                let c = 100.0 + k as f64;
                (c - 0.5, c + 0.5, c - 1.0, c, 100_000)
            })
            .collect();
        rows.push((338.0, 339.0, 329.0, 330.0, 120_000));
        rows.push((331.0, 332.0, 319.0, 320.0, 130_000));
        rows.push((310.0, 335.0, 299.0, 300.0, 150_000));
        rows
    }

    #[test]
    fn entry_on_breakdown_after_top() {
        let data = stock_from(&breakdown_setup());
        let strategy = TrendReversalDownShort::default();
        // SMA5 332.8 over SMA25 327.76, then 325.4 under 327.08
        assert!(sma_dead_cross(&data, 242, 5, 25));
        // RCI(9) 40.0, -6.7, -41.7
        assert!(rci_turning_down(&data, 242));
        let report = strategy.conditions(&data, 242);
        assert!(report.is_met(), "{:?}", report);
        assert!(report.met_labels().contains(&"MACDがシグナル線を下回る"));
        assert!(strategy.entry(&data, 242));
    }

    #[test]
    fn rci_turn_down_detection() {
        let mut closes: Vec<f64> = (0..20).map(|i| 100.0 + i as f64).collect();
        closes.extend([118.0, 116.0]);
        let data = stock_from_closes(&closes);
        assert!(rci_turning_down(&data, 21));
        assert!(!rci_turning_down(&data, 15));
    }

    #[test]
    fn dead_cross_and_macd_reported_after_top() {
        let closes = rise_then_fall();
        let data = stock_from_closes(&closes);
        let strategy = TrendReversalDownShort::default();
        let cross = (200..closes.len())
            .find(|&i| sma_dead_cross(&data, i, 5, 25))
            .expect("dead cross after the top");
        let labels = strategy.conditions(&data, cross).met_labels();
        assert!(labels.contains(&"移動平均デッドクロス"));
        assert!(labels.contains(&"MACDがシグナル線を下回る"));
        // flat candles are never bearish
        assert!(!labels.contains(&"3日連続陰線"));
        assert!(!strategy.entry(&data, cross));
    }

    #[test]
    fn exit_once_sma5_recovers() {
        let mut closes = rise_then_fall();
        closes.extend([300.0, 320.0, 340.0, 360.0, 380.0]);
        let data = stock_from_closes(&closes);
        let strategy = TrendReversalDownShort::default();
        assert!(strategy.exit(&data, closes.len() - 1));
        assert!(!strategy.exit(&data, 244));
    }
}
