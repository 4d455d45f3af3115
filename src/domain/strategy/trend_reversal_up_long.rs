//! 下降トレンド反転: a golden cross with a turning RCI after a decline.

use super::conditions::{
    consecutive_bullish, divergence_rate, gt, has_long_lower_shadow, is_golden_cross,
    is_volume_increasing, sma_golden_cross, sma_trending_up, volume_ratio_at_least, within_bars,
};
use super::{ConditionReport, Strategy, StrategyKind};
use crate::domain::stock_data::StockData;

/// Largest body-to-close ratio tolerated in the last five candles.
const MAX_BODY_RATIO: f64 = 0.10;
const RCI_CEILING: f64 = 80.0;

#[derive(Debug, Clone)]
pub struct TrendReversalUpLong {
    pub min_volume: i64,
    /// Also require one of the confirmation conditions.
    pub or_conditions_required: bool,
}

impl Default for TrendReversalUpLong {
    fn default() -> Self {
        Self {
            min_volume: 100_000,
            or_conditions_required: false,
        }
    }
}

/// RCI(9) rising at `i` and not yet overbought.
pub(crate) fn rci_turning_up(data: &StockData, i: usize) -> bool {
    if i < 2 {
        return false;
    }
    let ind = &data.indicators;
    match (ind.rci(9, i), ind.rci(9, i - 1), ind.rci(9, i - 2)) {
        (Some(r), Some(r1), Some(r2)) => ((r > r1) || (r > r2 && r1 >= r2)) && r <= RCI_CEILING,
        _ => false,
    }
}

fn rci_golden_cross(data: &StockData, i: usize) -> bool {
    if i == 0 {
        return false;
    }
    let ind = &data.indicators;
    match (
        ind.rci(9, i - 1),
        ind.rci(26, i - 1),
        ind.rci(9, i),
        ind.rci(26, i),
    ) {
        (Some(ps), Some(pl), Some(s), Some(l)) => is_golden_cross(ps, pl, s, l),
        _ => false,
    }
}

impl Strategy for TrendReversalUpLong {
    fn key(&self) -> &'static str {
        "trend_reversal_up_long"
    }

    fn name(&self) -> &'static str {
        "下降トレンド反転"
    }

    fn description(&self) -> &'static str {
        "ゴールデンクロス、RCI反転、連続陽線、出来高増加"
    }

    fn kind(&self) -> StrategyKind {
        StrategyKind::Long
    }

    fn parameters(&self) -> Vec<(&'static str, String)> {
        vec![
            ("min_volume", self.min_volume.to_string()),
            (
                "or_conditions_required",
                self.or_conditions_required.to_string(),
            ),
        ]
    }

    fn conditions(&self, data: &StockData, i: usize) -> ConditionReport {
        let bar = &data.bars[i];
        let ind = &data.indicators;

        let start = (i + 1).saturating_sub(5);
        let modest_bodies = data.bars[start..=i]
            .iter()
            .all(|b| b.body_ratio() <= MAX_BODY_RATIO);
        let bullish_recently =
            bar.is_bullish() || (i >= 1 && data.bars[i - 1].is_bullish());

        let report = ConditionReport::new()
            .require("出来高前日比1.2倍以上", volume_ratio_at_least(data, i, 1.2))
            .require("出来高10万以上", bar.volume >= self.min_volume)
            .require("短期MA>中期MA", gt(ind.sma(5, i), ind.sma(25, i)))
            .require(
                "ゴールデンクロス",
                within_bars(i, 3, |k| sma_golden_cross(data, k, 5, 25)),
            )
            .require("長期MA上向き", sma_trending_up(data, i, 200, 10))
            .require("実体が大きすぎない", modest_bodies)
            .require("下ヒゲ長い", has_long_lower_shadow(bar))
            .require("株価>長期MA", gt(Some(bar.close), ind.sma(200, i)))
            .require("当日or前日陽線", bullish_recently)
            .require("RCI反転", rci_turning_up(data, i));

        if !self.or_conditions_required {
            return report;
        }

        let near_long_ma = ind
            .sma(200, i)
            .and_then(|ma| divergence_rate(bar.close, ma))
            .is_some_and(|d| d.abs() <= 10.0);
        let rising_run = consecutive_bullish(data, i, 2)
            && is_volume_increasing(data, i)
            && i >= 1
            && is_volume_increasing(data, i - 1);

        report
            .any("長期MA乖離率10%以内", near_long_ma)
            .any("RCIゴールデンクロス", rci_golden_cross(data, i))
            .any("連続陽線かつ出来高増加", rising_run)
    }

    fn exit(&self, data: &StockData, i: usize) -> bool {
        let ind = &data.indicators;
        gt(ind.sma(25, i), ind.sma(5, i))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::strategy::test_support::{stock_from, stock_from_closes};

    /// Long climb, a five-bar dip to 318 that drops SMA5 under SMA25, then
    /// a gap-up bar with a small body and a long lower shadow.
    fn rebound_setup() -> Vec<(f64, f64, f64, f64, i64)> {
        let mut rows: Vec<(f64, f64, f64, f64, i64)> = (0..240)
            .map(|k| {
                let c = 100.0 + k as f64;
                (c - 0.5, c + 0.5, c - 1.0, c, 100_000)
            })
            .collect();
        rows.extend([(319.0, 320.0, 317.0, 318.0, 100_000); 5]);
        rows.push((386.0, 391.0, 370.0, 390.0, 150_000));
        rows
    }

    #[test]
    fn entry_on_rebound_golden_cross() {
        let data = stock_from(&rebound_setup());
        let strategy = TrendReversalUpLong::default();
        // SMA5 318.0 under SMA25 327.2, then 332.4 over 330.0
        assert!(sma_golden_cross(&data, 245, 5, 25));
        // RCI(9) -50 then 0
        assert!(rci_turning_up(&data, 245));
        let report = strategy.conditions(&data, 245);
        assert!(report.is_met(), "{:?}", report);
        assert!(strategy.entry(&data, 245));
        assert!(!strategy.exit(&data, 245));
    }

    #[test]
    fn rci_turn_detection() {
        // falling then rising: RCI(9) climbs off its low
        let mut closes: Vec<f64> = (0..20).map(|i| 200.0 - i as f64).collect();
        closes.extend([182.0, 184.0]);
        let data = stock_from_closes(&closes);
        assert!(rci_turning_up(&data, 21));
        assert!(!rci_turning_up(&data, 15));
        assert!(!rci_turning_up(&data, 1));
    }

    #[test]
    fn pinned_rci_is_not_a_turn() {
        let closes: Vec<f64> = (0..30).map(|i| 100.0 + i as f64).collect();
        let data = stock_from_closes(&closes);
        // steady rise pins RCI(9) at 100, above the ceiling and not rising
        assert!(!rci_turning_up(&data, 29));
    }

    #[test]
    fn optional_group_only_when_enabled() {
        let closes: Vec<f64> = (0..210).map(|i| 100.0 + i as f64).collect();
        let data = stock_from_closes(&closes);
        let default = TrendReversalUpLong::default().conditions(&data, 209);
        assert!(default.any_of.is_empty());
        assert_eq!(default.required.len(), 10);

        let strict = TrendReversalUpLong {
            or_conditions_required: true,
            ..Default::default()
        }
        .conditions(&data, 209);
        assert_eq!(strict.any_of.len(), 3);
    }

    #[test]
    fn no_entry_in_steady_uptrend() {
        let closes: Vec<f64> = (0..260).map(|i| 100.0 + i as f64).collect();
        let data = stock_from_closes(&closes);
        let strategy = TrendReversalUpLong::default();
        assert!((200..260).all(|i| !strategy.entry(&data, i)));
    }

    #[test]
    fn exit_when_sma5_below_sma25() {
        let mut closes: Vec<f64> = vec![100.0; 30];
        closes.extend([90.0, 85.0, 80.0]);
        let data = stock_from_closes(&closes);
        let strategy = TrendReversalUpLong::default();
        assert!(strategy.exit(&data, 32));
        assert!(!strategy.exit(&data, 29));
    }
}
