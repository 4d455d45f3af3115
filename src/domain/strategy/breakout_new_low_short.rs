//! 新安値ブレイク: short a fresh low made on rising volume in a downtrend.

use super::conditions::{gt, is_near_low, prior_low, sma_order, volume_ratio_at_least};
use super::{ConditionReport, Strategy, StrategyKind, MIN_WARMUP};
use crate::domain::stock_data::StockData;

const NEAR_LOW_PCT: f64 = 5.0;

#[derive(Debug, Clone)]
pub struct BreakoutNewLowShort {
    pub lookback: usize,
    pub min_volume: i64,
}

impl Default for BreakoutNewLowShort {
    fn default() -> Self {
        Self {
            lookback: 60,
            min_volume: 100_000,
        }
    }
}

impl Strategy for BreakoutNewLowShort {
    fn key(&self) -> &'static str {
        "breakout_new_low_short"
    }

    fn name(&self) -> &'static str {
        "新安値ブレイク"
    }

    fn description(&self) -> &'static str {
        "新安値更新で陰線、出来高増加、移動平均が逆行配列"
    }

    fn kind(&self) -> StrategyKind {
        StrategyKind::Short
    }

    fn parameters(&self) -> Vec<(&'static str, String)> {
        vec![
            ("lookback", self.lookback.to_string()),
            ("min_volume", self.min_volume.to_string()),
        ]
    }

    fn warmup(&self) -> usize {
        MIN_WARMUP.max(self.lookback)
    }

    fn conditions(&self, data: &StockData, i: usize) -> ConditionReport {
        let bar = &data.bars[i];
        let new_low = prior_low(data, i, self.lookback).is_some_and(|l| bar.low <= l);

        ConditionReport::new()
            .require("新安値更新", new_low)
            .require(
                "そろそろ新安値",
                is_near_low(data, i, self.lookback, NEAR_LOW_PCT),
            )
            .require("出来高10万以上", bar.volume >= self.min_volume)
            .require("移動平均逆行配列", sma_order(data, i, &[200, 75, 25, 5]))
            .require("本日陰線", bar.is_bearish())
            .require("出来高明確に増加", volume_ratio_at_least(data, i, 1.5))
    }

    fn exit(&self, data: &StockData, i: usize) -> bool {
        gt(Some(data.bars[i].close), data.indicators.sma(5, i))
    }
}
