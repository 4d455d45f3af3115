//! 新高値ブレイク: a bullish bar with rising volume just under the recent high.

use super::conditions::{
    gt, is_near_high, rolling_high, sma_order, volume_ratio_at_least,
};
use super::{ConditionReport, Strategy, StrategyKind, MIN_WARMUP};
use crate::domain::stock_data::StockData;

#[derive(Debug, Clone)]
pub struct BreakoutNewHighLong {
    pub lookback: usize,
}

impl Default for BreakoutNewHighLong {
    fn default() -> Self {
        Self { lookback: 60 }
    }
}

impl BreakoutNewHighLong {
    /// Near-high tolerance scales with the price level.
    pub fn threshold_pct(mean_close: f64) -> f64 {
        if mean_close >= 3000.0 {
            3.0
        } else if mean_close < 1000.0 {
            5.0
        } else {
            4.0
        }
    }
}

impl Strategy for BreakoutNewHighLong {
    fn key(&self) -> &'static str {
        "breakout_new_high_long"
    }

    fn name(&self) -> &'static str {
        "新高値ブレイク"
    }

    fn description(&self) -> &'static str {
        "そろそろ新高値で出来高増加、陽線で5日MA上抜け、移動平均が順行配列"
    }

    fn kind(&self) -> StrategyKind {
        StrategyKind::Long
    }

    fn parameters(&self) -> Vec<(&'static str, String)> {
        vec![("lookback", self.lookback.to_string())]
    }

    fn warmup(&self) -> usize {
        MIN_WARMUP.max(self.lookback)
    }

    fn conditions(&self, data: &StockData, i: usize) -> ConditionReport {
        let bar = &data.bars[i];
        let ind = &data.indicators;
        let threshold = Self::threshold_pct(data.mean_close);
        let new_high = rolling_high(data, i, self.lookback).is_some_and(|h| bar.high >= h);

        ConditionReport::new()
            .require(
                "そろそろ新高値",
                is_near_high(data, i, self.lookback, threshold),
            )
            .require("出来高前日比1.5倍以上", volume_ratio_at_least(data, i, 1.5))
            .require(
                "陽線かつ5日MA上抜け",
                bar.is_bullish() && gt(Some(bar.close), ind.sma(5, i)),
            )
            .any("移動平均順行配列", sma_order(data, i, &[5, 25, 75, 200]))
            .any(
                "上昇初期（5日MA>25日MA、終値>75日MA）",
                gt(ind.sma(5, i), ind.sma(25, i)) && gt(Some(bar.close), ind.sma(75, i)),
            )
            .any(
                "新高値更新かつ出来高2倍以上",
                new_high && volume_ratio_at_least(data, i, 2.0),
            )
    }

    fn exit(&self, data: &StockData, i: usize) -> bool {
        let bar = &data.bars[i];
        bar.is_bearish() && gt(data.indicators.sma(5, i), Some(bar.close))
    }
}
