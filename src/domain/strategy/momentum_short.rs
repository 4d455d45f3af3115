//! 順張り空売り: ride an established downtrend on a heavy bearish bar.

use super::conditions::{
    bearish_count, gt, has_long_upper_shadow, is_volume_increasing, sma_dead_cross, sma_order,
    volume_ratio_at_least, within_bars,
};
use super::{ConditionReport, Strategy, StrategyKind};
use crate::domain::stock_data::StockData;

const BEARISH_WINDOW: usize = 10;

#[derive(Debug, Clone)]
pub struct MomentumShort {
    pub min_volume: i64,
}

impl Default for MomentumShort {
    fn default() -> Self {
        Self {
            min_volume: 100_000,
        }
    }
}

impl Strategy for MomentumShort {
    fn key(&self) -> &'static str {
        "momentum_short"
    }

    fn name(&self) -> &'static str {
        "順張り空売り"
    }

    fn description(&self) -> &'static str {
        "下降トレンド継続中の出来高を伴う上ヒゲ陰線で空売り"
    }

    fn kind(&self) -> StrategyKind {
        StrategyKind::Short
    }

    fn parameters(&self) -> Vec<(&'static str, String)> {
        vec![("min_volume", self.min_volume.to_string())]
    }

    fn conditions(&self, data: &StockData, i: usize) -> ConditionReport {
        let bar = &data.bars[i];
        let ind = &data.indicators;

        ConditionReport::new()
            .require("出来高前日比1.2倍以上", volume_ratio_at_least(data, i, 1.2))
            .require("出来高10万以上", bar.volume >= self.min_volume)
            .require("中期MA>短期MA", gt(ind.sma(25, i), ind.sma(5, i)))
            .require("本日陰線", bar.is_bearish())
            .require("上ヒゲ長い", has_long_upper_shadow(bar))
            .require("出来高増加", is_volume_increasing(data, i))
            .require("移動平均逆行配列", sma_order(data, i, &[200, 75, 25, 5]))
            .require(
                "直近10日間の過半数が陰線",
                bearish_count(data, i, BEARISH_WINDOW) > BEARISH_WINDOW / 2,
            )
            .any(
                "デッドクロス直近3日以内",
                within_bars(i, 3, |k| sma_dead_cross(data, k, 5, 25)),
            )
    }

    fn exit(&self, data: &StockData, i: usize) -> bool {
        let ind = &data.indicators;
        gt(ind.sma(5, i), ind.sma(25, i))
    }
}
