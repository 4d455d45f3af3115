//! 押し目空売り: sell a rally that stalls at a falling average.

use super::conditions::{divergence_rate, has_long_upper_shadow, is_peak, gt, sma_order};
use super::{ConditionReport, Strategy, StrategyKind};
use crate::domain::stock_data::StockData;

const PEAK_WINDOW: usize = 5;

#[derive(Debug, Clone)]
pub struct PullbackShort {
    pub min_volume: i64,
}

impl Default for PullbackShort {
    fn default() -> Self {
        Self {
            min_volume: 100_000,
        }
    }
}

impl Strategy for PullbackShort {
    fn key(&self) -> &'static str {
        "pullback_short"
    }

    fn name(&self) -> &'static str {
        "押し目空売り"
    }

    fn description(&self) -> &'static str {
        "下降トレンド中の戻りで上ヒゲ陰線、移動平均線が抵抗線"
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
        let resisted = [75, 200]
            .iter()
            .filter_map(|&p| ind.sma(p, i).and_then(|ma| divergence_rate(bar.close, ma)))
            .any(|d| (-2.0..=0.0).contains(&d));

        ConditionReport::new()
            .require("出来高10万以上", bar.volume >= self.min_volume)
            .require("本日陰線", bar.is_bearish())
            .require("上ヒゲ長い", has_long_upper_shadow(bar))
            .require("山の頂点ではない", !is_peak(data, i, PEAK_WINDOW))
            .require("移動平均逆行配列", sma_order(data, i, &[200, 75, 25, 5]))
            .require("移動平均線が抵抗線", resisted)
    }

    fn exit(&self, data: &StockData, i: usize) -> bool {
        let ind = &data.indicators;
        gt(ind.sma(5, i), ind.sma(25, i))
    }
}
