//! 押し目買い: buy a short-term dip inside a long-term uptrend.

use super::conditions::{divergence_rate, gt, is_volume_increasing, lt, sma_trending_up};
use super::{ConditionReport, Strategy, StrategyKind};
use crate::domain::stock_data::StockData;

/// Close may sit this far under a supporting average and still count as held.
const SUPPORT_TOLERANCE: f64 = 0.98;
const RCI_OVERSOLD: f64 = -80.0;

#[derive(Debug, Clone)]
pub struct PullbackBuyLong {
    /// Divergence from SMA5 (percent) at or below which the dip is deep enough.
    pub divergence_threshold: f64,
}

impl Default for PullbackBuyLong {
    fn default() -> Self {
        Self {
            divergence_threshold: -5.0,
        }
    }
}

impl Strategy for PullbackBuyLong {
    fn key(&self) -> &'static str {
        "pullback_buy_long"
    }

    fn name(&self) -> &'static str {
        "押し目買い"
    }

    fn description(&self) -> &'static str {
        "長期上昇トレンド中の一時的な下落で買い、移動平均線が下支え"
    }

    fn kind(&self) -> StrategyKind {
        StrategyKind::Long
    }

    fn parameters(&self) -> Vec<(&'static str, String)> {
        vec![(
            "divergence_threshold",
            self.divergence_threshold.to_string(),
        )]
    }

    fn conditions(&self, data: &StockData, i: usize) -> ConditionReport {
        let bar = &data.bars[i];
        let ind = &data.indicators;

        let long_uptrend = sma_trending_up(data, i, 200, 20) && sma_trending_up(data, i, 75, 20);
        let supported = [25, 75, 200]
            .iter()
            .filter_map(|&p| ind.sma(p, i))
            .any(|ma| bar.close >= ma * SUPPORT_TOLERANCE);
        let short_downtrend = i >= 5 && lt(ind.sma(5, i), ind.sma(5, i - 5));
        let quiet_selling = !bar.is_bearish() || !is_volume_increasing(data, i);
        let deep_dip = ind
            .sma(5, i)
            .and_then(|ma| divergence_rate(bar.close, ma))
            .is_some_and(|d| d <= self.divergence_threshold);
        let oversold = ind.rci(9, i).is_some_and(|r| r <= RCI_OVERSOLD);

        ConditionReport::new()
            .require("長期上昇トレンド", long_uptrend)
            .require("移動平均線が下支え", supported)
            .require("日足下降トレンド", short_downtrend)
            .require("陰線時の出来高減少", quiet_selling)
            .any("5日MA乖離率-5%以下", deep_dip)
            .any("RCI売られすぎ（-80以下）", oversold)
    }

    fn exit(&self, data: &StockData, i: usize) -> bool {
        let bar = &data.bars[i];
        bar.is_bullish() && gt(Some(bar.close), data.indicators.sma(5, i))
    }
}
