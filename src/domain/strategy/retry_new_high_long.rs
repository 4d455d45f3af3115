//! 新高値リトライ: a second run at the recent high after a failed attempt.

use super::conditions::{
    close_change_pct, divergence_rate, is_near_high, prior_high, volume_ratio_at_least,
};
use super::{ConditionReport, Strategy, StrategyKind, MIN_WARMUP};
use crate::domain::stock_data::StockData;

const NEAR_HIGH_PCT: f64 = 5.0;
const MID_MA_BAND_PCT: f64 = 5.0;

#[derive(Debug, Clone)]
pub struct RetryNewHighLong {
    pub lookback: usize,
    pub price_change_threshold: f64,
}

impl Default for RetryNewHighLong {
    fn default() -> Self {
        Self {
            lookback: 60,
            price_change_threshold: 5.0,
        }
    }
}

impl Strategy for RetryNewHighLong {
    fn key(&self) -> &'static str {
        "retry_new_high_long"
    }

    fn name(&self) -> &'static str {
        "新高値リトライ"
    }

    fn description(&self) -> &'static str {
        "新高値付近で陽線、安値切り上げと出来高増加を伴う再挑戦"
    }

    fn kind(&self) -> StrategyKind {
        StrategyKind::Long
    }

    fn parameters(&self) -> Vec<(&'static str, String)> {
        vec![
            ("lookback", self.lookback.to_string()),
            (
                "price_change_threshold",
                self.price_change_threshold.to_string(),
            ),
        ]
    }

    fn warmup(&self) -> usize {
        MIN_WARMUP.max(self.lookback)
    }

    fn conditions(&self, data: &StockData, i: usize) -> ConditionReport {
        let bar = &data.bars[i];
        let prev = i.checked_sub(1).map(|p| &data.bars[p]);
        let ind = &data.indicators;

        let below_high = prior_high(data, i, self.lookback).is_some_and(|h| bar.high < h);
        let higher_low = prev.is_some_and(|p| bar.low >= p.low);
        let big_move =
            close_change_pct(data, i).is_some_and(|c| c >= self.price_change_threshold);
        let prev_bearish = prev.is_some_and(|p| p.is_bearish());
        let band_break = ind.bollinger(i).is_some_and(|b| bar.close > b.upper);
        let prev_near_mid_ma = i
            .checked_sub(1)
            .and_then(|p| {
                let ma = ind.sma(75, p)?;
                divergence_rate(data.bars[p].close, ma)
            })
            .is_some_and(|d| d.abs() < MID_MA_BAND_PCT);

        ConditionReport::new()
            .require(
                "そろそろ新高値",
                is_near_high(data, i, self.lookback, NEAR_HIGH_PCT),
            )
            .require("本日新高値ではない", below_high)
            .require("本日陽線", bar.is_bullish())
            .require("当日安値が前日安値以上", higher_low)
            .require("出来高明確に増加", volume_ratio_at_least(data, i, 1.5))
            .any("前日比5%以上", big_move)
            .any("前日陰線", prev_bearish)
            .any("ボリンジャーバンド3σ抜け", band_break)
            .any("前日中期MA近辺", prev_near_mid_ma)
    }

    fn exit(&self, data: &StockData, i: usize) -> bool {
        data.indicators
            .bollinger(i)
            .is_some_and(|b| data.bars[i].close < b.lower)
    }
}
