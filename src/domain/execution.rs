//! Fill simulation: slippage, commissions, margin lending and exit scanning.
//!
//! Long strategies trade on cash terms; short strategies trade on margin and pay
//! a lending fee for the days the position is open.

use super::backtest::BacktestConfig;
use super::ohlcv::OhlcvBar;
use super::strategy::{PositionState, StrategyKind};

/// Rates applied to one side of the book.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CostModel {
    pub commission_rate: f64,
    pub slippage: f64,
    /// Annual lending rate, zero for cash trades.
    pub lending_rate: f64,
}

impl CostModel {
    pub fn for_kind(kind: StrategyKind, config: &BacktestConfig) -> Self {
        match kind {
            StrategyKind::Long => CostModel {
                commission_rate: config.cash_commission_rate,
                slippage: config.cash_slippage,
                lending_rate: 0.0,
            },
            StrategyKind::Short => CostModel {
                commission_rate: config.margin_commission_rate,
                slippage: config.margin_slippage,
                lending_rate: config.margin_lending_rate,
            },
        }
    }

    /// Entry fills above the close.
    pub fn entry_price(&self, close: f64) -> f64 {
        close * (1.0 + self.slippage)
    }

    /// Exit fills below the close.
    pub fn exit_price(&self, close: f64) -> f64 {
        close * (1.0 - self.slippage)
    }

    pub fn commission(&self, notional: f64) -> f64 {
        notional * self.commission_rate
    }

    /// shares × entry × rate × days / 365
    pub fn lending_cost(&self, shares: i64, entry_price: f64, holding_days: i64) -> f64 {
        shares as f64 * entry_price * self.lending_rate * (holding_days as f64 / 365.0)
    }
}

/// Whole shares affordable with `cash` at `price`.
pub fn share_count(cash: f64, price: f64) -> i64 {
    if price <= 0.0 || cash <= 0.0 {
        return 0;
    }
    (cash / price).floor() as i64
}

/// Net result of a closed round trip.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Settlement {
    pub profit: f64,
    pub profit_pct: f64,
    pub commissions: f64,
    pub lending: f64,
}

/// Settle a round trip: commissions on both legs, lending on shorts.
pub fn settle(
    kind: StrategyKind,
    costs: &CostModel,
    shares: i64,
    entry_price: f64,
    exit_price: f64,
    holding_days: i64,
) -> Settlement {
    let qty = shares as f64;
    let cost = qty * entry_price;
    let commissions = costs.commission(cost) + costs.commission(qty * exit_price);
    let lending = match kind {
        StrategyKind::Long => 0.0,
        StrategyKind::Short => costs.lending_cost(shares, entry_price, holding_days),
    };
    let profit = match kind {
        StrategyKind::Long => (exit_price - entry_price) * qty - commissions,
        StrategyKind::Short => (entry_price - exit_price) * qty - commissions - lending,
    };
    let profit_pct = if cost > 0.0 { profit / cost * 100.0 } else { 0.0 };

    Settlement {
        profit,
        profit_pct,
        commissions,
        lending,
    }
}

/// First bar after `entry` whose state is `Exit`.
pub fn signal_exit_index(states: &[PositionState], entry: usize) -> Option<usize> {
    (entry + 1..states.len()).find(|&j| states[j] == PositionState::Exit)
}

/// First bar after `entry` whose close breaches the trailing stop.
///
/// Long: the stop trails the running max of `max(high, entry_price)` by `threshold`.
/// Short: it trails the running min of `min(low, entry_price)`.
pub fn trailing_stop_index(
    bars: &[OhlcvBar],
    entry: usize,
    entry_price: f64,
    kind: StrategyKind,
    threshold: f64,
) -> Option<usize> {
    let mut extreme = entry_price;
    for (j, bar) in bars.iter().enumerate().skip(entry + 1) {
        match kind {
            StrategyKind::Long => {
                extreme = extreme.max(bar.high);
                if bar.close < extreme * (1.0 - threshold) {
                    return Some(j);
                }
            }
            StrategyKind::Short => {
                extreme = extreme.min(bar.low);
                if bar.close > extreme * (1.0 + threshold) {
                    return Some(j);
                }
            }
        }
    }
    None
}

/// Bar at which a position opened at `entry` must be liquidated.
///
/// This is the last bar still within `max_days` calendar days of the entry,
/// taken once the following bar would exceed the bound. When the first bar after
/// the entry already exceeds it (a gap in the data) that bar is used. `None`
/// when no later bar exceeds the bound.
pub fn forced_exit_index(bars: &[OhlcvBar], entry: usize, max_days: i64) -> Option<usize> {
    let entry_date = bars.get(entry)?.date;
    let beyond = (entry + 1..bars.len()).find(|&j| (bars[j].date - entry_date).num_days() > max_days)?;
    if beyond > entry + 1 {
        Some(beyond - 1)
    } else {
        Some(beyond)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::{Duration, NaiveDate};

    fn bars_on_days(days: &[i64], closes: &[f64]) -> Vec<OhlcvBar> {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        days.iter()
            .zip(closes)
            .map(|(&d, &close)| OhlcvBar {
                code: "1301".into(),
                date: start + Duration::days(d),
                open: close,
                high: close,
                low: close,
                close,
                volume: 1000,
            })
            .collect()
    }

    #[test]
    fn cost_model_by_kind() {
        let config = BacktestConfig::default();
        let long = CostModel::for_kind(StrategyKind::Long, &config);
        assert_relative_eq!(long.commission_rate, 0.001);
        assert_relative_eq!(long.lending_rate, 0.0);

        let short = CostModel::for_kind(StrategyKind::Short, &config);
        assert_relative_eq!(short.commission_rate, 0.0015);
        assert_relative_eq!(short.lending_rate, 0.005);
    }

    #[test]
    fn slippage_moves_fills_against_the_trader() {
        let costs = CostModel::for_kind(StrategyKind::Long, &BacktestConfig::default());
        assert_relative_eq!(costs.entry_price(1000.0), 1001.0);
        assert_relative_eq!(costs.exit_price(1000.0), 999.0);
    }

    #[test]
    fn share_count_floors() {
        assert_eq!(share_count(1_000_000.0, 1001.0), 999);
        assert_eq!(share_count(500.0, 1001.0), 0);
        assert_eq!(share_count(1000.0, 0.0), 0);
    }

    #[test]
    fn settle_long_round_trip() {
        let costs = CostModel {
            commission_rate: 0.001,
            slippage: 0.0,
            lending_rate: 0.0,
        };
        let s = settle(StrategyKind::Long, &costs, 100, 1000.0, 1100.0, 10);
        // 10_000 gain, commissions 100 + 110
        assert_relative_eq!(s.commissions, 210.0);
        assert_relative_eq!(s.profit, 9790.0);
        assert_relative_eq!(s.profit_pct, 9.79);
        assert_relative_eq!(s.lending, 0.0);
    }

    #[test]
    fn settle_short_pays_lending() {
        let costs = CostModel {
            commission_rate: 0.0,
            slippage: 0.0,
            lending_rate: 0.365,
        };
        let s = settle(StrategyKind::Short, &costs, 100, 1000.0, 900.0, 10);
        // lending = 100 * 1000 * 0.365 * 10/365 = 1000
        assert_relative_eq!(s.lending, 1000.0);
        assert_relative_eq!(s.profit, 9000.0);
    }

    #[test]
    fn trailing_stop_long_trails_the_high() {
        let bars = bars_on_days(&[0, 1, 2, 3], &[100.0, 120.0, 110.0, 107.0]);
        // peak 120 -> stop 108; 110 holds, 107 breaches
        assert_eq!(
            trailing_stop_index(&bars, 0, 100.0, StrategyKind::Long, 0.10),
            Some(3)
        );
    }

    #[test]
    fn trailing_stop_short_trails_the_low() {
        let bars = bars_on_days(&[0, 1, 2], &[100.0, 80.0, 89.0]);
        // trough 80 -> stop 88
        assert_eq!(
            trailing_stop_index(&bars, 0, 100.0, StrategyKind::Short, 0.10),
            Some(2)
        );
        let calm = bars_on_days(&[0, 1, 2], &[100.0, 98.0, 99.0]);
        assert_eq!(
            trailing_stop_index(&calm, 0, 100.0, StrategyKind::Short, 0.10),
            None
        );
    }

    #[test]
    fn forced_exit_stays_within_bound() {
        let bars = bars_on_days(&[0, 10, 20, 29, 33, 40], &[1.0; 6]);
        // day 33 exceeds 30, so the day-29 bar is the last one allowed
        assert_eq!(forced_exit_index(&bars, 0, 30), Some(3));
        // day 30 exactly is still within the bound
        let bars = bars_on_days(&[0, 30, 31], &[1.0; 3]);
        assert_eq!(forced_exit_index(&bars, 0, 30), Some(1));
    }

    #[test]
    fn forced_exit_on_data_gap_uses_next_bar() {
        let bars = bars_on_days(&[0, 45, 46], &[1.0; 3]);
        assert_eq!(forced_exit_index(&bars, 0, 30), Some(1));
    }

    #[test]
    fn forced_exit_none_when_history_ends_in_bound() {
        let bars = bars_on_days(&[0, 5, 10], &[1.0; 3]);
        assert_eq!(forced_exit_index(&bars, 0, 30), None);
    }

    #[test]
    fn signal_exit_after_entry_only() {
        use PositionState::*;
        let states = [Exit, InPosition, InPosition, Exit];
        assert_eq!(signal_exit_index(&states, 1), Some(3));
        assert_eq!(signal_exit_index(&states, 3), None);
    }
}
