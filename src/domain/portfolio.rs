//! Account equity over the life of a backtest.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::execution::CostModel;
use super::ohlcv::OhlcvBar;
use super::strategy::StrategyKind;
use super::trade::Trade;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub date: NaiveDate,
    pub equity: f64,
}

/// Replay `trades` (in entry order) over `bars` into a per-bar equity curve.
///
/// Outside a trade the account holds cash. From the entry bar to the exit bar
/// inclusive the open position is marked to the close, net of the entry
/// commission; the realized profit lands in cash after the exit bar.
pub fn equity_curve(
    bars: &[OhlcvBar],
    trades: &[Trade],
    kind: StrategyKind,
    costs: &CostModel,
    initial_capital: f64,
) -> Vec<EquityPoint> {
    let mut equity = vec![initial_capital; bars.len()];
    let mut cash = initial_capital;
    let mut filled = 0;

    for trade in trades {
        let entry_idx = bars.partition_point(|b| b.date < trade.entry_date);
        let exit_idx = bars
            .partition_point(|b| b.date < trade.exit_date)
            .min(bars.len().saturating_sub(1));
        if entry_idx >= bars.len() {
            break;
        }

        for slot in equity.iter_mut().take(entry_idx).skip(filled) {
            *slot = cash;
        }

        let qty = trade.shares as f64;
        let entry_commission = costs.commission(qty * trade.entry_price);
        for (slot, bar) in equity[entry_idx..=exit_idx]
            .iter_mut()
            .zip(&bars[entry_idx..=exit_idx])
        {
            let unrealized = match kind {
                StrategyKind::Long => qty * (bar.close - trade.entry_price),
                StrategyKind::Short => qty * (trade.entry_price - bar.close),
            };
            *slot = cash - entry_commission + unrealized;
        }

        cash += trade.profit;
        filled = exit_idx + 1;
    }

    for slot in equity.iter_mut().skip(filled) {
        *slot = cash;
    }

    bars.iter()
        .zip(equity)
        .map(|(bar, equity)| EquityPoint {
            date: bar.date,
            equity,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::trade::ExitReason;
    use approx::assert_relative_eq;
    use chrono::Duration;

    fn bars(closes: &[f64]) -> Vec<OhlcvBar> {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        closes
            .iter()
            .enumerate()
            .map(|(i, &close)| OhlcvBar {
                code: "7203".into(),
                date: start + Duration::days(i as i64),
                open: close,
                high: close,
                low: close,
                close,
                volume: 1000,
            })
            .collect()
    }

    fn trade(bars: &[OhlcvBar], entry: usize, exit: usize, shares: i64, profit: f64) -> Trade {
        Trade {
            entry_date: bars[entry].date,
            exit_date: bars[exit].date,
            entry_price: bars[entry].close,
            exit_price: bars[exit].close,
            shares,
            profit,
            profit_pct: 0.0,
            holding_days: (exit - entry) as i64,
            forced_exit: false,
            within_target_period: true,
            exit_reason: ExitReason::Signal,
        }
    }

    fn no_costs() -> CostModel {
        CostModel {
            commission_rate: 0.0,
            slippage: 0.0,
            lending_rate: 0.0,
        }
    }

    #[test]
    fn flat_without_trades() {
        let b = bars(&[100.0, 101.0, 102.0]);
        let curve = equity_curve(&b, &[], StrategyKind::Long, &no_costs(), 1000.0);
        assert_eq!(curve.len(), 3);
        assert!(curve.iter().all(|p| p.equity == 1000.0));
    }

    #[test]
    fn long_marked_to_market_then_cash() {
        let b = bars(&[100.0, 100.0, 110.0, 120.0, 90.0]);
        let t = trade(&b, 1, 3, 10, 200.0);
        let curve = equity_curve(&b, &[t], StrategyKind::Long, &no_costs(), 1000.0);
        let values: Vec<f64> = curve.iter().map(|p| p.equity).collect();
        assert_eq!(values, vec![1000.0, 1000.0, 1100.0, 1200.0, 1200.0]);
    }

    #[test]
    fn short_gains_when_price_falls() {
        let b = bars(&[100.0, 100.0, 90.0, 80.0]);
        let t = trade(&b, 1, 2, 10, 100.0);
        let curve = equity_curve(&b, &[t], StrategyKind::Short, &no_costs(), 1000.0);
        assert_relative_eq!(curve[2].equity, 1100.0);
        assert_relative_eq!(curve[3].equity, 1100.0);
    }

    #[test]
    fn entry_commission_reduces_open_equity() {
        let b = bars(&[100.0, 100.0, 100.0]);
        let t = trade(&b, 0, 2, 10, -2.0);
        let costs = CostModel {
            commission_rate: 0.001,
            slippage: 0.0,
            lending_rate: 0.0,
        };
        let curve = equity_curve(&b, &[t], StrategyKind::Long, &costs, 1000.0);
        assert_relative_eq!(curve[0].equity, 999.0);
    }

    #[test]
    fn consecutive_trades_compound_cash() {
        let b = bars(&[100.0, 110.0, 100.0, 120.0, 120.0]);
        let trades = vec![trade(&b, 0, 1, 10, 100.0), trade(&b, 2, 3, 11, 220.0)];
        let curve = equity_curve(&b, &trades, StrategyKind::Long, &no_costs(), 1000.0);
        assert_relative_eq!(curve[1].equity, 1100.0);
        assert_relative_eq!(curve[2].equity, 1100.0);
        assert_relative_eq!(curve[4].equity, 1320.0);
    }
}
