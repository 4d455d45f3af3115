//! Backtest engine: walk a strategy's signals through simulated fills.
//!
//! One position at a time, all cash committed. Each entry exits at the earliest
//! of its signal exit, the trailing stop and the holding-period limit. Metrics are
//! computed over the trades that closed within the target holding period.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::execution::{
    forced_exit_index, settle, share_count, signal_exit_index, trailing_stop_index, CostModel,
};
use super::metrics::Metrics;
use super::portfolio::{equity_curve, EquityPoint};
use super::stock_data::StockData;
use super::strategy::{PositionState, Strategy, StrategyKind};
use super::trade::{classify_trades, ExitReason, Trade, TradeClasses};

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestConfig {
    pub initial_capital: f64,
    pub cash_commission_rate: f64,
    pub cash_slippage: f64,
    pub margin_commission_rate: f64,
    pub margin_lending_rate: f64,
    pub margin_slippage: f64,
    /// Limit the history to this many years before the last bar.
    pub max_years: Option<u32>,
    pub target_holding_days: i64,
    pub max_holding_days: i64,
    pub trailing_stop_enabled: bool,
    pub trailing_stop_long: f64,
    pub trailing_stop_short: f64,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        BacktestConfig {
            initial_capital: 1_000_000.0,
            cash_commission_rate: 0.001,
            cash_slippage: 0.001,
            margin_commission_rate: 0.0015,
            margin_lending_rate: 0.005,
            margin_slippage: 0.001,
            max_years: None,
            target_holding_days: 14,
            max_holding_days: 30,
            trailing_stop_enabled: true,
            trailing_stop_long: 0.10,
            trailing_stop_short: 0.10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestResult {
    pub code: String,
    pub strategy_key: String,
    pub strategy_name: String,
    pub kind: StrategyKind,
    /// Computed over the valid trades only.
    pub metrics: Metrics,
    pub trades: Vec<Trade>,
    pub classes: TradeClasses,
    /// All trades, marked to market.
    pub equity_curve: Vec<EquityPoint>,
    /// Valid trades only; the basis of `metrics`.
    pub valid_equity_curve: Vec<EquityPoint>,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
    pub bars: usize,
}

/// Run `strategy` over `data`.
pub fn run_backtest(
    data: &StockData,
    strategy: &dyn Strategy,
    config: &BacktestConfig,
) -> BacktestResult {
    let limited;
    let data = match config.max_years {
        Some(years) if years > 0 => {
            limited = data.clone().limit_years(years);
            &limited
        }
        _ => data,
    };

    let kind = strategy.kind();
    let costs = CostModel::for_kind(kind, config);
    let signals = strategy.generate_signals(data);
    let trades = execute_trades(data, &signals.states, kind, &costs, config);

    let classes = classify_trades(&trades, config.target_holding_days);
    let curve = equity_curve(&data.bars, &trades, kind, &costs, config.initial_capital);
    let valid_curve = equity_curve(
        &data.bars,
        &classes.valid,
        kind,
        &costs,
        config.initial_capital,
    );
    let metrics = Metrics::compute(&valid_curve, &classes.valid, data.bar_count());

    debug!(
        code = %data.code,
        strategy = strategy.key(),
        valid = classes.valid.len(),
        forced = classes.forced.len(),
        excluded = classes.excluded.len(),
        total_return = metrics.total_return,
        "backtest complete"
    );

    BacktestResult {
        code: data.code.clone(),
        strategy_key: strategy.key().to_string(),
        strategy_name: strategy.name().to_string(),
        kind,
        metrics,
        trades,
        classes,
        equity_curve: curve,
        valid_equity_curve: valid_curve,
        first_date: data.bars.first().map(|b| b.date),
        last_date: data.bars.last().map(|b| b.date),
        bars: data.bar_count(),
    }
}

/// Turn position states into closed trades.
pub fn execute_trades(
    data: &StockData,
    states: &[PositionState],
    kind: StrategyKind,
    costs: &CostModel,
    config: &BacktestConfig,
) -> Vec<Trade> {
    let bars = &data.bars;
    let n = bars.len().min(states.len());
    let threshold = match kind {
        StrategyKind::Long => config.trailing_stop_long,
        StrategyKind::Short => config.trailing_stop_short,
    };

    let mut trades = Vec::new();
    let mut cash = config.initial_capital;
    let mut cursor = 0;

    for entry in 0..n.saturating_sub(1) {
        if entry < cursor || states[entry] != PositionState::InPosition {
            continue;
        }

        let entry_price = costs.entry_price(bars[entry].close);

        // an exit signal on the final bar is indistinguishable from running out of data
        let (mut exit, mut reason) = match signal_exit_index(&states[..n], entry) {
            Some(j) if j < n - 1 => (j, ExitReason::Signal),
            _ => (n - 1, ExitReason::EndOfData),
        };
        if config.trailing_stop_enabled {
            if let Some(j) = trailing_stop_index(&bars[..n], entry, entry_price, kind, threshold) {
                if j < exit {
                    exit = j;
                    reason = ExitReason::TrailingStop;
                }
            }
        }
        if let Some(j) = forced_exit_index(&bars[..n], entry, config.max_holding_days) {
            if j < exit {
                exit = j;
                reason = ExitReason::ForcedMax;
            }
        }

        let shares = share_count(cash, entry_price);
        cursor = exit + 1;
        if shares == 0 {
            continue;
        }

        let exit_price = costs.exit_price(bars[exit].close);
        let holding_days = (bars[exit].date - bars[entry].date).num_days();
        let settlement = settle(kind, costs, shares, entry_price, exit_price, holding_days);
        cash += settlement.profit;

        trades.push(Trade {
            entry_date: bars[entry].date,
            exit_date: bars[exit].date,
            entry_price,
            exit_price,
            shares,
            profit: settlement.profit,
            profit_pct: settlement.profit_pct,
            holding_days,
            forced_exit: matches!(reason, ExitReason::ForcedMax | ExitReason::EndOfData),
            within_target_period: holding_days <= config.target_holding_days,
            exit_reason: reason,
        });
    }

    trades
}
