//! Closed trades and their holding-period classification.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    Signal,
    TrailingStop,
    ForcedMax,
    EndOfData,
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ExitReason::Signal => "signal",
            ExitReason::TrailingStop => "trailing_stop",
            ExitReason::ForcedMax => "forced_max",
            ExitReason::EndOfData => "end_of_data",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub entry_date: NaiveDate,
    pub exit_date: NaiveDate,
    pub entry_price: f64,
    pub exit_price: f64,
    pub shares: i64,
    pub profit: f64,
    pub profit_pct: f64,
    /// Calendar days between entry and exit.
    pub holding_days: i64,
    pub forced_exit: bool,
    pub within_target_period: bool,
    pub exit_reason: ExitReason,
}

impl Trade {
    pub fn is_win(&self) -> bool {
        self.profit > 0.0
    }

    pub fn is_loss(&self) -> bool {
        self.profit < 0.0
    }
}

/// Trades split by holding period.
///
/// Valid trades closed within the target period. Forced trades ran past it and
/// were liquidated; excluded trades ran past it but closed on their own signal.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TradeClasses {
    pub valid: Vec<Trade>,
    pub forced: Vec<Trade>,
    pub excluded: Vec<Trade>,
}

pub fn classify_trades(trades: &[Trade], target_days: i64) -> TradeClasses {
    let mut classes = TradeClasses::default();
    for trade in trades {
        if trade.holding_days <= target_days {
            classes.valid.push(trade.clone());
        } else if trade.forced_exit {
            classes.forced.push(trade.clone());
        } else {
            classes.excluded.push(trade.clone());
        }
    }
    classes
}
