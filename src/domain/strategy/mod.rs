//! Trading strategies and signal generation.
//!
//! Each strategy reports its entry conditions for a bar as a [`ConditionReport`]
//! (all `required` conditions plus at least one `any_of` condition when that group
//! is non-empty) and a separate exit predicate. [`Strategy::generate_signals`] turns
//! those predicates into a position-state series the backtest engine walks.

pub mod conditions;

mod breakout_new_high_long;
mod breakout_new_low_short;
mod momentum_short;
mod pullback_buy_long;
mod pullback_short;
mod retry_new_high_long;
mod trend_reversal_down_short;
mod trend_reversal_up_long;

pub use breakout_new_high_long::BreakoutNewHighLong;
pub use breakout_new_low_short::BreakoutNewLowShort;
pub use momentum_short::MomentumShort;
pub use pullback_buy_long::PullbackBuyLong;
pub use pullback_short::PullbackShort;
pub use retry_new_high_long::RetryNewHighLong;
pub use trend_reversal_down_short::TrendReversalDownShort;
pub use trend_reversal_up_long::TrendReversalUpLong;

use crate::domain::error::StockfitError;
use crate::domain::stock_data::StockData;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Bars required before any entry is allowed.
pub const MIN_WARMUP: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyKind {
    Long,
    Short,
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StrategyKind::Long => write!(f, "long"),
            StrategyKind::Short => write!(f, "short"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub label: &'static str,
    pub met: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConditionReport {
    pub required: Vec<Condition>,
    pub any_of: Vec<Condition>,
}

impl ConditionReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn require(mut self, label: &'static str, met: bool) -> Self {
        self.required.push(Condition { label, met });
        self
    }

    pub fn any(mut self, label: &'static str, met: bool) -> Self {
        self.any_of.push(Condition { label, met });
        self
    }

    pub fn is_met(&self) -> bool {
        self.required.iter().all(|c| c.met)
            && (self.any_of.is_empty() || self.any_of.iter().any(|c| c.met))
    }

    /// Labels of every satisfied condition, required first.
    pub fn met_labels(&self) -> Vec<&'static str> {
        self.required
            .iter()
            .chain(&self.any_of)
            .filter(|c| c.met)
            .map(|c| c.label)
            .collect()
    }
}

/// Per-bar position state: the encoding the backtest reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionState {
    Flat,
    InPosition,
    Exit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalDirection {
    LongEntry,
    ShortEntry,
    Exit,
}

/// A dated entry or exit event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signal {
    pub date: NaiveDate,
    pub direction: SignalDirection,
}

#[derive(Debug, Clone)]
pub struct SignalSeries {
    pub kind: StrategyKind,
    pub dates: Vec<NaiveDate>,
    pub states: Vec<PositionState>,
}

impl SignalSeries {
    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Entry events at the start of each holding run and exit events at each exit bar.
    pub fn events(&self) -> Vec<Signal> {
        let entry = match self.kind {
            StrategyKind::Long => SignalDirection::LongEntry,
            StrategyKind::Short => SignalDirection::ShortEntry,
        };
        let mut events = Vec::new();
        let mut prev = PositionState::Flat;
        for (date, &state) in self.dates.iter().zip(&self.states) {
            match state {
                PositionState::InPosition if prev != PositionState::InPosition => {
                    events.push(Signal {
                        date: *date,
                        direction: entry,
                    });
                }
                PositionState::Exit => events.push(Signal {
                    date: *date,
                    direction: SignalDirection::Exit,
                }),
                _ => {}
            }
            prev = state;
        }
        events
    }
}

/// Walk entry/exit flags into position states.
///
/// From each entry at or after the cursor, hold until the first exit flag after
/// the entry (or the last bar); the exit bar is marked only if its exit flag is set.
pub fn position_states(entries: &[bool], exits: &[bool]) -> Vec<PositionState> {
    let n = entries.len();
    let mut states = vec![PositionState::Flat; n];
    let mut cursor = 0;

    for entry_idx in 0..n {
        if !entries[entry_idx] || entry_idx < cursor {
            continue;
        }
        let exit_idx = (entry_idx + 1..n)
            .find(|&j| exits[j])
            .unwrap_or(n - 1);

        for state in &mut states[entry_idx..exit_idx] {
            *state = PositionState::InPosition;
        }
        if exits[exit_idx] {
            states[exit_idx] = PositionState::Exit;
        }
        cursor = exit_idx + 1;
    }

    states
}

pub trait Strategy: Send + Sync {
    /// Stable ASCII identifier, used for file names and lookups.
    fn key(&self) -> &'static str;

    /// Display name.
    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str;

    fn kind(&self) -> StrategyKind;

    fn parameters(&self) -> Vec<(&'static str, String)> {
        Vec::new()
    }

    fn warmup(&self) -> usize {
        MIN_WARMUP
    }

    fn conditions(&self, data: &StockData, index: usize) -> ConditionReport;

    fn exit(&self, data: &StockData, index: usize) -> bool;

    fn entry(&self, data: &StockData, index: usize) -> bool {
        index >= self.warmup() && self.conditions(data, index).is_met()
    }

    fn generate_signals(&self, data: &StockData) -> SignalSeries {
        let n = data.bar_count();
        let dates = data.bars.iter().map(|b| b.date).collect();
        if n <= self.warmup() {
            return SignalSeries {
                kind: self.kind(),
                dates,
                states: vec![PositionState::Flat; n],
            };
        }

        let entries: Vec<bool> = (0..n).map(|i| self.entry(data, i)).collect();
        let exits: Vec<bool> = (0..n).map(|i| self.exit(data, i)).collect();

        SignalSeries {
            kind: self.kind(),
            dates,
            states: position_states(&entries, &exits),
        }
    }

    /// Human-readable list of the conditions met at `index`.
    fn reason(&self, data: &StockData, index: usize) -> String {
        let met = self.conditions(data, index).met_labels();
        if met.is_empty() {
            return "条件を満たしていません".to_string();
        }
        let mut reason = format!("{}の条件を満たしています:", self.name());
        for label in met {
            reason.push_str("\n  ✓ ");
            reason.push_str(label);
        }
        reason
    }
}

pub fn all_strategies() -> Vec<Box<dyn Strategy>> {
    vec![
        Box::new(BreakoutNewHighLong::default()),
        Box::new(PullbackBuyLong::default()),
        Box::new(RetryNewHighLong::default()),
        Box::new(TrendReversalUpLong::default()),
        Box::new(PullbackShort::default()),
        Box::new(BreakoutNewLowShort::default()),
        Box::new(TrendReversalDownShort::default()),
        Box::new(MomentumShort::default()),
    ]
}

pub fn long_strategies() -> Vec<Box<dyn Strategy>> {
    all_strategies()
        .into_iter()
        .filter(|s| s.kind() == StrategyKind::Long)
        .collect()
}

pub fn short_strategies() -> Vec<Box<dyn Strategy>> {
    all_strategies()
        .into_iter()
        .filter(|s| s.kind() == StrategyKind::Short)
        .collect()
}

/// Look up a strategy by key or display name.
pub fn strategy_by_key(key: &str) -> Result<Box<dyn Strategy>, StockfitError> {
    all_strategies()
        .into_iter()
        .find(|s| s.key() == key || s.name() == key)
        .ok_or_else(|| StockfitError::UnknownStrategy {
            key: key.to_string(),
        })
}
