//! Records persisted by the daily batch and read back by the site generator.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use serde::{Deserialize, Deserializer, Serialize};

use super::compatibility::CompatibilityResult;
use super::proximity::ProximityEstimate;

/// Per-strategy summary kept in a stock's detail record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StrategySummary {
    pub strategy_name: String,
    pub score: f64,
    pub win_rate: f64,
    pub total_return: f64,
    pub annual_return: f64,
    pub num_trades: usize,
    pub max_drawdown: f64,
    pub sharpe_ratio: f64,
    #[serde(deserialize_with = "null_as_infinity")]
    pub profit_factor: f64,
    pub reason: String,
    pub valid_trades: usize,
    pub forced_trades: usize,
    pub excluded_trades: usize,
}

impl From<&CompatibilityResult> for StrategySummary {
    fn from(r: &CompatibilityResult) -> Self {
        Self {
            strategy_name: r.strategy_name.clone(),
            score: r.score,
            win_rate: r.metrics.win_rate,
            total_return: r.metrics.total_return,
            annual_return: r.metrics.annual_return,
            num_trades: r.metrics.num_trades,
            max_drawdown: r.metrics.max_drawdown,
            sharpe_ratio: r.metrics.sharpe_ratio,
            profit_factor: r.metrics.profit_factor,
            reason: r.reason_text(),
            valid_trades: r.valid_trades,
            forced_trades: r.forced_trades,
            excluded_trades: r.excluded_trades,
        }
    }
}

fn null_as_infinity<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::INFINITY))
}

/// Everything the batch learned about one stock, keyed by strategy key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockDetail {
    pub code: String,
    pub name: String,
    pub strategies: BTreeMap<String, StrategySummary>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub approaching: Vec<ProximityEstimate>,
    #[serde(default)]
    pub updated: Option<NaiveDateTime>,
}

impl StockDetail {
    pub fn new(code: &str, name: &str, results: &[CompatibilityResult]) -> Self {
        Self {
            code: code.to_string(),
            name: name.to_string(),
            strategies: results
                .iter()
                .map(|r| (r.strategy_key.clone(), StrategySummary::from(r)))
                .collect(),
            approaching: Vec::new(),
            updated: None,
        }
    }
}

/// One line of a strategy ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankingEntry {
    pub rank: usize,
    pub code: String,
    pub name: String,
    pub score: f64,
    pub win_rate: f64,
    #[serde(rename = "return")]
    pub total_return: f64,
    pub trades: usize,
    pub reason: String,
}

impl RankingEntry {
    /// First line of the reason text.
    pub fn headline(&self) -> &str {
        self.reason.lines().next().unwrap_or("")
    }
}

/// One line of a strategy's approaching-signal list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApproachingEntry {
    pub rank: usize,
    #[serde(flatten)]
    pub estimate: ProximityEstimate,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchMetadata {
    pub total_stocks: usize,
    pub processed_stocks: usize,
    pub failed_stocks: usize,
    /// Display names of the strategies that were run.
    pub strategies: Vec<String>,
    /// Keys of strategies with at least one approaching signal.
    pub approaching_strategies: Vec<String>,
    pub processing_time_seconds: u64,
    #[serde(default)]
    pub last_updated: Option<NaiveDateTime>,
    #[serde(default)]
    pub version: String,
}

impl BatchMetadata {
    /// `YYYY-MM-DD` of the last update, or an empty string.
    pub fn last_updated_label(&self) -> String {
        self.last_updated
            .map(|t| t.format("%Y-%m-%d").to_string())
            .unwrap_or_default()
    }
}

/// Checkpoint written after each chunk so an interrupted batch can resume.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Progress {
    #[serde(default)]
    pub timestamp: Option<NaiveDateTime>,
    pub processed_count: usize,
    pub failed_count: usize,
    pub processed_codes: Vec<String>,
    pub failed_codes: Vec<String>,
}

impl Progress {
    pub fn new(processed_codes: Vec<String>, failed_codes: Vec<String>) -> Self {
        Self {
            timestamp: None,
            processed_count: processed_codes.len(),
            failed_count: failed_codes.len(),
            processed_codes,
            failed_codes,
        }
    }
}
