//! Performance metrics. Returns and drawdown are in percent.

use serde::{Deserialize, Deserializer, Serialize};

use super::portfolio::EquityPoint;
use super::trade::Trade;

const TRADING_DAYS_PER_YEAR: f64 = 252.0;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    pub total_return: f64,
    pub annual_return: f64,
    pub max_drawdown: f64,
    pub sharpe_ratio: f64,
    pub win_rate: f64,
    /// Infinite when there are gains and no losses; stored as `null` in JSON.
    #[serde(deserialize_with = "deserialize_profit_factor")]
    pub profit_factor: f64,
    pub num_trades: usize,
    pub avg_return: f64,
}

fn deserialize_profit_factor<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::INFINITY))
}

impl Metrics {
    /// `bars` is the length of the price history the curve was built over.
    pub fn compute(equity_curve: &[EquityPoint], trades: &[Trade], bars: usize) -> Self {
        let total_return = total_return(equity_curve);
        let num_trades = trades.len();
        let avg_return = if num_trades > 0 {
            trades.iter().map(|t| t.profit_pct).sum::<f64>() / num_trades as f64
        } else {
            0.0
        };

        Metrics {
            total_return,
            annual_return: annual_return(total_return, bars),
            max_drawdown: max_drawdown(equity_curve),
            sharpe_ratio: sharpe_ratio(equity_curve),
            win_rate: win_rate(trades),
            profit_factor: profit_factor(trades),
            num_trades,
            avg_return,
        }
    }
}

fn total_return(curve: &[EquityPoint]) -> f64 {
    match (curve.first(), curve.last()) {
        (Some(first), Some(last)) if first.equity != 0.0 => {
            (last.equity - first.equity) / first.equity * 100.0
        }
        _ => 0.0,
    }
}

fn annual_return(total_return_pct: f64, bars: usize) -> f64 {
    if bars == 0 {
        return 0.0;
    }
    let years = bars as f64 / TRADING_DAYS_PER_YEAR;
    let growth = 1.0 + total_return_pct / 100.0;
    if growth <= 0.0 {
        return -100.0;
    }
    (growth.powf(1.0 / years) - 1.0) * 100.0
}

fn max_drawdown(curve: &[EquityPoint]) -> f64 {
    let mut peak = f64::MIN;
    let mut worst = 0.0_f64;
    for point in curve {
        peak = peak.max(point.equity);
        if peak > 0.0 {
            worst = worst.min((point.equity - peak) / peak * 100.0);
        }
    }
    worst.abs()
}

/// Annualised mean over annualised sample deviation of daily returns.
/// The first bar counts as a zero return.
fn sharpe_ratio(curve: &[EquityPoint]) -> f64 {
    if curve.len() < 2 {
        return 0.0;
    }
    let returns: Vec<f64> = std::iter::once(0.0)
        .chain(curve.windows(2).map(|w| {
            if w[0].equity != 0.0 {
                (w[1].equity - w[0].equity) / w[0].equity
            } else {
                0.0
            }
        }))
        .collect();

    let n = returns.len() as f64;
    let mean = returns.iter().sum::<f64>() / n;
    let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / (n - 1.0);
    let std = variance.sqrt();
    if std == 0.0 {
        return 0.0;
    }
    (mean * TRADING_DAYS_PER_YEAR) / (std * TRADING_DAYS_PER_YEAR.sqrt())
}

fn win_rate(trades: &[Trade]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    let wins = trades.iter().filter(|t| t.is_win()).count();
    wins as f64 / trades.len() as f64 * 100.0
}

fn profit_factor(trades: &[Trade]) -> f64 {
    let gross_profit: f64 = trades.iter().filter(|t| t.is_win()).map(|t| t.profit).sum();
    let gross_loss: f64 = trades
        .iter()
        .filter(|t| t.is_loss())
        .map(|t| t.profit.abs())
        .sum();

    if gross_loss > 0.0 {
        gross_profit / gross_loss
    } else if gross_profit > 0.0 {
        f64::INFINITY
    } else {
        0.0
    }
}
