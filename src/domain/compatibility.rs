//! Stock/strategy compatibility: backtest metrics folded into a 0-100 score
//! with a short list of rationale lines.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::backtest::{run_backtest, BacktestConfig};
use super::metrics::Metrics;
use super::stock_data::StockData;
use super::strategy::{Strategy, StrategyKind};
use super::trade::Trade;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompatibilityResult {
    pub code: String,
    pub name: String,
    pub strategy_key: String,
    pub strategy_name: String,
    pub kind: StrategyKind,
    /// Always within 0..=100.
    pub score: f64,
    pub reasons: Vec<String>,
    pub metrics: Metrics,
    pub valid_trades: usize,
    pub forced_trades: usize,
    pub excluded_trades: usize,
    pub trades: Vec<Trade>,
}

impl CompatibilityResult {
    pub fn reason_text(&self) -> String {
        self.reasons.join("\n")
    }

    /// First rationale line, the overall verdict.
    pub fn headline(&self) -> &str {
        self.reasons.first().map(String::as_str).unwrap_or("")
    }
}

/// Score from the valid-trade metrics.
///
/// Gates, first match wins: no trades → 0; return below -10% → at most 20;
/// win rate below 40% with no gain → at most 30; win rate below 40% → at most 50;
/// fewer than 5 trades → base score capped at 70; otherwise the base score.
pub fn score(metrics: &Metrics) -> f64 {
    let tr = metrics.total_return;
    let win = metrics.win_rate;

    let raw = if metrics.num_trades == 0 {
        0.0
    } else if tr < -10.0 {
        (20.0 + tr).clamp(0.0, 20.0)
    } else if win < 40.0 && tr <= 0.0 {
        (15.0 + win * 0.375 + tr * 0.5).min(30.0)
    } else if win < 40.0 {
        (30.0 + (tr * 0.5).min(20.0)).min(50.0)
    } else if metrics.num_trades < 5 {
        base_score(metrics).min(70.0)
    } else {
        base_score(metrics)
    };

    raw.clamp(0.0, 100.0)
}

/// Trade opportunity (0-30) + win rate (0-30) + banded return (0-40).
fn base_score(metrics: &Metrics) -> f64 {
    let trade_score = (metrics.num_trades as f64 * 3.0).min(30.0);
    let win_score = (metrics.win_rate * 0.3).min(30.0);
    let tr = metrics.total_return;
    let return_score = if tr >= 20.0 {
        (30.0 + (tr - 20.0) * 0.5).min(40.0)
    } else if tr >= 10.0 {
        20.0 + (tr - 10.0)
    } else if tr >= 0.0 {
        10.0 + tr
    } else if tr >= -10.0 {
        (10.0 + tr).max(0.0)
    } else {
        0.0
    };
    trade_score + win_score + return_score
}

pub fn reasons(metrics: &Metrics, score: f64) -> Vec<String> {
    if metrics.num_trades == 0 {
        return vec!["[NG] 取引機会がありません".to_string()];
    }

    let overall = if score >= 80.0 {
        "[OK] 非常に高い適合度"
    } else if score >= 60.0 {
        "[OK] 高い適合度"
    } else if score >= 40.0 {
        "[中] 中程度の適合度"
    } else if score >= 20.0 {
        "[NG] 低い適合度"
    } else {
        "[NG] 非常に低い適合度"
    };

    let tr = metrics.total_return;
    let returns = if tr >= 20.0 {
        format!("[OK] 高リターン: {tr:.1}%")
    } else if tr >= 10.0 {
        format!("[OK] 中リターン: {tr:.1}%")
    } else if tr >= 0.0 {
        format!("[中] 小リターン: {tr:.1}%")
    } else if tr >= -10.0 {
        format!("[NG] 小損失: {tr:.1}%")
    } else {
        format!("[NG] 大損失: {tr:.1}%")
    };

    let win = metrics.win_rate;
    let win_line = if win >= 60.0 {
        format!("[OK] 高勝率: {win:.1}%")
    } else if win >= 40.0 {
        format!("[中] 中勝率: {win:.1}%")
    } else {
        format!("[NG] 低勝率: {win:.1}%")
    };

    let n = metrics.num_trades;
    let trades = if n >= 10 {
        format!("[OK] 十分な取引機会: {n}回")
    } else if n >= 5 {
        format!("[中] 取引機会あり: {n}回")
    } else {
        format!("[NG] 取引機会少: {n}回")
    };

    let dd = metrics.max_drawdown;
    let drawdown = if dd < 20.0 {
        format!("[OK] 下落リスク小: 最大{dd:.1}%下落")
    } else if dd < 40.0 {
        format!("[中] 下落リスク中: 最大{dd:.1}%下落")
    } else {
        format!("[NG] 下落リスク大: 最大{dd:.1}%下落")
    };

    vec![overall.to_string(), returns, win_line, trades, drawdown]
}

/// Backtest one strategy on one stock and score it.
pub fn evaluate(
    data: &StockData,
    strategy: &dyn Strategy,
    config: &BacktestConfig,
) -> CompatibilityResult {
    let result = run_backtest(data, strategy, config);
    let score = score(&result.metrics);
    let reasons = reasons(&result.metrics, score);

    CompatibilityResult {
        code: data.code.clone(),
        name: data.name.clone(),
        strategy_key: result.strategy_key,
        strategy_name: result.strategy_name,
        kind: result.kind,
        score,
        reasons,
        valid_trades: result.classes.valid.len(),
        forced_trades: result.classes.forced.len(),
        excluded_trades: result.classes.excluded.len(),
        metrics: result.metrics,
        trades: result.trades,
    }
}

/// Scores every strategy against one stock, optionally on a bounded rayon pool.
pub struct CompatibilityAnalyzer {
    config: BacktestConfig,
    pool: Option<rayon::ThreadPool>,
}

impl CompatibilityAnalyzer {
    pub fn new(config: BacktestConfig, parallel: bool, max_workers: usize) -> Self {
        let pool = if parallel {
            match rayon::ThreadPoolBuilder::new()
                .num_threads(max_workers.max(1))
                .build()
            {
                Ok(pool) => Some(pool),
                Err(e) => {
                    warn!(error = %e, "could not build backtest thread pool, running sequentially");
                    None
                }
            }
        } else {
            None
        };
        Self { config, pool }
    }

    pub fn config(&self) -> &BacktestConfig {
        &self.config
    }

    /// One result per strategy, in strategy order.
    pub fn analyze(
        &self,
        data: &StockData,
        strategies: &[Box<dyn Strategy>],
    ) -> Vec<CompatibilityResult> {
        let results: Vec<CompatibilityResult> = match &self.pool {
            Some(pool) => pool.install(|| {
                strategies
                    .par_iter()
                    .map(|s| evaluate(data, s.as_ref(), &self.config))
                    .collect()
            }),
            None => strategies
                .iter()
                .map(|s| evaluate(data, s.as_ref(), &self.config))
                .collect(),
        };

        for r in &results {
            debug!(code = %r.code, strategy = %r.strategy_name, score = r.score, "compatibility");
        }
        results
    }
}

/// Results for `strategy_key` with score ≥ `threshold`, best first.
pub fn rank_by_strategy(
    results: &[CompatibilityResult],
    strategy_key: &str,
    threshold: f64,
) -> Vec<CompatibilityResult> {
    let mut ranked: Vec<CompatibilityResult> = results
        .iter()
        .filter(|r| r.strategy_key == strategy_key && r.score >= threshold)
        .cloned()
        .collect();
    ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::strategy::{all_strategies, test_support::stock_from_closes};
    use approx::assert_relative_eq;

    fn metrics(num_trades: usize, win_rate: f64, total_return: f64, max_drawdown: f64) -> Metrics {
        Metrics {
            total_return,
            win_rate,
            num_trades,
            max_drawdown,
            ..Default::default()
        }
    }

    #[test]
    fn no_trades_scores_zero() {
        assert_relative_eq!(score(&metrics(0, 100.0, 50.0, 0.0)), 0.0);
        assert_eq!(
            reasons(&metrics(0, 0.0, 0.0, 0.0), 0.0),
            vec!["[NG] 取引機会がありません"]
        );
    }

    #[test]
    fn heavy_loss_capped_at_twenty() {
        assert_relative_eq!(score(&m3(10, 80.0, -15.0)), 5.0);
        assert_relative_eq!(score(&m3(10, 80.0, -40.0)), 0.0);
        assert_relative_eq!(score(&m3(10, 80.0, -10.5)), 9.5);
    }

    fn m3(num_trades: usize, win_rate: f64, total_return: f64) -> Metrics {
        metrics(num_trades, win_rate, total_return, 0.0)
    }

    #[test]
    fn low_win_rate_without_gain() {
        // 15 + 20 * 0.375 - 5 * 0.5 = 20
        assert_relative_eq!(score(&m3(10, 20.0, -5.0)), 20.0);
        // capped at 30
        assert_relative_eq!(score(&m3(10, 39.9, 0.0)), 29.9625, epsilon = 1e-9);
    }

    #[test]
    fn low_win_rate_with_gain() {
        assert_relative_eq!(score(&m3(10, 30.0, 10.0)), 35.0);
        assert_relative_eq!(score(&m3(10, 30.0, 100.0)), 50.0);
    }

    #[test]
    fn few_trades_capped_at_seventy() {
        // base = 12 + 30 + 40 = 82 -> 70
        assert_relative_eq!(score(&m3(4, 100.0, 50.0)), 70.0);
    }

    #[test]
    fn base_score_bands() {
        // 30 + 18 + (20 + 5) = 73
        assert_relative_eq!(score(&m3(10, 60.0, 15.0)), 73.0);
        // 30 + 15 + (10 + 5) = 60
        assert_relative_eq!(score(&m3(12, 50.0, 5.0)), 60.0);
        // 15 + 15 + max(0, 10 - 5) = 35
        assert_relative_eq!(score(&m3(5, 50.0, -5.0)), 35.0);
        // return band capped at 40: 30 + 30 + 40
        assert_relative_eq!(score(&m3(20, 100.0, 200.0)), 100.0);
    }

    #[test]
    fn score_is_bounded() {
        for trades in [0, 1, 4, 5, 50] {
            for win in [0.0, 39.0, 40.0, 100.0] {
                for tr in [-500.0, -10.0, 0.0, 9.9, 19.9, 1e6] {
                    let s = score(&m3(trades, win, tr));
                    assert!((0.0..=100.0).contains(&s), "{trades} {win} {tr} -> {s}");
                }
            }
        }
    }

    #[test]
    fn reason_lines_follow_bands() {
        let m = metrics(12, 65.0, 25.0, 10.0);
        let lines = reasons(&m, 85.0);
        assert_eq!(
            lines,
            vec![
                "[OK] 非常に高い適合度",
                "[OK] 高リターン: 25.0%",
                "[OK] 高勝率: 65.0%",
                "[OK] 十分な取引機会: 12回",
                "[OK] 下落リスク小: 最大10.0%下落",
            ]
        );

        let m = metrics(3, 30.0, -12.0, 45.0);
        let lines = reasons(&m, 8.0);
        assert_eq!(lines[0], "[NG] 非常に低い適合度");
        assert_eq!(lines[1], "[NG] 大損失: -12.0%");
        assert_eq!(lines[2], "[NG] 低勝率: 30.0%");
        assert_eq!(lines[3], "[NG] 取引機会少: 3回");
        assert_eq!(lines[4], "[NG] 下落リスク大: 最大45.0%下落");
    }

    #[test]
    fn analyze_keeps_strategy_order() {
        let data = stock_from_closes(&[100.0; 250]);
        let strategies = all_strategies();
        for parallel in [false, true] {
            let analyzer = CompatibilityAnalyzer::new(BacktestConfig::default(), parallel, 2);
            let results = analyzer.analyze(&data, &strategies);
            let keys: Vec<_> = results.iter().map(|r| r.strategy_key.as_str()).collect();
            let expected: Vec<_> = strategies.iter().map(|s| s.key()).collect();
            assert_eq!(keys, expected);
            assert!(results.iter().all(|r| r.score == 0.0));
        }
    }

    #[test]
    fn ranking_filters_and_sorts() {
        let data = stock_from_closes(&[100.0; 10]);
        let strategy = crate::domain::strategy::strategy_by_key("pullback_short").unwrap();
        let base = evaluate(&data, strategy.as_ref(), &BacktestConfig::default());
        let results: Vec<CompatibilityResult> = [("1301", 45.0), ("1332", 80.0), ("1333", 10.0)]
            .iter()
            .map(|&(code, score)| CompatibilityResult {
                code: code.to_string(),
                score,
                ..base.clone()
            })
            .collect();

        let ranked = rank_by_strategy(&results, "pullback_short", 40.0);
        let codes: Vec<_> = ranked.iter().map(|r| r.code.as_str()).collect();
        assert_eq!(codes, vec!["1332", "1301"]);
        assert!(rank_by_strategy(&results, "momentum_short", 0.0).is_empty());
    }
}
