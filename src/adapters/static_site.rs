//! Static HTML site generated from stored batch results with Askama templates.
//!
//! Output layout under the site directory:
//!
//! ```text
//! index.html                 ranking cards, top 3 per strategy
//! strategy/{key}.html        full ranking page per strategy
//! approaching/index.html     approaching-signal cards, top 3 per strategy
//! approaching/{key}.html     approaching signals with conditions
//! static/main.css
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use askama::Template;
use tracing::{debug, info};

use crate::domain::error::StockfitError;
use crate::domain::results::{ApproachingEntry, RankingEntry};
use crate::domain::strategy::strategy_by_key;
use crate::ports::result_store_port::ResultStorePort;
use crate::ports::site_port::{SitePort, SiteSummary};

const MAIN_CSS: &str = include_str!("../../templates/main.css");

/// Ranking entries read per strategy for the index cards.
const INDEX_SCAN: usize = 10;
const CARD_ROWS: usize = 3;
/// Ranking entries read per strategy page, and the most shown.
const STRATEGY_SCAN: usize = 100;
const STRATEGY_ROWS: usize = 30;
const STRATEGY_MIN_SCORE: f64 = 40.0;
const APPROACHING_ROWS: usize = 50;

struct RankRow {
    rank: usize,
    code: String,
    name: String,
    score: String,
    headline: String,
}

impl From<&RankingEntry> for RankRow {
    fn from(e: &RankingEntry) -> Self {
        Self {
            rank: e.rank,
            code: e.code.clone(),
            name: e.name.clone(),
            score: format!("{:.1}", e.score),
            headline: e.headline().to_string(),
        }
    }
}

struct SignalRow {
    rank: usize,
    code: String,
    name: String,
    days_label: String,
    days_class: &'static str,
    score: String,
    score_class: &'static str,
    price: String,
    met: Vec<String>,
    pending: Vec<String>,
}

impl From<&ApproachingEntry> for SignalRow {
    fn from(e: &ApproachingEntry) -> Self {
        let s = &e.estimate;
        let (days_label, days_class) = match s.estimated_days {
            Some(d) if d <= 1 => (format!("約{d}日後"), "imminent"),
            Some(d) if d <= 3 => (format!("約{d}日後"), "soon"),
            Some(d) => (format!("約{d}日後"), "later"),
            None => ("約?日後".to_string(), "later"),
        };
        let score_class = if s.score >= 80.0 {
            "high"
        } else if s.score >= 60.0 {
            "medium"
        } else {
            "low"
        };
        Self {
            rank: e.rank,
            code: s.code.clone(),
            name: s.name.clone(),
            days_label,
            days_class,
            score: format!("{:.0}", s.score),
            score_class,
            price: format!("{:.1}", s.current_price),
            met: s.conditions_met.clone(),
            pending: s.conditions_pending.clone(),
        }
    }
}

struct Card<R> {
    key: String,
    name: String,
    rows: Vec<R>,
}

struct Tab {
    key: String,
    name: String,
    active: bool,
}

#[derive(Template)]
#[template(path = "index.html")]
struct IndexTemplate {
    root: &'static str,
    last_updated: String,
    has_stats: bool,
    processed_stocks: usize,
    strategy_count: usize,
    min_score: String,
    cards: Vec<Card<RankRow>>,
}

#[derive(Template)]
#[template(path = "strategy.html")]
struct StrategyTemplate {
    root: &'static str,
    last_updated: String,
    strategy_name: String,
    tabs: Vec<Tab>,
    rows: Vec<RankRow>,
}

#[derive(Template)]
#[template(path = "approaching_index.html")]
struct ApproachingIndexTemplate {
    root: &'static str,
    last_updated: String,
    has_stats: bool,
    cards: Vec<Card<SignalRow>>,
}

#[derive(Template)]
#[template(path = "approaching_detail.html")]
struct ApproachingDetailTemplate {
    root: &'static str,
    last_updated: String,
    strategy_key: String,
    strategy_name: String,
    limit: usize,
    rows: Vec<SignalRow>,
}

pub struct StaticSiteGenerator {
    output_dir: PathBuf,
    min_score: f64,
}

impl StaticSiteGenerator {
    pub fn new(output_dir: PathBuf, min_score: f64) -> Self {
        Self {
            output_dir,
            min_score,
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    fn write_page(&self, relative: &str, template: &impl Template) -> Result<(), StockfitError> {
        let html = template.render().map_err(|e| StockfitError::Site {
            reason: format!("failed to render {relative}: {e}"),
        })?;
        let path = self.output_dir.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, html)?;
        debug!(page = relative, "page written");
        Ok(())
    }

    fn reset_output(&self) -> Result<(), StockfitError> {
        if self.output_dir.exists() {
            fs::remove_dir_all(&self.output_dir)?;
        }
        fs::create_dir_all(self.output_dir.join("static"))?;
        fs::write(self.output_dir.join("static").join("main.css"), MAIN_CSS)?;
        Ok(())
    }
}

/// Display name of a strategy key, or the key itself when unknown.
fn display_name(key: &str) -> String {
    strategy_by_key(key)
        .map(|s| s.name().to_string())
        .unwrap_or_else(|_| key.to_string())
}

fn top_rows(entries: &[RankingEntry], min_score: f64, n: usize) -> Vec<RankRow> {
    entries
        .iter()
        .filter(|e| e.score >= min_score)
        .take(n)
        .map(RankRow::from)
        .collect()
}

impl SitePort for StaticSiteGenerator {
    fn generate(&self, store: &dyn ResultStorePort) -> Result<SiteSummary, StockfitError> {
        self.reset_output()?;

        let metadata = store.metadata()?;
        let last_updated = metadata
            .as_ref()
            .map(|m| m.last_updated_label())
            .filter(|l| !l.is_empty())
            .unwrap_or_else(|| "-".to_string());

        let ranked = store.ranking_strategies()?;
        let mut cards = Vec::with_capacity(ranked.len());
        for key in &ranked {
            let entries = store.load_ranking(key, Some(INDEX_SCAN), 0)?;
            cards.push(Card {
                key: key.clone(),
                name: display_name(key),
                rows: top_rows(&entries, self.min_score, CARD_ROWS),
            });
        }
        self.write_page(
            "index.html",
            &IndexTemplate {
                root: "./",
                last_updated: last_updated.clone(),
                has_stats: metadata.is_some(),
                processed_stocks: metadata.as_ref().map_or(0, |m| m.processed_stocks),
                strategy_count: metadata.as_ref().map_or(0, |m| m.strategies.len()),
                min_score: format!("{:.0}", self.min_score),
                cards,
            },
        )?;

        for key in &ranked {
            let entries = store.load_ranking(key, Some(STRATEGY_SCAN), 0)?;
            let tabs = ranked
                .iter()
                .map(|k| Tab {
                    key: k.clone(),
                    name: display_name(k),
                    active: k == key,
                })
                .collect();
            self.write_page(
                &format!("strategy/{key}.html"),
                &StrategyTemplate {
                    root: "../",
                    last_updated: last_updated.clone(),
                    strategy_name: display_name(key),
                    tabs,
                    rows: top_rows(&entries, STRATEGY_MIN_SCORE, STRATEGY_ROWS),
                },
            )?;
        }

        let approaching = store.approaching_strategies()?;
        let mut cards = Vec::with_capacity(approaching.len());
        for key in &approaching {
            let entries = store.load_approaching(key, Some(CARD_ROWS), 0)?;
            cards.push(Card {
                key: key.clone(),
                name: display_name(key),
                rows: entries.iter().map(SignalRow::from).collect(),
            });
        }
        self.write_page(
            "approaching/index.html",
            &ApproachingIndexTemplate {
                root: "../",
                last_updated: last_updated.clone(),
                has_stats: metadata.is_some(),
                cards,
            },
        )?;

        for key in &approaching {
            let entries = store.load_approaching(key, Some(APPROACHING_ROWS), 0)?;
            self.write_page(
                &format!("approaching/{key}.html"),
                &ApproachingDetailTemplate {
                    root: "../",
                    last_updated: last_updated.clone(),
                    strategy_key: key.clone(),
                    strategy_name: display_name(key),
                    limit: APPROACHING_ROWS,
                    rows: entries.iter().map(SignalRow::from).collect(),
                },
            )?;
        }

        let summary = SiteSummary {
            strategy_pages: ranked.len(),
            approaching_pages: approaching.len(),
        };
        info!(
            output = %self.output_dir.display(),
            strategies = summary.strategy_pages,
            approaching = summary.approaching_pages,
            "site generated"
        );
        Ok(summary)
    }
}
