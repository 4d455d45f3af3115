//! The daily batch: score every listed stock against every strategy and
//! persist rankings, approaching signals and run metadata.
//!
//! Stocks are processed one at a time in listing order. Progress is
//! checkpointed after each chunk so an interrupted run can resume where it
//! stopped. Rankings are rebuilt from every stored detail record at the end,
//! so a resumed run ranks the whole universe.

use std::collections::{BTreeMap, HashSet};
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use super::compatibility::CompatibilityAnalyzer;
use super::error::StockfitError;
use super::proximity::{ProximityEstimate, SignalDetector};
use super::results::{ApproachingEntry, BatchMetadata, Progress, RankingEntry, StockDetail};
use super::stock_data::StockData;
use super::strategy::Strategy;
use super::throttle::Throttle;
use super::universe::{StockListing, filter_listings};
use crate::ports::data_port::{DataPort, ListingPort};
use crate::ports::result_store_port::ResultStorePort;

#[derive(Debug, Clone, PartialEq)]
pub struct BatchOptions {
    /// Skip codes recorded as processed by an interrupted run.
    pub resume: bool,
    /// Process only the first `n` listings.
    pub limit: Option<usize>,
    /// Leave progress untouched.
    pub test_mode: bool,
    pub chunk_size: usize,
    pub min_bars: usize,
    /// Approaching signals kept per strategy.
    pub approaching_top: usize,
    pub max_runtime: Option<Duration>,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            resume: false,
            limit: None,
            test_mode: false,
            chunk_size: 100,
            min_bars: 200,
            approaching_top: 30,
            max_runtime: None,
        }
    }
}

/// What happened to one stock.
enum Outcome {
    Processed,
    Failed(String),
}

pub struct DailyBatch<'a> {
    pub listings: &'a dyn ListingPort,
    pub data: &'a dyn DataPort,
    pub store: &'a dyn ResultStorePort,
    pub analyzer: &'a CompatibilityAnalyzer,
    pub detector: SignalDetector,
    pub strategies: Vec<Box<dyn Strategy>>,
    pub throttle: Throttle,
    pub options: BatchOptions,
}

impl DailyBatch<'_> {
    pub fn run(&self) -> Result<BatchMetadata, StockfitError> {
        let started = Instant::now();
        let mut listings = filter_listings(self.listings.load_listings()?);
        if let Some(limit) = self.options.limit {
            listings.truncate(limit);
            info!(limit, "limiting batch");
        }

        let mut processed: Vec<String> = Vec::new();
        if self.options.resume {
            if let Some(progress) = self.store.load_progress()? {
                info!(
                    processed = progress.processed_count,
                    failed = progress.failed_count,
                    "resuming from checkpoint"
                );
                processed = progress.processed_codes;
            }
        }
        let done: HashSet<String> = processed.iter().cloned().collect();
        let remaining: Vec<&StockListing> =
            listings.iter().filter(|l| !done.contains(&l.code)).collect();
        let mut failed: Vec<String> = Vec::new();

        info!(
            total = listings.len(),
            remaining = remaining.len(),
            strategies = self.strategies.len(),
            cpu_limit = self.throttle.cpu_limit(),
            "batch started"
        );

        let chunk_size = self.options.chunk_size.max(1);
        let chunks = remaining.len().div_ceil(chunk_size);
        for (n, chunk) in remaining.chunks(chunk_size).enumerate() {
            for listing in chunk {
                if let Some(max) = self.options.max_runtime {
                    if started.elapsed() >= max {
                        self.checkpoint(&processed, &failed)?;
                        warn!(
                            processed = processed.len(),
                            "maximum runtime exceeded, progress saved"
                        );
                        return Err(StockfitError::Timeout {
                            minutes: max.as_secs() / 60,
                        });
                    }
                }

                let work = Instant::now();
                match self.process_stock(listing)? {
                    Outcome::Processed => processed.push(listing.code.clone()),
                    Outcome::Failed(reason) => {
                        warn!(code = %listing.code, %reason, "stock skipped");
                        failed.push(listing.code.clone());
                    }
                }
                self.throttle.after_work(work.elapsed());
            }

            if !self.options.test_mode {
                self.checkpoint(&processed, &failed)?;
            }
            info!(
                chunk = n + 1,
                chunks,
                processed = processed.len(),
                failed = failed.len(),
                "chunk done"
            );
        }

        let rankings = regenerate_rankings(self.store)?;
        let approaching = self.save_approaching(&processed)?;

        let metadata = self.store.update_metadata(BatchMetadata {
            total_stocks: listings.len(),
            processed_stocks: processed.len(),
            failed_stocks: failed.len(),
            strategies: self.strategies.iter().map(|s| s.name().to_string()).collect(),
            approaching_strategies: approaching,
            processing_time_seconds: started.elapsed().as_secs(),
            last_updated: None,
            version: String::new(),
        })?;

        if !self.options.test_mode {
            self.store.clear_progress()?;
        }
        info!(
            processed = metadata.processed_stocks,
            failed = metadata.failed_stocks,
            rankings,
            seconds = metadata.processing_time_seconds,
            "batch finished"
        );
        Ok(metadata)
    }

    /// Fetch, analyse and store one stock. Data problems fail the stock,
    /// store errors fail the batch.
    fn process_stock(&self, listing: &StockListing) -> Result<Outcome, StockfitError> {
        let bars = match self.data.fetch_ohlcv(&listing.code) {
            Ok(bars) => bars,
            Err(e) => return Ok(Outcome::Failed(e.to_string())),
        };
        if bars.len() < self.options.min_bars {
            return Ok(Outcome::Failed(
                StockfitError::InsufficientData {
                    code: listing.code.clone(),
                    bars: bars.len(),
                    minimum: self.options.min_bars,
                }
                .to_string(),
            ));
        }

        let data = StockData::new(listing.code.clone(), listing.name.clone(), bars);
        let results = self.analyzer.analyze(&data, &self.strategies);
        let mut detail = StockDetail::new(&listing.code, &listing.name, &results);
        detail.approaching = self.detector.detect_all(&data);
        debug!(
            code = %listing.code,
            approaching = detail.approaching.len(),
            "stock analysed"
        );
        self.store.save_detail(&detail)?;
        Ok(Outcome::Processed)
    }

    fn checkpoint(&self, processed: &[String], failed: &[String]) -> Result<(), StockfitError> {
        self.store
            .save_progress(&Progress::new(processed.to_vec(), failed.to_vec()))
    }

    /// Top approaching signals per strategy from this run's stocks.
    /// Returns the strategy keys written.
    /// Approaching lists over the processed codes. Details are looked up by
    /// listing code, so codes the store rewrites on disk still resolve.
    fn save_approaching(&self, codes: &[String]) -> Result<Vec<String>, StockfitError> {
        let mut by_strategy: BTreeMap<String, Vec<ProximityEstimate>> = BTreeMap::new();
        for code in codes {
            let Some(detail) = self.store.load_detail(code)? else {
                continue;
            };
            for estimate in detail.approaching {
                by_strategy
                    .entry(estimate.strategy_key.clone())
                    .or_default()
                    .push(estimate);
            }
        }

        for (key, estimates) in &mut by_strategy {
            estimates.sort_by(|a, b| b.score.total_cmp(&a.score));
            let entries: Vec<ApproachingEntry> = estimates
                .drain(..)
                .take(self.options.approaching_top)
                .enumerate()
                .map(|(i, estimate)| ApproachingEntry {
                    rank: i + 1,
                    estimate,
                })
                .collect();
            self.store.save_approaching(key, &entries)?;
        }
        info!(strategies = by_strategy.len(), "approaching signals saved");
        Ok(by_strategy.into_keys().collect())
    }
}

/// Per-strategy rankings over `details`, best score first, ranks from 1.
pub fn build_rankings(details: &[StockDetail]) -> BTreeMap<String, Vec<RankingEntry>> {
    let mut rankings: BTreeMap<String, Vec<RankingEntry>> = BTreeMap::new();
    for detail in details {
        for (key, summary) in &detail.strategies {
            rankings.entry(key.clone()).or_default().push(RankingEntry {
                rank: 0,
                code: detail.code.clone(),
                name: detail.name.clone(),
                score: summary.score,
                win_rate: summary.win_rate,
                total_return: summary.total_return,
                trades: summary.num_trades,
                reason: summary.reason.clone(),
            });
        }
    }

    for entries in rankings.values_mut() {
        entries.sort_by(|a, b| b.score.total_cmp(&a.score));
        for (i, entry) in entries.iter_mut().enumerate() {
            entry.rank = i + 1;
        }
    }
    rankings
}

/// Rebuild every ranking from the stored detail records. Approaching
/// signals are left alone. Returns the number of rankings written.
pub fn regenerate_rankings(store: &dyn ResultStorePort) -> Result<usize, StockfitError> {
    let mut details = Vec::new();
    for code in store.detail_codes()? {
        match store.load_detail(&code) {
            Ok(Some(detail)) => details.push(detail),
            Ok(None) => {}
            Err(e) => warn!(%code, error = %e, "unreadable detail record"),
        }
    }
    info!(stocks = details.len(), "rebuilding rankings");

    let rankings = build_rankings(&details);
    for (key, entries) in &rankings {
        store.save_ranking(key, entries)?;
        debug!(strategy = %key, entries = entries.len(), "ranking saved");
    }
    Ok(rankings.len())
}
