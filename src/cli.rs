//! CLI definition and dispatch.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use chrono::{Local, NaiveDate};
use clap::{Args, Parser, Subcommand};
use tracing::{debug, error, info};

use crate::adapters::csv_adapter::{CsvAdapter, CsvListingAdapter};
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::git_publisher::GitPublisher;
use crate::adapters::json_result_store::JsonResultStore;
use crate::adapters::price_cache::CachedDataPort;
use crate::adapters::run_lock::RunLock;
use crate::adapters::static_site::StaticSiteGenerator;
use crate::domain::backtest::BacktestConfig;
use crate::domain::batch::{BatchOptions, DailyBatch, regenerate_rankings};
use crate::domain::compatibility::{CompatibilityAnalyzer, CompatibilityResult, rank_by_strategy};
use crate::domain::config_validation::{
    validate_backtest_config, validate_batch_config, validate_data_config,
    validate_publish_config, validate_site_config,
};
use crate::domain::error::StockfitError;
use crate::domain::proximity::SignalDetector;
use crate::domain::publish::{PublishOutcome, publish};
use crate::domain::results::BatchMetadata;
use crate::domain::schedule::{ScheduleOutcome, ScheduledRun, run_scheduled};
use crate::domain::stock_data::StockData;
use crate::domain::strategy::{StrategyKind, all_strategies, strategy_by_key};
use crate::domain::throttle::Throttle;
use crate::domain::universe::{filter_listings, parse_codes, validate_universe};
use crate::logging;
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::{DataPort, ListingPort};
use crate::ports::site_port::{SitePort, SiteSummary};

const RULE: &str = "============================================================";
const THIN_RULE: &str = "------------------------------------------------------------";

#[derive(Parser, Debug)]
#[command(name = "stockfit", about = "Stock/strategy compatibility scanner")]
pub struct Cli {
    /// INI configuration file
    #[arg(short, long, global = true, default_value = "stockfit.ini")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Args, Debug, Clone, Default)]
pub struct BatchArgs {
    /// Continue an interrupted run from its checkpoint
    #[arg(long)]
    pub resume: bool,
    /// Process only the first N listings
    #[arg(long)]
    pub limit: Option<usize>,
    /// Do not write or clear the checkpoint
    #[arg(long)]
    pub test_mode: bool,
    /// Percentage of one core to use (100 disables throttling)
    #[arg(long)]
    pub cpu_limit: Option<u32>,
    #[arg(long)]
    pub chunk_size: Option<usize>,
    /// Drop cached price files before fetching
    #[arg(long)]
    pub refresh: bool,
    /// Save progress and stop after this many minutes (0 means no limit)
    #[arg(long)]
    pub max_runtime_minutes: Option<u64>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Score one stock against every strategy
    Analyze { code: String },
    /// List stocks that fit a strategy
    FilterStocks {
        /// Strategy key or display name
        strategy: String,
        #[arg(long, default_value_t = 60.0)]
        threshold: f64,
        #[arg(long, default_value_t = 10)]
        top: usize,
        /// Comma-separated codes instead of the listing file
        #[arg(long)]
        codes: Option<String>,
        /// Scan only the first N listings
        #[arg(long)]
        limit: Option<usize>,
    },
    /// List the available strategies
    ListStrategies,
    /// Run the daily batch
    Batch(BatchArgs),
    /// Rebuild rankings from stored detail records
    RegenerateRankings,
    /// Render the static site from stored results
    GeneratePages,
    /// Commit and push the generated site when it changed
    Publish,
    /// Weekday run: batch, pages, publish
    Scheduled {
        #[arg(long)]
        resume: bool,
        /// Run as if today were this date (YYYY-MM-DD)
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Show the data range for comma-separated codes
    Info { codes: String },
}

pub fn run(cli: Cli) -> ExitCode {
    let result = match cli.command {
        Command::ListStrategies => {
            init_logging(None);
            run_list_strategies();
            Ok(())
        }
        command => match load_config(&cli.config) {
            Ok(config) => dispatch(command, &config),
            Err(e) => Err(e),
        },
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

fn dispatch(command: Command, config: &FileConfigAdapter) -> Result<(), StockfitError> {
    match command {
        Command::Analyze { code } => {
            init_logging(None);
            run_analyze(config, &code)
        }
        Command::FilterStocks {
            strategy,
            threshold,
            top,
            codes,
            limit,
        } => {
            init_logging(None);
            run_filter_stocks(config, &strategy, threshold, top, codes.as_deref(), limit)
        }
        Command::ListStrategies => {
            run_list_strategies();
            Ok(())
        }
        Command::Batch(args) => {
            init_logging(Some(&log_dir(config)));
            let metadata = execute_batch(config, &args).inspect_err(|e| {
                error!(error = %e, "batch failed");
            })?;
            print_batch_summary(&metadata);
            Ok(())
        }
        Command::RegenerateRankings => {
            init_logging(None);
            let count = regenerate_rankings(&build_store(config))?;
            eprintln!("{count} rankings rebuilt");
            Ok(())
        }
        Command::GeneratePages => {
            init_logging(None);
            let summary = generate_pages(config)?;
            print_site_summary(&summary);
            Ok(())
        }
        Command::Publish => {
            init_logging(Some(&log_dir(config)));
            let outcome = publish_site(config, Local::now().date_naive())?;
            print_publish_outcome(&outcome);
            Ok(())
        }
        Command::Scheduled { resume, date } => {
            init_logging(Some(&log_dir(config)));
            run_scheduled_command(config, resume, date)
        }
        Command::Info { codes } => {
            init_logging(None);
            run_info(config, &codes)
        }
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, StockfitError> {
    debug!(path = %path.display(), "loading config");
    FileConfigAdapter::from_file(path)
}

fn init_logging(log_dir: Option<&Path>) {
    if let Err(e) = logging::init(log_dir, Local::now().date_naive()) {
        eprintln!("warning: logging not initialised: {e}");
    }
}

fn log_dir(config: &dyn ConfigPort) -> PathBuf {
    PathBuf::from(config.get_string_or("batch", "log_dir", "logs"))
}

fn non_negative(config: &dyn ConfigPort, section: &str, key: &str, default: i64) -> usize {
    config.get_int(section, key, default).max(0) as usize
}

pub fn build_backtest_config(config: &dyn ConfigPort) -> Result<BacktestConfig, StockfitError> {
    validate_backtest_config(config)?;
    let defaults = BacktestConfig::default();
    let max_years = config.get_int("backtest", "max_years", 0);

    Ok(BacktestConfig {
        initial_capital: config.get_double("backtest", "initial_capital", defaults.initial_capital),
        cash_commission_rate: config.get_double(
            "backtest",
            "cash_commission_rate",
            defaults.cash_commission_rate,
        ),
        cash_slippage: config.get_double("backtest", "cash_slippage", defaults.cash_slippage),
        margin_commission_rate: config.get_double(
            "backtest",
            "margin_commission_rate",
            defaults.margin_commission_rate,
        ),
        margin_lending_rate: config.get_double(
            "backtest",
            "margin_lending_rate",
            defaults.margin_lending_rate,
        ),
        margin_slippage: config.get_double("backtest", "margin_slippage", defaults.margin_slippage),
        max_years: (max_years > 0).then_some(max_years as u32),
        target_holding_days: config.get_int(
            "backtest",
            "target_holding_days",
            defaults.target_holding_days,
        ),
        max_holding_days: config.get_int("backtest", "max_holding_days", defaults.max_holding_days),
        trailing_stop_enabled: config.get_bool(
            "backtest",
            "trailing_stop",
            defaults.trailing_stop_enabled,
        ),
        trailing_stop_long: config.get_double(
            "backtest",
            "trailing_stop_long",
            defaults.trailing_stop_long,
        ),
        trailing_stop_short: config.get_double(
            "backtest",
            "trailing_stop_short",
            defaults.trailing_stop_short,
        ),
    })
}

pub fn build_analyzer(config: &dyn ConfigPort) -> Result<CompatibilityAnalyzer, StockfitError> {
    Ok(CompatibilityAnalyzer::new(
        build_backtest_config(config)?,
        config.get_bool("backtest", "parallel", true),
        non_negative(config, "backtest", "max_workers", 4),
    ))
}

pub fn build_data_port(
    config: &dyn ConfigPort,
) -> Result<CachedDataPort<CsvAdapter>, StockfitError> {
    validate_data_config(config)?;
    let prices_dir = config.get_string_or("data", "prices_dir", "data/prices");
    Ok(CachedDataPort::new(
        CsvAdapter::new(PathBuf::from(prices_dir)),
        PathBuf::from(config.get_string_or("data", "cache_dir", "data/cache")),
        non_negative(config, "data", "cache_ttl_hours", 24) as u64,
    ))
}

pub fn build_store(config: &dyn ConfigPort) -> JsonResultStore {
    JsonResultStore::new(PathBuf::from(
        config.get_string_or("batch", "results_dir", "results"),
    ))
}

fn site_dir(config: &dyn ConfigPort) -> PathBuf {
    PathBuf::from(config.get_string_or("site", "output_dir", "docs"))
}

pub fn build_site(config: &dyn ConfigPort) -> Result<StaticSiteGenerator, StockfitError> {
    validate_site_config(config)?;
    Ok(StaticSiteGenerator::new(
        site_dir(config),
        config.get_double("site", "min_score", 40.0),
    ))
}

pub fn build_publisher(config: &dyn ConfigPort) -> Result<GitPublisher, StockfitError> {
    validate_publish_config(config)?;
    Ok(GitPublisher::new(
        PathBuf::from(config.get_string_or("publish", "repo_dir", ".")),
        config.get_string_or("publish", "remote", "origin"),
        config.get_string("publish", "branch"),
    ))
}

/// Batch options from `[data]` and `[batch]`, with command-line overrides.
pub fn batch_options(config: &dyn ConfigPort, args: &BatchArgs) -> BatchOptions {
    let defaults = BatchOptions::default();
    let max_runtime = args
        .max_runtime_minutes
        .unwrap_or_else(|| non_negative(config, "batch", "max_runtime_minutes", 0) as u64);
    BatchOptions {
        resume: args.resume,
        limit: args.limit,
        test_mode: args.test_mode,
        chunk_size: args.chunk_size.unwrap_or_else(|| {
            non_negative(config, "batch", "chunk_size", defaults.chunk_size as i64)
        }),
        min_bars: non_negative(config, "data", "min_bars", defaults.min_bars as i64),
        approaching_top: non_negative(
            config,
            "batch",
            "approaching_top",
            defaults.approaching_top as i64,
        ),
        max_runtime: (max_runtime > 0).then(|| Duration::from_secs(max_runtime * 60)),
    }
}

pub fn execute_batch(
    config: &dyn ConfigPort,
    args: &BatchArgs,
) -> Result<BatchMetadata, StockfitError> {
    validate_batch_config(config)?;
    let data = build_data_port(config)?;
    if args.refresh {
        data.clear(None)?;
        info!("price cache cleared");
    }
    let analyzer = build_analyzer(config)?;
    let listings = CsvListingAdapter::new(PathBuf::from(config.get_string_or(
        "data",
        "listing_file",
        "data/listings.csv",
    )));
    let store = build_store(config);
    let cpu_limit = args
        .cpu_limit
        .unwrap_or_else(|| non_negative(config, "batch", "cpu_limit", 25) as u32);

    let batch = DailyBatch {
        listings: &listings,
        data: &data,
        store: &store,
        analyzer: &analyzer,
        detector: SignalDetector::new(non_negative(config, "batch", "lookback_days", 60)),
        strategies: all_strategies(),
        throttle: Throttle::new(cpu_limit),
        options: batch_options(config, args),
    };
    batch.run()
}

pub fn generate_pages(config: &dyn ConfigPort) -> Result<SiteSummary, StockfitError> {
    build_site(config)?.generate(&build_store(config))
}

pub fn publish_site(
    config: &dyn ConfigPort,
    today: NaiveDate,
) -> Result<PublishOutcome, StockfitError> {
    let vcs = build_publisher(config)?;
    publish(&vcs, &site_dir(config), today)
}

/// Runtime bound for unattended runs unless `[schedule] max_runtime_minutes` says otherwise.
pub const SCHEDULED_MAX_RUNTIME_MINUTES: i64 = 360;

/// Scheduled run wired to the real adapters.
pub struct ScheduledPipeline<'a> {
    config: &'a dyn ConfigPort,
    resume: bool,
    lock_path: PathBuf,
    lock: Option<RunLock>,
}

impl<'a> ScheduledPipeline<'a> {
    pub fn new(config: &'a dyn ConfigPort, resume: bool) -> Self {
        Self {
            config,
            resume,
            lock_path: PathBuf::from(config.get_string_or("schedule", "lock_file", "stockfit.lock")),
            lock: None,
        }
    }

    /// Batch arguments for the scheduled batch step.
    pub fn batch_args(&self) -> BatchArgs {
        BatchArgs {
            resume: self.resume,
            max_runtime_minutes: Some(non_negative(
                self.config,
                "schedule",
                "max_runtime_minutes",
                SCHEDULED_MAX_RUNTIME_MINUTES,
            ) as u64),
            ..Default::default()
        }
    }
}

impl ScheduledRun for ScheduledPipeline<'_> {
    fn acquire_lock(&mut self) -> Result<(), StockfitError> {
        self.lock = Some(RunLock::acquire(&self.lock_path)?);
        Ok(())
    }

    fn release_lock(&mut self) {
        if let Some(lock) = self.lock.take() {
            lock.release();
        }
    }

    fn run_batch(&mut self) -> Result<BatchMetadata, StockfitError> {
        execute_batch(self.config, &self.batch_args())
    }

    fn generate_pages(&mut self) -> Result<SiteSummary, StockfitError> {
        generate_pages(self.config)
    }

    fn publish(&mut self, today: NaiveDate) -> Result<PublishOutcome, StockfitError> {
        publish_site(self.config, today)
    }
}

fn run_scheduled_command(
    config: &dyn ConfigPort,
    resume: bool,
    date: Option<NaiveDate>,
) -> Result<(), StockfitError> {
    let today = date.unwrap_or_else(|| Local::now().date_naive());
    let mut pipeline = ScheduledPipeline::new(config, resume);
    match run_scheduled(today, &mut pipeline)? {
        ScheduleOutcome::Skipped { weekday } => {
            eprintln!("{today} is {weekday}, nothing to do");
        }
        ScheduleOutcome::Completed { publish } => print_publish_outcome(&publish),
    }
    Ok(())
}

/// Code → name from the listing file, empty when it is not configured or unreadable.
fn listing_names(config: &dyn ConfigPort) -> HashMap<String, String> {
    let Some(path) = config.get_string("data", "listing_file") else {
        return HashMap::new();
    };
    match CsvListingAdapter::new(PathBuf::from(path)).load_listings() {
        Ok(listings) => listings.into_iter().map(|l| (l.code, l.name)).collect(),
        Err(e) => {
            debug!(error = %e, "listing names unavailable");
            HashMap::new()
        }
    }
}

fn load_stock(
    data_port: &dyn DataPort,
    code: &str,
    name: &str,
    min_bars: usize,
) -> Result<StockData, StockfitError> {
    let bars = data_port.fetch_ohlcv(code)?;
    if bars.len() < min_bars {
        return Err(StockfitError::InsufficientData {
            code: code.to_string(),
            bars: bars.len(),
            minimum: min_bars,
        });
    }
    Ok(StockData::new(code.to_string(), name.to_string(), bars))
}

fn kind_label(kind: StrategyKind) -> &'static str {
    match kind {
        StrategyKind::Long => "買い",
        StrategyKind::Short => "空売り",
    }
}

fn run_analyze(config: &dyn ConfigPort, code: &str) -> Result<(), StockfitError> {
    eprintln!("銘柄 {code} を分析中...");
    let data_port = build_data_port(config)?;
    let analyzer = build_analyzer(config)?;
    let names = listing_names(config);
    let name = names.get(code).map(String::as_str).unwrap_or(code);
    let min_bars = non_negative(config, "data", "min_bars", 200);

    let data = load_stock(&data_port, code, name, min_bars)?;
    let strategies = all_strategies();
    let mut results = analyzer.analyze(&data, &strategies);
    results.sort_by(|a, b| b.score.total_cmp(&a.score));

    println!("{RULE}");
    println!("銘柄コード: {code} {name}");
    println!("{RULE}");
    for r in &results {
        println!("\n【{}】", r.strategy_name);
        println!("適合度: {:.1}%", r.score);
        println!("\n{}", r.reason_text());
        println!("{THIN_RULE}");
    }

    let detector = SignalDetector::new(non_negative(config, "batch", "lookback_days", 60));
    let approaching = detector.detect_all(&data);
    if !approaching.is_empty() {
        println!("\nシグナル接近中:");
        for e in &approaching {
            let days = e
                .estimated_days
                .map(|d| d.to_string())
                .unwrap_or_else(|| "?".into());
            println!(
                "  {}: 接近度 {:.0}%, 約{}日後 (達成 {}, 未達 {})",
                e.strategy_name,
                e.score,
                days,
                e.conditions_met.join(" / "),
                e.conditions_pending.join(" / ")
            );
        }
    }
    Ok(())
}

fn run_filter_stocks(
    config: &dyn ConfigPort,
    strategy_key: &str,
    threshold: f64,
    top: usize,
    codes: Option<&str>,
    limit: Option<usize>,
) -> Result<(), StockfitError> {
    let strategy = strategy_by_key(strategy_key).inspect_err(|_| {
        eprintln!("利用可能な手法:");
        for s in all_strategies() {
            eprintln!("  - {} ({})", s.key(), s.name());
        }
    })?;
    eprintln!("手法「{}」で銘柄をフィルタリング中...", strategy.name());

    let data_port = build_data_port(config)?;
    let analyzer = build_analyzer(config)?;
    let min_bars = non_negative(config, "data", "min_bars", 200);

    let names = listing_names(config);
    let mut universe = match codes {
        Some(list) => parse_codes(list).map_err(|e| StockfitError::Data {
            reason: format!("invalid code list: {e}"),
        })?,
        None => {
            let path = config
                .get_string("data", "listing_file")
                .ok_or_else(|| StockfitError::ConfigMissing {
                    section: "data".into(),
                    key: "listing_file".into(),
                })?;
            let listings = CsvListingAdapter::new(PathBuf::from(path)).load_listings()?;
            filter_listings(listings).into_iter().map(|l| l.code).collect()
        }
    };
    if let Some(limit) = limit {
        universe.truncate(limit);
    }

    let validation = validate_universe(&data_port, universe, min_bars)?;
    for skipped in &validation.skipped {
        eprintln!("warning: skipping {} ({:?})", skipped.code, skipped.reason);
    }

    let strategies = vec![strategy];
    let total = validation.valid.len();
    let mut results: Vec<CompatibilityResult> = Vec::with_capacity(total);
    for (i, code) in validation.valid.iter().enumerate() {
        eprintln!("分析中: {code} ({}/{total})", i + 1);
        let name = names.get(code).map(String::as_str).unwrap_or(code);
        match load_stock(&data_port, code, name, min_bars) {
            Ok(data) => results.extend(analyzer.analyze(&data, &strategies)),
            Err(e) => eprintln!("warning: skipping {code} ({e})"),
        }
    }

    let mut ranked = rank_by_strategy(&results, strategies[0].key(), threshold);
    ranked.truncate(top);

    println!("{RULE}");
    println!("手法: {}", strategies[0].name());
    println!("閾値: {threshold}%以上");
    println!("該当銘柄数: {}", ranked.len());
    println!("{RULE}");
    for (i, r) in ranked.iter().enumerate() {
        println!("\n{}. 銘柄コード: {} {}", i + 1, r.code, r.name);
        println!("   適合度: {:.1}%", r.score);
        println!("   {}", r.headline());
    }
    Ok(())
}

fn run_list_strategies() {
    println!("利用可能な手法:");
    for s in all_strategies() {
        println!("\n{} [{}] ({})", s.name(), s.key(), kind_label(s.kind()));
        println!("  {}", s.description());
        for (param, value) in s.parameters() {
            println!("    {param}: {value}");
        }
    }
}

fn run_info(config: &dyn ConfigPort, codes: &str) -> Result<(), StockfitError> {
    validate_data_config(config)?;
    let codes = parse_codes(codes).map_err(|e| StockfitError::Data {
        reason: format!("invalid code list: {e}"),
    })?;
    let adapter = CsvAdapter::new(PathBuf::from(
        config.get_string_or("data", "prices_dir", "data/prices"),
    ));

    for code in &codes {
        match adapter.get_data_range(code) {
            Ok(Some((first, last, count))) => println!("{code}: {count} bars, {first} to {last}"),
            Ok(None) => eprintln!("{code}: no data found"),
            Err(e) => eprintln!("error querying {code}: {e}"),
        }
    }
    Ok(())
}

fn print_batch_summary(metadata: &BatchMetadata) {
    eprintln!("\n=== Batch Results ===");
    eprintln!("Total stocks:     {}", metadata.total_stocks);
    eprintln!("Processed:        {}", metadata.processed_stocks);
    eprintln!("Failed:           {}", metadata.failed_stocks);
    eprintln!("Approaching:      {}", metadata.approaching_strategies.len());
    eprintln!("Elapsed:          {}s", metadata.processing_time_seconds);
}

fn print_site_summary(summary: &SiteSummary) {
    eprintln!(
        "Site generated: {} strategy pages, {} approaching pages",
        summary.strategy_pages, summary.approaching_pages
    );
}

fn print_publish_outcome(outcome: &PublishOutcome) {
    match outcome {
        PublishOutcome::NoChanges => eprintln!("No changes to publish"),
        PublishOutcome::Published { message } => eprintln!("Published: {message}"),
    }
}
