//! Tracing setup.
//!
//! Everything goes to stderr, filtered by `RUST_LOG` (default `info`).
//! Batch-style commands also pass a log directory, which adds a daily
//! `batch_YYYYMMDD.log` at info level and two error-only logs:
//! `publish_error.log` for the publish step and `error.log` for the rest.

use std::fs::{self, File, OpenOptions};
use std::path::Path;
use std::sync::Mutex;

use chrono::NaiveDate;
use tracing::{Level, Subscriber};
use tracing_subscriber::filter::{LevelFilter, filter_fn};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, fmt};

use crate::domain::error::StockfitError;

pub const ERROR_LOG: &str = "error.log";
pub const PUBLISH_ERROR_LOG: &str = "publish_error.log";

const PUBLISH_TARGETS: [&str; 2] = ["stockfit::domain::publish", "stockfit::adapters::git_publisher"];

/// Whether events from `target` belong in the publish error log.
pub fn is_publish_target(target: &str) -> bool {
    PUBLISH_TARGETS.iter().any(|t| target.starts_with(t))
}

pub fn daily_log_name(date: NaiveDate) -> String {
    format!("batch_{}.log", date.format("%Y%m%d"))
}

fn open_append(path: &Path) -> Result<File, StockfitError> {
    Ok(OpenOptions::new().create(true).append(true).open(path)?)
}

/// Error events into `file`, either the publish ones or everything else.
fn error_layer<S>(file: File, publish: bool) -> impl Layer<S>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fmt::layer()
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .with_filter(filter_fn(move |meta| {
            *meta.level() == Level::ERROR && is_publish_target(meta.target()) == publish
        }))
}

/// Install the global subscriber. `log_dir` adds the file layers.
pub fn init(log_dir: Option<&Path>, today: NaiveDate) -> Result<(), StockfitError> {
    let stderr = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")));

    let (daily, errors, publish_errors) = match log_dir {
        Some(dir) => {
            fs::create_dir_all(dir)?;
            let daily = fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(open_append(&dir.join(daily_log_name(today)))?))
                .with_filter(LevelFilter::INFO);
            let errors = error_layer(open_append(&dir.join(ERROR_LOG))?, false);
            let publish_errors = error_layer(open_append(&dir.join(PUBLISH_ERROR_LOG))?, true);
            (Some(daily), Some(errors), Some(publish_errors))
        }
        None => (None, None, None),
    };

    tracing_subscriber::registry()
        .with(stderr)
        .with(daily)
        .with(errors)
        .with(publish_errors)
        .try_init()
        .map_err(|e| StockfitError::Io(std::io::Error::other(e.to_string())))
}
