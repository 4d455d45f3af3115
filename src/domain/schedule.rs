//! Weekday-only scheduled run: batch, then pages, then publish.
//!
//! Weekends are skipped before anything else happens. A run lock keeps two
//! scheduled runs from overlapping. Any failure stops the run there, so a
//! failed batch never reaches the publish step.

use chrono::{Datelike, NaiveDate, Weekday};
use tracing::{error, info};

use super::error::StockfitError;
use super::publish::PublishOutcome;
use super::results::BatchMetadata;
use crate::ports::site_port::SiteSummary;

/// The steps of one scheduled run.
pub trait ScheduledRun {
    /// Fails with [`StockfitError::AlreadyRunning`] when another run holds the lock.
    fn acquire_lock(&mut self) -> Result<(), StockfitError>;
    fn release_lock(&mut self);
    fn run_batch(&mut self) -> Result<BatchMetadata, StockfitError>;
    fn generate_pages(&mut self) -> Result<SiteSummary, StockfitError>;
    fn publish(&mut self, today: NaiveDate) -> Result<PublishOutcome, StockfitError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScheduleOutcome {
    Skipped { weekday: Weekday },
    Completed { publish: PublishOutcome },
}

pub fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

pub fn run_scheduled(
    today: NaiveDate,
    run: &mut dyn ScheduledRun,
) -> Result<ScheduleOutcome, StockfitError> {
    if is_weekend(today) {
        info!(%today, weekday = %today.weekday(), "weekend, skipping scheduled run");
        return Ok(ScheduleOutcome::Skipped {
            weekday: today.weekday(),
        });
    }

    run.acquire_lock().inspect_err(|e| {
        error!(error = %e, "scheduled run not started");
    })?;
    let result = run_steps(today, run);
    run.release_lock();
    result
}

fn run_steps(
    today: NaiveDate,
    run: &mut dyn ScheduledRun,
) -> Result<ScheduleOutcome, StockfitError> {
    info!(%today, "scheduled run started");

    let metadata = run.run_batch().inspect_err(|e| {
        error!(error = %e, "batch failed, publish skipped");
    })?;
    info!(
        processed = metadata.processed_stocks,
        failed = metadata.failed_stocks,
        "batch step done"
    );

    let pages = run.generate_pages().inspect_err(|e| {
        error!(error = %e, "page generation failed, publish skipped");
    })?;
    info!(
        strategies = pages.strategy_pages,
        approaching = pages.approaching_pages,
        "pages generated"
    );

    let publish = run.publish(today)?;
    Ok(ScheduleOutcome::Completed { publish })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        steps: Vec<&'static str>,
        locked: bool,
        fail_batch: bool,
    }

    impl ScheduledRun for Recorder {
        fn acquire_lock(&mut self) -> Result<(), StockfitError> {
            if self.locked {
                return Err(StockfitError::AlreadyRunning {
                    path: "stockfit.lock".into(),
                });
            }
            self.locked = true;
            self.steps.push("lock");
            Ok(())
        }

        fn release_lock(&mut self) {
            self.locked = false;
            self.steps.push("unlock");
        }

        fn run_batch(&mut self) -> Result<BatchMetadata, StockfitError> {
            self.steps.push("batch");
            if self.fail_batch {
                return Err(StockfitError::Data {
                    reason: "listing file unreadable".into(),
                });
            }
            Ok(BatchMetadata::default())
        }

        fn generate_pages(&mut self) -> Result<SiteSummary, StockfitError> {
            self.steps.push("pages");
            Ok(SiteSummary::default())
        }

        fn publish(&mut self, _today: NaiveDate) -> Result<PublishOutcome, StockfitError> {
            self.steps.push("publish");
            Ok(PublishOutcome::NoChanges)
        }
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn weekend_detection() {
        assert!(is_weekend(date("2024-03-02")));
        assert!(is_weekend(date("2024-03-03")));
        assert!(!is_weekend(date("2024-03-04")));
        assert!(!is_weekend(date("2024-03-01")));
    }

    #[test]
    fn saturday_skips_everything() {
        let mut run = Recorder::default();
        let outcome = run_scheduled(date("2024-03-02"), &mut run).unwrap();
        assert_eq!(
            outcome,
            ScheduleOutcome::Skipped {
                weekday: Weekday::Sat
            }
        );
        assert!(run.steps.is_empty());
    }

    #[test]
    fn weekday_runs_all_steps_in_order() {
        let mut run = Recorder::default();
        let outcome = run_scheduled(date("2024-03-04"), &mut run).unwrap();
        assert_eq!(
            outcome,
            ScheduleOutcome::Completed {
                publish: PublishOutcome::NoChanges
            }
        );
        assert_eq!(run.steps, vec!["lock", "batch", "pages", "publish", "unlock"]);
    }

    #[test]
    fn failed_batch_skips_publish_and_releases_lock() {
        let mut run = Recorder {
            fail_batch: true,
            ..Default::default()
        };
        let err = run_scheduled(date("2024-03-04"), &mut run).unwrap_err();
        assert!(matches!(err, StockfitError::Data { .. }));
        assert_eq!(run.steps, vec!["lock", "batch", "unlock"]);
        assert!(!run.locked);
    }

    #[test]
    fn held_lock_prevents_overlap() {
        let mut run = Recorder {
            locked: true,
            ..Default::default()
        };
        let err = run_scheduled(date("2024-03-04"), &mut run).unwrap_err();
        assert!(matches!(err, StockfitError::AlreadyRunning { .. }));
        assert!(run.steps.is_empty());
    }
}
