//! Configuration validation.
//!
//! Every key has a default, so validation only rejects values that are
//! present and out of range, plus the few paths a command cannot run without.

use crate::domain::error::StockfitError;
use crate::ports::config_port::ConfigPort;
use std::path::{Component, Path, PathBuf};

pub fn validate_data_config(config: &dyn ConfigPort) -> Result<(), StockfitError> {
    require(config, "data", "prices_dir")?;
    check_int(config, "data", "min_bars", 200, 1, i64::MAX, "min_bars must be at least 1")?;
    check_int(
        config,
        "data",
        "cache_ttl_hours",
        24,
        0,
        i64::MAX,
        "cache_ttl_hours must be non-negative",
    )?;
    Ok(())
}

pub fn validate_backtest_config(config: &dyn ConfigPort) -> Result<(), StockfitError> {
    let capital = config.get_double("backtest", "initial_capital", 1_000_000.0);
    if capital <= 0.0 {
        return Err(invalid("backtest", "initial_capital", "initial_capital must be positive"));
    }

    for key in [
        "cash_commission_rate",
        "cash_slippage",
        "margin_commission_rate",
        "margin_lending_rate",
        "margin_slippage",
    ] {
        let value = config.get_double("backtest", key, 0.0);
        if !(0.0..1.0).contains(&value) {
            return Err(invalid("backtest", key, &format!("{key} must be between 0 and 1")));
        }
    }

    for key in ["trailing_stop_long", "trailing_stop_short"] {
        let value = config.get_double("backtest", key, 0.10);
        if value <= 0.0 || value >= 1.0 {
            return Err(invalid(
                "backtest",
                key,
                &format!("{key} must be greater than 0 and less than 1"),
            ));
        }
    }

    let target = config.get_int("backtest", "target_holding_days", 14);
    if target < 1 {
        return Err(invalid(
            "backtest",
            "target_holding_days",
            "target_holding_days must be at least 1",
        ));
    }
    let max = config.get_int("backtest", "max_holding_days", 30);
    if max < target {
        return Err(invalid(
            "backtest",
            "max_holding_days",
            "max_holding_days must not be less than target_holding_days",
        ));
    }

    check_int(config, "backtest", "max_years", 0, 0, 100, "max_years must be between 0 and 100")?;
    check_int(config, "backtest", "max_workers", 4, 1, 256, "max_workers must be between 1 and 256")?;
    Ok(())
}

pub fn validate_batch_config(config: &dyn ConfigPort) -> Result<(), StockfitError> {
    require(config, "data", "listing_file")?;
    check_int(config, "batch", "chunk_size", 100, 1, i64::MAX, "chunk_size must be at least 1")?;
    check_int(config, "batch", "cpu_limit", 25, 1, 100, "cpu_limit must be between 1 and 100")?;
    check_int(
        config,
        "batch",
        "lookback_days",
        60,
        20,
        i64::MAX,
        "lookback_days must be at least 20",
    )?;
    check_int(
        config,
        "batch",
        "approaching_top",
        30,
        1,
        i64::MAX,
        "approaching_top must be at least 1",
    )?;
    check_int(
        config,
        "batch",
        "max_runtime_minutes",
        0,
        0,
        i64::MAX,
        "max_runtime_minutes must be non-negative",
    )?;
    Ok(())
}

pub fn validate_site_config(config: &dyn ConfigPort) -> Result<(), StockfitError> {
    let min_score = config.get_double("site", "min_score", 40.0);
    if !(0.0..=100.0).contains(&min_score) {
        return Err(invalid("site", "min_score", "min_score must be between 0 and 100"));
    }

    // The generator clears output_dir before writing, so it must never
    // contain the repository or anything above it.
    let output_dir = absolute(Path::new(&config.get_string_or("site", "output_dir", "docs")));
    if !output_dir.components().any(|c| matches!(c, Component::Normal(_))) {
        return Err(invalid("site", "output_dir", "output_dir must not be a root directory"));
    }
    let repo_dir = absolute(Path::new(&config.get_string_or("publish", "repo_dir", ".")));
    if repo_dir.starts_with(&output_dir) {
        return Err(invalid(
            "site",
            "output_dir",
            "output_dir must be a subdirectory of the publish repository",
        ));
    }
    Ok(())
}

pub fn validate_publish_config(config: &dyn ConfigPort) -> Result<(), StockfitError> {
    require(config, "publish", "repo_dir")
}

fn require(config: &dyn ConfigPort, section: &str, key: &str) -> Result<(), StockfitError> {
    match config.get_string(section, key) {
        Some(s) if !s.trim().is_empty() => Ok(()),
        _ => Err(StockfitError::ConfigMissing {
            section: section.to_string(),
            key: key.to_string(),
        }),
    }
}

fn check_int(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: i64,
    min: i64,
    max: i64,
    reason: &str,
) -> Result<(), StockfitError> {
    let value = config.get_int(section, key, default);
    if value < min || value > max {
        return Err(invalid(section, key, reason));
    }
    Ok(())
}

/// Lexically absolute form of `path`: joined onto the working directory,
/// `.` dropped and `..` applied.
fn absolute(path: &Path) -> PathBuf {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir().map_or_else(|_| path.to_path_buf(), |cwd| cwd.join(path))
    };
    let mut out = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

fn invalid(section: &str, key: &str, reason: &str) -> StockfitError {
    StockfitError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::file_config_adapter::FileConfigAdapter;

    fn make_config(content: &str) -> FileConfigAdapter {
        FileConfigAdapter::from_string(content).unwrap()
    }

    fn invalid_key(err: StockfitError) -> String {
        match err {
            StockfitError::ConfigInvalid { key, .. } => key,
            other => panic!("expected ConfigInvalid, got {other:?}"),
        }
    }

    #[test]
    fn full_config_passes() {
        let config = make_config(
            r#"
[data]
prices_dir = data/prices
listing_file = data/listings.csv
cache_dir = data/cache
cache_ttl_hours = 24
min_bars = 200

[backtest]
initial_capital = 1000000
cash_commission_rate = 0.001
cash_slippage = 0.001
margin_commission_rate = 0.0015
margin_lending_rate = 0.005
margin_slippage = 0.001
max_years = 10
target_holding_days = 14
max_holding_days = 30
trailing_stop = true
trailing_stop_long = 0.10
trailing_stop_short = 0.10
max_workers = 4

[batch]
chunk_size = 100
cpu_limit = 25
lookback_days = 60

[site]
min_score = 40

[publish]
repo_dir = .
remote = origin
"#,
        );
        assert!(validate_data_config(&config).is_ok());
        assert!(validate_backtest_config(&config).is_ok());
        assert!(validate_batch_config(&config).is_ok());
        assert!(validate_site_config(&config).is_ok());
        assert!(validate_publish_config(&config).is_ok());
    }

    #[test]
    fn defaults_pass_backtest_validation() {
        let config = make_config("[backtest]\n");
        assert!(validate_backtest_config(&config).is_ok());
    }

    #[test]
    fn missing_prices_dir_fails() {
        let config = make_config("[data]\nmin_bars = 200\n");
        let err = validate_data_config(&config).unwrap_err();
        assert!(matches!(err, StockfitError::ConfigMissing { key, .. } if key == "prices_dir"));
    }

    #[test]
    fn min_bars_zero_fails() {
        let config = make_config("[data]\nprices_dir = p\nmin_bars = 0\n");
        assert_eq!(invalid_key(validate_data_config(&config).unwrap_err()), "min_bars");
    }

    #[test]
    fn initial_capital_must_be_positive() {
        let config = make_config("[backtest]\ninitial_capital = 0\n");
        assert_eq!(
            invalid_key(validate_backtest_config(&config).unwrap_err()),
            "initial_capital"
        );
    }

    #[test]
    fn negative_rate_fails() {
        let config = make_config("[backtest]\nmargin_lending_rate = -0.01\n");
        assert_eq!(
            invalid_key(validate_backtest_config(&config).unwrap_err()),
            "margin_lending_rate"
        );
    }

    #[test]
    fn trailing_stop_out_of_range_fails() {
        let config = make_config("[backtest]\ntrailing_stop_short = 1.5\n");
        assert_eq!(
            invalid_key(validate_backtest_config(&config).unwrap_err()),
            "trailing_stop_short"
        );
    }

    #[test]
    fn max_holding_below_target_fails() {
        let config = make_config("[backtest]\ntarget_holding_days = 20\nmax_holding_days = 10\n");
        assert_eq!(
            invalid_key(validate_backtest_config(&config).unwrap_err()),
            "max_holding_days"
        );
    }

    #[test]
    fn cpu_limit_out_of_range_fails() {
        let config = make_config("[data]\nlisting_file = l.csv\n[batch]\ncpu_limit = 150\n");
        assert_eq!(invalid_key(validate_batch_config(&config).unwrap_err()), "cpu_limit");
    }

    #[test]
    fn short_lookback_fails() {
        let config = make_config("[data]\nlisting_file = l.csv\n[batch]\nlookback_days = 10\n");
        assert_eq!(invalid_key(validate_batch_config(&config).unwrap_err()), "lookback_days");
    }

    #[test]
    fn batch_needs_listing_file() {
        let config = make_config("[batch]\nchunk_size = 10\n");
        let err = validate_batch_config(&config).unwrap_err();
        assert!(matches!(err, StockfitError::ConfigMissing { key, .. } if key == "listing_file"));
    }

    #[test]
    fn min_score_above_hundred_fails() {
        let config = make_config("[site]\nmin_score = 120\n");
        assert_eq!(invalid_key(validate_site_config(&config).unwrap_err()), "min_score");
    }

    #[test]
    fn site_output_dir_cannot_hold_the_repository() {
        for output_dir in [".", "./", "..", "/", "docs/.."] {
            let config = make_config(&format!("[site]\noutput_dir = {output_dir}\n"));
            assert_eq!(
                invalid_key(validate_site_config(&config).unwrap_err()),
                "output_dir",
                "{output_dir}"
            );
        }

        let config = make_config("[site]\noutput_dir = /srv/site\n[publish]\nrepo_dir = /srv/site/repo\n");
        assert_eq!(invalid_key(validate_site_config(&config).unwrap_err()), "output_dir");
    }

    #[test]
    fn site_output_dir_inside_repository_passes() {
        let config = make_config("[site]\noutput_dir = docs\n");
        assert!(validate_site_config(&config).is_ok());

        let config = make_config("[site]\noutput_dir = /srv/repo/docs\n[publish]\nrepo_dir = /srv/repo\n");
        assert!(validate_site_config(&config).is_ok());
    }

    #[test]
    fn publish_needs_repo_dir() {
        let config = make_config("[publish]\nremote = origin\n");
        let err = validate_publish_config(&config).unwrap_err();
        assert!(matches!(err, StockfitError::ConfigMissing { key, .. } if key == "repo_dir"));
    }
}
