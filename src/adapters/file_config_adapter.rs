//! INI file configuration adapter.
//!
//! Sections read by stockfit: `[data]`, `[backtest]`, `[batch]`, `[site]`,
//! `[publish]` and `[schedule]`. Typed getters fall back to the caller's
//! default when a key is missing or does not parse.

use crate::domain::error::StockfitError;
use crate::ports::config_port::ConfigPort;
use configparser::ini::Ini;
use std::path::Path;

#[derive(Debug)]
pub struct FileConfigAdapter {
    config: Ini,
}

impl FileConfigAdapter {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, StockfitError> {
        let path = path.as_ref();
        let mut config = Ini::new();
        config
            .load(path)
            .map_err(|reason| StockfitError::ConfigParse {
                file: path.display().to_string(),
                reason,
            })?;
        Ok(Self { config })
    }

    pub fn from_string(content: &str) -> Result<Self, StockfitError> {
        let mut config = Ini::new();
        config
            .read(content.to_string())
            .map_err(|reason| StockfitError::ConfigParse {
                file: "<string>".into(),
                reason,
            })?;
        Ok(Self { config })
    }

    fn parse_bool(value: &str) -> Option<bool> {
        match value.trim().to_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => Some(true),
            "false" | "no" | "off" | "0" => Some(false),
            _ => None,
        }
    }
}

impl ConfigPort for FileConfigAdapter {
    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        self.config.get(section, key).filter(|v| !v.trim().is_empty())
    }

    fn get_int(&self, section: &str, key: &str, default: i64) -> i64 {
        self.config
            .getint(section, key)
            .ok()
            .flatten()
            .unwrap_or(default)
    }

    fn get_double(&self, section: &str, key: &str, default: f64) -> f64 {
        self.config
            .getfloat(section, key)
            .ok()
            .flatten()
            .unwrap_or(default)
    }

    fn get_bool(&self, section: &str, key: &str, default: bool) -> bool {
        self.config
            .get(section, key)
            .as_deref()
            .and_then(Self::parse_bool)
            .unwrap_or(default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const SAMPLE: &str = r#"
[data]
prices_dir = data/prices
cache_ttl_hours = 12

[backtest]
initial_capital = 1000000
cash_commission_rate = 0.001
trailing_stop = off

[batch]
listing_file = data/listings.csv
cpu_limit = 25

[publish]
repo_dir = .
remote =
"#;

    #[test]
    fn reads_each_section() {
        let adapter = FileConfigAdapter::from_string(SAMPLE).unwrap();
        assert_eq!(
            adapter.get_string("data", "prices_dir"),
            Some("data/prices".to_string())
        );
        assert_eq!(adapter.get_int("data", "cache_ttl_hours", 24), 12);
        assert_eq!(
            adapter.get_double("backtest", "cash_commission_rate", 0.0),
            0.001
        );
        assert!(!adapter.get_bool("backtest", "trailing_stop", true));
        assert_eq!(adapter.get_int("batch", "cpu_limit", 100), 25);
    }

    #[test]
    fn empty_value_reads_as_missing() {
        let adapter = FileConfigAdapter::from_string(SAMPLE).unwrap();
        assert_eq!(adapter.get_string("publish", "remote"), None);
        assert_eq!(adapter.get_string_or("publish", "remote", "origin"), "origin");
        assert_eq!(adapter.get_string("publish", "branch"), None);
        assert_eq!(adapter.get_string("schedule", "lock_file"), None);
    }

    #[test]
    fn unparsable_numbers_use_default() {
        let adapter =
            FileConfigAdapter::from_string("[batch]\nchunk_size = many\nmin_score = high\n").unwrap();
        assert_eq!(adapter.get_int("batch", "chunk_size", 100), 100);
        assert_eq!(adapter.get_double("batch", "min_score", 40.0), 40.0);
    }

    #[test]
    fn bool_spellings() {
        let adapter = FileConfigAdapter::from_string(
            "[backtest]\na = yes\nb = ON\nc = 0\nd = maybe\n",
        )
        .unwrap();
        assert!(adapter.get_bool("backtest", "a", false));
        assert!(adapter.get_bool("backtest", "b", false));
        assert!(!adapter.get_bool("backtest", "c", true));
        assert!(adapter.get_bool("backtest", "d", true));
    }

    #[test]
    fn from_file_reads_config() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "[site]\noutput_dir = public\nmin_score = 55\n").unwrap();

        let adapter = FileConfigAdapter::from_file(file.path()).unwrap();
        assert_eq!(
            adapter.get_string("site", "output_dir"),
            Some("public".to_string())
        );
        assert_eq!(adapter.get_double("site", "min_score", 40.0), 55.0);
    }

    #[test]
    fn missing_file_is_parse_error() {
        let err = FileConfigAdapter::from_file("/nonexistent/stockfit.ini").unwrap_err();
        assert!(
            matches!(err, StockfitError::ConfigParse { file, .. } if file.contains("stockfit.ini"))
        );
    }
}
