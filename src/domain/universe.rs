//! The stock universe: listed stocks, the segments excluded from analysis,
//! and code lists given on the command line.

use crate::domain::error::StockfitError;
use crate::ports::data_port::DataPort;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{info, warn};

/// Market segments that are never analysed.
pub const EXCLUDED_SEGMENTS: [&str; 3] = ["ETF", "ETN", "PRO Market"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockListing {
    pub code: String,
    pub name: String,
    pub market: String,
}

impl StockListing {
    pub fn is_excluded(&self) -> bool {
        EXCLUDED_SEGMENTS.iter().any(|s| self.market.contains(s))
    }
}

/// Drop listings in excluded segments, keeping order.
pub fn filter_listings(listings: Vec<StockListing>) -> Vec<StockListing> {
    let before = listings.len();
    let kept: Vec<StockListing> = listings.into_iter().filter(|l| !l.is_excluded()).collect();
    info!(
        before,
        after = kept.len(),
        excluded = before - kept.len(),
        "filtered listings"
    );
    kept
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum UniverseError {
    #[error("empty token in code list")]
    EmptyToken,

    #[error("duplicate code: {0}")]
    DuplicateCode(String),
}

/// Parse a comma-separated code list. Codes are trimmed and upper-cased.
pub fn parse_codes(input: &str) -> Result<Vec<String>, UniverseError> {
    let mut codes = Vec::new();
    let mut seen = HashSet::new();

    for token in input.split(',') {
        let trimmed = token.trim();
        if trimmed.is_empty() {
            return Err(UniverseError::EmptyToken);
        }
        let code = trimmed.to_uppercase();
        if !seen.insert(code.clone()) {
            return Err(UniverseError::DuplicateCode(code));
        }
        codes.push(code);
    }

    Ok(codes)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    NoData,
    InsufficientBars { bars: usize },
}

#[derive(Debug, Clone)]
pub struct SkippedCode {
    pub code: String,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, Default)]
pub struct UniverseValidation {
    pub valid: Vec<String>,
    pub skipped: Vec<SkippedCode>,
}

/// Check each code has at least `min_bars` bars of history.
///
/// Fails only when no code passes.
pub fn validate_universe(
    data_port: &dyn DataPort,
    codes: Vec<String>,
    min_bars: usize,
) -> Result<UniverseValidation, StockfitError> {
    let mut result = UniverseValidation::default();

    for code in codes {
        let range = match data_port.get_data_range(&code) {
            Ok(range) => range,
            Err(e) => {
                warn!(%code, error = %e, "skipping code");
                result.skipped.push(SkippedCode {
                    code,
                    reason: SkipReason::NoData,
                });
                continue;
            }
        };

        match range {
            None => {
                warn!(%code, "skipping code: no data");
                result.skipped.push(SkippedCode {
                    code,
                    reason: SkipReason::NoData,
                });
            }
            Some((_, _, bars)) if bars < min_bars => {
                warn!(%code, bars, min_bars, "skipping code: insufficient bars");
                result.skipped.push(SkippedCode {
                    code,
                    reason: SkipReason::InsufficientBars { bars },
                });
            }
            Some(_) => result.valid.push(code),
        }
    }

    if result.valid.is_empty() {
        return Err(StockfitError::InsufficientData {
            code: "all".to_string(),
            bars: 0,
            minimum: min_bars,
        });
    }

    Ok(result)
}
