//! Static page generation port trait.

use crate::domain::error::StockfitError;
use crate::ports::result_store_port::ResultStorePort;

/// Pages written by one generation run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SiteSummary {
    pub strategy_pages: usize,
    pub approaching_pages: usize,
}

/// Port for rendering stored batch results into a publishable site.
pub trait SitePort {
    fn generate(&self, store: &dyn ResultStorePort) -> Result<SiteSummary, StockfitError>;
}
