//! Batch result persistence port trait.

use crate::domain::error::StockfitError;
use crate::domain::results::{ApproachingEntry, BatchMetadata, Progress, RankingEntry, StockDetail};

pub trait ResultStorePort {
    /// Stamps `updated` and writes the detail record for `detail.code`.
    fn save_detail(&self, detail: &StockDetail) -> Result<(), StockfitError>;
    fn load_detail(&self, code: &str) -> Result<Option<StockDetail>, StockfitError>;
    /// Codes with a stored detail record, sorted.
    fn detail_codes(&self) -> Result<Vec<String>, StockfitError>;

    /// Replaces the ranking of `strategy_key`. Entries are written in order.
    fn save_ranking(&self, strategy_key: &str, entries: &[RankingEntry])
    -> Result<(), StockfitError>;
    fn load_ranking(
        &self,
        strategy_key: &str,
        limit: Option<usize>,
        offset: usize,
    ) -> Result<Vec<RankingEntry>, StockfitError>;
    /// Strategy keys with a stored ranking, sorted.
    fn ranking_strategies(&self) -> Result<Vec<String>, StockfitError>;

    fn save_approaching(
        &self,
        strategy_key: &str,
        entries: &[ApproachingEntry],
    ) -> Result<(), StockfitError>;
    fn load_approaching(
        &self,
        strategy_key: &str,
        limit: Option<usize>,
        offset: usize,
    ) -> Result<Vec<ApproachingEntry>, StockfitError>;
    fn approaching_strategies(&self) -> Result<Vec<String>, StockfitError>;

    fn metadata(&self) -> Result<Option<BatchMetadata>, StockfitError>;
    /// Stamps `last_updated` and `version`, then replaces the stored metadata.
    fn update_metadata(&self, metadata: BatchMetadata) -> Result<BatchMetadata, StockfitError>;

    fn save_progress(&self, progress: &Progress) -> Result<(), StockfitError>;
    fn load_progress(&self) -> Result<Option<Progress>, StockfitError>;
    fn clear_progress(&self) -> Result<(), StockfitError>;
}
