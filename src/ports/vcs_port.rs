//! Version control port used by the publish step.

use crate::domain::error::StockfitError;
use std::path::Path;

pub trait VcsPort {
    /// True when `path` differs from the last committed state.
    fn has_changes(&self, path: &Path) -> Result<bool, StockfitError>;
    /// Stages everything under `path` and records one revision.
    fn commit(&self, path: &Path, message: &str) -> Result<(), StockfitError>;
    /// Sends committed revisions to the remote.
    fn push(&self) -> Result<(), StockfitError>;
}
