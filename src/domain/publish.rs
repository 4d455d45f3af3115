//! Publish step: commit the generated site and push it, only when it changed.

use std::path::Path;

use chrono::NaiveDate;
use tracing::{error, info};

use super::error::StockfitError;
use crate::ports::vcs_port::VcsPort;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishOutcome {
    /// Nothing differs from the last published state; no revision was made.
    NoChanges,
    /// One revision was committed with `message` and pushed.
    Published { message: String },
}

pub fn commit_message(today: NaiveDate) -> String {
    format!("Update results: {}", today.format("%Y-%m-%d"))
}

/// Commit everything under `path` as one revision labelled with `today`
/// and push it. Failures are logged before they are returned.
pub fn publish(
    vcs: &dyn VcsPort,
    path: &Path,
    today: NaiveDate,
) -> Result<PublishOutcome, StockfitError> {
    let changed = vcs.has_changes(path).inspect_err(|e| {
        error!(path = %path.display(), error = %e, "publish: status check failed");
    })?;
    if !changed {
        info!(path = %path.display(), "publish: no changes");
        return Ok(PublishOutcome::NoChanges);
    }

    let message = commit_message(today);
    vcs.commit(path, &message).inspect_err(|e| {
        error!(error = %e, "publish: commit failed");
    })?;
    vcs.push().inspect_err(|e| {
        error!(error = %e, "publish: push failed");
    })?;

    info!(%message, "published");
    Ok(PublishOutcome::Published { message })
}
