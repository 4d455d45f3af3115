//! Git implementation of the publish port, shelling out to the `git` binary.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tracing::debug;

use crate::domain::error::StockfitError;
use crate::ports::vcs_port::VcsPort;

pub struct GitPublisher {
    repo_dir: PathBuf,
    remote: String,
    branch: Option<String>,
}

impl GitPublisher {
    pub fn new(repo_dir: PathBuf, remote: String, branch: Option<String>) -> Self {
        Self {
            repo_dir,
            remote,
            branch,
        }
    }

    fn push_args(&self) -> Vec<&str> {
        let mut args = vec!["push", self.remote.as_str()];
        if let Some(branch) = &self.branch {
            args.push(branch);
        }
        args
    }

    fn git(&self, args: &[&str]) -> Result<Output, StockfitError> {
        debug!(?args, repo = %self.repo_dir.display(), "git");
        let output = Command::new("git")
            .current_dir(&self.repo_dir)
            .args(args)
            .output()
            .map_err(|e| StockfitError::Publish {
                reason: format!("failed to run git: {e}"),
            })?;
        if !output.status.success() {
            return Err(StockfitError::Publish {
                reason: format!(
                    "git {} failed: {}",
                    args.first().copied().unwrap_or_default(),
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            });
        }
        Ok(output)
    }
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

impl VcsPort for GitPublisher {
    fn has_changes(&self, path: &Path) -> Result<bool, StockfitError> {
        let path = path_arg(path);
        let output = self.git(&["status", "--porcelain", "--", &path])?;
        Ok(!String::from_utf8_lossy(&output.stdout).trim().is_empty())
    }

    fn commit(&self, path: &Path, message: &str) -> Result<(), StockfitError> {
        let path = path_arg(path);
        self.git(&["add", "-A", "--", &path])?;
        self.git(&["commit", "-m", message])?;
        Ok(())
    }

    fn push(&self) -> Result<(), StockfitError> {
        self.git(&self.push_args())?;
        Ok(())
    }
}
