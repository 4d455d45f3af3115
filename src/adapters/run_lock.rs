//! Lock file that keeps two scheduled runs from overlapping.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::domain::error::StockfitError;

/// Held while the lock file exists. Dropping the guard removes the file.
#[derive(Debug)]
pub struct RunLock {
    path: PathBuf,
    released: bool,
}

impl RunLock {
    /// Create the lock file, failing with [`StockfitError::AlreadyRunning`]
    /// when it already exists. The file records the owning process id.
    pub fn acquire(path: &Path) -> Result<Self, StockfitError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let mut file = match OpenOptions::new().write(true).create_new(true).open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(StockfitError::AlreadyRunning {
                    path: path.display().to_string(),
                });
            }
            Err(e) => return Err(e.into()),
        };
        writeln!(file, "{}", std::process::id())?;
        debug!(path = %path.display(), "run lock acquired");
        Ok(Self {
            path: path.to_path_buf(),
            released: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn release(mut self) {
        self.remove();
    }

    fn remove(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        match fs::remove_file(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "run lock released"),
            Err(e) => warn!(path = %self.path.display(), error = %e, "failed to remove run lock"),
        }
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        self.remove();
    }
}
