//! File-backed result store.
//!
//! Layout under the results directory:
//!
//! ```text
//! details/{code}.json        one pretty-printed record per stock
//! rankings/{key}.jsonl       one ranking entry per line, best first
//! approaching/{key}.jsonl    one approaching entry per line, best first
//! metadata.json
//! progress.json              present only while a batch is unfinished
//! ```

use crate::adapters::price_cache::cache_key;
use crate::domain::error::StockfitError;
use crate::domain::results::{ApproachingEntry, BatchMetadata, Progress, RankingEntry, StockDetail};
use crate::ports::result_store_port::ResultStorePort;
use chrono::Local;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fs;
use std::io::{BufRead, BufReader, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

const DETAILS_DIR: &str = "details";
const RANKINGS_DIR: &str = "rankings";
const APPROACHING_DIR: &str = "approaching";
const METADATA_FILE: &str = "metadata.json";
const PROGRESS_FILE: &str = "progress.json";

pub struct JsonResultStore {
    root: PathBuf,
}

impl JsonResultStore {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn detail_path(&self, code: &str) -> PathBuf {
        self.root
            .join(DETAILS_DIR)
            .join(format!("{}.json", cache_key(code)))
    }

    fn lines_path(&self, dir: &str, key: &str) -> PathBuf {
        self.root.join(dir).join(format!("{key}.jsonl"))
    }
}

fn store_error(path: &Path, e: impl std::fmt::Display) -> StockfitError {
    StockfitError::ResultStore {
        reason: format!("{}: {e}", path.display()),
    }
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), StockfitError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json)?;
    Ok(())
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, StockfitError> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    serde_json::from_str(&content)
        .map(Some)
        .map_err(|e| store_error(path, e))
}

fn write_lines<T: Serialize>(path: &Path, entries: &[T]) -> Result<(), StockfitError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut out = BufWriter::new(fs::File::create(path)?);
    for entry in entries {
        serde_json::to_writer(&mut out, entry)?;
        out.write_all(b"\n")?;
    }
    out.flush()?;
    Ok(())
}

fn read_lines<T: DeserializeOwned>(
    path: &Path,
    limit: Option<usize>,
    offset: usize,
) -> Result<Vec<T>, StockfitError> {
    let file = match fs::File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut entries = Vec::new();
    let lines = BufReader::new(file)
        .lines()
        .filter(|l| !l.as_ref().is_ok_and(|l| l.trim().is_empty()))
        .skip(offset)
        .take(limit.unwrap_or(usize::MAX));
    for line in lines {
        let line = line?;
        entries.push(serde_json::from_str(&line).map_err(|e| store_error(path, e))?);
    }
    Ok(entries)
}

/// Sorted file stems in `dir` with extension `ext`.
fn stems(dir: &Path, ext: &str) -> Result<Vec<String>, StockfitError> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };
    let mut names = Vec::new();
    for entry in entries {
        let path = entry?.path();
        if path.extension().is_some_and(|e| e == ext) {
            if let Some(stem) = path.file_stem() {
                names.push(stem.to_string_lossy().into_owned());
            }
        }
    }
    names.sort();
    Ok(names)
}

impl ResultStorePort for JsonResultStore {
    fn save_detail(&self, detail: &StockDetail) -> Result<(), StockfitError> {
        let mut detail = detail.clone();
        detail.updated = Some(Local::now().naive_local());
        write_json(&self.detail_path(&detail.code), &detail)
    }

    fn load_detail(&self, code: &str) -> Result<Option<StockDetail>, StockfitError> {
        read_json(&self.detail_path(code))
    }

    fn detail_codes(&self) -> Result<Vec<String>, StockfitError> {
        stems(&self.root.join(DETAILS_DIR), "json")
    }

    fn save_ranking(
        &self,
        strategy_key: &str,
        entries: &[RankingEntry],
    ) -> Result<(), StockfitError> {
        write_lines(&self.lines_path(RANKINGS_DIR, strategy_key), entries)
    }

    fn load_ranking(
        &self,
        strategy_key: &str,
        limit: Option<usize>,
        offset: usize,
    ) -> Result<Vec<RankingEntry>, StockfitError> {
        read_lines(&self.lines_path(RANKINGS_DIR, strategy_key), limit, offset)
    }

    fn ranking_strategies(&self) -> Result<Vec<String>, StockfitError> {
        stems(&self.root.join(RANKINGS_DIR), "jsonl")
    }

    fn save_approaching(
        &self,
        strategy_key: &str,
        entries: &[ApproachingEntry],
    ) -> Result<(), StockfitError> {
        write_lines(&self.lines_path(APPROACHING_DIR, strategy_key), entries)
    }

    fn load_approaching(
        &self,
        strategy_key: &str,
        limit: Option<usize>,
        offset: usize,
    ) -> Result<Vec<ApproachingEntry>, StockfitError> {
        read_lines(&self.lines_path(APPROACHING_DIR, strategy_key), limit, offset)
    }

    fn approaching_strategies(&self) -> Result<Vec<String>, StockfitError> {
        stems(&self.root.join(APPROACHING_DIR), "jsonl")
    }

    fn metadata(&self) -> Result<Option<BatchMetadata>, StockfitError> {
        read_json(&self.root.join(METADATA_FILE))
    }

    fn update_metadata(&self, mut metadata: BatchMetadata) -> Result<BatchMetadata, StockfitError> {
        metadata.last_updated = Some(Local::now().naive_local());
        metadata.version = env!("CARGO_PKG_VERSION").to_string();
        write_json(&self.root.join(METADATA_FILE), &metadata)?;
        debug!(root = %self.root.display(), "metadata updated");
        Ok(metadata)
    }

    fn save_progress(&self, progress: &Progress) -> Result<(), StockfitError> {
        let mut progress = progress.clone();
        progress.timestamp = Some(Local::now().naive_local());
        write_json(&self.root.join(PROGRESS_FILE), &progress)
    }

    fn load_progress(&self) -> Result<Option<Progress>, StockfitError> {
        read_json(&self.root.join(PROGRESS_FILE))
    }

    fn clear_progress(&self) -> Result<(), StockfitError> {
        match fs::remove_file(self.root.join(PROGRESS_FILE)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
