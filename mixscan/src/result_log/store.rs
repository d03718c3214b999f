//! File access for result logs
//!
//! Every pass works on an in-memory [`ResultLog`] obtained from
//! [`LogStore::load`] and hands the result back through
//! [`LogStore::commit`]. A store assumes a single writer; there is no file
//! locking.

use super::format::{analyze_text_for_rescan, parse, render};
use super::{RescanPlan, ResultLog, Segment};
use crate::error::{MixscanError, MixscanResult};
use mixscan_common::Timestamp;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Load/commit access to one result log
pub trait LogStore: Send + Sync {
    /// Whether a committed log exists
    fn exists(&self) -> bool;

    fn load(&self) -> MixscanResult<ResultLog>;

    /// Replace the stored log with `log` in full
    fn commit(&self, log: &ResultLog) -> MixscanResult<()>;
}

/// Result log stored as a text file
#[derive(Debug, Clone)]
pub struct FileLogStore {
    path: PathBuf,
}

impl FileLogStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl LogStore for FileLogStore {
    fn exists(&self) -> bool {
        self.path.is_file()
    }

    fn load(&self) -> MixscanResult<ResultLog> {
        read(&self.path)
    }

    fn commit(&self, log: &ResultLog) -> MixscanResult<()> {
        write_atomic(&self.path, &render(log))?;
        debug!(path = %self.path.display(), segments = log.len(), "Result log committed");
        Ok(())
    }
}

/// Read a result log; a missing file is an error, malformed lines are not
pub fn read(path: &Path) -> MixscanResult<ResultLog> {
    Ok(parse(&read_text(path)?))
}

/// Regenerate the whole file from `header` and `segments`
pub fn write(
    path: &Path,
    header: &str,
    segments: &BTreeMap<Timestamp, Segment>,
) -> MixscanResult<()> {
    let log = ResultLog::from_segments(header, segments.clone());
    write_atomic(path, &render(&log))
}

/// TIMEOUT/ERROR segment numbers found in the file's scan log section
pub fn analyze_for_rescan(path: &Path, segment_length: u32) -> MixscanResult<RescanPlan> {
    Ok(analyze_text_for_rescan(&read_text(path)?, segment_length))
}

fn read_text(path: &Path) -> MixscanResult<String> {
    if !path.is_file() {
        return Err(MixscanError::ResultFileMissing(path.to_path_buf()));
    }
    Ok(std::fs::read_to_string(path)?)
}

fn write_atomic(path: &Path, content: &str) -> MixscanResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let mut tmp_name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);

    std::fs::write(&tmp_path, content)?;
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}
