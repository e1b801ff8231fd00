//! Hint index: one record per hint page.
//!
//! `frflashy hints` scans the hint fragments, extracts a title and a summary
//! from each (see [`crate::metadata`]) and writes the index as JSON. The site
//! build reads the same file back to decide which hint pages to render.
//!
//! ```json
//! [
//!   { "file": "a.html", "title": "Greetings", "summary": "Hello there." },
//!   { "file": "b.html", "title": "Numbers", "summary": "" }
//! ]
//! ```
//!
//! The index is ordered by file name and written pretty-printed, with
//! non-ASCII text kept as-is.

use crate::metadata::PageText;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Generated listing page written next to the hint pages. Never indexed.
pub const LISTING_FILE: &str = "index.html";

#[derive(Error, Debug)]
pub enum HintError {
    #[error("hints directory not found: {0}")]
    MissingDirectory(PathBuf),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid hint index {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Metadata for one hint page. `file` is unique within an index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HintRecord {
    pub file: String,
    pub title: String,
    #[serde(alias = "description", default)]
    pub summary: String,
}

/// Extract a record for every `*.html` file directly inside `dir`.
///
/// Files are visited in file-name order. A file that cannot be read as UTF-8
/// is skipped with a warning. An empty directory yields an empty index.
pub fn build_index(dir: &Path) -> Result<Vec<HintRecord>, HintError> {
    if !dir.is_dir() {
        return Err(HintError::MissingDirectory(dir.to_path_buf()));
    }

    let mut files: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && is_hint_fragment(path))
        .collect();
    files.sort();

    let mut records = Vec::with_capacity(files.len());
    for path in &files {
        match fs::read_to_string(path) {
            Ok(html) => records.push(extract_record(path, &html)),
            Err(e) => warn!(file = %path.display(), error = %e, "skipping unreadable hint"),
        }
    }

    if records.is_empty() {
        warn!(dir = %dir.display(), "no hint pages found");
    }
    Ok(records)
}

fn is_hint_fragment(path: &Path) -> bool {
    let is_html = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("html"));
    let is_listing = path.file_name().and_then(|n| n.to_str()) == Some(LISTING_FILE);
    is_html && !is_listing
}

/// Build one record from an already-read hint page.
pub fn extract_record(path: &Path, html: &str) -> HintRecord {
    let file = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    let text = PageText::parse(html);
    let record = HintRecord {
        title: text.resolved_title(&stem),
        summary: text.resolved_summary(),
        file,
    };
    debug!(file = %record.file, title = %record.title, "extracted hint");
    record
}

/// Write the index as pretty JSON, creating parent directories.
pub fn write_index(records: &[HintRecord], path: &Path) -> Result<(), HintError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(records).map_err(|source| HintError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    fs::write(path, json + "\n")?;
    info!(path = %path.display(), count = records.len(), "wrote hint index");
    Ok(())
}

/// Read an index back. `Ok(None)` when the file does not exist.
pub fn load_index(path: &Path) -> Result<Option<Vec<HintRecord>>, HintError> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    serde_json::from_str(&content)
        .map(Some)
        .map_err(|source| HintError::Json {
            path: path.to_path_buf(),
            source,
        })
}
