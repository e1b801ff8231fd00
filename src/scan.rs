//! Vocabulary page discovery.
//!
//! Every `*.html` file below `<templates>/vocab/`, at any depth, is a
//! vocabulary page. Pages are ordered by their path relative to `vocab/`,
//! compared component by component, and that order drives the prev/next
//! navigation of the build:
//!
//! ```text
//! templates/vocab/
//! ├── animaux/
//! │   ├── chat.html        → 1. animaux/chat.html
//! │   └── chien.html       → 2. animaux/chien.html
//! ├── couleurs.html        → 3. couleurs.html
//! └── vetements/
//!     └── manteau.html     → 4. vetements/manteau.html
//! ```

use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

/// Directory under the templates root holding vocabulary pages.
pub const VOCAB_DIR: &str = "vocab";

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("failed to walk {path}: {source}")]
    Walk {
        path: PathBuf,
        source: walkdir::Error,
    },
}

/// One discovered vocabulary page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VocabPage {
    /// Path relative to `vocab/`, `/`-separated.
    pub rel_path: String,
}

impl VocabPage {
    /// Template name relative to the templates root.
    pub fn template(&self) -> String {
        format!("{VOCAB_DIR}/{}", self.rel_path)
    }

    /// Site URL the page is served at.
    pub fn url(&self) -> String {
        format!("/{VOCAB_DIR}/{}", self.rel_path)
    }
}

/// Find vocabulary pages under `templates_root`, sorted.
///
/// Returns `Ok(None)` when there is no `vocab/` directory at all.
pub fn find_vocab_pages(templates_root: &Path) -> Result<Option<Vec<VocabPage>>, ScanError> {
    let vocab_root = templates_root.join(VOCAB_DIR);
    if !vocab_root.is_dir() {
        return Ok(None);
    }

    let mut rel_paths: Vec<PathBuf> = Vec::new();
    for entry in WalkDir::new(&vocab_root).follow_links(true) {
        let entry = entry.map_err(|source| ScanError::Walk {
            path: vocab_root.clone(),
            source,
        })?;
        if !entry.file_type().is_file() || !is_html(entry.path()) {
            continue;
        }
        if let Ok(rel) = entry.path().strip_prefix(&vocab_root) {
            rel_paths.push(rel.to_path_buf());
        }
    }
    // PathBuf ordering compares component by component
    rel_paths.sort();

    Ok(Some(
        rel_paths
            .iter()
            .map(|rel| VocabPage {
                rel_path: to_url_path(rel),
            })
            .collect(),
    ))
}

fn is_html(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("html"))
}

fn to_url_path(rel: &Path) -> String {
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
