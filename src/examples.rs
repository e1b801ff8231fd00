//! Example sentence cache.
//!
//! Each vocabulary expression keeps a small, fixed number of example
//! sentences (French with an English translation). Stored sentences are
//! served as they are; missing ones are generated on demand and persisted:
//!
//! ```text
//! get_examples("le manteau", 3)
//!   stored: 2 ──► generate ──► reject empty / already-seen French ──► insert
//!   stored: 3 ──► returned unchanged, generator never called
//! ```
//!
//! Every missing slot gets a bounded number of attempts. When a slot runs out
//! of attempts the expression is abandoned for this run with a warning; the
//! caller still receives whatever is stored. Generation failures never
//! surface as errors.
//!
//! Related batch operations live here too: reading expressions from a
//! vocabulary CSV, removing duplicate sentences and exporting plain-text
//! caches.

use crate::client::ExampleGenerator;
use crate::naming;
use crate::store::{Database, ExampleRecord, StoreError};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

/// How a fill request ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillStatus {
    /// Enough sentences were already stored.
    AlreadyComplete,
    /// Every missing slot was generated.
    Filled,
    /// A slot ran out of attempts; the expression was left short.
    Abandoned,
    /// The store failed; records are whatever was read before the failure.
    StoreFailed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FillOutcome {
    pub expression: String,
    pub status: FillStatus,
    /// Sentences stored before this request.
    pub existing: usize,
    /// Sentences inserted by this request.
    pub generated: usize,
    pub records: Vec<ExampleRecord>,
}

pub struct ExampleCache<'a> {
    db: &'a Database,
    generator: &'a dyn ExampleGenerator,
    max_attempts: u32,
}

impl<'a> ExampleCache<'a> {
    pub fn new(db: &'a Database, generator: &'a dyn ExampleGenerator, max_attempts: u32) -> Self {
        Self {
            db,
            generator,
            max_attempts: max_attempts.max(1),
        }
    }

    /// Up to `n` examples for `expression`, generating what is missing.
    ///
    /// Stored records come first in id order and are never reordered. More
    /// than `n` stored records are returned unchanged.
    pub fn get_examples(&self, expression: &str, n: usize) -> Vec<ExampleRecord> {
        self.fill(expression, n).records
    }

    /// [`Self::get_examples`] with a report of what happened.
    pub fn fill(&self, expression: &str, n: usize) -> FillOutcome {
        let mut records = match self.db.examples_for(expression) {
            Ok(records) => records,
            Err(e) => {
                error!(expression, error = %e, "failed to read stored examples");
                return FillOutcome {
                    expression: expression.to_string(),
                    status: FillStatus::StoreFailed,
                    existing: 0,
                    generated: 0,
                    records: Vec::new(),
                };
            }
        };

        let existing = records.len();
        let mut outcome = |status: FillStatus, records: Vec<ExampleRecord>| FillOutcome {
            expression: expression.to_string(),
            status,
            existing,
            generated: records.len() - existing,
            records,
        };

        if existing >= n {
            info!(expression, count = existing, "examples already complete");
            return outcome(FillStatus::AlreadyComplete, records);
        }

        info!(expression, needed = n - existing, "generating examples");
        let mut seen: HashSet<String> = records.iter().map(|r| r.french.trim().to_string()).collect();

        while records.len() < n {
            match self.fill_slot(expression, &mut seen) {
                Ok(Some(record)) => records.push(record),
                Ok(None) => {
                    warn!(
                        expression,
                        attempts = self.max_attempts,
                        have = records.len(),
                        "could not generate a unique example, moving on"
                    );
                    return outcome(FillStatus::Abandoned, records);
                }
                Err(e) => {
                    error!(expression, error = %e, "failed to store example");
                    return outcome(FillStatus::StoreFailed, records);
                }
            }
        }
        outcome(FillStatus::Filled, records)
    }

    /// Try to produce and store one new sentence. `Ok(None)` when every
    /// attempt was rejected.
    fn fill_slot(
        &self,
        expression: &str,
        seen: &mut HashSet<String>,
    ) -> Result<Option<ExampleRecord>, StoreError> {
        for attempt in 1..=self.max_attempts {
            let pair = match self.generator.generate_example(expression) {
                Ok(pair) => pair,
                Err(e) => {
                    warn!(expression, attempt, error = %e, "generation failed");
                    continue;
                }
            };

            let french = pair.french.trim();
            let english = pair.english.trim();
            if french.is_empty() || english.is_empty() {
                warn!(expression, attempt, "empty sentence in generated example");
                continue;
            }
            if seen.contains(french) {
                info!(expression, attempt, french, "duplicate example, retrying");
                continue;
            }

            match self.db.insert_example_if_new(expression, french, english)? {
                Some(id) => {
                    seen.insert(french.to_string());
                    info!(expression, id, french, english, "stored example");
                    return Ok(Some(ExampleRecord {
                        id,
                        expression: expression.to_string(),
                        french: french.to_string(),
                        english: english.to_string(),
                    }));
                }
                None => {
                    // Stored by another writer since we read
                    seen.insert(french.to_string());
                    info!(expression, attempt, french, "example already stored, retrying");
                }
            }
        }
        Ok(None)
    }
}

/// Fill every expression of `expressions` up to `n` examples.
pub fn populate(cache: &ExampleCache<'_>, expressions: &[String], n: usize) -> Vec<FillOutcome> {
    expressions
        .iter()
        .map(|expression| cache.fill(expression, n))
        .collect()
}

// ============================================================================
// Vocabulary CSV
// ============================================================================

/// French expressions from a vocabulary CSV (`english,french,...`).
///
/// Takes the second column of every row. Blank rows, rows with fewer than
/// two fields and blank French cells are skipped, as is a first row where
/// any cell mentions "french" (a header).
pub fn read_expressions(csv_path: &Path) -> std::io::Result<Vec<String>> {
    let content = fs::read_to_string(csv_path)?;
    Ok(expressions_from_csv(&content))
}

pub fn expressions_from_csv(content: &str) -> Vec<String> {
    vocab_rows_from_csv(content)
        .into_iter()
        .map(|row| row.french)
        .collect()
}

/// One usable line of a vocabulary CSV.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VocabRow {
    pub english: String,
    pub french: String,
}

/// Rows of a vocabulary CSV (`English,French,...`) with a non-blank French
/// cell. A first row naming a "french" column is a header and is skipped.
pub fn vocab_rows_from_csv(content: &str) -> Vec<VocabRow> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    let mut rows = Vec::new();
    for (i, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let fields = split_csv_line(line);
        if i == 0 && fields.iter().any(|f| f.to_lowercase().contains("french")) {
            continue;
        }
        let Some(french) = fields.get(1).map(|f| f.trim()) else {
            continue;
        };
        if !french.is_empty() {
            rows.push(VocabRow {
                english: fields[0].trim().to_string(),
                french: french.to_string(),
            });
        }
    }
    rows
}

/// [`vocab_rows_from_csv`] over a file.
pub fn read_vocab_rows(csv_path: &Path) -> std::io::Result<Vec<VocabRow>> {
    let content = fs::read_to_string(csv_path)?;
    Ok(vocab_rows_from_csv(&content))
}

/// Split one CSV record on commas, honouring double-quoted fields and `""`
/// escapes. Quoted fields spanning lines are not supported.
fn split_csv_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();
    while let Some(c) = chars.next() {
        match (c, in_quotes) {
            ('"', true) if chars.peek() == Some(&'"') => {
                field.push('"');
                chars.next();
            }
            ('"', true) => in_quotes = false,
            ('"', false) if field.trim().is_empty() => {
                field.clear();
                in_quotes = true;
            }
            (',', false) => fields.push(std::mem::take(&mut field)),
            (c, _) => field.push(c),
        }
    }
    fields.push(field);
    fields
}

// ============================================================================
// Dedupe
// ============================================================================

/// Rows of one expression sharing an identical French sentence.
#[derive(Debug, Clone, PartialEq)]
pub struct DuplicateGroup {
    pub expression: String,
    pub french: String,
    pub keep_id: i64,
    pub delete_ids: Vec<i64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DedupeReport {
    pub trial_run: bool,
    pub groups: Vec<DuplicateGroup>,
    /// Rows deleted, or that would be deleted on a trial run.
    pub deleted: usize,
}

/// Group identical French sentences per expression. The lowest id of each
/// group is kept.
pub fn find_duplicates(db: &Database) -> Result<Vec<DuplicateGroup>, StoreError> {
    let mut groups: BTreeMap<(String, String), Vec<i64>> = BTreeMap::new();
    for record in db.all_examples()? {
        groups
            .entry((record.expression, record.french))
            .or_default()
            .push(record.id);
    }

    Ok(groups
        .into_iter()
        .filter(|(_, ids)| ids.len() > 1)
        .map(|((expression, french), mut ids)| {
            ids.sort_unstable();
            let keep_id = ids.remove(0);
            DuplicateGroup {
                expression,
                french,
                keep_id,
                delete_ids: ids,
            }
        })
        .collect())
}

/// Remove duplicate sentences, or only report them when `trial_run`.
pub fn dedupe(db: &Database, trial_run: bool) -> Result<DedupeReport, StoreError> {
    let groups = find_duplicates(db)?;
    let ids: Vec<i64> = groups
        .iter()
        .flat_map(|g| g.delete_ids.iter().copied())
        .collect();

    let deleted = if trial_run {
        ids.len()
    } else {
        let deleted = db.delete_examples(&ids)?;
        info!(deleted, groups = groups.len(), "removed duplicate examples");
        deleted
    };

    Ok(DedupeReport {
        trial_run,
        groups,
        deleted,
    })
}

// ============================================================================
// Text caches
// ============================================================================

/// Write `<slug>.txt` per expression into `dir`, one French sentence per
/// line in id order. Returns the files written.
///
/// Expressions are visited in sorted order. When two expressions slugify to
/// the same file name the first one keeps it and the later one is skipped
/// with a warning.
pub fn export_text_caches(db: &Database, dir: &Path) -> Result<Vec<PathBuf>, ExportError> {
    fs::create_dir_all(dir)?;

    let mut by_expression: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for record in db.all_examples()? {
        by_expression
            .entry(record.expression)
            .or_default()
            .push(record.french);
    }

    let mut written = Vec::with_capacity(by_expression.len());
    let mut used: BTreeMap<String, String> = BTreeMap::new();
    for (expression, sentences) in by_expression {
        let filename = naming::output_filename(&expression, "txt");
        if let Some(owner) = used.get(&filename) {
            warn!(expression, file = %filename, owner = %owner, "file name already exported, skipping");
            continue;
        }
        let path = dir.join(&filename);
        used.insert(filename, expression.clone());
        let mut content = sentences.join("\n");
        content.push('\n');
        fs::write(&path, content)?;
        info!(expression, path = %path.display(), "exported examples");
        written.push(path);
    }
    Ok(written)
}

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Store(#[from] StoreError),
}
