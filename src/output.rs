//! CLI output formatting for every command.
//!
//! # Report Shape
//!
//! Output is a plain inventory: one header line per phase or entity, with
//! detail lines indented underneath. Failures are listed where they happened
//! rather than collected at the end, and every report closes with a one-line
//! summary.
//!
//! ## Build
//!
//! ```text
//! Hints (2 in index)
//!     hints/a.html
//!     hints/b.html
//!     hints/index.html
//! Pages
//!     about.html
//!     index.html: FAILED template not found: index.html
//! Vocab
//!     001 vocab/animaux/chat.html
//!     002 vocab/couleurs.html
//!
//! Wrote 6 pages, 1 failed
//! ```
//!
//! ## Examples
//!
//! ```text
//! le manteau: 2 stored, 1 generated
//! la chemise: complete (3)
//! le chapeau: abandoned after 1 generated (1 of 3)
//!
//! 3 expressions, 2 examples generated, 1 abandoned
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format functions
//! are pure: no I/O, no side effects.

use crate::examples::{DedupeReport, FillOutcome, FillStatus};
use crate::generate::{BuildReport, IndexStatus, PageOutcome, Phase};
use crate::hints::HintRecord;
use crate::imaging::{GeneratedImage, ShrinkOutcome};
use crate::media::{MediaOutcome, MediaStatus};
use crate::speech::SpeechOutput;
use crate::store::UserRecord;
use std::path::{Path, PathBuf};

// ============================================================================
// Shared helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// Truncate text to `max` characters, appending `...` if truncated.
fn truncate(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((end, _)) => format!("{}...", &text[..end]),
        None => text.to_string(),
    }
}

fn plural(n: usize, one: &str, many: &str) -> String {
    format!("{n} {}", if n == 1 { one } else { many })
}

fn kb(bytes: u64) -> String {
    format!("{:.1} KB", bytes as f64 / 1024.0)
}

fn page_line(page: &PageOutcome) -> String {
    match &page.error {
        None => page.output.clone(),
        Some(error) => format!("{}: FAILED {}", page.output, error),
    }
}

// ============================================================================
// Build
// ============================================================================

pub fn format_build_report(report: &BuildReport) -> Vec<String> {
    let mut lines = Vec::new();

    match &report.hint_index {
        IndexStatus::Loaded(n) => lines.push(format!("Hints ({n} in index)")),
        IndexStatus::Missing => lines.push("Hints (no index, skipped)".to_string()),
        IndexStatus::Invalid(e) => lines.push(format!("Hints (invalid index, skipped: {e})")),
    }
    for page in report
        .pages
        .iter()
        .filter(|p| matches!(p.phase, Phase::Hints | Phase::Listing))
    {
        lines.push(format!("{}{}", indent(1), page_line(page)));
    }

    lines.push("Pages".to_string());
    for page in report.pages.iter().filter(|p| p.phase == Phase::Static) {
        lines.push(format!("{}{}", indent(1), page_line(page)));
    }

    if report.vocab_found {
        lines.push("Vocab".to_string());
        for (i, page) in report
            .pages
            .iter()
            .filter(|p| p.phase == Phase::Vocab)
            .enumerate()
        {
            lines.push(format!("{}{} {}", indent(1), format_index(i + 1), page_line(page)));
        }
    } else {
        lines.push("Vocab (no vocab directory)".to_string());
    }

    lines.push(String::new());
    lines.push(format!(
        "Wrote {}, {} failed",
        plural(report.written(), "page", "pages"),
        report.failed()
    ));
    lines
}

pub fn print_build_report(report: &BuildReport) {
    for line in format_build_report(report) {
        println!("{line}");
    }
}

// ============================================================================
// Hint index
// ============================================================================

pub fn format_hint_index(records: &[HintRecord], index_path: &Path) -> Vec<String> {
    let mut lines = Vec::new();
    for (i, record) in records.iter().enumerate() {
        lines.push(format!("{} {}", format_index(i + 1), record.title));
        lines.push(format!("{}Source: {}", indent(1), record.file));
        if !record.summary.is_empty() {
            lines.push(format!("{}Summary: {}", indent(1), truncate(&record.summary, 60)));
        }
    }
    lines.push(String::new());
    lines.push(format!(
        "Indexed {} → {}",
        plural(records.len(), "hint", "hints"),
        index_path.display()
    ));
    lines
}

pub fn print_hint_index(records: &[HintRecord], index_path: &Path) {
    for line in format_hint_index(records, index_path) {
        println!("{line}");
    }
}

// ============================================================================
// Examples
// ============================================================================

pub fn format_fill_outcomes(outcomes: &[FillOutcome], n: usize) -> Vec<String> {
    let mut lines = Vec::new();
    for outcome in outcomes {
        let line = match outcome.status {
            FillStatus::AlreadyComplete => format!("complete ({})", outcome.existing),
            FillStatus::Filled => format!(
                "{} stored, {} generated",
                outcome.existing, outcome.generated
            ),
            FillStatus::Abandoned => format!(
                "abandoned after {} generated ({} of {n})",
                outcome.generated,
                outcome.records.len()
            ),
            FillStatus::StoreFailed => "store error, skipped".to_string(),
        };
        lines.push(format!("{}: {line}", outcome.expression));
    }

    let generated: usize = outcomes.iter().map(|o| o.generated).sum();
    let abandoned = outcomes
        .iter()
        .filter(|o| matches!(o.status, FillStatus::Abandoned | FillStatus::StoreFailed))
        .count();
    lines.push(String::new());
    lines.push(format!(
        "{}, {} generated, {abandoned} abandoned",
        plural(outcomes.len(), "expression", "expressions"),
        plural(generated, "example", "examples"),
    ));
    lines
}

pub fn print_fill_outcomes(outcomes: &[FillOutcome], n: usize) {
    for line in format_fill_outcomes(outcomes, n) {
        println!("{line}");
    }
}

pub fn format_dedupe_report(report: &DedupeReport) -> Vec<String> {
    let mut lines = Vec::new();
    if report.groups.is_empty() {
        lines.push("No duplicate examples.".to_string());
        return lines;
    }

    for group in &report.groups {
        lines.push(format!("{}: {}", group.expression, truncate(&group.french, 60)));
        lines.push(format!("{}keep {}", indent(1), group.keep_id));
        let ids: Vec<String> = group.delete_ids.iter().map(|id| id.to_string()).collect();
        lines.push(format!("{}delete {}", indent(1), ids.join(", ")));
    }

    lines.push(String::new());
    let rows = plural(report.deleted, "row", "rows");
    if report.trial_run {
        lines.push(format!("Trial run: would delete {rows}"));
    } else {
        lines.push(format!("Deleted {rows}"));
    }
    lines
}

pub fn print_dedupe_report(report: &DedupeReport) {
    for line in format_dedupe_report(report) {
        println!("{line}");
    }
}

pub fn format_export(written: &[PathBuf], dir: &Path) -> Vec<String> {
    let mut lines: Vec<String> = written
        .iter()
        .map(|p| {
            let name = p.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
            format!("{}{name}", indent(1))
        })
        .collect();
    lines.insert(0, format!("Exported to {}", dir.display()));
    lines.push(String::new());
    lines.push(format!("{} written", plural(written.len(), "file", "files")));
    lines
}

pub fn print_export(written: &[PathBuf], dir: &Path) {
    for line in format_export(written, dir) {
        println!("{line}");
    }
}

// ============================================================================
// Users
// ============================================================================

pub fn format_user_table(users: &[UserRecord]) -> Vec<String> {
    if users.is_empty() {
        return vec!["No users found.".to_string()];
    }

    let rule = "=".repeat(85);
    let mut lines = vec![
        rule.clone(),
        format!(
            "{:<5} {:<20} {:<30} {:<8} {:<15}",
            "ID", "Username", "Email", "Tier", "Created"
        ),
        rule.clone(),
    ];
    for user in users {
        let created = user.created_at.get(..10).unwrap_or(&user.created_at);
        lines.push(format!(
            "{:<5} {:<20} {:<30} {:<8} {:<15}",
            user.id,
            user.username,
            user.email,
            user.tier.to_string(),
            created
        ));
    }
    lines.push(rule);
    lines.push(format!("Total users: {}", users.len()));
    lines.push("Tier levels: 0=admin, 1=gratis, 2=basic, 3=pro, 4=premium".to_string());
    lines
}

pub fn print_user_table(users: &[UserRecord]) {
    for line in format_user_table(users) {
        println!("{line}");
    }
}

// ============================================================================
// Media
// ============================================================================

pub fn format_speech_output(output: &SpeechOutput) -> Vec<String> {
    vec![
        format!("Created {} ({} bytes)", output.path.display(), output.bytes),
        format!("{}Voice: {}", indent(1), output.voice),
    ]
}

pub fn print_speech_output(output: &SpeechOutput) {
    for line in format_speech_output(output) {
        println!("{line}");
    }
}

pub fn format_image_output(path: &Path, image: &GeneratedImage) -> Vec<String> {
    let mut lines = vec![format!("Created {} ({})", path.display(), kb(image.bytes.len() as u64))];
    lines.push(format!("{}Attempts: {}", indent(1), image.attempts));
    if image.simplified {
        lines.push(format!("{}Used simplified prompt", indent(1)));
    }
    lines
}

pub fn print_image_output(path: &Path, image: &GeneratedImage) {
    for line in format_image_output(path, image) {
        println!("{line}");
    }
}

pub fn format_shrink_outcome(source: &Path, target_kb: u64, outcome: &ShrinkOutcome) -> Vec<String> {
    match outcome {
        ShrinkOutcome::AlreadySmall { size_bytes } => vec![
            format!("{} is already {} (≤ {target_kb} KB)", source.display(), kb(*size_bytes)),
            "No resizing needed.".to_string(),
        ],
        ShrinkOutcome::Resized(result) => {
            let reduction = if result.original_bytes == 0 {
                0.0
            } else {
                (result.original_bytes - result.final_bytes.min(result.original_bytes)) as f64
                    / result.original_bytes as f64
                    * 100.0
            };
            let mut lines = vec![
                format!("Created {}", result.output.display()),
                format!("{}Size: {} → {}", indent(1), kb(result.original_bytes), kb(result.final_bytes)),
                format!("{}Dimensions: {}x{}", indent(1), result.width, result.height),
                format!("{}Reduction: {reduction:.1}%", indent(1)),
            ];
            if !result.within_target {
                lines.push(format!(
                    "{}Closest result after {} (target was {target_kb} KB)",
                    indent(1),
                    plural(result.attempts as usize, "attempt", "attempts")
                ));
            }
            lines
        }
    }
}

pub fn print_shrink_outcome(source: &Path, target_kb: u64, outcome: &ShrinkOutcome) {
    for line in format_shrink_outcome(source, target_kb, outcome) {
        println!("{line}");
    }
}

pub fn format_media_outcomes(outcomes: &[MediaOutcome]) -> Vec<String> {
    let mut lines = Vec::with_capacity(outcomes.len() + 2);
    let (mut created, mut skipped, mut failed) = (0, 0, 0);
    for outcome in outcomes {
        let name = outcome.path.display();
        match &outcome.status {
            MediaStatus::Created => {
                created += 1;
                lines.push(format!("{}: created {name}", outcome.french));
            }
            MediaStatus::Skipped => {
                skipped += 1;
                lines.push(format!("{}: exists {name}", outcome.french));
            }
            MediaStatus::Failed(error) => {
                failed += 1;
                lines.push(format!("{}: FAILED {error}", outcome.french));
            }
        }
    }
    lines.push(String::new());
    lines.push(format!("{created} created, {skipped} skipped, {failed} failed"));
    lines
}

pub fn print_media_outcomes(outcomes: &[MediaOutcome]) {
    for line in format_media_outcomes(outcomes) {
        println!("{line}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::examples::DuplicateGroup;
    use crate::imaging::ShrinkResult;
    use crate::store::{ExampleRecord, Tier};
    use pretty_assertions::assert_eq;

    fn ok(phase: Phase, output: &str) -> PageOutcome {
        PageOutcome {
            phase,
            output: output.into(),
            error: None,
        }
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    #[test]
    fn format_index_pads() {
        assert_eq!(format_index(1), "001");
        assert_eq!(format_index(1000), "1000");
    }

    #[test]
    fn truncate_is_char_safe() {
        assert_eq!(truncate("déjà vu", 4), "déjà...");
        assert_eq!(truncate("court", 10), "court");
    }

    // =========================================================================
    // Build
    // =========================================================================

    #[test]
    fn build_report_layout() {
        let report = BuildReport {
            hint_index: IndexStatus::Loaded(1),
            vocab_found: true,
            pages: vec![
                ok(Phase::Hints, "hints/a.html"),
                ok(Phase::Listing, "hints/index.html"),
                ok(Phase::Static, "about.html"),
                PageOutcome {
                    phase: Phase::Static,
                    output: "index.html".into(),
                    error: Some("template not found: index.html".into()),
                },
                ok(Phase::Vocab, "vocab/a.html"),
                ok(Phase::Vocab, "vocab/b.html"),
            ],
        };

        assert_eq!(
            format_build_report(&report),
            vec![
                "Hints (1 in index)",
                "    hints/a.html",
                "    hints/index.html",
                "Pages",
                "    about.html",
                "    index.html: FAILED template not found: index.html",
                "Vocab",
                "    001 vocab/a.html",
                "    002 vocab/b.html",
                "",
                "Wrote 5 pages, 1 failed",
            ]
        );
    }

    #[test]
    fn build_report_without_index_or_vocab() {
        let report = BuildReport {
            hint_index: IndexStatus::Missing,
            vocab_found: false,
            pages: vec![ok(Phase::Static, "about.html")],
        };
        let lines = format_build_report(&report);
        assert_eq!(lines[0], "Hints (no index, skipped)");
        assert!(lines.contains(&"Vocab (no vocab directory)".to_string()));
        assert_eq!(lines.last().unwrap(), "Wrote 1 page, 0 failed");
    }

    // =========================================================================
    // Hints
    // =========================================================================

    #[test]
    fn hint_index_lists_titles_and_sources() {
        let records = vec![
            HintRecord {
                file: "a.html".into(),
                title: "Greetings".into(),
                summary: "Hello there.".into(),
            },
            HintRecord {
                file: "b.html".into(),
                title: "Numbers".into(),
                summary: String::new(),
            },
        ];
        assert_eq!(
            format_hint_index(&records, Path::new("dist/hints/hints.json")),
            vec![
                "001 Greetings",
                "    Source: a.html",
                "    Summary: Hello there.",
                "002 Numbers",
                "    Source: b.html",
                "",
                "Indexed 2 hints → dist/hints/hints.json",
            ]
        );
    }

    // =========================================================================
    // Examples
    // =========================================================================

    fn outcome(expression: &str, status: FillStatus, existing: usize, generated: usize) -> FillOutcome {
        let records = (0..existing + generated)
            .map(|i| ExampleRecord {
                id: i as i64 + 1,
                expression: expression.into(),
                french: format!("Phrase {i}."),
                english: format!("Sentence {i}."),
            })
            .collect();
        FillOutcome {
            expression: expression.into(),
            status,
            existing,
            generated,
            records,
        }
    }

    #[test]
    fn fill_outcomes_summary() {
        let outcomes = vec![
            outcome("le manteau", FillStatus::Filled, 2, 1),
            outcome("la chemise", FillStatus::AlreadyComplete, 3, 0),
            outcome("le chapeau", FillStatus::Abandoned, 0, 1),
        ];
        assert_eq!(
            format_fill_outcomes(&outcomes, 3),
            vec![
                "le manteau: 2 stored, 1 generated",
                "la chemise: complete (3)",
                "le chapeau: abandoned after 1 generated (1 of 3)",
                "",
                "3 expressions, 2 examples generated, 1 abandoned",
            ]
        );
    }

    #[test]
    fn dedupe_report_trial_run() {
        let report = DedupeReport {
            trial_run: true,
            groups: vec![DuplicateGroup {
                expression: "le chat".into(),
                french: "Le chat dort.".into(),
                keep_id: 5,
                delete_ids: vec![9, 12],
            }],
            deleted: 2,
        };
        assert_eq!(
            format_dedupe_report(&report),
            vec![
                "le chat: Le chat dort.",
                "    keep 5",
                "    delete 9, 12",
                "",
                "Trial run: would delete 2 rows",
            ]
        );
    }

    #[test]
    fn dedupe_report_nothing_to_do() {
        let report = DedupeReport {
            trial_run: false,
            groups: vec![],
            deleted: 0,
        };
        assert_eq!(format_dedupe_report(&report), vec!["No duplicate examples."]);
    }

    #[test]
    fn export_lists_files() {
        let written = vec![PathBuf::from("out/le_chat.txt")];
        assert_eq!(
            format_export(&written, Path::new("out")),
            vec!["Exported to out", "    le_chat.txt", "", "1 file written"]
        );
    }

    // =========================================================================
    // Users
    // =========================================================================

    #[test]
    fn user_table_rows() {
        let users = vec![UserRecord {
            id: 1,
            username: "marie".into(),
            email: "marie@example.com".into(),
            password_hash: "secret".into(),
            tier: Tier::Pro,
            created_at: "2025-03-04 10:11:12".into(),
        }];
        let lines = format_user_table(&users);
        assert!(lines[3].starts_with("1     marie"));
        assert!(lines[3].contains("pro"));
        assert!(lines[3].contains("2025-03-04"));
        assert!(!lines[3].contains("10:11"));
        assert!(!lines.iter().any(|l| l.contains("secret")));
        assert_eq!(lines[5], "Total users: 1");
    }

    #[test]
    fn empty_user_table() {
        assert_eq!(format_user_table(&[]), vec!["No users found."]);
    }

    // =========================================================================
    // Media
    // =========================================================================

    #[test]
    fn shrink_already_small() {
        let lines = format_shrink_outcome(
            Path::new("card.png"),
            150,
            &ShrinkOutcome::AlreadySmall { size_bytes: 2048 },
        );
        assert_eq!(lines[0], "card.png is already 2.0 KB (≤ 150 KB)");
    }

    #[test]
    fn shrink_missed_target_is_noted() {
        let outcome = ShrinkOutcome::Resized(ShrinkResult {
            output: PathBuf::from("card_resized.png"),
            original_bytes: 4096,
            final_bytes: 1024,
            width: 10,
            height: 10,
            attempts: 10,
            within_target: false,
        });
        let lines = format_shrink_outcome(Path::new("card.png"), 2, &outcome);
        assert_eq!(lines[0], "Created card_resized.png");
        assert_eq!(lines[3], "    Reduction: 75.0%");
        assert_eq!(lines[4], "    Closest result after 10 attempts (target was 2 KB)");
    }

    #[test]
    fn image_output_mentions_fallback() {
        let image = GeneratedImage {
            bytes: vec![0; 2048],
            attempts: 3,
            simplified: true,
        };
        let lines = format_image_output(Path::new("chat.png"), &image);
        assert_eq!(lines[0], "Created chat.png (2.0 KB)");
        assert_eq!(lines[2], "    Used simplified prompt");
    }

    // =========================================================================
    // Batch media
    // =========================================================================

    #[test]
    fn media_outcomes_list_rows_and_totals() {
        let outcome = |french: &str, file: &str, status: MediaStatus| MediaOutcome {
            french: french.into(),
            path: PathBuf::from(file),
            status,
        };
        let lines = format_media_outcomes(&[
            outcome("le manteau", "cards/le_manteau.png", MediaStatus::Created),
            outcome("la chemise", "cards/la_chemise.png", MediaStatus::Skipped),
            outcome("le pull", "cards/le_pull.png", MediaStatus::Failed("API error: 400".into())),
        ]);
        assert_eq!(
            lines,
            vec![
                "le manteau: created cards/le_manteau.png",
                "la chemise: exists cards/la_chemise.png",
                "le pull: FAILED API error: 400",
                "",
                "1 created, 1 skipped, 1 failed",
            ]
        );
    }
}
