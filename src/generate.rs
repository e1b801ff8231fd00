//! Static site generation.
//!
//! Renders the Jinja templates into the output directory in three linear
//! phases. Nothing is rolled back: a page that fails is logged, counted in the
//! [`BuildReport`] and the build moves on.
//!
//! 1. **Hint pages**: for every record of the hint index, `hints/<file>` is
//!    rendered with `hint` in the context. A missing index skips this phase.
//!    A listing page linking every hint is written alongside.
//! 2. **Static pages**: each configured page (default `about.html`,
//!    `index.html`) with the base context only.
//! 3. **Vocabulary pages**: `vocab/**/*.html` in sorted order, each with
//!    `prev_url` / `next_url` pointing at its neighbours.
//!
//! ## Output Structure
//!
//! ```text
//! dist/
//! ├── index.html
//! ├── about.html
//! ├── hints/
//! │   ├── hints.json             # written by `frflashy hints`
//! │   ├── index.html             # hint listing (generated, not templated)
//! │   ├── a.html
//! │   └── b.html
//! └── vocab/
//!     ├── animaux/chat.html
//!     └── couleurs.html
//! ```
//!
//! Every output is overwritten on each build. Given the same inputs and the
//! same year, two builds produce byte-identical files.
//!
//! ## HTML Generation
//!
//! Site pages come from the user's templates through [`crate::render`]. The
//! hint listing is ours, so it uses [maud](https://maud.lambda.xyz/) like the
//! other built-in pages.

use crate::config::SitePaths;
use crate::hints::{self, HintRecord, LISTING_FILE};
use crate::naming;
use crate::render::{self, PageContext, RenderError, Renderer};
use crate::scan::{self, VocabPage};
use maud::{DOCTYPE, Markup, html};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{error, info, warn};

#[derive(Error, Debug)]
pub enum BuildError {
    #[error("cannot create output directory {path}: {source}")]
    Output {
        path: PathBuf,
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Hints,
    Listing,
    Static,
    Vocab,
}

/// What happened to one output file.
#[derive(Debug, Clone, PartialEq)]
pub struct PageOutcome {
    pub phase: Phase,
    /// Output path relative to the output directory.
    pub output: String,
    pub error: Option<String>,
}

/// How the hint index looked when the build read it.
#[derive(Debug, Clone, PartialEq)]
pub enum IndexStatus {
    Loaded(usize),
    Missing,
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct BuildReport {
    pub hint_index: IndexStatus,
    /// False when the templates root has no `vocab/` directory.
    pub vocab_found: bool,
    pub pages: Vec<PageOutcome>,
}

impl BuildReport {
    pub fn written(&self) -> usize {
        self.pages.iter().filter(|p| p.error.is_none()).count()
    }

    pub fn failed(&self) -> usize {
        self.pages.iter().filter(|p| p.error.is_some()).count()
    }
}

/// Prev/next URLs for one vocabulary page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavLinks {
    pub prev_url: Option<String>,
    pub next_url: Option<String>,
}

/// Link every page to its neighbours in `pages` order.
///
/// The first page has no `prev_url`, the last no `next_url`; a single page
/// has neither.
pub fn sibling_links(pages: &[VocabPage]) -> Vec<NavLinks> {
    (0..pages.len())
        .map(|i| NavLinks {
            prev_url: i.checked_sub(1).map(|p| pages[p].url()),
            next_url: pages.get(i + 1).map(VocabPage::url),
        })
        .collect()
}

pub struct SiteBuilder<'a> {
    paths: &'a SitePaths,
    static_pages: &'a [String],
    renderer: Renderer,
    current_year: i32,
}

impl<'a> SiteBuilder<'a> {
    pub fn new(paths: &'a SitePaths, static_pages: &'a [String]) -> Self {
        Self {
            paths,
            static_pages,
            renderer: Renderer::new(&paths.templates),
            current_year: render::current_year(),
        }
    }

    /// Pin `current_year` instead of reading the clock.
    pub fn with_year(mut self, year: i32) -> Self {
        self.current_year = year;
        self
    }

    pub fn build(&self) -> Result<BuildReport, BuildError> {
        let output = &self.paths.output;
        fs::create_dir_all(output).map_err(|source| BuildError::Output {
            path: output.clone(),
            source,
        })?;

        let mut pages = Vec::new();

        let hint_index = match hints::load_index(&self.paths.hints_index) {
            Ok(Some(records)) => {
                self.build_hint_pages(&records, &mut pages);
                self.build_hint_listing(&records, &mut pages);
                IndexStatus::Loaded(records.len())
            }
            Ok(None) => {
                warn!(
                    path = %self.paths.hints_index.display(),
                    "hint index not found, skipping hint pages"
                );
                IndexStatus::Missing
            }
            Err(e) => {
                error!(error = %e, "hint index unusable, skipping hint pages");
                IndexStatus::Invalid(e.to_string())
            }
        };

        self.build_static_pages(&mut pages);
        let vocab_found = self.build_vocab_pages(&mut pages);

        let report = BuildReport {
            hint_index,
            vocab_found,
            pages,
        };
        info!(
            written = report.written(),
            failed = report.failed(),
            output = %output.display(),
            "build finished"
        );
        Ok(report)
    }

    fn build_hint_pages(&self, records: &[HintRecord], pages: &mut Vec<PageOutcome>) {
        for record in records {
            let rel = format!("hints/{}", record.file);
            if !naming::is_plain_filename(&record.file) || record.file == LISTING_FILE {
                warn!(file = %record.file, "hint record has an unusable file name");
                pages.push(failure(Phase::Hints, rel, "unusable file name".into()));
                continue;
            }
            let context = PageContext::for_hint(self.current_year, record);
            pages.push(self.render_page(Phase::Hints, &rel, &rel, &context));
        }
    }

    fn build_hint_listing(&self, records: &[HintRecord], pages: &mut Vec<PageOutcome>) {
        let rel = format!("hints/{LISTING_FILE}");
        let markup = render_hint_listing(records, self.current_year);
        pages.push(self.write_page(Phase::Listing, &rel, &markup.into_string()));
    }

    fn build_static_pages(&self, pages: &mut Vec<PageOutcome>) {
        let context = PageContext::base(self.current_year);
        for page in self.static_pages {
            pages.push(self.render_page(Phase::Static, page, page, &context));
        }
    }

    /// Returns whether a `vocab/` directory was found.
    fn build_vocab_pages(&self, pages: &mut Vec<PageOutcome>) -> bool {
        let vocab = match scan::find_vocab_pages(&self.paths.templates) {
            Ok(Some(vocab)) => vocab,
            Ok(None) => {
                warn!(
                    templates = %self.paths.templates.display(),
                    "no vocab directory, skipping vocabulary pages"
                );
                return false;
            }
            Err(e) => {
                error!(error = %e, "vocabulary scan failed, skipping vocabulary pages");
                return true;
            }
        };

        for (page, links) in vocab.iter().zip(sibling_links(&vocab)) {
            let template = page.template();
            let context = PageContext::for_vocab(self.current_year, links.prev_url, links.next_url);
            pages.push(self.render_page(Phase::Vocab, &template, &template, &context));
        }
        true
    }

    fn render_page(
        &self,
        phase: Phase,
        template: &str,
        rel_output: &str,
        context: &PageContext<'_>,
    ) -> PageOutcome {
        match self.renderer.render(template, context) {
            Ok(html) => self.write_page(phase, rel_output, &html),
            Err(e) => {
                match &e {
                    RenderError::NotFound(_) => warn!(template, "template not found"),
                    RenderError::Template(_) => error!(template, error = %e, "render failed"),
                }
                failure(phase, rel_output.to_string(), e.to_string())
            }
        }
    }

    fn write_page(&self, phase: Phase, rel_output: &str, html: &str) -> PageOutcome {
        let path = self.paths.output.join(rel_output);
        match write_file(&path, html) {
            Ok(()) => {
                info!(page = rel_output, "generated");
                PageOutcome {
                    phase,
                    output: rel_output.to_string(),
                    error: None,
                }
            }
            Err(e) => {
                error!(path = %path.display(), error = %e, "write failed");
                failure(phase, rel_output.to_string(), e.to_string())
            }
        }
    }
}

fn failure(phase: Phase, output: String, error: String) -> PageOutcome {
    PageOutcome {
        phase,
        output,
        error: Some(error),
    }
}

fn write_file(path: &Path, content: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, content)
}

// ============================================================================
// Hint listing
// ============================================================================

const LISTING_CSS: &str = "\
body{font-family:system-ui,sans-serif;max-width:48rem;margin:2rem auto;padding:0 1rem;color:#222}\
h1{font-size:1.6rem}\
.hint-count{color:#666}\
.hint-list{list-style:none;padding:0}\
.hint-list li{padding:.75rem 0;border-bottom:1px solid #e0e0e0}\
.hint-list a{font-weight:600;color:#1a4fa0;text-decoration:none}\
.hint-list p{margin:.25rem 0 0;color:#555}\
footer{margin-top:2rem;color:#888;font-size:.85rem}";

/// The page listing every hint with its title and summary.
pub fn render_hint_listing(records: &[HintRecord], current_year: i32) -> Markup {
    html! {
        (DOCTYPE)
        html lang="fr" {
            head {
                meta charset="UTF-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                title { "Hints" }
                style { (LISTING_CSS) }
            }
            body {
                header {
                    a href="/" { "frflashy" }
                }
                main {
                    h1 { "Hints" }
                    p.hint-count { "Total resources: " (records.len()) }
                    ul.hint-list {
                        @for record in records {
                            li {
                                a href=(format!("/hints/{}", record.file)) { (record.title) }
                                @if !record.summary.is_empty() {
                                    p { (record.summary) }
                                }
                            }
                        }
                    }
                }
                footer { "© " (current_year) " frflashy" }
            }
        }
    }
}
