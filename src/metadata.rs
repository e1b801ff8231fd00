//! Text metadata pulled out of hint pages.
//!
//! A hint fragment is an arbitrary HTML page. Two fields are derived from it,
//! each resolved independently. The first non-empty value wins:
//!
//! - **Title**: first `<h1>` → `<title>` → file stem
//! - **Summary**: first `<p>` → `""`
//!
//! Text is the element's descendant text: tags dropped, entities decoded (the
//! parser does that), whitespace runs collapsed to one space and trimmed.
//! `<title>` values also lose a trailing ` - frflashy.com` site suffix.
//!
//! Parsing goes through `scraper`'s HTML5 parser, which recovers from any
//! malformed markup instead of failing. A document it can make nothing of
//! simply yields no matches and falls through to the fallbacks.

use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;

static H1: LazyLock<Selector> = LazyLock::new(|| Selector::parse("h1").expect("valid selector"));
static TITLE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("title").expect("valid selector"));
static PARAGRAPH: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("p").expect("valid selector"));

const SITE_SUFFIX: &str = "frflashy.com";

/// Resolve a metadata field from multiple sources.
///
/// Takes a list of optional values in priority order and returns the first
/// non-None, non-empty value.
///
/// ```text
/// title:   resolve(&[h1, title_tag, Some(stem)])
/// summary: resolve(&[first_paragraph]).unwrap_or_default()
/// ```
pub fn resolve(sources: &[Option<&str>]) -> Option<String> {
    sources
        .iter()
        .filter_map(|opt| {
            opt.map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
        })
        .next()
}

/// Raw candidates found in one document, before fallback resolution.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageText {
    pub h1: Option<String>,
    pub title: Option<String>,
    pub first_paragraph: Option<String>,
}

impl PageText {
    pub fn parse(html: &str) -> Self {
        let document = Html::parse_document(html);
        Self {
            h1: first_text(&document, &H1),
            title: first_text(&document, &TITLE).map(|t| strip_site_suffix(&t)),
            first_paragraph: first_text(&document, &PARAGRAPH),
        }
    }

    /// Title with the file stem as last resort.
    pub fn resolved_title(&self, stem: &str) -> String {
        resolve(&[self.h1.as_deref(), self.title.as_deref(), Some(stem)])
            .unwrap_or_else(|| stem.to_string())
    }

    pub fn resolved_summary(&self) -> String {
        resolve(&[self.first_paragraph.as_deref()]).unwrap_or_default()
    }
}

/// Text of the first element matching `selector`, if it has any.
fn first_text(document: &Html, selector: &Selector) -> Option<String> {
    document
        .select(selector)
        .next()
        .map(element_text)
        .filter(|s| !s.is_empty())
}

/// Descendant text of an element with whitespace normalized.
pub fn element_text(element: ElementRef<'_>) -> String {
    collapse_whitespace(&element.text().collect::<String>())
}

pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// `"Les articles - frflashy.com"` → `"Les articles"`.
fn strip_site_suffix(title: &str) -> String {
    let Some(cut) = title.len().checked_sub(SITE_SUFFIX.len()) else {
        return title.to_string();
    };
    if !title.is_char_boundary(cut) || !title[cut..].eq_ignore_ascii_case(SITE_SUFFIX) {
        return title.to_string();
    }
    let head = title[..cut].trim_end();
    match head.strip_suffix('-').or_else(|| head.strip_suffix('–')) {
        Some(rest) => rest.trim_end().to_string(),
        None => title.to_string(),
    }
}
