//! Jinja template rendering.
//!
//! Templates are loaded lazily from the templates root by their relative path
//! (`index.html`, `hints/a.html`, `vocab/food/pain.html`), so `{% extends %}`
//! and `{% include %}` resolve the same way.
//!
//! ## Context
//!
//! Every page sees `current_year`. Page data is added per call:
//!
//! | Variable | Pages |
//! |----------|-------|
//! | `current_year` | all |
//! | `hint` (`file`, `title`, `summary`) | hint pages |
//! | `prev_url`, `next_url` | vocabulary pages, `none` at the ends |
//!
//! ## Escaping
//!
//! Auto-escape is on for `.html`, `.htm` and `.xml` templates. Values only
//! reach the output raw through an explicit `|safe`. Escaping covers
//! `& < > " '` and nothing else, so URLs keep their slashes:
//!
//! ```text
//! {{ next_url }}   /vocab/a&b.html   →   /vocab/a&amp;b.html
//! ``` Block tags are trimmed
//! (`trim_blocks`, `lstrip_blocks`) so control flow leaves no blank lines.

use crate::hints::HintRecord;
use chrono::Datelike;
use minijinja::{AutoEscape, Environment, ErrorKind, Output, State, Value};
use std::fmt::Write;
use serde::Serialize;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("template not found: {0}")]
    NotFound(String),
    #[error("template error: {0}")]
    Template(#[from] minijinja::Error),
}

/// Variables handed to one template render.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PageContext<'a> {
    pub current_year: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<&'a HintRecord>,
    pub prev_url: Option<String>,
    pub next_url: Option<String>,
}

impl<'a> PageContext<'a> {
    pub fn base(current_year: i32) -> Self {
        Self {
            current_year,
            ..Self::default()
        }
    }

    pub fn for_hint(current_year: i32, hint: &'a HintRecord) -> Self {
        Self {
            hint: Some(hint),
            ..Self::base(current_year)
        }
    }

    pub fn for_vocab(current_year: i32, prev_url: Option<String>, next_url: Option<String>) -> Self {
        Self {
            prev_url,
            next_url,
            ..Self::base(current_year)
        }
    }
}

/// The year stamped into page footers.
pub fn current_year() -> i32 {
    chrono::Local::now().year()
}

/// A template environment bound to one templates root.
pub struct Renderer {
    env: Environment<'static>,
}

impl Renderer {
    pub fn new(templates_root: &Path) -> Self {
        let mut env = Environment::new();
        env.set_loader(minijinja::path_loader(templates_root));
        env.set_auto_escape_callback(minijinja::default_auto_escape_callback);
        env.set_formatter(html_formatter);
        env.set_trim_blocks(true);
        env.set_lstrip_blocks(true);
        Self { env }
    }

    /// Render `name` with `context`.
    ///
    /// A missing template is reported as [`RenderError::NotFound`] so callers
    /// can tell it apart from a template that exists but fails.
    pub fn render(&self, name: &str, context: &PageContext<'_>) -> Result<String, RenderError> {
        let template = self.env.get_template(name).map_err(|e| match e.kind() {
            ErrorKind::TemplateNotFound => RenderError::NotFound(name.to_string()),
            _ => RenderError::Template(e),
        })?;
        Ok(template.render(context)?)
    }
}

fn html_formatter(out: &mut Output, state: &State, value: &Value) -> Result<(), minijinja::Error> {
    let plain = value.is_safe() || value.is_undefined() || value.is_none();
    if plain || !matches!(state.auto_escape(), AutoEscape::Html) {
        return minijinja::escape_formatter(out, state, value);
    }
    out.write_str(&escape_html(&value.to_string()))
        .map_err(|e| minijinja::Error::new(ErrorKind::WriteFailure, e.to_string()))
}

/// Escape the five HTML-significant characters.
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&#34;"),
            '\'' => escaped.push_str("&#39;"),
            c => escaped.push(c),
        }
    }
    escaped
}
