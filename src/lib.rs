//! # frflashy
//!
//! Content pipeline and web service for a French vocabulary flashcard site.
//! Pages are Jinja templates on disk; example sentences and accounts live in a
//! SQLite database; audio, images and example sentences come from an
//! OpenAI-compatible generation API.
//!
//! # Architecture
//!
//! The site itself is built in two steps, each a CLI command:
//!
//! ```text
//! 1. Hints   templates/hints/  →  dist/hints/hints.json   (fragments → index)
//! 2. Build   templates/ + index →  dist/                  (final HTML site)
//! ```
//!
//! The index is plain JSON so it can be inspected or edited by hand between
//! the two steps. Everything else hangs off the database and the API client:
//!
//! ```text
//! vocab.csv ──► examples (cache) ──► store ◄── users (auth)
//!                    │                 ▲
//!                    ▼                 │
//!                 client ◄── speech, imaging, feedback ◄── server
//! ```
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`hints`] | Scans hint fragments and reads/writes the hint index |
//! | [`metadata`] | Title and summary extraction from an HTML page |
//! | [`scan`] | Discovers vocabulary pages and their order |
//! | [`render`] | Jinja rendering with the per-page context |
//! | [`generate`] | The site build: hint, static and vocabulary phases |
//! | [`config`] | `frflashy.toml` loading and validation, environment credentials |
//! | [`store`] | SQLite access: example sentences and user accounts |
//! | [`client`] | Generation API client and the traits the rest of the crate codes against |
//! | [`examples`] | Example sentence cache: fill, populate, dedupe, export |
//! | [`speech`] | Voice selection and pronunciation audio |
//! | [`imaging`] | Flashcard image generation and PNG shrinking |
//! | [`media`] | Images and audio for every row of a vocabulary CSV |
//! | [`feedback`] | Pronunciation feedback from a transcription |
//! | [`auth`] | Password hashing and login sessions |
//! | [`server`] | The axum web service |
//! | [`naming`] | Slugs and safe file names |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Traits At The API Seam
//!
//! Every call to the generation API goes through a small trait
//! ([`client::ExampleGenerator`], [`client::SpeechSynthesizer`], ...). The
//! cache, the media tools and the web handlers only see the trait, so tests
//! drive them with scripted fakes and never touch the network.
//!
//! ## Failures Are Counted, Not Fatal
//!
//! A page that fails to render or an expression the generator cannot fill is
//! logged and reported, and the run moves on. Commands return an error only
//! when nothing useful can be done at all (no output directory, no database).
//!
//! ## One Database Handle
//!
//! [`store::Database`] wraps a single SQLite connection behind a mutex. The
//! CLI is single-threaded and the web service moves store calls onto the
//! blocking pool, so one connection is enough.

pub mod auth;
pub mod client;
pub mod config;
pub mod examples;
pub mod feedback;
pub mod generate;
pub mod hints;
pub mod imaging;
pub mod media;
pub mod metadata;
pub mod naming;
pub mod output;
pub mod render;
pub mod scan;
pub mod server;
pub mod speech;
pub mod store;

#[cfg(test)]
pub(crate) mod test_helpers;
