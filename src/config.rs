//! Site configuration module.
//!
//! Handles loading and validating `frflashy.toml`, plus the credentials that
//! only ever come from the environment.
//!
//! ## Config File Location
//!
//! Place `frflashy.toml` in the site root (the directory passed as `--root`,
//! default `.`). Every relative path in the file is resolved against that root.
//!
//! ```text
//! site/
//! ├── frflashy.toml
//! ├── templates/
//! │   ├── index.html
//! │   ├── about.html
//! │   ├── hints/            # hint fragments (extractor input, render templates)
//! │   └── vocab/            # vocabulary pages, any depth
//! ├── recordings/           # uploaded audio
//! └── dist/                 # build output
//! ```
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [paths]
//! templates = "templates"
//! hints_dir = "templates/hints"
//! output = "dist"
//! recordings = "recordings"
//! # hints_index defaults to "<output>/hints/hints.json"
//!
//! [pages]
//! static_pages = ["about.html", "index.html"]
//!
//! [examples]
//! per_expression = 3
//! max_attempts = 5
//! model = "gpt-4.1-mini"
//!
//! [speech]
//! model = "gpt-4o-mini-tts"
//! default_voice = "alloy"
//! format = "mp3"
//! speed = 1.0
//! lead_in = "En français, on dit"
//!
//! [feedback]
//! model = "gpt-4o"
//! transcription_model = "whisper-1"
//! language = "fr"
//!
//! [images]
//! model = "gpt-image-1"
//! size = "1024x1024"
//! retries = 3
//! backoff_ms = 1000
//! target_kb = 150
//!
//! [server]
//! bind_address = "127.0.0.1:5000"
//! max_upload_size = 26214400
//! ```
//!
//! Unknown keys are rejected to catch typos early.
//!
//! ## Environment
//!
//! | Variable | Used by |
//! |----------|---------|
//! | `FRFLASHY_DATABASE_URL` | every command touching examples or users |
//! | `OPENAI_API_KEY` | generation, speech, transcription, images |
//! | `OPENAI_BASE_URL` | optional API base override |

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File name looked up in the site root.
pub const CONFIG_FILE: &str = "frflashy.toml";

pub const DATABASE_URL_VAR: &str = "FRFLASHY_DATABASE_URL";
pub const API_KEY_VAR: &str = "OPENAI_API_KEY";
pub const API_BASE_VAR: &str = "OPENAI_BASE_URL";
pub const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
    #[error("{0} is not set")]
    MissingEnv(&'static str),
}

/// Site configuration loaded from `frflashy.toml`.
///
/// All fields have defaults. A config file only needs the values it
/// overrides.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteConfig {
    pub paths: PathsConfig,
    pub pages: PagesConfig,
    pub examples: ExamplesConfig,
    pub speech: SpeechConfig,
    pub feedback: FeedbackConfig,
    pub images: ImagesConfig,
    pub server: ServerConfig,
}

impl SiteConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.examples.per_expression == 0 {
            return Err(ConfigError::Validation(
                "examples.per_expression must be at least 1".into(),
            ));
        }
        if self.examples.max_attempts == 0 {
            return Err(ConfigError::Validation(
                "examples.max_attempts must be at least 1".into(),
            ));
        }
        if !SUPPORTED_AUDIO_FORMATS.contains(&self.speech.format.as_str()) {
            return Err(ConfigError::Validation(format!(
                "speech.format must be one of {}",
                SUPPORTED_AUDIO_FORMATS.join(", ")
            )));
        }
        if !(0.25..=4.0).contains(&self.speech.speed) {
            return Err(ConfigError::Validation(
                "speech.speed must be between 0.25 and 4.0".into(),
            ));
        }
        if self.images.retries == 0 {
            return Err(ConfigError::Validation(
                "images.retries must be at least 1".into(),
            ));
        }
        if self.images.target_kb == 0 {
            return Err(ConfigError::Validation(
                "images.target_kb must be non-zero".into(),
            ));
        }
        for page in &self.pages.static_pages {
            let escapes = page.is_empty()
                || page.starts_with('/')
                || page.starts_with('\\')
                || Path::new(page).is_absolute()
                || has_drive_prefix(page)
                || page.split(['/', '\\']).any(|part| part == "..");
            if escapes {
                return Err(ConfigError::Validation(format!(
                    "pages.static_pages entry {page:?} must be a path inside the templates root"
                )));
            }
        }
        Ok(())
    }
}

/// `C:` style prefix, absolute on Windows whatever the host.
fn has_drive_prefix(page: &str) -> bool {
    let bytes = page.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

/// Locations of inputs and outputs, relative to the site root.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PathsConfig {
    /// Root of the Jinja templates.
    pub templates: PathBuf,
    /// Directory of hint fragments scanned by the extractor.
    pub hints_dir: PathBuf,
    /// Hint index JSON. Defaults to `<output>/hints/hints.json`.
    pub hints_index: Option<PathBuf>,
    /// Build output directory.
    pub output: PathBuf,
    /// Where uploaded recordings are stored.
    pub recordings: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            templates: PathBuf::from("templates"),
            hints_dir: PathBuf::from("templates/hints"),
            hints_index: None,
            output: PathBuf::from("dist"),
            recordings: PathBuf::from("recordings"),
        }
    }
}

impl PathsConfig {
    /// Join every configured path onto `root`.
    pub fn resolve(&self, root: &Path) -> SitePaths {
        let output = root.join(&self.output);
        let hints_index = match &self.hints_index {
            Some(path) => root.join(path),
            None => output.join("hints").join("hints.json"),
        };
        SitePaths {
            templates: root.join(&self.templates),
            hints_dir: root.join(&self.hints_dir),
            hints_index,
            output,
            recordings: root.join(&self.recordings),
        }
    }
}

/// [`PathsConfig`] resolved against a site root.
#[derive(Debug, Clone, PartialEq)]
pub struct SitePaths {
    pub templates: PathBuf,
    pub hints_dir: PathBuf,
    pub hints_index: PathBuf,
    pub output: PathBuf,
    pub recordings: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PagesConfig {
    /// Templates rendered once with the base context, to the same relative path.
    pub static_pages: Vec<String>,
}

impl Default for PagesConfig {
    fn default() -> Self {
        Self {
            static_pages: vec!["about.html".to_string(), "index.html".to_string()],
        }
    }
}

/// Example sentence generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExamplesConfig {
    /// Sentences kept per expression.
    pub per_expression: usize,
    /// Generation attempts per missing sentence before the expression is abandoned.
    pub max_attempts: u32,
    pub model: String,
}

impl Default for ExamplesConfig {
    fn default() -> Self {
        Self {
            per_expression: 3,
            max_attempts: 5,
            model: "gpt-4.1-mini".to_string(),
        }
    }
}

pub const SUPPORTED_AUDIO_FORMATS: &[&str] = &["mp3", "wav", "opus", "aac", "flac"];

/// Text-to-speech settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SpeechConfig {
    pub model: String,
    /// Voice used when the instructions name neither a voice, a tone nor a gender.
    pub default_voice: String,
    pub format: String,
    pub speed: f32,
    /// Phrase spoken before the text in the `speak` tool. Empty disables it.
    pub lead_in: String,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini-tts".to_string(),
            default_voice: "alloy".to_string(),
            format: "mp3".to_string(),
            speed: 1.0,
            lead_in: "En français, on dit".to_string(),
        }
    }
}

/// Pronunciation feedback settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FeedbackConfig {
    /// Chat model used for tutoring feedback.
    pub model: String,
    pub transcription_model: String,
    /// Language hint passed to transcription.
    pub language: String,
}

impl Default for FeedbackConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o".to_string(),
            transcription_model: "whisper-1".to_string(),
            language: "fr".to_string(),
        }
    }
}

/// Flashcard image generation and shrinking.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ImagesConfig {
    pub model: String,
    pub size: String,
    /// Attempts of the full request before the simplified fallback.
    pub retries: u32,
    /// First backoff delay; doubles after every failed attempt.
    pub backoff_ms: u64,
    /// Target size of `shrink`, in kilobytes.
    pub target_kb: u64,
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self {
            model: "gpt-image-1".to_string(),
            size: "1024x1024".to_string(),
            retries: 3,
            backoff_ms: 1000,
            target_kb: 150,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub bind_address: String,
    /// Maximum upload size in bytes
    pub max_upload_size: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:5000".to_string(),
            max_upload_size: 25 * 1024 * 1024,
        }
    }
}

// =============================================================================
// Config loading
// =============================================================================

/// Load config from `frflashy.toml` in the given directory.
///
/// Missing file means stock defaults. Unknown keys are rejected and the
/// result is validated.
pub fn load_config(root: &Path) -> Result<SiteConfig, ConfigError> {
    let config_path = root.join(CONFIG_FILE);
    if !config_path.exists() {
        return Ok(SiteConfig::default());
    }
    let content = fs::read_to_string(&config_path)?;
    parse_config(&content)
}

/// Parse and validate config text.
pub fn parse_config(content: &str) -> Result<SiteConfig, ConfigError> {
    let config: SiteConfig = toml::from_str(content)?;
    config.validate()?;
    Ok(config)
}

/// Returns a fully-commented stock `frflashy.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# frflashy configuration
# ======================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
# Relative paths are resolved against the directory holding this file.
# Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Paths
# ---------------------------------------------------------------------------
[paths]
# Root of the Jinja templates (static pages, hints/, vocab/).
templates = "templates"

# Hint fragments read by `frflashy hints`.
hints_dir = "templates/hints"

# Build output directory.
output = "dist"

# Uploaded audio recordings.
recordings = "recordings"

# Hint index JSON written by `frflashy hints` and read by `frflashy build`.
# Defaults to "<output>/hints/hints.json".
# hints_index = "dist/hints/hints.json"

# ---------------------------------------------------------------------------
# Static pages
# ---------------------------------------------------------------------------
[pages]
# Rendered with the base context only, to the same path under the output.
static_pages = ["about.html", "index.html"]

# ---------------------------------------------------------------------------
# Example sentences
# ---------------------------------------------------------------------------
[examples]
# Sentences kept per expression.
per_expression = 3

# Attempts per missing sentence before the expression is abandoned.
max_attempts = 5

model = "gpt-4.1-mini"

# ---------------------------------------------------------------------------
# Text to speech
# ---------------------------------------------------------------------------
[speech]
model = "gpt-4o-mini-tts"

# Used when the instructions name no voice, tone or gender.
default_voice = "alloy"

# One of mp3, wav, opus, aac, flac.
format = "mp3"

# 0.25 - 4.0
speed = 1.0

# Spoken before the text by `frflashy speak`. Set to "" to disable.
lead_in = "En français, on dit"

# ---------------------------------------------------------------------------
# Pronunciation feedback
# ---------------------------------------------------------------------------
[feedback]
model = "gpt-4o"
transcription_model = "whisper-1"
language = "fr"

# ---------------------------------------------------------------------------
# Images
# ---------------------------------------------------------------------------
[images]
model = "gpt-image-1"
size = "1024x1024"

# Attempts of the full request; the delay starts at backoff_ms and doubles.
retries = 3
backoff_ms = 1000

# Target size for `frflashy shrink`, in kilobytes.
target_kb = 150

# ---------------------------------------------------------------------------
# Web service
# ---------------------------------------------------------------------------
[server]
bind_address = "127.0.0.1:5000"

# Maximum upload size in bytes.
max_upload_size = 26214400
"##
}

// =============================================================================
// Credentials
// =============================================================================

/// Secrets and connection strings read from the environment.
///
/// Commands ask for the piece they need through `require_*`, so a missing
/// variable is reported before any work starts.
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    pub database_url: Option<String>,
    pub api_key: Option<String>,
    pub api_base: String,
}

impl Credentials {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable lookup. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        Self {
            database_url: get(DATABASE_URL_VAR),
            api_key: get(API_KEY_VAR),
            api_base: get(API_BASE_VAR)
                .map(|base| base.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
        }
    }

    /// The SQLite location named by the database URL.
    pub fn require_database(&self) -> Result<String, ConfigError> {
        self.database_url
            .as_deref()
            .map(sqlite_location)
            .ok_or(ConfigError::MissingEnv(DATABASE_URL_VAR))
    }

    pub fn require_api_key(&self) -> Result<&str, ConfigError> {
        self.api_key
            .as_deref()
            .ok_or(ConfigError::MissingEnv(API_KEY_VAR))
    }

    /// Fail on the first credential `needs` asks for that is unset.
    pub fn check(&self, needs: Needs) -> Result<(), ConfigError> {
        if needs.api_key {
            self.require_api_key()?;
        }
        if needs.database {
            self.require_database()?;
        }
        Ok(())
    }
}

/// The credentials a command uses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Needs {
    pub database: bool,
    pub api_key: bool,
}

/// Strip an optional `sqlite://` or `sqlite:` scheme from a database URL.
pub fn sqlite_location(url: &str) -> String {
    let url = url.trim();
    url.strip_prefix("sqlite://")
        .or_else(|| url.strip_prefix("sqlite:"))
        .unwrap_or(url)
        .to_string()
}
