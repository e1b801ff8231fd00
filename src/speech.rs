//! Pronunciation audio.
//!
//! `frflashy speak <name> <instructions> <text>` writes `<slug>.<format>`.
//! The instructions only pick the voice; they are never spoken. Voice
//! selection is one ordered policy:
//!
//! 1. an explicit `voice=<name>` anywhere in the instructions
//! 2. the first tone word found (`cheerful`, `calm`, ...)
//! 3. a gender word (`woman`, `male`, ...), female words checked first
//! 4. the configured default voice

use crate::client::{ClientError, SpeechSynthesizer};
use crate::config::SpeechConfig;
use crate::naming;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

/// Tone words and their voices, checked in this order.
const TONE_VOICES: &[(&str, &str)] = &[
    ("cheerful", "alloy"),
    ("happy", "alloy"),
    ("joyful", "alloy"),
    ("calm", "verse"),
    ("soft", "verse"),
    ("gentle", "verse"),
    ("slow", "verse"),
    ("formal", "alloy"),
    ("serious", "alloy"),
    ("clear", "alloy"),
    ("excited", "alloy"),
    ("energetic", "alloy"),
    ("lively", "alloy"),
    ("sad", "verse"),
    ("somber", "verse"),
];

const FEMALE_WORDS: &[&str] = &["woman", "women", "female", "girl", "feminine"];
const MALE_WORDS: &[&str] = &["man", "men", "male", "masculine", "boy"];
const FEMALE_VOICE: &str = "alloy";
const MALE_VOICE: &str = "verse";

#[derive(Error, Debug)]
pub enum SpeechError {
    #[error("nothing to say: text is empty")]
    EmptyText,
    #[error("speech synthesis failed: {0}")]
    Client(#[from] ClientError),
    #[error("speech synthesis returned no audio")]
    EmptyAudio,
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Pick a voice for `instructions`, falling back to `default_voice`.
pub fn choose_voice(instructions: &str, default_voice: &str) -> String {
    let lower = instructions.to_lowercase();
    if let Some(voice) = explicit_voice(&lower) {
        return voice.to_string();
    }

    let words: Vec<&str> = lower
        .split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|w| !w.is_empty())
        .collect();
    let has = |candidates: &[&str]| words.iter().any(|w| candidates.contains(w));

    if let Some((_, voice)) = TONE_VOICES.iter().find(|(tone, _)| words.contains(tone)) {
        return voice.to_string();
    }
    if has(FEMALE_WORDS) {
        return FEMALE_VOICE.to_string();
    }
    if has(MALE_WORDS) {
        return MALE_VOICE.to_string();
    }
    default_voice.to_string()
}

/// The name after `voice=`, allowing spaces around `=`.
fn explicit_voice(lower: &str) -> Option<&str> {
    let mut rest = lower;
    while let Some(pos) = rest.find("voice") {
        let at_word_start = rest[..pos]
            .chars()
            .next_back()
            .is_none_or(|c| !c.is_alphanumeric() && c != '_');
        let after = rest[pos + "voice".len()..].trim_start();
        if let (true, Some(value)) = (at_word_start, after.strip_prefix('=')) {
            let value = value.trim_start();
            let end = value
                .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_' || c == '-'))
                .unwrap_or(value.len());
            if end > 0 {
                return Some(&value[..end]);
            }
        }
        rest = &rest[pos + "voice".len()..];
    }
    None
}

/// Text actually sent to synthesis: the lead-in phrase wraps the text in
/// French quotation marks unless it is empty.
pub fn spoken_text(lead_in: &str, text: &str) -> String {
    let lead_in = lead_in.trim();
    if lead_in.is_empty() {
        text.to_string()
    } else {
        format!("{lead_in} << {text} >>")
    }
}

/// One finished `speak` job.
#[derive(Debug, Clone, PartialEq)]
pub struct SpeechOutput {
    pub path: PathBuf,
    pub voice: String,
    pub bytes: usize,
}

/// Synthesize `text` and write it to `<out_dir>/<slug of name>.<format>`.
pub fn speak(
    synthesizer: &dyn SpeechSynthesizer,
    config: &SpeechConfig,
    out_dir: &Path,
    name: &str,
    instructions: &str,
    text: &str,
) -> Result<SpeechOutput, SpeechError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(SpeechError::EmptyText);
    }

    let voice = choose_voice(instructions, &config.default_voice);
    let input = spoken_text(&config.lead_in, text);
    let path = out_dir.join(naming::output_filename(name, &config.format));
    info!(path = %path.display(), voice, chars = input.chars().count(), "generating speech");

    let audio = synthesizer.synthesize_speech(&input, &voice, &config.format)?;
    if audio.is_empty() {
        return Err(SpeechError::EmptyAudio);
    }
    fs::create_dir_all(out_dir)?;
    fs::write(&path, &audio)?;

    Ok(SpeechOutput {
        path,
        voice,
        bytes: audio.len(),
    })
}
