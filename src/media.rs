//! Flashcard media for a whole vocabulary list.
//!
//! Every row of a vocabulary CSV gets one image and one audio file, named
//! after the French expression so both sit next to each other:
//!
//! ```text
//! cards/
//! ├── le_manteau.png
//! ├── le_manteau.mp3
//! ├── la_chemise.png
//! └── la_chemise.mp3
//! ```
//!
//! A file that already exists is never regenerated, so an interrupted run can
//! simply be started again. A row that fails is logged and reported; the run
//! moves on to the next one.

use crate::client::{ImageGenerator, ImageRequest, SpeechSynthesizer};
use crate::config::{ImagesConfig, SpeechConfig};
use crate::examples::VocabRow;
use crate::imaging::{self, RetryPolicy, ShrinkOutcome};
use crate::naming;
use crate::speech;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// What happened to one row.
#[derive(Debug, Clone, PartialEq)]
pub enum MediaStatus {
    Created,
    /// The output was already there.
    Skipped,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct MediaOutcome {
    pub french: String,
    pub path: PathBuf,
    pub status: MediaStatus,
}

/// Flashcard image prompt for one row. The English gloss is added when the
/// row has one.
pub fn image_prompt(row: &VocabRow) -> String {
    let subject = if row.english.is_empty() {
        format!("\u{201c}{}\u{201d}", row.french)
    } else {
        format!("\u{201c}{}\u{201d} ({})", row.french, row.english)
    };
    format!(
        "Photorealistic product-style image of {subject}. \
         Centered, plain white background, evenly lit, high detail, no watermark. \
         No text or labels in the image."
    )
}

/// Generate `<slug of french>.png` for every row into `out_dir`.
///
/// With `target_kb`, each new image is shrunk towards that size in place.
/// `sleep` receives the retry backoff delays.
pub fn batch_images(
    generator: &dyn ImageGenerator,
    config: &ImagesConfig,
    rows: &[VocabRow],
    out_dir: &Path,
    target_kb: Option<u64>,
    sleep: &mut dyn FnMut(Duration),
) -> std::io::Result<Vec<MediaOutcome>> {
    fs::create_dir_all(out_dir)?;
    let policy = RetryPolicy::from_config(config);

    let mut outcomes = Vec::with_capacity(rows.len());
    for row in rows {
        let path = out_dir.join(naming::output_filename(&row.french, "png"));
        let status = if path.exists() {
            info!(path = %path.display(), "image exists, skipping");
            MediaStatus::Skipped
        } else {
            let request = ImageRequest {
                prompt: image_prompt(row),
                size: config.size.clone(),
                quality: None,
            };
            info!(french = %row.french, path = %path.display(), "generating image");
            match write_image(generator, &request, policy, &path, target_kb, sleep) {
                Ok(()) => MediaStatus::Created,
                Err(e) => {
                    warn!(french = %row.french, error = %e, "image failed");
                    MediaStatus::Failed(e.to_string())
                }
            }
        };
        outcomes.push(MediaOutcome {
            french: row.french.clone(),
            path,
            status,
        });
    }
    Ok(outcomes)
}

fn write_image(
    generator: &dyn ImageGenerator,
    request: &ImageRequest,
    policy: RetryPolicy,
    path: &Path,
    target_kb: Option<u64>,
    sleep: &mut dyn FnMut(Duration),
) -> Result<(), imaging::ImagingError> {
    let image = imaging::generate_with_retry(generator, request, policy, sleep)?;
    fs::write(path, &image.bytes)?;
    if let Some(target_kb) = target_kb {
        if let ShrinkOutcome::Resized(result) = imaging::shrink_png(path, target_kb)? {
            fs::rename(&result.output, path)?;
        }
    }
    Ok(())
}

/// Speak the French of every row into `<slug of french>.<format>`.
pub fn batch_speech(
    synthesizer: &dyn SpeechSynthesizer,
    config: &SpeechConfig,
    rows: &[VocabRow],
    out_dir: &Path,
    instructions: &str,
) -> Vec<MediaOutcome> {
    let mut outcomes = Vec::with_capacity(rows.len());
    for row in rows {
        let path = out_dir.join(naming::output_filename(&row.french, &config.format));
        let status = if path.exists() {
            info!(path = %path.display(), "audio exists, skipping");
            MediaStatus::Skipped
        } else {
            match speech::speak(synthesizer, config, out_dir, &row.french, instructions, &row.french) {
                Ok(_) => MediaStatus::Created,
                Err(e) => {
                    warn!(french = %row.french, error = %e, "speech failed");
                    MediaStatus::Failed(e.to_string())
                }
            }
        };
        outcomes.push(MediaOutcome {
            french: row.french.clone(),
            path,
            status,
        });
    }
    outcomes
}
