//! PNG shrinking.
//!
//! Flashcard images come back from generation at full resolution, far larger
//! than a card needs. `shrink_png` searches for a scale whose re-encoded PNG
//! lands within 10% of a target size and writes it next to the source as
//! `<stem>_resized.png`. The source is never modified.

use super::ImagingError;
use super::calculations::{adjust_scale, initial_scale, scaled_dimensions, within_target};
use image::codecs::png::{CompressionType, FilterType as PngFilter, PngEncoder};
use image::imageops::FilterType;
use image::{DynamicImage, ImageReader};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Resize attempts before settling for the closest result.
pub const MAX_SHRINK_ATTEMPTS: u32 = 10;

#[derive(Debug, Clone, PartialEq)]
pub enum ShrinkOutcome {
    /// The source is already at or below the target; nothing written.
    AlreadySmall { size_bytes: u64 },
    Resized(ShrinkResult),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ShrinkResult {
    pub output: PathBuf,
    pub original_bytes: u64,
    pub final_bytes: u64,
    pub width: u32,
    pub height: u32,
    pub attempts: u32,
    /// False when the attempts ran out and the last result was kept.
    pub within_target: bool,
}

/// `<stem>_resized.png` next to `source`.
pub fn shrink_output_path(source: &Path) -> PathBuf {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    source.with_file_name(format!("{stem}_resized.png"))
}

/// Shrink the PNG at `source` towards `target_kb` kilobytes.
pub fn shrink_png(source: &Path, target_kb: u64) -> Result<ShrinkOutcome, ImagingError> {
    let is_png = source
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("png"));
    if !is_png {
        return Err(ImagingError::NotPng(source.to_path_buf()));
    }

    let original_bytes = fs::metadata(source)?.len();
    let target_bytes = target_kb * 1024;
    if original_bytes <= target_bytes {
        info!(
            path = %source.display(),
            size_kb = original_bytes / 1024,
            target_kb,
            "already within target, nothing to do"
        );
        return Ok(ShrinkOutcome::AlreadySmall {
            size_bytes: original_bytes,
        });
    }

    let img = ImageReader::open(source)?.with_guessed_format()?.decode()?;
    let source_dims = (img.width(), img.height());
    info!(
        path = %source.display(),
        width = source_dims.0,
        height = source_dims.1,
        size_kb = original_bytes / 1024,
        target_kb,
        "shrinking"
    );

    let mut scale = initial_scale(original_bytes, target_bytes);
    let mut best: Option<(Vec<u8>, (u32, u32))> = None;
    let mut attempts = 0;
    let mut hit = false;

    while attempts < MAX_SHRINK_ATTEMPTS {
        attempts += 1;
        let (width, height) = scaled_dimensions(source_dims, scale);
        let encoded = encode_png(&img.resize_exact(width, height, FilterType::Lanczos3))?;
        let size = encoded.len() as u64;
        debug!(attempt = attempts, width, height, scale, size_kb = size / 1024, "shrink attempt");

        hit = within_target(size, target_bytes);
        let next_scale = adjust_scale(scale, size, target_bytes);
        best = Some((encoded, (width, height)));
        if hit {
            break;
        }
        scale = next_scale;
    }

    let Some((encoded, (width, height))) = best else {
        return Ok(ShrinkOutcome::AlreadySmall {
            size_bytes: original_bytes,
        });
    };

    let output = shrink_output_path(source);
    fs::write(&output, &encoded)?;
    let final_bytes = encoded.len() as u64;

    if !hit {
        warn!(attempts, size_kb = final_bytes / 1024, target_kb, "kept closest result");
    }
    info!(path = %output.display(), width, height, size_kb = final_bytes / 1024, "wrote resized image");

    Ok(ShrinkOutcome::Resized(ShrinkResult {
        output,
        original_bytes,
        final_bytes,
        width,
        height,
        attempts,
        within_target: hit,
    }))
}

fn encode_png(img: &DynamicImage) -> Result<Vec<u8>, ImagingError> {
    let mut buf = Vec::new();
    let encoder = PngEncoder::new_with_quality(&mut buf, CompressionType::Best, PngFilter::Adaptive);
    img.write_with_encoder(encoder)?;
    Ok(buf)
}
