//! Flashcard images: generation and shrinking.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Generate** | [`ImageGenerator`](crate::client::ImageGenerator) with retry + fallback |
//! | **Decode** | `image::ImageReader` (PNG, JPEG) |
//! | **Resize** | `resize_exact` with `Lanczos3` |
//! | **Encode** | `PngEncoder`, best compression, adaptive filter |
//!
//! The module is split into:
//! - **Calculations**: pure scale math for the shrink search (unit testable)
//! - **Operations**: `shrink_png`, combining calculations with encode/measure
//! - **Generate**: retrying generation and writing the result

mod calculations;
mod generate;
mod operations;

use crate::client::ClientError;
use std::path::PathBuf;
use thiserror::Error;

pub use calculations::{adjust_scale, initial_scale, scaled_dimensions, within_target};
pub use generate::{
    FALLBACK_SIZE, GeneratedImage, RetryPolicy, create_image, generate_with_retry,
    simplified_request,
};
pub use operations::{MAX_SHRINK_ATTEMPTS, ShrinkOutcome, ShrinkResult, shrink_output_path, shrink_png};

#[derive(Error, Debug)]
pub enum ImagingError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("not a PNG file: {0}")]
    NotPng(PathBuf),
    #[error("image prompt is empty")]
    EmptyPrompt,
    #[error("image generation failed: {0}")]
    Generation(ClientError),
}
