//! Flashcard image generation with retries.
//!
//! The full request is tried up to `retries` times, sleeping between
//! attempts with a doubling delay. A non-transient failure (bad request,
//! content policy) ends the retries early. When every full attempt fails,
//! one simplified request is made: the first sentence of the prompt at the
//! default size with no quality hint.

use super::ImagingError;
use crate::client::{ClientError, ImageGenerator, ImageRequest};
use crate::config::ImagesConfig;
use crate::naming;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Default size used by the simplified fallback request.
pub const FALLBACK_SIZE: &str = "1024x1024";

#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedImage {
    pub bytes: Vec<u8>,
    /// Full requests made, not counting the fallback.
    pub attempts: u32,
    pub simplified: bool,
}

/// Retry schedule for [`generate_with_retry`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub initial_backoff: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &ImagesConfig) -> Self {
        Self {
            attempts: config.retries.max(1),
            initial_backoff: Duration::from_millis(config.backoff_ms),
        }
    }
}

/// The fallback request for `request`.
pub fn simplified_request(request: &ImageRequest) -> ImageRequest {
    ImageRequest {
        prompt: first_sentence(&request.prompt).to_string(),
        size: FALLBACK_SIZE.to_string(),
        quality: None,
    }
}

/// Text up to and including the first `.`, `!` or `?`, trimmed.
fn first_sentence(prompt: &str) -> &str {
    let prompt = prompt.trim();
    match prompt.find(['.', '!', '?']) {
        Some(end) => prompt[..=end].trim(),
        None => prompt,
    }
}

/// Generate an image, retrying and finally falling back to a simplified
/// request. `sleep` is called with each backoff delay.
pub fn generate_with_retry(
    generator: &dyn ImageGenerator,
    request: &ImageRequest,
    policy: RetryPolicy,
    sleep: &mut dyn FnMut(Duration),
) -> Result<GeneratedImage, ImagingError> {
    let mut delay = policy.initial_backoff;
    let mut attempts = 0;

    while attempts < policy.attempts {
        attempts += 1;
        match generator.generate_image(request) {
            Ok(bytes) if !bytes.is_empty() => {
                return Ok(GeneratedImage {
                    bytes,
                    attempts,
                    simplified: false,
                });
            }
            Ok(_) => warn!(attempt = attempts, "image generation returned no data"),
            Err(e) if !e.is_transient() => {
                warn!(attempt = attempts, error = %e, "image request rejected, not retrying");
                break;
            }
            Err(e) => warn!(attempt = attempts, error = %e, "image generation failed"),
        }
        if attempts < policy.attempts {
            info!(delay_ms = delay.as_millis() as u64, "backing off");
            sleep(delay);
            delay *= 2;
        }
    }

    let fallback = simplified_request(request);
    info!(prompt = %fallback.prompt, "trying simplified image request");
    let bytes = generator
        .generate_image(&fallback)
        .map_err(ImagingError::Generation)?;
    if bytes.is_empty() {
        return Err(ImagingError::Generation(ClientError::Malformed(
            "image generation returned no data".into(),
        )));
    }
    Ok(GeneratedImage {
        bytes,
        attempts,
        simplified: true,
    })
}

/// Generate `<out_dir>/<slug of name>.png` for `prompt`.
pub fn create_image(
    generator: &dyn ImageGenerator,
    config: &ImagesConfig,
    out_dir: &Path,
    name: &str,
    prompt: &str,
) -> Result<(PathBuf, GeneratedImage), ImagingError> {
    let prompt = prompt.trim();
    if prompt.is_empty() {
        return Err(ImagingError::EmptyPrompt);
    }
    let request = ImageRequest {
        prompt: prompt.to_string(),
        size: config.size.clone(),
        quality: None,
    };
    let path = out_dir.join(naming::output_filename(name, "png"));
    info!(path = %path.display(), size = %request.size, "generating image");

    let image = generate_with_retry(
        generator,
        &request,
        RetryPolicy::from_config(config),
        &mut std::thread::sleep,
    )?;
    fs::create_dir_all(out_dir)?;
    fs::write(&path, &image.bytes)?;
    Ok((path, image))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::ScriptedImages;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn request() -> ImageRequest {
        ImageRequest {
            prompt: "A red wool coat on a hanger. Soft light, flat colours.".into(),
            size: "1536x1024".into(),
            quality: Some("high".into()),
        }
    }

    fn policy() -> RetryPolicy {
        RetryPolicy {
            attempts: 3,
            initial_backoff: Duration::from_millis(100),
        }
    }

    fn server_error() -> Result<Vec<u8>, ClientError> {
        Err(ClientError::Status {
            status: 503,
            body: "busy".into(),
        })
    }

    #[test]
    fn first_success_returns_immediately() {
        let images = ScriptedImages::new(vec![Ok(b"png".to_vec())]);
        let mut sleeps = Vec::new();

        let image = generate_with_retry(&images, &request(), policy(), &mut |d| sleeps.push(d)).unwrap();

        assert_eq!(image.attempts, 1);
        assert!(!image.simplified);
        assert!(sleeps.is_empty());
    }

    #[test]
    fn backoff_doubles_between_attempts() {
        let images = ScriptedImages::new(vec![server_error(), server_error(), Ok(b"png".to_vec())]);
        let mut sleeps = Vec::new();

        let image = generate_with_retry(&images, &request(), policy(), &mut |d| sleeps.push(d)).unwrap();

        assert_eq!(image.attempts, 3);
        assert_eq!(sleeps, vec![Duration::from_millis(100), Duration::from_millis(200)]);
    }

    #[test]
    fn falls_back_to_simplified_request() {
        let images = ScriptedImages::new(vec![
            server_error(),
            server_error(),
            server_error(),
            Ok(b"simple".to_vec()),
        ]);

        let image = generate_with_retry(&images, &request(), policy(), &mut |_| {}).unwrap();

        assert!(image.simplified);
        assert_eq!(image.bytes, b"simple");
        let requests = images.requests();
        assert_eq!(requests.len(), 4);
        assert_eq!(
            requests[3],
            ImageRequest {
                prompt: "A red wool coat on a hanger.".into(),
                size: FALLBACK_SIZE.into(),
                quality: None,
            }
        );
    }

    #[test]
    fn rejected_request_skips_retries() {
        let images = ScriptedImages::new(vec![
            Err(ClientError::Status {
                status: 400,
                body: "content policy".into(),
            }),
            Ok(b"simple".to_vec()),
        ]);
        let mut sleeps = Vec::new();

        let image = generate_with_retry(&images, &request(), policy(), &mut |d| sleeps.push(d)).unwrap();

        assert!(image.simplified);
        assert_eq!(image.attempts, 1);
        assert!(sleeps.is_empty());
    }

    #[test]
    fn fallback_failure_is_error() {
        let images = ScriptedImages::new(vec![server_error(), server_error(), server_error(), server_error()]);
        let result = generate_with_retry(&images, &request(), policy(), &mut |_| {});
        assert!(matches!(result, Err(ImagingError::Generation(_))));
    }

    #[test]
    fn first_sentence_without_terminator_is_whole_prompt() {
        assert_eq!(first_sentence("  a cat  "), "a cat");
        assert_eq!(first_sentence("Un chat! Noir."), "Un chat!");
    }

    #[test]
    fn create_image_writes_slugified_png() {
        let tmp = TempDir::new().unwrap();
        let images = ScriptedImages::new(vec![Ok(b"\x89PNG".to_vec())]);
        let config = ImagesConfig::default();

        let (path, image) = create_image(&images, &config, tmp.path(), "Le Manteau", "a coat").unwrap();

        assert_eq!(path, tmp.path().join("le_manteau.png"));
        assert_eq!(fs::read(&path).unwrap(), image.bytes);
        assert_eq!(images.requests()[0].size, config.size);
    }

    #[test]
    fn empty_prompt_rejected() {
        let tmp = TempDir::new().unwrap();
        let images = ScriptedImages::new(vec![]);
        let result = create_image(&images, &ImagesConfig::default(), tmp.path(), "x", "  ");
        assert!(matches!(result, Err(ImagingError::EmptyPrompt)));
    }
}
