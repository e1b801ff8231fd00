//! Blocking client for the generation API (chat, speech, transcription, images).
//!
//! Every capability the rest of the crate needs is a small trait:
//!
//! | Trait | Used by |
//! |-------|---------|
//! | [`ExampleGenerator`] | example cache |
//! | [`Tutor`] | pronunciation feedback |
//! | [`Transcriber`] | `/upload-audio` |
//! | [`SpeechSynthesizer`] | `speak`, `/pronounce` |
//! | [`ImageGenerator`] | `image` |
//!
//! [`ApiClient`] implements all of them against an OpenAI-compatible HTTP API.
//! Tests substitute in-memory fakes. Clients are built explicitly from
//! [`crate::config`] values and passed in; there is no global client.

mod audio;
mod chat;
mod images;
mod multipart;

pub use chat::{EXAMPLE_SYSTEM_PROMPT, TUTOR_SYSTEM_PROMPT, parse_example_pair};
pub use images::ImageRequest;

use crate::config::SiteConfig;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;
use ureq::Agent;
use ureq::http::Response;

/// Global timeout for one API call. Image generation is the slowest.
const DEFAULT_TIMEOUT: u64 = 120;

/// Cap on binary response bodies (audio, images).
const MAX_BINARY_RESPONSE: u64 = 64 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] ureq::Error),
    #[error("API error: {status} - {body}")]
    Status { status: u16, body: String },
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unexpected response: {0}")]
    Malformed(String),
    #[error("invalid base64 payload: {0}")]
    Decode(#[from] base64::DecodeError),
}

impl ClientError {
    /// Worth retrying: transport failures, rate limiting and server errors.
    pub fn is_transient(&self) -> bool {
        match self {
            ClientError::Http(_) => true,
            ClientError::Status { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

/// One generated example sentence and its translation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExamplePair {
    #[serde(default)]
    pub french: String,
    #[serde(default)]
    pub english: String,
}

pub trait ExampleGenerator: Send + Sync {
    /// One simple sentence using `expression`, with its English translation.
    fn generate_example(&self, expression: &str) -> Result<ExamplePair, ClientError>;
}

pub trait Tutor: Send + Sync {
    /// Short encouraging feedback comparing what was heard with what was meant.
    fn pronunciation_feedback(&self, expected: &str, heard: &str) -> Result<String, ClientError>;
}

pub trait Transcriber: Send + Sync {
    fn transcribe(&self, audio: &[u8], filename: &str) -> Result<String, ClientError>;
}

pub trait SpeechSynthesizer: Send + Sync {
    /// Encoded audio for `text` spoken by `voice`, in `format` (`mp3`, `wav`, ...).
    fn synthesize_speech(&self, text: &str, voice: &str, format: &str)
    -> Result<Vec<u8>, ClientError>;
}

pub trait ImageGenerator: Send + Sync {
    /// Encoded image bytes (PNG for the default model).
    fn generate_image(&self, request: &ImageRequest) -> Result<Vec<u8>, ClientError>;
}

/// Model names and tuning picked from the site config.
#[derive(Debug, Clone)]
pub struct ModelSettings {
    pub examples_model: String,
    pub tutor_model: String,
    pub transcription_model: String,
    pub transcription_language: String,
    pub speech_model: String,
    pub speech_speed: f32,
    pub image_model: String,
}

impl ModelSettings {
    pub fn from_config(config: &SiteConfig) -> Self {
        Self {
            examples_model: config.examples.model.clone(),
            tutor_model: config.feedback.model.clone(),
            transcription_model: config.feedback.transcription_model.clone(),
            transcription_language: config.feedback.language.clone(),
            speech_model: config.speech.model.clone(),
            speech_speed: config.speech.speed,
            image_model: config.images.model.clone(),
        }
    }
}

/// HTTP client for an OpenAI-compatible API.
pub struct ApiClient {
    agent: Agent,
    base_url: String,
    api_key: String,
    models: ModelSettings,
}

impl ApiClient {
    pub fn new(base_url: &str, api_key: &str, models: ModelSettings) -> Self {
        let agent = Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(DEFAULT_TIMEOUT)))
            .http_status_as_error(false)
            .build()
            .into();

        Self {
            agent,
            base_url: base_url.trim_end_matches('/').to_owned(),
            api_key: api_key.to_owned(),
            models,
        }
    }

    pub fn models(&self) -> &ModelSettings {
        &self.models
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn bearer(&self) -> String {
        format!("Bearer {}", self.api_key)
    }

    /// POST a JSON payload and decode a JSON response.
    fn post_json<P: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        payload: &P,
    ) -> Result<T, ClientError> {
        let url = self.url(path);
        debug!(url = %url, "POST");
        let response = self
            .agent
            .post(&url)
            .header("Authorization", &self.bearer())
            .header("Accept", "application/json")
            .send_json(payload)?;
        Ok(check_status(response)?.read_json()?)
    }

    /// POST a JSON payload and return the raw response body.
    fn post_json_for_bytes<P: Serialize>(
        &self,
        path: &str,
        payload: &P,
    ) -> Result<Vec<u8>, ClientError> {
        let url = self.url(path);
        debug!(url = %url, "POST");
        let response = self
            .agent
            .post(&url)
            .header("Authorization", &self.bearer())
            .send_json(payload)?;
        let mut body = check_status(response)?;
        Ok(body.with_config().limit(MAX_BINARY_RESPONSE).read_to_vec()?)
    }

    /// POST a multipart form and decode a JSON response.
    fn post_multipart<T: DeserializeOwned>(
        &self,
        path: &str,
        form: multipart::Form,
    ) -> Result<T, ClientError> {
        let url = self.url(path);
        debug!(url = %url, "POST multipart");
        let (content_type, body) = form.finish();
        let response = self
            .agent
            .post(&url)
            .header("Authorization", &self.bearer())
            .header("Content-Type", &content_type)
            .header("Accept", "application/json")
            .send(&body[..])?;
        Ok(check_status(response)?.read_json()?)
    }

    /// GET an absolute URL and return the body.
    fn download(&self, url: &str) -> Result<Vec<u8>, ClientError> {
        debug!(url, "GET");
        let response = self.agent.get(url).call()?;
        let mut body = check_status(response)?;
        Ok(body.with_config().limit(MAX_BINARY_RESPONSE).read_to_vec()?)
    }
}

/// Turn an error status into [`ClientError::Status`], keeping the body text.
fn check_status(response: Response<ureq::Body>) -> Result<ureq::Body, ClientError> {
    let status = response.status().as_u16();
    let mut body = response.into_body();
    if status >= 400 {
        let text = body
            .read_to_string()
            .unwrap_or_else(|_| "(unable to read error body)".to_string());
        return Err(ClientError::Status { status, body: text });
    }
    Ok(body)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> ModelSettings {
        ModelSettings::from_config(&SiteConfig::default())
    }

    #[test]
    fn settings_follow_config() {
        let models = settings();
        assert_eq!(models.examples_model, "gpt-4.1-mini");
        assert_eq!(models.tutor_model, "gpt-4o");
        assert_eq!(models.transcription_model, "whisper-1");
        assert_eq!(models.transcription_language, "fr");
        assert_eq!(models.speech_model, "gpt-4o-mini-tts");
    }

    #[test]
    fn url_joins_without_double_slash() {
        let client = ApiClient::new("http://localhost:9/v1/", "k", settings());
        assert_eq!(client.url("/chat/completions"), "http://localhost:9/v1/chat/completions");
        assert_eq!(client.url("audio/speech"), "http://localhost:9/v1/audio/speech");
    }

    #[test]
    fn transient_errors() {
        let status = |status| ClientError::Status {
            status,
            body: String::new(),
        };
        assert!(status(429).is_transient());
        assert!(status(503).is_transient());
        assert!(!status(400).is_transient());
        assert!(!ClientError::Malformed("x".into()).is_transient());
    }
}
