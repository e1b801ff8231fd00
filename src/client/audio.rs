//! Text-to-speech and transcription endpoints.

use super::multipart::Form;
use super::{ApiClient, ClientError, SpeechSynthesizer, Transcriber};
use serde::Deserialize;
use serde_json::json;

#[derive(Debug, Deserialize)]
struct Transcription {
    text: String,
}

/// MIME type sent with an uploaded recording, from its extension.
pub(crate) fn audio_content_type(filename: &str) -> &'static str {
    let ext = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "wav" => "audio/wav",
        "mp3" | "mpeg" => "audio/mpeg",
        "ogg" | "oga" => "audio/ogg",
        "webm" => "audio/webm",
        "m4a" | "mp4" => "audio/mp4",
        "flac" => "audio/flac",
        _ => "application/octet-stream",
    }
}

impl SpeechSynthesizer for ApiClient {
    fn synthesize_speech(
        &self,
        text: &str,
        voice: &str,
        format: &str,
    ) -> Result<Vec<u8>, ClientError> {
        let payload = json!({
            "model": self.models.speech_model,
            "input": text,
            "voice": voice,
            "response_format": format,
            "speed": self.models.speech_speed,
        });
        let audio = self.post_json_for_bytes("audio/speech", &payload)?;
        if audio.is_empty() {
            return Err(ClientError::Malformed("speech response is empty".into()));
        }
        Ok(audio)
    }
}

impl Transcriber for ApiClient {
    fn transcribe(&self, audio: &[u8], filename: &str) -> Result<String, ClientError> {
        let form = Form::new()
            .text("model", &self.models.transcription_model)
            .text("language", &self.models.transcription_language)
            .text("response_format", "json")
            .file("file", filename, audio_content_type(filename), audio);
        let transcription: Transcription = self.post_multipart("audio/transcriptions", form)?;
        Ok(transcription.text.trim().to_string())
    }
}
