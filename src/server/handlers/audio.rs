use axum::Json;
use axum::extract::{Multipart, Path, State};
use axum::http::header;
use axum::response::IntoResponse;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::path::Path as FsPath;
use std::sync::Arc;
use std::time::UNIX_EPOCH;
use tracing::{error, info, warn};

use super::blocking;
use crate::feedback;
use crate::naming;
use crate::server::AppState;
use crate::server::response::{ApiError, AppJson};

/// Only these are listed by `/recordings`.
const RECORDING_EXTENSION: &str = "wav";

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub status: &'static str,
    pub filename: String,
    pub transcription: String,
    pub feedback: String,
    pub expected: String,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct RecordingInfo {
    pub filename: String,
    pub size: u64,
    /// Seconds since the Unix epoch.
    pub created: f64,
}

#[derive(Debug, Deserialize)]
pub struct PronounceRequest {
    #[serde(default)]
    pub text: String,
}

// ============================================================================
// Handlers
// ============================================================================

pub async fn upload_audio(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let mut audio: Option<(Option<String>, Vec<u8>)> = None;
    let mut expected = String::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Invalid multipart data: {e}")))?
    {
        match field.name().unwrap_or("") {
            "audio" => {
                let file_name = field.file_name().map(|s| s.to_string());
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::bad_request(format!("Failed to read audio: {e}")))?;
                if data.len() as u64 > state.config.server.max_upload_size {
                    return Err(ApiError::payload_too_large(format!(
                        "File exceeds maximum upload size of {} bytes",
                        state.config.server.max_upload_size
                    )));
                }
                audio = Some((file_name, data.to_vec()));
            }
            "expected_text" => {
                expected = field
                    .text()
                    .await
                    .map_err(|e| ApiError::bad_request(format!("Invalid expected_text: {e}")))?
                    .trim()
                    .to_string();
            }
            _ => {}
        }
    }

    let Some((file_name, data)) = audio else {
        return Err(ApiError::bad_request("No audio file"));
    };

    let filename = recording_filename(file_name.as_deref());
    tokio::fs::create_dir_all(&state.recordings_dir)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to create recordings directory: {e}")))?;
    let path = state.recordings_dir.join(&filename);
    tokio::fs::write(&path, &data)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to save recording: {e}")))?;
    info!(file = %path.display(), bytes = data.len(), "saved recording");

    let transcriber = Arc::clone(&state.transcriber);
    let name = filename.clone();
    let transcription = blocking(move || transcriber.transcribe(&data, &name))
        .await?
        .map_err(|e| {
            error!(file = %filename, error = %e, "transcription failed");
            ApiError::internal(format!("Transcription failed: {e}"))
        })?;

    let tutor = Arc::clone(&state.tutor);
    let heard = transcription.clone();
    let target = expected.clone();
    let feedback = blocking(move || feedback::pronunciation_feedback(tutor.as_ref(), &heard, &target)).await?;

    Ok(Json(UploadResponse {
        status: "success",
        filename,
        transcription,
        feedback,
        expected,
    }))
}

pub async fn list_recordings(State(state): State<Arc<AppState>>) -> Result<Json<Value>, ApiError> {
    let dir = state.recordings_dir.clone();
    let recordings = blocking(move || scan_recordings(&dir))
        .await?
        .map_err(|e| ApiError::internal(format!("Failed to list recordings: {e}")))?;
    Ok(Json(json!({ "recordings": recordings })))
}

pub async fn delete_recording(
    State(state): State<Arc<AppState>>,
    Path(filename): Path<String>,
) -> Result<Json<Value>, ApiError> {
    if !naming::is_plain_filename(&filename) {
        warn!(filename, "rejected recording name");
        return Err(ApiError::bad_request("Invalid filename"));
    }

    let path = state.recordings_dir.join(&filename);
    match tokio::fs::remove_file(&path).await {
        Ok(()) => {
            info!(file = %path.display(), "deleted recording");
            Ok(Json(json!({ "status": "success", "message": format!("Deleted {filename}") })))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(ApiError::not_found("File not found")),
        Err(e) => Err(ApiError::internal(e.to_string())),
    }
}

pub async fn pronounce(
    State(state): State<Arc<AppState>>,
    AppJson(request): AppJson<PronounceRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let text = request.text.trim().to_string();
    if text.is_empty() {
        return Err(ApiError::bad_request("No text provided"));
    }

    let speech = Arc::clone(&state.speech);
    let voice = state.config.speech.default_voice.clone();
    let audio = blocking(move || speech.synthesize_speech(&text, &voice, "mp3"))
        .await?
        .map_err(|e| {
            error!(error = %e, "speech synthesis failed");
            ApiError::internal(e.to_string())
        })?;

    Ok((
        [
            (header::CONTENT_TYPE, "audio/mpeg"),
            (header::CONTENT_DISPOSITION, "inline; filename=\"pronunciation.mp3\""),
        ],
        audio,
    ))
}

// ============================================================================
// Helpers
// ============================================================================

/// Keep a plain uploaded name; otherwise stamp a fresh one.
fn recording_filename(uploaded: Option<&str>) -> String {
    match uploaded.map(str::trim) {
        Some(name) if naming::is_plain_filename(name) => name.to_string(),
        _ => format!(
            "recording_{}.{RECORDING_EXTENSION}",
            chrono::Local::now().format("%Y%m%d_%H%M%S_%3f")
        ),
    }
}

/// `.wav` files in `dir`, newest first. A missing directory lists nothing.
fn scan_recordings(dir: &FsPath) -> std::io::Result<Vec<RecordingInfo>> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e),
    };

    let mut recordings = Vec::new();
    for entry in entries {
        let entry = entry?;
        let path = entry.path();
        let is_recording = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e == RECORDING_EXTENSION);
        let metadata = entry.metadata()?;
        if !is_recording || !metadata.is_file() {
            continue;
        }
        let created = metadata
            .created()
            .or_else(|_| metadata.modified())
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map_or(0.0, |d| d.as_secs_f64());
        recordings.push(RecordingInfo {
            filename: entry.file_name().to_string_lossy().into_owned(),
            size: metadata.len(),
            created,
        });
    }
    newest_first(&mut recordings);
    Ok(recordings)
}

fn newest_first(recordings: &mut [RecordingInfo]) {
    recordings.sort_by(|a, b| b.created.total_cmp(&a.created));
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn plain_upload_name_kept() {
        assert_eq!(recording_filename(Some("take1.wav")), "take1.wav");
    }

    #[test]
    fn unsafe_or_missing_name_replaced() {
        for name in [None, Some("../etc/passwd"), Some(""), Some("a/b.wav")] {
            let generated = recording_filename(name);
            assert!(generated.starts_with("recording_"), "{generated}");
            assert!(generated.ends_with(".wav"));
        }
    }

    #[test]
    fn scan_lists_only_wav_files() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("a.wav"), b"1234").unwrap();
        fs::write(tmp.path().join("b.mp3"), b"12").unwrap();
        fs::create_dir(tmp.path().join("dir.wav")).unwrap();

        let recordings = scan_recordings(tmp.path()).unwrap();

        assert_eq!(recordings.len(), 1);
        assert_eq!(recordings[0].filename, "a.wav");
        assert_eq!(recordings[0].size, 4);
    }

    #[test]
    fn newest_first_orders_by_creation_time() {
        let info = |filename: &str, created: f64| RecordingInfo {
            filename: filename.into(),
            size: 1,
            created,
        };
        let mut recordings = vec![info("old.wav", 100.0), info("new.wav", 300.0), info("mid.wav", 200.0)];

        newest_first(&mut recordings);

        let names: Vec<_> = recordings.iter().map(|r| r.filename.as_str()).collect();
        assert_eq!(names, vec!["new.wav", "mid.wav", "old.wav"]);
    }

    #[test]
    fn scan_missing_dir_is_empty() {
        let tmp = TempDir::new().unwrap();
        assert!(scan_recordings(&tmp.path().join("none")).unwrap().is_empty());
    }
}
