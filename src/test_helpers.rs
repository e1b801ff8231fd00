//! Shared test utilities for the frflashy test suite.
//!
//! Provides the fixture site and scripted stand-ins for the generation API
//! traits, so tests exercise the cache, feedback and media tools without a
//! network.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = setup_fixtures();
//! let paths = fixture_paths(tmp.path());
//!
//! let generator = ScriptedGenerator::new(vec![Ok(ExamplePair { .. })]);
//! let cache = ExampleCache::new(&db, &generator, 5);
//! cache.get_examples("le manteau", 3);
//! assert_eq!(generator.calls(), 1);
//! ```

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::path::Path;
use tempfile::TempDir;

use crate::client::{
    ClientError, ExampleGenerator, ExamplePair, ImageGenerator, ImageRequest, SpeechSynthesizer,
    Transcriber, Tutor,
};
use crate::config::{PathsConfig, SitePaths};

// =========================================================================
// Fixture setup
// =========================================================================

/// Copy `fixtures/site/` to a temp directory and return it.
///
/// Tests get an isolated copy they can mutate without affecting other tests
/// or the source fixtures.
pub fn setup_fixtures() -> TempDir {
    let tmp = TempDir::new().unwrap();
    let fixtures = Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures/site");
    copy_dir_recursive(&fixtures, tmp.path()).unwrap();
    tmp
}

/// Default paths resolved against a fixture root.
pub fn fixture_paths(root: &Path) -> SitePaths {
    PathsConfig::default().resolve(root)
}

fn copy_dir_recursive(src: &Path, dst: &Path) -> std::io::Result<()> {
    for entry in std::fs::read_dir(src)? {
        let entry = entry?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());

        if src_path.is_dir() {
            std::fs::create_dir_all(&dst_path)?;
            copy_dir_recursive(&src_path, &dst_path)?;
        } else {
            std::fs::copy(&src_path, &dst_path)?;
        }
    }
    Ok(())
}

// =========================================================================
// Scripted collaborators
// =========================================================================

/// Hands out queued example replies in order. An empty queue fails.
pub struct ScriptedGenerator {
    replies: Mutex<VecDeque<Result<ExamplePair, ClientError>>>,
    calls: Mutex<usize>,
}

impl ScriptedGenerator {
    pub fn new(replies: Vec<Result<ExamplePair, ClientError>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            calls: Mutex::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        *self.calls.lock()
    }
}

impl ExampleGenerator for ScriptedGenerator {
    fn generate_example(&self, _expression: &str) -> Result<ExamplePair, ClientError> {
        *self.calls.lock() += 1;
        self.replies
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(ClientError::Malformed("script exhausted".into())))
    }
}

/// Returns fixed audio and records every `(text, voice, format)` request.
pub struct RecordingSynthesizer {
    audio: Vec<u8>,
    requests: Mutex<Vec<(String, String, String)>>,
}

impl RecordingSynthesizer {
    pub fn returning(audio: Vec<u8>) -> Self {
        Self {
            audio,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<(String, String, String)> {
        self.requests.lock().clone()
    }
}

impl SpeechSynthesizer for RecordingSynthesizer {
    fn synthesize_speech(&self, text: &str, voice: &str, format: &str) -> Result<Vec<u8>, ClientError> {
        self.requests
            .lock()
            .push((text.to_string(), voice.to_string(), format.to_string()));
        Ok(self.audio.clone())
    }
}

/// Queued image replies; records every request.
pub struct ScriptedImages {
    replies: Mutex<VecDeque<Result<Vec<u8>, ClientError>>>,
    requests: Mutex<Vec<ImageRequest>>,
}

impl ScriptedImages {
    pub fn new(replies: Vec<Result<Vec<u8>, ClientError>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<ImageRequest> {
        self.requests.lock().clone()
    }
}

impl ImageGenerator for ScriptedImages {
    fn generate_image(&self, request: &ImageRequest) -> Result<Vec<u8>, ClientError> {
        self.requests.lock().push(request.clone());
        self.replies
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(ClientError::Malformed("script exhausted".into())))
    }
}

/// Tutor with one canned reply, or one that always fails.
pub struct FixedTutor {
    reply: Option<String>,
    calls: Mutex<usize>,
}

impl FixedTutor {
    pub fn replying(reply: &str) -> Self {
        Self {
            reply: Some(reply.to_string()),
            calls: Mutex::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            reply: None,
            calls: Mutex::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        *self.calls.lock()
    }
}

impl Tutor for FixedTutor {
    fn pronunciation_feedback(&self, _expected: &str, _heard: &str) -> Result<String, ClientError> {
        *self.calls.lock() += 1;
        self.reply.clone().ok_or(ClientError::Status {
            status: 500,
            body: "tutor down".into(),
        })
    }
}

/// Transcriber that always hears the same text, or always fails.
pub struct FixedTranscriber {
    text: Option<String>,
}

impl FixedTranscriber {
    pub fn hearing(text: &str) -> Self {
        Self {
            text: Some(text.to_string()),
        }
    }

    pub fn failing() -> Self {
        Self { text: None }
    }
}

impl Transcriber for FixedTranscriber {
    fn transcribe(&self, _audio: &[u8], _filename: &str) -> Result<String, ClientError> {
        self.text.clone().ok_or(ClientError::Status {
            status: 500,
            body: "transcription down".into(),
        })
    }
}
