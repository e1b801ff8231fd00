//! Pronunciation feedback for an uploaded recording.
//!
//! ```text
//! no expected text        → "Great job! I heard: '<heard>'"
//! normalized match        → random praise
//! otherwise               → tutor model, or a fixed encouragement if it fails
//! ```

use crate::client::Tutor;
use rand::seq::IndexedRandom;
use tracing::warn;

pub const PRAISE: &[&str] = &[
    "Perfect! Your pronunciation was excellent! 🎉",
    "Bravo! That was spot-on! 👏",
    "Excellent work! You nailed it! ⭐",
    "Outstanding! Your French pronunciation is great! 🌟",
];

/// Lowercase, trim, and drop trailing periods.
pub fn normalize(text: &str) -> String {
    text.to_lowercase().trim().trim_end_matches('.').to_string()
}

pub fn pronunciation_feedback(tutor: &dyn Tutor, heard: &str, expected: &str) -> String {
    let expected = expected.trim();
    if expected.is_empty() {
        return format!("Great job! I heard: '{heard}'");
    }

    if normalize(heard) == normalize(expected) {
        return PRAISE
            .choose(&mut rand::rng())
            .copied()
            .unwrap_or(PRAISE[0])
            .to_string();
    }

    match tutor.pronunciation_feedback(expected, heard) {
        Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
        Ok(_) => fallback(heard, expected),
        Err(e) => {
            warn!(error = %e, "tutor feedback failed");
            fallback(heard, expected)
        }
    }
}

fn fallback(heard: &str, expected: &str) -> String {
    format!("You said '{heard}', trying to say '{expected}'. Keep practicing!")
}
