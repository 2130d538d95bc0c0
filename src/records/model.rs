//! # Transcription Records
//!
//! The persisted outcome of one transcription attempt. Every accepted audio
//! submission produces exactly one record: a success record carrying the
//! transcript (or the no-speech sentinel), or a failure record carrying a
//! capped excerpt of the upstream error.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Suffix appended to `audio_name` when the pipeline could not obtain a
/// transcript. History readers rely on it to distinguish failures.
pub const FAILURE_MARKER: &str = " [failed]";

/// Stored in place of an empty transcript when recognition succeeded but
/// found no speech, so every success record has non-empty text.
pub const NO_SPEECH_SENTINEL: &str = "No clear speech detected.";

/// Maximum number of characters of upstream error detail kept in a failure
/// record. The full message goes to the logs only.
pub const ERROR_EXCERPT_MAX_CHARS: usize = 100;

/// One persisted transcription outcome.
///
/// ## JSON shape (history endpoint):
/// ```json
/// { "audioName": "clip.wav", "transcription": "hello\nworld", "date": "2025-01-01T12:00:00Z" }
/// ```
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct TranscriptionRecord {
    /// Store-assigned identifier; internal, not part of the wire shape
    #[serde(skip)]
    pub id: i64,

    #[serde(rename = "audioName")]
    pub audio_name: String,

    #[serde(rename = "transcription")]
    pub transcription_text: String,

    #[serde(rename = "date")]
    pub created_at: DateTime<Utc>,
}

/// A record as handed to the store, before id and timestamp assignment.
#[derive(Debug, Clone)]
pub struct NewTranscriptionRecord {
    pub audio_name: String,
    pub transcription_text: String,
}

impl NewTranscriptionRecord {
    /// Record for a successful transcription.
    pub fn success(audio_name: &str, transcript: &str) -> Self {
        Self {
            audio_name: audio_name.to_string(),
            transcription_text: transcript.to_string(),
        }
    }

    /// Record for a failed transcription attempt.
    ///
    /// Marks the audio name and keeps only a capped excerpt of the error.
    pub fn failure(audio_name: &str, error_detail: &str) -> Self {
        Self {
            audio_name: format!("{}{}", audio_name, FAILURE_MARKER),
            transcription_text: truncate_chars(error_detail, ERROR_EXCERPT_MAX_CHARS),
        }
    }
}

/// Truncate to at most `max_chars` characters without panicking on short
/// input or splitting a multibyte character.
fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => text[..byte_index].to_string(),
        None => text.to_string(),
    }
}
