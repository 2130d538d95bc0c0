//! # Transcription Pipeline
//!
//! The core orchestrator: composes the temporary audio store, the recognition
//! client, and the record store to implement "submit audio, get a transcript,
//! persist the outcome, guarantee cleanup."
//!
//! ## Per-request state machine:
//! Received → Stored → Recognizing → {Succeeded, Failed} → Cleaned → Terminal.
//! No request reaches Terminal without passing through Cleaned: once the temp
//! handle exists, it is deleted exactly once on every exit path.
//!
//! ## Outcome rules:
//! - Segment transcripts (first alternative of each segment, in service order)
//!   are joined with newlines; an empty result becomes the no-speech sentinel
//! - Every accepted submission persists exactly one record, success or failure
//! - The external caller sees either the transcript or the single generic
//!   `TranscriptionFailed` error; upstream detail is logged and a capped
//!   excerpt lives only inside the failure record

use std::sync::Arc;

use tracing::{error, info, warn};

use crate::audio::{TempAudioGuard, TempAudioHandle, TempAudioStore};
use crate::error::AppError;
use crate::recognition::{RecognitionClient, RecognitionConfig, RecognitionOutcome};
use crate::records::{NewTranscriptionRecord, RecordStore, NO_SPEECH_SENTINEL};

/// Orchestrates one transcription request end to end.
///
/// Holds no mutable state of its own: concurrent `transcribe` calls share only
/// the record store and the scratch directory, both of which synchronize
/// themselves. No lock is held across any of the await points.
pub struct TranscriptionPipeline {
    temp_store: TempAudioStore,
    recognizer: Arc<dyn RecognitionClient>,
    records: Arc<dyn RecordStore>,
    recognition_config: RecognitionConfig,
}

impl TranscriptionPipeline {
    pub fn new(
        temp_store: TempAudioStore,
        recognizer: Arc<dyn RecognitionClient>,
        records: Arc<dyn RecordStore>,
        recognition_config: RecognitionConfig,
    ) -> Self {
        Self {
            temp_store,
            recognizer,
            records,
            recognition_config,
        }
    }

    /// Maximum accepted audio payload size in bytes.
    pub fn max_audio_bytes(&self) -> usize {
        self.temp_store.max_bytes()
    }

    /// Transcribe one uploaded audio payload.
    ///
    /// ## Algorithm:
    /// 1. Reject oversized payloads before any storage write
    /// 2. Persist the bytes to ephemeral storage and take ownership of the
    ///    handle for the rest of the request
    /// 3. Read the bytes back and invoke the recognition client
    /// 4. Success: append a success record, delete the handle, return the
    ///    transcript. A record-append failure is fatal for the request but
    ///    the handle is still deleted first.
    /// 5. Failure: delete the handle, then best-effort append a failure
    ///    record; if that append itself fails it is logged and swallowed.
    ///    The caller gets the generic `TranscriptionFailed` either way.
    ///
    /// If the caller drops this future mid-flight (client disconnect), the
    /// handle's guard still deletes the scratch file in the background.
    pub async fn transcribe(&self, audio: &[u8], original_name: &str) -> Result<String, AppError> {
        if audio.len() > self.temp_store.max_bytes() {
            return Err(AppError::PayloadTooLarge(format!(
                "Audio file is {} bytes (max: {} bytes)",
                audio.len(),
                self.temp_store.max_bytes()
            )));
        }

        // From here on the handle exists and must be deleted exactly once on
        // every exit path. The guard covers the path no code here can reach:
        // the request future being dropped mid-recognition when the client
        // disconnects.
        let handle = self.temp_store.store(audio, original_name).await?;
        let guard = TempAudioGuard::new(self.temp_store.clone(), handle);

        match self.run_recognition(guard.handle()).await {
            Ok(transcript) => {
                let appended = self
                    .records
                    .append(NewTranscriptionRecord::success(original_name, &transcript))
                    .await;
                guard.delete().await;
                appended?;

                info!(
                    audio_name = %original_name,
                    transcript_chars = transcript.chars().count(),
                    "Transcription succeeded"
                );
                Ok(transcript)
            }
            Err(detail) => {
                guard.delete().await;

                error!(
                    audio_name = %original_name,
                    error = %detail,
                    "Transcription failed"
                );

                // Best-effort audit trail: the caller already sees the
                // generic failure, so a second error must not replace it.
                if let Err(append_err) = self
                    .records
                    .append(NewTranscriptionRecord::failure(original_name, &detail))
                    .await
                {
                    warn!(
                        audio_name = %original_name,
                        error = %append_err,
                        "Failed to persist failure record"
                    );
                }

                Err(AppError::TranscriptionFailed)
            }
        }
    }

    /// Read the stored audio back and run recognition on it.
    ///
    /// Returns the joined transcript on success, or the internal diagnostic
    /// message on any failure. Reading back from the handle keeps the upload
    /// transport decoupled from the recognition call.
    async fn run_recognition(&self, handle: &TempAudioHandle) -> Result<String, String> {
        let bytes = self
            .temp_store
            .read(handle)
            .await
            .map_err(|e| e.to_string())?;

        let outcome = self
            .recognizer
            .recognize(&bytes, &self.recognition_config)
            .await
            .map_err(|e| e.to_string())?;

        Ok(join_transcripts(&outcome))
    }
}

/// Join each segment's first alternative with newlines, in service order.
///
/// An empty outcome (no speech detected) becomes the fixed sentinel so every
/// success record carries non-empty text.
fn join_transcripts(outcome: &RecognitionOutcome) -> String {
    let lines: Vec<&str> = outcome
        .segments
        .iter()
        .filter_map(|segment| segment.alternatives.first())
        .map(|alternative| alternative.transcript.as_str())
        .collect();

    if lines.is_empty() {
        NO_SPEECH_SENTINEL.to_string()
    } else {
        lines.join("\n")
    }
}
