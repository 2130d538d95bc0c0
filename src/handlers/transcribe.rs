//! # Transcription Upload Handler
//!
//! `POST /transcribe`: accepts a multipart body with one audio file field,
//! hands the validated bytes to the pipeline, and returns the transcript.
//!
//! The multipart parsing here is deliberately a pre-step: the pipeline only
//! ever sees a validated byte buffer plus the original filename, never the
//! transport. Oversized uploads are rejected while the stream is drained so
//! a 100 MiB body never fully buffers in memory.

use crate::{error::AppError, state::AppState};
use actix_multipart::Multipart;
use actix_web::{web, HttpResponse};
use futures_util::stream::StreamExt;
use serde_json::json;

/// Multipart field name carrying the audio file.
const AUDIO_FIELD: &str = "audio";

/// ## Endpoint: `POST /transcribe`
///
/// ## Request:
/// Multipart form data with an audio file field named "audio" (≤ the
/// configured maximum, 10 MiB by default).
///
/// ## Response:
/// ```json
/// { "transcription": "hello\nworld" }
/// ```
/// Errors: 400 when the file is missing or oversized, 500 with a generic
/// message when the pipeline fails.
pub async fn transcribe_audio(
    state: web::Data<AppState>,
    mut payload: Multipart,
) -> Result<HttpResponse, AppError> {
    let max_bytes = state.pipeline.max_audio_bytes();

    let mut audio_data: Option<Vec<u8>> = None;
    let mut filename: Option<String> = None;

    while let Some(item) = payload.next().await {
        let mut field =
            item.map_err(|e| AppError::BadRequest(format!("Multipart error: {}", e)))?;

        // Copy out the metadata before draining the field so the borrow of
        // `field` ends here.
        let (field_name, field_filename) = match field.content_disposition() {
            Some(cd) => (
                cd.get_name().map(|s| s.to_string()),
                cd.get_filename().map(|s| s.to_string()),
            ),
            None => continue,
        };

        if field_name.as_deref() != Some(AUDIO_FIELD) {
            continue;
        }

        filename = field_filename;

        let mut bytes = Vec::new();
        while let Some(chunk) = field.next().await {
            let chunk =
                chunk.map_err(|e| AppError::BadRequest(format!("Failed to read upload: {}", e)))?;
            if bytes.len() + chunk.len() > max_bytes {
                return Err(AppError::PayloadTooLarge(format!(
                    "Audio file exceeds the {} byte limit",
                    max_bytes
                )));
            }
            bytes.extend_from_slice(&chunk);
        }

        audio_data = Some(bytes);
    }

    let audio = audio_data
        .ok_or_else(|| AppError::BadRequest("No audio file provided".to_string()))?;
    let original_name = filename.unwrap_or_else(|| "unknown".to_string());

    // Outcome counters are maintained by the metrics middleware from the
    // response status, so errors can simply propagate.
    let transcription = state.pipeline.transcribe(&audio, &original_name).await?;
    Ok(HttpResponse::Ok().json(json!({ "transcription": transcription })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::TempAudioStore;
    use crate::config::AppConfig;
    use crate::history::HistoryService;
    use crate::pipeline::TranscriptionPipeline;
    use crate::recognition::{
        RecognitionClient, RecognitionConfig, RecognitionError, RecognitionOutcome,
        RecognitionSegment, SegmentAlternative,
    };
    use crate::records::store::testing::MemoryRecordStore;
    use crate::records::RecordStore;
    use actix_web::{test, App};
    use async_trait::async_trait;
    use std::sync::Arc;

    struct OneLineRecognizer;

    #[async_trait]
    impl RecognitionClient for OneLineRecognizer {
        async fn recognize(
            &self,
            _audio: &[u8],
            _config: &RecognitionConfig,
        ) -> Result<RecognitionOutcome, RecognitionError> {
            Ok(RecognitionOutcome {
                segments: vec![RecognitionSegment {
                    alternatives: vec![SegmentAlternative {
                        transcript: "hello from the service".to_string(),
                        confidence: Some(0.99),
                    }],
                }],
            })
        }
    }

    fn test_state(
        dir: &tempfile::TempDir,
        records: Arc<MemoryRecordStore>,
        max_bytes: usize,
    ) -> AppState {
        let pipeline = Arc::new(TranscriptionPipeline::new(
            TempAudioStore::new(dir.path(), max_bytes),
            Arc::new(OneLineRecognizer),
            Arc::clone(&records) as Arc<dyn RecordStore>,
            RecognitionConfig {
                encoding: "LINEAR16".to_string(),
                sample_rate_hertz: 16_000,
                language_code: "en-US".to_string(),
            },
        ));
        let history = HistoryService::new(records as Arc<dyn RecordStore>);
        AppState::new(AppConfig::default(), pipeline, history)
    }

    fn multipart_body(field: &str, file_name: &str, bytes: &[u8]) -> (String, Vec<u8>) {
        let boundary = "abbc761f78ff4d7cb7573b5a23f96ef0";
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n\
                 Content-Type: audio/wav\r\n\r\n",
                boundary, field, file_name
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());
        (
            format!("multipart/form-data; boundary={}", boundary),
            body,
        )
    }

    #[actix_web::test]
    async fn test_transcribe_returns_transcript_and_persists_record() {
        let dir = tempfile::tempdir().unwrap();
        let records = Arc::new(MemoryRecordStore::new());
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(test_state(&dir, Arc::clone(&records), 1024 * 1024)))
                .route("/transcribe", web::post().to(transcribe_audio)),
        )
        .await;

        let (content_type, body) = multipart_body("audio", "clip.wav", b"fake wav bytes");
        let req = test::TestRequest::post()
            .uri("/transcribe")
            .insert_header(("content-type", content_type))
            .set_payload(body)
            .to_request();

        let resp = test::call_service(&app, req).await;
        assert!(resp.status().is_success());

        let json: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(json["transcription"], "hello from the service");

        let persisted = records.snapshot();
        assert_eq!(persisted.len(), 1);
        assert_eq!(persisted[0].audio_name, "clip.wav");
    }

    #[actix_web::test]
    async fn test_transcribe_without_audio_field_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let records = Arc::new(MemoryRecordStore::new());
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(test_state(&dir, Arc::clone(&records), 1024 * 1024)))
                .route("/transcribe", web::post().to(transcribe_audio)),
        )
        .await;

        // A multipart body whose only field is not the audio field
        let (content_type, body) = multipart_body("document", "notes.txt", b"not audio");
        let req = test::TestRequest::post()
            .uri("/transcribe")
            .insert_header(("content-type", content_type))
            .set_payload(body)
            .to_request();

        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status().as_u16(), 400);
        // Nothing was persisted
        assert!(records.snapshot().is_empty());
    }

    #[actix_web::test]
    async fn test_oversized_upload_rejected_while_draining() {
        let dir = tempfile::tempdir().unwrap();
        let records = Arc::new(MemoryRecordStore::new());
        // A 64-byte cap so a modest body is already over the limit
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(test_state(&dir, Arc::clone(&records), 64)))
                .route("/transcribe", web::post().to(transcribe_audio)),
        )
        .await;

        let (content_type, body) = multipart_body("audio", "long.wav", &[0u8; 256]);
        let req = test::TestRequest::post()
            .uri("/transcribe")
            .insert_header(("content-type", content_type))
            .set_payload(body)
            .to_request();

        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status().as_u16(), 400);

        let json: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(json["type"], "payload_too_large");

        // Rejected before reaching the pipeline: no record, no scratch file
        assert!(records.snapshot().is_empty());
        assert_eq!(
            std::fs::read_dir(dir.path()).map(|d| d.count()).unwrap_or(0),
            0
        );
    }
}
