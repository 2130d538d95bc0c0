//! # Recognition Client
//!
//! The [`RecognitionClient`] contract plus the production adapter that calls
//! the remote speech-recognition REST endpoint.
//!
//! ## Contract notes:
//! - Synchronous from the caller's perspective: one call, one result
//! - No retries; retry policy, if any, belongs to the caller
//! - Errors carry the upstream message so the pipeline can persist a capped
//!   excerpt in the failure record. The message is internal diagnostic data
//!   and must never be echoed to an external client.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

use super::types::{RecognitionConfig, RecognitionOutcome, RecognitionSegment, SegmentAlternative};

/// Failure reported by the recognition boundary.
///
/// Covers upstream rejections, timeouts, and unreachable-service transport
/// errors alike; the pipeline treats them identically.
#[derive(Debug, Clone)]
pub struct RecognitionError {
    message: String,
}

impl RecognitionError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// The upstream diagnostic message, for logging and the failure record.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for RecognitionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for RecognitionError {}

/// Boundary contract: audio bytes plus parameters in, recognized segments out.
///
/// Behind a trait so the pipeline can be exercised with scripted fakes.
#[async_trait]
pub trait RecognitionClient: Send + Sync {
    async fn recognize(
        &self,
        audio: &[u8],
        config: &RecognitionConfig,
    ) -> Result<RecognitionOutcome, RecognitionError>;
}

/// Production adapter calling the remote recognition REST endpoint.
///
/// Audio is sent inline as base64 content together with the configured audio
/// parameters; the response's `results[].alternatives[]` map directly onto
/// [`RecognitionSegment`]s. A response without a `results` field means the
/// service detected no speech and is returned as an empty outcome, not an
/// error.
pub struct RemoteRecognizer {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
}

impl RemoteRecognizer {
    pub fn new(client: reqwest::Client, api_url: String, api_key: String) -> Self {
        Self {
            client,
            api_url,
            api_key,
        }
    }

    fn request_url(&self) -> String {
        if self.api_key.is_empty() {
            self.api_url.clone()
        } else {
            format!("{}?key={}", self.api_url, self.api_key)
        }
    }
}

#[async_trait]
impl RecognitionClient for RemoteRecognizer {
    async fn recognize(
        &self,
        audio: &[u8],
        config: &RecognitionConfig,
    ) -> Result<RecognitionOutcome, RecognitionError> {
        let body = RecognizeRequest {
            config: WireConfig {
                encoding: &config.encoding,
                sample_rate_hertz: config.sample_rate_hertz,
                language_code: &config.language_code,
            },
            audio: WireAudio {
                content: BASE64.encode(audio),
            },
        };

        debug!(
            audio_bytes = audio.len(),
            language = %config.language_code,
            "Sending recognition request"
        );

        let response = self
            .client
            .post(self.request_url())
            .json(&body)
            .send()
            .await
            .map_err(|e| RecognitionError::new(format!("Recognition request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(RecognitionError::new(format!(
                "Recognition service returned {}: {}",
                status, detail
            )));
        }

        let parsed: RecognizeResponse = response.json().await.map_err(|e| {
            RecognitionError::new(format!("Invalid recognition response: {}", e))
        })?;

        Ok(parsed.into_outcome())
    }
}

/// Request body for the recognition endpoint.
#[derive(Debug, Serialize)]
struct RecognizeRequest<'a> {
    config: WireConfig<'a>,
    audio: WireAudio,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WireConfig<'a> {
    encoding: &'a str,
    sample_rate_hertz: u32,
    language_code: &'a str,
}

#[derive(Debug, Serialize)]
struct WireAudio {
    /// Base64-encoded audio payload
    content: String,
}

/// Response body from the recognition endpoint.
///
/// The service omits `results` entirely when no speech was detected.
#[derive(Debug, Deserialize)]
struct RecognizeResponse {
    #[serde(default)]
    results: Vec<WireResult>,
}

#[derive(Debug, Deserialize)]
struct WireResult {
    #[serde(default)]
    alternatives: Vec<WireAlternative>,
}

#[derive(Debug, Deserialize)]
struct WireAlternative {
    #[serde(default)]
    transcript: String,
    confidence: Option<f32>,
}

impl RecognizeResponse {
    fn into_outcome(self) -> RecognitionOutcome {
        let segments = self
            .results
            .into_iter()
            .map(|result| RecognitionSegment {
                alternatives: result
                    .alternatives
                    .into_iter()
                    .map(|alt| SegmentAlternative {
                        transcript: alt.transcript,
                        confidence: alt.confidence,
                    })
                    .collect(),
            })
            .collect();

        RecognitionOutcome { segments }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_with_results_maps_to_segments() {
        let json = r#"{
            "results": [
                {"alternatives": [{"transcript": "hello", "confidence": 0.92}]},
                {"alternatives": [{"transcript": "world"}, {"transcript": "word"}]}
            ]
        }"#;

        let response: RecognizeResponse = serde_json::from_str(json).unwrap();
        let outcome = response.into_outcome();

        assert_eq!(outcome.segments.len(), 2);
        assert_eq!(outcome.segments[0].alternatives[0].transcript, "hello");
        assert_eq!(outcome.segments[0].alternatives[0].confidence, Some(0.92));
        // Alternative order is preserved: first is the most likely
        assert_eq!(outcome.segments[1].alternatives[0].transcript, "world");
        assert_eq!(outcome.segments[1].alternatives.len(), 2);
    }

    #[test]
    fn test_missing_results_is_empty_outcome() {
        let response: RecognizeResponse = serde_json::from_str("{}").unwrap();
        let outcome = response.into_outcome();
        assert!(outcome.is_empty());
    }

    #[test]
    fn test_request_body_uses_camel_case() {
        let body = RecognizeRequest {
            config: WireConfig {
                encoding: "LINEAR16",
                sample_rate_hertz: 16_000,
                language_code: "en-US",
            },
            audio: WireAudio {
                content: BASE64.encode(b"audio"),
            },
        };

        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["config"]["sampleRateHertz"], 16_000);
        assert_eq!(json["config"]["languageCode"], "en-US");
        assert!(json["audio"]["content"].is_string());
    }

    #[test]
    fn test_key_is_appended_when_configured() {
        let with_key = RemoteRecognizer::new(
            reqwest::Client::new(),
            "https://speech.example.com/recognize".to_string(),
            "secret".to_string(),
        );
        assert_eq!(
            with_key.request_url(),
            "https://speech.example.com/recognize?key=secret"
        );

        let without_key = RemoteRecognizer::new(
            reqwest::Client::new(),
            "https://speech.example.com/recognize".to_string(),
            String::new(),
        );
        assert_eq!(
            without_key.request_url(),
            "https://speech.example.com/recognize"
        );
    }
}
