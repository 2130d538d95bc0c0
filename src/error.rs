//! # Error Handling
//!
//! This module defines the crate-wide error type and how each variant is
//! converted into an HTTP response.
//!
//! ## Error Taxonomy:
//! - **PayloadTooLarge**: The uploaded audio exceeds the configured limit (400)
//! - **BadRequest**: Malformed client input (400)
//! - **Storage**: Ephemeral audio storage failed (500)
//! - **Persistence**: The record store is unreachable (500)
//! - **TranscriptionFailed**: The recognition pipeline failed (500)
//! - **ConfigError/Internal**: Server-side problems (500)
//!
//! ## Why TranscriptionFailed carries no message:
//! The external contract is a single generic failure message. Upstream service
//! errors are logged and a capped excerpt is persisted in the failure record,
//! but the raw text never reaches the client. Keeping the variant data-free
//! makes it impossible to leak detail by accident.

use actix_web::{HttpResponse, ResponseError};  // Web framework error handling
use serde_json::json;                          // For creating JSON error responses
use std::fmt;                                  // For implementing Display trait

/// Generic message returned to clients when the transcription pipeline fails.
pub const TRANSCRIPTION_FAILED_MESSAGE: &str =
    "Transcription failed. Please try again later.";

/// Custom error types for the application.
///
/// ## Error Categories:
/// - Client input errors map to 400 responses
/// - Infrastructure errors map to 500 responses
/// - `TranscriptionFailed` is the only error the pipeline surfaces externally
#[derive(Debug)]
pub enum AppError {
    /// Uploaded audio exceeds the configured maximum size
    PayloadTooLarge(String),

    /// Client sent invalid or malformed data
    BadRequest(String),

    /// Ephemeral audio storage could not be written or read
    Storage(String),

    /// The durable record store is unreachable
    Persistence(String),

    /// The recognition pipeline failed; detail is logged, not echoed
    TranscriptionFailed,

    /// Configuration file or environment variable problems
    ConfigError(String),

    /// Internal server errors that fit no other category
    Internal(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::PayloadTooLarge(msg) => write!(f, "Payload too large: {}", msg),
            AppError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            AppError::Storage(msg) => write!(f, "Storage error: {}", msg),
            AppError::Persistence(msg) => write!(f, "Persistence error: {}", msg),
            AppError::TranscriptionFailed => write!(f, "{}", TRANSCRIPTION_FAILED_MESSAGE),
            AppError::ConfigError(msg) => write!(f, "Configuration error: {}", msg),
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

/// Converts each error variant into a JSON HTTP response.
///
/// ## JSON Response Format:
/// ```json
/// {
///   "error": "Audio file is 12582912 bytes (max: 10485760 bytes)",
///   "type": "payload_too_large",
///   "timestamp": "2025-01-01T12:00:00Z"
/// }
/// ```
///
/// `error` is always a plain string so clients can display it directly;
/// `type` is the stable machine-readable discriminant.
///
/// Infrastructure variants (`Storage`, `Persistence`, `Internal`) deliberately
/// respond with a neutral message: their `Display` output may name internal
/// paths or connection strings, which belongs in the logs, not on the wire.
impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        let (status, error_type, message) = match self {
            AppError::PayloadTooLarge(msg) => (
                actix_web::http::StatusCode::BAD_REQUEST,
                "payload_too_large",
                msg.clone(),
            ),
            AppError::BadRequest(msg) => (
                actix_web::http::StatusCode::BAD_REQUEST,
                "bad_request",
                msg.clone(),
            ),
            AppError::Storage(_) => (
                actix_web::http::StatusCode::INTERNAL_SERVER_ERROR,
                "storage_error",
                "Audio storage is currently unavailable".to_string(),
            ),
            AppError::Persistence(_) => (
                actix_web::http::StatusCode::INTERNAL_SERVER_ERROR,
                "persistence_error",
                "Transcription history storage is currently unavailable".to_string(),
            ),
            AppError::TranscriptionFailed => (
                actix_web::http::StatusCode::INTERNAL_SERVER_ERROR,
                "transcription_failed",
                TRANSCRIPTION_FAILED_MESSAGE.to_string(),
            ),
            AppError::ConfigError(msg) => (
                actix_web::http::StatusCode::INTERNAL_SERVER_ERROR,
                "config_error",
                msg.clone(),
            ),
            AppError::Internal(_) => (
                actix_web::http::StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "Internal server error".to_string(),
            ),
        };

        HttpResponse::build(status).json(json!({
            "error": message,
            "type": error_type,
            "timestamp": chrono::Utc::now().to_rfc3339()
        }))
    }
}

/// Automatic conversion from anyhow::Error to AppError.
///
/// Allows using anyhow errors at the application boundary and converting them
/// to our custom error type with `?` when needed.
impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

/// JSON parsing errors are almost always malformed client data, so they map
/// to BadRequest rather than an internal error.
impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::BadRequest(format!("JSON parsing error: {}", err))
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::ConfigError(err.to_string())
    }
}

/// Database errors always mean the record store misbehaved.
impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Persistence(err.to_string())
    }
}
