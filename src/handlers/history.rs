//! # History Handler
//!
//! `GET /history`: recent transcription records, newest first.

use crate::{error::AppError, state::AppState};
use actix_web::{web, HttpResponse};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    /// Optional record count; clamped by the history service
    pub limit: Option<u32>,
}

/// ## Endpoint: `GET /history`
///
/// ## Response:
/// ```json
/// [
///   { "audioName": "clip.wav", "transcription": "hello", "date": "2025-01-01T12:00:00Z" }
/// ]
/// ```
pub async fn get_history(
    state: web::Data<AppState>,
    query: web::Query<HistoryQuery>,
) -> Result<HttpResponse, AppError> {
    let records = state.history.list(query.limit).await?;
    Ok(HttpResponse::Ok().json(records))
}
