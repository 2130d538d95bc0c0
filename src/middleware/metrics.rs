use crate::state::AppState;
use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::Method,
    web, Error,
};
use futures_util::future::LocalBoxFuture;
use std::{
    future::{ready, Ready},
    time::Instant,
};

/// Route whose outcomes feed the transcription success/failure counters.
const TRANSCRIBE_PATH: &str = "/transcribe";

pub struct RequestMetrics;

impl<S, B> Transform<S, ServiceRequest> for RequestMetrics
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = RequestMetricsService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RequestMetricsService { service }))
    }
}

pub struct RequestMetricsService<S> {
    service: S,
}

impl<S, B> Service<ServiceRequest> for RequestMetricsService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let start_time = Instant::now();
        let method = req.method().clone();
        let path = req.uri().path().to_string();
        let endpoint = format!("{} {}", method, path);

        if let Some(app_state) = req.app_data::<web::Data<AppState>>() {
            app_state.increment_request_count();
        }

        let fut = self.service.call(req);

        Box::pin(async move {
            let response = fut.await?;
            let duration_ms = start_time.elapsed().as_millis() as u64;

            let status = response.status();
            let is_error = status.is_client_error() || status.is_server_error();

            if let Some(app_state) = response.request().app_data::<web::Data<AppState>>() {
                app_state.record_endpoint_request(&endpoint, duration_ms, is_error);

                if is_error {
                    app_state.increment_error_count();
                }

                // Transcription outcome counters live here rather than in the
                // handler so every exit path is counted, including errors the
                // handler surfaces via `?`. Client errors (malformed or
                // oversized uploads) are neither: the pipeline never ran.
                if method == Method::POST && path == TRANSCRIBE_PATH {
                    if status.is_success() {
                        app_state.record_transcription_success();
                    } else if status.is_server_error() {
                        app_state.record_transcription_failure();
                    }
                }
            }

            Ok(response)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::TempAudioStore;
    use crate::config::AppConfig;
    use crate::error::AppError;
    use crate::history::HistoryService;
    use crate::pipeline::TranscriptionPipeline;
    use crate::recognition::{
        RecognitionClient, RecognitionConfig, RecognitionError, RecognitionOutcome,
    };
    use crate::records::store::testing::MemoryRecordStore;
    use crate::records::RecordStore;
    use actix_web::{test, App, HttpResponse};
    use async_trait::async_trait;
    use std::sync::Arc;

    struct SilentRecognizer;

    #[async_trait]
    impl RecognitionClient for SilentRecognizer {
        async fn recognize(
            &self,
            _audio: &[u8],
            _config: &RecognitionConfig,
        ) -> Result<RecognitionOutcome, RecognitionError> {
            Ok(RecognitionOutcome { segments: vec![] })
        }
    }

    fn test_state(dir: &tempfile::TempDir) -> AppState {
        let records: Arc<dyn RecordStore> = Arc::new(MemoryRecordStore::new());
        let pipeline = Arc::new(TranscriptionPipeline::new(
            TempAudioStore::new(dir.path(), 1024),
            Arc::new(SilentRecognizer),
            Arc::clone(&records),
            RecognitionConfig {
                encoding: "LINEAR16".to_string(),
                sample_rate_hertz: 16_000,
                language_code: "en-US".to_string(),
            },
        ));
        let history = HistoryService::new(records);
        AppState::new(AppConfig::default(), pipeline, history)
    }

    async fn ok_handler() -> HttpResponse {
        HttpResponse::Ok().finish()
    }

    async fn failing_handler() -> Result<HttpResponse, AppError> {
        Err(AppError::TranscriptionFailed)
    }

    #[actix_web::test]
    async fn test_transcribe_outcomes_counted_by_status() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(&dir);
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state.clone()))
                .wrap(RequestMetrics)
                .route("/transcribe", web::post().to(ok_handler)),
        )
        .await;

        let resp = test::call_service(
            &app,
            test::TestRequest::post().uri("/transcribe").to_request(),
        )
        .await;
        assert!(resp.status().is_success());

        let metrics = state.get_metrics_snapshot();
        assert_eq!(metrics.transcriptions_succeeded, 1);
        assert_eq!(metrics.transcriptions_failed, 0);
        assert_eq!(metrics.request_count, 1);
    }

    #[actix_web::test]
    async fn test_pipeline_failure_counts_as_failed_transcription() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(&dir);
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state.clone()))
                .wrap(RequestMetrics)
                .route("/transcribe", web::post().to(failing_handler)),
        )
        .await;

        let resp = test::call_service(
            &app,
            test::TestRequest::post().uri("/transcribe").to_request(),
        )
        .await;
        assert_eq!(resp.status().as_u16(), 500);

        let metrics = state.get_metrics_snapshot();
        assert_eq!(metrics.transcriptions_succeeded, 0);
        assert_eq!(metrics.transcriptions_failed, 1);
        assert_eq!(metrics.error_count, 1);

        let endpoint = metrics.endpoint_metrics.get("POST /transcribe").unwrap();
        assert_eq!(endpoint.request_count, 1);
        assert_eq!(endpoint.error_count, 1);
    }

    #[actix_web::test]
    async fn test_other_routes_do_not_touch_transcription_counters() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(&dir);
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state.clone()))
                .wrap(RequestMetrics)
                .route("/history", web::get().to(ok_handler)),
        )
        .await;

        let resp = test::call_service(
            &app,
            test::TestRequest::get().uri("/history").to_request(),
        )
        .await;
        assert!(resp.status().is_success());

        let metrics = state.get_metrics_snapshot();
        assert_eq!(metrics.transcriptions_succeeded, 0);
        assert_eq!(metrics.transcriptions_failed, 0);
        assert_eq!(metrics.request_count, 1);
    }
}
