//! # Application State Management
//!
//! Shared state accessed by every HTTP request handler: the configuration
//! snapshot, the transcription pipeline, the history read path, and process
//! metrics.
//!
//! ## Thread Safety Pattern:
//! Mutable data lives behind `Arc<RwLock<T>>`:
//! - Arc: many handlers hold a reference to the same state
//! - RwLock: many concurrent readers or one writer, never both
//!
//! The pipeline and history service themselves are immutable once built, so
//! they are shared behind plain `Arc`s. Their collaborators (the sqlx pool,
//! the scratch directory) synchronize themselves; see the pipeline module.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Instant;

use crate::config::AppConfig;
use crate::history::HistoryService;
use crate::pipeline::TranscriptionPipeline;

/// The main application state shared across all HTTP request handlers.
///
/// Built once in `main` after the record store, HTTP client, and schema have
/// been initialized, then injected via `web::Data`. Nothing here is an
/// ambient global.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration snapshot
    pub config: Arc<RwLock<AppConfig>>,

    /// The transcription request pipeline (core orchestrator)
    pub pipeline: Arc<TranscriptionPipeline>,

    /// Read path over the transcription record store
    pub history: HistoryService,

    /// Performance metrics (constantly being updated by requests)
    pub metrics: Arc<RwLock<AppMetrics>>,

    /// When the server started
    pub start_time: Instant,
}

/// Performance metrics collected across all HTTP requests.
#[derive(Debug, Default, Clone)]
pub struct AppMetrics {
    /// Total number of HTTP requests processed since server start
    pub request_count: u64,

    /// Total number of errors encountered since server start
    pub error_count: u64,

    /// Transcription requests that returned a transcript
    pub transcriptions_succeeded: u64,

    /// Transcription requests that failed in the pipeline
    pub transcriptions_failed: u64,

    /// Detailed metrics for each API endpoint (e.g. "POST /transcribe")
    pub endpoint_metrics: HashMap<String, EndpointMetric>,
}

/// Detailed performance metrics for a specific API endpoint.
#[derive(Debug, Default, Clone)]
pub struct EndpointMetric {
    /// Number of requests to this specific endpoint
    pub request_count: u64,

    /// Total time spent processing all requests to this endpoint (milliseconds)
    pub total_duration_ms: u64,

    /// Number of errors that occurred for this endpoint
    pub error_count: u64,
}

impl EndpointMetric {
    pub fn average_duration_ms(&self) -> f64 {
        if self.request_count > 0 {
            self.total_duration_ms as f64 / self.request_count as f64
        } else {
            0.0
        }
    }

    pub fn error_rate(&self) -> f64 {
        if self.request_count > 0 {
            self.error_count as f64 / self.request_count as f64
        } else {
            0.0
        }
    }
}

impl AppState {
    pub fn new(
        config: AppConfig,
        pipeline: Arc<TranscriptionPipeline>,
        history: HistoryService,
    ) -> Self {
        Self {
            config: Arc::new(RwLock::new(config)),
            pipeline,
            history,
            metrics: Arc::new(RwLock::new(AppMetrics::default())),
            start_time: Instant::now(),
        }
    }

    /// Get a copy of the current configuration.
    ///
    /// Cloning releases the read lock immediately so other requests are not
    /// blocked; AppConfig is cheap to clone.
    pub fn get_config(&self) -> AppConfig {
        self.config.read().unwrap().clone()
    }

    /// Get a copy of the current metrics.
    pub fn get_metrics_snapshot(&self) -> AppMetrics {
        self.metrics.read().unwrap().clone()
    }

    pub fn get_uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    pub fn increment_request_count(&self) {
        self.metrics.write().unwrap().request_count += 1;
    }

    pub fn increment_error_count(&self) {
        self.metrics.write().unwrap().error_count += 1;
    }

    pub fn record_transcription_success(&self) {
        self.metrics.write().unwrap().transcriptions_succeeded += 1;
    }

    pub fn record_transcription_failure(&self) {
        self.metrics.write().unwrap().transcriptions_failed += 1;
    }

    /// Record one request against a specific endpoint's metrics.
    pub fn record_endpoint_request(&self, endpoint: &str, duration_ms: u64, is_error: bool) {
        let mut metrics = self.metrics.write().unwrap();
        let entry = metrics
            .endpoint_metrics
            .entry(endpoint.to_string())
            .or_default();
        entry.request_count += 1;
        entry.total_duration_ms += duration_ms;
        if is_error {
            entry.error_count += 1;
        }
    }
}
