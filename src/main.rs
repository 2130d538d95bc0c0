//! # Voice Notes Backend - Main Application Entry Point
//!
//! This is the main entry point for the voice-notes-backend web server.
//! It sets up an Actix-web HTTP server that accepts audio uploads, obtains
//! transcriptions from a remote speech-recognition service, and persists the
//! outcomes as a browsable history.
//!
//! ## Application Architecture:
//! - **config**: Application configuration (TOML files + environment variables)
//! - **state**: Shared application state and metrics
//! - **audio**: Ephemeral storage for uploads awaiting recognition
//! - **recognition**: The remote speech-recognition client boundary
//! - **records**: Durable transcription record storage (SQLite)
//! - **pipeline**: The transcription request orchestrator
//! - **history**: Read path over the record store
//! - **handlers**: HTTP request handlers for API endpoints
//! - **health/middleware/error**: Monitoring, metrics, and HTTP error mapping
//!
//! ## Startup Order:
//! Configuration is loaded and validated first, then the record store pool,
//! schema, and the shared HTTP client are initialized, and only then does the
//! server start accepting requests. Everything the pipeline needs is injected
//! through [`state::AppState`]; there are no ambient connection globals.

mod audio;       // Ephemeral audio storage (audio/ directory)
mod config;      // Configuration management (config.rs)
mod error;       // Error handling types (error.rs)
mod handlers;    // HTTP request handlers (handlers/ directory)
mod health;      // Health check endpoints (health.rs)
mod history;     // History query service (history.rs)
mod middleware;  // Custom middleware (middleware/ directory)
mod pipeline;    // Transcription pipeline orchestrator (pipeline.rs)
mod recognition; // Remote recognition client (recognition/ directory)
mod records;     // Durable record storage (records/ directory)
mod state;       // Application state management (state.rs)

use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use anyhow::Result;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{error, info};
use tracing_actix_web::TracingLogger;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use audio::TempAudioStore;
use config::AppConfig;
use history::HistoryService;
use pipeline::TranscriptionPipeline;
use recognition::{RecognitionClient, RemoteRecognizer};
use records::{RecordStore, SqliteRecordStore};
use state::AppState;

/// Global shutdown signal, set by the signal handler task and polled by the
/// main task so the server can stop gracefully.
static SHUTDOWN_SIGNAL: AtomicBool = AtomicBool::new(false);

/// The main application entry point.
///
/// ## What this function does:
/// 1. **Loads configuration** from files and environment variables
/// 2. **Sets up logging** for debugging and monitoring
/// 3. **Initializes the record store and recognition client** before serving
/// 4. **Configures the HTTP server** with middleware and routes
/// 5. **Handles graceful shutdown** when receiving system signals
#[actix_web::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file (if it exists)
    dotenv::dotenv().ok();

    init_tracing()?;

    let config = AppConfig::load()?;
    config.validate()?;

    info!("Starting voice-notes-backend v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration loaded: {}:{}", config.server.host, config.server.port);

    // Initialize process-wide collaborators before accepting any request:
    // the record store pool and schema, the shared HTTP client, and the
    // scratch directory store. All of them are injected, never ambient.
    let record_store = SqliteRecordStore::connect(&config.storage.database_url).await?;
    record_store.ensure_schema().await?;
    let records: Arc<dyn RecordStore> = Arc::new(record_store);

    let recognizer: Arc<dyn RecognitionClient> = Arc::new(RemoteRecognizer::new(
        reqwest::Client::new(),
        config.recognition.api_url.clone(),
        config.recognition.api_key.clone(),
    ));

    let temp_store = TempAudioStore::new(&config.upload.temp_dir, config.upload.max_audio_bytes);

    let transcription_pipeline = Arc::new(TranscriptionPipeline::new(
        temp_store,
        recognizer,
        Arc::clone(&records),
        config.recognition.to_recognition_config(),
    ));
    let history_service = HistoryService::new(records);

    let app_state = AppState::new(config.clone(), transcription_pipeline, history_service);
    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let allowed_origin = config.server.allowed_origin.clone();

    // Set up signal handlers for graceful shutdown (Ctrl+C, SIGTERM, etc.)
    setup_signal_handlers();

    info!("Starting HTTP server on {}", bind_addr);

    let server = HttpServer::new(move || {
        // Restrict CORS to the configured client origin; "*" opens it up
        // for development setups.
        let cors = if allowed_origin == "*" {
            Cors::default()
                .allow_any_origin()
                .allow_any_method()
                .allow_any_header()
                .max_age(3600)
        } else {
            Cors::default()
                .allowed_origin(&allowed_origin)
                .allow_any_method()
                .allow_any_header()
                .max_age(3600)
        };

        App::new()
            // Share our application state with all request handlers
            .app_data(web::Data::new(app_state.clone()))
            // Add middleware in order (they execute in reverse order for responses)
            .wrap(cors)                           // Handle CORS
            .wrap(TracingLogger::default())       // Structured request logging
            .wrap(middleware::RequestMetrics)     // Collect performance metrics
            // Core API surface
            .route("/transcribe", web::post().to(handlers::transcribe_audio))
            .route("/history", web::get().to(handlers::get_history))
            .route("/health", web::get().to(health::health_check))
            // Monitoring endpoints under /api/v1
            .service(
                web::scope("/api/v1")
                    .route("/health", web::get().to(health::health_check))
                    .route("/metrics", web::get().to(health::detailed_metrics)),
            )
    })
    .bind(&bind_addr)?
    .run();

    // Get a handle to control the server and spawn it in a separate task
    let server_handle = server.handle();
    let server_task = tokio::spawn(server);

    // Wait for either the server to finish OR a shutdown signal
    tokio::select! {
        result = server_task => {
            match result {
                Ok(server_result) => {
                    if let Err(e) = server_result {
                        error!("Server error: {}", e);
                    }
                }
                Err(e) => {
                    error!("Server task error: {}", e);
                }
            }
        }
        _ = wait_for_shutdown() => {
            info!("Shutdown signal received, stopping server...");
            server_handle.stop(true).await;  // Gracefully stop the server
        }
    }

    info!("Server stopped gracefully");
    Ok(())
}

/// Initialize the tracing (logging) system for the application.
///
/// ## Environment Variables:
/// - `RUST_LOG`: Controls what gets logged (e.g., "debug", "voice_notes_backend=debug")
/// - If not set, defaults to "voice_notes_backend=debug,actix_web=info"
fn init_tracing() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "voice_notes_backend=debug,actix_web=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    Ok(())
}

/// Set up signal handlers for graceful shutdown.
///
/// Listens for SIGTERM and SIGINT; whichever arrives first sets the global
/// shutdown flag. Graceful shutdown lets in-flight transcription requests
/// finish (and clean up their temp files) before the process exits.
fn setup_signal_handlers() {
    tokio::spawn(async {
        let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler");
        let mut sigint = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::interrupt())
            .expect("Failed to install SIGINT handler");

        tokio::select! {
            _ = sigterm.recv() => {
                info!("Received SIGTERM");
            }
            _ = sigint.recv() => {
                info!("Received SIGINT");
            }
        }

        SHUTDOWN_SIGNAL.store(true, Ordering::SeqCst);
    });
}

/// Wait for the shutdown signal to be set.
///
/// Simple polling loop; 100ms between checks keeps it off the hot path.
async fn wait_for_shutdown() {
    while !SHUTDOWN_SIGNAL.load(Ordering::SeqCst) {
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;
    }
}
