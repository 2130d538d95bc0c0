//! # Records Module
//!
//! Durable storage for transcription outcomes.
//!
//! ## Components:
//! - **model**: The persisted record shape plus the failure-marker and
//!   no-speech-sentinel conventions
//! - **store**: The [`RecordStore`] contract and its SQLite implementation

pub mod model;
pub mod store;

pub use model::{NewTranscriptionRecord, TranscriptionRecord, FAILURE_MARKER, NO_SPEECH_SENTINEL};
pub use store::{RecordStore, SqliteRecordStore};
