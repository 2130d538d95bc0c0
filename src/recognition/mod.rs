//! # Recognition Module
//!
//! Boundary between the transcription pipeline and the remote
//! speech-recognition service.
//!
//! ## Components:
//! - **types**: Request parameters and the segment/alternative result shape
//! - **client**: The [`RecognitionClient`] contract and the reqwest-backed
//!   adapter that talks to the remote service
//!
//! The adapter is a pure transformation from bytes plus parameters to a
//! result or an error. It never retries and never touches persisted state;
//! both of those concerns belong to the caller.

pub mod client;
pub mod types;

pub use client::{RecognitionClient, RecognitionError, RemoteRecognizer};
pub use types::{RecognitionConfig, RecognitionOutcome, RecognitionSegment, SegmentAlternative};
