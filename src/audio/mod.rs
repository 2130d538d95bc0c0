//! # Audio Module
//!
//! Ephemeral storage for uploaded audio awaiting recognition.
//!
//! ## Components:
//! - **temp_store**: Writes uploads to a scratch directory, hands out opaque
//!   handles, and guarantees idempotent deletion for pipeline cleanup, even
//!   when the owning request is abandoned mid-flight

pub mod temp_store;

pub use temp_store::{TempAudioGuard, TempAudioHandle, TempAudioStore};
