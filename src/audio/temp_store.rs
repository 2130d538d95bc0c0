//! # Temporary Audio Store
//!
//! Persists inbound audio bytes to a scratch directory for the duration of a
//! single transcription request. Files here are never durable: the pipeline
//! deletes them before the request completes, on both success and failure.
//!
//! ## Key Responsibilities:
//! - **Capacity enforcement**: The size limit is checked before any write, so
//!   an oversized upload never touches the filesystem
//! - **Opaque handles**: Callers get a [`TempAudioHandle`] and never build
//!   paths themselves
//! - **Idempotent deletion**: `delete` is called from both the success and
//!   failure branches of the pipeline and must never itself fail
//! - **Abandonment safety**: [`TempAudioGuard`] finishes deletion in the
//!   background when the owning request future is dropped mid-flight

use std::io::ErrorKind;
use std::path::PathBuf;

use tokio::fs;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::AppError;

/// Opaque reference to one temporarily stored audio payload.
///
/// Exclusively owned by a single pipeline invocation from creation until the
/// pipeline deletes it.
#[derive(Debug, Clone)]
pub struct TempAudioHandle {
    /// Location of the scratch file
    pub path: PathBuf,

    /// Filename as submitted by the client (display only, never used on disk)
    pub original_name: String,

    /// Size of the stored payload in bytes
    pub size_bytes: u64,
}

/// Scratch-directory store for uploaded audio.
#[derive(Debug, Clone)]
pub struct TempAudioStore {
    dir: PathBuf,
    max_bytes: usize,
}

impl TempAudioStore {
    pub fn new(dir: impl Into<PathBuf>, max_bytes: usize) -> Self {
        Self {
            dir: dir.into(),
            max_bytes,
        }
    }

    /// Maximum accepted payload size in bytes.
    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    /// Write `bytes` to a freshly named scratch file and return its handle.
    ///
    /// Fails with `PayloadTooLarge` before any filesystem activity when the
    /// payload exceeds the configured maximum. Uses a UUID for the on-disk
    /// name so concurrent uploads of identically named files never collide.
    pub async fn store(&self, bytes: &[u8], original_name: &str) -> Result<TempAudioHandle, AppError> {
        if bytes.len() > self.max_bytes {
            return Err(AppError::PayloadTooLarge(format!(
                "Audio file is {} bytes (max: {} bytes)",
                bytes.len(),
                self.max_bytes
            )));
        }

        fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| AppError::Storage(format!("Failed to create temp directory: {}", e)))?;

        let path = self.dir.join(format!("{}.audio", Uuid::new_v4()));
        fs::write(&path, bytes)
            .await
            .map_err(|e| AppError::Storage(format!("Failed to write temp audio file: {}", e)))?;

        debug!(
            path = %path.display(),
            original_name = %original_name,
            size_bytes = bytes.len(),
            "Stored temporary audio file"
        );

        Ok(TempAudioHandle {
            path,
            original_name: original_name.to_string(),
            size_bytes: bytes.len() as u64,
        })
    }

    /// Read the stored payload back.
    pub async fn read(&self, handle: &TempAudioHandle) -> Result<Vec<u8>, AppError> {
        fs::read(&handle.path)
            .await
            .map_err(|e| AppError::Storage(format!("Failed to read temp audio file: {}", e)))
    }

    /// Delete the scratch file behind `handle`.
    ///
    /// Idempotent and infallible from the caller's perspective: a missing file
    /// is a no-op, and any other I/O error is logged and swallowed. Cleanup
    /// runs on the pipeline's failure branch too, where an error here would
    /// otherwise mask the original failure.
    pub async fn delete(&self, handle: &TempAudioHandle) {
        match fs::remove_file(&handle.path).await {
            Ok(()) => {
                debug!(path = %handle.path.display(), "Deleted temporary audio file");
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                // Already gone, nothing to do
            }
            Err(e) => {
                warn!(
                    path = %handle.path.display(),
                    error = %e,
                    "Failed to delete temporary audio file"
                );
            }
        }
    }
}

/// Owns a [`TempAudioHandle`] for the duration of one request and guarantees
/// the scratch file is deleted even when the owning future never resumes.
///
/// HTTP request futures are dropped when the client disconnects. A plain
/// sequential `delete().await` after the recognition call would then never
/// run, leaking the scratch file forever. The guard closes that gap: normal
/// paths call [`TempAudioGuard::delete`] explicitly (consuming the guard),
/// and if the guard is instead dropped while still armed, `Drop` hands the
/// removal to the runtime as a detached task.
pub struct TempAudioGuard {
    store: TempAudioStore,
    handle: Option<TempAudioHandle>,
}

impl TempAudioGuard {
    pub fn new(store: TempAudioStore, handle: TempAudioHandle) -> Self {
        Self {
            store,
            handle: Some(handle),
        }
    }

    /// The guarded handle. Panics only if called after `delete`, which the
    /// consuming signature makes impossible.
    pub fn handle(&self) -> &TempAudioHandle {
        self.handle
            .as_ref()
            .expect("guard used after explicit delete")
    }

    /// Delete the scratch file now, disarming the guard.
    pub async fn delete(mut self) {
        if let Some(handle) = self.handle.take() {
            self.store.delete(&handle).await;
        }
    }
}

impl Drop for TempAudioGuard {
    fn drop(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;  // Explicitly deleted already
        };

        let path = handle.path;
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                // The owning future was dropped mid-flight; finish the
                // cleanup on the runtime so the request's abandonment cannot
                // leak the scratch file.
                runtime.spawn(async move {
                    match fs::remove_file(&path).await {
                        Ok(()) => {
                            debug!(path = %path.display(), "Deleted abandoned temporary audio file");
                        }
                        Err(e) if e.kind() == ErrorKind::NotFound => {}
                        Err(e) => {
                            warn!(
                                path = %path.display(),
                                error = %e,
                                "Failed to delete abandoned temporary audio file"
                            );
                        }
                    }
                });
            }
            Err(_) => {
                // No runtime (process teardown); fall back to a blocking remove.
                if let Err(e) = std::fs::remove_file(&path) {
                    if e.kind() != ErrorKind::NotFound {
                        warn!(
                            path = %path.display(),
                            error = %e,
                            "Failed to delete abandoned temporary audio file"
                        );
                    }
                }
            }
        }
    }
}
