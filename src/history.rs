//! # History Query Service
//!
//! Thin read path over the record store: no business logic beyond bounding
//! the requested limit to a sane window.

use std::sync::Arc;

use crate::error::AppError;
use crate::records::{RecordStore, TranscriptionRecord};

/// Records returned when the caller does not ask for a specific count.
pub const DEFAULT_HISTORY_LIMIT: u32 = 10;

/// Upper bound on a caller-requested count.
pub const MAX_HISTORY_LIMIT: u32 = 50;

#[derive(Clone)]
pub struct HistoryService {
    records: Arc<dyn RecordStore>,
}

impl HistoryService {
    pub fn new(records: Arc<dyn RecordStore>) -> Self {
        Self { records }
    }

    /// Most recent transcription records, newest first.
    ///
    /// `limit` is clamped into `1..=MAX_HISTORY_LIMIT`; `None` means the
    /// default window of ten.
    pub async fn list(&self, limit: Option<u32>) -> Result<Vec<TranscriptionRecord>, AppError> {
        let limit = limit
            .unwrap_or(DEFAULT_HISTORY_LIMIT)
            .clamp(1, MAX_HISTORY_LIMIT);
        self.records.recent(limit).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::store::testing::MemoryRecordStore;
    use crate::records::NewTranscriptionRecord;

    async fn seeded_service(count: usize) -> (HistoryService, Arc<MemoryRecordStore>) {
        let store = Arc::new(MemoryRecordStore::new());
        for i in 0..count {
            store
                .append(NewTranscriptionRecord::success(
                    &format!("clip-{}.wav", i),
                    "text",
                ))
                .await
                .unwrap();
        }
        (HistoryService::new(Arc::clone(&store) as Arc<dyn RecordStore>), store)
    }

    #[tokio::test]
    async fn test_default_window_is_ten_newest_first() {
        let (service, _) = seeded_service(15).await;

        let records = service.list(None).await.unwrap();
        assert_eq!(records.len(), 10);
        assert_eq!(records[0].audio_name, "clip-14.wav");
        for pair in records.windows(2) {
            assert!(pair[0].created_at >= pair[1].created_at);
        }
    }

    #[tokio::test]
    async fn test_limit_is_clamped() {
        let (service, _) = seeded_service(60).await;

        // Zero rounds up to one
        assert_eq!(service.list(Some(0)).await.unwrap().len(), 1);
        // Excessive requests are capped
        assert_eq!(
            service.list(Some(1000)).await.unwrap().len(),
            MAX_HISTORY_LIMIT as usize
        );
    }
}
