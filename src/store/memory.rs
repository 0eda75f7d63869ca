//! In-memory record store for tests.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use super::{AudioFileRecord, RecordKey, RecordStore, StageStatus, StoreError, StoreResult};
use crate::janitor::EligibilityCriteria;

/// A fully processed record created at `created_at`.
pub fn record(device_id: &str, created_at: DateTime<Utc>, file_path: Option<&str>) -> AudioFileRecord {
    AudioFileRecord {
        device_id: device_id.to_string(),
        recorded_at: created_at,
        file_path: file_path.map(str::to_string),
        created_at,
        transcriptions_status: Some(StageStatus::Completed),
        behavior_features_status: Some(StageStatus::Completed),
        emotion_features_status: Some(StageStatus::Completed),
        tombstoned_at: None,
    }
}

/// Record store double. Rows are returned in insertion order.
#[derive(Default)]
pub struct MemoryRecordStore {
    rows: Mutex<Vec<AudioFileRecord>>,
    query_failure: Mutex<Option<String>>,
    finalize_failure: Mutex<Option<String>>,
    query_delay: Mutex<Option<Duration>>,
    finalized: Mutex<Vec<RecordKey>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, record: AudioFileRecord) {
        self.rows.lock().push(record);
    }

    pub fn fail_queries(&self, message: &str) {
        *self.query_failure.lock() = Some(message.to_string());
    }

    pub fn fail_finalization(&self, message: &str) {
        *self.finalize_failure.lock() = Some(message.to_string());
    }

    pub fn set_query_delay(&self, delay: Duration) {
        *self.query_delay.lock() = Some(delay);
    }

    pub fn rows(&self) -> Vec<AudioFileRecord> {
        self.rows.lock().clone()
    }

    /// Keys passed to `delete_record` or `mark_tombstone`, in call order.
    pub fn finalized_keys(&self) -> Vec<RecordKey> {
        self.finalized.lock().clone()
    }

    async fn before_query(&self) -> StoreResult<()> {
        let delay = *self.query_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        match self.query_failure.lock().clone() {
            Some(body) => Err(StoreError::Api { status: 503, body }),
            None => Ok(()),
        }
    }

    fn before_finalize(&self, key: &RecordKey) -> StoreResult<()> {
        self.finalized.lock().push(key.clone());
        match self.finalize_failure.lock().clone() {
            Some(body) => Err(StoreError::Api { status: 500, body }),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn fetch_eligible(
        &self,
        criteria: &EligibilityCriteria,
    ) -> StoreResult<Vec<AudioFileRecord>> {
        self.before_query().await?;
        let limit = criteria.limit.map_or(usize::MAX, |l| l as usize);
        Ok(self
            .rows
            .lock()
            .iter()
            .filter(|r| criteria.matches(r))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn count_eligible(&self, criteria: &EligibilityCriteria) -> StoreResult<u64> {
        self.before_query().await?;
        Ok(self.rows.lock().iter().filter(|r| criteria.matches(r)).count() as u64)
    }

    async fn delete_record(&self, key: &RecordKey) -> StoreResult<()> {
        self.before_finalize(key)?;
        self.rows.lock().retain(|r| r.key() != *key);
        Ok(())
    }

    async fn mark_tombstone(
        &self,
        key: &RecordKey,
        _column: &str,
        at: DateTime<Utc>,
    ) -> StoreResult<()> {
        self.before_finalize(key)?;
        for row in self.rows.lock().iter_mut() {
            if row.key() == *key && row.tombstoned_at.is_none() {
                row.tombstoned_at = Some(at);
            }
        }
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
