//! Closing out a record once its object is gone.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{
    config::{FinalizationConfig, FinalizationStrategy},
    store::{RecordKey, RecordStore, StoreResult},
};

/// Strategy for closing out a record.
///
/// Implementations must be idempotent: finalizing an already finalized key
/// succeeds without effect.
#[async_trait]
pub trait RecordFinalizer: Send + Sync {
    async fn finalize(&self, key: &RecordKey, now: DateTime<Utc>) -> StoreResult<()>;

    /// Column that marks a record as finalized, if the strategy keeps rows.
    /// Eligibility excludes rows where it is set.
    fn tombstone_column(&self) -> Option<&str> {
        None
    }

    fn name(&self) -> &'static str;
}

/// Removes the row.
pub struct HardDeleteFinalizer {
    store: Arc<dyn RecordStore>,
}

impl HardDeleteFinalizer {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl RecordFinalizer for HardDeleteFinalizer {
    async fn finalize(&self, key: &RecordKey, _now: DateTime<Utc>) -> StoreResult<()> {
        self.store.delete_record(key).await
    }

    fn name(&self) -> &'static str {
        "hard_delete"
    }
}

/// Keeps the row and stamps a timestamp column.
pub struct TombstoneFinalizer {
    store: Arc<dyn RecordStore>,
    column: String,
}

impl TombstoneFinalizer {
    pub fn new(store: Arc<dyn RecordStore>, column: impl Into<String>) -> Self {
        Self {
            store,
            column: column.into(),
        }
    }
}

#[async_trait]
impl RecordFinalizer for TombstoneFinalizer {
    async fn finalize(&self, key: &RecordKey, now: DateTime<Utc>) -> StoreResult<()> {
        self.store.mark_tombstone(key, &self.column, now).await
    }

    fn tombstone_column(&self) -> Option<&str> {
        Some(&self.column)
    }

    fn name(&self) -> &'static str {
        "tombstone"
    }
}

/// Create the configured finalizer over `store`.
pub fn create_finalizer(
    config: &FinalizationConfig,
    store: Arc<dyn RecordStore>,
) -> Arc<dyn RecordFinalizer> {
    match config.strategy {
        FinalizationStrategy::HardDelete => Arc::new(HardDeleteFinalizer::new(store)),
        FinalizationStrategy::Tombstone => {
            Arc::new(TombstoneFinalizer::new(store, config.tombstone_column.clone()))
        }
    }
}
