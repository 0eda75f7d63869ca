//! Record store: where audio file records are queried and finalized.
//!
//! - **Supabase**: PostgREST over HTTPS
//! - **Postgres**: direct SQL via sqlx (feature `database-postgres`)

mod error;
#[cfg(test)]
pub mod memory;
mod models;
#[cfg(feature = "database-postgres")]
mod postgres;
mod postgrest;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
pub use error::{StoreError, StoreResult};
pub use models::{AudioFileRecord, RecordKey, StageStatus, parse_timestamp};
#[cfg(feature = "database-postgres")]
pub use postgres::PostgresRecordStore;
pub use postgrest::PostgrestRecordStore;
use tracing::info;

use crate::{config::RecordStoreConfig, janitor::EligibilityCriteria};

/// Columns every backend selects for a candidate.
pub const RECORD_COLUMNS: [&str; 7] = [
    "device_id",
    "recorded_at",
    "file_path",
    "created_at",
    "transcriptions_status",
    "behavior_features_status",
    "emotion_features_status",
];

#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Return up to `criteria.limit` records matching the predicate, in no
    /// particular order.
    async fn fetch_eligible(&self, criteria: &EligibilityCriteria)
    -> StoreResult<Vec<AudioFileRecord>>;

    /// Count records matching the predicate. `criteria.limit` is ignored.
    async fn count_eligible(&self, criteria: &EligibilityCriteria) -> StoreResult<u64>;

    /// Delete the record if it exists. Deleting a missing record is not an error.
    async fn delete_record(&self, key: &RecordKey) -> StoreResult<()>;

    /// Set `column` to `at` if the record exists and the column is still null.
    async fn mark_tombstone(
        &self,
        key: &RecordKey,
        column: &str,
        at: DateTime<Utc>,
    ) -> StoreResult<()>;

    /// Get the backend type name (for logging/debugging).
    fn backend_name(&self) -> &'static str;
}

/// Create a record store from configuration.
///
/// Returns `None` when no record store is configured.
pub async fn create_record_store(
    config: &RecordStoreConfig,
) -> StoreResult<Option<Arc<dyn RecordStore>>> {
    match config {
        RecordStoreConfig::None => {
            info!("No record store configured");
            Ok(None)
        }
        RecordStoreConfig::Supabase(supabase) => {
            info!(url = %supabase.url, table = %supabase.table, "Using Supabase record store");
            Ok(Some(Arc::new(PostgrestRecordStore::new(supabase)?)))
        }
        #[cfg(feature = "database-postgres")]
        RecordStoreConfig::Postgres(pg) => {
            info!(table = %pg.table, "Using PostgreSQL record store");
            Ok(Some(Arc::new(PostgresRecordStore::connect(pg).await?)))
        }
    }
}
