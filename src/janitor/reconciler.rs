//! The batch reconciliation loop.
//!
//! One run fetches a single page of eligible records and, strictly in page
//! order, deletes each record's object and then finalizes the record. Every
//! candidate ends up in exactly one of deleted, skipped or failed.

use std::{sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::{debug, error, info, instrument, warn};

use super::{
    eligibility::{EligibilityCriteria, fetch_candidates},
    finalization::RecordFinalizer,
    object_deletion::{DeletionOutcome, delete_object},
    outcome::{BatchOutcome, OutcomeBuilder},
};
use crate::{
    config::RetentionConfig,
    observability::metrics,
    store::{AudioFileRecord, RecordStore, StoreError},
    storage::ObjectStore,
};

/// Run-level errors. Per-candidate errors never surface here.
#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    #[error("Eligibility query failed: {0}")]
    Query(#[source] StoreError),
}

/// Bounds for a single run.
#[derive(Debug, Clone)]
pub struct ReconcilerSettings {
    pub age: chrono::Duration,
    pub page_size: u32,
    pub deleted_files_cap: usize,
    pub call_timeout: Duration,
    pub dry_run: bool,
}

impl From<&RetentionConfig> for ReconcilerSettings {
    fn from(config: &RetentionConfig) -> Self {
        Self {
            age: config.age(),
            page_size: config.page_size,
            deleted_files_cap: config.deleted_files_cap,
            call_timeout: config.call_timeout(),
            dry_run: config.dry_run,
        }
    }
}

impl Default for ReconcilerSettings {
    fn default() -> Self {
        Self::from(&RetentionConfig::default())
    }
}

pub struct BatchReconciler {
    record_store: Arc<dyn RecordStore>,
    object_store: Arc<dyn ObjectStore>,
    finalizer: Arc<dyn RecordFinalizer>,
    settings: ReconcilerSettings,
    /// Serializes runs within this process.
    run_lock: Mutex<()>,
}

impl BatchReconciler {
    pub fn new(
        record_store: Arc<dyn RecordStore>,
        object_store: Arc<dyn ObjectStore>,
        finalizer: Arc<dyn RecordFinalizer>,
        settings: ReconcilerSettings,
    ) -> Self {
        Self {
            record_store,
            object_store,
            finalizer,
            settings,
            run_lock: Mutex::new(()),
        }
    }

    pub fn settings(&self) -> &ReconcilerSettings {
        &self.settings
    }

    /// Criteria for one page as of `now`.
    pub fn criteria(&self, now: DateTime<Utc>) -> EligibilityCriteria {
        EligibilityCriteria::new(now, self.settings.age)
            .with_limit(self.settings.page_size)
            .excluding_tombstoned(self.finalizer.tombstone_column())
    }

    /// Run one reconciliation pass.
    ///
    /// Fails only when the eligibility query fails; nothing is mutated in that
    /// case. Every other outcome is reported in the returned summary.
    #[instrument(
        skip(self),
        fields(
            record_store = self.record_store.backend_name(),
            object_store = self.object_store.backend_name(),
            finalizer = self.finalizer.name(),
            dry_run = self.settings.dry_run,
        )
    )]
    pub async fn run(&self, now: DateTime<Utc>) -> Result<BatchOutcome, ReconcileError> {
        let _guard = self.run_lock.lock().await;
        let started = std::time::Instant::now();

        let criteria = self.criteria(now);
        info!(cutoff = %criteria.cutoff, limit = self.settings.page_size, "Starting cleanup run");

        let candidates =
            match fetch_candidates(&self.record_store, &criteria, self.settings.call_timeout).await
            {
                Ok(candidates) => candidates,
                Err(e) => {
                    error!(error = %e, "Eligibility query failed");
                    metrics::record_run_error(match e {
                        StoreError::Timeout(_) => "timeout",
                        _ => "query",
                    });
                    return Err(ReconcileError::Query(e));
                }
            };

        info!(candidates = candidates.len(), "Found records eligible for deletion");

        let mut builder = OutcomeBuilder::new(self.settings.deleted_files_cap, self.settings.dry_run);

        for record in &candidates {
            let Some(key) = record.storage_key() else {
                warn!(device_id = %record.device_id, "Record has no file path, skipping");
                builder.record_skipped();
                continue;
            };

            if self.settings.dry_run {
                info!(key, device_id = %record.device_id, "DRY RUN: would delete object and record");
                builder.record_deleted(key, 0);
                continue;
            }

            match delete_object(self.object_store.as_ref(), key, self.settings.call_timeout).await
            {
                DeletionOutcome::Deleted { size } => {
                    info!(key, size, "Deleted object");
                    builder.record_deleted(key, size);
                    self.finalize(record, now).await;
                }
                DeletionOutcome::AlreadyAbsent => {
                    info!(key, "Object already absent");
                    builder.record_skipped();
                    self.finalize(record, now).await;
                }
                DeletionOutcome::Failed(error) => {
                    error!(key, error = %error, "Failed to delete object");
                    builder.record_failed(key, error);
                }
            }
        }

        let outcome = builder.finish();

        metrics::record_file_outcomes("deleted", outcome.deleted_count);
        metrics::record_file_outcomes("skipped", outcome.skipped_count);
        metrics::record_file_outcomes("failed", outcome.failed_count);
        if !self.settings.dry_run {
            metrics::record_bytes_deleted(outcome.total_size_bytes);
        }
        metrics::record_run_duration(self.settings.dry_run, started.elapsed().as_secs_f64());

        info!(
            deleted = outcome.deleted_count,
            failed = outcome.failed_count,
            skipped = outcome.skipped_count,
            total_size_bytes = outcome.total_size_bytes,
            duration_ms = started.elapsed().as_millis() as u64,
            "Cleanup run complete"
        );

        Ok(outcome)
    }

    /// Finalize a record whose object is gone. Failures are logged only; the
    /// record stays eligible and is retried next run.
    async fn finalize(&self, record: &AudioFileRecord, now: DateTime<Utc>) {
        let key = record.key();
        match tokio::time::timeout(self.settings.call_timeout, self.finalizer.finalize(&key, now))
            .await
        {
            Ok(Ok(())) => debug!(key = %key, "Finalized record"),
            Ok(Err(e)) => warn!(key = %key, error = %e, "Failed to finalize record"),
            Err(_) => warn!(key = %key, timeout = ?self.settings.call_timeout, "Timed out finalizing record"),
        }
    }
}
