//! Which records may be deleted.
//!
//! A record is eligible when every processing stage has completed and it was
//! created before the retention cutoff. [`EligibilityCriteria`] carries that
//! predicate; record store backends translate it into their query language
//! and [`EligibilityCriteria::matches`] is its reference evaluation.

use std::{sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, instrument};

use crate::store::{AudioFileRecord, RecordStore, StageStatus, StoreError, StoreResult};

/// Stage status columns that must all be `completed`.
pub const STAGE_COLUMNS: [&str; 3] = [
    "transcriptions_status",
    "behavior_features_status",
    "emotion_features_status",
];

/// Eligibility predicate plus page bound.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EligibilityCriteria {
    /// Records must have been created strictly before this instant.
    pub cutoff: DateTime<Utc>,
    /// Maximum rows to return; `None` for the count-only variant.
    pub limit: Option<u32>,
    /// When set, rows whose tombstone column is non-null are excluded.
    pub tombstone_column: Option<String>,
}

impl EligibilityCriteria {
    /// Criteria for records older than `age` as of `now`.
    pub fn new(now: DateTime<Utc>, age: chrono::Duration) -> Self {
        Self {
            cutoff: cutoff(now, age),
            limit: None,
            tombstone_column: None,
        }
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn excluding_tombstoned(mut self, column: Option<&str>) -> Self {
        self.tombstone_column = column.map(str::to_string);
        self
    }

    /// The same predicate without the page bound.
    pub fn unbounded(&self) -> Self {
        Self {
            limit: None,
            ..self.clone()
        }
    }

    /// Required `(column, value)` equality filters.
    pub fn status_filters(&self) -> impl Iterator<Item = (&'static str, &'static str)> {
        STAGE_COLUMNS
            .into_iter()
            .map(|column| (column, StageStatus::Completed.as_str()))
    }

    /// Evaluate the predicate against one record.
    pub fn matches(&self, record: &AudioFileRecord) -> bool {
        let all_completed = record
            .stage_statuses()
            .iter()
            .all(|status| *status == Some(StageStatus::Completed));
        let old_enough = record.created_at < self.cutoff;
        let open = self.tombstone_column.is_none() || record.tombstoned_at.is_none();
        all_completed && old_enough && open
    }
}

/// `now - age`.
pub fn cutoff(now: DateTime<Utc>, age: chrono::Duration) -> DateTime<Utc> {
    now - age
}

/// Criteria as reported by `/stats`.
#[derive(Debug, Clone, Serialize)]
pub struct CriteriaSummary {
    pub transcriptions_status: &'static str,
    pub behavior_features_status: &'static str,
    pub emotion_features_status: &'static str,
    pub age_threshold_hours: u32,
}

impl CriteriaSummary {
    pub fn new(age_threshold_hours: u32) -> Self {
        let completed = StageStatus::Completed.as_str();
        Self {
            transcriptions_status: completed,
            behavior_features_status: completed,
            emotion_features_status: completed,
            age_threshold_hours,
        }
    }
}

/// Response body of `GET /stats`.
#[derive(Debug, Clone, Serialize)]
pub struct EligibilityStats {
    pub eligible_for_deletion: u64,
    pub cutoff_time: DateTime<Utc>,
    pub criteria: CriteriaSummary,
}

/// Count eligible records and describe the predicate used.
pub async fn eligibility_stats(
    store: &Arc<dyn RecordStore>,
    criteria: &EligibilityCriteria,
    age_threshold_hours: u32,
    call_timeout: Duration,
) -> StoreResult<EligibilityStats> {
    let eligible_for_deletion = count_eligible(store, criteria, call_timeout).await?;
    Ok(EligibilityStats {
        eligible_for_deletion,
        cutoff_time: criteria.cutoff,
        criteria: CriteriaSummary::new(age_threshold_hours),
    })
}

/// Fetch one page of candidates, bounded by `call_timeout`.
#[instrument(skip(store, criteria), fields(cutoff = %criteria.cutoff, limit = ?criteria.limit))]
pub async fn fetch_candidates(
    store: &Arc<dyn RecordStore>,
    criteria: &EligibilityCriteria,
    call_timeout: Duration,
) -> StoreResult<Vec<AudioFileRecord>> {
    let records = tokio::time::timeout(call_timeout, store.fetch_eligible(criteria))
        .await
        .map_err(|_| StoreError::Timeout(call_timeout))??;
    debug!(count = records.len(), "Fetched eligible records");
    Ok(records)
}

/// Count all eligible records, ignoring the page bound.
#[instrument(skip(store, criteria), fields(cutoff = %criteria.cutoff))]
pub async fn count_eligible(
    store: &Arc<dyn RecordStore>,
    criteria: &EligibilityCriteria,
    call_timeout: Duration,
) -> StoreResult<u64> {
    tokio::time::timeout(call_timeout, store.count_eligible(&criteria.unbounded()))
        .await
        .map_err(|_| StoreError::Timeout(call_timeout))?
}
