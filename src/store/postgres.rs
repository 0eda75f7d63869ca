//! PostgreSQL record store over a direct sqlx connection pool.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row, postgres::PgRow};
use tracing::{debug, instrument};

use super::{AudioFileRecord, RECORD_COLUMNS, RecordKey, RecordStore, StageStatus, StoreResult};
use crate::{config::PostgresConfig, janitor::EligibilityCriteria};

pub struct PostgresRecordStore {
    pool: PgPool,
    table: String,
}

impl PostgresRecordStore {
    pub async fn connect(config: &PostgresConfig) -> StoreResult<Self> {
        let pool = sqlx::postgres::PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
            .connect(&config.url)
            .await?;

        Ok(Self::new(pool, config.table.clone()))
    }

    /// `table` must already be validated as a plain identifier.
    pub fn new(pool: PgPool, table: String) -> Self {
        Self { pool, table }
    }

    /// WHERE clause for the eligibility predicate. `$1` is the status value
    /// and `$2` the cutoff.
    fn where_clause(criteria: &EligibilityCriteria) -> String {
        let mut clause = criteria
            .status_filters()
            .map(|(column, _)| format!("{column}::text = $1"))
            .collect::<Vec<_>>()
            .join(" AND ");
        clause.push_str(" AND created_at < $2");
        if let Some(column) = &criteria.tombstone_column {
            clause.push_str(&format!(" AND {column} IS NULL"));
        }
        clause
    }

    fn select_list(criteria: &EligibilityCriteria) -> String {
        let mut columns: Vec<String> = RECORD_COLUMNS
            .iter()
            .map(|c| {
                if c.ends_with("_status") {
                    format!("{c}::text AS {c}")
                } else {
                    c.to_string()
                }
            })
            .collect();
        if let Some(column) = &criteria.tombstone_column {
            columns.push(format!("{column} AS tombstoned_at"));
        }
        columns.join(", ")
    }
}

fn record_from_row(row: &PgRow, with_tombstone: bool) -> Result<AudioFileRecord, sqlx::Error> {
    let status = |column: &str| -> Result<Option<StageStatus>, sqlx::Error> {
        Ok(row
            .try_get::<Option<String>, _>(column)?
            .map(|s| StageStatus::parse(&s)))
    };

    Ok(AudioFileRecord {
        device_id: row.try_get("device_id")?,
        recorded_at: row.try_get("recorded_at")?,
        file_path: row.try_get("file_path")?,
        created_at: row.try_get("created_at")?,
        transcriptions_status: status("transcriptions_status")?,
        behavior_features_status: status("behavior_features_status")?,
        emotion_features_status: status("emotion_features_status")?,
        tombstoned_at: if with_tombstone {
            row.try_get("tombstoned_at")?
        } else {
            None
        },
    })
}

#[async_trait]
impl RecordStore for PostgresRecordStore {
    #[instrument(skip(self, criteria), fields(table = %self.table))]
    async fn fetch_eligible(
        &self,
        criteria: &EligibilityCriteria,
    ) -> StoreResult<Vec<AudioFileRecord>> {
        let limit_clause = if criteria.limit.is_some() {
            "LIMIT $3"
        } else {
            ""
        };
        let query = format!(
            "SELECT {} FROM {} WHERE {} {}",
            Self::select_list(criteria),
            self.table,
            Self::where_clause(criteria),
            limit_clause
        );

        let mut q = sqlx::query(&query)
            .bind(StageStatus::Completed.as_str())
            .bind(criteria.cutoff);
        if let Some(limit) = criteria.limit {
            q = q.bind(i64::from(limit));
        }
        let rows = q.fetch_all(&self.pool).await?;

        let with_tombstone = criteria.tombstone_column.is_some();
        let records = rows
            .iter()
            .map(|row| record_from_row(row, with_tombstone))
            .collect::<Result<Vec<_>, _>>()?;

        debug!(count = records.len(), "Fetched eligible records");
        Ok(records)
    }

    #[instrument(skip(self, criteria), fields(table = %self.table))]
    async fn count_eligible(&self, criteria: &EligibilityCriteria) -> StoreResult<u64> {
        let query = format!(
            "SELECT COUNT(*) AS total FROM {} WHERE {}",
            self.table,
            Self::where_clause(criteria)
        );

        let row = sqlx::query(&query)
            .bind(StageStatus::Completed.as_str())
            .bind(criteria.cutoff)
            .fetch_one(&self.pool)
            .await?;

        let total: i64 = row.try_get("total")?;
        Ok(total.max(0) as u64)
    }

    #[instrument(skip(self), fields(table = %self.table, key = %key))]
    async fn delete_record(&self, key: &RecordKey) -> StoreResult<()> {
        let query = format!(
            "DELETE FROM {} WHERE device_id = $1 AND recorded_at = $2",
            self.table
        );
        let result = sqlx::query(&query)
            .bind(&key.device_id)
            .bind(key.recorded_at)
            .execute(&self.pool)
            .await?;

        debug!(rows = result.rows_affected(), "Deleted record");
        Ok(())
    }

    #[instrument(skip(self), fields(table = %self.table, key = %key))]
    async fn mark_tombstone(
        &self,
        key: &RecordKey,
        column: &str,
        at: DateTime<Utc>,
    ) -> StoreResult<()> {
        let query = format!(
            "UPDATE {table} SET {column} = $3 WHERE device_id = $1 AND recorded_at = $2 AND {column} IS NULL",
            table = self.table,
        );
        let result = sqlx::query(&query)
            .bind(&key.device_id)
            .bind(key.recorded_at)
            .bind(at)
            .execute(&self.pool)
            .await?;

        debug!(rows = result.rows_affected(), "Tombstoned record");
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}
