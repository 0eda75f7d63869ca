//! Supabase record store over the PostgREST HTTP interface.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use tracing::{debug, instrument};

use super::{AudioFileRecord, RECORD_COLUMNS, RecordKey, RecordStore, StoreError, StoreResult};
use crate::{config::SupabaseConfig, janitor::EligibilityCriteria};

/// Record store backed by a Supabase project's REST endpoint.
pub struct PostgrestRecordStore {
    client: reqwest::Client,
    table_url: String,
}

impl PostgrestRecordStore {
    pub fn new(config: &SupabaseConfig) -> StoreResult<Self> {
        let mut headers = HeaderMap::new();
        let mut api_key = HeaderValue::from_str(&config.key)
            .map_err(|_| StoreError::Config("Supabase key is not a valid header value".into()))?;
        api_key.set_sensitive(true);
        let mut bearer = HeaderValue::from_str(&format!("Bearer {}", config.key))
            .map_err(|_| StoreError::Config("Supabase key is not a valid header value".into()))?;
        bearer.set_sensitive(true);
        headers.insert("apikey", api_key);
        headers.insert(AUTHORIZATION, bearer);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.timeout())
            .build()?;

        Ok(Self {
            client,
            table_url: format!(
                "{}/rest/v1/{}",
                config.url.trim_end_matches('/'),
                config.table
            ),
        })
    }

    /// Horizontal filters shared by the page query and the count.
    fn filter_params(criteria: &EligibilityCriteria) -> Vec<(String, String)> {
        let mut params: Vec<(String, String)> = criteria
            .status_filters()
            .map(|(column, value)| (column.to_string(), format!("eq.{value}")))
            .collect();
        params.push((
            "created_at".to_string(),
            format!("lt.{}", format_timestamp(criteria.cutoff)),
        ));
        if let Some(column) = &criteria.tombstone_column {
            params.push((column.clone(), "is.null".to_string()));
        }
        params
    }

    fn select_param(criteria: &EligibilityCriteria) -> String {
        let mut select = RECORD_COLUMNS.join(",");
        if let Some(column) = &criteria.tombstone_column {
            select.push_str(&format!(",tombstoned_at:{column}"));
        }
        select
    }

    fn key_params(key: &RecordKey) -> [(&'static str, String); 2] {
        [
            ("device_id", format!("eq.{}", key.device_id)),
            ("recorded_at", format!("eq.{}", format_timestamp(key.recorded_at))),
        ]
    }
}

#[async_trait]
impl RecordStore for PostgrestRecordStore {
    #[instrument(skip(self, criteria))]
    async fn fetch_eligible(
        &self,
        criteria: &EligibilityCriteria,
    ) -> StoreResult<Vec<AudioFileRecord>> {
        let mut request = self
            .client
            .get(&self.table_url)
            .query(&[("select", Self::select_param(criteria))])
            .query(&Self::filter_params(criteria));
        if let Some(limit) = criteria.limit {
            request = request.query(&[("limit", limit)]);
        }

        let response = error_for_status(request.send().await?).await?;
        let records: Vec<AudioFileRecord> = response
            .json()
            .await
            .map_err(|e| StoreError::Decode(e.to_string()))?;

        debug!(count = records.len(), "PostgREST returned records");
        Ok(records)
    }

    #[instrument(skip(self, criteria))]
    async fn count_eligible(&self, criteria: &EligibilityCriteria) -> StoreResult<u64> {
        let request = self
            .client
            .head(&self.table_url)
            .header("Prefer", "count=exact")
            .query(&[("select", "device_id")])
            .query(&Self::filter_params(criteria));

        let response = error_for_status(request.send().await?).await?;
        let range = response
            .headers()
            .get("content-range")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| StoreError::Decode("missing Content-Range header".into()))?;

        parse_content_range_total(range)
            .ok_or_else(|| StoreError::Decode(format!("unexpected Content-Range '{range}'")))
    }

    #[instrument(skip(self), fields(key = %key))]
    async fn delete_record(&self, key: &RecordKey) -> StoreResult<()> {
        let request = self
            .client
            .delete(&self.table_url)
            .header("Prefer", "return=minimal")
            .query(&Self::key_params(key));

        error_for_status(request.send().await?).await?;
        Ok(())
    }

    #[instrument(skip(self), fields(key = %key))]
    async fn mark_tombstone(
        &self,
        key: &RecordKey,
        column: &str,
        at: DateTime<Utc>,
    ) -> StoreResult<()> {
        let body = serde_json::json!({ column: format_timestamp(at) });
        let request = self
            .client
            .patch(&self.table_url)
            .header("Prefer", "return=minimal")
            .query(&Self::key_params(key))
            .query(&[(column, "is.null")])
            .json(&body);

        error_for_status(request.send().await?).await?;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "supabase"
    }
}

async fn error_for_status(response: reqwest::Response) -> StoreResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(StoreError::Api {
        status: status.as_u16(),
        body,
    })
}

fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Total from a `Content-Range` header such as `0-24/3573` or `*/0`.
fn parse_content_range_total(value: &str) -> Option<u64> {
    value.rsplit_once('/')?.1.trim().parse().ok()
}
