//! Periodic trigger for the cleanup endpoint.
//!
//! The trigger is the scheduler half of the job: it POSTs to a running
//! janitor's `/cleanup` endpoint, once or on a fixed interval, and logs the
//! summary it gets back. It never retries within an invocation; the next
//! interval is the retry.

use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;
use tracing::{error, info, instrument};

use crate::{config::TriggerConfig, observability::metrics};

/// The parts of the cleanup summary the trigger reports.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TriggerReport {
    #[serde(default)]
    pub deleted_count: u64,
    #[serde(default)]
    pub failed_count: u64,
    #[serde(default)]
    pub total_size_bytes: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum TriggerError {
    #[error("Janitor API returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Janitor API did not answer within {0:?}")]
    Timeout(Duration),

    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid response body: {0}")]
    Decode(String),
}

pub struct Trigger {
    client: reqwest::Client,
    config: TriggerConfig,
}

impl Trigger {
    pub fn new(config: TriggerConfig) -> Result<Self, TriggerError> {
        let client = reqwest::Client::builder().timeout(config.timeout()).build()?;
        Ok(Self { client, config })
    }

    /// Invoke the cleanup endpoint once.
    #[instrument(skip(self), fields(url = %self.config.url))]
    pub async fn invoke(&self) -> Result<TriggerReport, TriggerError> {
        info!("Triggering cleanup");

        let response = self
            .client
            .post(&self.config.url)
            .header(CONTENT_TYPE, "application/json")
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| self.classify(e))?;

        if status != reqwest::StatusCode::OK {
            error!(status = status.as_u16(), body = %body, "Janitor API returned an error");
            return Err(TriggerError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let report: TriggerReport =
            serde_json::from_str(&body).map_err(|e| TriggerError::Decode(e.to_string()))?;

        info!(
            deleted_count = report.deleted_count,
            failed_count = report.failed_count,
            total_size_bytes = report.total_size_bytes,
            "Cleanup succeeded"
        );
        Ok(report)
    }

    fn classify(&self, err: reqwest::Error) -> TriggerError {
        if err.is_timeout() {
            TriggerError::Timeout(self.config.timeout())
        } else {
            TriggerError::Http(err)
        }
    }

    /// Invoke the endpoint every `interval`, forever.
    ///
    /// The first invocation happens immediately. Errors are logged and the
    /// loop continues.
    pub async fn run_forever(&self) {
        let interval = self.config.interval();
        info!(
            url = %self.config.url,
            interval_hours = self.config.interval_hours,
            timeout_secs = self.config.timeout_secs,
            "Starting cleanup trigger"
        );

        loop {
            if let Err(e) = self.invoke().await {
                error!(error = %e, "Cleanup trigger failed");
                metrics::record_run_error("trigger");
            }

            tokio::time::sleep(interval).await;
        }
    }
}
