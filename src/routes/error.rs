use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::{janitor::ReconcileError, observability::metrics, store::StoreError};

/// Error body: `{"detail": "..."}`.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub detail: String,
}

#[derive(Debug)]
pub enum ApiError {
    RecordStoreNotConfigured,
    ObjectStoreNotConfigured,
    Cleanup(ReconcileError),
    /// The spawned run panicked or was cancelled.
    Interrupted(tokio::task::JoinError),
    Stats(StoreError),
}

impl From<ReconcileError> for ApiError {
    fn from(err: ReconcileError) -> Self {
        ApiError::Cleanup(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let detail = match self {
            ApiError::RecordStoreNotConfigured => "Supabase client not configured".to_string(),
            ApiError::ObjectStoreNotConfigured => "S3 client not configured".to_string(),
            ApiError::Cleanup(err) => {
                tracing::error!(error = %err, "Cleanup failed");
                format!("Cleanup failed: {err}")
            }
            ApiError::Interrupted(err) => {
                tracing::error!(error = %err, "Cleanup run did not complete");
                metrics::record_run_error("interrupted");
                format!("Cleanup failed: run did not complete: {err}")
            }
            ApiError::Stats(err) => {
                tracing::error!(error = %err, "Failed to get stats");
                metrics::record_run_error("stats");
                format!("Failed to get stats: {err}")
            }
        };

        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse { detail }),
        )
            .into_response()
    }
}
