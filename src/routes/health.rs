//! Health, service info and metrics endpoints.

use axum::{Json, extract::State, response::IntoResponse};
use chrono::{DateTime, Utc};
use http::StatusCode;
use serde::Serialize;

use crate::AppState;
#[cfg(feature = "prometheus")]
use crate::observability::metrics::get_prometheus_handle;

/// Liveness plus which stores are configured.
#[derive(Debug, Serialize)]
pub struct HealthStatus {
    /// Always "healthy" while the process serves requests.
    pub status: &'static str,
    pub timestamp: DateTime<Utc>,
    /// Whether an object store is configured.
    pub s3_configured: bool,
    /// Whether a record store is configured.
    pub supabase_configured: bool,
}

/// Health check.
///
/// Does not probe the stores; a missing store surfaces as a 500 from
/// `/cleanup` instead.
#[tracing::instrument(name = "health.check", skip(state))]
pub async fn health_check(State(state): State<AppState>) -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "healthy",
        timestamp: Utc::now(),
        s3_configured: state.object_store.is_some(),
        supabase_configured: state.record_store.is_some(),
    })
}

#[derive(Debug, Serialize)]
pub struct ServiceInfo {
    pub service: &'static str,
    pub version: &'static str,
    pub description: &'static str,
    pub endpoints: Endpoints,
}

#[derive(Debug, Serialize)]
pub struct Endpoints {
    pub health: &'static str,
    pub cleanup: &'static str,
    pub stats: &'static str,
}

/// Service description.
pub async fn service_info() -> Json<ServiceInfo> {
    Json(ServiceInfo {
        service: "Audio Janitor",
        version: env!("CARGO_PKG_VERSION"),
        description: env!("CARGO_PKG_DESCRIPTION"),
        endpoints: Endpoints {
            health: "/health",
            cleanup: "/cleanup (POST)",
            stats: "/stats",
        },
    })
}

/// Prometheus metrics endpoint.
///
/// Returns metrics in Prometheus text format.
#[tracing::instrument(name = "health.metrics")]
pub async fn metrics() -> impl IntoResponse {
    #[cfg(feature = "prometheus")]
    {
        return match get_prometheus_handle() {
            Some(handle) => (
                StatusCode::OK,
                [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
                handle.render(),
            ),
            None => (
                StatusCode::SERVICE_UNAVAILABLE,
                [("content-type", "text/plain")],
                "Metrics not initialized".to_string(),
            ),
        };
    }
    #[cfg(not(feature = "prometheus"))]
    (
        StatusCode::NOT_FOUND,
        [("content-type", "text/plain")],
        "Prometheus metrics not enabled".to_string(),
    )
}
