//! Prometheus metrics for the janitor.
//!
//! Provides metrics for:
//! - Per-file reconciliation outcomes
//! - Bytes reclaimed from object storage
//! - Run-level failures and duration

#[cfg(feature = "prometheus")]
use std::sync::OnceLock;

#[cfg(feature = "prometheus")]
use metrics::{counter, histogram};
#[cfg(feature = "prometheus")]
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::config::MetricsConfig;

/// Global Prometheus handle for the metrics endpoint.
#[cfg(feature = "prometheus")]
static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Run durations range from milliseconds (empty page) to minutes.
#[cfg(feature = "prometheus")]
const RUN_DURATION_BUCKETS: &[f64] = &[0.05, 0.1, 0.5, 1.0, 5.0, 10.0, 30.0, 60.0, 300.0];

/// Initialize the metrics system with the given configuration.
#[cfg(feature = "prometheus")]
pub fn init_metrics(config: &MetricsConfig) -> Result<(), MetricsError> {
    if !config.enabled {
        return Ok(());
    }

    let builder = PrometheusBuilder::new()
        .set_buckets_for_metric(
            metrics_exporter_prometheus::Matcher::Suffix("_duration_seconds".to_string()),
            RUN_DURATION_BUCKETS,
        )
        .map_err(|e| MetricsError::Setup(e.to_string()))?;

    let handle = builder.install_recorder().map_err(MetricsError::Install)?;

    PROMETHEUS_HANDLE
        .set(handle)
        .map_err(|_| MetricsError::Setup("Metrics already initialized".to_string()))?;

    Ok(())
}

/// Initialize the metrics system (no-op without prometheus feature).
#[cfg(not(feature = "prometheus"))]
pub fn init_metrics(config: &MetricsConfig) -> Result<(), MetricsError> {
    if config.enabled {
        tracing::warn!(
            "Metrics are enabled in config but the 'prometheus' feature is not compiled. \
             Rebuild with: cargo build --features prometheus"
        );
    }
    Ok(())
}

/// Get the Prometheus handle for rendering metrics.
#[cfg(feature = "prometheus")]
pub fn get_prometheus_handle() -> Option<&'static PrometheusHandle> {
    PROMETHEUS_HANDLE.get()
}

// ─────────────────────────────────────────────────────────────────────────────
// Metric Recording Functions
// ─────────────────────────────────────────────────────────────────────────────

/// Record per-file outcomes of a run.
///
/// # Arguments
/// * `outcome` - "deleted", "skipped" or "failed"
/// * `count` - Number of files with that outcome
pub fn record_file_outcomes(outcome: &str, count: u64) {
    #[cfg(feature = "prometheus")]
    {
        if count > 0 {
            counter!("janitor_files_total", "outcome" => outcome.to_string()).increment(count);
        }
    }
    #[cfg(not(feature = "prometheus"))]
    {
        let _ = (outcome, count);
    }
}

/// Record bytes reclaimed from object storage.
pub fn record_bytes_deleted(bytes: u64) {
    #[cfg(feature = "prometheus")]
    {
        counter!("janitor_bytes_deleted_total").increment(bytes);
    }
    #[cfg(not(feature = "prometheus"))]
    {
        let _ = bytes;
    }
}

/// Record a run that could not complete.
///
/// # Arguments
/// * `reason` - "query", "timeout" or "trigger"
pub fn record_run_error(reason: &str) {
    #[cfg(feature = "prometheus")]
    {
        counter!("janitor_run_errors_total", "reason" => reason.to_string()).increment(1);
    }
    #[cfg(not(feature = "prometheus"))]
    {
        let _ = reason;
    }
}

/// Record the wall-clock duration of a completed run.
pub fn record_run_duration(dry_run: bool, duration_secs: f64) {
    #[cfg(feature = "prometheus")]
    {
        histogram!("janitor_run_duration_seconds", "dry_run" => dry_run.to_string())
            .record(duration_secs);
    }
    #[cfg(not(feature = "prometheus"))]
    {
        let _ = (dry_run, duration_secs);
    }
}

/// Metrics initialization errors.
#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    #[error("Failed to set up metrics: {0}")]
    Setup(String),

    #[cfg(feature = "prometheus")]
    #[error("Failed to install metrics recorder: {0}")]
    Install(#[from] metrics_exporter_prometheus::BuildError),
}
