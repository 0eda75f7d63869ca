//! Cleanup and statistics endpoints.

use axum::{Json, extract::State};
use chrono::Utc;

use super::error::ApiError;
use crate::{
    AppState,
    janitor::{BatchOutcome, EligibilityCriteria, EligibilityStats, eligibility_stats},
};

/// Run one reconciliation pass.
///
/// Returns 200 with the batch summary whenever the eligibility query
/// succeeded, even if individual files failed.
///
/// The run is spawned so a dropped connection cannot stop it between an
/// object delete and the matching finalization.
#[tracing::instrument(name = "janitor.cleanup", skip(state))]
pub async fn cleanup(State(state): State<AppState>) -> Result<Json<BatchOutcome>, ApiError> {
    if state.record_store.is_none() {
        return Err(ApiError::RecordStoreNotConfigured);
    }
    let Some(reconciler) = state.reconciler.clone() else {
        return Err(ApiError::ObjectStoreNotConfigured);
    };

    let outcome = tokio::spawn(async move { reconciler.run(Utc::now()).await })
        .await
        .map_err(ApiError::Interrupted)??;
    Ok(Json(outcome))
}

/// Count records currently eligible for deletion.
#[tracing::instrument(name = "janitor.stats", skip(state))]
pub async fn stats(State(state): State<AppState>) -> Result<Json<EligibilityStats>, ApiError> {
    let Some(store) = &state.record_store else {
        return Err(ApiError::RecordStoreNotConfigured);
    };

    let retention = &state.config.retention;
    let criteria = EligibilityCriteria::new(Utc::now(), retention.age())
        .excluding_tombstoned(retention.finalization.tombstone_column());

    let stats = eligibility_stats(
        store,
        &criteria,
        retention.age_hours,
        retention.call_timeout(),
    )
    .await
    .map_err(ApiError::Stats)?;

    Ok(Json(stats))
}
