//! Retention janitor for processed audio recordings.
//!
//! Finds recordings whose transcription, behavior and emotion stages have all
//! completed and that are older than the retention window, deletes their
//! objects from storage and closes out their records.

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use http::StatusCode;
use tower_http::{limit::RequestBodyLimitLayer, timeout::TimeoutLayer, trace::TraceLayer};

pub mod config;
pub mod janitor;
pub mod observability;
pub mod routes;
pub mod storage;
pub mod store;
pub mod trigger;

#[cfg(test)]
mod tests;

use config::JanitorConfig;
use janitor::{BatchReconciler, ReconcilerSettings, create_finalizer};
use storage::{ObjectStore, StorageError, create_object_store};
use store::{RecordStore, StoreError, create_record_store};

/// Errors building the application state.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("Failed to initialize record store: {0}")]
    Store(#[from] StoreError),

    #[error("Failed to initialize object store: {0}")]
    Storage(#[from] StorageError),
}

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<JanitorConfig>,
    pub record_store: Option<Arc<dyn RecordStore>>,
    pub object_store: Option<Arc<dyn ObjectStore>>,
    /// Present only when both stores are configured.
    pub reconciler: Option<Arc<BatchReconciler>>,
}

impl AppState {
    pub async fn new(config: JanitorConfig) -> Result<Self, StartupError> {
        let record_store = create_record_store(&config.record_store).await?;
        let object_store = create_object_store(&config.object_store).await?;

        if record_store.is_none() {
            tracing::warn!("Record store not configured; /cleanup and /stats will return errors");
        }
        if object_store.is_none() {
            tracing::warn!("Object store not configured; /cleanup will return errors");
        }

        Ok(Self::from_parts(config, record_store, object_store))
    }

    /// Assemble state from already-built stores.
    pub fn from_parts(
        config: JanitorConfig,
        record_store: Option<Arc<dyn RecordStore>>,
        object_store: Option<Arc<dyn ObjectStore>>,
    ) -> Self {
        let reconciler = match (&record_store, &object_store) {
            (Some(records), Some(objects)) => {
                let finalizer =
                    create_finalizer(&config.retention.finalization, records.clone());
                Some(Arc::new(BatchReconciler::new(
                    records.clone(),
                    objects.clone(),
                    finalizer,
                    ReconcilerSettings::from(&config.retention),
                )))
            }
            _ => None,
        };

        Self {
            config: Arc::new(config),
            record_store,
            object_store,
            reconciler,
        }
    }
}

/// Build the router.
///
/// `server.timeout_secs` bounds every route except `/cleanup`; a run is
/// bounded by its per-call timeouts and always answers with a summary.
pub fn build_app(config: &JanitorConfig, state: AppState) -> Router {
    let mut app = Router::new()
        .route("/", get(routes::health::service_info))
        .route("/health", get(routes::health::health_check))
        .route("/stats", get(routes::cleanup::stats));

    if config.observability.metrics.enabled {
        app = app.route(
            &config.observability.metrics.path,
            get(routes::health::metrics),
        );
    }

    // Routes added after this layer are not wrapped by it
    let mut app = app
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            config.server.timeout(),
        ))
        .route("/cleanup", post(routes::cleanup::cleanup));

    if let Some(cors_layer) = config.server.cors.clone().into_layer() {
        app = app.layer(cors_layer);
    }

    app.layer(TraceLayer::new_for_http())
        .layer(RequestBodyLimitLayer::new(config.server.body_limit_bytes))
        .with_state(state)
}
