//! End-to-end tests for the janitor's HTTP surface.
//!
//! Each test builds the real router over in-memory record and object stores
//! and drives it with `tower::ServiceExt::oneshot`.

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use chrono::{DateTime, Utc};
use serde_json::Value;
use tower::ServiceExt;

use crate::{
    AppState, build_app,
    config::JanitorConfig,
    storage::{ObjectStore, memory::MemoryObjectStore},
    store::{
        RecordStore,
        memory::{MemoryRecordStore, record},
    },
};

fn two_days_ago() -> DateTime<Utc> {
    Utc::now() - chrono::Duration::hours(48)
}

pub struct JanitorHarness {
    pub app: axum::Router,
    pub records: Arc<MemoryRecordStore>,
    pub objects: Arc<MemoryObjectStore>,
}

impl JanitorHarness {
    fn new(records: MemoryRecordStore, objects: MemoryObjectStore) -> Self {
        Self::with_config(JanitorConfig::default(), records, objects)
    }

    fn with_config(
        config: JanitorConfig,
        records: MemoryRecordStore,
        objects: MemoryObjectStore,
    ) -> Self {
        let records = Arc::new(records);
        let objects = Arc::new(objects);
        let record_store: Arc<dyn RecordStore> = records.clone();
        let object_store: Arc<dyn ObjectStore> = objects.clone();
        let state = AppState::from_parts(config.clone(), Some(record_store), Some(object_store));
        Self {
            app: build_app(&config, state),
            records,
            objects,
        }
    }

    async fn post(&self, uri: &str) -> (StatusCode, Value) {
        send(&self.app, "POST", uri).await
    }

    async fn get(&self, uri: &str) -> (StatusCode, Value) {
        send(&self.app, "GET", uri).await
    }
}

async fn send(app: &axum::Router, method: &str, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::empty())
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: Value = serde_json::from_slice(&body_bytes).unwrap_or(Value::Null);
    (status, json)
}

fn unconfigured_app(record_store: bool, object_store: bool) -> axum::Router {
    let config = JanitorConfig::default();
    let records: Option<Arc<dyn RecordStore>> =
        record_store.then(|| Arc::new(MemoryRecordStore::new()) as Arc<dyn RecordStore>);
    let objects: Option<Arc<dyn ObjectStore>> =
        object_store.then(|| Arc::new(MemoryObjectStore::new()) as Arc<dyn ObjectStore>);
    build_app(&config, AppState::from_parts(config.clone(), records, objects))
}

#[tokio::test]
async fn test_cleanup_reports_deleted_skipped_and_failed() {
    let records = MemoryRecordStore::new();
    records.insert(record("dev-present", two_days_ago(), Some("files/present.wav")));
    records.insert(record("dev-absent", two_days_ago(), Some("files/absent.wav")));
    records.insert(record("dev-denied", two_days_ago(), Some("files/denied.wav")));
    let objects = MemoryObjectStore::new()
        .with_object("files/present.wav", 1_000)
        .with_object("files/denied.wav", 500);
    objects.fail_delete("files/denied.wav", "AccessDenied: Access Denied");

    let harness = JanitorHarness::new(records, objects);
    let (status, body) = harness.post("/cleanup").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], false);
    assert_eq!(body["deleted_count"], 1);
    assert_eq!(body["skipped_count"], 1);
    assert_eq!(body["failed_count"], 1);
    assert_eq!(body["total_size_bytes"], 1_000);
    assert_eq!(body["deleted_files"], serde_json::json!(["files/present.wav"]));
    assert_eq!(body["failed_files"][0]["file_path"], "files/denied.wav");
    assert!(
        body["failed_files"][0]["error"]
            .as_str()
            .unwrap()
            .contains("AccessDenied")
    );
    assert_eq!(
        body["message"],
        "Cleanup complete: 1 deleted, 1 failed, 1 skipped"
    );

    // The failed record stays for the next run; the other two are gone
    let remaining: Vec<_> = harness
        .records
        .rows()
        .into_iter()
        .map(|r| r.device_id)
        .collect();
    assert_eq!(remaining, vec!["dev-denied".to_string()]);
    assert!(harness.objects.contains("files/denied.wav"));
}

#[tokio::test]
async fn test_cleanup_skips_fresh_and_unprocessed_records() {
    let records = MemoryRecordStore::new();
    records.insert(record("dev-fresh", Utc::now(), Some("files/fresh.wav")));
    let mut pending = record("dev-pending", two_days_ago(), Some("files/pending.wav"));
    pending.emotion_features_status = Some(crate::store::StageStatus::Pending);
    records.insert(pending);
    let objects = MemoryObjectStore::new()
        .with_object("files/fresh.wav", 10)
        .with_object("files/pending.wav", 10);

    let harness = JanitorHarness::new(records, objects);
    let (status, body) = harness.post("/cleanup").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["deleted_count"], 0);
    assert_eq!(body["skipped_count"], 0);
    assert_eq!(body["deleted_files"], serde_json::json!([]));
    assert_eq!(harness.records.rows().len(), 2);
    assert!(harness.objects.deleted_keys().is_empty());
}

#[tokio::test]
async fn test_cleanup_truncates_deleted_files_but_counts_all() {
    let mut config = JanitorConfig::default();
    config.retention.deleted_files_cap = 5;

    let records = MemoryRecordStore::new();
    let mut objects = MemoryObjectStore::new();
    for i in 0..12 {
        let key = format!("files/{i:02}.wav");
        records.insert(record(&format!("dev-{i:02}"), two_days_ago(), Some(key.as_str())));
        objects = objects.with_object(&key, 100);
    }

    let harness = JanitorHarness::with_config(config, records, objects);
    let (status, body) = harness.post("/cleanup").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["deleted_count"], 12);
    assert_eq!(body["total_size_bytes"], 1_200);
    let listed: Vec<&str> = body["deleted_files"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_str().unwrap())
        .collect();
    assert_eq!(
        listed,
        vec![
            "files/00.wav",
            "files/01.wav",
            "files/02.wav",
            "files/03.wav",
            "files/04.wav"
        ]
    );
}

#[tokio::test]
async fn test_cleanup_second_run_finds_nothing() {
    let records = MemoryRecordStore::new();
    records.insert(record("dev-1", two_days_ago(), Some("files/1.wav")));
    records.insert(record("dev-2", two_days_ago(), Some("files/2.wav")));
    let objects = MemoryObjectStore::new()
        .with_object("files/1.wav", 1)
        .with_object("files/2.wav", 2);

    let harness = JanitorHarness::new(records, objects);
    let (_, first) = harness.post("/cleanup").await;
    assert_eq!(first["deleted_count"], 2);

    let (status, second) = harness.post("/cleanup").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["success"], true);
    assert_eq!(second["deleted_count"], 0);
    assert_eq!(second["failed_count"], 0);
    assert_eq!(second["skipped_count"], 0);
}

#[tokio::test]
async fn test_cleanup_query_failure_is_500() {
    let records = MemoryRecordStore::new();
    records.insert(record("dev-1", two_days_ago(), Some("files/1.wav")));
    records.fail_queries("connection reset");
    let objects = MemoryObjectStore::new().with_object("files/1.wav", 1);

    let harness = JanitorHarness::new(records, objects);
    let (status, body) = harness.post("/cleanup").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let detail = body["detail"].as_str().unwrap();
    assert!(detail.starts_with("Cleanup failed:"), "got {detail}");
    assert!(harness.objects.contains("files/1.wav"));
    assert_eq!(harness.records.rows().len(), 1);
}

#[tokio::test]
async fn test_cleanup_without_record_store() {
    let (status, body) = send(&unconfigured_app(false, true), "POST", "/cleanup").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["detail"], "Supabase client not configured");
}

#[tokio::test]
async fn test_cleanup_without_object_store() {
    let (status, body) = send(&unconfigured_app(true, false), "POST", "/cleanup").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["detail"], "S3 client not configured");
}

#[tokio::test]
async fn test_cleanup_requires_post() {
    let harness = JanitorHarness::new(MemoryRecordStore::new(), MemoryObjectStore::new());
    let (status, _) = harness.get("/cleanup").await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn test_stats_counts_eligible_records() {
    let records = MemoryRecordStore::new();
    for i in 0..3 {
        records.insert(record(&format!("dev-{i}"), two_days_ago(), Some("f.wav")));
    }
    records.insert(record("dev-fresh", Utc::now(), Some("fresh.wav")));

    let harness = JanitorHarness::new(records, MemoryObjectStore::new());
    let (status, body) = harness.get("/stats").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["eligible_for_deletion"], 3);
    assert!(body["cutoff_time"].is_string());
    assert_eq!(body["criteria"]["transcriptions_status"], "completed");
    assert_eq!(body["criteria"]["behavior_features_status"], "completed");
    assert_eq!(body["criteria"]["emotion_features_status"], "completed");
    assert_eq!(body["criteria"]["age_threshold_hours"], 24);
}

#[tokio::test]
async fn test_stats_works_without_object_store() {
    let (status, body) = send(&unconfigured_app(true, false), "GET", "/stats").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["eligible_for_deletion"], 0);
}

#[tokio::test]
async fn test_stats_query_failure_is_500() {
    let records = MemoryRecordStore::new();
    records.fail_queries("relation does not exist");

    let harness = JanitorHarness::new(records, MemoryObjectStore::new());
    let (status, body) = harness.get("/stats").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let detail = body["detail"].as_str().unwrap();
    assert!(detail.starts_with("Failed to get stats:"), "got {detail}");
}

#[tokio::test]
async fn test_stats_without_record_store() {
    let (status, body) = send(&unconfigured_app(false, false), "GET", "/stats").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["detail"], "Supabase client not configured");
}

#[tokio::test]
async fn test_health_reports_configured_stores() {
    let (status, body) = send(&unconfigured_app(true, false), "GET", "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["supabase_configured"], true);
    assert_eq!(body["s3_configured"], false);
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn test_service_info() {
    let (status, body) = send(&unconfigured_app(false, false), "GET", "/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["service"], "Audio Janitor");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    assert_eq!(body["endpoints"]["cleanup"], "/cleanup (POST)");
    assert_eq!(body["endpoints"]["stats"], "/stats");
    assert_eq!(body["endpoints"]["health"], "/health");
}

#[tokio::test]
async fn test_metrics_route_absent_when_disabled() {
    let (status, _) = send(&unconfigured_app(false, false), "GET", "/metrics").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_cleanup_outlives_server_request_timeout() {
    let mut config = JanitorConfig::default();
    config.server.timeout_secs = 1;

    let records = MemoryRecordStore::new();
    let mut objects = MemoryObjectStore::new();
    for i in 0..3 {
        let key = format!("{i}.wav");
        records.insert(record(&format!("dev-{i}"), two_days_ago(), Some(key.as_str())));
        objects = objects.with_object(&key, 10);
    }
    objects.set_delete_delay(std::time::Duration::from_millis(600));

    let harness = JanitorHarness::with_config(config, records, objects);
    let (status, body) = harness.post("/cleanup").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["deleted_count"], 3);
    assert_eq!(body["total_size_bytes"], 30);
    assert_eq!(harness.objects.deleted_keys().len(), 3);
    assert!(harness.records.rows().is_empty());
}

#[tokio::test]
async fn test_stats_bounded_by_server_request_timeout() {
    let mut config = JanitorConfig::default();
    config.server.timeout_secs = 1;

    let records = MemoryRecordStore::new();
    records.set_query_delay(std::time::Duration::from_secs(3));

    let harness = JanitorHarness::with_config(config, records, MemoryObjectStore::new());
    let (status, _) = harness.get("/stats").await;
    assert_eq!(status, StatusCode::REQUEST_TIMEOUT);
}

#[tokio::test]
async fn test_cors_allows_any_origin_by_default() {
    let harness = JanitorHarness::new(MemoryRecordStore::new(), MemoryObjectStore::new());
    let request = Request::builder()
        .method("GET")
        .uri("/health")
        .header("origin", "https://dashboard.example.com")
        .body(Body::empty())
        .unwrap();

    let response = harness.app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get("access-control-allow-origin")
            .and_then(|v| v.to_str().ok()),
        Some("*")
    );
}
