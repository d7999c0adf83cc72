use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use sensor_ingest::app::ingest_use_case::IngestUseCase;
use sensor_ingest::app::ports::ReadingsQueryPort;
use sensor_ingest::envelope::{DeliveryEnvelope, PushRequest};
use sensor_ingest::infra::{FsArchiveStore, SqliteAnalyticsStore};
use sensor_ingest::server::{create_server, AppState};
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

fn app(dir: &TempDir, provision: bool, with_reader: bool) -> Router {
    let store = Arc::new(SqliteAnalyticsStore::open(dir.path().join("analytics.db"), "iot_data").unwrap());
    if provision {
        store.provision().unwrap();
    }
    let archive = Arc::new(FsArchiveStore::new(dir.path().join("archive_store")));
    let readings: Option<Arc<dyn ReadingsQueryPort>> = if with_reader {
        Some(store.clone() as Arc<dyn ReadingsQueryPort>)
    } else {
        None
    };
    create_server(AppState {
        ingest: Arc::new(IngestUseCase::new(store, archive)),
        readings,
    })
}

fn push_body(payload: Value) -> String {
    let envelope = DeliveryEnvelope::from_payload(payload.to_string().as_bytes(), "42");
    serde_json::to_string(&PushRequest::new(envelope, None)).unwrap()
}

fn post(body: String) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/pubsub/push")
        .header("content-type", "application/json")
        .body(Body::from(body))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = hyper::body::to_bytes(response.into_body()).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_reports_version() {
    let dir = TempDir::new().unwrap();
    let response = app(&dir, true, false).oneshot(get("/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn successful_push_is_acknowledged_with_no_content() {
    let dir = TempDir::new().unwrap();
    let body = push_body(json!({
        "capteur_id": "sensor-3",
        "region": "Sfax",
        "temperature": 85.2,
        "timestamp": "2024-01-01T00:00:00Z"
    }));

    let response = app(&dir, true, false).oneshot(post(body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(dir
        .path()
        .join("archive_store/archive/2024-01-01T00:00:00Z.json")
        .exists());
}

#[tokio::test]
async fn undecodable_payload_is_a_bad_request() {
    let dir = TempDir::new().unwrap();
    let body = json!({"message": {"data": "not base64!!", "messageId": "1"}}).to_string();

    let response = app(&dir, true, false).oneshot(post(body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert!(body["error"].as_str().unwrap().contains("base64"));
}

#[tokio::test]
async fn malformed_push_request_is_a_bad_request() {
    let dir = TempDir::new().unwrap();

    let response = app(&dir, true, false).oneshot(post("not json".to_string())).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn store_fault_asks_for_redelivery() {
    let dir = TempDir::new().unwrap();
    let body = push_body(json!({"capteur_id": "sensor-1", "timestamp": "t"}));

    let response = app(&dir, false, false).oneshot(post(body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert!(!dir.path().join("archive_store/archive/t.json").exists());
}

#[tokio::test]
async fn latest_sensors_returns_newest_row_per_sensor() {
    let dir = TempDir::new().unwrap();
    let router = app(&dir, true, true);

    for (sensor, temperature, ts) in [
        ("sensor-1", 30.0, "2024-01-01T00:00:00Z"),
        ("sensor-1", 80.0, "2024-01-01T00:00:05Z"),
        ("sensor-2", 45.0, "2024-01-01T00:00:01Z"),
    ] {
        let body = push_body(json!({"capteur_id": sensor, "region": "Gafsa", "temperature": temperature, "timestamp": ts}));
        let response = router.clone().oneshot(post(body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }

    let response = router.oneshot(get("/latest-sensors")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    let rows = body.as_array().unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["capteur_id"], "sensor-1");
    assert_eq!(rows[0]["temperature"], 80.0);
    assert_eq!(rows[0]["anomalie"], true);
    assert_eq!(rows[1]["capteur_id"], "sensor-2");
}

#[tokio::test]
async fn latest_sensors_is_absent_without_a_reader() {
    let dir = TempDir::new().unwrap();

    let response = app(&dir, true, false).oneshot(get("/latest-sensors")).await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
