//! Integration tests for the worker's status endpoint and gazetteer import.
//!
//! Uses `tower::ServiceExt` to drive the router without a real HTTP server,
//! and in-memory tiers instead of Redis and PostgreSQL.
//!
//! ```bash
//! cargo test -p weatherbell-worker --test integration -- --nocapture
//! ```

use std::io::Write;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use tower::ServiceExt;

use weatherbell_scheduler::Services;
use weatherbell_storage::memory::MemoryStore;
use weatherbell_storage::{CityStore, HealthMonitor};
use weatherbell_worker::bootstrap::{import_cities, load_gazetteer};
use weatherbell_worker::status::{StatusState, router};

// ============================================================
// Helpers
// ============================================================

async fn get_health(health: Arc<HealthMonitor>) -> serde_json::Value {
    let response = router(StatusState { health })
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

fn gazetteer_file(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

const GAZETTEER: &str = r#"[
    {"id": 1, "city": "Kurgan", "federal_district": "Ural", "region_with_type": "Kurgan oblast"},
    {"id": 2, "name": "Kurgan", "region": "Tver oblast", "city_district": "Kashinsky"},
    {"id": 3, "name": "Omsk", "region": "Omsk oblast"}
]"#;

// ============================================================
// Status endpoint
// ============================================================

#[tokio::test]
async fn test_health_reports_healthy_fast_tier() {
    let store = Arc::new(MemoryStore::new());
    let health = Arc::new(HealthMonitor::new(store));
    assert!(health.probe().await);

    let json = get_health(health).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["service"], "weatherbell-worker");
    assert_eq!(json["fast_tier_healthy"], true);
}

#[tokio::test]
async fn test_health_reports_unhealthy_fast_tier() {
    let store = Arc::new(MemoryStore::new());
    store.set_available(false);
    let health = Arc::new(HealthMonitor::new(store));
    assert!(!health.probe().await);

    let json = get_health(health).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["fast_tier_healthy"], false);
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    let health = Arc::new(HealthMonitor::new(Arc::new(MemoryStore::new())));
    let response = router(StatusState { health })
        .oneshot(Request::builder().uri("/nope").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ============================================================
// Gazetteer
// ============================================================

#[tokio::test]
async fn test_load_gazetteer_accepts_both_field_styles() {
    let file = gazetteer_file(GAZETTEER);
    let cities = load_gazetteer(file.path()).await.unwrap();

    assert_eq!(cities.len(), 3);
    assert_eq!(cities[0].name, "Kurgan");
    assert_eq!(cities[0].region, "Kurgan oblast");
    assert_eq!(cities[1].city_district.as_deref(), Some("Kashinsky"));
    assert_eq!(cities[2].federal_district, "");
}

#[tokio::test]
async fn test_load_gazetteer_rejects_malformed_file() {
    let file = gazetteer_file("{ not json");
    let err = load_gazetteer(file.path()).await.unwrap_err();
    assert!(err.to_string().contains("failed to parse gazetteer"));

    let err = load_gazetteer("/definitely/not/here.json").await.unwrap_err();
    assert!(err.to_string().contains("failed to read gazetteer"));
}

#[tokio::test]
async fn test_import_populates_both_tiers() {
    let fast = Arc::new(MemoryStore::new());
    let durable = Arc::new(MemoryStore::new());
    let health = Arc::new(HealthMonitor::new(fast.clone()));
    let services = Services::from_tiers(fast.clone(), durable.clone(), fast.clone(), health);

    let file = gazetteer_file(GAZETTEER);
    assert_eq!(import_cities(&services, file.path()).await.unwrap(), 3);

    for tier in [&fast, &durable] {
        assert_eq!(tier.find_cities("Kurgan").await.unwrap().len(), 2);
        assert_eq!(tier.find_cities("Omsk").await.unwrap()[0].id, 3);
    }
}
