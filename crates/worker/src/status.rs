//! Status endpoint.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;

use weatherbell_storage::HealthMonitor;

#[derive(Clone)]
pub struct StatusState {
    pub health: Arc<HealthMonitor>,
}

pub fn router(state: StatusState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .with_state(state)
}

async fn health_check(State(state): State<StatusState>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "service": "weatherbell-worker",
        "version": env!("CARGO_PKG_VERSION"),
        "fast_tier_healthy": state.health.is_healthy()
    }))
}
