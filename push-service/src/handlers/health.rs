use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use chrono::Utc;
use serde_json::json;

use crate::models::iso_timestamp;
use crate::services::get_metrics;
use crate::startup::AppState;

/// Liveness plus provider readiness. Always 200; `fcmInitialized` tells
/// whether `/push` will accept work.
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "fcmInitialized": state.is_ready(),
        "timestamp": iso_timestamp(Utc::now()),
    }))
}

pub async fn metrics_endpoint() -> impl IntoResponse {
    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        get_metrics(),
    )
}
