use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use tracing::info;

use crate::AppState;

// ── Health ────────────────────────────────────────────────────────────────────

pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "origin_enforced": state.origin.is_enforced(),
    }))
}

// ── Origin check ──────────────────────────────────────────────────────────────

/// Lets a first-party client confirm its tokens are accepted. Only reachable
/// once the origin middleware has passed the request.
pub async fn origin_check() -> impl IntoResponse {
    info!("audit: origin.check");
    Json(json!({"valid": true}))
}

// ── Fallback ──────────────────────────────────────────────────────────────────

pub async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, Json(json!({"error": "not found"})))
}
