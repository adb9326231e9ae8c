use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::{debug, warn};

use crate::{token::ORIGIN_HEADER, AppState};

/// Axum middleware that demands a valid `x-app-origin` token on every path
/// the route gate marks as sensitive.
///
/// The check runs before the inner handler, so a rejected request never
/// reaches code that could mutate state. If the authenticator is disabled
/// every request passes through.
pub async fn require_origin_token(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path();
    if !state.gate.should_validate(path) {
        return next.run(request).await;
    }

    let header = request
        .headers()
        .get(ORIGIN_HEADER)
        .and_then(|v| v.to_str().ok());

    match state.origin.verify(header) {
        Ok(()) => {
            debug!(path, "origin token accepted");
            next.run(request).await
        }
        Err(reason) => {
            warn!(
                path,
                method = %request.method(),
                %reason,
                "audit: origin.reject"
            );
            forbidden()
        }
    }
}

fn forbidden() -> Response {
    (
        StatusCode::FORBIDDEN,
        Json(json!({"error": "forbidden — request origin could not be verified"})),
    )
        .into_response()
}
