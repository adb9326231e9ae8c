use std::net::SocketAddr;
use std::path::Path;

use anyhow::{Context, Result};
use axum::{
    http::HeaderName,
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::{
    auth::require_origin_token,
    gate::{GateMatch, RouteGate},
    handlers::{health, not_found, origin_check},
    origin::{OriginAuthenticator, OriginMode},
    token::ORIGIN_HEADER,
    AppState,
};

pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// HMAC key for origin tokens. `None` or empty disables enforcement.
    pub origin_secret: Option<String>,
    pub gate_match: GateMatch,
    pub cors_origins: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: std::env::var("EFFIZIENZ_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: std::env::var("EFFIZIENZ_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            origin_secret: std::env::var("EFFIZIENZ_ORIGIN_SECRET").ok(),
            gate_match: gate_match_from(std::env::var("EFFIZIENZ_GATE_MATCH").ok().as_deref()),
            cors_origins: std::env::var("EFFIZIENZ_CORS_ORIGINS").ok(),
        }
    }
}

/// Parse a gate match mode, falling back to the default (with a warning) on
/// anything unrecognised.
pub fn gate_match_from(raw: Option<&str>) -> GateMatch {
    match raw.map(str::parse::<GateMatch>) {
        None => GateMatch::default(),
        Some(Ok(m)) => m,
        Some(Err(reason)) => {
            let fallback = GateMatch::default();
            warn!(%reason, ?fallback, "ignoring invalid EFFIZIENZ_GATE_MATCH");
            fallback
        }
    }
}

pub async fn run(cfg: ServerConfig) -> Result<()> {
    let mode = OriginMode::from_secret(cfg.origin_secret);
    let state = AppState {
        origin: OriginAuthenticator::new(mode),
        gate: RouteGate::new(cfg.gate_match),
    };

    if state.origin.is_enforced() {
        info!(
            gate_match = ?state.gate.matching(),
            "origin tokens enforced on gated API routes"
        );
    } else {
        warn!("EFFIZIENZ_ORIGIN_SECRET not set — origin token checks are DISABLED");
    }

    let app = build_router(state).layer(build_cors(cfg.cors_origins.as_deref()));

    let addr: SocketAddr = format!("{}:{}", cfg.host, cfg.port)
        .parse()
        .context("invalid host/port")?;

    info!(%addr, "effizienz server listening");
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("bind listener")?;

    axum::serve(listener, app).await.context("server error")
}

/// Assemble the router with the origin middleware wrapped around every route,
/// including the fallback, so unknown API paths are still gated.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/origin/check", post(origin_check))
        .fallback(not_found)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            require_origin_token,
        ))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Read an origin secret from a file, trimming surrounding whitespace.
pub fn read_secret_file(path: &Path) -> Result<String> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("read secret file {}", path.display()))?;
    let secret = raw.trim().to_owned();
    if secret.is_empty() {
        anyhow::bail!("secret file {} is empty", path.display());
    }
    Ok(secret)
}

/// Generate a fresh origin secret: 32 random bytes, hex encoded.
pub fn generate_secret() -> String {
    use rand::Rng;
    let bytes: [u8; 32] = rand::thread_rng().gen();
    hex::encode(bytes)
}

fn build_cors(origins: Option<&str>) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([
            http::Method::GET,
            http::Method::HEAD,
            http::Method::POST,
            http::Method::PUT,
            http::Method::PATCH,
            http::Method::DELETE,
            http::Method::OPTIONS,
        ])
        .allow_headers([
            http::header::CONTENT_TYPE,
            http::header::AUTHORIZATION,
            HeaderName::from_static(ORIGIN_HEADER),
        ]);

    match origins {
        Some(o) => {
            let origins: Vec<_> = o
                .split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect();
            cors.allow_origin(origins)
        }
        None => cors.allow_origin(Any),
    }
}
