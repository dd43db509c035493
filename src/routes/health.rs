use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;

use crate::AppState;

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    sessions_active: usize,
    version: &'static str,
}

/// Build the health check router.
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check)).route("/ready", get(readiness_check))
}

/// Liveness probe: always returns 200 with component status. The session
/// store and chain adapter are in-process, so liveness never reports
/// degraded — only a genuinely stuck process fails this check.
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        sessions_active: state.store.list_active().len(),
        version: VERSION,
    })
}

/// Readiness probe: the store and chain adapter are in-process, so the only
/// thing that can make this process unready is the store lock itself being
/// poisoned by a panicked actor task — exercised here via `list_active`.
async fn readiness_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ready",
        sessions_active: state.store.list_active().len(),
        version: VERSION,
    })
}
