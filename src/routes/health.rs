// src/routes/health.rs
//! Service health check endpoint.
//!
//! `/health` is used by container orchestrators and CI pipelines to verify
//! that the service is up and its reading store answers. It is a sibling
//! module in the `routes` directory; the gateway (`mod.rs`) merges its
//! subrouter so `main.rs` never needs to know about individual endpoints.

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use serde::Serialize;

use super::AppState;

/// JSON response body for the `/health` endpoint.
#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    /// Number of stored readings; absent when the store is unreachable.
    #[serde(skip_serializing_if = "Option::is_none")]
    readings: Option<i64>,
}

/// Handle `GET /health`.
///
/// Returns 200 with the reading count when the store answers, 503 otherwise.
async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    match state.readings.count().await {
        Ok(count) => (
            StatusCode::OK,
            Json(HealthResponse {
                status: "ok",
                readings: Some(count),
            }),
        ),
        Err(e) => {
            tracing::warn!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthResponse {
                    status: "degraded",
                    readings: None,
                }),
            )
        }
    }
}

/// Create a subrouter containing the `/health` route.
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health))
}
