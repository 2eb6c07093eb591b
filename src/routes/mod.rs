use std::sync::Arc;

use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::service::ReadingService;
use crate::verification::VerificationCodes;

mod health;
mod sensores;
mod verification;

// ---

/// Shared handler state. Cloning only bumps reference counts.
#[derive(Clone)]
pub struct AppState {
    pub readings: Arc<ReadingService>,
    pub codes: Arc<VerificationCodes>,
}

pub fn router(state: AppState) -> Router {
    // ---
    Router::new()
        .merge(sensores::router())
        .merge(verification::router())
        .merge(health::router())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
