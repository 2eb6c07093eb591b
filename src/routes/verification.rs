//! Email verification code endpoints under `/api/verification`.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use super::AppState;
use crate::error::{AppError, AppResult};

// ---

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/verification/issue", post(issue))
        .route("/api/verification/verify", post(verify))
        .route("/api/verification/clear", post(clear))
}

#[derive(Debug, Deserialize)]
struct IssueRequest {
    email: String,
}

#[derive(Debug, Deserialize)]
struct VerifyRequest {
    email: String,
    code: String,
    /// `false` checks the code without using it up.
    #[serde(default = "consume_by_default")]
    consume: bool,
}

fn consume_by_default() -> bool {
    true
}

#[derive(Debug, Serialize)]
struct VerifyResponse {
    verified: bool,
}

/// Mail a fresh code. The code itself is never returned over HTTP.
async fn issue(
    State(state): State<AppState>,
    body: Result<Json<IssueRequest>, JsonRejection>,
) -> AppResult<StatusCode> {
    // ---
    let Json(req) = body?;
    let email = req.email.trim();
    if email.is_empty() {
        return Err(AppError::BadRequest("email must not be empty".to_string()));
    }

    state.codes.issue(email).await?;
    Ok(StatusCode::ACCEPTED)
}

/// A successful verification consumes the code unless the body says otherwise.
async fn verify(
    State(state): State<AppState>,
    body: Result<Json<VerifyRequest>, JsonRejection>,
) -> AppResult<Json<VerifyResponse>> {
    // ---
    let Json(req) = body?;
    let email = req.email.trim();
    let verified = if req.consume {
        state.codes.consume(email, &req.code)
    } else {
        state.codes.verify(email, &req.code)
    };
    Ok(Json(VerifyResponse { verified }))
}

/// Discard any pending code for the address. Always 204.
async fn clear(
    State(state): State<AppState>,
    body: Result<Json<IssueRequest>, JsonRejection>,
) -> AppResult<StatusCode> {
    let Json(req) = body?;
    state.codes.clear(req.email.trim());
    Ok(StatusCode::NO_CONTENT)
}
