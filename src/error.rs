//! HTTP-facing error type.
//!
//! Handlers return [`AppResult`]; [`AppError`] renders every failure as a
//! JSON body `{"error": ..., "code": ...}` with the matching status.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::mailer::MailError;
use crate::models::InvalidReading;
use crate::store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// No reading has the requested id.
    #[error("Reading with id {0} not found")]
    NotFound(i64),

    /// The submitted reading failed validation.
    #[error(transparent)]
    InvalidReading(#[from] InvalidReading),

    /// The request body was not valid JSON for the endpoint.
    #[error(transparent)]
    JsonRejection(#[from] JsonRejection),

    /// A bad request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// The persistence backend failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Mail delivery failed where the caller depends on it.
    #[error(transparent)]
    Mail(#[from] MailError),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // ---
        let (status, code, message) = match &self {
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND", self.to_string()),
            AppError::InvalidReading(e) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", e.to_string())
            }
            AppError::JsonRejection(e) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", e.body_text()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            AppError::Store(e) => {
                tracing::error!(error = %e, "Store error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal error occurred".to_string(),
                )
            }
            AppError::Mail(e) => {
                tracing::error!(error = %e, "Mail delivery error");
                (
                    StatusCode::BAD_GATEWAY,
                    "MAIL_DELIVERY_FAILED",
                    "The message could not be delivered".to_string(),
                )
            }
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}
