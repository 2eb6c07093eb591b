//! Reading CRUD and filter endpoints under `/api/sensores`.

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use chrono::NaiveDate;
use serde::Deserialize;
use tracing::info;

use super::AppState;
use crate::error::{AppError, AppResult};
use crate::models::{Reading, ReadingDraft, ReadingInput};
use crate::service::ReadingFilter;

// ---

pub fn router() -> Router<AppState> {
    // ---
    Router::new()
        .route("/api/sensores", get(list).post(create))
        .route("/api/sensores/filtrar", get(filter))
        .route(
            "/api/sensores/{id}",
            get(get_one).put(update).delete(remove),
        )
}

/// Query parameters for `GET /api/sensores/filtrar`.
#[derive(Debug, Deserialize)]
pub struct FilterQuery {
    /// ISO date, e.g. `2025-05-01`.
    fecha: Option<NaiveDate>,
    /// Tier name; an unknown name matches nothing.
    tipo: Option<String>,
    sensor: Option<String>,
}

async fn list(State(state): State<AppState>) -> AppResult<Json<Vec<Reading>>> {
    Ok(Json(state.readings.list_all().await?))
}

async fn filter(
    State(state): State<AppState>,
    Query(params): Query<FilterQuery>,
) -> AppResult<Json<Vec<Reading>>> {
    // ---
    info!("GET /api/sensores/filtrar {:?}", params);
    let filter = ReadingFilter {
        date: params.fecha,
        tier: params.tipo,
        sensor_id: params.sensor,
    };
    Ok(Json(state.readings.filter(&filter).await?))
}

async fn get_one(State(state): State<AppState>, Path(id): Path<i64>) -> AppResult<Json<Reading>> {
    state
        .readings
        .get(id)
        .await?
        .map(Json)
        .ok_or(AppError::NotFound(id))
}

async fn create(
    State(state): State<AppState>,
    body: Result<Json<ReadingInput>, JsonRejection>,
) -> AppResult<(StatusCode, Json<Reading>)> {
    // ---
    let Json(input) = body?;
    let draft = ReadingDraft::try_from(input)?;
    let saved = state.readings.save(draft).await?;
    Ok((StatusCode::CREATED, Json(saved)))
}

/// Full replacement. The id comes from the path, never from the body.
async fn update(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    body: Result<Json<ReadingInput>, JsonRejection>,
) -> AppResult<Json<Reading>> {
    // ---
    let Json(input) = body?;
    let draft = ReadingDraft::try_from(input)?;
    state
        .readings
        .update(id, draft)
        .await?
        .map(Json)
        .ok_or(AppError::NotFound(id))
}

async fn remove(State(state): State<AppState>, Path(id): Path<i64>) -> AppResult<StatusCode> {
    if state.readings.delete(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(id))
    }
}

#[cfg(test)]
mod tests {
    // ---
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    use crate::routes::test_support::{body_json, send, test_app};

    #[tokio::test]
    async fn create_returns_201_with_derived_tier() {
        // ---
        let app = test_app();
        let response = send(
            &app.router,
            Method::POST,
            "/api/sensores",
            Some(json!({"date": "2025-05-01", "sensor_id": "SEN1", "water_level_cm": 140})),
        )
        .await;

        assert_eq!(response.status(), StatusCode::CREATED);
        let body = body_json(response).await;
        assert_eq!(body["id"], 1);
        assert_eq!(body["alert_tier"], "HIGH");
        assert_eq!(app.notifier.calls(), vec![("SEN1".to_string(), 140)]);
    }

    #[tokio::test]
    async fn create_rejects_invalid_reading() {
        // ---
        let app = test_app();
        let response = send(
            &app.router,
            Method::POST,
            "/api/sensores",
            Some(json!({"date": "2025-05-01", "sensor_id": "SEN1", "water_level_cm": -3})),
        )
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn malformed_body_is_json_400() {
        // ---
        let app = test_app();
        let response = send(
            &app.router,
            Method::POST,
            "/api/sensores",
            Some(json!({"sensor_id": "SEN1", "water_level_cm": 10})),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["code"], "BAD_REQUEST");
        assert!(body["error"].as_str().unwrap().contains("date"));

        let response = send(
            &app.router,
            Method::PUT,
            "/api/sensores/1",
            Some(json!({"date": "2025-05-01", "sensor_id": "SEN1", "water_level_cm": "high"})),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["code"], "BAD_REQUEST");
        assert!(app.notifier.calls().is_empty());
    }

    #[tokio::test]
    async fn get_put_delete_unknown_id_is_404() {
        // ---
        let app = test_app();
        let body = json!({"date": "2025-05-01", "sensor_id": "SEN1", "water_level_cm": 10});

        let response = send(&app.router, Method::GET, "/api/sensores/7", None).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = send(&app.router, Method::PUT, "/api/sensores/7", Some(body)).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = send(&app.router, Method::DELETE, "/api/sensores/7", None).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn update_keeps_path_id_and_rederives_tier() {
        // ---
        let app = test_app();
        send(
            &app.router,
            Method::POST,
            "/api/sensores",
            Some(json!({"date": "2025-05-01", "sensor_id": "SEN2", "water_level_cm": 30})),
        )
        .await;

        let response = send(
            &app.router,
            Method::PUT,
            "/api/sensores/1",
            Some(json!({"id": 99, "date": "2025-05-02", "sensor_id": "SEN2", "water_level_cm": 200})),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["id"], 1);
        assert_eq!(body["alert_tier"], "HIGH");
        assert_eq!(body["date"], "2025-05-02");
        assert_eq!(app.notifier.calls().len(), 1);
    }

    #[tokio::test]
    async fn delete_then_get_is_404() {
        // ---
        let app = test_app();
        send(
            &app.router,
            Method::POST,
            "/api/sensores",
            Some(json!({"fecha": "2025-05-01", "sensorId": "SEN3", "nivelDeAguaCm": 60})),
        )
        .await;

        let response = send(&app.router, Method::DELETE, "/api/sensores/1", None).await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let response = send(&app.router, Method::GET, "/api/sensores/1", None).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn filter_by_date_and_tier() {
        // ---
        let app = test_app();
        for (date, sensor, level) in [
            ("2025-05-01", "SEN1", 10),
            ("2025-05-01", "SEN2", 90),
            ("2025-05-02", "SEN1", 100),
        ] {
            send(
                &app.router,
                Method::POST,
                "/api/sensores",
                Some(json!({"date": date, "sensor_id": sensor, "water_level_cm": level})),
            )
            .await;
        }

        let response = send(&app.router, Method::GET, "/api/sensores", None).await;
        assert_eq!(body_json(response).await.as_array().unwrap().len(), 3);

        let response = send(
            &app.router,
            Method::GET,
            "/api/sensores/filtrar?fecha=2025-05-01&tipo=medium",
            None,
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body.as_array().unwrap().len(), 1);
        assert_eq!(body[0]["sensor_id"], "SEN2");

        let response = send(&app.router, Method::GET, "/api/sensores/filtrar?tipo=bogus", None).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, json!([]));
    }
}
