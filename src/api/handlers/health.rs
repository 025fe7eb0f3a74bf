use crate::AppState;
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    /// "ok" when every dependency answers, "degraded" otherwise
    pub status: String,
    pub database: String,
    pub uploads: String,
    pub version: String,
}

fn describe(up: bool, good: &str, bad: &str) -> String {
    let label = if up { good } else { bad };
    label.to_string()
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Database and uploads reachable", body = HealthResponse),
        (status = 503, description = "A dependency is unreachable", body = HealthResponse)
    ),
    tag = "system"
)]
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let database_up = state.db.ping().await.is_ok();
    let uploads_up = state.uploads.is_available().await;
    let healthy = database_up && uploads_up;

    let code = if healthy {
        StatusCode::OK
    } else {
        tracing::warn!(database_up, uploads_up, "Health check degraded");
        StatusCode::SERVICE_UNAVAILABLE
    };

    let body = HealthResponse {
        status: describe(healthy, "ok", "degraded"),
        database: describe(database_up, "connected", "disconnected"),
        uploads: describe(uploads_up, "available", "missing"),
        version: env!("CARGO_PKG_VERSION").to_string(),
    };

    (code, Json(body))
}
