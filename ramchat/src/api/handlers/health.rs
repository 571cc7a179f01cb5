//! HTTP handler for the health check endpoint.

use axum::Json;
use chrono::Utc;

use crate::api::models::health::HealthResponse;

const HEALTH_MESSAGE: &str = "ramchat server is running";

#[utoipa::path(
    get,
    path = "/api/health",
    tag = "health",
    summary = "Health check",
    description = "Liveness probe. Always returns 200 with a fixed message and the current server time.",
    responses(
        (status = 200, description = "Server is up", body = HealthResponse),
    )
)]
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        message: HEALTH_MESSAGE.to_string(),
        timestamp: Utc::now(),
    })
}
