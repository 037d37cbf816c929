// Health check for load balancers

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

use crate::app::AppState;

/// GET /health - Store connectivity
#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    operation_id = "healthCheck",
    responses(
        (status = 200, description = "Service healthy"),
        (status = 503, description = "Store unreachable")
    )
)]
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let timestamp = chrono::Utc::now().to_rfc3339();

    match state.store.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "status": "healthy",
                "service": "classifieds-backend",
                "timestamp": timestamp,
                "components": { "store": { "status": "healthy", "error": null } }
            })),
        ),
        Err(e) => {
            tracing::error!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "degraded",
                    "service": "classifieds-backend",
                    "timestamp": timestamp,
                    "components": {
                        "store": { "status": "unhealthy", "error": e.to_string() }
                    }
                })),
            )
        },
    }
}
