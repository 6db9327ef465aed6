//! Liveness endpoint for the delivery platform API.

use axum::Json;
use serde::Serialize;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// GET /health — liveness probe; no auth, no storage access.
pub async fn check() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}
