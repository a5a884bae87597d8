//! Health check handler

use std::time::{SystemTime, UNIX_EPOCH};

use axum::Json;
use utoipa::ToSchema;

use super::super::response::ApiResponse;

#[derive(serde::Serialize, ToSchema)]
pub struct HealthResponse {
    /// Server timestamp in milliseconds
    #[schema(example = 1703494800000_u64)]
    pub timestamp_ms: u64,
    pub version: &'static str,
}

/// Liveness probe. No dependency checks, no internal details.
#[utoipa::path(
    get,
    path = "/api/health",
    responses(
        (status = 200, description = "Service en ligne", body = HealthResponse)
    ),
    tag = "System"
)]
pub async fn health_check() -> Json<ApiResponse<HealthResponse>> {
    let timestamp_ms = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0);
    Json(ApiResponse::success(HealthResponse {
        timestamp_ms,
        version: env!("CARGO_PKG_VERSION"),
    }))
}
