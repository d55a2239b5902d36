//! Status endpoints.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::api::types::ApiContext;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RootStatus {
    pub status: &'static str,
    pub db_status: &'static str,
    pub environment: &'static str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub db_status: &'static str,
    pub timestamp: String,
    pub version: &'static str,
    pub uptime_secs: u64,
}

/// `GET /` — service banner.
pub async fn root(State(ctx): State<ApiContext>) -> Json<RootStatus> {
    Json(RootStatus {
        status: "Healthcare Database API",
        db_status: ctx.core.db_status(),
        environment: ctx.core.config.environment.as_str(),
    })
}

/// `GET /api/health`
pub async fn check(State(ctx): State<ApiContext>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "API is running",
        db_status: ctx.core.db_status(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        version: crate::config::APP_VERSION,
        uptime_secs: ctx.core.uptime_secs(),
    })
}
