//! Health check handlers.

use axum::Json;
use axum::extract::State;
use serde::Serialize;

use crate::dto::response::ApiResponse;
use crate::state::AppState;

/// Component summary returned by the detailed probe.
#[derive(Debug, Clone, Serialize)]
pub struct DetailedHealthResponse {
    pub status: String,
    pub version: String,
    pub discovery: String,
    pub policy_loaded: bool,
    pub policy_rules: usize,
    pub policy_groupings: usize,
    pub gateway_routes: usize,
}

/// GET /health
pub async fn health() -> &'static str {
    "OK"
}

/// GET /health/detailed
pub async fn health_detailed(
    State(state): State<AppState>,
) -> Json<ApiResponse<DetailedHealthResponse>> {
    let snapshot = state.policy.snapshot();

    Json(ApiResponse::ok(DetailedHealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        discovery: state.registry.backend().to_string(),
        policy_loaded: snapshot.is_loaded(),
        policy_rules: snapshot.rule_count(),
        policy_groupings: snapshot.grouping_count(),
        gateway_routes: state.gateway.routes().routes().len(),
    }))
}
