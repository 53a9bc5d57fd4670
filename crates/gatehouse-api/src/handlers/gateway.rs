//! Fallback handler that hands unmatched requests to the gateway.

use axum::extract::{Request, State};
use axum::response::Response;

use crate::state::AppState;

/// Any path without a local route.
pub async fn proxy(State(state): State<AppState>, request: Request) -> Response {
    state.gateway.route(request).await
}
