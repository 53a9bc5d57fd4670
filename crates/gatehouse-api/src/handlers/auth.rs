//! Auth handlers: refresh, me, verify.

use axum::extract::State;
use axum::{Extension, Json};
use axum::http::HeaderMap;
use tracing::warn;

use gatehouse_auth::Principal;
use gatehouse_core::error::AppError;

use crate::dto::response::{ApiResponse, TokenResponse, VerifyResponse};
use crate::extractors::CurrentPrincipal;
use crate::middleware::access::bearer_token;
use crate::state::AppState;

/// POST /v1/auth/refresh
///
/// Skip-listed, so the presented token is verified here rather than by
/// the access middleware. An expired token cannot be refreshed.
pub async fn refresh(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<ApiResponse<TokenResponse>>, AppError> {
    let token = bearer_token(&headers)?;

    let refreshed = state.token_codec.refresh(token).map_err(|e| {
        warn!(kind = %e.kind, error = %e.message, "Token refresh rejected");
        e
    })?;
    let claims = state.token_codec.verify(&refreshed)?;
    let expires_at = claims
        .expires_at()
        .ok_or_else(|| AppError::internal("Issued token has an out-of-range expiry"))?;

    Ok(Json(ApiResponse::ok(TokenResponse {
        access_token: refreshed,
        token_type: "Bearer".to_string(),
        expires_in: state.token_codec.ttl_seconds(),
        expires_at,
    })))
}

/// GET /v1/auth/me
pub async fn me(CurrentPrincipal(principal): CurrentPrincipal) -> Json<ApiResponse<Principal>> {
    Json(ApiResponse::ok(principal))
}

/// ANY /v1/auth/verify
///
/// Forward-auth endpoint for an upstream proxy. Reaching the handler means
/// the forwarded target passed the access pipeline.
pub async fn verify(principal: Option<Extension<Principal>>) -> Json<ApiResponse<VerifyResponse>> {
    let principal = principal.map(|Extension(p)| p);
    Json(ApiResponse::ok(VerifyResponse {
        authenticated: principal.is_some(),
        principal,
    }))
}
