//! Access-control middleware.
//!
//! Adapts [`AccessController`] to HTTP: it resolves the authorization
//! target, runs the pipeline, attaches the [`Principal`] to the request
//! extensions and renders failures through [`AppError`].
//!
//! [`require_access`] guards routes served or proxied by this process and
//! always checks the request's own path and method. Proxy-supplied target
//! headers are honored only by [`require_forwarded_access`], which fronts
//! the side-effect-free forward-auth endpoint.
//!
//! [`Principal`]: gatehouse_auth::Principal

use axum::extract::{Request, State};
use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tracing::debug;

use gatehouse_auth::{AccessController, AccessDecision, AccessRequest, AccessTarget};
use gatehouse_core::config::access::TargetSource;
use gatehouse_core::error::AppError;

use crate::state::AppState;

/// Header carrying the original path when a proxy delegates the check.
pub const X_REQUEST_PATH: &str = "x-request-path";
/// Fallback for [`X_REQUEST_PATH`].
pub const X_ORIGINAL_URI: &str = "x-original-uri";
/// Header carrying the original method when a proxy delegates the check.
pub const X_REQUEST_METHOD: &str = "x-request-method";
/// Fallback for [`X_REQUEST_METHOD`].
pub const X_HTTP_METHOD: &str = "x-http-method";

/// Runs the access pipeline against the request's own path and method.
pub async fn require_access(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let outcome = {
        let path = request.uri().path();
        let access_request = AccessRequest {
            path,
            authorization: authorization_header(request.headers()),
            target: resolve_target(TargetSource::Request, &request),
        };
        state.access.check(&access_request)
    };
    dispatch(outcome, request, next).await
}

/// Runs the access pipeline for a forward-auth check.
///
/// With `access.target_source = "headers"` the skip-list and the policy
/// are evaluated against the path and method the upstream proxy forwarded.
/// When those headers are absent only authentication is performed.
pub async fn require_forwarded_access(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let outcome = {
        let target = resolve_target(state.config.access.target_source, &request);
        let path = match &target {
            Some(target) => target.resource.clone(),
            None => request.uri().path().to_string(),
        };
        let access_request = AccessRequest {
            path: &path,
            authorization: authorization_header(request.headers()),
            target,
        };
        state.access.check(&access_request)
    };
    dispatch(outcome, request, next).await
}

async fn dispatch(
    outcome: Result<AccessDecision, AppError>,
    mut request: Request,
    next: Next,
) -> Response {
    match outcome {
        Ok(AccessDecision::Bypass) => next.run(request).await,
        Ok(AccessDecision::Granted(principal)) => {
            request.extensions_mut().insert(principal);
            next.run(request).await
        }
        Err(e) => {
            debug!(
                kind = %e.kind,
                path = %request.uri().path(),
                "Request rejected by access pipeline"
            );
            e.into_response()
        }
    }
}

/// Resolves the (resource, action) pair for the configured source.
///
/// `None` means the authorization stage is skipped for this request.
pub fn resolve_target(source: TargetSource, request: &Request) -> Option<AccessTarget> {
    match source {
        TargetSource::Request => Some(AccessTarget::new(
            request.uri().path(),
            request.method().as_str(),
        )),
        TargetSource::Headers => target_from_headers(request.headers()),
    }
}

fn target_from_headers(headers: &HeaderMap) -> Option<AccessTarget> {
    let path = header_value(headers, X_REQUEST_PATH)
        .or_else(|| header_value(headers, X_ORIGINAL_URI))?;
    let method = header_value(headers, X_REQUEST_METHOD)
        .or_else(|| header_value(headers, X_HTTP_METHOD))?;

    let path = path.split('?').next().unwrap_or(path);
    Some(AccessTarget::new(path, method))
}

fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
}

/// A present but non-UTF-8 header reads as empty so that extraction
/// reports it as malformed rather than missing.
fn authorization_header(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .map(|v| v.to_str().unwrap_or_default())
}

/// Extracts the bearer token from a request, for handlers that verify
/// tokens outside the middleware.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AppError> {
    AccessController::extract(authorization_header(headers))
}
