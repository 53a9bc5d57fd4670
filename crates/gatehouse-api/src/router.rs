//! Route definitions for the Gatehouse HTTP API.
//!
//! Local routes live under `/v1` plus the health probes. Everything else
//! falls through to the gateway.

use axum::handler::Handler;
use axum::{
    Router,
    middleware as axum_middleware,
    routing::{any, get, post, put},
};

use crate::handlers;
use crate::middleware;
use crate::state::AppState;

/// Build the complete Axum router with all routes and middleware.
///
/// Local routes other than `/health` sit behind the access pipeline. The
/// gateway fallback joins them when `gateway.authenticate` is set. Only
/// the forward-auth endpoint reads proxy-supplied target headers.
pub fn build_router(state: AppState) -> Router {
    let access = axum_middleware::from_fn_with_state(
        state.clone(),
        middleware::access::require_access,
    );
    let forwarded = axum_middleware::from_fn_with_state(
        state.clone(),
        middleware::access::require_forwarded_access,
    );

    let protected = Router::new()
        .merge(auth_routes())
        .merge(rbac_routes())
        .merge(catalog_routes())
        .route("/health/detailed", get(handlers::health::health_detailed))
        .route_layer(access.clone());

    let forward_auth = Router::new()
        .route("/v1/auth/verify", any(handlers::auth::verify))
        .route_layer(forwarded);

    let router = Router::new()
        .route("/health", get(handlers::health::health))
        .merge(protected)
        .merge(forward_auth);

    let router = if state.config.gateway.authenticate {
        router.fallback(handlers::gateway::proxy.layer(access))
    } else {
        router.fallback(handlers::gateway::proxy)
    };

    router
        .layer(axum_middleware::from_fn(
            middleware::logging::request_logging,
        ))
        .with_state(state)
}

/// Token endpoints: refresh, me
fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/v1/auth/refresh", post(handlers::auth::refresh))
        .route("/v1/auth/me", get(handlers::auth::me))
}

/// Policy administration
fn rbac_routes() -> Router<AppState> {
    Router::new()
        .route("/v1/rbac/check", post(handlers::rbac::check))
        .route(
            "/v1/rbac/subjects/{subject}/roles",
            get(handlers::rbac::subject_roles),
        )
        .route(
            "/v1/rbac/subjects/{subject}/permissions",
            get(handlers::rbac::subject_permissions),
        )
        .route(
            "/v1/rbac/subjects/{subject}/roles/{role}",
            put(handlers::rbac::grant_role).delete(handlers::rbac::revoke_role),
        )
        .route(
            "/v1/rbac/roles/{role}/permissions",
            post(handlers::rbac::grant_permission).delete(handlers::rbac::revoke_permission),
        )
        .route("/v1/rbac/reload", post(handlers::rbac::reload))
        .route("/v1/rbac/persist", post(handlers::rbac::persist))
}

/// Role and permission catalog
fn catalog_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/v1/rbac/catalog/roles",
            get(handlers::catalog::list_roles).post(handlers::catalog::create_role),
        )
        .route(
            "/v1/rbac/catalog/roles/{id}",
            get(handlers::catalog::get_role)
                .put(handlers::catalog::update_role)
                .delete(handlers::catalog::delete_role),
        )
        .route(
            "/v1/rbac/catalog/roles/{id}/status",
            put(handlers::catalog::change_role_status),
        )
        .route(
            "/v1/rbac/catalog/roles/{id}/permissions",
            get(handlers::catalog::role_permissions),
        )
        .route(
            "/v1/rbac/catalog/roles/{id}/permissions/{permission_id}",
            put(handlers::catalog::assign_permission)
                .delete(handlers::catalog::remove_permission),
        )
        .route(
            "/v1/rbac/catalog/permissions",
            get(handlers::catalog::list_permissions).post(handlers::catalog::create_permission),
        )
        .route(
            "/v1/rbac/catalog/permissions/{id}",
            get(handlers::catalog::get_permission)
                .put(handlers::catalog::update_permission)
                .delete(handlers::catalog::delete_permission),
        )
        .route(
            "/v1/rbac/catalog/permissions/{id}/status",
            put(handlers::catalog::change_permission_status),
        )
}
