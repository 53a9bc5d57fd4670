//! RBAC administration handlers.

use axum::Json;
use axum::extract::{Path, State};
use tracing::info;

use gatehouse_core::error::AppError;

use crate::dto::request::{CheckRequest, PermissionRequest, validate_body};
use crate::dto::response::{
    ApiResponse, CheckResponse, MessageResponse, MutationResponse, PolicySummaryResponse,
    SubjectPermissionsResponse, SubjectRolesResponse,
};
use crate::extractors::CurrentPrincipal;
use crate::state::AppState;

/// POST /v1/rbac/check
pub async fn check(
    State(state): State<AppState>,
    Json(req): Json<CheckRequest>,
) -> Result<Json<ApiResponse<CheckResponse>>, AppError> {
    validate_body(&req)?;
    let allowed = state
        .policy
        .enforce(&req.subject, &req.resource, &req.action)?;

    Ok(Json(ApiResponse::ok(CheckResponse {
        subject: req.subject,
        resource: req.resource,
        action: req.action,
        allowed,
    })))
}

/// GET /v1/rbac/subjects/{subject}/roles
pub async fn subject_roles(
    State(state): State<AppState>,
    Path(subject): Path<String>,
) -> Result<Json<ApiResponse<SubjectRolesResponse>>, AppError> {
    let roles = state.policy.roles_of(&subject)?;
    Ok(Json(ApiResponse::ok(SubjectRolesResponse { subject, roles })))
}

/// GET /v1/rbac/subjects/{subject}/permissions
pub async fn subject_permissions(
    State(state): State<AppState>,
    Path(subject): Path<String>,
) -> Result<Json<ApiResponse<SubjectPermissionsResponse>>, AppError> {
    let permissions = state.policy.permissions_of(&subject)?;
    Ok(Json(ApiResponse::ok(SubjectPermissionsResponse {
        subject,
        permissions,
    })))
}

/// PUT /v1/rbac/subjects/{subject}/roles/{role}
pub async fn grant_role(
    State(state): State<AppState>,
    actor: CurrentPrincipal,
    Path((subject, role)): Path<(String, String)>,
) -> Result<Json<ApiResponse<MutationResponse>>, AppError> {
    let changed = state.policy.grant_role(&subject, &role).await?;
    info!(actor = %actor.subject_id, subject = %subject, role = %role, changed, "Role granted");
    Ok(Json(ApiResponse::ok(MutationResponse { changed })))
}

/// DELETE /v1/rbac/subjects/{subject}/roles/{role}
pub async fn revoke_role(
    State(state): State<AppState>,
    actor: CurrentPrincipal,
    Path((subject, role)): Path<(String, String)>,
) -> Result<Json<ApiResponse<MutationResponse>>, AppError> {
    let changed = state.policy.revoke_role(&subject, &role).await?;
    info!(actor = %actor.subject_id, subject = %subject, role = %role, changed, "Role revoked");
    Ok(Json(ApiResponse::ok(MutationResponse { changed })))
}

/// POST /v1/rbac/roles/{role}/permissions
pub async fn grant_permission(
    State(state): State<AppState>,
    actor: CurrentPrincipal,
    Path(role): Path<String>,
    Json(req): Json<PermissionRequest>,
) -> Result<Json<ApiResponse<MutationResponse>>, AppError> {
    validate_body(&req)?;
    let changed = state
        .policy
        .grant_permission(&role, &req.resource, &req.action)
        .await?;
    info!(
        actor = %actor.subject_id,
        role = %role,
        resource = %req.resource,
        action = %req.action,
        changed,
        "Permission granted"
    );
    Ok(Json(ApiResponse::ok(MutationResponse { changed })))
}

/// DELETE /v1/rbac/roles/{role}/permissions
pub async fn revoke_permission(
    State(state): State<AppState>,
    actor: CurrentPrincipal,
    Path(role): Path<String>,
    Json(req): Json<PermissionRequest>,
) -> Result<Json<ApiResponse<MutationResponse>>, AppError> {
    validate_body(&req)?;
    let changed = state
        .policy
        .revoke_permission(&role, &req.resource, &req.action)
        .await?;
    info!(
        actor = %actor.subject_id,
        role = %role,
        resource = %req.resource,
        action = %req.action,
        changed,
        "Permission revoked"
    );
    Ok(Json(ApiResponse::ok(MutationResponse { changed })))
}

/// POST /v1/rbac/reload
pub async fn reload(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<PolicySummaryResponse>>, AppError> {
    state.policy.reload().await?;
    let snapshot = state.policy.snapshot();
    Ok(Json(ApiResponse::ok(PolicySummaryResponse {
        rules: snapshot.rule_count(),
        groupings: snapshot.grouping_count(),
    })))
}

/// POST /v1/rbac/persist
pub async fn persist(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<MessageResponse>>, AppError> {
    state.policy.persist().await?;
    Ok(Json(ApiResponse::ok(MessageResponse {
        message: "Policy persisted".to_string(),
    })))
}
