//! Role and permission catalog handlers.
//!
//! Available when `policy.backend = "catalog"`. Every change is pushed into
//! the live policy before the response is sent.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use tracing::info;

use gatehouse_auth::RbacCatalog;
use gatehouse_auth::policy::{PermissionUpdate, RoleUpdate};
use gatehouse_core::error::AppError;
use gatehouse_core::types::pagination::PageResponse;
use gatehouse_core::types::rbac::{Permission, Role};

use crate::dto::request::{
    CatalogListParams, ChangeStatusRequest, CreatePermissionRequest, CreateRoleRequest,
    UpdatePermissionRequest, UpdateRoleRequest, validate_body,
};
use crate::dto::response::{ApiResponse, MessageResponse, MutationResponse};
use crate::extractors::CurrentPrincipal;
use crate::state::AppState;

fn catalog(state: &AppState) -> Result<&Arc<RbacCatalog>, AppError> {
    state
        .catalog
        .as_ref()
        .ok_or_else(|| AppError::not_found("Policy catalog is not enabled"))
}

/// Republishes the catalog as the live policy and mirrors it to disk.
async fn sync_policy(state: &AppState) -> Result<(), AppError> {
    state.policy.reload().await?;
    state.policy.persist().await
}

// ── Roles ───────────────────────────────────────────────────────────

/// GET /v1/rbac/catalog/roles
pub async fn list_roles(
    State(state): State<AppState>,
    Query(params): Query<CatalogListParams>,
) -> Result<Json<ApiResponse<PageResponse<Role>>>, AppError> {
    let page = catalog(&state)?
        .list_roles(params.page_request(), params.name.as_deref())
        .await?;
    Ok(Json(ApiResponse::ok(page)))
}

/// POST /v1/rbac/catalog/roles
pub async fn create_role(
    State(state): State<AppState>,
    actor: CurrentPrincipal,
    Json(req): Json<CreateRoleRequest>,
) -> Result<Json<ApiResponse<Role>>, AppError> {
    validate_body(&req)?;
    let role = catalog(&state)?
        .create_role(&req.name, &req.description)
        .await?;
    info!(actor = %actor.subject_id, role_id = role.id, name = %role.name, "Catalog role created");
    Ok(Json(ApiResponse::ok(role)))
}

/// GET /v1/rbac/catalog/roles/{id}
pub async fn get_role(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<ApiResponse<Role>>, AppError> {
    let role = catalog(&state)?.get_role(id).await?;
    Ok(Json(ApiResponse::ok(role)))
}

/// PUT /v1/rbac/catalog/roles/{id}
pub async fn update_role(
    State(state): State<AppState>,
    actor: CurrentPrincipal,
    Path(id): Path<u64>,
    Json(req): Json<UpdateRoleRequest>,
) -> Result<Json<ApiResponse<Role>>, AppError> {
    validate_body(&req)?;
    let role = catalog(&state)?
        .update_role(
            id,
            RoleUpdate {
                name: req.name,
                description: req.description,
            },
        )
        .await?;
    sync_policy(&state).await?;
    info!(actor = %actor.subject_id, role_id = id, "Catalog role updated");
    Ok(Json(ApiResponse::ok(role)))
}

/// PUT /v1/rbac/catalog/roles/{id}/status
pub async fn change_role_status(
    State(state): State<AppState>,
    actor: CurrentPrincipal,
    Path(id): Path<u64>,
    Json(req): Json<ChangeStatusRequest>,
) -> Result<Json<ApiResponse<Role>>, AppError> {
    let role = catalog(&state)?.set_role_status(id, req.status).await?;
    sync_policy(&state).await?;
    info!(actor = %actor.subject_id, role_id = id, status = ?req.status, "Catalog role status changed");
    Ok(Json(ApiResponse::ok(role)))
}

/// DELETE /v1/rbac/catalog/roles/{id}
pub async fn delete_role(
    State(state): State<AppState>,
    actor: CurrentPrincipal,
    Path(id): Path<u64>,
) -> Result<Json<ApiResponse<MessageResponse>>, AppError> {
    catalog(&state)?.delete_role(id).await?;
    sync_policy(&state).await?;
    info!(actor = %actor.subject_id, role_id = id, "Catalog role deleted");
    Ok(Json(ApiResponse::ok(MessageResponse {
        message: "Role deleted".to_string(),
    })))
}

/// GET /v1/rbac/catalog/roles/{id}/permissions
pub async fn role_permissions(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<ApiResponse<Vec<Permission>>>, AppError> {
    let permissions = catalog(&state)?.permissions_for_role(id).await?;
    Ok(Json(ApiResponse::ok(permissions)))
}

/// PUT /v1/rbac/catalog/roles/{id}/permissions/{permission_id}
pub async fn assign_permission(
    State(state): State<AppState>,
    actor: CurrentPrincipal,
    Path((id, permission_id)): Path<(u64, u64)>,
) -> Result<Json<ApiResponse<MutationResponse>>, AppError> {
    let changed = catalog(&state)?
        .assign_permission(id, permission_id)
        .await?;
    if changed {
        sync_policy(&state).await?;
    }
    info!(actor = %actor.subject_id, role_id = id, permission_id, changed, "Catalog permission assigned");
    Ok(Json(ApiResponse::ok(MutationResponse { changed })))
}

/// DELETE /v1/rbac/catalog/roles/{id}/permissions/{permission_id}
pub async fn remove_permission(
    State(state): State<AppState>,
    actor: CurrentPrincipal,
    Path((id, permission_id)): Path<(u64, u64)>,
) -> Result<Json<ApiResponse<MutationResponse>>, AppError> {
    let changed = catalog(&state)?
        .remove_permission(id, permission_id)
        .await?;
    if changed {
        sync_policy(&state).await?;
    }
    info!(actor = %actor.subject_id, role_id = id, permission_id, changed, "Catalog permission removed");
    Ok(Json(ApiResponse::ok(MutationResponse { changed })))
}

// ── Permissions ─────────────────────────────────────────────────────

/// GET /v1/rbac/catalog/permissions
pub async fn list_permissions(
    State(state): State<AppState>,
    Query(params): Query<CatalogListParams>,
) -> Result<Json<ApiResponse<PageResponse<Permission>>>, AppError> {
    let page = catalog(&state)?
        .list_permissions(
            params.page_request(),
            params.name.as_deref(),
            params.resource.as_deref(),
        )
        .await?;
    Ok(Json(ApiResponse::ok(page)))
}

/// POST /v1/rbac/catalog/permissions
pub async fn create_permission(
    State(state): State<AppState>,
    actor: CurrentPrincipal,
    Json(req): Json<CreatePermissionRequest>,
) -> Result<Json<ApiResponse<Permission>>, AppError> {
    validate_body(&req)?;
    let permission = catalog(&state)?
        .create_permission(&req.name, &req.resource, &req.action, &req.description)
        .await?;
    info!(
        actor = %actor.subject_id,
        permission_id = permission.id,
        name = %permission.name,
        "Catalog permission created"
    );
    Ok(Json(ApiResponse::ok(permission)))
}

/// GET /v1/rbac/catalog/permissions/{id}
pub async fn get_permission(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<ApiResponse<Permission>>, AppError> {
    let permission = catalog(&state)?.get_permission(id).await?;
    Ok(Json(ApiResponse::ok(permission)))
}

/// PUT /v1/rbac/catalog/permissions/{id}
pub async fn update_permission(
    State(state): State<AppState>,
    actor: CurrentPrincipal,
    Path(id): Path<u64>,
    Json(req): Json<UpdatePermissionRequest>,
) -> Result<Json<ApiResponse<Permission>>, AppError> {
    validate_body(&req)?;
    let permission = catalog(&state)?
        .update_permission(
            id,
            PermissionUpdate {
                name: req.name,
                resource: req.resource,
                action: req.action,
                description: req.description,
            },
        )
        .await?;
    sync_policy(&state).await?;
    info!(actor = %actor.subject_id, permission_id = id, "Catalog permission updated");
    Ok(Json(ApiResponse::ok(permission)))
}

/// PUT /v1/rbac/catalog/permissions/{id}/status
pub async fn change_permission_status(
    State(state): State<AppState>,
    actor: CurrentPrincipal,
    Path(id): Path<u64>,
    Json(req): Json<ChangeStatusRequest>,
) -> Result<Json<ApiResponse<Permission>>, AppError> {
    let permission = catalog(&state)?
        .set_permission_status(id, req.status)
        .await?;
    sync_policy(&state).await?;
    info!(
        actor = %actor.subject_id,
        permission_id = id,
        status = ?req.status,
        "Catalog permission status changed"
    );
    Ok(Json(ApiResponse::ok(permission)))
}

/// DELETE /v1/rbac/catalog/permissions/{id}
pub async fn delete_permission(
    State(state): State<AppState>,
    actor: CurrentPrincipal,
    Path(id): Path<u64>,
) -> Result<Json<ApiResponse<MessageResponse>>, AppError> {
    catalog(&state)?.delete_permission(id).await?;
    sync_policy(&state).await?;
    info!(actor = %actor.subject_id, permission_id = id, "Catalog permission deleted");
    Ok(Json(ApiResponse::ok(MessageResponse {
        message: "Permission deleted".to_string(),
    })))
}
