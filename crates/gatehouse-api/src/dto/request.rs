//! Request DTOs with validation.

use serde::{Deserialize, Serialize};
use validator::Validate;

use gatehouse_core::error::AppError;
use gatehouse_core::types::pagination::PageRequest;
use gatehouse_core::types::rbac::EntityStatus;

/// Ad hoc permission check.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CheckRequest {
    /// Subject to check.
    #[validate(length(min = 1, message = "Subject is required"))]
    pub subject: String,
    /// Resource path.
    #[validate(length(min = 1, message = "Resource is required"))]
    pub resource: String,
    /// Action.
    #[validate(length(min = 1, message = "Action is required"))]
    pub action: String,
}

/// A (resource, action) pair granted to or revoked from a role.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct PermissionRequest {
    /// Resource pattern; a trailing `*` matches any suffix.
    #[validate(length(min = 1, message = "Resource is required"))]
    pub resource: String,
    /// Action or `*`.
    #[validate(length(min = 1, message = "Action is required"))]
    pub action: String,
}

/// New catalog role.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateRoleRequest {
    /// Unique role name.
    #[validate(length(min = 1, max = 64, message = "Name must be 1-64 characters"))]
    pub name: String,
    /// Free-form description.
    #[serde(default)]
    pub description: String,
}

/// Partial role update.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct UpdateRoleRequest {
    /// New unique name.
    #[validate(length(min = 1, max = 64, message = "Name must be 1-64 characters"))]
    pub name: Option<String>,
    /// New description.
    pub description: Option<String>,
}

/// New catalog permission.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreatePermissionRequest {
    /// Unique permission name.
    #[validate(length(min = 1, max = 64, message = "Name must be 1-64 characters"))]
    pub name: String,
    /// Resource pattern.
    #[validate(length(min = 1, message = "Resource is required"))]
    pub resource: String,
    /// Action or `*`.
    #[validate(length(min = 1, message = "Action is required"))]
    pub action: String,
    /// Free-form description.
    #[serde(default)]
    pub description: String,
}

/// Partial permission update.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct UpdatePermissionRequest {
    /// New unique name.
    #[validate(length(min = 1, max = 64, message = "Name must be 1-64 characters"))]
    pub name: Option<String>,
    /// New resource pattern.
    #[validate(length(min = 1, message = "Resource must not be empty"))]
    pub resource: Option<String>,
    /// New action.
    #[validate(length(min = 1, message = "Action must not be empty"))]
    pub action: Option<String>,
    /// New description.
    pub description: Option<String>,
}

/// Enable or disable a catalog entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeStatusRequest {
    /// Target status.
    pub status: EntityStatus,
}

/// Query parameters for catalog list endpoints.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogListParams {
    /// Page number (1-based; 0 reads as 1).
    #[serde(default)]
    pub page: u64,
    /// Page size (0 reads as the default).
    #[serde(default)]
    pub page_size: u64,
    /// Name substring filter.
    pub name: Option<String>,
    /// Resource substring filter (permissions only).
    pub resource: Option<String>,
}

impl CatalogListParams {
    /// The normalized page request.
    pub fn page_request(&self) -> PageRequest {
        PageRequest::new(self.page, self.page_size)
    }
}

/// Runs the derived validator and maps failures to a `Validation` error.
pub fn validate_body<T: Validate>(body: &T) -> Result<(), AppError> {
    body.validate()
        .map_err(|e| AppError::validation(format!("Invalid request: {e}")))
}
