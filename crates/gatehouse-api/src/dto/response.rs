//! Response DTOs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use gatehouse_auth::Principal;
use gatehouse_auth::policy::ResolvedPermission;

/// Standard success response wrapper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T: Serialize> {
    /// Whether the request was successful.
    pub success: bool,
    /// Response data.
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    /// Creates a successful response.
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

/// A freshly issued token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    /// Signed token.
    pub access_token: String,
    /// Always `Bearer`.
    pub token_type: String,
    /// Lifetime in seconds.
    pub expires_in: i64,
    /// Expiry instant.
    pub expires_at: DateTime<Utc>,
}

/// Result of a permission check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckResponse {
    pub subject: String,
    pub resource: String,
    pub action: String,
    pub allowed: bool,
}

/// Roles held by a subject, directly or through inheritance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubjectRolesResponse {
    pub subject: String,
    pub roles: Vec<String>,
}

/// Effective permissions of a subject.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubjectPermissionsResponse {
    pub subject: String,
    pub permissions: Vec<ResolvedPermission>,
}

/// Outcome of a grant or revoke.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MutationResponse {
    /// False when the grant already existed, or the revoked entry did not.
    pub changed: bool,
}

/// Simple message response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    /// Message text.
    pub message: String,
}

/// Outcome of a forward-auth check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyResponse {
    /// Whether a token was verified; `false` for skip-listed targets.
    pub authenticated: bool,
    /// The verified caller.
    pub principal: Option<Principal>,
}

/// Policy size after a reload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicySummaryResponse {
    pub rules: usize,
    pub groupings: usize,
}
