//! Role and permission records managed by the RBAC catalog.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Whether a role or permission currently participates in enforcement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityStatus {
    /// Grants referencing the entity are effective.
    #[default]
    Enabled,
    /// Grants referencing the entity behave as absent.
    Disabled,
}

/// A named bundle of permissions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    /// Catalog identifier.
    pub id: u64,
    /// Unique role name, also used as the policy subject.
    pub name: String,
    /// Free-form description.
    pub description: String,
    /// Enabled/disabled.
    pub status: EntityStatus,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
    /// Soft-delete timestamp.
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Role {
    /// Whether grants of this role take effect.
    pub fn is_effective(&self) -> bool {
        self.status == EntityStatus::Enabled && self.deleted_at.is_none()
    }
}

/// A (resource-pattern, action) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
    /// Catalog identifier.
    pub id: u64,
    /// Unique permission name.
    pub name: String,
    /// Resource pattern; may end in `*`.
    pub resource: String,
    /// Action or `*`.
    pub action: String,
    /// Free-form description.
    pub description: String,
    /// Enabled/disabled.
    pub status: EntityStatus,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
    /// Soft-delete timestamp.
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Permission {
    /// Whether grants of this permission take effect.
    pub fn is_effective(&self) -> bool {
        self.status == EntityStatus::Enabled && self.deleted_at.is_none()
    }
}
