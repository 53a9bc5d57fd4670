//! Relational role/permission catalog.
//!
//! Roles, permissions and their grants live here as records with ids,
//! status and soft-delete timestamps. The catalog is a [`PolicyReader`] that
//! derives enforcement tuples from effective records only, and a
//! [`PolicyWriter`] that reconciles a document back into grants.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::info;

use gatehouse_core::error::AppError;
use gatehouse_core::result::AppResult;
use gatehouse_core::traits::policy::{PolicyReader, PolicyWriter};
use gatehouse_core::types::pagination::{PageRequest, PageResponse};
use gatehouse_core::types::policy::{GroupingRule, PolicyDocument, PolicyRule};
use gatehouse_core::types::rbac::{EntityStatus, Permission, Role};

/// Fields of a role that may be changed after creation.
#[derive(Debug, Clone, Default)]
pub struct RoleUpdate {
    /// New unique name.
    pub name: Option<String>,
    /// New description.
    pub description: Option<String>,
}

/// Fields of a permission that may be changed after creation.
#[derive(Debug, Clone, Default)]
pub struct PermissionUpdate {
    /// New unique name.
    pub name: Option<String>,
    /// New resource pattern.
    pub resource: Option<String>,
    /// New action.
    pub action: Option<String>,
    /// New description.
    pub description: Option<String>,
}

#[derive(Debug, Default)]
struct CatalogState {
    roles: BTreeMap<u64, Role>,
    permissions: BTreeMap<u64, Permission>,
    subject_roles: BTreeSet<(String, u64)>,
    role_permissions: BTreeSet<(u64, u64)>,
    next_role_id: u64,
    next_permission_id: u64,
}

impl CatalogState {
    fn live_role(&self, id: u64) -> AppResult<&Role> {
        self.roles
            .get(&id)
            .filter(|r| r.deleted_at.is_none())
            .ok_or_else(|| AppError::not_found(format!("Role {id} not found")))
    }

    fn live_permission(&self, id: u64) -> AppResult<&Permission> {
        self.permissions
            .get(&id)
            .filter(|p| p.deleted_at.is_none())
            .ok_or_else(|| AppError::not_found(format!("Permission {id} not found")))
    }

    fn role_id_by_name(&self, name: &str) -> Option<u64> {
        self.roles
            .values()
            .find(|r| r.deleted_at.is_none() && r.name == name)
            .map(|r| r.id)
    }

    fn permission_id_by_name(&self, name: &str) -> Option<u64> {
        self.permissions
            .values()
            .find(|p| p.deleted_at.is_none() && p.name == name)
            .map(|p| p.id)
    }

    fn permission_id_by_tuple(&self, resource: &str, action: &str) -> Option<u64> {
        self.permissions
            .values()
            .find(|p| p.deleted_at.is_none() && p.resource == resource && p.action == action)
            .map(|p| p.id)
    }

    fn insert_role(&mut self, name: &str, description: &str) -> Role {
        self.next_role_id += 1;
        let now = Utc::now();
        let role = Role {
            id: self.next_role_id,
            name: name.to_string(),
            description: description.to_string(),
            status: EntityStatus::Enabled,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        self.roles.insert(role.id, role.clone());
        role
    }

    fn insert_permission(
        &mut self,
        name: &str,
        resource: &str,
        action: &str,
        description: &str,
    ) -> Permission {
        self.next_permission_id += 1;
        let now = Utc::now();
        let permission = Permission {
            id: self.next_permission_id,
            name: name.to_string(),
            resource: resource.to_string(),
            action: action.to_string(),
            description: description.to_string(),
            status: EntityStatus::Enabled,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        self.permissions.insert(permission.id, permission.clone());
        permission
    }

    fn document(&self) -> PolicyDocument {
        let mut document = PolicyDocument::default();
        for (subject, role_id) in &self.subject_roles {
            if let Some(role) = self.roles.get(role_id).filter(|r| r.is_effective()) {
                document
                    .groupings
                    .push(GroupingRule::new(subject.clone(), role.name.clone()));
            }
        }
        for (role_id, permission_id) in &self.role_permissions {
            let role = self.roles.get(role_id).filter(|r| r.is_effective());
            let permission = self
                .permissions
                .get(permission_id)
                .filter(|p| p.is_effective());
            if let (Some(role), Some(permission)) = (role, permission) {
                document.rules.push(PolicyRule::new(
                    role.name.clone(),
                    permission.resource.clone(),
                    permission.action.clone(),
                ));
            }
        }
        document.normalize();
        document
    }
}

/// In-memory relational store of roles, permissions and grants.
#[derive(Debug, Default)]
pub struct RbacCatalog {
    state: RwLock<CatalogState>,
}

impl RbacCatalog {
    /// Creates an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    // ── Roles ───────────────────────────────────────────────────────

    /// Creates a role. Names are unique among non-deleted roles.
    pub async fn create_role(&self, name: &str, description: &str) -> AppResult<Role> {
        let name = require_name(name, "Role name")?;
        let mut state = self.state.write().await;
        if state.role_id_by_name(name).is_some() {
            return Err(AppError::conflict(format!("Role '{name}' already exists")));
        }
        let role = state.insert_role(name, description);
        info!(role_id = role.id, name = %role.name, "Role created");
        Ok(role)
    }

    /// Updates a role's name or description.
    pub async fn update_role(&self, id: u64, update: RoleUpdate) -> AppResult<Role> {
        let mut state = self.state.write().await;
        state.live_role(id)?;
        if let Some(name) = update.name.as_deref() {
            let name = require_name(name, "Role name")?;
            if state.role_id_by_name(name).is_some_and(|other| other != id) {
                return Err(AppError::conflict(format!("Role '{name}' already exists")));
            }
        }
        let role = state
            .roles
            .get_mut(&id)
            .ok_or_else(|| AppError::not_found(format!("Role {id} not found")))?;
        if let Some(name) = update.name {
            role.name = name.trim().to_string();
        }
        if let Some(description) = update.description {
            role.description = description;
        }
        role.updated_at = Utc::now();
        Ok(role.clone())
    }

    /// Enables or disables a role.
    pub async fn set_role_status(&self, id: u64, status: EntityStatus) -> AppResult<Role> {
        let mut state = self.state.write().await;
        state.live_role(id)?;
        let role = state
            .roles
            .get_mut(&id)
            .ok_or_else(|| AppError::not_found(format!("Role {id} not found")))?;
        role.status = status;
        role.updated_at = Utc::now();
        Ok(role.clone())
    }

    /// Soft-deletes a role. Its grants stop taking effect.
    pub async fn delete_role(&self, id: u64) -> AppResult<()> {
        let mut state = self.state.write().await;
        state.live_role(id)?;
        if let Some(role) = state.roles.get_mut(&id) {
            role.deleted_at = Some(Utc::now());
        }
        info!(role_id = id, "Role deleted");
        Ok(())
    }

    /// Fetches a non-deleted role.
    pub async fn get_role(&self, id: u64) -> AppResult<Role> {
        self.state.read().await.live_role(id).cloned()
    }

    /// Fetches a non-deleted role by name.
    pub async fn find_role_by_name(&self, name: &str) -> AppResult<Role> {
        let state = self.state.read().await;
        state
            .role_id_by_name(name)
            .and_then(|id| state.roles.get(&id).cloned())
            .ok_or_else(|| AppError::not_found(format!("Role '{name}' not found")))
    }

    /// Lists non-deleted roles, optionally filtered by a name substring.
    pub async fn list_roles(
        &self,
        page: PageRequest,
        name_filter: Option<&str>,
    ) -> AppResult<PageResponse<Role>> {
        let page = PageRequest::new(page.page, page.page_size);
        let state = self.state.read().await;
        let matching: Vec<&Role> = state
            .roles
            .values()
            .filter(|r| r.deleted_at.is_none())
            .filter(|r| name_filter.is_none_or(|f| r.name.contains(f)))
            .collect();
        Ok(paginate(matching, &page))
    }

    // ── Permissions ─────────────────────────────────────────────────

    /// Creates a permission. Names are unique among non-deleted permissions.
    pub async fn create_permission(
        &self,
        name: &str,
        resource: &str,
        action: &str,
        description: &str,
    ) -> AppResult<Permission> {
        let name = require_name(name, "Permission name")?;
        let resource = require_name(resource, "Permission resource")?;
        let action = require_name(action, "Permission action")?;
        let mut state = self.state.write().await;
        if state.permission_id_by_name(name).is_some() {
            return Err(AppError::conflict(format!(
                "Permission '{name}' already exists"
            )));
        }
        let permission = state.insert_permission(name, resource, action, description);
        info!(permission_id = permission.id, name = %permission.name, "Permission created");
        Ok(permission)
    }

    /// Updates a permission. Every field is validated before any is
    /// applied.
    pub async fn update_permission(
        &self,
        id: u64,
        update: PermissionUpdate,
    ) -> AppResult<Permission> {
        let name = update
            .name
            .as_deref()
            .map(|n| require_name(n, "Permission name"))
            .transpose()?;
        let resource = update
            .resource
            .as_deref()
            .map(|r| require_name(r, "Permission resource"))
            .transpose()?;
        let action = update
            .action
            .as_deref()
            .map(|a| require_name(a, "Permission action"))
            .transpose()?;

        let mut state = self.state.write().await;
        state.live_permission(id)?;
        if let Some(name) = name {
            if state
                .permission_id_by_name(name)
                .is_some_and(|other| other != id)
            {
                return Err(AppError::conflict(format!(
                    "Permission '{name}' already exists"
                )));
            }
        }
        let permission = state
            .permissions
            .get_mut(&id)
            .ok_or_else(|| AppError::not_found(format!("Permission {id} not found")))?;
        if let Some(name) = name {
            permission.name = name.to_string();
        }
        if let Some(resource) = resource {
            permission.resource = resource.to_string();
        }
        if let Some(action) = action {
            permission.action = action.to_string();
        }
        if let Some(description) = update.description {
            permission.description = description;
        }
        permission.updated_at = Utc::now();
        Ok(permission.clone())
    }

    /// Enables or disables a permission.
    pub async fn set_permission_status(
        &self,
        id: u64,
        status: EntityStatus,
    ) -> AppResult<Permission> {
        let mut state = self.state.write().await;
        state.live_permission(id)?;
        let permission = state
            .permissions
            .get_mut(&id)
            .ok_or_else(|| AppError::not_found(format!("Permission {id} not found")))?;
        permission.status = status;
        permission.updated_at = Utc::now();
        Ok(permission.clone())
    }

    /// Soft-deletes a permission.
    pub async fn delete_permission(&self, id: u64) -> AppResult<()> {
        let mut state = self.state.write().await;
        state.live_permission(id)?;
        if let Some(permission) = state.permissions.get_mut(&id) {
            permission.deleted_at = Some(Utc::now());
        }
        info!(permission_id = id, "Permission deleted");
        Ok(())
    }

    /// Fetches a non-deleted permission.
    pub async fn get_permission(&self, id: u64) -> AppResult<Permission> {
        self.state.read().await.live_permission(id).cloned()
    }

    /// Lists non-deleted permissions filtered by name and resource substrings.
    pub async fn list_permissions(
        &self,
        page: PageRequest,
        name_filter: Option<&str>,
        resource_filter: Option<&str>,
    ) -> AppResult<PageResponse<Permission>> {
        let page = PageRequest::new(page.page, page.page_size);
        let state = self.state.read().await;
        let matching: Vec<&Permission> = state
            .permissions
            .values()
            .filter(|p| p.deleted_at.is_none())
            .filter(|p| name_filter.is_none_or(|f| p.name.contains(f)))
            .filter(|p| resource_filter.is_none_or(|f| p.resource.contains(f)))
            .collect();
        Ok(paginate(matching, &page))
    }

    // ── Grants ──────────────────────────────────────────────────────

    /// Grants a role to a subject. Returns whether the grant is new.
    pub async fn assign_role(&self, subject: &str, role_id: u64) -> AppResult<bool> {
        let subject = require_name(subject, "Subject")?;
        let mut state = self.state.write().await;
        state.live_role(role_id)?;
        Ok(state.subject_roles.insert((subject.to_string(), role_id)))
    }

    /// Removes a role from a subject. Returns whether a grant was removed.
    pub async fn remove_role(&self, subject: &str, role_id: u64) -> AppResult<bool> {
        let mut state = self.state.write().await;
        state.live_role(role_id)?;
        Ok(state.subject_roles.remove(&(subject.to_string(), role_id)))
    }

    /// Grants a permission to a role. Returns whether the grant is new.
    pub async fn assign_permission(&self, role_id: u64, permission_id: u64) -> AppResult<bool> {
        let mut state = self.state.write().await;
        state.live_role(role_id)?;
        state.live_permission(permission_id)?;
        Ok(state.role_permissions.insert((role_id, permission_id)))
    }

    /// Removes a permission from a role. Returns whether a grant was removed.
    pub async fn remove_permission(&self, role_id: u64, permission_id: u64) -> AppResult<bool> {
        let mut state = self.state.write().await;
        state.live_role(role_id)?;
        state.live_permission(permission_id)?;
        Ok(state.role_permissions.remove(&(role_id, permission_id)))
    }

    /// Effective roles granted directly to `subject`.
    pub async fn roles_for_subject(&self, subject: &str) -> Vec<Role> {
        let state = self.state.read().await;
        state
            .subject_roles
            .iter()
            .filter(|(s, _)| s == subject)
            .filter_map(|(_, id)| state.roles.get(id))
            .filter(|r| r.is_effective())
            .cloned()
            .collect()
    }

    /// Effective permissions granted directly to a role.
    pub async fn permissions_for_role(&self, role_id: u64) -> AppResult<Vec<Permission>> {
        let state = self.state.read().await;
        state.live_role(role_id)?;
        Ok(state
            .role_permissions
            .iter()
            .filter(|(r, _)| *r == role_id)
            .filter_map(|(_, id)| state.permissions.get(id))
            .filter(|p| p.is_effective())
            .cloned()
            .collect())
    }
}

#[async_trait]
impl PolicyReader for RbacCatalog {
    async fn load_policy(&self) -> AppResult<PolicyDocument> {
        Ok(self.state.read().await.document())
    }
}

#[async_trait]
impl PolicyWriter for RbacCatalog {
    /// Reconciles grants so the effective tuples equal `document`.
    ///
    /// Missing roles and permissions are created. Grants that reference
    /// disabled or deleted records are left untouched since they are not
    /// part of the effective set.
    async fn save_policy(&self, document: &PolicyDocument) -> AppResult<()> {
        let mut state = self.state.write().await;

        let mut wanted_roles: HashSet<(String, u64)> = HashSet::new();
        for grouping in &document.groupings {
            let existing = state.role_id_by_name(&grouping.role);
            let role_id = match existing {
                Some(id) => id,
                None => state.insert_role(&grouping.role, "").id,
            };
            wanted_roles.insert((grouping.subject.clone(), role_id));
        }

        let mut wanted_permissions: HashSet<(u64, u64)> = HashSet::new();
        for rule in &document.rules {
            let existing = state.role_id_by_name(&rule.subject);
            let role_id = match existing {
                Some(id) => id,
                None => state.insert_role(&rule.subject, "").id,
            };
            let existing = state.permission_id_by_tuple(&rule.resource, &rule.action);
            let permission_id = match existing {
                Some(id) => id,
                None => {
                    let name = format!("{}:{}", rule.resource, rule.action);
                    state
                        .insert_permission(&name, &rule.resource, &rule.action, "")
                        .id
                }
            };
            wanted_permissions.insert((role_id, permission_id));
        }

        let current: &CatalogState = &state;
        let stale_roles: Vec<(String, u64)> = current
            .subject_roles
            .iter()
            .filter(|grant| role_effective(current, grant.1) && !wanted_roles.contains(*grant))
            .cloned()
            .collect();
        let stale_permissions: Vec<(u64, u64)> = current
            .role_permissions
            .iter()
            .filter(|grant| {
                role_effective(current, grant.0)
                    && permission_effective(current, grant.1)
                    && !wanted_permissions.contains(*grant)
            })
            .cloned()
            .collect();

        for grant in &stale_roles {
            state.subject_roles.remove(grant);
        }
        for grant in &stale_permissions {
            state.role_permissions.remove(grant);
        }
        state.subject_roles.extend(wanted_roles);
        state.role_permissions.extend(wanted_permissions);

        info!(
            removed_roles = stale_roles.len(),
            removed_permissions = stale_permissions.len(),
            "Catalog reconciled with policy"
        );
        Ok(())
    }
}

fn role_effective(state: &CatalogState, id: u64) -> bool {
    state.roles.get(&id).is_some_and(|r| r.is_effective())
}

fn permission_effective(state: &CatalogState, id: u64) -> bool {
    state.permissions.get(&id).is_some_and(|p| p.is_effective())
}

fn require_name<'a>(value: &'a str, field: &str) -> AppResult<&'a str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::validation(format!("{field} must not be empty")));
    }
    Ok(trimmed)
}

fn paginate<T: Clone + serde::Serialize>(items: Vec<&T>, page: &PageRequest) -> PageResponse<T> {
    let total = items.len() as u64;
    let slice = items
        .into_iter()
        .skip(page.offset() as usize)
        .take(page.limit() as usize)
        .cloned()
        .collect();
    PageResponse::new(slice, page.page, page.page_size, total)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_role_name_unique() {
        let catalog = RbacCatalog::new();
        catalog.create_role("admin", "").await.unwrap();
        let err = catalog.create_role("admin", "again").await.unwrap_err();
        assert_eq!(err.kind, gatehouse_core::ErrorKind::Conflict);
    }

    #[tokio::test]
    async fn test_deleted_name_can_be_reused() {
        let catalog = RbacCatalog::new();
        let role = catalog.create_role("admin", "").await.unwrap();
        catalog.delete_role(role.id).await.unwrap();
        assert!(catalog.create_role("admin", "").await.is_ok());
        assert!(catalog.get_role(role.id).await.is_err());
    }

    #[tokio::test]
    async fn test_pagination_defaults() {
        let catalog = RbacCatalog::new();
        for i in 0..12 {
            catalog.create_role(&format!("role-{i}"), "").await.unwrap();
        }
        let page = catalog
            .list_roles(PageRequest::new(0, 0), None)
            .await
            .unwrap();
        assert_eq!(page.page, 1);
        assert_eq!(page.items.len(), 10);
        assert_eq!(page.total_items, 12);
        assert_eq!(page.total_pages, 2);

        let filtered = catalog
            .list_roles(PageRequest::default(), Some("role-1"))
            .await
            .unwrap();
        assert_eq!(filtered.total_items, 3);
    }

    #[tokio::test]
    async fn test_assign_missing_role_not_found() {
        let catalog = RbacCatalog::new();
        let err = catalog.assign_role("1", 42).await.unwrap_err();
        assert_eq!(err.kind, gatehouse_core::ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_rejected_permission_update_changes_nothing() {
        let catalog = RbacCatalog::new();
        let permission = catalog
            .create_permission("read-users", "/api/v1/users", "GET", "")
            .await
            .unwrap();

        let err = catalog
            .update_permission(
                permission.id,
                PermissionUpdate {
                    name: Some("renamed".to_string()),
                    resource: Some("/api/v1/accounts".to_string()),
                    action: Some("  ".to_string()),
                    description: Some("changed".to_string()),
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind, gatehouse_core::ErrorKind::Validation);

        let unchanged = catalog.get_permission(permission.id).await.unwrap();
        assert_eq!(unchanged.name, "read-users");
        assert_eq!(unchanged.resource, "/api/v1/users");
        assert_eq!(unchanged.description, "");
        assert_eq!(unchanged.updated_at, permission.updated_at);
    }

    #[tokio::test]
    async fn test_assign_twice_is_noop() {
        let catalog = RbacCatalog::new();
        let role = catalog.create_role("admin", "").await.unwrap();
        assert!(catalog.assign_role("1", role.id).await.unwrap());
        assert!(!catalog.assign_role("1", role.id).await.unwrap());
        assert_eq!(catalog.roles_for_subject("1").await.len(), 1);
    }
}
