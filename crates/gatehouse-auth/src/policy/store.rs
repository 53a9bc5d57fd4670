//! The authoritative policy holder.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use arc_swap::ArcSwap;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use gatehouse_core::error::AppError;
use gatehouse_core::traits::policy::PolicyBackend;
use gatehouse_core::types::policy::{GroupingRule, PolicyDocument, PolicyRule};

use super::snapshot::{self, PolicySnapshot, ResolvedPermission};

/// Holds the current policy snapshot and serializes changes to it.
///
/// Readers load the snapshot lock-free. Writers take the async `writer`
/// mutex, build a complete new snapshot and publish it with a single store,
/// so every reader sees either the old or the new rule set in full.
pub struct PolicyStore {
    /// Persistence backend.
    backend: Arc<dyn PolicyBackend>,
    /// Published snapshot.
    current: ArcSwap<PolicySnapshot>,
    /// Serializes mutations, reloads and saves.
    writer: Mutex<()>,
    /// Set when the in-memory set differs from the backend.
    dirty: AtomicBool,
    /// Persist after every successful mutation.
    auto_save: bool,
}

impl std::fmt::Debug for PolicyStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let snapshot = self.current.load();
        f.debug_struct("PolicyStore")
            .field("backend", &self.backend)
            .field("loaded", &snapshot.is_loaded())
            .field("rules", &snapshot.rule_count())
            .field("groupings", &snapshot.grouping_count())
            .field("auto_save", &self.auto_save)
            .finish()
    }
}

impl PolicyStore {
    /// Creates an unloaded store. Call [`load`](Self::load) before serving.
    pub fn new(backend: Arc<dyn PolicyBackend>, auto_save: bool) -> Self {
        Self {
            backend,
            current: ArcSwap::from_pointee(PolicySnapshot::unloaded()),
            writer: Mutex::new(()),
            dirty: AtomicBool::new(false),
            auto_save,
        }
    }

    /// Performs the initial load from the backend.
    pub async fn load(&self) -> Result<(), AppError> {
        self.reload().await
    }

    /// Reads the backend and atomically replaces the snapshot.
    ///
    /// On failure the previous snapshot stays in place.
    pub async fn reload(&self) -> Result<(), AppError> {
        let _guard = self.writer.lock().await;
        let document = self.backend.load_policy().await?;
        let next = PolicySnapshot::from_document(document);
        info!(
            rules = next.rule_count(),
            groupings = next.grouping_count(),
            "Policy loaded"
        );
        self.current.store(Arc::new(next));
        self.dirty.store(false, Ordering::Release);
        Ok(())
    }

    /// Writes the current rule set to the backend.
    pub async fn persist(&self) -> Result<(), AppError> {
        let _guard = self.writer.lock().await;
        self.persist_locked().await
    }

    /// Persists unsaved changes. Call once during shutdown.
    pub async fn shutdown(&self) -> Result<(), AppError> {
        if self.is_dirty() {
            info!("Persisting unsaved policy changes");
            self.persist().await?;
        }
        Ok(())
    }

    /// Whether the in-memory set has changes the backend has not seen.
    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::Acquire)
    }

    /// The current snapshot.
    pub fn snapshot(&self) -> Arc<PolicySnapshot> {
        self.current.load_full()
    }

    /// Whether `subject` may perform `action` on `resource`.
    ///
    /// Fails with `Internal` when no policy has ever been loaded.
    pub fn enforce(&self, subject: &str, resource: &str, action: &str) -> Result<bool, AppError> {
        let snapshot = self.loaded_snapshot()?;
        let allowed = snapshot.enforce(subject, resource, action);
        debug!(subject, resource, action, allowed, "Policy enforced");
        Ok(allowed)
    }

    /// Roles of `subject`, direct first then inherited.
    pub fn roles_of(&self, subject: &str) -> Result<Vec<String>, AppError> {
        Ok(self.loaded_snapshot()?.roles_of(subject))
    }

    /// Flattened permissions of `subject` and its roles.
    pub fn permissions_of(&self, subject: &str) -> Result<Vec<ResolvedPermission>, AppError> {
        Ok(self.loaded_snapshot()?.permissions_of(subject))
    }

    /// Grants `role` to `subject`. Returns whether the set changed.
    pub async fn grant_role(&self, subject: &str, role: &str) -> Result<bool, AppError> {
        require_non_empty(&[("subject", subject), ("role", role)])?;
        let grouping = GroupingRule::new(subject, role);
        self.mutate("grant_role", |doc| snapshot::insert_grouping(doc, grouping))
            .await
    }

    /// Revokes `role` from `subject`. Returns whether the set changed.
    pub async fn revoke_role(&self, subject: &str, role: &str) -> Result<bool, AppError> {
        require_non_empty(&[("subject", subject), ("role", role)])?;
        let grouping = GroupingRule::new(subject, role);
        self.mutate("revoke_role", |doc| snapshot::remove_grouping(doc, &grouping))
            .await
    }

    /// Grants (`resource`, `action`) to a role or subject.
    pub async fn grant_permission(
        &self,
        role: &str,
        resource: &str,
        action: &str,
    ) -> Result<bool, AppError> {
        require_non_empty(&[("role", role), ("resource", resource), ("action", action)])?;
        let rule = PolicyRule::new(role, resource, action);
        self.mutate("grant_permission", |doc| snapshot::insert_rule(doc, rule))
            .await
    }

    /// Revokes (`resource`, `action`) from a role or subject.
    pub async fn revoke_permission(
        &self,
        role: &str,
        resource: &str,
        action: &str,
    ) -> Result<bool, AppError> {
        require_non_empty(&[("role", role), ("resource", resource), ("action", action)])?;
        let rule = PolicyRule::new(role, resource, action);
        self.mutate("revoke_permission", |doc| snapshot::remove_rule(doc, &rule))
            .await
    }

    async fn mutate<F>(&self, operation: &'static str, apply: F) -> Result<bool, AppError>
    where
        F: FnOnce(&mut PolicyDocument) -> bool,
    {
        let _guard = self.writer.lock().await;
        let current = self.loaded_snapshot()?;

        let mut document = current.document().clone();
        if !apply(&mut document) {
            debug!(operation, "Policy unchanged");
            return Ok(false);
        }

        let next = PolicySnapshot::from_document(document);
        if self.auto_save {
            // Publish only what the backend accepted.
            self.save(&next).await?;
            self.current.store(Arc::new(next));
            info!(operation, "Policy updated");
            return Ok(true);
        }

        self.current.store(Arc::new(next));
        self.dirty.store(true, Ordering::Release);
        info!(operation, "Policy updated");
        Ok(true)
    }

    async fn persist_locked(&self) -> Result<(), AppError> {
        let snapshot = self.loaded_snapshot()?;
        self.save(&snapshot).await
    }

    async fn save(&self, snapshot: &PolicySnapshot) -> Result<(), AppError> {
        if let Err(e) = self.backend.save_policy(snapshot.document()).await {
            warn!(error = %e, "Failed to persist policy");
            return Err(e);
        }
        self.dirty.store(false, Ordering::Release);
        info!(
            rules = snapshot.rule_count(),
            groupings = snapshot.grouping_count(),
            "Policy persisted"
        );
        Ok(())
    }

    fn loaded_snapshot(&self) -> Result<Arc<PolicySnapshot>, AppError> {
        let snapshot = self.current.load_full();
        if !snapshot.is_loaded() {
            return Err(AppError::internal("Policy has not been loaded"));
        }
        Ok(snapshot)
    }
}

fn require_non_empty(fields: &[(&str, &str)]) -> Result<(), AppError> {
    for (name, value) in fields {
        if value.trim().is_empty() {
            return Err(AppError::validation(format!("{name} must not be empty")));
        }
    }
    Ok(())
}
