//! Catalog-backed policy persistence with a CSV mirror.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use gatehouse_core::result::AppResult;
use gatehouse_core::traits::policy::{PolicyReader, PolicyWriter};
use gatehouse_core::types::policy::PolicyDocument;

use super::catalog::RbacCatalog;
use super::file_adapter::FilePolicyAdapter;

/// Serves the policy from an [`RbacCatalog`] and mirrors every save to a
/// policy file, so catalog edits survive a restart.
#[derive(Debug, Clone)]
pub struct CatalogBackend {
    catalog: Arc<RbacCatalog>,
    mirror: FilePolicyAdapter,
}

impl CatalogBackend {
    /// Creates a backend over `catalog` mirrored to `mirror`.
    pub fn new(catalog: Arc<RbacCatalog>, mirror: FilePolicyAdapter) -> Self {
        Self { catalog, mirror }
    }

    /// The catalog behind this backend.
    pub fn catalog(&self) -> &Arc<RbacCatalog> {
        &self.catalog
    }

    /// Fills the catalog from the mirror file. Call once before the store
    /// loads.
    pub async fn seed(&self) -> AppResult<()> {
        let document = self.mirror.load_policy().await?;
        self.catalog.save_policy(&document).await?;
        info!(
            path = %self.mirror.policy_path().display(),
            rules = document.rules.len(),
            groupings = document.groupings.len(),
            "Catalog seeded from policy file"
        );
        Ok(())
    }
}

#[async_trait]
impl PolicyReader for CatalogBackend {
    async fn load_policy(&self) -> AppResult<PolicyDocument> {
        self.catalog.load_policy().await
    }
}

#[async_trait]
impl PolicyWriter for CatalogBackend {
    /// Writes the mirror first; the catalog is only reconciled once the
    /// file holds the same tuples.
    async fn save_policy(&self, document: &PolicyDocument) -> AppResult<()> {
        self.mirror.save_policy(document).await?;
        self.catalog.save_policy(document).await
    }
}
