//! Policy persistence traits.

use async_trait::async_trait;

use crate::result::AppResult;
use crate::types::policy::PolicyDocument;

/// Source of the authoritative rule set.
#[async_trait]
pub trait PolicyReader: Send + Sync + std::fmt::Debug + 'static {
    /// Read every rule and grouping.
    async fn load_policy(&self) -> AppResult<PolicyDocument>;
}

/// Sink for the in-memory rule set.
#[async_trait]
pub trait PolicyWriter: Send + Sync + std::fmt::Debug + 'static {
    /// Replace the stored rule set with `document`.
    async fn save_policy(&self, document: &PolicyDocument) -> AppResult<()>;
}

/// A backend that can both load and save.
pub trait PolicyBackend: PolicyReader + PolicyWriter {}

impl<T: PolicyReader + PolicyWriter> PolicyBackend for T {}
