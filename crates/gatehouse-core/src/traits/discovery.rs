//! Service discovery backend trait.

use async_trait::async_trait;

use crate::result::AppResult;
use crate::types::instance::{InstanceRegistration, ServiceInstance};

/// A naming backend that tracks live service instances.
///
/// Implementations return every known instance from [`instances`]; health
/// filtering happens in the registry.
///
/// [`instances`]: Discoverer::instances
#[async_trait]
pub trait Discoverer: Send + Sync + std::fmt::Debug + 'static {
    /// Backend name for logs.
    fn name(&self) -> &'static str;

    /// Register (or re-register) an ephemeral instance.
    async fn register(&self, registration: &InstanceRegistration) -> AppResult<()>;

    /// Remove an instance previously added with [`register`].
    ///
    /// [`register`]: Discoverer::register
    async fn deregister(&self, registration: &InstanceRegistration) -> AppResult<()>;

    /// Refresh the liveness of a registered instance.
    async fn heartbeat(&self, registration: &InstanceRegistration) -> AppResult<()>;

    /// All instances of `service`, healthy or not.
    async fn instances(&self, service: &str) -> AppResult<Vec<ServiceInstance>>;
}
